pub mod app;
pub mod cache;
pub mod config;
pub mod constants;
pub mod duration;
pub mod error;
pub mod filter;
pub mod library;
pub mod model;
pub mod render;
pub mod scrape;
pub mod selection;
pub mod template;
pub mod youtube;

pub use app::{App, Intent};
pub use error::MetadataError;
pub use model::{ContentItem, ContentKind};
