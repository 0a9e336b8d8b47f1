//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Video platform endpoints
  pub api_base_url: String,
  pub embed_info_url: String,
  pub watch_url: String,
  pub playlist_url: String,
  /// Thumbnail URL template; `{id}` is replaced with the video id.
  pub thumbnail_url: String,

  /// Third-party playlist duration services, tried in order. `{id}` is the playlist id.
  pub duration_services: Vec<String>,

  // Defaults overridable from prefs.toml
  pub cache_ttl_secs: u64,
  pub items_per_page: usize,

  /// How many playlist entries to request when looking for a representative thumbnail.
  pub playlist_thumbnail_sample: u32,
  pub user_agent: String,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

/// Build the thumbnail URL for a video id.
pub fn thumbnail_url(video_id: &str) -> String {
  constants().thumbnail_url.replace("{id}", video_id)
}
