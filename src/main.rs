use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use al_rawi::config::Config;
use al_rawi::filter::SortOrder;
use al_rawi::library::Library;
use al_rawi::model::{ContentItem, ContentKind, Playlist, SortField, Video};
use al_rawi::render::{render_cards, render_filter_options, render_page_footer, render_table};
use al_rawi::youtube::{ClientOptions, MetadataClient, PlaylistDetails, VideoDetails};
use al_rawi::{App, Intent, template};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Library file (default: `library_path` from prefs.toml, else the platform data dir)
  #[arg(short, long, global = true)]
  library: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Filter, sort and page through one content kind; optionally act on a selection
  List(ListArgs),
  /// Per-kind counts, total duration and status breakdown
  Stats,
  /// Fetch video metadata
  Video { url: String },
  /// Fetch playlist metadata
  Playlist { url: String },
  /// Total duration of a playlist
  Duration { url: String },
  /// Render a note from a template file, filled with fetched metadata
  Note(NoteArgs),
  /// Store (or clear, when omitted) the API key in prefs.toml
  SetKey { key: Option<String> },
}

#[derive(clap::Args, Debug)]
struct ListArgs {
  #[arg(short, long, value_parser = parse_kind, default_value = "video")]
  kind: ContentKind,
  #[arg(long)]
  status: Vec<String>,
  #[arg(long)]
  presenter: Vec<String>,
  #[arg(long)]
  category: Vec<String>,
  #[arg(long)]
  tag: Vec<String>,
  /// Inclusive start date (YYYY-MM-DD)
  #[arg(long)]
  from: Option<NaiveDate>,
  /// Inclusive end date (YYYY-MM-DD)
  #[arg(long)]
  to: Option<NaiveDate>,
  #[arg(short, long)]
  search: Option<String>,
  /// title, presenter, status, date, duration, count, pages, progress
  #[arg(long, value_parser = parse_sort_field)]
  sort: Option<SortField>,
  #[arg(long, value_enum)]
  order: Option<Order>,
  #[arg(short, long, default_value_t = 1)]
  page: usize,
  #[arg(long)]
  per_page: Option<usize>,
  /// Card layout instead of a table
  #[arg(long)]
  cards: bool,
  /// Print the filter values still available
  #[arg(long)]
  options: bool,
  /// Select an item by identity (repeatable)
  #[arg(long)]
  select: Vec<String>,
  /// Select every item on the shown page
  #[arg(long)]
  select_page: bool,
  /// Set this status on the selection
  #[arg(long)]
  set_status: Option<String>,
  /// Add this tag to the selection
  #[arg(long)]
  add_tag: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Order {
  Asc,
  Desc,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NoteKind {
  Video,
  Playlist,
}

#[derive(clap::Args, Debug)]
struct NoteArgs {
  #[arg(value_enum)]
  kind: NoteKind,
  url: String,
  /// Template with optional `---` header, `{{key}}` placeholders and `{{#if key}}` blocks
  #[arg(short, long)]
  template: PathBuf,
  /// Write the note here and record it in the library; stdout otherwise
  #[arg(short, long)]
  output: Option<PathBuf>,
}

fn parse_kind(s: &str) -> Result<ContentKind, String> {
  ContentKind::ALL
    .into_iter()
    .find(|k| k.label() == s.to_lowercase().trim_end_matches('s'))
    .ok_or_else(|| format!("unknown kind '{}' (video, playlist, book, benefit)", s))
}

fn parse_sort_field(s: &str) -> Result<SortField, String> {
  SortField::from_name(s).ok_or_else(|| format!("unknown sort field '{}'", s))
}

// --- Logging ---

/// Log to a daily-rolling file so stdout stays clean. Keep the guard alive for the whole run.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
  let dir = Config::log_dir()?;
  if let Err(e) = std::fs::create_dir_all(&dir) {
    eprintln!("Warning: cannot create log directory {}: {}", dir.display(), e);
    return None;
  }
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "al-rawi.log"));
  let default_level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
    .init();
  Some(guard)
}

// --- Commands ---

/// Only commands that read or write the library call this.
fn resolve_library_path(explicit: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
  explicit.or_else(|| config.library_path()).context("No library path: pass --library or set library_path")
}

fn load_library(path: &Path) -> Result<Library> {
  if path.exists() {
    Library::load(path)
  } else {
    info!(path = %path.display(), "library: not found, starting empty");
    Ok(Library::new())
  }
}

fn metadata_client(config: &Config) -> MetadataClient {
  MetadataClient::new(ClientOptions { api_key: config.api_key().map(str::to_string), cache_ttl: config.cache_ttl() })
}

fn run_list(list: ListArgs, library: Library, config: &Config) -> (App, bool) {
  let mut app = App::with_config(library, config);
  let mut intents = vec![Intent::SwitchKind(list.kind)];
  if let Some(n) = list.per_page {
    intents.push(Intent::SetItemsPerPage(n));
  }
  // Explicit --status replaces the configured defaults.
  if !list.status.is_empty() {
    let defaults = config.default_statuses_for(list.kind);
    intents.extend(defaults.into_iter().map(Intent::ToggleStatus));
    intents.extend(list.status.into_iter().map(Intent::ToggleStatus));
  }
  intents.extend(list.presenter.into_iter().map(Intent::TogglePresenter));
  intents.extend(list.category.into_iter().map(Intent::ToggleCategory));
  intents.extend(list.tag.into_iter().map(Intent::ToggleTag));
  if list.from.is_some() || list.to.is_some() {
    intents.push(Intent::SetDateRange { from: list.from, to: list.to });
  }
  if let Some(q) = list.search {
    intents.push(Intent::SetSearch(q));
  }
  if let Some(field) = list.sort {
    intents.push(Intent::SortBy(field));
  }
  if let Some(order) = list.order {
    intents.push(Intent::SetSortOrder(match order {
      Order::Asc => SortOrder::Asc,
      Order::Desc => SortOrder::Desc,
    }));
  }
  intents.push(Intent::SetPage(list.page));
  intents.extend(list.select.into_iter().map(|id| Intent::ToggleItem { id, selected: true }));
  if list.select_page {
    intents.push(Intent::SelectPage);
  }
  if let Some(status) = list.set_status {
    intents.push(Intent::SetStatusOnSelection(status));
  }
  if let Some(tag) = list.add_tag {
    intents.push(Intent::AddTagToSelection(tag));
  }

  let mut modified = false;
  for intent in intents {
    modified |= app.dispatch(intent);
    if let Some(notice) = app.notice() {
      if notice.is_error {
        eprintln!("Error: {}", notice.message);
      } else {
        eprintln!("{}", notice.message);
      }
      app.clear_notice();
    }
  }

  let page = app.page_items();
  if list.cards {
    print!("{}", render_cards(&page, app.selection(), 80));
  } else {
    print!("{}", render_table(app.kind(), &page, app.selection()));
  }
  println!(
    "{}",
    render_page_footer(app.filter().page, app.total_pages(), app.visible().len(), app.selection().selection_count())
  );
  if list.options {
    println!();
    print!("{}", render_filter_options(&app.filter_options()));
  }
  (app, modified)
}

fn print_stats(library: &Library) {
  for kind in ContentKind::ALL {
    let stats = library.stats(kind);
    let statuses: Vec<String> = stats.by_status.iter().map(|(s, n)| format!("{} {}", n, s)).collect();
    let mut line = format!("{:<9} {:>4}", format!("{}s", kind), stats.count);
    if stats.total_duration_secs > 0 {
      line.push_str(&format!("  {}", al_rawi::duration::format_duration(stats.total_duration_secs)));
    }
    if !statuses.is_empty() {
      line.push_str(&format!("  ({})", statuses.join(", ")));
    }
    println!("{}", line);
  }
}

fn print_video(d: &VideoDetails) {
  println!("{}\n  {}\n  {} · {}\n  {}", d.title, d.url, d.presenter, d.duration, d.thumbnail);
}

fn print_playlist(d: &PlaylistDetails) {
  println!("{}\n  {}\n  {} · {} videos · {}", d.title, d.url, d.presenter, d.item_count, d.duration);
  if !d.thumbnail.is_empty() {
    println!("  {}", d.thumbnail);
  }
}

fn today() -> String {
  chrono::Local::now().format("%Y-%m-%d").to_string()
}

async fn run_note(note: NoteArgs, config: &Config, library: Option<PathBuf>) -> Result<()> {
  let template_text = std::fs::read_to_string(&note.template)
    .with_context(|| format!("Failed to read template {}", note.template.display()))?;
  let client = metadata_client(config);
  let file_path = note.output.as_ref().map(|p| p.display().to_string()).unwrap_or_default();

  let (data, item) = match note.kind {
    NoteKind::Video => {
      let d = client.get_video_details(&note.url).await?;
      let item = ContentItem::Video(Video {
        file_path,
        title: d.title.clone(),
        url: d.url.clone(),
        video_id: d.id.clone(),
        presenter: d.presenter.clone(),
        duration: d.duration.clone(),
        date_added: Some(today()),
        thumbnail: Some(d.thumbnail.clone()),
        tags: d.tags.clone(),
        ..Video::default()
      });
      (serde_json::to_value(&d).context("Failed to serialize video details")?, item)
    }
    NoteKind::Playlist => {
      let d = client.get_playlist_details(&note.url).await?;
      let item = ContentItem::Playlist(Playlist {
        file_path,
        title: d.title.clone(),
        url: d.url.clone(),
        playlist_id: d.id.clone(),
        presenter: d.presenter.clone(),
        item_count: d.item_count,
        duration: d.duration.clone(),
        date_added: Some(today()),
        thumbnail: Some(d.thumbnail.clone()).filter(|t| !t.is_empty()),
        ..Playlist::default()
      });
      (serde_json::to_value(&d).context("Failed to serialize playlist details")?, item)
    }
  };

  let mut fields = match data {
    Value::Object(map) => map,
    _ => Map::new(),
  };
  fields.insert("date".to_string(), Value::String(today()));
  fields.insert("kind".to_string(), Value::String(item.kind().label().to_string()));
  let rendered = template::render(&template_text, &fields);

  let Some(output) = note.output else {
    print!("{}", rendered);
    return Ok(());
  };
  if output.exists() {
    bail!("{} already exists", output.display());
  }
  let library_path = resolve_library_path(library, config)?;
  let mut library = load_library(&library_path)?;
  std::fs::write(&output, &rendered).with_context(|| format!("Failed to write {}", output.display()))?;
  library.insert(item).with_context(|| format!("Failed to record {} in the library", output.display()))?;
  library.save(&library_path)?;
  println!("Wrote {}", output.display());
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let mut config = Config::load();
  let _guard = init_logging(&config);
  info!(version = env!("CARGO_PKG_VERSION"), "al-rawi starting");

  let fetches = matches!(args.command, Command::Video { .. } | Command::Playlist { .. } | Command::Duration { .. } | Command::Note(_));
  if fetches && config.api_key().is_none() {
    warn!("metadata: no api key configured, using embed fallback");
  }

  match args.command {
    Command::List(list) => {
      let library_path = resolve_library_path(args.library, &config)?;
      let library = load_library(&library_path)?;
      let (app, modified) = run_list(list, library, &config);
      if modified {
        app.library.save(&library_path)?;
      }
    }
    Command::Stats => print_stats(&load_library(&resolve_library_path(args.library, &config)?)?),
    Command::Video { url } => print_video(&metadata_client(&config).get_video_details(&url).await?),
    Command::Playlist { url } => print_playlist(&metadata_client(&config).get_playlist_details(&url).await?),
    Command::Duration { url } => println!("{}", metadata_client(&config).get_playlist_duration(&url).await?),
    Command::Note(note) => run_note(note, &config, args.library).await?,
    Command::SetKey { key } => {
      config.api_key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
      config.save();
      println!("{}", if config.api_key.is_some() { "API key saved." } else { "API key cleared." });
    }
  }
  Ok(())
}
