//! Video platform metadata: identifier extraction and a cached client with fallbacks.
//!
//! With an API key the client talks to the versioned Data API. Without one, or
//! when an API call fails, it falls back to the public embed-info endpoint, which
//! knows titles and authors but not durations. Playlist durations come from two
//! third-party services scraped in a fixed order.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::constants::{constants, thumbnail_url};
use crate::duration::{format_duration, parse_iso8601_duration};
use crate::error::{MetadataError, Result};
use crate::scrape::{ScrapedPlaylist, scrape_playlist};

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern is valid"));
static PLAYLIST_ID_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{10,64}$").expect("playlist id pattern is valid"));

/// Upper bound the API accepts for `maxResults`.
const MAX_PAGE_SIZE: u32 = 50;

// --- Identifier extraction ---

fn parse_loose_url(input: &str) -> Option<Url> {
  Url::parse(input).ok().or_else(|| {
    if input.contains('.') && input.contains('/') { Url::parse(&format!("https://{}", input)).ok() } else { None }
  })
}

fn is_platform_host(host: &str) -> bool {
  let host = host.trim_start_matches("www.").trim_start_matches("m.").trim_start_matches("music.");
  host == "youtube.com" || host == "youtube-nocookie.com"
}

/// Resolve a video id from a bare id or any common watch/share/embed URL.
pub fn extract_video_id(input: &str) -> Option<String> {
  let input = input.trim();
  if VIDEO_ID_RE.is_match(input) {
    return Some(input.to_string());
  }

  let url = parse_loose_url(input)?;
  let host = url.host_str()?.to_lowercase();
  let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

  let candidate = if host == "youtu.be" || host == "www.youtu.be" {
    segments.next().map(str::to_string)
  } else if is_platform_host(&host) {
    match segments.next() {
      Some("watch") => url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned()),
      Some("embed" | "shorts" | "live" | "v") => segments.next().map(str::to_string),
      _ => None,
    }
  } else {
    None
  };

  candidate.filter(|id| VIDEO_ID_RE.is_match(id))
}

/// Resolve a playlist id from a bare id or any URL carrying a `list=` parameter.
pub fn extract_playlist_id(input: &str) -> Option<String> {
  let input = input.trim();
  if PLAYLIST_ID_RE.is_match(input) {
    return Some(input.to_string());
  }
  let url = parse_loose_url(input)?;
  url
    .query_pairs()
    .find(|(k, _)| k == "list")
    .map(|(_, v)| v.into_owned())
    .filter(|id| PLAYLIST_ID_RE.is_match(id))
}

pub fn watch_url(video_id: &str) -> String {
  format!("{}?v={}", constants().watch_url, video_id)
}

pub fn playlist_url(playlist_id: &str) -> String {
  format!("{}?list={}", constants().playlist_url, playlist_id)
}

// --- Public result types ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
  pub id: String,
  pub url: String,
  pub title: String,
  pub presenter: String,
  /// `HH:MM:SS`; `00:00:00` when the source could not tell.
  pub duration: String,
  pub duration_secs: u64,
  pub thumbnail: String,
  pub published_at: Option<String>,
  pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetails {
  pub id: String,
  pub url: String,
  pub title: String,
  pub presenter: String,
  pub item_count: u32,
  pub duration: String,
  pub duration_secs: u64,
  /// Empty when no representative thumbnail could be found.
  pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideo {
  pub video_id: String,
  pub title: String,
  pub position: u32,
  pub thumbnail: String,
}

#[derive(Debug, Clone)]
enum CachedPayload {
  Video(VideoDetails),
  Playlist(PlaylistDetails),
  PlaylistVideos(Vec<PlaylistVideo>),
  PlaylistDuration(String),
}

// --- Transport ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// HTTP GET boundary, swappable for tests.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn get(&self, url: &Url) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
  async fn get(&self, url: &Url) -> Result<HttpResponse> {
    (**self).get(url).await
  }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
  client: Client,
}

impl ReqwestTransport {
  pub fn new() -> Self {
    let client = Client::builder()
      .user_agent(constants().user_agent.as_str())
      .timeout(Duration::from_secs(20))
      .build()
      .unwrap_or_else(|e| {
        warn!(err = %e, "metadata: failed to build configured HTTP client, using defaults");
        Client::new()
      });
    Self { client }
  }
}

impl Default for ReqwestTransport {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn get(&self, url: &Url) -> Result<HttpResponse> {
    let response = self.client.get(url.clone()).send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(HttpResponse { status, body })
  }
}

// --- Wire formats ---

#[derive(Debug, Deserialize, Default)]
struct Thumbnail {
  url: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Thumbnails {
  default: Option<Thumbnail>,
  medium: Option<Thumbnail>,
  high: Option<Thumbnail>,
  standard: Option<Thumbnail>,
  maxres: Option<Thumbnail>,
}

impl Thumbnails {
  /// Medium first: it matches the card aspect ratio used by the views.
  fn best(self) -> Option<String> {
    self.medium.or(self.high).or(self.standard).or(self.maxres).or(self.default).map(|t| t.url)
  }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct Snippet {
  title: String,
  channel_title: String,
  published_at: Option<String>,
  tags: Vec<String>,
  thumbnails: Thumbnails,
  position: u32,
  resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
  video_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ContentDetails {
  duration: Option<String>,
  item_count: Option<u32>,
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
  #[serde(default)]
  snippet: Snippet,
  #[serde(default, rename = "contentDetails")]
  content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ApiList {
  #[serde(default)]
  items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct EmbedInfo {
  title: Option<String>,
  author_name: Option<String>,
  thumbnail_url: Option<String>,
  error: Option<String>,
}

// --- Client ---

/// Settings fixed when the client is built.
#[derive(Debug, Clone)]
pub struct ClientOptions {
  pub api_key: Option<String>,
  pub cache_ttl: Duration,
}

impl Default for ClientOptions {
  fn default() -> Self {
    Self { api_key: None, cache_ttl: Duration::from_secs(constants().cache_ttl_secs) }
  }
}

/// Resolves video and playlist identifiers to display metadata.
///
/// Every public method returns a `Result`; transport and parse failures become a
/// fallback attempt or a typed error, never a panic.
pub struct MetadataClient<T: Transport = ReqwestTransport, C: Clock = SystemClock> {
  transport: T,
  clock: C,
  api_key: Option<String>,
  cache: TtlCache<CachedPayload>,
}

impl MetadataClient {
  pub fn new(options: ClientOptions) -> Self {
    Self::with_parts(ReqwestTransport::new(), SystemClock, options)
  }
}

impl<T: Transport, C: Clock> MetadataClient<T, C> {
  pub fn with_parts(transport: T, clock: C, options: ClientOptions) -> Self {
    let api_key = options.api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    Self { transport, clock, api_key, cache: TtlCache::new(options.cache_ttl) }
  }

  pub fn has_api_key(&self) -> bool {
    self.api_key.is_some()
  }

  /// Replace the API key. The whole cache is dropped, even if the key is unchanged.
  pub fn set_api_key(&mut self, api_key: Option<String>) {
    self.api_key = api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    self.cache.clear();
    info!(has_key = self.api_key.is_some(), "metadata: api key changed, cache cleared");
  }

  fn cached(&self, key: &str) -> Option<CachedPayload> {
    self.cache.get(key, self.clock.now())
  }

  fn store(&self, key: String, payload: CachedPayload) {
    self.cache.insert(key, payload, self.clock.now());
  }

  fn api_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
    let key = self.api_key.as_deref().ok_or_else(|| MetadataError::MissingApiKey(format!("call {}", endpoint)))?;
    let base = format!("{}/{}", constants().api_base_url.trim_end_matches('/'), endpoint);
    let mut all: Vec<(&str, &str)> = params.to_vec();
    all.push(("key", key));
    Url::parse_with_params(&base, &all).map_err(|e| MetadataError::InvalidInput(e.to_string()))
  }

  async fn fetch(&self, url: &Url) -> Result<String> {
    debug!(host = url.host_str().unwrap_or_default(), path = url.path(), "metadata: GET");
    let response = self.transport.get(url).await?;
    if !response.is_success() {
      return Err(MetadataError::UpstreamUnavailable(format!("HTTP {} from {}", response.status, url.path())));
    }
    Ok(response.body)
  }

  async fn fetch_json<D: DeserializeOwned>(&self, url: &Url) -> Result<D> {
    let body = self.fetch(url).await?;
    Ok(serde_json::from_str(&body)?)
  }

  async fn embed_info(&self, page_url: &str) -> Result<EmbedInfo> {
    let url = Url::parse_with_params(&constants().embed_info_url, &[("url", page_url)])
      .map_err(|e| MetadataError::InvalidInput(e.to_string()))?;
    let mut info: EmbedInfo = self.fetch_json(&url).await?;
    if let Some(err) = info.error.take() {
      return Err(MetadataError::NotFound(err));
    }
    Ok(info)
  }

  // --- Videos ---

  pub async fn get_video_details(&self, input: &str) -> Result<VideoDetails> {
    let id = extract_video_id(input)
      .ok_or_else(|| MetadataError::InvalidInput(format!("not a video id or URL: {:?}", input)))?;
    let cache_key = format!("video:{}", id);
    if let Some(CachedPayload::Video(details)) = self.cached(&cache_key) {
      return Ok(details);
    }

    if self.api_key.is_none() {
      return self.video_from_embed(&id).await;
    }

    match self.video_from_api(&id).await {
      Ok(details) => {
        self.store(cache_key, CachedPayload::Video(details.clone()));
        Ok(details)
      }
      Err(e @ MetadataError::NotFound(_)) => Err(e),
      Err(e) => {
        warn!(err = %e, id = %id, "metadata: video API failed, falling back to embed info");
        self.video_from_embed(&id).await
      }
    }
  }

  async fn video_from_api(&self, id: &str) -> Result<VideoDetails> {
    let url = self.api_url("videos", &[("part", "snippet,contentDetails"), ("id", id)])?;
    let list: ApiList = self.fetch_json(&url).await?;
    let item = list.items.into_iter().next().ok_or_else(|| MetadataError::NotFound(format!("video {}", id)))?;
    let duration_secs = item.content_details.duration.as_deref().and_then(parse_iso8601_duration).unwrap_or(0);
    Ok(VideoDetails {
      id: id.to_string(),
      url: watch_url(id),
      title: item.snippet.title,
      presenter: item.snippet.channel_title,
      duration: format_duration(duration_secs),
      duration_secs,
      thumbnail: item.snippet.thumbnails.best().unwrap_or_else(|| thumbnail_url(id)),
      published_at: item.snippet.published_at,
      tags: item.snippet.tags,
    })
  }

  async fn video_from_embed(&self, id: &str) -> Result<VideoDetails> {
    let url = watch_url(id);
    let info = self.embed_info(&url).await?;
    Ok(VideoDetails {
      id: id.to_string(),
      title: info.title.unwrap_or_else(|| id.to_string()),
      presenter: info.author_name.unwrap_or_default(),
      duration: format_duration(0),
      duration_secs: 0,
      thumbnail: thumbnail_url(id),
      published_at: None,
      tags: Vec::new(),
      url,
    })
  }

  // --- Playlists ---

  pub async fn get_playlist_details(&self, input: &str) -> Result<PlaylistDetails> {
    let id = extract_playlist_id(input)
      .ok_or_else(|| MetadataError::InvalidInput(format!("not a playlist id or URL: {:?}", input)))?;
    let cache_key = format!("playlist:{}", id);
    if let Some(CachedPayload::Playlist(details)) = self.cached(&cache_key) {
      return Ok(details);
    }

    if self.api_key.is_none() {
      return self.playlist_from_embed(&id).await;
    }

    match self.playlist_from_api(&id).await {
      Ok(details) => {
        self.store(cache_key, CachedPayload::Playlist(details.clone()));
        Ok(details)
      }
      Err(e @ MetadataError::NotFound(_)) => Err(e),
      Err(e) => {
        warn!(err = %e, id = %id, "metadata: playlist API failed, falling back to embed info");
        self.playlist_from_embed(&id).await
      }
    }
  }

  async fn playlist_from_api(&self, id: &str) -> Result<PlaylistDetails> {
    let url = self.api_url("playlists", &[("part", "snippet,contentDetails"), ("id", id)])?;
    let list: ApiList = self.fetch_json(&url).await?;
    let item = list.items.into_iter().next().ok_or_else(|| MetadataError::NotFound(format!("playlist {}", id)))?;

    let (duration, videos) =
      futures::join!(self.get_playlist_duration(id), self.get_playlist_videos(id, constants().playlist_thumbnail_sample));

    let duration_secs = match duration {
      Ok(d) => crate::duration::duration_secs_or_zero(&d),
      Err(e) => {
        warn!(err = %e, id = %id, "metadata: playlist duration unavailable");
        0
      }
    };
    let first_video_thumb = match videos {
      Ok(v) => v.into_iter().next().map(|v| v.thumbnail).filter(|t| !t.is_empty()),
      Err(e) => {
        warn!(err = %e, id = %id, "metadata: playlist thumbnail lookup failed");
        None
      }
    };

    Ok(PlaylistDetails {
      id: id.to_string(),
      url: playlist_url(id),
      title: item.snippet.title,
      presenter: item.snippet.channel_title,
      item_count: item.content_details.item_count.unwrap_or(0),
      duration: format_duration(duration_secs),
      duration_secs,
      thumbnail: first_video_thumb.or_else(|| item.snippet.thumbnails.best()).unwrap_or_default(),
    })
  }

  async fn playlist_from_embed(&self, id: &str) -> Result<PlaylistDetails> {
    let url = playlist_url(id);
    let (info, measured) = futures::join!(self.embed_info(&url), self.measure_playlist(id));

    let measured = match measured {
      Ok(m) => Some(m),
      Err(e) => {
        warn!(err = %e, id = %id, "metadata: playlist duration unavailable");
        None
      }
    };
    let info = match info {
      Ok(info) => info,
      // A duration page still proves the playlist exists and usually names it.
      Err(e) if measured.as_ref().is_some_and(|m| m.title.is_some()) => {
        warn!(err = %e, id = %id, "metadata: embed info failed, using duration page title");
        EmbedInfo::default()
      }
      Err(e) => return Err(e),
    };

    let duration_secs = measured.as_ref().map_or(0, |m| m.total_secs);
    let title = info.title.or_else(|| measured.and_then(|m| m.title)).unwrap_or_else(|| id.to_string());
    Ok(PlaylistDetails {
      id: id.to_string(),
      title,
      presenter: info.author_name.unwrap_or_default(),
      item_count: 0,
      duration: format_duration(duration_secs),
      duration_secs,
      thumbnail: info.thumbnail_url.unwrap_or_default(),
      url,
    })
  }

  /// Total playlist duration as `HH:MM:SS`.
  ///
  /// The duration services are tried in their configured order and the first
  /// answer wins; individual failures are logged, not returned. Summing the
  /// durations of the playlist's videos through the API would be a third source,
  /// but it is not wired in.
  pub async fn get_playlist_duration(&self, input: &str) -> Result<String> {
    let id = extract_playlist_id(input)
      .ok_or_else(|| MetadataError::InvalidInput(format!("not a playlist id or URL: {:?}", input)))?;
    let cache_key = format!("playlistDuration:{}", id);
    if let Some(CachedPayload::PlaylistDuration(d)) = self.cached(&cache_key) {
      return Ok(d);
    }
    let measured = self.measure_playlist(&id).await?;
    let duration = format_duration(measured.total_secs);
    self.store(cache_key, CachedPayload::PlaylistDuration(duration.clone()));
    Ok(duration)
  }

  async fn measure_playlist(&self, id: &str) -> Result<ScrapedPlaylist> {
    for (idx, template) in constants().duration_services.iter().enumerate() {
      let url = match Url::parse(&template.replace("{id}", id)) {
        Ok(u) => u,
        Err(e) => {
          warn!(err = %e, service = idx, "metadata: bad duration service URL");
          continue;
        }
      };
      match self.fetch(&url).await {
        Ok(html) => match scrape_playlist(&html) {
          Some(scraped) => {
            debug!(service = idx, secs = scraped.total_secs, "metadata: playlist duration measured");
            return Ok(scraped);
          }
          None => warn!(service = idx, id = %id, "metadata: duration service page had no total"),
        },
        Err(e) => warn!(err = %e, service = idx, id = %id, "metadata: duration service failed"),
      }
    }
    Err(MetadataError::UpstreamUnavailable(format!("no duration service could measure playlist {}", id)))
  }

  /// First `max_results` entries of a playlist. Needs an API key.
  pub async fn get_playlist_videos(&self, input: &str, max_results: u32) -> Result<Vec<PlaylistVideo>> {
    let id = extract_playlist_id(input)
      .ok_or_else(|| MetadataError::InvalidInput(format!("not a playlist id or URL: {:?}", input)))?;
    let max_results = max_results.clamp(1, MAX_PAGE_SIZE);
    let cache_key = format!("playlistVideos:{}:{}", id, max_results);
    if let Some(CachedPayload::PlaylistVideos(v)) = self.cached(&cache_key) {
      return Ok(v);
    }
    if self.api_key.is_none() {
      return Err(MetadataError::MissingApiKey("list playlist videos".to_string()));
    }

    let max = max_results.to_string();
    let url = self.api_url("playlistItems", &[("part", "snippet,contentDetails"), ("playlistId", id.as_str()), ("maxResults", max.as_str())])?;
    let list: ApiList = self.fetch_json(&url).await?;
    let videos: Vec<PlaylistVideo> = list
      .items
      .into_iter()
      .filter_map(|item| {
        let video_id = item.content_details.video_id.or_else(|| item.snippet.resource_id.and_then(|r| r.video_id))?;
        Some(PlaylistVideo {
          thumbnail: item.snippet.thumbnails.best().unwrap_or_else(|| thumbnail_url(&video_id)),
          title: item.snippet.title,
          position: item.snippet.position,
          video_id,
        })
      })
      .collect();
    self.store(cache_key, CachedPayload::PlaylistVideos(videos.clone()));
    Ok(videos)
  }
}
