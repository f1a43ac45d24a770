//! Feed model and loading.
//!
//! The feed is a single JSON document describing the featured video and the
//! playlists. Its field names are an external contract:
//!
//! ```json
//! {
//!   "featured": { "id": "abc", "title": "Launch", "thumbnailBase": "https://cdn/vi/abc" },
//!   "playlists": [
//!     { "name": "Talks", "videos": [ { "id": "xyz", "title": "Keynote", "thumbBase": null } ] }
//!   ]
//! }
//! ```
//!
//! Everything is optional. `null`, a missing key and an empty string all mean
//! "absent". A featured entry without an id disables the featured section and
//! a video without an id renders as a non-clickable card; neither is an error.
//!
//! ## Loading
//!
//! [`FeedLoader`] performs exactly one request (or one file read) per call and
//! never retries. HTTP requests ask every cache on the way to stay out of it,
//! so the current version of the feed is always what gets rendered.

use reqwest::blocking::Client;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, instrument};

/// File name used when the feed source has no usable name of its own.
pub const DEFAULT_FEED_NAME: &str = "videos.json";

#[derive(Error, Debug)]
pub enum FeedLoadError {
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        source: reqwest::Error,
    },
    #[error("failed to load {url} (HTTP {status})")]
    Status { url: String, status: u16 },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed feed: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FeedLoadError {
    /// The one line a visitor sees in place of the playlists.
    ///
    /// Deliberately static: the cause goes to the log, not to the page.
    pub fn inline_message(source: &FeedSource) -> String {
        format!("Could not load {}. Check the log for details.", source.name())
    }
}

/// Top-level feed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub featured: Option<FeaturedVideo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub playlists: Vec<Playlist>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturedVideo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub title: Option<String>,
    /// URL prefix the thumbnail variants are appended to.
    #[serde(
        rename = "thumbnailBase",
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail_base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default, deserialize_with = "non_empty")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub title: Option<String>,
    #[serde(
        rename = "thumbBase",
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumb_base: Option<String>,
}

impl Feed {
    /// The featured entry, only if it is playable.
    pub fn playable_featured(&self) -> Option<&FeaturedVideo> {
        self.featured.as_ref().filter(|f| !f.id.is_empty())
    }

    pub fn video_count(&self) -> usize {
        self.playlists.iter().map(|p| p.videos.len()).sum()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

/// Parse a feed document, applying the "absent means empty" rules.
pub fn parse_feed(body: &str) -> Result<Feed, serde_json::Error> {
    serde_json::from_str(body)
}

/// Where the feed comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(String),
    Path(PathBuf),
}

impl FeedSource {
    /// `http://` and `https://` are fetched; anything else is a local file.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            FeedSource::Url(raw.to_string())
        } else {
            FeedSource::Path(PathBuf::from(raw))
        }
    }

    /// Short name of the document, used in the inline error.
    pub fn name(&self) -> String {
        let name = match self {
            FeedSource::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or_default();
                path.rsplit('/').next().unwrap_or_default().to_string()
            }
            FeedSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        if name.is_empty() {
            DEFAULT_FEED_NAME.to_string()
        } else {
            name
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Url(url) => f.write_str(url),
            FeedSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Loads the feed with a single, uncached request.
pub struct FeedLoader {
    http: Client,
}

impl FeedLoader {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(Client::builder().build()?))
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    #[instrument(skip_all, fields(source = %source))]
    pub fn load(&self, source: &FeedSource) -> Result<Feed, FeedLoadError> {
        let body = match source {
            FeedSource::Url(url) => self.fetch(url)?,
            FeedSource::Path(path) => {
                std::fs::read_to_string(path).map_err(|source| FeedLoadError::Io {
                    path: path.clone(),
                    source,
                })?
            }
        };
        let feed = parse_feed(&body)?;
        debug!(
            playlists = feed.playlists.len(),
            videos = feed.video_count(),
            "feed loaded"
        );
        Ok(feed)
    }

    fn fetch(&self, url: &str) -> Result<String, FeedLoadError> {
        let network = |source: reqwest::Error| FeedLoadError::Network {
            url: url.to_string(),
            source,
        };
        let response = self
            .http
            .get(url)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedLoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_object_is_an_empty_feed() {
        let feed = parse_feed("{}").unwrap();
        assert_eq!(feed, Feed::default());
    }

    #[test]
    fn nulls_are_treated_as_absent() {
        let feed = parse_feed(r#"{"featured":null,"playlists":null}"#).unwrap();
        assert!(feed.featured.is_none());
        assert!(feed.playlists.is_empty());
    }

    #[test]
    fn parses_external_field_names() {
        let feed = parse_feed(
            r#"{
                "featured": {"id": "f1", "title": "Launch", "thumbnailBase": "https://cdn/f1"},
                "playlists": [
                    {"name": "Talks", "videos": [{"id": "v1", "title": "One", "thumbBase": "https://cdn/v1"}]}
                ]
            }"#,
        )
        .unwrap();

        let featured = feed.featured.as_ref().unwrap();
        assert_eq!(featured.id, "f1");
        assert_eq!(featured.thumbnail_base.as_deref(), Some("https://cdn/f1"));
        assert_eq!(feed.playlists[0].name.as_deref(), Some("Talks"));
        assert_eq!(
            feed.playlists[0].videos[0].thumb_base.as_deref(),
            Some("https://cdn/v1")
        );
    }

    #[test]
    fn empty_strings_become_none() {
        let feed = parse_feed(
            r#"{"playlists":[{"name":"","videos":[{"id":"v","title":"","thumbBase":""}]}]}"#,
        )
        .unwrap();
        let playlist = &feed.playlists[0];
        assert!(playlist.name.is_none());
        assert!(playlist.videos[0].title.is_none());
        assert!(playlist.videos[0].thumb_base.is_none());
    }

    #[test]
    fn featured_without_id_is_not_playable() {
        let feed = parse_feed(r#"{"featured":{"title":"No id"}}"#).unwrap();
        assert!(feed.featured.is_some());
        assert!(feed.playable_featured().is_none());

        let feed = parse_feed(r#"{"featured":{"id":""}}"#).unwrap();
        assert!(feed.playable_featured().is_none());
    }

    #[test]
    fn video_order_is_preserved() {
        let feed = parse_feed(
            r#"{"playlists":[{"videos":[{"id":"c"},{"id":"a"},{"id":"b"}]}]}"#,
        )
        .unwrap();
        let ids: Vec<&str> = feed.playlists[0]
            .videos
            .iter()
            .map(|v| v.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(parse_feed("{ not json").is_err());
        assert!(parse_feed(r#"{"playlists": 3}"#).is_err());
    }

    #[test]
    fn source_parse_distinguishes_urls_and_paths() {
        assert_eq!(
            FeedSource::parse("https://example.com/videos.json"),
            FeedSource::Url("https://example.com/videos.json".into())
        );
        assert_eq!(
            FeedSource::parse("site/videos.json"),
            FeedSource::Path(PathBuf::from("site/videos.json"))
        );
    }

    #[test]
    fn source_name_strips_query_and_directories() {
        assert_eq!(
            FeedSource::parse("https://example.com/data/feed.json?v=2").name(),
            "feed.json"
        );
        assert_eq!(FeedSource::parse("https://example.com/").name(), "videos.json");
        assert_eq!(FeedSource::parse("a/b/videos.json").name(), "videos.json");
    }

    #[test]
    fn inline_message_names_the_feed() {
        let source = FeedSource::parse("videos.json");
        assert_eq!(
            FeedLoadError::inline_message(&source),
            "Could not load videos.json. Check the log for details."
        );
    }

    #[test]
    fn load_reads_local_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("videos.json");
        std::fs::write(&path, r#"{"playlists":[{"name":"A","videos":[]}]}"#).unwrap();

        let loader = FeedLoader::new().unwrap();
        let feed = loader.load(&FeedSource::Path(path)).unwrap();
        assert_eq!(feed.playlists.len(), 1);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let loader = FeedLoader::new().unwrap();
        let result = loader.load(&FeedSource::Path(tmp.path().join("missing.json")));
        assert!(matches!(result, Err(FeedLoadError::Io { .. })));
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("videos.json");
        std::fs::write(&path, "<html>oops</html>").unwrap();

        let loader = FeedLoader::new().unwrap();
        let result = loader.load(&FeedSource::Path(path));
        assert!(matches!(result, Err(FeedLoadError::Parse(_))));
    }
}
