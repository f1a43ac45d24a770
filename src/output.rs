//! CLI output formatting.
//!
//! Output leads with what a visitor would see (titles and positions) and puts
//! ids and URLs on indented context lines.
//!
//! ## Check
//!
//! ```text
//! Featured
//!     Launch day
//!         Id: abc
//!
//! Playlists
//! 001 Talks (2 videos)
//!     001 Keynote
//!         Id: xyz
//!     002 (untitled)
//!         Id: def
//! ```
//!
//! ## Build
//!
//! ```text
//! Featured → https://img.youtube.com/vi/abc/maxresdefault.jpg
//! 001/002 → https://img.youtube.com/vi/def/default.jpg (unverified)
//! 001/002 fell back → https://img.youtube.com/vi/def/hqdefault.jpg
//! ```
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::feed::{Feed, Video};
use crate::page::ImageTarget;
use crate::pipeline::BuildEvent;
use crate::render::{DEFAULT_FEATURED_TITLE, playlist_title};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn playlist_header(index: usize, title: &str, count: usize) -> String {
    let noun = if count == 1 { "video" } else { "videos" };
    format!("{} {} ({} {})", format_index(index), title, count, noun)
}

/// Titled videos show their title; untitled ones say so.
fn video_line(index: usize, video: &Video) -> String {
    match video.title.as_deref() {
        Some(title) => format!("{} {}", format_index(index), title),
        None => format!("{} (untitled)", format_index(index)),
    }
}

fn target_label(target: ImageTarget) -> String {
    match target {
        ImageTarget::Featured => "Featured".to_string(),
        ImageTarget::Card { row, index } => card_label(row, index),
    }
}

fn card_label(row: usize, index: usize) -> String {
    format!("{}/{}", format_index(row + 1), format_index(index + 1))
}

/// Format the structure of a feed, as `check` shows it.
pub fn format_feed_summary(feed: &Feed) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Featured".to_string());
    match feed.playable_featured() {
        Some(featured) => {
            let title = featured.title.as_deref().unwrap_or(DEFAULT_FEATURED_TITLE);
            lines.push(format!("{}{}", indent(1), title));
            lines.push(format!("{}Id: {}", indent(2), featured.id));
            if let Some(base) = &featured.thumbnail_base {
                lines.push(format!("{}Thumbnails: {}", indent(2), base));
            }
        }
        None => lines.push(format!("{}(hidden)", indent(1))),
    }

    lines.push(String::new());
    lines.push("Playlists".to_string());
    if feed.playlists.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, playlist) in feed.playlists.iter().enumerate() {
        lines.push(playlist_header(
            i + 1,
            &playlist_title(playlist, i),
            playlist.videos.len(),
        ));
        for (j, video) in playlist.videos.iter().enumerate() {
            lines.push(format!("{}{}", indent(1), video_line(j + 1, video)));
            if video.id.is_empty() {
                lines.push(format!("{}Id: (missing, not playable)", indent(2)));
            } else {
                lines.push(format!("{}Id: {}", indent(2), video.id));
            }
            if let Some(base) = &video.thumb_base {
                lines.push(format!("{}Thumbnails: {}", indent(2), base));
            }
        }
    }

    lines
}

pub fn print_feed_summary(feed: &Feed) {
    for line in format_feed_summary(feed) {
        println!("{}", line);
    }
}

/// Format one pipeline event. Most events are one line; some print nothing.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::FeedLoaded { playlists, videos } => {
            vec![format!("Feed: {playlists} playlists, {videos} videos")]
        }
        BuildEvent::FeedFailed { message } => vec![format!("Feed failed: {message}")],
        BuildEvent::Rendered { jobs } => vec![format!("Resolving {jobs} thumbnails")],
        BuildEvent::Resolved {
            target,
            url,
            verified,
        } => {
            let suffix = if *verified { "" } else { " (unverified)" };
            vec![format!("{} → {}{}", target_label(*target), url, suffix)]
        }
        BuildEvent::Dropped { .. } => Vec::new(),
        BuildEvent::FellBack { row, index, url } => {
            vec![format!("{} fell back → {}", card_label(*row, *index), url)]
        }
        BuildEvent::Broken { row, index } => {
            vec![format!("{} no thumbnail could be loaded", card_label(*row, *index))]
        }
        BuildEvent::TimedOut { pending } => {
            vec![format!("Deadline passed: {pending} thumbnails left on their fallback")]
        }
    }
}
