//! # Video Gal
//!
//! A static generator for single-page video galleries. A JSON feed describes
//! one featured video and any number of playlists; the output is one HTML page
//! with a hero section, a horizontally scrolling row per playlist, and a modal
//! embed player.
//!
//! # Architecture: Load, Render, Resolve, Write
//!
//! ```text
//! 1. Load      videos.json  →  Feed        (one request, no caching, no retry)
//! 2. Render    Feed         →  Page        (DOM-free page model, thumbnails pending)
//! 3. Resolve   Page         →  Page        (probe ladder per image, in parallel)
//! 4. Write     Page         →  dist/       (index.html + page.json)
//! ```
//!
//! Rendering never waits for thumbnails. Each render pass hands out a list of
//! jobs stamped with the pass's epoch; resolutions patch their slot only if
//! the epoch still matches, so a late answer for an old page is a no-op.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`feed`] | Feed types and the one-shot, cache-bypassing [`feed::FeedLoader`] |
//! | [`thumbnail`] | Variant ladder, size probing, cache-busting and cancellation |
//! | [`page`] | The page model: featured section, rows, cards, image states |
//! | [`render`] | Builds the page from a feed and issues thumbnail jobs |
//! | [`player`] | Two-state modal player behind a [`player::PlayerSurface`] |
//! | [`gallery`] | Page plus player: patches, image fallback, click routing |
//! | [`pipeline`] | Full build with parallel resolution and progress events |
//! | [`generate`] | Renders the final HTML using Maud |
//! | [`config`] | `gallery.toml` loading, validation, merging, and CSS generation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Probing at Build Time
//!
//! The image host answers a missing high-resolution variant with a tiny
//! placeholder instead of an error, so "did it load" is not enough. The
//! resolver walks from the largest variant down and accepts the first one at
//! least 120×90. Doing this during the build means the shipped page carries
//! final URLs and visitors never pay for the ladder.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/). Feed titles are
//! untrusted text and Maud escapes every interpolation by default.

pub mod config;
pub mod feed;
pub mod gallery;
pub mod generate;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod player;
pub mod render;
pub mod thumbnail;
