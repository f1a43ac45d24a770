//! Gallery rendering.
//!
//! [`GalleryRenderer::render`] builds the whole page structure from a feed in
//! one synchronous pass. Images are left pending; instead of waiting on them
//! the pass hands back one [`ThumbnailJob`] per image slot, each tagged with
//! the pass's epoch. Resolutions for those jobs finish in any order and are
//! patched in later. A patch from an older epoch no longer matches the page
//! and is dropped.
//!
//! The playlist container is owned outright by the renderer: every render
//! replaces it wholesale, with no diffing against the previous pass.

use crate::config::{GalleryConfig, LayoutConfig};
use crate::feed::{FeaturedVideo, Feed, Playlist};
use crate::page::{
    Card, CardImage, Epoch, ImageTarget, Page, PlaylistArea, PlaylistSection, Row,
    ScrollBehavior, ScrollRequest, Side, ids,
};
use crate::thumbnail::{default_base, fallback_url};
use tracing::debug;

pub const DEFAULT_FEATURED_TITLE: &str = "Featured";

/// One image slot waiting for a thumbnail resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailJob {
    pub target: ImageTarget,
    /// Base URL the candidate variants are appended to.
    pub base: String,
    /// Fixed thumbnail a card switches to if its resolved source won't load.
    pub fallback: Option<String>,
}

/// Output of one render: its epoch and the thumbnails it still needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPass {
    pub epoch: Epoch,
    pub jobs: Vec<ThumbnailJob>,
}

/// `round(fraction × visible width)`, negative when scrolling left.
pub fn scroll_amount(viewport_width: u32, fraction: f64, side: Side) -> i64 {
    let magnitude = (f64::from(viewport_width) * fraction).round() as i64;
    match side {
        Side::Left => -magnitude,
        Side::Right => magnitude,
    }
}

pub fn playlist_title(playlist: &Playlist, index: usize) -> String {
    playlist
        .name
        .clone()
        .unwrap_or_else(|| format!("Playlist {}", index + 1))
}

pub struct GalleryRenderer {
    image_host: String,
    layout: LayoutConfig,
}

impl GalleryRenderer {
    pub fn new(config: &GalleryConfig) -> Self {
        Self {
            image_host: config.providers.image_host.clone(),
            layout: config.layout.clone(),
        }
    }

    /// Rebuild `page` from `feed`, returning the thumbnail work to do.
    pub fn render(&self, page: &mut Page, feed: &Feed) -> RenderPass {
        page.epoch += 1;
        let mut jobs = Vec::new();

        if let Some(job) = self.render_featured(page, feed.featured.as_ref()) {
            jobs.push(job);
        }

        let mut sections = Vec::with_capacity(feed.playlists.len());
        for (row_index, playlist) in feed.playlists.iter().enumerate() {
            let (section, row_jobs) = self.render_playlist(page.viewport_width, row_index, playlist);
            sections.push(section);
            jobs.extend(row_jobs);
        }
        page.playlists = PlaylistArea::Rows(sections);

        debug!(epoch = page.epoch, jobs = jobs.len(), "page rendered");
        RenderPass {
            epoch: page.epoch,
            jobs,
        }
    }

    /// Replace the playlist area with a single message.
    ///
    /// The featured section is left exactly as it was.
    pub fn render_error(&self, page: &mut Page, message: impl Into<String>) {
        page.epoch += 1;
        page.playlists = PlaylistArea::Error(message.into());
    }

    /// Signed scroll for one arrow click on a row of the given width.
    pub fn arrow_scroll(&self, viewport_width: u32, side: Side) -> ScrollRequest {
        ScrollRequest {
            left: scroll_amount(viewport_width, self.layout.scroll_fraction, side),
            behavior: ScrollBehavior::Smooth,
        }
    }

    fn render_featured(
        &self,
        page: &mut Page,
        featured: Option<&FeaturedVideo>,
    ) -> Option<ThumbnailJob> {
        let section = &mut page.featured;
        let Some(featured) = featured.filter(|f| !f.id.is_empty()) else {
            section.visible = false;
            section.video_id = None;
            return None;
        };

        section.visible = true;
        section.title = featured
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_FEATURED_TITLE.to_string());
        section.background = None;
        section.video_id = Some(featured.id.clone());

        let base = featured
            .thumbnail_base
            .clone()
            .unwrap_or_else(|| default_base(&self.image_host, &featured.id));
        Some(ThumbnailJob {
            target: ImageTarget::Featured,
            base,
            fallback: None,
        })
    }

    fn render_playlist(
        &self,
        viewport_width: u32,
        row_index: usize,
        playlist: &Playlist,
    ) -> (PlaylistSection, Vec<ThumbnailJob>) {
        let mut cards = Vec::with_capacity(playlist.videos.len());
        let mut jobs = Vec::with_capacity(playlist.videos.len());

        for (index, video) in playlist.videos.iter().enumerate() {
            let video_id = Some(video.id.clone()).filter(|id| !id.is_empty());
            let fallback = video_id
                .as_deref()
                .map(|id| fallback_url(&self.image_host, id));
            let base = match (&video.thumb_base, &video_id) {
                (Some(base), _) => Some(base.clone()),
                (None, Some(id)) => Some(default_base(&self.image_host, id)),
                (None, None) => None,
            };
            if let Some(base) = base {
                jobs.push(ThumbnailJob {
                    target: ImageTarget::Card {
                        row: row_index,
                        index,
                    },
                    base,
                    fallback: fallback.clone(),
                });
            }
            cards.push(Card {
                video_id,
                title: video.title.clone(),
                image: CardImage::pending(fallback),
            });
        }

        let row = Row {
            id: ids::row(row_index),
            content_width: self.content_width(cards.len()),
            cards,
            scroll_left: 0,
            viewport_width,
        };
        let section = PlaylistSection {
            title: playlist_title(playlist, row_index),
            row,
        };
        (section, jobs)
    }

    fn content_width(&self, cards: usize) -> u32 {
        let cards = u32::try_from(cards).unwrap_or(u32::MAX);
        let gaps = cards.saturating_sub(1);
        cards
            .saturating_mul(self.layout.card_width)
            .saturating_add(gaps.saturating_mul(self.layout.card_gap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Video, parse_feed};
    use crate::page::ImageState;

    fn renderer() -> GalleryRenderer {
        let mut config = GalleryConfig::default();
        config.providers.image_host = "https://img.example.com".into();
        GalleryRenderer::new(&config)
    }

    fn video(id: &str, title: Option<&str>) -> Video {
        Video {
            id: id.to_string(),
            title: title.map(String::from),
            thumb_base: None,
        }
    }

    #[test]
    fn empty_feed_hides_featured_and_clears_rows() {
        let mut page = Page::new(1280);
        let feed = parse_feed(r#"{"featured":null,"playlists":[]}"#).unwrap();

        let pass = renderer().render(&mut page, &feed);

        assert!(!page.featured.visible);
        assert!(page.rows().is_empty());
        assert!(page.error_message().is_none());
        assert!(pass.jobs.is_empty());
    }

    #[test]
    fn featured_without_id_issues_no_probe() {
        let mut page = Page::new(1280);
        let feed = parse_feed(r#"{"featured":{"id":"","title":"Hidden"}}"#).unwrap();

        let pass = renderer().render(&mut page, &feed);

        assert!(!page.featured.visible);
        assert!(page.featured.video_id.is_none());
        assert!(!pass.jobs.iter().any(|j| j.target == ImageTarget::Featured));
    }

    #[test]
    fn featured_defaults_title_and_base() {
        let mut page = Page::new(1280);
        let feed = parse_feed(r#"{"featured":{"id":"f1"}}"#).unwrap();

        let pass = renderer().render(&mut page, &feed);

        assert!(page.featured.visible);
        assert_eq!(page.featured.title, "Featured");
        assert_eq!(page.featured.video_id.as_deref(), Some("f1"));
        assert_eq!(
            pass.jobs,
            vec![ThumbnailJob {
                target: ImageTarget::Featured,
                base: "https://img.example.com/vi/f1".into(),
                fallback: None,
            }]
        );
    }

    #[test]
    fn featured_uses_custom_thumbnail_base() {
        let mut page = Page::new(1280);
        let feed = parse_feed(
            r#"{"featured":{"id":"f1","title":"Launch","thumbnailBase":"https://cdn/f1"}}"#,
        )
        .unwrap();

        let pass = renderer().render(&mut page, &feed);

        assert_eq!(page.featured.title, "Launch");
        assert_eq!(pass.jobs[0].base, "https://cdn/f1");
    }

    #[test]
    fn playlists_keep_feed_order_and_default_titles() {
        let mut page = Page::new(1280);
        let feed = Feed {
            featured: None,
            playlists: vec![
                Playlist {
                    name: Some("Talks".into()),
                    videos: vec![video("c", Some("C")), video("a", None), video("b", Some("B"))],
                },
                Playlist {
                    name: None,
                    videos: vec![],
                },
            ],
        };

        renderer().render(&mut page, &feed);

        let rows = page.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Talks");
        assert_eq!(rows[1].title, "Playlist 2");

        let ids: Vec<_> = rows[0]
            .row
            .cards
            .iter()
            .map(|c| c.video_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(rows[0].row.cards[1].title.is_none());
    }

    #[test]
    fn empty_playlist_renders_row_shell() {
        let mut page = Page::new(1280);
        let feed = parse_feed(r#"{"playlists":[{"name":"Empty","videos":[]}]}"#).unwrap();

        renderer().render(&mut page, &feed);

        let section = &page.rows()[0];
        assert_eq!(section.row.id, "row-0");
        assert!(section.row.cards.is_empty());
        assert_eq!(section.row.content_width, 0);
    }

    #[test]
    fn cards_start_pending_with_fallback() {
        let mut page = Page::new(1280);
        let feed = parse_feed(r#"{"playlists":[{"videos":[{"id":"abc"}]}]}"#).unwrap();

        let pass = renderer().render(&mut page, &feed);

        let card = page.card(0, 0).unwrap();
        assert_eq!(card.image.state, ImageState::Pending);
        assert!(card.image.src.is_none());
        assert_eq!(
            card.image.fallback.as_deref(),
            Some("https://img.example.com/vi/abc/hqdefault.jpg")
        );
        assert_eq!(
            pass.jobs,
            vec![ThumbnailJob {
                target: ImageTarget::Card { row: 0, index: 0 },
                base: "https://img.example.com/vi/abc".into(),
                fallback: Some("https://img.example.com/vi/abc/hqdefault.jpg".into()),
            }]
        );
    }

    #[test]
    fn video_without_id_is_rendered_but_not_clickable() {
        let mut page = Page::new(1280);
        let feed = parse_feed(
            r#"{"playlists":[{"videos":[{"title":"Orphan"},{"title":"Custom","thumbBase":"https://cdn/t"}]}]}"#,
        )
        .unwrap();

        let pass = renderer().render(&mut page, &feed);

        let orphan = page.card(0, 0).unwrap();
        assert!(orphan.video_id.is_none());
        assert!(orphan.image.fallback.is_none());
        assert_eq!(orphan.title.as_deref(), Some("Orphan"));
        // Only the card with an explicit base gets a resolution.
        assert_eq!(pass.jobs.len(), 1);
        assert_eq!(pass.jobs[0].base, "https://cdn/t");
    }

    #[test]
    fn each_render_bumps_epoch_and_replaces_rows() {
        let mut page = Page::new(1280);
        let renderer = renderer();
        let first = parse_feed(r#"{"playlists":[{"videos":[{"id":"a"}]},{"videos":[]}]}"#).unwrap();
        let second = parse_feed(r#"{"playlists":[{"videos":[]}]}"#).unwrap();

        let pass1 = renderer.render(&mut page, &first);
        let pass2 = renderer.render(&mut page, &second);

        assert_eq!(pass1.epoch + 1, pass2.epoch);
        assert_eq!(page.rows().len(), 1);
        assert!(page.card(0, 0).is_none());
    }

    #[test]
    fn render_error_leaves_featured_alone() {
        let mut page = Page::new(1280);
        renderer().render_error(&mut page, "Could not load videos.json");

        assert!(page.featured.visible);
        assert_eq!(page.error_message(), Some("Could not load videos.json"));
    }

    #[test]
    fn scroll_amount_is_seventy_percent_signed() {
        assert_eq!(scroll_amount(1000, 0.7, Side::Right), 700);
        assert_eq!(scroll_amount(1000, 0.7, Side::Left), -700);
        assert_eq!(scroll_amount(333, 0.7, Side::Right), 233);
        assert_eq!(scroll_amount(0, 0.7, Side::Left), 0);
    }

    #[test]
    fn content_width_counts_gaps_between_cards() {
        let renderer = renderer();
        assert_eq!(renderer.content_width(0), 0);
        assert_eq!(renderer.content_width(1), 280);
        assert_eq!(renderer.content_width(3), 3 * 280 + 2 * 12);
    }
}
