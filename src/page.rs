//! In-memory render surface.
//!
//! [`Page`] is everything the gallery draws into, modelled as plain data
//! instead of browser DOM nodes: the featured section, the playlist container
//! and the rows inside it. The renderer writes it, thumbnail patches update
//! it in place, and [`generate`](crate::generate) turns it into HTML.
//!
//! The host markup addresses each anchor by a stable id; [`ids`] lists them
//! so the renderer, the HTML output and the client script agree.

use serde::Serialize;

/// Stable element ids of the host page.
pub mod ids {
    pub const FEATURED: &str = "featured";
    pub const FEATURED_TITLE: &str = "featured-title";
    pub const FEATURED_PLAY: &str = "featured-play";
    pub const PLAYLISTS: &str = "playlists-container";
    pub const MODAL: &str = "playerModal";
    pub const PLAYER: &str = "ytplayer";
    pub const CLOSE: &str = "closeBtn";

    pub fn row(index: usize) -> String {
        format!("row-{index}")
    }
}

/// Monotonic counter identifying one render pass.
pub type Epoch = u64;

/// An image slot that a thumbnail resolution can patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageTarget {
    /// Background of the featured section.
    Featured,
    /// Image of the `index`-th card in row `row`.
    Card { row: usize, index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub(crate) epoch: Epoch,
    pub featured: FeaturedSection,
    pub playlists: PlaylistArea,
    /// Visible width given to every row, in CSS pixels.
    pub viewport_width: u32,
}

impl Page {
    pub fn new(viewport_width: u32) -> Self {
        Self {
            epoch: 0,
            featured: FeaturedSection::default(),
            playlists: PlaylistArea::default(),
            viewport_width,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn rows(&self) -> &[PlaylistSection] {
        match &self.playlists {
            PlaylistArea::Rows(rows) => rows,
            PlaylistArea::Error(_) => &[],
        }
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        match &mut self.playlists {
            PlaylistArea::Rows(rows) => rows.get_mut(index).map(|s| &mut s.row),
            PlaylistArea::Error(_) => None,
        }
    }

    pub fn card(&self, row: usize, index: usize) -> Option<&Card> {
        self.rows().get(row)?.row.cards.get(index)
    }

    pub fn card_mut(&mut self, row: usize, index: usize) -> Option<&mut Card> {
        self.row_mut(row)?.cards.get_mut(index)
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.playlists {
            PlaylistArea::Error(message) => Some(message),
            PlaylistArea::Rows(_) => None,
        }
    }
}

/// The hero block at the top of the page.
///
/// Starts visible and empty, the way the host markup ships it; rendering
/// either fills it or hides it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedSection {
    pub visible: bool,
    pub title: String,
    pub background: Option<String>,
    /// `None` means clicks on the section do nothing.
    pub video_id: Option<String>,
}

impl Default for FeaturedSection {
    fn default() -> Self {
        Self {
            visible: true,
            title: String::new(),
            background: None,
            video_id: None,
        }
    }
}

/// Contents of the playlist container: rows, or the single load error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlaylistArea {
    Rows(Vec<PlaylistSection>),
    Error(String),
}

impl Default for PlaylistArea {
    fn default() -> Self {
        PlaylistArea::Rows(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSection {
    pub title: String,
    pub row: Row,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScrollBehavior {
    Smooth,
}

/// A requested horizontal scroll, as the arrows issue it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollRequest {
    pub left: i64,
    pub behavior: ScrollBehavior,
}

/// Horizontally scrollable track of cards between two arrows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub id: String,
    pub cards: Vec<Card>,
    pub scroll_left: i64,
    pub viewport_width: u32,
    /// Total width of the cards; the track can't scroll past it.
    pub content_width: u32,
}

impl Row {
    pub fn max_scroll(&self) -> i64 {
        (i64::from(self.content_width) - i64::from(self.viewport_width)).max(0)
    }

    /// Apply a scroll the way a browser does: offset, clamped to the track.
    pub fn scroll_by(&mut self, request: ScrollRequest) {
        self.scroll_left = (self.scroll_left + request.left).clamp(0, self.max_scroll());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    /// `None` for videos without an id: shown, but not clickable.
    pub video_id: Option<String>,
    /// Omitted from the card entirely when `None`.
    pub title: Option<String>,
    pub image: CardImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageState {
    /// Rendered without a source, waiting for its resolution.
    Pending,
    Resolved,
    /// The resolved source failed to load; showing the fixed fallback.
    FellBack,
    /// The fallback failed too. Nothing more is tried.
    Broken,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardImage {
    pub src: Option<String>,
    pub fallback: Option<String>,
    pub state: ImageState,
}

impl CardImage {
    pub fn pending(fallback: Option<String>) -> Self {
        Self {
            src: None,
            fallback,
            state: ImageState::Pending,
        }
    }
}
