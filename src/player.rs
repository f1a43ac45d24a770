//! Modal video player.
//!
//! Two states, `Closed` and `Open(id)`. The modal owns its surface (the
//! overlay plus the embedded player frame) and is the only thing that
//! touches it:
//!
//! ```text
//!            open(id)                    open(other)
//! Closed ─────────────▶ Open(id) ─────────────────────▶ Open(other)
//!    ▲                     │                 (source swap, stays open)
//!    └──── close() ────────┘
//! ```
//!
//! Closing always clears the player source. Hiding the frame alone would
//! leave the video playing with sound in the background.

use serde::Serialize;

/// Embeddable player URL for a video id, with autoplay requested.
pub fn embed_url(embed_host: &str, video_id: &str) -> String {
    format!(
        "{}/embed/{video_id}?autoplay=1",
        embed_host.trim_end_matches('/')
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum PlayerState {
    #[default]
    Closed,
    Open(String),
}

/// What the modal draws on.
pub trait PlayerSurface {
    /// Player frame source; empty string unloads it.
    fn set_source(&mut self, src: &str);
    /// Overlay visibility. Implementations keep `aria-hidden` in step.
    fn set_visible(&mut self, visible: bool);
}

/// The modal overlay and its player frame, as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub visible: bool,
    pub aria_hidden: bool,
    pub player_src: String,
}

impl Default for ModalView {
    fn default() -> Self {
        Self {
            visible: false,
            aria_hidden: true,
            player_src: String::new(),
        }
    }
}

impl PlayerSurface for ModalView {
    fn set_source(&mut self, src: &str) {
        self.player_src = src.to_string();
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.aria_hidden = !visible;
    }
}

pub struct PlayerModal<S = ModalView> {
    state: PlayerState,
    surface: S,
    embed_host: String,
}

impl PlayerModal<ModalView> {
    pub fn new(embed_host: impl Into<String>) -> Self {
        Self::with_surface(embed_host, ModalView::default())
    }
}

impl<S: PlayerSurface> PlayerModal<S> {
    pub fn with_surface(embed_host: impl Into<String>, surface: S) -> Self {
        Self {
            state: PlayerState::Closed,
            surface,
            embed_host: embed_host.into(),
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PlayerState::Open(_))
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Returns `false` (and changes nothing) for an empty id.
    pub fn open(&mut self, video_id: &str) -> bool {
        if video_id.is_empty() {
            return false;
        }
        self.surface
            .set_source(&embed_url(&self.embed_host, video_id));
        self.surface.set_visible(true);
        self.state = PlayerState::Open(video_id.to_string());
        true
    }

    pub fn close(&mut self) {
        self.surface.set_visible(false);
        self.surface.set_source("");
        self.state = PlayerState::Closed;
    }
}
