//! The gallery component: page, renderer and player wired together.
//!
//! [`Gallery`] is constructed once and owns everything the page needs at
//! runtime. User interaction comes in through [`Gallery::click`], which
//! dispatches the way a browser does. Handlers run from the clicked element
//! up through its ancestors until one of them stops propagation.
//!
//! ```text
//! FeaturedPlay ──▶ FeaturedSection          (play stops propagation)
//! ModalContent ──▶ ModalBackdrop            (backdrop closes only if clicked itself)
//! CloseButton  ──▶ ModalBackdrop
//! Card, Arrow                               (no handled ancestors)
//! ```

use crate::config::GalleryConfig;
use crate::feed::{Feed, FeedLoadError, FeedSource};
use crate::page::{Epoch, ImageState, ImageTarget, Page, Side};
use crate::player::{ModalView, PlayerModal, PlayerSurface};
use crate::render::{GalleryRenderer, RenderPass};
use tracing::{debug, error};

/// Something on the page that can be clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    FeaturedSection,
    FeaturedPlay,
    Card { row: usize, index: usize },
    Arrow { row: usize, side: Side },
    ModalBackdrop,
    ModalContent,
    CloseButton,
}

impl Target {
    /// Nearest ancestor that has a click handler.
    pub fn parent(self) -> Option<Target> {
        match self {
            Target::FeaturedPlay => Some(Target::FeaturedSection),
            Target::ModalContent | Target::CloseButton => Some(Target::ModalBackdrop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Propagation {
    Continue,
    Stop,
}

/// A finished thumbnail resolution, addressed to one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailPatch {
    pub epoch: Epoch,
    pub target: ImageTarget,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    /// The page was re-rendered since the job was issued.
    Stale,
    /// Same pass, but the slot no longer exists or isn't waiting.
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageFailure {
    /// Switched to the fixed fallback thumbnail.
    FellBack(String),
    /// Nothing left to try; the image stays broken.
    DeadEnd,
}

pub struct Gallery<S = ModalView> {
    page: Page,
    player: PlayerModal<S>,
    renderer: GalleryRenderer,
}

impl Gallery<ModalView> {
    pub fn new(config: &GalleryConfig) -> Self {
        Self::with_surface(config, ModalView::default())
    }
}

impl<S: PlayerSurface> Gallery<S> {
    pub fn with_surface(config: &GalleryConfig, surface: S) -> Self {
        Self {
            page: Page::new(config.layout.viewport_width),
            player: PlayerModal::with_surface(config.providers.embed_host.clone(), surface),
            renderer: GalleryRenderer::new(config),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn player(&self) -> &PlayerModal<S> {
        &self.player
    }

    pub fn render(&mut self, feed: &Feed) -> RenderPass {
        self.renderer.render(&mut self.page, feed)
    }

    /// Render a load outcome. A failed load logs its cause, shows the inline
    /// message, and leaves nothing to resolve.
    pub fn show(
        &mut self,
        loaded: &Result<Feed, FeedLoadError>,
        source: &FeedSource,
    ) -> RenderPass {
        match loaded {
            Ok(feed) => self.render(feed),
            Err(err) => {
                error!(source = %source, error = %err, "feed load failed");
                self.renderer
                    .render_error(&mut self.page, FeedLoadError::inline_message(source));
                RenderPass {
                    epoch: self.page.epoch(),
                    jobs: Vec::new(),
                }
            }
        }
    }

    /// Patch a resolved thumbnail in place. Late or misdirected patches are
    /// dropped without touching the page.
    pub fn apply(&mut self, patch: ThumbnailPatch) -> PatchOutcome {
        if patch.epoch != self.page.epoch() {
            debug!(slot = ?patch.target, epoch = patch.epoch, "dropping stale thumbnail");
            return PatchOutcome::Stale;
        }
        match patch.target {
            ImageTarget::Featured => {
                let section = &mut self.page.featured;
                if section.video_id.is_none() {
                    return PatchOutcome::Detached;
                }
                section.background = Some(patch.url);
            }
            ImageTarget::Card { row, index } => {
                let Some(card) = self.page.card_mut(row, index) else {
                    return PatchOutcome::Detached;
                };
                if card.image.state != ImageState::Pending {
                    return PatchOutcome::Detached;
                }
                card.image.src = Some(patch.url);
                card.image.state = ImageState::Resolved;
            }
        }
        PatchOutcome::Applied
    }

    /// A rendered card image failed to load its current source.
    ///
    /// The first failure switches to the fixed fallback. A failure of the
    /// fallback itself is final.
    pub fn image_failed(&mut self, row: usize, index: usize) -> ImageFailure {
        let Some(card) = self.page.card_mut(row, index) else {
            return ImageFailure::DeadEnd;
        };
        let image = &mut card.image;
        match (image.state, image.fallback.clone()) {
            (ImageState::Pending | ImageState::Resolved, Some(fallback)) => {
                image.src = Some(fallback.clone());
                image.state = ImageState::FellBack;
                ImageFailure::FellBack(fallback)
            }
            _ => {
                image.state = ImageState::Broken;
                ImageFailure::DeadEnd
            }
        }
    }

    /// Dispatch a click on `target`, bubbling to its ancestors.
    pub fn click(&mut self, target: Target) {
        let mut current = Some(target);
        while let Some(node) = current {
            if self.handle(node, target) == Propagation::Stop {
                break;
            }
            current = node.parent();
        }
    }

    fn handle(&mut self, node: Target, origin: Target) -> Propagation {
        match node {
            Target::FeaturedSection => {
                self.open_featured();
                Propagation::Continue
            }
            Target::FeaturedPlay => {
                self.open_featured();
                Propagation::Stop
            }
            Target::Card { row, index } => {
                let id = self
                    .page
                    .card(row, index)
                    .and_then(|c| c.video_id.clone());
                if let Some(id) = id {
                    self.player.open(&id);
                }
                Propagation::Continue
            }
            Target::Arrow { row, side } => {
                let request = self.renderer.arrow_scroll(self.page.viewport_width, side);
                if let Some(row) = self.page.row_mut(row) {
                    row.scroll_by(request);
                }
                Propagation::Continue
            }
            Target::ModalBackdrop => {
                if origin == Target::ModalBackdrop && self.player.is_open() {
                    self.player.close();
                }
                Propagation::Continue
            }
            Target::ModalContent => Propagation::Continue,
            Target::CloseButton => {
                self.player.close();
                Propagation::Continue
            }
        }
    }

    fn open_featured(&mut self) {
        if !self.page.featured.visible {
            return;
        }
        if let Some(id) = self.page.featured.video_id.clone() {
            self.player.open(&id);
        }
    }
}
