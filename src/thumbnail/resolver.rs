//! The resolution ladder and the probe loop that walks it.
//!
//! ```text
//! base/maxresdefault.jpg   1280×720 when present
//! base/sddefault.jpg        640×480
//! base/hqdefault.jpg        480×360
//! base/mqdefault.jpg        320×180
//! base/default.jpg          120×90, always present
//! ```
//!
//! Probes within one resolution are strictly sequential: the next candidate
//! is requested only after the previous one has failed. Each request carries
//! a fresh `cachebust` parameter so a cached placeholder or error from an
//! earlier attempt is never reused. The returned URL never includes it.

use super::probe::{Dimensions, ImageProbe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// Variant file names, highest expected resolution first.
pub const VARIANTS: [&str; 5] = [
    "maxresdefault.jpg",
    "sddefault.jpg",
    "hqdefault.jpg",
    "mqdefault.jpg",
    "default.jpg",
];

/// Smallest size that counts as a real thumbnail. The service's placeholder
/// for a missing variant is about this size or smaller.
pub const MIN_WIDTH: u32 = 120;
pub const MIN_HEIGHT: u32 = 90;

/// Variant an `<img>` falls back to when its resolved source fails to load.
pub const FALLBACK_VARIANT: &str = "hqdefault.jpg";

/// The five candidate URLs for `base`, in probe order.
pub fn candidates(base: &str) -> [String; 5] {
    let base = base.trim_end_matches('/');
    VARIANTS.map(|variant| format!("{base}/{variant}"))
}

/// Base URL the image service uses for a video id.
pub fn default_base(image_host: &str, video_id: &str) -> String {
    format!("{}/vi/{video_id}", image_host.trim_end_matches('/'))
}

/// Fixed thumbnail used when a rendered image fails to load.
pub fn fallback_url(image_host: &str, video_id: &str) -> String {
    format!("{}/{FALLBACK_VARIANT}", default_base(image_host, video_id))
}

/// Boundary inclusive: exactly 120×90 qualifies.
pub fn meets_threshold(dims: Dimensions) -> bool {
    dims.width >= MIN_WIDTH && dims.height >= MIN_HEIGHT
}

/// Produces a query parameter that is unique per attempt.
///
/// Wall-clock millis alone repeat when two probes start in the same
/// millisecond, so a process-wide counter is appended. Every buster shares
/// it, so tokens stay unique across resolvers too.
#[derive(Debug, Default)]
pub struct CacheBuster;

static BUST_COUNTER: AtomicU64 = AtomicU64::new(0);

impl CacheBuster {
    pub fn new() -> Self {
        Self
    }

    pub fn next_token(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let n = BUST_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{millis}-{n}")
    }

    pub fn bust(&self, url: &str) -> String {
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}cachebust={}", self.next_token())
    }
}

/// Shared flag that stops resolutions before their next probe.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    /// A probe of `VARIANTS[index]` met the size threshold.
    Probed(usize),
    /// Nothing qualified; the smallest variant was returned unchecked.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub via: ResolvedBy,
}

impl Resolution {
    /// Last rung of the ladder for `base`, returned without probing.
    pub fn fallback(base: &str) -> Self {
        let [.., last] = candidates(base);
        Self {
            url: last,
            via: ResolvedBy::Fallback,
        }
    }

    /// Whether a probe actually saw this image load.
    pub fn is_verified(&self) -> bool {
        matches!(self.via, ResolvedBy::Probed(_))
    }
}

/// Picks the best available thumbnail for a base URL.
///
/// Holds no per-resolution state: any number of resolutions can run against
/// one resolver at the same time, each an independent probe sequence.
pub struct ThumbnailResolver<P> {
    probe: P,
    buster: CacheBuster,
}

impl<P: ImageProbe> ThumbnailResolver<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            buster: CacheBuster::new(),
        }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Walk the ladder for `base`. Always returns exactly one URL.
    pub fn resolve(&self, base: &str) -> Resolution {
        self.walk(base, None)
            .unwrap_or_else(|| Resolution::fallback(base))
    }

    /// Like [`resolve`](Self::resolve), but gives up before the next probe
    /// once `cancel` is set. `None` means the resolution was abandoned.
    pub fn resolve_cancellable(&self, base: &str, cancel: &CancelToken) -> Option<Resolution> {
        self.walk(base, Some(cancel))
    }

    /// One extra load of an already-chosen URL, as an `<img>` would do.
    /// Any successful load counts; size doesn't matter here.
    pub fn loads(&self, url: &str) -> bool {
        self.probe.probe(&self.buster.bust(url)).is_ok()
    }

    fn walk(&self, base: &str, cancel: Option<&CancelToken>) -> Option<Resolution> {
        let candidates = candidates(base);
        for (index, candidate) in candidates.iter().enumerate() {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                debug!(base, "thumbnail resolution cancelled");
                return None;
            }
            match self.probe.probe(&self.buster.bust(candidate)) {
                Ok(dims) if meets_threshold(dims) => {
                    debug!(url = %candidate, dims.width, dims.height, "thumbnail resolved");
                    return Some(Resolution {
                        url: candidate.clone(),
                        via: ResolvedBy::Probed(index),
                    });
                }
                Ok(dims) => {
                    trace!(url = %candidate, dims.width, dims.height, "placeholder-sized, trying next");
                }
                Err(err) => {
                    trace!(url = %candidate, error = %err, "probe failed, trying next");
                }
            }
        }
        debug!(base, "no variant qualified, using smallest");
        Some(Resolution::fallback(base))
    }
}
