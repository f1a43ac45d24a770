//! Progressive thumbnail resolution.
//!
//! The image service publishes every video thumbnail at several fixed
//! resolutions under one base URL. Higher variants do not always exist, and
//! when they don't the service answers with a small placeholder image rather
//! than an HTTP error. The only reliable existence signal is therefore the
//! decoded size of what comes back.
//!
//! [`ThumbnailResolver`] walks the resolution ladder from the best variant
//! down, probing one candidate at a time through an [`ImageProbe`], and
//! settles on the first image that is at least [`MIN_WIDTH`]×[`MIN_HEIGHT`].
//! If nothing qualifies it returns the smallest variant, which the service
//! always serves, so every resolution ends with exactly one usable URL.
//!
//! | Module | Role |
//! |--------|------|
//! | [`probe`] | The [`ImageProbe`] seam and its HTTP implementation |
//! | [`resolver`] | Candidate ladder, cache busting and the probe loop |

pub mod probe;
pub mod resolver;

pub use probe::{Dimensions, HttpProbe, ImageProbe, ProbeError};
pub use resolver::{
    CacheBuster, CancelToken, FALLBACK_VARIANT, MIN_HEIGHT, MIN_WIDTH, Resolution, ResolvedBy,
    ThumbnailResolver, VARIANTS, candidates, default_base, fallback_url, meets_threshold,
};
