//! Load, render and resolve: the whole page build in one call.
//!
//! ```text
//! FeedLoader ──▶ Gallery::show ──▶ RenderPass.jobs ──▶ rayon pool (detached)
//!                                                        │ one probe chain per job,
//!                                                        │ probes sequential inside it
//!                     Gallery::apply ◀── mpsc ◀──────────┘
//! ```
//!
//! The page structure is complete before the first probe is issued. Patches
//! are applied on the calling thread as each chain finishes, in completion
//! order.
//!
//! Chains run on a thread the build never joins. Waiting stops at the
//! deadline: remaining chains are cancelled before their next probe and
//! their slots stay pending, so a hung probe costs one thumbnail and never
//! the page.
//!
//! Cards whose thumbnail came back as the unverified last-resort variant get
//! one extra load check inside their chain, standing in for the `<img>` error
//! handler. A failure switches the card to its fixed fallback, and a failure
//! of that fallback is left broken.

use crate::feed::{FeedLoader, FeedSource};
use crate::gallery::{Gallery, ImageFailure, PatchOutcome, ThumbnailPatch};
use crate::page::{Epoch, ImageTarget};
use crate::player::PlayerSurface;
use crate::render::{RenderPass, ThumbnailJob};
use crate::thumbnail::{CancelToken, ImageProbe, Resolution, ThumbnailResolver};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Progress events, streamed to the CLI printer.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    FeedLoaded { playlists: usize, videos: usize },
    FeedFailed { message: String },
    Rendered { jobs: usize },
    Resolved {
        target: ImageTarget,
        url: String,
        verified: bool,
    },
    Dropped {
        target: ImageTarget,
        outcome: PatchOutcome,
    },
    FellBack {
        row: usize,
        index: usize,
        url: String,
    },
    Broken { row: usize, index: usize },
    /// The deadline passed with `pending` chains still running.
    TimedOut { pending: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Cause of a failed feed load; nothing else ran.
    pub feed_error: Option<String>,
    pub resolved: usize,
    pub dropped: usize,
    pub fell_back: usize,
    pub broken: usize,
    /// Slots left unresolved at the deadline.
    pub pending: usize,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.feed_error.is_none()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.feed_error {
            return write!(f, "feed failed: {err}");
        }
        write!(
            f,
            "{} resolved, {} fell back, {} broken",
            self.resolved, self.fell_back, self.broken
        )?;
        if self.pending > 0 {
            write!(f, ", {} pending", self.pending)?;
        }
        if self.dropped > 0 {
            write!(f, ", {} dropped", self.dropped)?;
        }
        Ok(())
    }
}

fn emit(events: &Option<Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Result of the extra load check a chain runs on its chosen URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadCheck {
    /// Seen loading by the ladder itself, or not a card.
    Verified,
    Loaded,
    FallbackLoaded,
    Failed,
}

/// One finished chain, sent back to the building thread.
struct Finished {
    job: ThumbnailJob,
    resolution: Resolution,
    check: LoadCheck,
}

/// Full build: load the feed, render it, resolve every thumbnail.
///
/// With a `deadline`, resolution stops waiting after that long and the page
/// is returned with whatever has been patched in by then.
pub fn build<S, P>(
    gallery: &mut Gallery<S>,
    source: &FeedSource,
    loader: &FeedLoader,
    resolver: &Arc<ThumbnailResolver<P>>,
    deadline: Option<Duration>,
    events: Option<Sender<BuildEvent>>,
) -> BuildReport
where
    S: PlayerSurface,
    P: ImageProbe + Send + 'static,
{
    let loaded = loader.load(source);
    let pass = gallery.show(&loaded, source);

    match &loaded {
        Ok(feed) => emit(
            &events,
            BuildEvent::FeedLoaded {
                playlists: feed.playlists.len(),
                videos: feed.video_count(),
            },
        ),
        Err(err) => {
            emit(
                &events,
                BuildEvent::FeedFailed {
                    message: err.to_string(),
                },
            );
            return BuildReport {
                feed_error: Some(err.to_string()),
                ..BuildReport::default()
            };
        }
    }

    emit(
        &events,
        BuildEvent::Rendered {
            jobs: pass.jobs.len(),
        },
    );
    resolve_thumbnails(gallery, pass, resolver, deadline, events)
}

/// Resolve every job of `pass` on the rayon pool and patch the results in.
pub fn resolve_thumbnails<S, P>(
    gallery: &mut Gallery<S>,
    pass: RenderPass,
    resolver: &Arc<ThumbnailResolver<P>>,
    deadline: Option<Duration>,
    events: Option<Sender<BuildEvent>>,
) -> BuildReport
where
    S: PlayerSurface,
    P: ImageProbe + Send + 'static,
{
    let RenderPass { epoch, jobs } = pass;
    let mut report = BuildReport::default();
    let mut outstanding = jobs.len();
    let cancel = CancelToken::new();
    let cutoff = deadline.map(|limit| Instant::now() + limit);
    let rx = spawn_chains(jobs, Arc::clone(resolver), cancel.clone());

    while outstanding > 0 {
        let next = match cutoff {
            Some(cutoff) => rx.recv_timeout(cutoff.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(finished) => {
                outstanding -= 1;
                apply_finished(gallery, epoch, finished, &mut report, &events);
            }
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!(pending = outstanding, "thumbnail deadline passed");
                report.pending = outstanding;
                emit(
                    &events,
                    BuildEvent::TimedOut {
                        pending: outstanding,
                    },
                );
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(%report, "thumbnails resolved");
    report
}

/// Start one chain per job on a detached thread. Cancelled chains send
/// nothing.
fn spawn_chains<P>(
    jobs: Vec<ThumbnailJob>,
    resolver: Arc<ThumbnailResolver<P>>,
    cancel: CancelToken,
) -> Receiver<Finished>
where
    P: ImageProbe + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        jobs.into_par_iter().for_each_with(tx, |tx, job| {
            let Some(resolution) = resolver.resolve_cancellable(&job.base, &cancel) else {
                return;
            };
            let check = check_loads(&resolver, &job, &resolution, &cancel);
            let _ = tx.send(Finished {
                job,
                resolution,
                check,
            });
        });
    });
    rx
}

fn check_loads<P: ImageProbe>(
    resolver: &ThumbnailResolver<P>,
    job: &ThumbnailJob,
    resolution: &Resolution,
    cancel: &CancelToken,
) -> LoadCheck {
    if resolution.is_verified() || job.target == ImageTarget::Featured {
        return LoadCheck::Verified;
    }
    if resolver.loads(&resolution.url) {
        return LoadCheck::Loaded;
    }
    match &job.fallback {
        Some(fallback) if !cancel.is_cancelled() && resolver.loads(fallback) => {
            LoadCheck::FallbackLoaded
        }
        _ => LoadCheck::Failed,
    }
}

fn apply_finished<S: PlayerSurface>(
    gallery: &mut Gallery<S>,
    epoch: Epoch,
    finished: Finished,
    report: &mut BuildReport,
    events: &Option<Sender<BuildEvent>>,
) {
    let Finished {
        job,
        resolution,
        check,
    } = finished;
    let verified = resolution.is_verified();
    let outcome = gallery.apply(ThumbnailPatch {
        epoch,
        target: job.target,
        url: resolution.url.clone(),
    });
    if outcome != PatchOutcome::Applied {
        report.dropped += 1;
        emit(
            events,
            BuildEvent::Dropped {
                target: job.target,
                outcome,
            },
        );
        return;
    }

    report.resolved += 1;
    emit(
        events,
        BuildEvent::Resolved {
            target: job.target,
            url: resolution.url,
            verified,
        },
    );

    let ImageTarget::Card { row, index } = job.target else {
        return;
    };
    match check {
        LoadCheck::Verified | LoadCheck::Loaded => {}
        LoadCheck::FallbackLoaded => {
            if let ImageFailure::FellBack(url) = gallery.image_failed(row, index) {
                report.fell_back += 1;
                emit(events, BuildEvent::FellBack { row, index, url });
            }
        }
        LoadCheck::Failed => {
            if let ImageFailure::FellBack(_) = gallery.image_failed(row, index) {
                gallery.image_failed(row, index);
            }
            warn!(row, index, "thumbnail and its fallback both failed to load");
            report.broken += 1;
            emit(events, BuildEvent::Broken { row, index });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalleryConfig;
    use crate::page::ImageState;
    use crate::thumbnail::probe::tests::{MockProbe, strip_query};
    use crate::thumbnail::{Dimensions, ProbeError};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const HOST: &str = "https://img.example.com";

    fn config() -> GalleryConfig {
        let mut config = GalleryConfig::default();
        config.providers.image_host = HOST.into();
        config.providers.embed_host = "https://embed.example.com".into();
        config
    }

    fn write_feed(tmp: &TempDir, body: &str) -> FeedSource {
        let path = tmp.path().join("videos.json");
        std::fs::write(&path, body).unwrap();
        FeedSource::Path(path)
    }

    fn run(body: &str, probe: MockProbe) -> (Gallery, BuildReport, Vec<BuildEvent>) {
        let tmp = TempDir::new().unwrap();
        let source = write_feed(&tmp, body);
        let mut gallery = Gallery::new(&config());
        let loader = FeedLoader::new().unwrap();
        let resolver = Arc::new(ThumbnailResolver::new(probe));
        let (tx, rx) = mpsc::channel();

        let report = build(&mut gallery, &source, &loader, &resolver, None, Some(tx));
        let events = rx.into_iter().collect();
        (gallery, report, events)
    }

    #[test]
    fn empty_feed_builds_without_probes() {
        let (gallery, report, events) =
            run(r#"{"featured":null,"playlists":[]}"#, MockProbe::new());

        assert!(report.is_success());
        assert_eq!(report.resolved, 0);
        assert!(!gallery.page().featured.visible);
        assert!(gallery.page().rows().is_empty());
        assert!(gallery.page().error_message().is_none());
        assert!(events.contains(&BuildEvent::Rendered { jobs: 0 }));
    }

    #[test]
    fn card_ends_up_with_only_loading_variant() {
        let probe = MockProbe::new().with(&format!("{HOST}/vi/abc/default.jpg"), 120, 90);
        let (gallery, report, _) = run(r#"{"playlists":[{"videos":[{"id":"abc"}]}]}"#, probe);

        let image = &gallery.page().card(0, 0).unwrap().image;
        assert_eq!(image.src.as_deref(), Some("https://img.example.com/vi/abc/default.jpg"));
        assert_eq!(image.state, ImageState::Resolved);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.fell_back, 0);
    }

    #[test]
    fn every_card_and_featured_is_patched() {
        let probe = MockProbe::new()
            .with(&format!("{HOST}/vi/f/maxresdefault.jpg"), 1280, 720)
            .with(&format!("{HOST}/vi/a/hqdefault.jpg"), 480, 360)
            .with(&format!("{HOST}/vi/b/sddefault.jpg"), 640, 480)
            .with("https://cdn/c/mqdefault.jpg", 320, 180);
        let (gallery, report, _) = run(
            r#"{
                "featured": {"id": "f"},
                "playlists": [
                    {"videos": [{"id": "a"}, {"id": "b"}]},
                    {"videos": [{"id": "c", "thumbBase": "https://cdn/c"}]}
                ]
            }"#,
            probe,
        );

        let page = gallery.page();
        assert_eq!(
            page.featured.background.as_deref(),
            Some("https://img.example.com/vi/f/maxresdefault.jpg")
        );
        assert_eq!(
            page.card(0, 0).unwrap().image.src.as_deref(),
            Some("https://img.example.com/vi/a/hqdefault.jpg")
        );
        assert_eq!(
            page.card(0, 1).unwrap().image.src.as_deref(),
            Some("https://img.example.com/vi/b/sddefault.jpg")
        );
        assert_eq!(
            page.card(1, 0).unwrap().image.src.as_deref(),
            Some("https://cdn/c/mqdefault.jpg")
        );
        assert_eq!(report.resolved, 4);
    }

    #[test]
    fn unloadable_fallback_variant_switches_to_fixed_thumbnail() {
        let probe = MockProbe::new().with(&format!("{HOST}/vi/abc/hqdefault.jpg"), 60, 45);
        let (gallery, report, events) =
            run(r#"{"playlists":[{"videos":[{"id":"abc"}]}]}"#, probe);

        let image = &gallery.page().card(0, 0).unwrap().image;
        assert_eq!(image.state, ImageState::FellBack);
        assert_eq!(
            image.src.as_deref(),
            Some("https://img.example.com/vi/abc/hqdefault.jpg")
        );
        assert_eq!(report.fell_back, 1);
        assert!(events.iter().any(|e| matches!(e, BuildEvent::FellBack { .. })));
    }

    #[test]
    fn dead_fallback_is_left_broken() {
        let (gallery, report, _) =
            run(r#"{"playlists":[{"videos":[{"id":"gone"}]}]}"#, MockProbe::new());

        let image = &gallery.page().card(0, 0).unwrap().image;
        assert_eq!(image.state, ImageState::Broken);
        assert_eq!(report.broken, 1);
    }

    #[test]
    fn missing_feed_reports_error_and_renders_message() {
        let tmp = TempDir::new().unwrap();
        let source = FeedSource::Path(tmp.path().join("videos.json"));
        let mut gallery = Gallery::new(&config());
        let resolver = Arc::new(ThumbnailResolver::new(MockProbe::new()));

        let report = build(
            &mut gallery,
            &source,
            &FeedLoader::new().unwrap(),
            &resolver,
            None,
            None,
        );

        assert!(!report.is_success());
        assert_eq!(
            gallery.page().error_message(),
            Some("Could not load videos.json. Check the log for details.")
        );
        assert!(resolver.probe().probed().is_empty());
    }

    #[test]
    fn stale_pass_is_dropped_after_rerender() {
        let mut gallery = Gallery::new(&config());
        let feed = crate::feed::parse_feed(r#"{"playlists":[{"videos":[{"id":"a"}]}]}"#).unwrap();
        let old = gallery.render(&feed);
        gallery.render(&feed);

        let resolver = Arc::new(ThumbnailResolver::new(MockProbe::new()));
        let report = resolve_thumbnails(&mut gallery, old, &resolver, None, None);

        assert_eq!(report.dropped, 1);
        assert_eq!(report.resolved, 0);
        assert!(gallery.page().card(0, 0).unwrap().image.src.is_none());
    }

    /// Answers like the wrapped mock, except that URLs under `stall` block
    /// until the gate's sender is dropped.
    struct StallingProbe {
        inner: MockProbe,
        stall: String,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl ImageProbe for StallingProbe {
        fn probe(&self, url: &str) -> Result<Dimensions, ProbeError> {
            if strip_query(url).starts_with(&self.stall) {
                let _ = self.gate.lock().unwrap().recv();
                return Err(ProbeError::Status(504));
            }
            self.inner.probe(url)
        }
    }

    #[test]
    fn stalled_chain_does_not_hold_back_the_page() {
        let tmp = TempDir::new().unwrap();
        // Stalled card last, so a single-threaded pool still reaches the others.
        let source = write_feed(
            &tmp,
            r#"{"playlists":[{"videos":[{"id":"ok1"},{"id":"ok2"},{"id":"stuck"}]}]}"#,
        );
        let (release, gate) = mpsc::channel::<()>();
        let probe = StallingProbe {
            inner: MockProbe::new()
                .with(&format!("{HOST}/vi/ok1/hqdefault.jpg"), 480, 360)
                .with(&format!("{HOST}/vi/ok2/hqdefault.jpg"), 480, 360),
            stall: format!("{HOST}/vi/stuck/"),
            gate: Mutex::new(gate),
        };
        let resolver = Arc::new(ThumbnailResolver::new(probe));
        let mut gallery = Gallery::new(&config());
        let (tx, rx) = mpsc::channel();

        let started = Instant::now();
        let report = build(
            &mut gallery,
            &source,
            &FeedLoader::new().unwrap(),
            &resolver,
            Some(Duration::from_millis(500)),
            Some(tx),
        );

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.resolved, 2);
        assert_eq!(report.pending, 1);
        let page = gallery.page();
        for index in 0..2 {
            assert_eq!(page.card(0, index).unwrap().image.state, ImageState::Resolved);
        }
        let stuck = &page.card(0, 2).unwrap().image;
        assert_eq!(stuck.state, ImageState::Pending);
        assert!(stuck.src.is_none());
        assert_eq!(
            stuck.fallback.as_deref(),
            Some("https://img.example.com/vi/stuck/hqdefault.jpg")
        );
        let events: Vec<BuildEvent> = rx.try_iter().collect();
        assert!(events.contains(&BuildEvent::TimedOut { pending: 1 }));

        drop(release);
    }

    #[test]
    fn report_display_counts_pending() {
        let report = BuildReport {
            resolved: 2,
            pending: 1,
            ..BuildReport::default()
        };
        assert_eq!(report.to_string(), "2 resolved, 0 fell back, 0 broken, 1 pending");
    }

    #[test]
    fn report_display() {
        let report = BuildReport {
            resolved: 3,
            fell_back: 1,
            ..BuildReport::default()
        };
        assert_eq!(report.to_string(), "3 resolved, 1 fell back, 0 broken");
    }
}
