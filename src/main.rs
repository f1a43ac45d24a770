use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use video_gal::feed::{FeedLoader, FeedSource};
use video_gal::gallery::Gallery;
use video_gal::thumbnail::{HttpProbe, ResolvedBy, ThumbnailResolver, default_base};
use video_gal::{config, generate, output, pipeline};

#[derive(Parser)]
#[command(name = "video-gal")]
#[command(about = "Static video gallery generator")]
#[command(long_about = "\
Static video gallery generator

Reads a JSON feed of playlists and renders a single page: a featured hero,
one horizontally scrolling row per playlist, and a modal embed player.
Thumbnails are probed at build time so every card ships the best variant
that actually exists.

Feed structure:

  {
    \"featured\": { \"id\": \"abc\", \"title\": \"Launch\", \"thumbnailBase\": \"...\" },
    \"playlists\": [
      { \"name\": \"Talks\", \"videos\": [ { \"id\": \"xyz\", \"title\": \"Keynote\" } ] }
    ]
  }

Every field is optional. Videos without an id render as plain cards.

Run 'video-gal gen-config' to generate a documented gallery.toml.
Set RUST_LOG (e.g. RUST_LOG=video_gal=debug) for probe-level logging.")]
#[command(version)]
struct Cli {
    /// Config file (optional; stock defaults when missing)
    #[arg(long, default_value = "gallery.toml", global = true)]
    config: PathBuf,

    /// Feed path or URL (overrides `feed` from the config)
    #[arg(long, global = true)]
    feed: Option<String>,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the feed, resolve thumbnails and write the page
    Build,
    /// Load the feed and print its structure without building
    Check,
    /// Resolve the thumbnail for one video id or thumbnail base URL
    Resolve {
        /// Video id, or a full base URL the variant names are appended to
        target: String,
    },
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Build => {
            let config = config::load_config(&cli.config)?;
            let source = feed_source(cli.feed.as_deref(), &config);
            init_thread_pool(&config.processing);

            println!("==> Loading {source}");
            let loader = FeedLoader::new()?;
            let resolver = Arc::new(ThumbnailResolver::new(HttpProbe::new(
                config.probe.timeout(),
            )?));
            let mut gallery = Gallery::new(&config);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report = pipeline::build(
                &mut gallery,
                &source,
                &loader,
                &resolver,
                Some(config.probe.deadline()),
                Some(tx),
            );
            if printer.join().is_err() {
                eprintln!("output thread panicked");
            }

            println!("==> Writing {}", cli.output.display());
            let index = generate::write_site(&gallery, &config, &cli.output)?;

            if let Some(err) = report.feed_error {
                return Err(format!("{source}: {err} (error page written to {})", index.display()).into());
            }
            println!("Thumbnails: {report}");
            println!("==> Build complete: {}", index.display());
        }
        Command::Check => {
            let config = config::load_config(&cli.config)?;
            let source = feed_source(cli.feed.as_deref(), &config);
            println!("==> Checking {source}");
            let feed = FeedLoader::new()?.load(&source)?;
            output::print_feed_summary(&feed);
            println!("==> Feed is valid");
        }
        Command::Resolve { target } => {
            let config = config::load_config(&cli.config)?;
            let base = resolve_base(&target, &config.providers.image_host);
            let resolver = ThumbnailResolver::new(HttpProbe::new(config.probe.timeout())?);
            let resolution = resolver.resolve(&base);
            match resolution.via {
                ResolvedBy::Probed(_) => println!("{}", resolution.url),
                ResolvedBy::Fallback => println!("{} (unverified)", resolution.url),
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG`; warnings and up by default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. User can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// The `--feed` flag wins over the configured feed.
fn feed_source(flag: Option<&str>, config: &config::GalleryConfig) -> FeedSource {
    FeedSource::parse(flag.unwrap_or(&config.feed))
}

/// A bare id resolves against the configured image host.
fn resolve_base(target: &str, image_host: &str) -> String {
    if target.contains('/') {
        target.to_string()
    } else {
        default_base(image_host, target)
    }
}
