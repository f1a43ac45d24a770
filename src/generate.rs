//! HTML page generation.
//!
//! Turns the rendered [`Page`] and the player modal into a single static
//! `index.html`. Thumbnails are already resolved at this point, so the
//! shipped page needs no probing of its own.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html     # The gallery page
//! └── page.json      # The rendered page model, for inspection
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: base styles (colors and card sizes injected from config)
//! - `static/gallery.js`: modal player, scroll arrows, image fallback
//!
//! Every element the script addresses carries its stable id from
//! [`page::ids`](crate::page::ids), and the data it needs travels in `data-*`
//! attributes.

use crate::config::{self, GalleryConfig};
use crate::gallery::Gallery;
use crate::page::{Card, FeaturedSection, Page, PlaylistArea, PlaylistSection, ids};
use crate::player::ModalView;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/gallery.js");

pub const PAGE_TITLE: &str = "Videos";

/// Inline so it is attached before the browser starts loading the image.
/// Switches to `data-fallback` once, then gives up.
const IMG_ONERROR: &str = "this.onerror=null;\
    if(this.dataset.fallback&&this.src!==this.dataset.fallback)this.src=this.dataset.fallback";

/// Write `index.html` and `page.json` into `output_dir`.
///
/// Returns the path of the written page.
pub fn write_site(
    gallery: &Gallery,
    config: &GalleryConfig,
    output_dir: &Path,
) -> Result<PathBuf, GenerateError> {
    fs::create_dir_all(output_dir)?;

    let theme_css = config::generate_theme_css(&config.colors, &config.layout);
    let css = format!("{theme_css}\n\n{CSS_STATIC}");
    let document = render_document(gallery, config, &css);

    let index = output_dir.join("index.html");
    fs::write(&index, document.into_string())?;

    let json = serde_json::to_string_pretty(gallery.page())?;
    fs::write(output_dir.join("page.json"), json)?;

    Ok(index)
}

/// Renders the full HTML document.
pub fn render_document(gallery: &Gallery, config: &GalleryConfig, css: &str) -> Markup {
    let page = gallery.page();
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (PAGE_TITLE) }
                style { (PreEscaped(css)) }
            }
            body {
                (render_featured(&page.featured))
                (render_playlists(page, config.layout.scroll_fraction))
                (render_modal(gallery.player().surface(), &config.providers.embed_host))
                script { (PreEscaped(JS)) }
            }
        }
    }
}

fn featured_style(featured: &FeaturedSection) -> Option<String> {
    if !featured.visible {
        return Some("display:none".to_string());
    }
    featured
        .background
        .as_deref()
        .map(|url| format!("background-image:url(\"{}\")", css_url(url)))
}

/// Percent-encode the characters that could end a quoted CSS `url()`.
fn css_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            '"' => out.push_str("%22"),
            '\'' => out.push_str("%27"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '\\' => out.push_str("%5C"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders the featured hero section.
fn render_featured(featured: &FeaturedSection) -> Markup {
    html! {
        section id=(ids::FEATURED) style=[featured_style(featured)] data-video-id=[featured.video_id.as_deref()] {
            div.featured-overlay {
                h2 id=(ids::FEATURED_TITLE) { (featured.title) }
                button id=(ids::FEATURED_PLAY) type="button" aria-label="Play" { "▶ Play" }
            }
        }
    }
}

/// Renders the playlist container: every row, or the load error.
fn render_playlists(page: &Page, scroll_fraction: f64) -> Markup {
    html! {
        main id=(ids::PLAYLISTS) data-scroll-fraction=(scroll_fraction.to_string()) {
            @match &page.playlists {
                PlaylistArea::Error(message) => {
                    p.load-error { (message) }
                }
                PlaylistArea::Rows(sections) => {
                    @for (index, section) in sections.iter().enumerate() {
                        (render_playlist(index, section))
                    }
                }
            }
        }
    }
}

fn render_playlist(index: usize, section: &PlaylistSection) -> Markup {
    html! {
        section.playlist {
            h3 { (section.title) }
            div.row {
                div.arrow.left-arrow data-index=(index) { "❮" }
                div.row-inner id=(section.row.id) {
                    @for card in &section.row.cards {
                        (render_card(card))
                    }
                }
                div.arrow.right-arrow data-index=(index) { "❯" }
            }
        }
    }
}

fn render_card(card: &Card) -> Markup {
    let image = &card.image;
    // Still pending when the page is written: ship the fixed fallback.
    let src = image.src.as_deref().or(image.fallback.as_deref());
    html! {
        div.card data-video-id=[card.video_id.as_deref()] {
            img src=[src]
                data-fallback=[image.fallback.as_deref()]
                onerror=[image.fallback.as_ref().map(|_| IMG_ONERROR)]
                alt=(card.title.as_deref().unwrap_or_default())
                loading="lazy";
            @if let Some(title) = &card.title {
                div.card-title { (title) }
            }
        }
    }
}

/// Renders the player modal in its current state.
fn render_modal(view: &ModalView, embed_host: &str) -> Markup {
    let display = if view.visible {
        "display:flex"
    } else {
        "display:none"
    };
    let aria_hidden = if view.aria_hidden { "true" } else { "false" };
    html! {
        div.modal id=(ids::MODAL) style=(display) aria-hidden=(aria_hidden) data-embed-host=(embed_host.trim_end_matches('/')) {
            div.modal-content {
                button id=(ids::CLOSE) type="button" aria-label="Close" { "×" }
                iframe id=(ids::PLAYER) src=(view.player_src) allow="autoplay; encrypted-media; fullscreen" allowfullscreen {}
            }
        }
    }
}
