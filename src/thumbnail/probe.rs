//! Image probe trait and the HTTP implementation.
//!
//! A probe is one throwaway attempt to load an image and report its
//! intrinsic size. The [`ImageProbe`] trait is the seam between the
//! resolution ladder and the network, so the ladder can be tested against a
//! scripted backend.
//!
//! [`HttpProbe`] downloads the candidate with a blocking reqwest client and
//! reads the dimensions from the image header with the `image` crate. It does
//! not decode pixels.

use image::ImageReader;
use reqwest::blocking::Client;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a readable image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Intrinsic pixel size of a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Loads one image URL and reports its size.
///
/// `Sync` so a single probe can serve every resolution chain running on the
/// rayon pool.
pub trait ImageProbe: Sync {
    fn probe(&self, url: &str) -> Result<Dimensions, ProbeError>;
}

/// Probe backed by a real HTTP fetch.
pub struct HttpProbe {
    http: Client,
}

impl HttpProbe {
    /// `timeout` of `None` leaves completion entirely to the transport: a hung
    /// probe stalls only the one chain waiting on it.
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl ImageProbe for HttpProbe {
    fn probe(&self, url: &str) -> Result<Dimensions, ProbeError> {
        let response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }
        let body = response.bytes()?;
        let (width, height) = ImageReader::new(Cursor::new(body))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Dimensions { width, height })
    }
}
