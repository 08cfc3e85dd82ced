//! Off-screen rasterization of the current polygon onto a copy of the source
//! image, encoded for upload (submission variant) or for chat history
//! (preview variant).

use std::io::Cursor;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::Polygon;
use crate::color::{self, Rgba};
use crate::raster;

pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;
pub const DEFAULT_LOSSY_QUALITY: f32 = 0.92;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("cannot acquire a {width}x{height} drawing surface")]
    Context { width: u32, height: u32 },
    #[error("cannot rasterize an empty {width}x{height} surface")]
    EmptySurface { width: u32, height: u32 },
    #[error("cannot encode composited image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("composite worker stopped before producing a result")]
    WorkerLost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskVariant {
    /// Transparent fill, stroke only: the region marker sent to the endpoint.
    Submission,
    /// Translucent accent fill, for the chat thumbnail.
    Preview,
}

impl MaskVariant {
    pub fn default_fill(self) -> Rgba {
        match self {
            Self::Submission => color::TRANSPARENT,
            Self::Preview => color::PREVIEW_FILL,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskEncoding {
    /// PNG.
    #[default]
    Lossless,
    /// JPEG at [`MaskOptions::quality`]; alpha is dropped.
    Lossy,
}

impl MaskEncoding {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Lossless => "image/png",
            Self::Lossy => "image/jpeg",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Lossless => "canvas.png",
            Self::Lossy => "canvas.jpg",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskOptions {
    /// `None` picks the variant's default fill.
    pub fill_color: Option<Rgba>,
    pub stroke_color: Rgba,
    /// In image pixels; never scaled by the display ratio.
    pub stroke_width: f32,
    pub encoding: MaskEncoding,
    /// 0..=1, only read for [`MaskEncoding::Lossy`].
    pub quality: f32,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            fill_color: None,
            stroke_color: color::ACCENT,
            stroke_width: DEFAULT_STROKE_WIDTH,
            encoding: MaskEncoding::Lossless,
            quality: DEFAULT_LOSSY_QUALITY,
        }
    }
}

impl MaskOptions {
    pub fn fill_for(&self, variant: MaskVariant) -> Rgba {
        self.fill_color.unwrap_or_else(|| variant.default_fill())
    }
}

pub fn composite_mask(
    image: &RgbaImage,
    polygon: &Polygon,
    variant: MaskVariant,
    options: &MaskOptions,
) -> Result<Vec<u8>, EncodingError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodingError::EmptySurface { width, height });
    }

    if !polygon.is_submittable() {
        return encode(image, options);
    }

    let mut pixmap = raster::allocate_pixmap(width, height)
        .map_err(|_| EncodingError::Context { width, height })?;
    raster::copy_image_to_pixmap(image, &mut pixmap)
        .map_err(|_| EncodingError::Context { width, height })?;

    if let Some(path) = raster::closed_polygon_path(polygon.points()) {
        raster::fill_and_stroke(
            &mut pixmap,
            &path,
            options.fill_for(variant),
            options.stroke_color,
            &raster::round_stroke(options.stroke_width),
        );
    }

    let output =
        raster::pixmap_to_image(&pixmap).map_err(|_| EncodingError::Context { width, height })?;
    encode(&output, options)
}

fn encode(image: &RgbaImage, options: &MaskOptions) -> Result<Vec<u8>, EncodingError> {
    let mut buffer = Cursor::new(Vec::new());
    match options.encoding {
        MaskEncoding::Lossless => {
            image.write_to(&mut buffer, ImageFormat::Png)?;
        }
        MaskEncoding::Lossy => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder =
                JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(options.quality));
            encoder.encode_image(&rgb)?;
        }
    }
    Ok(buffer.into_inner())
}

fn jpeg_quality(quality: f32) -> u8 {
    let quality = if quality.is_finite() {
        quality.clamp(0.0, 1.0)
    } else {
        DEFAULT_LOSSY_QUALITY
    };
    ((quality * 100.0).round() as u8).max(1)
}

/// Handle to a composite running on its own thread.
pub struct PendingComposite {
    rx: Receiver<Result<Vec<u8>, EncodingError>>,
    _worker: thread::JoinHandle<()>,
}

impl PendingComposite {
    pub fn wait(self) -> Result<Vec<u8>, EncodingError> {
        self.rx.recv().unwrap_or(Err(EncodingError::WorkerLost))
    }
}

/// Starts `composite_mask` on a fresh thread with a private surface. Calls are
/// independent: nothing is cancelled and concurrent calls never share state.
pub fn spawn_composite(
    image: Arc<RgbaImage>,
    polygon: Polygon,
    variant: MaskVariant,
    options: MaskOptions,
) -> PendingComposite {
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let started = Instant::now();
        let result = composite_mask(&image, &polygon, variant, &options);
        match &result {
            Ok(bytes) => log::debug!(
                "{variant:?} composite: {} bytes in {:?}",
                bytes.len(),
                started.elapsed()
            ),
            Err(err) => log::warn!("{variant:?} composite failed: {err}"),
        }
        let _ = tx.send(result);
    });

    PendingComposite {
        rx,
        _worker: worker,
    }
}
