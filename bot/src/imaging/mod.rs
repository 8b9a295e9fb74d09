//! Image pipeline: raw catalog bytes to publishable JPEG.
//!
//! Sequence per image: decode, aspect-preserving downscale to the
//! configured cap, black out every cover band of a censor plan, stamp
//! the attribution mark, encode as JPEG at the configured quality. All
//! randomness lives in plan generation; [`ImagePreparer::prepare_with_plan`]
//! is fully deterministic so tests can pin a plan and compare bytes.

pub mod censor;

pub use censor::{CensorPlan, CoverageRange, Rect};

use std::io::Cursor;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

/// Opaque fill for censored regions.
const COVER_COLOR: Rgba<u8> = Rgba([16, 16, 16, 255]);

/// Distance of the attribution mark from the bottom-right corner.
const MARK_MARGIN: u32 = 12;

static WATERMARK_PNG: &[u8] = include_bytes!("../../assets/watermark.png");

fn watermark() -> &'static RgbaImage {
    static MARK: OnceLock<RgbaImage> = OnceLock::new();
    MARK.get_or_init(|| {
        image::load_from_memory(WATERMARK_PNG)
            .expect("embedded watermark must decode")
            .to_rgba8()
    })
}

#[derive(Debug, Clone)]
pub struct ImagePreparer {
    max_dimension: u32,
    jpeg_quality: u8,
    coverage: CoverageRange,
}

impl ImagePreparer {
    pub fn new(max_dimension: u32, jpeg_quality: u8, coverage: CoverageRange) -> Self {
        Self { max_dimension, jpeg_quality, coverage }
    }

    /// Full pipeline with a freshly generated censor plan.
    pub fn prepare(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let img = self.decode_and_downscale(bytes)?;
        let plan = censor::generate(img.width(), img.height(), self.coverage);
        self.finish(img, &plan)
    }

    /// Pipeline with an injected plan. The plan must match the image
    /// dimensions *after* downscaling.
    pub fn prepare_with_plan(&self, bytes: &[u8], plan: &CensorPlan) -> Result<Vec<u8>> {
        let img = self.decode_and_downscale(bytes)?;
        self.finish(img, plan)
    }

    fn decode_and_downscale(&self, bytes: &[u8]) -> Result<DynamicImage> {
        let img = image::load_from_memory(bytes).context("Failed to decode image")?;
        if img.width() <= self.max_dimension && img.height() <= self.max_dimension {
            // Never upscale.
            return Ok(img);
        }
        Ok(img.resize(self.max_dimension, self.max_dimension, imageops::FilterType::Lanczos3))
    }

    fn finish(&self, img: DynamicImage, plan: &CensorPlan) -> Result<Vec<u8>> {
        let mut canvas = img.to_rgba8();
        let (width, height) = (canvas.width(), canvas.height());

        // A plan violating the tiling invariant is an internal defect. It
        // must never reach the drawing loop: publish the image uncensored
        // instead of risking corrupt output.
        let fallback;
        let plan = match plan.validate(width, height) {
            Ok(()) => plan,
            Err(reason) => {
                tracing::error!("censor plan rejected ({reason}), publishing uncensored");
                fallback = CensorPlan::uncensored(width, height);
                &fallback
            }
        };

        for cover in &plan.covers {
            fill_rect(&mut canvas, cover);
        }

        stamp_mark(&mut canvas);

        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), self.jpeg_quality);
        DynamicImage::ImageRgba8(canvas)
            .to_rgb8()
            .write_with_encoder(encoder)
            .context("Failed to encode JPEG")?;
        Ok(out)
    }
}

fn fill_rect(canvas: &mut RgbaImage, rect: &Rect) {
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            canvas.put_pixel(x, y, COVER_COLOR);
        }
    }
}

fn stamp_mark(canvas: &mut RgbaImage) {
    let mark = watermark();
    if canvas.width() < mark.width() + 2 * MARK_MARGIN || canvas.height() < mark.height() + 2 * MARK_MARGIN {
        // Image too small to carry the mark.
        return;
    }
    let x = canvas.width() - mark.width() - MARK_MARGIN;
    let y = canvas.height() - mark.height() - MARK_MARGIN;
    imageops::overlay(canvas, mark, x as i64, y as i64);
}
