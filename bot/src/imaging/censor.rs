//! Censor window generation.
//!
//! Each published backdrop keeps only a small randomly placed window
//! visible; the rest of the frame is blacked out. The window size and
//! position are random, but the opaque cover bands derived from it must
//! tile the complement of the window exactly. A plan that fails that
//! invariant would draw garbage, so it is validated before use.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    fn intersects(&self, other: &Rect) -> bool {
        (self.x as u64) < other.right()
            && (other.x as u64) < self.right()
            && (self.y as u64) < other.bottom()
            && (other.y as u64) < self.bottom()
    }
}

/// Allowed fraction of the image left visible, inclusive on both ends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoverageRange {
    pub min: f64,
    pub max: f64,
}

impl Default for CoverageRange {
    fn default() -> Self {
        Self { min: 0.08, max: 0.20 }
    }
}

/// The censoring layout for one image: a single visible window plus the
/// opaque bands that tile the rest of the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensorPlan {
    pub visible: Rect,
    /// Up to four bands: above, below, left, right of the window. Bands
    /// that would be empty are omitted, never emitted with zero area.
    pub covers: Vec<Rect>,
}

impl CensorPlan {
    /// Plan that hides nothing. Used as the safe fallback when the
    /// coverage constraints cannot be satisfied for the given dimensions
    /// or a generated plan turns out to be invalid.
    pub fn uncensored(width: u32, height: u32) -> Self {
        Self {
            visible: Rect { x: 0, y: 0, width, height },
            covers: Vec::new(),
        }
    }

    /// Checks the tiling invariant against the image dimensions: every
    /// rectangle non-empty and in bounds, all rectangles pairwise
    /// disjoint, and their areas summing to exactly `width * height`.
    /// Together these guarantee a gap-free, overlap-free tiling.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), String> {
        let rects: Vec<&Rect> = std::iter::once(&self.visible).chain(self.covers.iter()).collect();

        for rect in &rects {
            if rect.width == 0 || rect.height == 0 {
                return Err(format!("zero-area rectangle {rect:?}"));
            }
            if rect.right() > width as u64 || rect.bottom() > height as u64 {
                return Err(format!("rectangle {rect:?} outside {width}x{height}"));
            }
        }

        for (i, a) in rects.iter().enumerate() {
            for b in rects.iter().skip(i + 1) {
                if a.intersects(b) {
                    return Err(format!("overlapping rectangles {a:?} and {b:?}"));
                }
            }
        }

        let covered: u64 = rects.iter().map(|r| r.area()).sum();
        let total = width as u64 * height as u64;
        if covered != total {
            return Err(format!("tiling covers {covered} of {total} pixels"));
        }

        Ok(())
    }
}

/// Generates a censor plan with the process-wide RNG.
pub fn generate(width: u32, height: u32, coverage: CoverageRange) -> CensorPlan {
    generate_with(&mut rand::rng(), width, height, coverage)
}

/// Generates a censor plan from the given RNG. The visible window's area
/// always lands inside the coverage range (inclusive); integer rounding
/// is absorbed by deriving the height bounds from the area bounds after
/// the width is drawn. Dimensions too small to satisfy the range fall
/// back to an uncensored plan.
pub fn generate_with<R: Rng>(rng: &mut R, width: u32, height: u32, coverage: CoverageRange) -> CensorPlan {
    let total = width as u64 * height as u64;
    if total == 0 {
        return CensorPlan::uncensored(width, height);
    }

    let min_area = ((total as f64 * coverage.min).ceil() as u64).max(1);
    let max_area = ((total as f64 * coverage.max).floor() as u64).min(total);

    // Width range for which a compliant height exists.
    let w_lo = min_area.div_ceil(height as u64).max(1);
    let w_hi = (width as u64).min(max_area);
    if w_lo > w_hi {
        tracing::warn!("censor window cannot satisfy coverage for {width}x{height}, leaving image visible");
        return CensorPlan::uncensored(width, height);
    }
    let vis_w = rng.random_range(w_lo..=w_hi);

    let h_lo = min_area.div_ceil(vis_w).max(1);
    let h_hi = (height as u64).min(max_area / vis_w);
    if h_lo > h_hi {
        tracing::warn!("censor window cannot satisfy coverage for {width}x{height}, leaving image visible");
        return CensorPlan::uncensored(width, height);
    }
    let vis_h = rng.random_range(h_lo..=h_hi);

    let visible = Rect {
        x: rng.random_range(0..=width - vis_w as u32),
        y: rng.random_range(0..=height - vis_h as u32),
        width: vis_w as u32,
        height: vis_h as u32,
    };

    CensorPlan {
        covers: cover_bands(&visible, width, height),
        visible,
    }
}

/// The complement of the window as up to four bands: full-width strips
/// above and below, side strips clipped to the window's rows. A window
/// touching an edge simply loses the corresponding band.
fn cover_bands(visible: &Rect, width: u32, height: u32) -> Vec<Rect> {
    let mut covers = Vec::with_capacity(4);

    if visible.y > 0 {
        covers.push(Rect { x: 0, y: 0, width, height: visible.y });
    }
    let below = visible.bottom() as u32;
    if below < height {
        covers.push(Rect { x: 0, y: below, width, height: height - below });
    }
    if visible.x > 0 {
        covers.push(Rect { x: 0, y: visible.y, width: visible.x, height: visible.height });
    }
    let right = visible.right() as u32;
    if right < width {
        covers.push(Rect { x: right, y: visible.y, width: width - right, height: visible.height });
    }

    covers
}
