//! Pixel comparison between golden and candidate images, and diff artifact persistence
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::warn;

use crate::{
    config::CompareOptions,
    errors::SnapshotError,
    layout::SnapshotLayout,
    models::{Namespace, Region, SnapshotId},
    provision::ensure_directory_chain,
    writer::{encode_png, write_atomic},
};

/// Largest possible squared YIQ distance between two colors.
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Verdict of a single comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Match,

    /// At least one pixel outside the excluded regions differs
    Mismatch { diff_pixels: u64, diff: RgbaImage },

    /// Sizes differ; no pixel comparison was attempted
    DimensionMismatch {
        golden: (u32, u32),
        candidate: (u32, u32),
    },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }
}

/// Compare two decoded images, ignoring pixels inside any of `excluded`.
pub fn compare(
    golden: &RgbaImage,
    candidate: &RgbaImage,
    excluded: &[Region],
    options: &CompareOptions,
) -> Comparison {
    if golden.dimensions() != candidate.dimensions() {
        warn!(
            golden = ?golden.dimensions(),
            candidate = ?candidate.dimensions(),
            "image dimensions are not the same"
        );
        return Comparison::DimensionMismatch {
            golden: golden.dimensions(),
            candidate: candidate.dimensions(),
        };
    }

    if golden.as_raw() == candidate.as_raw() {
        return Comparison::Match;
    }

    let (width, height) = golden.dimensions();
    let mut diff = RgbaImage::new(width, height);
    let frame = Frame {
        width: width as usize,
        height: height as usize,
    };
    let diff_pixels = count_diff_pixels(
        golden.as_raw(),
        candidate.as_raw(),
        &mut diff,
        frame,
        excluded,
        options,
    );

    if diff_pixels == 0 {
        Comparison::Match
    } else {
        Comparison::Mismatch { diff_pixels, diff }
    }
}

#[derive(Clone, Copy)]
struct Frame {
    width: usize,
    height: usize,
}

impl Frame {
    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * 4
    }

    /// Inclusive 3x3 neighbourhood clamped to the frame.
    fn neighbourhood(&self, x: usize, y: usize) -> (usize, usize, usize, usize) {
        (
            x.saturating_sub(1),
            y.saturating_sub(1),
            (x + 1).min(self.width - 1),
            (y + 1).min(self.height - 1),
        )
    }
}

fn count_diff_pixels(
    golden: &[u8],
    candidate: &[u8],
    output: &mut [u8],
    frame: Frame,
    excluded: &[Region],
    options: &CompareOptions,
) -> u64 {
    let max_delta = MAX_YIQ_DELTA * options.threshold * options.threshold;
    let mut diff_pixels = 0u64;

    for y in 0..frame.height {
        for x in 0..frame.width {
            let pos = frame.offset(x, y);

            if excluded
                .iter()
                .any(|region| region.contains(x as u32, y as u32))
            {
                draw_gray_pixel(golden, pos, options.alpha, output);
                continue;
            }

            let delta = color_delta(golden, candidate, pos, pos, false);
            if delta.abs() > max_delta {
                if !options.include_anti_aliased
                    && (antialiased(golden, x, y, frame, candidate)
                        || antialiased(candidate, x, y, frame, golden))
                {
                    draw_pixel(output, pos, options.aa_color);
                } else {
                    draw_pixel(output, pos, options.diff_color);
                    diff_pixels += 1;
                }
            } else {
                draw_gray_pixel(golden, pos, options.alpha, output);
            }
        }
    }

    diff_pixels
}

/// Whether the pixel at (x, y) in `img` looks like an anti-aliasing artefact.
fn antialiased(img: &[u8], x: usize, y: usize, frame: Frame, other: &[u8]) -> bool {
    let (x0, y0, x2, y2) = frame.neighbourhood(x, y);
    let pos = frame.offset(x, y);
    let mut zeroes = usize::from(x == x0 || x == x2 || y == y0 || y == y2);
    let mut min = 0.0;
    let mut max = 0.0;
    let mut min_at = (0, 0);
    let mut max_at = (0, 0);

    for nx in x0..=x2 {
        for ny in y0..=y2 {
            if nx == x && ny == y {
                continue;
            }
            let delta = color_delta(img, img, pos, frame.offset(nx, ny), true);
            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_at = (nx, ny);
            } else if delta > max {
                max = delta;
                max_at = (nx, ny);
            }
        }
    }

    if min == 0.0 || max == 0.0 {
        return false;
    }

    (has_many_siblings(img, min_at, frame) && has_many_siblings(other, min_at, frame))
        || (has_many_siblings(img, max_at, frame) && has_many_siblings(other, max_at, frame))
}

/// Whether at least three neighbours share the exact color of the pixel at `at`.
fn has_many_siblings(img: &[u8], at: (usize, usize), frame: Frame) -> bool {
    let (x, y) = at;
    let (x0, y0, x2, y2) = frame.neighbourhood(x, y);
    let pos = frame.offset(x, y);
    let mut zeroes = usize::from(x == x0 || x == x2 || y == y0 || y == y2);

    for nx in x0..=x2 {
        for ny in y0..=y2 {
            if nx == x && ny == y {
                continue;
            }
            let other = frame.offset(nx, ny);
            if img[pos..pos + 4] == img[other..other + 4] {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }
    false
}

/// Squared YIQ distance between two pixels; negative when the first is brighter.
fn color_delta(img1: &[u8], img2: &[u8], k: usize, m: usize, y_only: bool) -> f64 {
    if img1[k..k + 4] == img2[m..m + 4] {
        return 0.0;
    }

    let (r1, g1, b1) = flatten(&img1[k..k + 4]);
    let (r2, g2, b2) = flatten(&img2[m..m + 4]);

    let y1 = rgb_to_y(r1, g1, b1);
    let y2 = rgb_to_y(r2, g2, b2);
    let y = y1 - y2;
    if y_only {
        return y;
    }

    let i = rgb_to_i(r1, g1, b1) - rgb_to_i(r2, g2, b2);
    let q = rgb_to_q(r1, g1, b1) - rgb_to_q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 {
        -delta
    } else {
        delta
    }
}

/// Composite a translucent pixel onto white.
fn flatten(px: &[u8]) -> (f64, f64, f64) {
    let (r, g, b, a) = (px[0] as f64, px[1] as f64, px[2] as f64, px[3] as f64);
    if a < 255.0 {
        let a = a / 255.0;
        (blend(r, a), blend(g, a), blend(b, a))
    } else {
        (r, g, b)
    }
}

fn blend(c: f64, a: f64) -> f64 {
    255.0 + (c - 255.0) * a
}

fn rgb_to_y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.29889531 + g * 0.58662247 + b * 0.11448223
}

fn rgb_to_i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.59597799 - g * 0.27417610 - b * 0.32180189
}

fn rgb_to_q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.21147017 - g * 0.52261711 + b * 0.31114694
}

fn draw_pixel(output: &mut [u8], pos: usize, color: [u8; 3]) {
    output[pos..pos + 3].copy_from_slice(&color);
    output[pos + 3] = 255;
}

fn draw_gray_pixel(img: &[u8], pos: usize, alpha: f64, output: &mut [u8]) {
    let luma = rgb_to_y(img[pos] as f64, img[pos + 1] as f64, img[pos + 2] as f64);
    let opacity = alpha * (img[pos + 3] as f64 / 255.0);
    let value = blend(luma, opacity).round().clamp(0.0, 255.0) as u8;
    output[pos..pos + 3].fill(value);
    output[pos + 3] = 255;
}

/// Write the diff raster under the diff namespace, provisioning its directory chain first.
pub async fn persist_diff(
    layout: &SnapshotLayout,
    id: &SnapshotId,
    diff: RgbaImage,
) -> Result<PathBuf, SnapshotError> {
    let path = layout.resolve(id, Namespace::Diff);

    ensure_directory_chain(&layout.namespace_root(Namespace::Diff), id)
        .await
        .map_err(|err| persist_error(&path, err))?;
    let bytes = tokio::task::spawn_blocking(move || encode_png(&diff))
        .await
        .map_err(|err| persist_error(&path, err))?
        .map_err(|err| persist_error(&path, err))?;
    write_atomic(&path, &bytes)
        .await
        .map_err(|err| persist_error(&path, err))?;

    Ok(path)
}

fn persist_error(path: &Path, err: impl std::fmt::Display) -> SnapshotError {
    SnapshotError::DiffPersist {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
