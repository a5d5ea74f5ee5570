//! Assignment optimizer (spec §4.C): given a source palette and a target
//! palette/weight map of the same side length, find a permutation
//! minimizing the spatial+chromatic heuristic cost.
//!
//! Two solvers are provided: [`genetic`] (randomized local search by
//! pairwise swap) and [`greedy`] (deterministic nearest-match, documented
//! in spec.md as a stand-in for a Hungarian solver). Both are grounded in
//! the teacher's `calculate::process_genetic`/`process_optimal`, with the
//! greedy path replacing the teacher's actual Kuhn-Munkres implementation
//! per spec.md §4.C (see DESIGN.md for why `pathfinding`/`indexmap` were
//! dropped as a result).

pub mod genetic;
pub mod greedy;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use image::RgbImage;

use crate::error::Result;
use crate::image_ops::{self, RgbPixel};
use crate::preset::{Algorithm, GenerationSettings, UnprocessedPreset};
use crate::progress::ProgressSink;

pub(crate) struct PreparedImages {
    pub source_img: RgbImage,
    pub source_pixels: Vec<RgbPixel>,
    pub target_pixels: Vec<RgbPixel>,
    pub weights: Vec<i64>,
}

/// Crops/scales the source (and target, if any) to `settings.sidelen` and
/// extracts the palettes the solvers operate on. Grounded in the teacher's
/// `calculate::util::get_images`.
pub(crate) fn prepare_images(
    unprocessed: &UnprocessedPreset,
    settings: &GenerationSettings,
) -> Result<PreparedImages> {
    let source_raw: RgbImage =
        image::ImageBuffer::from_vec(unprocessed.width, unprocessed.height, unprocessed.source_img.clone())
            .ok_or(crate::error::ObamifyError::InvalidImage)?;

    let target_raw: RgbImage = match &settings.custom_target {
        Some(preset) => image::ImageBuffer::from_vec(
            preset.inner.width,
            preset.inner.height,
            preset.inner.source_img.clone(),
        )
        .ok_or(crate::error::ObamifyError::InvalidImage)?,
        None => source_raw.clone(),
    };

    let source_img = image_ops::crop_and_scale(&source_raw, settings.sidelen, settings.source_crop_scale);
    let target_img = image_ops::crop_and_scale(&target_raw, settings.sidelen, settings.target_crop_scale);

    let source_pixels = image_ops::extract_palette(&source_img);
    let target_pixels = image_ops::extract_palette(&target_img);
    let weights = image_ops::uniform_weights(target_pixels.len());

    Ok(PreparedImages {
        source_img,
        source_pixels,
        target_pixels,
        weights,
    })
}

/// Dispatches to [`genetic::run`] or [`greedy::run`] per `settings.algorithm`
/// (spec §4.C "Output"). Mirrors the teacher's top-level `process`.
pub fn process<S: ProgressSink>(
    unprocessed: UnprocessedPreset,
    settings: GenerationSettings,
    tx: &mut S,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    settings.validate()?;
    match settings.algorithm {
        Algorithm::Genetic => genetic::run(unprocessed, settings, tx, cancel),
        Algorithm::Optimal => greedy::run(unprocessed, settings, tx, cancel),
    }
}
