//! Data model shared across the optimizer, simulation and orchestrator
//! (spec §3 and §6): presets, assignment settings and the crop-scale
//! parameters threaded through the image kernel.
//!
//! Grounded in the teacher's `app/preset.rs` and `calculate::GenerationSettings`,
//! generalized with the `customTarget`/`sourceCropScale`/`targetCropScale`
//! fields spec.md §6 lists but the teacher (which only ever targets its own
//! embedded `target.png`) never needed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A source image before cropping/scaling or assignment, as read from disk
/// or supplied by a host (spec §3 "Image").
#[derive(Clone, Serialize, Deserialize)]
pub struct UnprocessedPreset {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row-major RGB8 bytes, length `width * height * 3`.
    pub source_img: Vec<u8>,
}

/// A finished, serializable bundle: the cropped-and-scaled source plus the
/// permutation that maps it onto a target (spec §3 "Preset").
#[derive(Clone, Serialize, Deserialize)]
pub struct Preset {
    pub inner: UnprocessedPreset,
    pub assignments: Vec<usize>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Algorithm {
    /// Deterministic greedy nearest-match, documented in spec.md §4.C as a
    /// stand-in for a Hungarian solver.
    Optimal,
    /// Randomized local search by pairwise swap (spec.md §4.C).
    Genetic,
}

/// Crop-then-scale parameters feeding the image kernel (spec §4.B):
/// `scale >= 1` zooms in on the image center before cropping;
/// `x`/`y` in `[-1, 1]` pan the crop window within the available slack.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CropScale {
    pub scale: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for CropScale {
    fn default() -> Self {
        Self {
            scale: 1.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// PRNG seed source for reproducibility (spec §6); also used for
    /// naming the resulting preset if `name` is left default.
    pub id: Uuid,
    pub name: String,
    /// Spatial weight `w_s` in the heuristic, `[1, 50]`.
    pub proximity_importance: i64,
    pub algorithm: Algorithm,
    /// Target side length `S`, one of `{64, 128, ..., 2048}`.
    pub sidelen: u32,
    /// If absent, the source is its own target (identity mapping).
    pub custom_target: Option<Preset>,
    pub source_crop_scale: CropScale,
    pub target_crop_scale: CropScale,
}

impl GenerationSettings {
    pub fn default_with_id(id: Uuid, name: String) -> Self {
        Self {
            id,
            name,
            proximity_importance: 13,
            algorithm: Algorithm::Genetic,
            sidelen: 256,
            custom_target: None,
            source_crop_scale: CropScale::default(),
            target_crop_scale: CropScale::default(),
        }
    }

    /// Validates the user-facing ranges from spec.md §6's configuration table.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(1..=50).contains(&self.proximity_importance) {
            return Err(crate::error::ObamifyError::InvalidProximityImportance(
                self.proximity_importance,
            ));
        }
        if self.sidelen < 64 || self.sidelen > 2048 || self.sidelen % 64 != 0 {
            return Err(crate::error::ObamifyError::InvalidSidelen(self.sidelen));
        }
        Ok(())
    }
}

/// The slice of UI state the core reads (spec §3 "GuiState"): everything
/// else (panels, dialogs, file pickers) is out of scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Transform,
    Draw,
}
