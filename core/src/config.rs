use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::grid::MAX_PIECES_DEFAULT;

pub const ROTATION_STEPS_MAX: u32 = 6;
pub const ROTATION_STEPS_DEFAULT: u32 = 0;
pub const SNAP_STRENGTH_MIN: u32 = 1;
pub const SNAP_STRENGTH_MAX: u32 = 10;
pub const SNAP_STRENGTH_DEFAULT: u32 = 3;
/// Tolerance at strength 1, as a multiple of the piece overlap.
pub const SNAP_DISTANCE_SCALE: f64 = 2.5;
pub const MAX_PIECES_MIN: u32 = 4;
pub const AUTOSAVE_SECS_DEFAULT: u64 = 20;

/// Game settings supplied by the caller. Every field falls back to its
/// default when absent from a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default = "default_max_pieces")]
    pub max_pieces: u32,
    #[serde(default = "default_rotation_steps")]
    pub rotation_steps: u32,
    #[serde(default = "default_snap_strength")]
    pub snap_strength: u32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_autosave_secs")]
    pub autosave_secs: u64,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            max_pieces: MAX_PIECES_DEFAULT,
            rotation_steps: ROTATION_STEPS_DEFAULT,
            snap_strength: SNAP_STRENGTH_DEFAULT,
            seed: None,
            autosave_secs: AUTOSAVE_SECS_DEFAULT,
        }
    }
}

fn default_max_pieces() -> u32 {
    MAX_PIECES_DEFAULT
}

fn default_rotation_steps() -> u32 {
    ROTATION_STEPS_DEFAULT
}

fn default_snap_strength() -> u32 {
    SNAP_STRENGTH_DEFAULT
}

fn default_autosave_secs() -> u64 {
    AUTOSAVE_SECS_DEFAULT
}

impl PuzzleConfig {
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.max_pieces < MAX_PIECES_MIN {
            return Err(SetupError::MaxPieces(self.max_pieces));
        }
        validate_rotation_steps(self.rotation_steps)?;
        validate_snap_strength(self.snap_strength)
    }
}

pub fn validate_rotation_steps(steps: u32) -> Result<(), SetupError> {
    if steps > ROTATION_STEPS_MAX {
        return Err(SetupError::RotationSteps(steps));
    }
    Ok(())
}

pub fn validate_snap_strength(strength: u32) -> Result<(), SetupError> {
    if !(SNAP_STRENGTH_MIN..=SNAP_STRENGTH_MAX).contains(&strength) {
        return Err(SetupError::SnapStrength(strength));
    }
    Ok(())
}

/// 0 when rotation is disabled (fewer than two steps).
pub fn rotation_step_angle(steps: u32) -> f64 {
    if steps <= 1 {
        0.0
    } else {
        360.0 / steps as f64
    }
}

/// Weaker snap strength widens the tolerance.
pub fn snap_distance(piece_overlap: u32, strength: u32) -> f64 {
    piece_overlap as f64 * SNAP_DISTANCE_SCALE / strength.max(SNAP_STRENGTH_MIN) as f64
}
