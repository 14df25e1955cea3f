//! Positions in world and image space, and the per-map calibration that
//! links them.
//!
//! World coordinates are engine units with Y increasing "up". Pixel
//! coordinates are relative to the top-left corner of the overhead radar
//! image with Y increasing "down".

use serde::{Deserialize, Serialize};

/// A 2D position in engine world units.
///
/// Only the horizontal plane matters for an overhead image; height is
/// discarded by the decoder adapter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPosition {
    /// World X (east/west).
    pub x: f64,
    /// World Y (north/south), increasing "up" on the radar.
    pub y: f64,
}

impl WorldPosition {
    /// Create a world position from its components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 2D position in radar-image space, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPosition {
    /// Horizontal offset from the left edge.
    pub x: f64,
    /// Vertical offset from the top edge.
    pub y: f64,
}

impl PixelPosition {
    /// Create a pixel position from its components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Reasons a set of calibration values cannot form a [`MapCalibration`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationInvariantError {
    /// The scale was zero, negative, or not a finite number.
    #[error("scale must be a finite number greater than zero, got {0}")]
    InvalidScale(f64),

    /// An origin component was NaN or infinite.
    #[error("origin {axis} must be finite, got {value}")]
    NonFiniteOrigin {
        /// Which origin component failed (`x` or `y`).
        axis: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Calibration of one exact radar-image version of a map.
///
/// Immutable once constructed. The constructor guarantees `scale > 0`
/// and finite origins, so translation never divides by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCalibration")]
pub struct MapCalibration {
    map_name: String,
    origin_x: f64,
    origin_y: f64,
    scale: f64,
}

impl MapCalibration {
    /// Build a calibration, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationInvariantError`] if `scale` is not a finite
    /// positive number or an origin component is not finite.
    pub fn new(
        map_name: impl Into<String>,
        origin_x: f64,
        origin_y: f64,
        scale: f64,
    ) -> Result<Self, CalibrationInvariantError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CalibrationInvariantError::InvalidScale(scale));
        }
        if !origin_x.is_finite() {
            return Err(CalibrationInvariantError::NonFiniteOrigin {
                axis: "x",
                value: origin_x,
            });
        }
        if !origin_y.is_finite() {
            return Err(CalibrationInvariantError::NonFiniteOrigin {
                axis: "y",
                value: origin_y,
            });
        }
        Ok(Self {
            map_name: map_name.into(),
            origin_x,
            origin_y,
            scale,
        })
    }

    /// Name of the map this calibration belongs to (e.g. `de_dust2`).
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    /// World X that lands on the left edge of the image.
    pub const fn origin_x(&self) -> f64 {
        self.origin_x
    }

    /// World Y that lands on the top edge of the image.
    pub const fn origin_y(&self) -> f64 {
        self.origin_y
    }

    /// World units per image pixel. Always greater than zero.
    pub const fn scale(&self) -> f64 {
        self.scale
    }
}

/// Unvalidated wire shape of [`MapCalibration`].
#[derive(Deserialize)]
struct RawCalibration {
    map_name: String,
    origin_x: f64,
    origin_y: f64,
    scale: f64,
}

impl TryFrom<RawCalibration> for MapCalibration {
    type Error = CalibrationInvariantError;

    fn try_from(raw: RawCalibration) -> Result<Self, Self::Error> {
        Self::new(raw.map_name, raw.origin_x, raw.origin_y, raw.scale)
    }
}
