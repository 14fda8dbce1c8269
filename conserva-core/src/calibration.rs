//! Unit scaling for measurements.
//!
//! A [`Calibration`] maps image pixels to real-world units. It is set either
//! directly, from a DPI preset, or from a reference line of known length.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by invalid calibration input.
///
/// The previous calibration is always kept when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// Scale must be a positive, finite number.
    #[error("Scale must be positive, got {0}")]
    NonPositiveScale(f64),

    /// The reference line has no length.
    #[error("Reference line must be longer than zero pixels, got {0}")]
    NonPositivePixelDistance(f64),

    /// The known distance must be a positive, finite number.
    #[error("Known distance must be positive, got {0}")]
    NonPositiveKnownDistance(f64),

    /// No reference line has been captured yet.
    #[error("No reference line captured")]
    NoReferenceLine,
}

/// Real-world length units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Uncalibrated image pixels.
    #[default]
    Px,
    /// Millimetres.
    Mm,
    /// Centimetres.
    Cm,
    /// Metres.
    M,
    /// Inches.
    In,
}

impl Unit {
    /// Unit symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::Mm => "mm",
            Self::Cm => "cm",
            Self::M => "m",
            Self::In => "in",
        }
    }

    /// Decimal places used when formatting values in this unit.
    #[must_use]
    pub const fn decimals(self) -> usize {
        match self {
            Self::Px => 0,
            _ => 2,
        }
    }

    /// Format a length, e.g. `5 px` or `10.00 cm`.
    #[must_use]
    pub fn format_length(self, value: f64) -> String {
        format!("{value:.prec$} {}", self.symbol(), prec = self.decimals())
    }

    /// Format an area with a squared suffix, e.g. `1 px²` or `2.50 cm²`.
    #[must_use]
    pub fn format_area(self, value: f64) -> String {
        format!("{value:.prec$} {}²", self.symbol(), prec = self.decimals())
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "px" | "pixel" | "pixels" => Ok(Self::Px),
            "mm" => Ok(Self::Mm),
            "cm" => Ok(Self::Cm),
            "m" => Ok(Self::M),
            "in" | "inch" | "inches" => Ok(Self::In),
            other => Err(format!("unknown unit: {other}")),
        }
    }
}

/// Real units per pixel, plus the unit they are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Real-world units represented by one pixel.
    scale: f64,
    /// Unit of `scale`.
    unit: Unit,
}

impl Calibration {
    /// Uncalibrated: one pixel per pixel.
    #[must_use]
    pub const fn pixels() -> Self {
        Self {
            scale: 1.0,
            unit: Unit::Px,
        }
    }

    /// Direct entry of scale and unit.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::NonPositiveScale`] unless `scale` is
    /// positive and finite.
    pub fn new(scale: f64, unit: Unit) -> Result<Self, CalibrationError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CalibrationError::NonPositiveScale(scale));
        }
        Ok(Self { scale, unit })
    }

    /// Derive the scale from a reference line of known real length.
    ///
    /// `scale = known_distance / pixel_distance`.
    ///
    /// # Errors
    ///
    /// Returns an error if either distance is not positive and finite.
    pub fn from_reference(
        pixel_distance: f64,
        known_distance: f64,
        unit: Unit,
    ) -> Result<Self, CalibrationError> {
        if !(pixel_distance.is_finite() && pixel_distance > 0.0) {
            return Err(CalibrationError::NonPositivePixelDistance(pixel_distance));
        }
        if !(known_distance.is_finite() && known_distance > 0.0) {
            return Err(CalibrationError::NonPositiveKnownDistance(known_distance));
        }
        Self::new(known_distance / pixel_distance, unit)
    }

    /// Real-world units per pixel.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Unit of the scale.
    #[must_use]
    pub const fn unit(&self) -> Unit {
        self.unit
    }

    /// Convert a pixel length to real units.
    #[must_use]
    pub fn length(&self, pixels: f64) -> f64 {
        pixels * self.scale
    }

    /// Convert a pixel area to real square units.
    #[must_use]
    pub fn area(&self, square_pixels: f64) -> f64 {
        square_pixels * self.scale * self.scale
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::pixels()
    }
}

/// A named, pre-populated calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationPreset {
    /// Display label, e.g. `300 DPI (mm)`.
    pub label: String,
    /// The calibration it selects.
    pub calibration: Calibration,
}

impl CalibrationPreset {
    /// Preset for a scan resolution expressed in the given unit.
    ///
    /// Returns `None` for a zero DPI.
    #[must_use]
    pub fn from_dpi(dpi: u32, unit: Unit) -> Option<Self> {
        if dpi == 0 {
            return None;
        }
        let inch_per_px = 1.0 / f64::from(dpi);
        let scale = match unit {
            Unit::Px => 1.0,
            Unit::Mm => inch_per_px * 25.4,
            Unit::Cm => inch_per_px * 2.54,
            Unit::M => inch_per_px * 0.0254,
            Unit::In => inch_per_px,
        };
        Calibration::new(scale, unit).ok().map(|calibration| Self {
            label: format!("{dpi} DPI ({unit})"),
            calibration,
        })
    }

    /// Standard presets: uncalibrated pixels plus common scan resolutions.
    #[must_use]
    pub fn standard() -> Vec<Self> {
        let mut presets = vec![Self {
            label: "Pixels".to_string(),
            calibration: Calibration::pixels(),
        }];
        for dpi in [72, 96, 150, 300, 600] {
            for unit in [Unit::Mm, Unit::Cm, Unit::In] {
                presets.extend(Self::from_dpi(dpi, unit));
            }
        }
        presets
    }
}
