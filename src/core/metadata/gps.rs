//! GPS coordinate conversion.
//!
//! EXIF stores latitude and longitude as degree/minute/second rationals
//! plus a hemisphere reference. Some writers store values scaled by 1e7;
//! when a converted value falls outside the valid range both coordinates
//! are divided by 1e7 as a last resort. That rescaling is a guess at
//! malformed input, not documented device behaviour, and a value that is
//! still out of range afterwards is dropped.

use serde::{Deserialize, Serialize};

const SCALED_DIVISOR: f64 = 1e7;

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Whether both values are inside the geographic range
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Degrees, minutes, seconds to decimal degrees; S and W are negative.
///
/// Returns `None` when fewer than three components are present.
pub fn dms_to_decimal(dms: &[f64], reference: &str) -> Option<f64> {
    let dms = dms.get(..3)?;

    let mut decimal = dms[0] + dms[1] / 60.0 + dms[2] / 3600.0;
    if reference.trim().eq_ignore_ascii_case("S") || reference.trim().eq_ignore_ascii_case("W") {
        decimal = -decimal;
    }
    Some(decimal)
}

/// Build coordinates from raw EXIF parts, applying the rescaling fallback
pub fn coordinates_from_dms(
    latitude: &[f64],
    latitude_ref: &str,
    longitude: &[f64],
    longitude_ref: &str,
) -> Option<Coordinates> {
    let mut coords = Coordinates {
        latitude: dms_to_decimal(latitude, latitude_ref)?,
        longitude: dms_to_decimal(longitude, longitude_ref)?,
    };

    if !coords.latitude.is_finite() || !coords.longitude.is_finite() {
        return None;
    }

    if !coords.is_valid() {
        coords.latitude /= SCALED_DIVISOR;
        coords.longitude /= SCALED_DIVISOR;
    }

    coords.is_valid().then_some(coords)
}
