//! Conversion between signed decimal degrees and the degrees/minutes/seconds form stored in photo
//! metadata.

use serde::Serialize;

/// Hemisphere symbols for latitude, positive first.
pub const LATITUDE_REFS: (char, char) = ('N', 'S');
/// Hemisphere symbols for longitude, positive first.
pub const LONGITUDE_REFS: (char, char) = ('E', 'W');

/// An unsigned degrees/minutes/seconds triple. The sign of the coordinate travels separately as a
/// hemisphere reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    pub seconds: f64,
}

impl Dms {
    /// Split a decimal coordinate into degrees, whole minutes and fractional seconds. The sign is
    /// dropped; use [`hemisphere_ref`] to recover it.
    pub fn from_decimal(value: f64) -> Self {
        let magnitude = value.abs();
        let degrees = magnitude.trunc();
        // Computing seconds from the minute remainder keeps them in [0, 60).
        let total_minutes = (magnitude - degrees) * 60.0;
        let minutes = total_minutes.trunc();
        let seconds = (total_minutes - minutes) * 60.0;

        Dms {
            degrees: degrees as u32,
            minutes: minutes as u32,
            seconds,
        }
    }

    /// Unsigned decimal degrees.
    pub fn to_decimal(&self) -> f64 {
        self.degrees as f64 + self.minutes as f64 / 60. + self.seconds / 3600.
    }

    /// Decimal degrees with the sign taken from a hemisphere reference. Anything other than the
    /// negative symbol counts as positive.
    pub fn to_signed_decimal(&self, reference: char, negative: char) -> f64 {
        let value = self.to_decimal();
        if reference.eq_ignore_ascii_case(&negative) {
            -value
        } else {
            value
        }
    }
}

/// Pick the hemisphere symbol for a coordinate. Zero counts as non-negative.
pub fn hemisphere_ref(value: f64, positive: char, negative: char) -> char {
    if value >= 0.0 {
        positive
    } else {
        negative
    }
}
