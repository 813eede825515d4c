//! Conversion from human temperature units to the firmware's raw encoding.

use tracing::trace;

/// A temperature reading as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    pub value: f64,
    pub celsius: bool,
}

impl Temperature {
    /// Convert to the raw integer the firmware puts on the wire.
    ///
    /// The transform was determined experimentally by stepping a sensor
    /// through known temperatures and reading back the wire value; it is
    /// `round((F + 40) / 0.9)` with round-half-away-from-zero, which is what
    /// `f64::round` does. There is no inverse: the thermostat side never
    /// sends temperatures back.
    pub fn to_raw(&self) -> i32 {
        let temp_f = if self.celsius {
            self.value * 1.8 + 32.0
        } else {
            self.value
        };
        let raw = (temp_f + 40.0) / 0.9;
        let rounded = raw.round() as i32;
        trace!(
            input = self.value,
            celsius = self.celsius,
            temp_f,
            raw,
            rounded,
            "Converting temp"
        );
        rounded
    }
}
