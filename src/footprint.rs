use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical jumper packages the router knows how to place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JumperFootprint {
    #[serde(rename = "0603")]
    F0603,
    #[serde(rename = "1206")]
    F1206,
    /// One pad pair of a 1206x4 resistor array.
    #[serde(rename = "1206x4_pair")]
    F1206x4Pair,
}

/// Dimensions in millimetres. `length` runs along the jumper axis (pad to pad).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FootprintDimensions {
    pub length: f64,
    pub width: f64,
    pub pad_length: f64,
    pub pad_width: f64,
}

impl JumperFootprint {
    pub const fn dimensions(self) -> FootprintDimensions {
        match self {
            JumperFootprint::F0603 => FootprintDimensions {
                length: 1.65,
                width: 0.95,
                pad_length: 0.8,
                pad_width: 0.95,
            },
            JumperFootprint::F1206 => FootprintDimensions {
                length: 3.2,
                width: 1.6,
                pad_length: 0.6,
                pad_width: 1.6,
            },
            JumperFootprint::F1206x4Pair => FootprintDimensions {
                length: 2.7,
                width: 0.5,
                pad_length: 0.8,
                pad_width: 0.5,
            },
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            JumperFootprint::F0603 => "0603",
            JumperFootprint::F1206 => "1206",
            JumperFootprint::F1206x4Pair => "1206x4_pair",
        }
    }
}

impl fmt::Display for JumperFootprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
