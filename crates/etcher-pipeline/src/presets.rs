//! Material presets.
//!
//! Each engraving material responds differently to the beam, so each
//! gets its own starting point for tone, cleaning, smoothing and beam
//! strength. A preset only fills in those controls; everything else keeps
//! its default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::params::ParameterBundle;

/// Target material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Neutral settings.
    #[default]
    Default,
    /// Wood: slightly darker, a little more contrast, light cleaning.
    Wood,
    /// Metal: strong background cleaning, fine lines.
    Metal,
    /// Leather: extra contrast and heavier face smoothing.
    Leather,
    /// Stone: bright, flat, fully cleaned background.
    Stone,
}

impl Material {
    /// Every material, in presentation order.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Wood,
        Self::Metal,
        Self::Leather,
        Self::Stone,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Wood => "wood",
            Self::Metal => "metal",
            Self::Leather => "leather",
            Self::Stone => "stone",
        }
    }

    /// The parameter bundle for this material.
    #[must_use]
    pub fn bundle(self) -> ParameterBundle {
        // (brightness, contrast, sketch depth, background, face radius, beam)
        let (brightness, contrast, sketch_depth, background_strength, face_radius, beam_strength) =
            match self {
                Self::Default => (1.0, 1.0, 25, 45.0, 5, ParameterBundle::DEFAULT_BEAM_STRENGTH),
                Self::Wood => (0.9, 1.15, 35, 11.0, 5, 0.25),
                Self::Metal => (0.9, 1.0, 35, 76.0, 5, 0.20),
                Self::Leather => (1.0, 1.2, 35, 30.0, 20, 0.28),
                Self::Stone => (1.3, 0.75, 35, 100.0, 5, 0.30),
            };
        ParameterBundle {
            brightness,
            contrast,
            sketch_depth,
            background_strength,
            face_radius,
            beam_strength,
            ..ParameterBundle::default()
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Material {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown material '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
