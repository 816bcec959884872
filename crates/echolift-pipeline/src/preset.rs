//! Named presets ("AI mode") and their fixed parameter table.
//!
//! A preset is a static lookup, not a model: each variant maps to a
//! constant [`ParameterSet`]. The table is versioned by
//! [`PRESET_TABLE_VERSION`]; any change to a constant below must bump
//! it so stored scans can tell which table produced them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::types::PipelineError;

/// Version of the preset table below.
pub const PRESET_TABLE_VERSION: u32 = 1;

/// Selects a fixed enhancement recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Balanced enhancement for most scans.
    #[default]
    Standard,
    /// Heavier smoothing with gentler sharpening.
    StrongDenoise,
    /// Light smoothing with strong edge sharpening.
    EdgeFocus,
}

impl Preset {
    /// Every preset, in display order.
    pub const ALL: [Self; 3] = [Self::Standard, Self::StrongDenoise, Self::EdgeFocus];

    /// The parameter set this preset stands for.
    #[must_use]
    pub const fn resolve(self) -> ParameterSet {
        match self {
            Self::Standard => STANDARD,
            Self::StrongDenoise => STRONG_DENOISE,
            Self::EdgeFocus => EDGE_FOCUS,
        }
    }

    /// Human-readable name shown in preset pickers.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::StrongDenoise => "Strong Denoise",
            Self::EdgeFocus => "Edge Focus",
        }
    }

    /// One-line description shown under the preset name.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Standard => "Balanced enhancement for most scans",
            Self::StrongDenoise => "Removes strong noise, smoother output",
            Self::EdgeFocus => "Highlights edges and boundaries",
        }
    }
}

/// Resolve a preset to its parameter set.
#[must_use]
pub const fn resolve(preset: Preset) -> ParameterSet {
    preset.resolve()
}

// Preset table, version 1. These are in domain by construction, so they
// go through the const constructor rather than the clamping one.
const STANDARD: ParameterSet = ParameterSet::from_table(0.10, 1.0, 0.4);
const STRONG_DENOISE: ParameterSet = ParameterSet::from_table(0.25, 1.0, 0.2);
const EDGE_FOCUS: ParameterSet = ParameterSet::from_table(0.03, 1.0, 1.6);

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Preset {
    type Err = PipelineError;

    /// Accepts display names, kebab-case and snake_case, case-insensitively,
    /// plus the short aliases `denoise` and `edge`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "standard" => Ok(Self::Standard),
            "strongdenoise" | "denoise" => Ok(Self::StrongDenoise),
            "edgefocus" | "edge" => Ok(Self::EdgeFocus),
            _ => Err(PipelineError::UnknownPreset(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn resolution_is_deterministic() {
        for preset in Preset::ALL {
            assert_eq!(preset.resolve(), preset.resolve());
            assert_eq!(resolve(preset), preset.resolve());
        }
    }

    #[test]
    fn noise_reduction_ordering() {
        let standard = Preset::Standard.resolve();
        let strong = Preset::StrongDenoise.resolve();
        let edge = Preset::EdgeFocus.resolve();
        assert!(strong.noise_reduction() > standard.noise_reduction());
        assert!(standard.noise_reduction() > edge.noise_reduction());
    }

    #[test]
    fn sharpness_trades_off_against_denoise() {
        let standard = Preset::Standard.resolve();
        let strong = Preset::StrongDenoise.resolve();
        let edge = Preset::EdgeFocus.resolve();
        assert!(edge.sharpness() > standard.sharpness());
        assert!(standard.sharpness() > strong.sharpness());
    }

    #[test]
    fn contrast_is_neutral_for_every_preset() {
        for preset in Preset::ALL {
            assert_eq!(preset.resolve().contrast(), 1.0);
        }
    }

    #[test]
    fn canonical_table_v1() {
        assert_eq!(PRESET_TABLE_VERSION, 1);
        assert_eq!(Preset::Standard.resolve(), ParameterSet::new(0.10, 1.0, 0.4));
        assert_eq!(
            Preset::StrongDenoise.resolve(),
            ParameterSet::new(0.25, 1.0, 0.2)
        );
        assert_eq!(Preset::EdgeFocus.resolve(), ParameterSet::new(0.03, 1.0, 1.6));
    }

    #[test]
    fn table_values_are_in_domain() {
        for preset in Preset::ALL {
            let p = preset.resolve();
            let (_, adjustments) =
                ParameterSet::with_adjustments(p.noise_reduction(), p.contrast(), p.sharpness());
            assert!(adjustments.is_empty(), "{preset} has out-of-domain values");
        }
    }

    #[test]
    fn parses_display_names_and_aliases() {
        assert_eq!("Standard".parse::<Preset>().unwrap(), Preset::Standard);
        assert_eq!(
            "Strong Denoise".parse::<Preset>().unwrap(),
            Preset::StrongDenoise
        );
        assert_eq!(
            "strong-denoise".parse::<Preset>().unwrap(),
            Preset::StrongDenoise
        );
        assert_eq!("EDGE_FOCUS".parse::<Preset>().unwrap(), Preset::EdgeFocus);
        assert_eq!("edge".parse::<Preset>().unwrap(), Preset::EdgeFocus);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for preset in Preset::ALL {
            assert_eq!(preset.to_string().parse::<Preset>().unwrap(), preset);
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = "turbo".parse::<Preset>().unwrap_err();
        assert_eq!(err, PipelineError::UnknownPreset("turbo".to_string()));
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Preset::StrongDenoise).unwrap();
        assert_eq!(json, r#""strong-denoise""#);
        let back: Preset = serde_json::from_str(r#""edge-focus""#).unwrap();
        assert_eq!(back, Preset::EdgeFocus);
    }
}
