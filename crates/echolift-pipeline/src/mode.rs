//! How a run's parameters are chosen: manual values or a named preset.

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::preset::Preset;

/// Label recorded for runs driven by hand-tuned parameters.
pub const MANUAL_LABEL: &str = "Manual";

/// Either direct parameters ("manual mode") or a preset ("AI mode").
///
/// Serialized externally tagged:
///
/// ```json
/// {"manual": {"noise_reduction": 0.05, "contrast": 1.2, "sharpness": 0.4}}
/// {"preset": "edge-focus"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementMode {
    /// Caller-supplied parameters.
    Manual(ParameterSet),
    /// A fixed preset from the preset table.
    Preset(Preset),
}

impl EnhancementMode {
    /// The parameter set this mode runs with.
    #[must_use]
    pub const fn resolve(&self) -> ParameterSet {
        match self {
            Self::Manual(params) => *params,
            Self::Preset(preset) => preset.resolve(),
        }
    }

    /// Short label stored alongside an enhanced scan.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Manual(_) => MANUAL_LABEL,
            Self::Preset(preset) => preset.display_name(),
        }
    }
}

impl Default for EnhancementMode {
    fn default() -> Self {
        Self::Manual(ParameterSet::default())
    }
}

impl From<ParameterSet> for EnhancementMode {
    fn from(params: ParameterSet) -> Self {
        Self::Manual(params)
    }
}

impl From<Preset> for EnhancementMode {
    fn from(preset: Preset) -> Self {
        Self::Preset(preset)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn manual_mode_resolves_to_its_params() {
        let params = ParameterSet::new(0.05, 1.3, 0.9);
        let mode = EnhancementMode::from(params);
        assert_eq!(mode.resolve(), params);
        assert_eq!(mode.label(), "Manual");
    }

    #[test]
    fn preset_mode_resolves_through_table() {
        let mode = EnhancementMode::from(Preset::EdgeFocus);
        assert_eq!(mode.resolve(), Preset::EdgeFocus.resolve());
        assert_eq!(mode.label(), "Edge Focus");
    }

    #[test]
    fn serde_preset_mode() {
        let mode: EnhancementMode = serde_json::from_str(r#"{"preset":"strong-denoise"}"#).unwrap();
        assert_eq!(mode, EnhancementMode::Preset(Preset::StrongDenoise));
    }

    #[test]
    fn serde_manual_mode_clamps() {
        let mode: EnhancementMode =
            serde_json::from_str(r#"{"manual":{"noise_reduction":0.05,"contrast":3.0}}"#).unwrap();
        assert_eq!(
            mode,
            EnhancementMode::Manual(ParameterSet::new(0.05, 2.0, 0.4))
        );
    }

    #[test]
    fn mode_serde_round_trip() {
        for mode in [
            EnhancementMode::default(),
            EnhancementMode::Preset(Preset::Standard),
        ] {
            let json = serde_json::to_string(&mode).unwrap();
            let back: EnhancementMode = serde_json::from_str(&json).unwrap();
            assert_eq!(mode, back);
        }
    }
}
