//! Printer configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::font::outline::{FontSize, HintTechnique};
use crate::font::tessellate::TessellateOptions;
use crate::gsub::ScriptLang;
use crate::layout::PositionTechnique;
use crate::mesh::MeshVariant;
use crate::text_break::BreakOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    pub font_size_pt: f32,
    pub hint_technique: HintTechnique,
    /// OpenType script tag, `DFLT` when unset. `DFLT` resolves to the font's
    /// `latn` script when it has one, then to its `DFLT` script.
    pub script: String,
    pub language: Option<String>,
    pub position_technique: PositionTechnique,
    pub enable_ligature: bool,
    /// Feature tags toggled on top of the defaults: `"smcp"` enables,
    /// `"-liga"` disables.
    pub features: Vec<String>,
    pub break_options: BreakOptions,
    pub simulate_oblique: bool,
    pub flip_y: bool,
    /// Curve flattening tolerance in mesh units: font units when
    /// `scale_at_assembly`, pixels otherwise.
    pub tolerance: f32,
    /// Cache meshes in font units and scale them when a run is assembled.
    pub scale_at_assembly: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            font_size_pt: 12.0,
            hint_technique: HintTechnique::None,
            script: "DFLT".to_string(),
            language: None,
            position_technique: PositionTechnique::TableDriven,
            enable_ligature: true,
            features: Vec::new(),
            break_options: BreakOptions::default(),
            simulate_oblique: false,
            flip_y: false,
            tolerance: 0.25,
            scale_at_assembly: true,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl PrinterConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&data)?;
        log::debug!("loaded printer config from {}", path.display());
        Ok(config)
    }

    pub fn script_lang(&self) -> ScriptLang {
        let script = ScriptLang::new(&self.script);
        match &self.language {
            Some(lang) => script.with_language(lang),
            None => script,
        }
    }

    /// Size the mesh cache is scoped to.
    pub fn cache_font_size(&self) -> FontSize {
        if self.scale_at_assembly {
            FontSize::Unscaled
        } else {
            FontSize::Points(self.font_size_pt)
        }
    }

    /// Hint the mesh cache is scoped to; unscaled meshes are never hinted.
    pub fn cache_hint(&self) -> HintTechnique {
        self.cache_font_size().effective_hint(self.hint_technique)
    }

    pub fn mesh_variant(&self) -> MeshVariant {
        match (self.simulate_oblique, self.flip_y) {
            (false, false) => MeshVariant::Base,
            (true, false) => MeshVariant::Oblique,
            (false, true) => MeshVariant::FlipY,
            (true, true) => MeshVariant::ObliqueFlipY,
        }
    }

    pub fn tessellate_options(&self) -> TessellateOptions {
        TessellateOptions {
            tolerance: self.tolerance,
            ..TessellateOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_break::SurrogatePairBreakingOption;

    #[test]
    fn default_config_roundtrip() {
        let cfg = PrinterConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed = PrinterConfig::from_toml_str(&toml_str).expect("deserialize");
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let parsed = PrinterConfig::from_toml_str(
            r#"
font_size_pt = 20.0
hint_technique = "custom_auto_fit"
features = ["-liga", "smcp"]

[break_options]
surrogate_pair_breaking = "consecutive_surrogate_pairs_and_joiner"
"#,
        )
        .expect("deserialize");
        assert!((parsed.font_size_pt - 20.0).abs() < f32::EPSILON);
        assert_eq!(parsed.hint_technique, HintTechnique::CustomAutoFit);
        assert_eq!(parsed.features, ["-liga", "smcp"]);
        assert_eq!(
            parsed.break_options.surrogate_pair_breaking,
            SurrogatePairBreakingOption::ConsecutiveSurrogatePairsAndJoiner
        );
        assert!(!parsed.break_options.break_number_after_text);
        assert!(parsed.enable_ligature);
        assert!(parsed.scale_at_assembly);
    }

    #[test]
    fn empty_toml_is_default() {
        let parsed = PrinterConfig::from_toml_str("").expect("deserialize");
        assert_eq!(parsed, PrinterConfig::default());
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let err = PrinterConfig::from_toml_str(r#"hint_technique = "bytecode""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = PrinterConfig::load("/nonexistent/typomesh.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn derived_settings() {
        let mut cfg = PrinterConfig {
            script: "latn".to_string(),
            language: Some("TRK".to_string()),
            ..PrinterConfig::default()
        };
        assert_eq!(cfg.script_lang(), ScriptLang::new("latn").with_language("TRK"));
        assert_eq!(cfg.cache_font_size(), FontSize::Unscaled);
        assert_eq!(cfg.mesh_variant(), MeshVariant::Base);
        cfg.hint_technique = HintTechnique::TrueTypeInstruction;
        assert_eq!(cfg.cache_hint(), HintTechnique::None);

        cfg.scale_at_assembly = false;
        cfg.simulate_oblique = true;
        cfg.flip_y = true;
        assert_eq!(cfg.cache_font_size(), FontSize::Points(12.0));
        assert_eq!(cfg.cache_hint(), HintTechnique::TrueTypeInstruction);
        assert_eq!(cfg.mesh_variant(), MeshVariant::ObliqueFlipY);
    }
}
