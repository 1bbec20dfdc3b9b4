use std::path::Path;

use anyhow::Context;
use bevy::prelude::*;
use jackdaw_commands::{CommandHistory, Transactions};
use serde::{Deserialize, Serialize};

/// Inspector configuration. Missing keys in a settings file take their
/// defaults.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorSettings {
    /// Nesting depth past which values are shown read-only.
    pub max_depth: usize,
    /// Record edits in an undo history.
    pub undo: bool,
    /// Maximum number of undo entries; unbounded when absent.
    pub history_limit: Option<usize>,
    /// Decimal places shown for floating-point fields.
    pub float_precision: usize,
    /// Value change per pixel when dragging a float field.
    pub drag_step: f64,
    /// Components whose type path starts with one of these are not shown.
    pub hidden_prefixes: Vec<String>,
}

impl Default for InspectorSettings {
    fn default() -> Self {
        Self {
            max_depth: 4,
            undo: true,
            history_limit: None,
            float_precision: 3,
            drag_step: 0.01,
            hidden_prefixes: vec!["bevy_ecs::hierarchy::".to_string()],
        }
    }
}

impl InspectorSettings {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid inspector settings")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("failed to load {}", path.display()))
    }

    /// A transaction coordinator configured by these settings.
    pub fn transactions(&self) -> Transactions {
        if !self.undo {
            return Transactions::disabled();
        }
        match self.history_limit {
            Some(limit) => Transactions::with_history(CommandHistory::with_limit(limit)),
            None => Transactions::enabled(),
        }
    }

    pub fn is_hidden(&self, type_path: &str) -> bool {
        self.hidden_prefixes
            .iter()
            .any(|prefix| type_path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = InspectorSettings::from_json(r#"{ "max_depth": 2, "history_limit": 16 }"#)
            .unwrap();
        assert_eq!(settings.max_depth, 2);
        assert_eq!(settings.history_limit, Some(16));
        assert_eq!(settings.float_precision, 3);
        assert!(settings.undo);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = InspectorSettings::from_json("{ max_depth: }").unwrap_err();
        assert!(err.to_string().contains("invalid inspector settings"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = InspectorSettings::load("/nonexistent/inspector.json").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/inspector.json"));
    }

    #[test]
    fn undo_flag_selects_coordinator() {
        let settings = InspectorSettings {
            undo: false,
            ..default()
        };
        assert!(!settings.transactions().is_enabled());
        assert!(InspectorSettings::default().transactions().is_enabled());
    }

    #[test]
    fn hierarchy_components_are_hidden() {
        let settings = InspectorSettings::default();
        assert!(settings.is_hidden("bevy_ecs::hierarchy::ChildOf"));
        assert!(!settings.is_hidden("bevy_transform::components::transform::Transform"));
    }
}
