//! Layout configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for layout, reconciliation and expansion.
///
/// All distances are in topology-relative units; the renderer maps them to
/// pixels. Deserializes from a partial camelCase object, missing fields fall
/// back to [`LayoutConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Row-axis node size; the unit of the separation function.
    pub row_gap: f64,
    /// Added to the widest node's width to get the column spacing.
    pub column_padding: f64,
    /// Extra separation, in row gaps, between neighbours with different parents.
    pub cousin_gap: f64,
    /// Rows between independent root trees (`index * row_gap * root_stack_rows`).
    pub root_stack_rows: f64,
    /// Minimum per-axis move for reconciliation to persist a position.
    pub reposition_epsilon: f64,
    /// Minimum per-axis move for expansion to rewrite an existing node.
    pub placement_epsilon: f64,
    /// Number of children requested from the generator per expansion.
    pub expansion_count: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_gap: 60.0,
            column_padding: 120.0,
            cousin_gap: 0.6,
            root_stack_rows: 6.0,
            reposition_epsilon: 1.0,
            placement_epsilon: 0.1,
            expansion_count: 6,
        }
    }
}

impl LayoutConfig {
    /// Check every field; the first invalid one is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.row_gap.is_finite() && self.row_gap > 0.0) {
            return Err(ConfigError::InvalidRowGap(self.row_gap));
        }
        if !(self.column_padding.is_finite() && self.column_padding >= 0.0) {
            return Err(ConfigError::InvalidColumnPadding(self.column_padding));
        }
        for (name, value) in [
            ("cousin_gap", self.cousin_gap),
            ("root_stack_rows", self.root_stack_rows),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidFactor { name, value });
            }
        }
        for (name, value) in [
            ("reposition_epsilon", self.reposition_epsilon),
            ("placement_epsilon", self.placement_epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidEpsilon { name, value });
            }
        }
        if self.expansion_count == 0 {
            return Err(ConfigError::ZeroExpansionCount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(LayoutConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_and_negative_row_gap() {
        for row_gap in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let config = LayoutConfig {
                row_gap,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidRowGap(_))),
                "row_gap {row_gap} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_bad_epsilon() {
        let config = LayoutConfig {
            reposition_epsilon: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidEpsilon {
                name: "reposition_epsilon",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: LayoutConfig =
            serde_json::from_str(r#"{ "rowGap": 80, "expansionCount": 4 }"#).unwrap();
        assert_eq!(config.row_gap, 80.0);
        assert_eq!(config.expansion_count, 4);
        assert_eq!(config.column_padding, LayoutConfig::default().column_padding);
    }
}
