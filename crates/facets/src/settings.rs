use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    color::Rgb,
    error::{PaintError, Result},
};

/// Color space the k-means clustering runs in.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClusteringColorSpace {
    #[default]
    Rgb,
    Hsl,
    Lab,
}

/// Order in which undersized facets are visited during reduction.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetRemovalOrder {
    #[default]
    LargeToSmall,
    SmallToLarge,
}

/// A palette entry the clustered colors are snapped to.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum ColorRestriction {
    Rgb(Rgb),
    Alias(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ResizeBounds {
    #[schemars(range(min = 1))]
    pub max_width: u32,
    #[schemars(range(min = 1))]
    pub max_height: u32,
}

impl Default for ResizeBounds {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
        }
    }
}

/// Configuration of a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Number of k-means clusters (palette size before restrictions)
    #[schemars(range(min = 1, max = 256))]
    pub cluster_count: usize,
    /// Clustering stops once the summed centroid displacement is at or below this value
    pub convergence_threshold: f64,
    pub color_space: ClusteringColorSpace,
    /// When non-empty, clustered colors are snapped to the closest of these
    pub color_restrictions: Vec<ColorRestriction>,
    /// Named colors usable in `color_restrictions`
    pub color_aliases: BTreeMap<String, Rgb>,
    /// Number of narrow pixel strip cleanup + facet rebuild rounds
    pub narrow_strip_cleanup_runs: usize,
    /// Facets with fewer pixels are merged into their neighbours
    pub min_facet_size: usize,
    pub facet_removal_order: FacetRemovalOrder,
    /// Upper bound on the number of facets, unlimited when absent
    pub max_facet_count: Option<usize>,
    /// Rounds of midpoint halving applied to every border segment
    pub segment_halving_rounds: usize,
    /// Images larger than these bounds are scaled down first
    pub resize: Option<ResizeBounds>,
    /// Seed for centroid initialisation, the current time when absent
    pub random_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cluster_count: 16,
            convergence_threshold: 1.0,
            color_space: ClusteringColorSpace::Rgb,
            color_restrictions: Vec::new(),
            color_aliases: BTreeMap::new(),
            narrow_strip_cleanup_runs: 3,
            min_facet_size: 20,
            facet_removal_order: FacetRemovalOrder::LargeToSmall,
            max_facet_count: None,
            segment_halving_rounds: 2,
            resize: Some(ResizeBounds::default()),
            random_seed: None,
        }
    }
}

impl Settings {
    /// JSON schema of the settings document
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=256).contains(&self.cluster_count) {
            return Err(PaintError::InvalidSettings(format!(
                "cluster_count must be between 1 and 256, got {}",
                self.cluster_count
            )));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(PaintError::InvalidSettings(format!(
                "convergence_threshold must be a non-negative number, got {}",
                self.convergence_threshold
            )));
        }
        if let Some(bounds) = self.resize {
            if bounds.max_width == 0 || bounds.max_height == 0 {
                return Err(PaintError::InvalidSettings(
                    "resize bounds must be non-zero".to_string(),
                ));
            }
        }
        self.restricted_colors().map(|_| ())
    }

    /// Resolves `color_restrictions` through the alias table.
    pub fn restricted_colors(&self) -> Result<Vec<Rgb>> {
        self.color_restrictions
            .iter()
            .map(|restriction| match restriction {
                ColorRestriction::Rgb(rgb) => Ok(*rgb),
                ColorRestriction::Alias(name) => {
                    self.color_aliases.get(name).copied().ok_or_else(|| {
                        PaintError::InvalidSettings(format!("unknown color alias '{name}'"))
                    })
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cluster_count, 16);
        assert_eq!(settings.min_facet_size, 20);
    }

    #[test]
    fn test_restrictions_resolve_aliases() {
        let mut settings = Settings::default();
        settings.color_aliases.insert("red".to_string(), [255, 0, 0]);
        settings.color_restrictions = vec![
            ColorRestriction::Alias("red".to_string()),
            ColorRestriction::Rgb([0, 0, 255]),
        ];
        assert_eq!(
            settings.restricted_colors().unwrap(),
            vec![[255, 0, 0], [0, 0, 255]]
        );
    }

    #[test]
    fn test_unknown_alias_is_rejected() {
        let mut settings = Settings::default();
        settings.color_restrictions = vec![ColorRestriction::Alias("teal".to_string())];
        assert!(matches!(
            settings.validate(),
            Err(PaintError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_cluster_count_bounds() {
        let mut settings = Settings::default();
        settings.cluster_count = 0;
        assert!(settings.validate().is_err());
        settings.cluster_count = 257;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"cluster_count": 8, "color_space": "lab"}"#).unwrap();
        assert_eq!(settings.cluster_count, 8);
        assert_eq!(settings.color_space, ClusteringColorSpace::Lab);
        assert_eq!(settings.narrow_strip_cleanup_runs, 3);
    }
}
