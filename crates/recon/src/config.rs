use serde::{Deserialize, Serialize};

use tracemerge_core::geometry::{DEFAULT_EXACT_TOLERANCE, DEFAULT_POTENTIAL_THRESHOLD};
use tracemerge_core::{PlanarGeometry, ReviewCategory, SeriesId};
use tracemerge_store::DuplicatePolicy;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// `tracemerge.toml`. Every table is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub merge: ReduceConfig,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    #[serde(default = "default_exact_tolerance")]
    pub exact_tolerance: f64,
    #[serde(default = "default_potential_threshold")]
    pub potential_threshold: f64,
    /// Run the pairwise loop on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_exact_tolerance() -> f64 {
    DEFAULT_EXACT_TOLERANCE
}

fn default_potential_threshold() -> f64 {
    DEFAULT_POTENTIAL_THRESHOLD
}

fn default_parallel() -> bool {
    true
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            exact_tolerance: default_exact_tolerance(),
            potential_threshold: default_potential_threshold(),
            parallel: default_parallel(),
        }
    }
}

impl MatchingConfig {
    pub fn geometry(&self) -> PlanarGeometry {
        PlanarGeometry::new(self.exact_tolerance, self.potential_threshold)
    }
}

// ---------------------------------------------------------------------------
// Store + Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReduceConfig {
    /// Series whose metadata and section layout seed the merged output.
    #[serde(default)]
    pub base_series: SeriesId,
    /// Review categories in the order the reducer visits them.
    #[serde(default = "default_category_order")]
    pub category_order: Vec<ReviewCategory>,
}

fn default_category_order() -> Vec<ReviewCategory> {
    ReviewCategory::DEFAULT_ORDER.to_vec()
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self { base_series: SeriesId::default(), category_order: default_category_order() }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let m = &self.matching;

        if !(m.exact_tolerance > 0.0 && m.exact_tolerance < 1.0) {
            return Err(ReconError::ConfigValidation(format!(
                "matching.exact_tolerance must be in (0, 1), got {}",
                m.exact_tolerance
            )));
        }

        // A potential match must be reachable below the exact tier.
        let ceiling = 1.0 - m.exact_tolerance;
        if !(m.potential_threshold >= 0.0 && m.potential_threshold < ceiling) {
            return Err(ReconError::ConfigValidation(format!(
                "matching.potential_threshold must be in [0, {ceiling}), got {}",
                m.potential_threshold
            )));
        }

        let order = &self.merge.category_order;
        let mut seen = order.clone();
        seen.sort();
        seen.dedup();
        if order.len() != ReviewCategory::DEFAULT_ORDER.len()
            || seen.len() != ReviewCategory::DEFAULT_ORDER.len()
        {
            let names: Vec<&str> = order.iter().map(|c| c.as_str()).collect();
            return Err(ReconError::ConfigValidation(format!(
                "merge.category_order must list each of exact, potential, potential_realigned, unique once, got [{}]",
                names.join(", ")
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
