//! JSON configuration structs for a straight-beam structure model.
//!
//! The configuration describes a prismatic beam discretized into an
//! equidistant grid of elements. Geometric section properties are given as
//! piecewise polynomials of the running coordinate along the beam axis,
//! one polynomial per property per interval.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ModelError, Result};

/// Upper interval bound: either a coordinate or the `"End"` sentinel
/// standing for "up to the full beam length, inclusive".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IntervalBound {
    Coordinate(f64),
    Sentinel(String),
}

impl IntervalBound {
    pub fn is_end_sentinel(&self) -> bool {
        matches!(self, IntervalBound::Sentinel(s) if s == "End")
    }

    pub fn coordinate(&self) -> Option<f64> {
        match self {
            IntervalBound::Coordinate(x) => Some(*x),
            IntervalBound::Sentinel(_) => None,
        }
    }
}

/// One interval of the piecewise property definition. Every property is a
/// polynomial in the local coordinate `x - start`, lowest order first.
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalConfig {
    pub interval_bounds: (IntervalBound, IntervalBound),
    pub length_y: Vec<f64>,
    pub length_z: Vec<f64>,
    pub area: Vec<f64>,
    pub shear_area_y: Vec<f64>,
    pub shear_area_z: Vec<f64>,
    pub moment_of_inertia_y: Vec<f64>,
    pub moment_of_inertia_z: Vec<f64>,
    pub torsional_moment_of_inertia: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialConfig {
    pub density: f64,
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    pub damping_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeometryConfig {
    pub length_x: f64,
    pub number_of_elements: usize,
    pub defined_on_intervals: Vec<IntervalConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemParameters {
    pub material: MaterialConfig,
    pub geometry: GeometryConfig,
}

/// Target frequency for a single mode, identified by its 1-based position
/// in ascending frequency order.
#[derive(Debug, Clone, Deserialize)]
pub struct ModeTarget {
    pub eigenmode: usize,
    pub eigenfrequency: f64,
}

/// Targets for the geometric-property tuning stages. The three lists are
/// parallel: category name, mode id within that category, target frequency.
#[derive(Debug, Clone, Deserialize)]
pub struct GeometricTargets {
    pub consider_decomposed_modes: Vec<String>,
    pub corresponding_mode_ids: Vec<usize>,
    pub corresponding_eigenfrequencies: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetValues {
    #[serde(default)]
    pub density_for_total_mass: Option<f64>,
    #[serde(default)]
    pub youngs_modulus_for: Option<ModeTarget>,
    #[serde(default)]
    pub geometric_properties_for: Option<GeometricTargets>,
}

fn default_name() -> String {
    "structure".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub domain_size: String,
    pub system_parameters: SystemParameters,
    pub boundary_conditions: String,
    /// Signed global DOF index (as decimal string) mapped to the spring
    /// stiffness replacing the rigid constraint at that DOF.
    #[serde(default)]
    pub elastic_fixity_dofs: BTreeMap<String, f64>,
    #[serde(default)]
    pub adapt_for_target_values: Option<TargetValues>,
}

impl ModelConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ModelConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Structural validation, run eagerly before the model is built.
    pub fn validate(&self) -> Result<()> {
        let material = &self.system_parameters.material;
        if material.density <= 0.0 {
            return Err(ModelError::Configuration(format!(
                "density must be positive, got {}",
                material.density
            )));
        }
        if material.youngs_modulus <= 0.0 {
            return Err(ModelError::Configuration(format!(
                "youngs_modulus must be positive, got {}",
                material.youngs_modulus
            )));
        }
        if material.poisson_ratio <= -1.0 || material.poisson_ratio >= 0.5 {
            return Err(ModelError::Configuration(format!(
                "poisson_ratio must lie in (-1, 0.5), got {}",
                material.poisson_ratio
            )));
        }
        if material.damping_ratio < 0.0 {
            return Err(ModelError::Configuration(format!(
                "damping_ratio must be non-negative, got {}",
                material.damping_ratio
            )));
        }

        let geometry = &self.system_parameters.geometry;
        if geometry.length_x <= 0.0 {
            return Err(ModelError::Configuration(format!(
                "length_x must be positive, got {}",
                geometry.length_x
            )));
        }
        if geometry.number_of_elements == 0 {
            return Err(ModelError::Configuration(
                "number_of_elements must be at least 1".to_string(),
            ));
        }

        self.validate_intervals()?;
        self.validate_targets()
    }

    fn validate_intervals(&self) -> Result<()> {
        let geometry = &self.system_parameters.geometry;
        let intervals = &geometry.defined_on_intervals;
        if intervals.is_empty() {
            return Err(ModelError::Configuration(
                "defined_on_intervals must contain at least one interval".to_string(),
            ));
        }

        let mut expected_start = 0.0_f64;
        let last = intervals.len() - 1;
        for (idx, interval) in intervals.iter().enumerate() {
            let (lower, upper) = &interval.interval_bounds;
            let start = lower.coordinate().ok_or_else(|| {
                ModelError::Configuration(format!(
                    "interval {idx}: lower bound must be a coordinate"
                ))
            })?;
            if (start - expected_start).abs() > 1e-9 {
                return Err(ModelError::Configuration(format!(
                    "interval {idx} starts at {start} but the previous interval ends at \
                     {expected_start}; intervals must cover [0, length_x] without gaps"
                )));
            }

            match upper {
                IntervalBound::Coordinate(end) => {
                    if *end <= start {
                        return Err(ModelError::Configuration(format!(
                            "interval {idx}: upper bound {end} is not above lower bound {start}"
                        )));
                    }
                    if idx == last && *end < geometry.length_x - 1e-9 {
                        return Err(ModelError::Configuration(format!(
                            "last interval ends at {end} but the beam length is {}",
                            geometry.length_x
                        )));
                    }
                    expected_start = *end;
                }
                IntervalBound::Sentinel(s) => {
                    if s != "End" {
                        return Err(ModelError::Configuration(format!(
                            "interval {idx}: unknown upper bound sentinel \"{s}\"; \
                             only \"End\" is available"
                        )));
                    }
                    if idx != last {
                        return Err(ModelError::Configuration(format!(
                            "interval {idx}: the \"End\" sentinel is only valid on the \
                             last interval"
                        )));
                    }
                }
            }

            for (name, coefs) in [
                ("length_y", &interval.length_y),
                ("length_z", &interval.length_z),
                ("area", &interval.area),
                ("shear_area_y", &interval.shear_area_y),
                ("shear_area_z", &interval.shear_area_z),
                ("moment_of_inertia_y", &interval.moment_of_inertia_y),
                ("moment_of_inertia_z", &interval.moment_of_inertia_z),
                (
                    "torsional_moment_of_inertia",
                    &interval.torsional_moment_of_inertia,
                ),
            ] {
                if coefs.is_empty() {
                    return Err(ModelError::Configuration(format!(
                        "interval {idx}: polynomial coefficients for {name} are empty"
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_targets(&self) -> Result<()> {
        let Some(targets) = &self.adapt_for_target_values else {
            return Ok(());
        };
        if let Some(mass) = targets.density_for_total_mass {
            if mass <= 0.0 {
                return Err(ModelError::Configuration(format!(
                    "density_for_total_mass must be positive, got {mass}"
                )));
            }
        }
        if let Some(mode_target) = &targets.youngs_modulus_for {
            if mode_target.eigenmode == 0 {
                return Err(ModelError::Configuration(
                    "youngs_modulus_for.eigenmode is 1-based and must be at least 1".to_string(),
                ));
            }
            if mode_target.eigenfrequency <= 0.0 {
                return Err(ModelError::Configuration(format!(
                    "youngs_modulus_for.eigenfrequency must be positive, got {}",
                    mode_target.eigenfrequency
                )));
            }
        }
        if let Some(geo) = &targets.geometric_properties_for {
            let n = geo.consider_decomposed_modes.len();
            if geo.corresponding_mode_ids.len() != n || geo.corresponding_eigenfrequencies.len() != n
            {
                return Err(ModelError::Configuration(format!(
                    "geometric_properties_for: expected {n} mode ids and {n} eigenfrequencies \
                     to match the {n} considered modes, got {} and {}",
                    geo.corresponding_mode_ids.len(),
                    geo.corresponding_eigenfrequencies.len()
                )));
            }
            for freq in &geo.corresponding_eigenfrequencies {
                if *freq <= 0.0 {
                    return Err(ModelError::Configuration(format!(
                        "geometric_properties_for: target eigenfrequency must be positive, \
                         got {freq}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_json() -> String {
        r#"{
            "name": "test_tower",
            "domain_size": "3D",
            "system_parameters": {
                "material": {
                    "density": 7850.0,
                    "youngs_modulus": 2.1e11,
                    "poisson_ratio": 0.3,
                    "damping_ratio": 0.025
                },
                "geometry": {
                    "length_x": 10.0,
                    "number_of_elements": 5,
                    "defined_on_intervals": [{
                        "interval_bounds": [0.0, "End"],
                        "length_y": [0.2],
                        "length_z": [0.4],
                        "area": [0.08],
                        "shear_area_y": [0.0667],
                        "shear_area_z": [0.0667],
                        "moment_of_inertia_y": [0.00107],
                        "moment_of_inertia_z": [0.000267],
                        "torsional_moment_of_inertia": [0.00082]
                    }]
                }
            },
            "boundary_conditions": "fixed-free"
        }"#
        .to_string()
    }

    #[test]
    fn parses_minimal_config() {
        let config = ModelConfig::from_json_str(&base_json()).unwrap();
        assert_eq!(config.name, "test_tower");
        assert_eq!(config.domain_size, "3D");
        assert_eq!(config.system_parameters.geometry.number_of_elements, 5);
        assert!(config.elastic_fixity_dofs.is_empty());
        assert!(config.adapt_for_target_values.is_none());
    }

    #[test]
    fn parses_end_sentinel() {
        let config = ModelConfig::from_json_str(&base_json()).unwrap();
        let interval = &config.system_parameters.geometry.defined_on_intervals[0];
        assert!(interval.interval_bounds.1.is_end_sentinel());
        assert_eq!(interval.interval_bounds.0.coordinate(), Some(0.0));
    }

    #[test]
    fn rejects_interval_gap() {
        let json = base_json().replace(
            r#""interval_bounds": [0.0, "End"]"#,
            r#""interval_bounds": [1.0, "End"]"#,
        );
        let err = ModelConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn rejects_unknown_sentinel() {
        let json = base_json().replace(
            r#""interval_bounds": [0.0, "End"]"#,
            r#""interval_bounds": [0.0, "Stop"]"#,
        );
        let err = ModelConfig::from_json_str(&json).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Stop"), "unexpected message: {message}");
    }

    #[test]
    fn rejects_short_last_interval() {
        let json = base_json().replace(
            r#""interval_bounds": [0.0, "End"]"#,
            r#""interval_bounds": [0.0, 8.0]"#,
        );
        let err = ModelConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn rejects_zero_elements() {
        let json = base_json().replace(
            r#""number_of_elements": 5"#,
            r#""number_of_elements": 0"#,
        );
        let err = ModelConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn rejects_invalid_poisson_ratio() {
        let json = base_json().replace(
            r#""poisson_ratio": 0.3"#,
            r#""poisson_ratio": 0.5"#,
        );
        let err = ModelConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn rejects_mismatched_target_lists() {
        let json = base_json().replace(
            r#""boundary_conditions": "fixed-free""#,
            r#""boundary_conditions": "fixed-free",
            "adapt_for_target_values": {
                "geometric_properties_for": {
                    "consider_decomposed_modes": ["sway_y", "sway_z"],
                    "corresponding_mode_ids": [1],
                    "corresponding_eigenfrequencies": [0.2, 0.25]
                }
            }"#,
        );
        let err = ModelConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn parses_elastic_fixity_dofs() {
        let json = base_json().replace(
            r#""boundary_conditions": "fixed-free""#,
            r#""boundary_conditions": "fixed-free",
            "elastic_fixity_dofs": {"0": 1.0e8, "-2": 4.0e7}"#,
        );
        let config = ModelConfig::from_json_str(&json).unwrap();
        assert_eq!(config.elastic_fixity_dofs.len(), 2);
        assert_eq!(config.elastic_fixity_dofs["0"], 1.0e8);
    }

    #[test]
    fn parses_multi_interval_geometry() {
        let json = base_json().replace(
            r#""defined_on_intervals": [{
                        "interval_bounds": [0.0, "End"],
                        "length_y": [0.2],
                        "length_z": [0.4],
                        "area": [0.08],
                        "shear_area_y": [0.0667],
                        "shear_area_z": [0.0667],
                        "moment_of_inertia_y": [0.00107],
                        "moment_of_inertia_z": [0.000267],
                        "torsional_moment_of_inertia": [0.00082]
                    }]"#,
            r#""defined_on_intervals": [{
                        "interval_bounds": [0.0, 6.0],
                        "length_y": [0.2],
                        "length_z": [0.4],
                        "area": [0.08, -0.002],
                        "shear_area_y": [0.0667],
                        "shear_area_z": [0.0667],
                        "moment_of_inertia_y": [0.00107],
                        "moment_of_inertia_z": [0.000267],
                        "torsional_moment_of_inertia": [0.00082]
                    }, {
                        "interval_bounds": [6.0, "End"],
                        "length_y": [0.15],
                        "length_z": [0.3],
                        "area": [0.045],
                        "shear_area_y": [0.0375],
                        "shear_area_z": [0.0375],
                        "moment_of_inertia_y": [0.000338],
                        "moment_of_inertia_z": [0.0000844],
                        "torsional_moment_of_inertia": [0.00026]
                    }]"#,
        );
        let config = ModelConfig::from_json_str(&json).unwrap();
        assert_eq!(
            config.system_parameters.geometry.defined_on_intervals.len(),
            2
        );
    }
}
