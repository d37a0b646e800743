//! Immutable model parameters derived from the configuration.
//!
//! `ModelParameters` is a plain value: the optimization routines clone it,
//! mutate the clone while evaluating their objective, and commit the winner
//! back to the model. Global matrices are always computed as pure functions
//! of a `ModelParameters` value (see `assembly`), so no shared state is
//! touched during objective evaluations.

use towerdyn_model::config::{GeometryConfig, IntervalBound, ModelConfig};
use towerdyn_model::error::{ModelError, Result};

use crate::elements::SectionProperties;

/// Isotropic material constants. `g` is derived from `e` and `nu` and is
/// recomputed whenever either changes.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParameters {
    pub rho: f64,
    pub e: f64,
    pub nu: f64,
    pub zeta: f64,
    pub g: f64,
}

impl MaterialParameters {
    pub fn new(rho: f64, e: f64, nu: f64, zeta: f64) -> Self {
        Self {
            rho,
            e,
            nu,
            zeta,
            g: shear_modulus(e, nu),
        }
    }

    pub fn set_youngs_modulus(&mut self, e: f64) {
        self.e = e;
        self.g = shear_modulus(e, self.nu);
    }
}

fn shear_modulus(e: f64, nu: f64) -> f64 {
    e / (2.0 * (1.0 + nu))
}

/// Geometric section property selectable from the piecewise definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionProperty {
    LengthY,
    LengthZ,
    Area,
    ShearAreaY,
    ShearAreaZ,
    InertiaY,
    InertiaZ,
    Torsion,
}

#[derive(Debug, Clone)]
struct PropertyInterval {
    start: f64,
    /// `None` marks the terminal "End" interval, closed at the beam tip.
    end: Option<f64>,
    length_y: Vec<f64>,
    length_z: Vec<f64>,
    area: Vec<f64>,
    shear_area_y: Vec<f64>,
    shear_area_z: Vec<f64>,
    inertia_y: Vec<f64>,
    inertia_z: Vec<f64>,
    torsion: Vec<f64>,
}

impl PropertyInterval {
    fn coefficients(&self, property: SectionProperty) -> &[f64] {
        match property {
            SectionProperty::LengthY => &self.length_y,
            SectionProperty::LengthZ => &self.length_z,
            SectionProperty::Area => &self.area,
            SectionProperty::ShearAreaY => &self.shear_area_y,
            SectionProperty::ShearAreaZ => &self.shear_area_z,
            SectionProperty::InertiaY => &self.inertia_y,
            SectionProperty::InertiaZ => &self.inertia_z,
            SectionProperty::Torsion => &self.torsion,
        }
    }
}

/// Piecewise-polynomial section properties along the beam axis.
///
/// Each interval is half-open `[start, end)`; the terminal interval with
/// the "End" sentinel is closed `[start, lx]`. Polynomials are evaluated
/// in the interval-local coordinate `x - start`.
#[derive(Debug, Clone)]
pub struct PolynomialProperty {
    intervals: Vec<PropertyInterval>,
    length: f64,
}

impl PolynomialProperty {
    pub fn from_config(geometry: &GeometryConfig) -> Result<Self> {
        let mut intervals = Vec::with_capacity(geometry.defined_on_intervals.len());
        for interval in &geometry.defined_on_intervals {
            let (lower, upper) = &interval.interval_bounds;
            let start = lower.coordinate().ok_or_else(|| {
                ModelError::Configuration("interval lower bound must be a coordinate".to_string())
            })?;
            let end = match upper {
                IntervalBound::Coordinate(x) => Some(*x),
                IntervalBound::Sentinel(_) => None,
            };
            intervals.push(PropertyInterval {
                start,
                end,
                length_y: interval.length_y.clone(),
                length_z: interval.length_z.clone(),
                area: interval.area.clone(),
                shear_area_y: interval.shear_area_y.clone(),
                shear_area_z: interval.shear_area_z.clone(),
                inertia_y: interval.moment_of_inertia_y.clone(),
                inertia_z: interval.moment_of_inertia_z.clone(),
                torsion: interval.torsional_moment_of_inertia.clone(),
            });
        }
        Ok(Self {
            intervals,
            length: geometry.length_x,
        })
    }

    pub fn evaluate(&self, x: f64, property: SectionProperty) -> Result<f64> {
        for interval in &self.intervals {
            let contains = match interval.end {
                Some(end) => interval.start <= x && x < end,
                None => interval.start <= x && x <= self.length,
            };
            if contains {
                return Ok(evaluate_polynomial(
                    x - interval.start,
                    interval.coefficients(property),
                ));
            }
        }
        Err(ModelError::Configuration(format!(
            "running coordinate {x} is not covered by any property interval"
        )))
    }
}

fn evaluate_polynomial(x: f64, coefs: &[f64]) -> f64 {
    // Horner, highest order first
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// All scalar inputs the assembly needs: material constants plus the
/// per-element property arrays sampled at element midpoints.
#[derive(Debug, Clone)]
pub struct ModelParameters {
    pub material: MaterialParameters,
    /// Total beam length.
    pub lx: f64,
    /// Number of elements of the equidistant grid.
    pub n_el: usize,
    /// Length of one element, `lx / n_el`.
    pub lx_i: f64,
    /// Running coordinate at each element midpoint.
    pub x_mid: Vec<f64>,
    pub ly: Vec<f64>,
    pub lz: Vec<f64>,
    pub a: Vec<f64>,
    pub a_sy: Vec<f64>,
    pub a_sz: Vec<f64>,
    pub iy: Vec<f64>,
    pub iz: Vec<f64>,
    pub it: Vec<f64>,
    /// Polar moment, `iy + iz` under the circular-equivalence assumption.
    pub ip: Vec<f64>,
    /// Shear-flexibility ratios coupling bending and shear deformation.
    pub py: Vec<f64>,
    pub pz: Vec<f64>,
    /// `false` forces `py = pz = 0` (Bernoulli special case).
    pub shear_flexible: bool,
}

impl ModelParameters {
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let material_config = &config.system_parameters.material;
        let geometry = &config.system_parameters.geometry;
        let material = MaterialParameters::new(
            material_config.density,
            material_config.youngs_modulus,
            material_config.poisson_ratio,
            material_config.damping_ratio,
        );

        let n_el = geometry.number_of_elements;
        let lx = geometry.length_x;
        let lx_i = lx / n_el as f64;
        let x_mid: Vec<f64> = (0..n_el)
            .map(|i| (i as f64 + 0.5) / n_el as f64 * lx)
            .collect();

        let property = PolynomialProperty::from_config(geometry)?;
        let sample = |p: SectionProperty| -> Result<Vec<f64>> {
            x_mid.iter().map(|&x| property.evaluate(x, p)).collect()
        };

        let ly = sample(SectionProperty::LengthY)?;
        let lz = sample(SectionProperty::LengthZ)?;
        let a = sample(SectionProperty::Area)?;
        let a_sy = sample(SectionProperty::ShearAreaY)?;
        let a_sz = sample(SectionProperty::ShearAreaZ)?;
        let iy = sample(SectionProperty::InertiaY)?;
        let iz = sample(SectionProperty::InertiaZ)?;
        let it = sample(SectionProperty::Torsion)?;

        let mut parameters = Self {
            material,
            lx,
            n_el,
            lx_i,
            ly,
            lz,
            a,
            a_sy,
            a_sz,
            iy,
            iz,
            it,
            ip: Vec::new(),
            py: Vec::new(),
            pz: Vec::new(),
            x_mid,
            shear_flexible: true,
        };
        parameters.update_torsional_inertia();
        parameters.update_shear_ratios();
        Ok(parameters)
    }

    /// Recompute `py`/`pz` from the current `e`, `g`, inertias and shear
    /// areas. An exactly zero shear area means shear-rigid and maps to a
    /// zero ratio.
    pub fn update_shear_ratios(&mut self) {
        let e = self.material.e;
        let g = self.material.g;
        let l2 = self.lx_i * self.lx_i;
        let ratio = |inertia: f64, shear_area: f64| -> f64 {
            if shear_area == 0.0 {
                0.0
            } else {
                12.0 * e * inertia / (g * shear_area * l2)
            }
        };
        if self.shear_flexible {
            self.py = self
                .iz
                .iter()
                .zip(&self.a_sy)
                .map(|(&iz, &a_sy)| ratio(iz, a_sy))
                .collect();
            self.pz = self
                .iy
                .iter()
                .zip(&self.a_sz)
                .map(|(&iy, &a_sz)| ratio(iy, a_sz))
                .collect();
        } else {
            self.py = vec![0.0; self.n_el];
            self.pz = vec![0.0; self.n_el];
        }
    }

    /// Polar moment per element, assuming circular equivalence.
    pub fn update_torsional_inertia(&mut self) {
        self.ip = self
            .iy
            .iter()
            .zip(&self.iz)
            .map(|(&iy, &iz)| iy + iz)
            .collect();
    }

    pub fn set_youngs_modulus(&mut self, e: f64) {
        self.material.set_youngs_modulus(e);
        self.update_shear_ratios();
    }

    pub fn set_bernoulli(&mut self, bernoulli: bool) {
        self.shear_flexible = !bernoulli;
        self.update_shear_ratios();
    }

    pub fn total_mass(&self) -> f64 {
        self.a
            .iter()
            .map(|&a| a * self.material.rho * self.lx_i)
            .sum()
    }

    pub fn section(&self, element: usize) -> SectionProperties {
        SectionProperties {
            a: self.a[element],
            a_sy: self.a_sy[element],
            a_sz: self.a_sz[element],
            iy: self.iy[element],
            iz: self.iz[element],
            ip: self.ip[element],
            it: self.it[element],
            py: self.py[element],
            pz: self.pz[element],
        }
    }
}
