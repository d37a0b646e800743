//! Global matrix assembly.
//!
//! Assembly is a pure function of a `ModelParameters` value: the dense
//! `(n_full × n_full)` matrix is preallocated and each element block is
//! added at its DOF offset `dofs_per_node * i`. Element blocks are
//! evaluated in parallel; the additions are commutative, so the serial
//! accumulation order does not affect the result.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::dof::{DomainSize, NODES_PER_ELEMENT};
use crate::elements;
use crate::parameters::ModelParameters;

/// Diagonal point injections (elastic supports, lumped masses), keyed by
/// global DOF index.
#[derive(Debug, Clone, Default)]
pub struct PointValues {
    entries: Vec<(usize, f64)>,
}

impl PointValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dof: usize, value: f64) {
        self.entries.push((dof, value));
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn assemble(
    parameters: &ModelParameters,
    domain: DomainSize,
    point_values: &PointValues,
    element_matrix: impl Fn(usize) -> DMatrix<f64> + Sync + Send,
) -> DMatrix<f64> {
    let dofs_per_node = domain.dofs_per_node();
    let n_nodes = parameters.n_el + 1;
    let n_full = n_nodes * dofs_per_node;
    let block = dofs_per_node * NODES_PER_ELEMENT;

    let element_blocks: Vec<DMatrix<f64>> = (0..parameters.n_el)
        .into_par_iter()
        .map(element_matrix)
        .collect();

    let mut global = DMatrix::zeros(n_full, n_full);
    for (i, element) in element_blocks.iter().enumerate() {
        let offset = dofs_per_node * i;
        for r in 0..block {
            for c in 0..block {
                global[(offset + r, offset + c)] += element[(r, c)];
            }
        }
    }

    for &(dof, value) in point_values.entries() {
        global[(dof, dof)] += value;
    }

    global
}

/// Assembles the global consistent mass matrix plus point-mass injections.
pub fn assemble_mass(
    parameters: &ModelParameters,
    domain: DomainSize,
    point_mass: &PointValues,
) -> DMatrix<f64> {
    assemble(parameters, domain, point_mass, |i| {
        let section = parameters.section(i);
        match domain {
            DomainSize::TwoD => {
                elements::mass_matrix_2d(&section, &parameters.material, parameters.lx_i)
            }
            DomainSize::ThreeD => {
                elements::mass_matrix_3d(&section, &parameters.material, parameters.lx_i)
            }
        }
    })
}

/// Assembles the global stiffness matrix plus point-stiffness injections
/// (elastic boundary conditions).
pub fn assemble_stiffness(
    parameters: &ModelParameters,
    domain: DomainSize,
    point_stiffness: &PointValues,
) -> DMatrix<f64> {
    assemble(parameters, domain, point_stiffness, |i| {
        let section = parameters.section(i);
        match domain {
            DomainSize::TwoD => {
                elements::stiffness_matrix_2d(&section, &parameters.material, parameters.lx_i)
            }
            DomainSize::ThreeD => {
                elements::stiffness_matrix_3d(&section, &parameters.material, parameters.lx_i)
            }
        }
    })
}
