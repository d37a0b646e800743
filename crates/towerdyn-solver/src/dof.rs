//! Degree-of-freedom bookkeeping: domain size, DOF labels, support
//! conditions and the reduction/extension mapping between the full DOF
//! space and the kept-DOF space.

use nalgebra::{DMatrix, DVector};
use towerdyn_model::error::{ModelError, Result};

pub const NODES_PER_ELEMENT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainSize {
    TwoD,
    ThreeD,
}

impl DomainSize {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "2D" => Ok(DomainSize::TwoD),
            "3D" => Ok(DomainSize::ThreeD),
            other => Err(ModelError::Configuration(format!(
                "the domain size \"{other}\" is not available. Choose one of: 2D, 3D"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DomainSize::TwoD => "2D",
            DomainSize::ThreeD => "3D",
        }
    }

    pub fn dofs_per_node(self) -> usize {
        match self {
            DomainSize::TwoD => 3,
            DomainSize::ThreeD => 6,
        }
    }

    pub fn dof_labels(self) -> &'static [DofLabel] {
        match self {
            DomainSize::TwoD => &[DofLabel::X, DofLabel::Y, DofLabel::G],
            DomainSize::ThreeD => &[
                DofLabel::X,
                DofLabel::Y,
                DofLabel::Z,
                DofLabel::A,
                DofLabel::B,
                DofLabel::G,
            ],
        }
    }
}

/// Nodal DOF label: translations `x`, `y`, `z` and rotations `a` (around
/// x), `b` (around y), `g` (around z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DofLabel {
    X,
    Y,
    Z,
    A,
    B,
    G,
}

impl DofLabel {
    pub fn name(self) -> &'static str {
        match self {
            DofLabel::X => "x",
            DofLabel::Y => "y",
            DofLabel::Z => "z",
            DofLabel::A => "a",
            DofLabel::B => "b",
            DofLabel::G => "g",
        }
    }
}

/// Support pattern at the two beam ends. Constrained DOFs are stored as
/// signed global indices: non-negative counts from the base node, negative
/// from the end of the DOF vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportCondition {
    FixedFixed,
    PinnedPinned,
    FixedPinned,
    PinnedFixed,
    FixedFree,
    FreeFixed,
}

impl SupportCondition {
    pub const ALL: [SupportCondition; 6] = [
        SupportCondition::FixedFixed,
        SupportCondition::PinnedPinned,
        SupportCondition::FixedPinned,
        SupportCondition::PinnedFixed,
        SupportCondition::FixedFree,
        SupportCondition::FreeFixed,
    ];

    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|condition| condition.name() == name)
            .ok_or_else(|| {
                let available: Vec<&str> = Self::ALL.iter().map(|c| c.name()).collect();
                ModelError::Configuration(format!(
                    "the boundary condition \"{name}\" is not available. Choose one of: {}",
                    available.join(", ")
                ))
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            SupportCondition::FixedFixed => "fixed-fixed",
            SupportCondition::PinnedPinned => "pinned-pinned",
            SupportCondition::FixedPinned => "fixed-pinned",
            SupportCondition::PinnedFixed => "pinned-fixed",
            SupportCondition::FixedFree => "fixed-free",
            SupportCondition::FreeFixed => "free-fixed",
        }
    }

    /// Signed constrained-DOF table for the given domain.
    pub fn constrained_dofs(self, domain: DomainSize) -> &'static [i64] {
        match domain {
            DomainSize::TwoD => match self {
                SupportCondition::FixedFixed => &[0, 1, 2, -3, -2, -1],
                SupportCondition::PinnedPinned => &[0, 1, -3, -2],
                SupportCondition::FixedPinned => &[0, 1, 2, -3, -2],
                SupportCondition::PinnedFixed => &[0, 1, -3, -2, -1],
                SupportCondition::FixedFree => &[0, 1, 2],
                SupportCondition::FreeFixed => &[-3, -2, -1],
            },
            DomainSize::ThreeD => match self {
                SupportCondition::FixedFixed => {
                    &[0, 1, 2, 3, 4, 5, -6, -5, -4, -3, -2, -1]
                }
                SupportCondition::PinnedPinned => &[0, 1, 2, -6, -5, -4],
                SupportCondition::FixedPinned => &[0, 1, 2, 3, 4, 5, -6, -5, -4],
                SupportCondition::PinnedFixed => &[0, 1, 2, -6, -5, -4, -3, -2, -1],
                SupportCondition::FixedFree => &[0, 1, 2, 3, 4, 5],
                SupportCondition::FreeFixed => &[-6, -5, -4, -3, -2, -1],
            },
        }
    }
}

/// Shifts a signed DOF index into the global `[0, n_dofs)` numbering.
pub fn resolve_signed_dof(dof: i64, n_dofs: usize) -> Result<usize> {
    let resolved = if dof < 0 { dof + n_dofs as i64 } else { dof };
    if resolved < 0 || resolved >= n_dofs as i64 {
        return Err(ModelError::Configuration(format!(
            "DOF index {dof} is outside the global DOF range of size {n_dofs}"
        )));
    }
    Ok(resolved as usize)
}

/// Which index sets a reduction or extension applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionAxis {
    Row,
    Column,
    Both,
    /// Single-column matrix treated as a vector of full-DOF length.
    RowVector,
}

/// Pure mapping between the full DOF space and the kept-DOF subspace.
///
/// `reduce` and `extend` are exact inverses on the kept-DOF subspace:
/// reducing an extension returns the input, and extending a reduction
/// zeroes exactly the dropped DOFs.
#[derive(Debug, Clone)]
pub struct DofReducer {
    n_full: usize,
    dofs_to_keep: Vec<usize>,
}

impl DofReducer {
    pub fn new(n_full: usize, constrained: &[usize]) -> Self {
        let dofs_to_keep: Vec<usize> = (0..n_full)
            .filter(|dof| !constrained.contains(dof))
            .collect();
        Self {
            n_full,
            dofs_to_keep,
        }
    }

    pub fn n_full(&self) -> usize {
        self.n_full
    }

    pub fn n_reduced(&self) -> usize {
        self.dofs_to_keep.len()
    }

    pub fn dofs_to_keep(&self) -> &[usize] {
        &self.dofs_to_keep
    }

    pub fn keeps(&self, dof: usize) -> bool {
        self.dofs_to_keep.binary_search(&dof).is_ok()
    }

    /// Projects rows/columns onto the kept-DOF subspace.
    pub fn reduce(&self, matrix: &DMatrix<f64>, axis: ReductionAxis) -> DMatrix<f64> {
        let keep = &self.dofs_to_keep;
        match axis {
            ReductionAxis::Row => DMatrix::from_fn(keep.len(), matrix.ncols(), |i, j| {
                matrix[(keep[i], j)]
            }),
            ReductionAxis::Column => DMatrix::from_fn(matrix.nrows(), keep.len(), |i, j| {
                matrix[(i, keep[j])]
            }),
            ReductionAxis::Both => DMatrix::from_fn(keep.len(), keep.len(), |i, j| {
                matrix[(keep[i], keep[j])]
            }),
            ReductionAxis::RowVector => {
                DMatrix::from_fn(keep.len(), 1, |i, _| matrix[(keep[i], 0)])
            }
        }
    }

    /// Zero-fills dropped DOFs, inverse of `reduce` on the kept subspace.
    pub fn extend(&self, matrix: &DMatrix<f64>, axis: ReductionAxis) -> DMatrix<f64> {
        let keep = &self.dofs_to_keep;
        match axis {
            ReductionAxis::Row => {
                let mut extended = DMatrix::zeros(self.n_full, matrix.ncols());
                for (reduced, &full) in keep.iter().enumerate() {
                    for j in 0..matrix.ncols() {
                        extended[(full, j)] = matrix[(reduced, j)];
                    }
                }
                extended
            }
            ReductionAxis::Column => {
                let mut extended = DMatrix::zeros(matrix.nrows(), self.n_full);
                for (reduced, &full) in keep.iter().enumerate() {
                    for i in 0..matrix.nrows() {
                        extended[(i, full)] = matrix[(i, reduced)];
                    }
                }
                extended
            }
            ReductionAxis::Both => {
                let mut extended = DMatrix::zeros(self.n_full, self.n_full);
                for (ri, &fi) in keep.iter().enumerate() {
                    for (rj, &fj) in keep.iter().enumerate() {
                        extended[(fi, fj)] = matrix[(ri, rj)];
                    }
                }
                extended
            }
            ReductionAxis::RowVector => {
                let mut extended = DMatrix::zeros(self.n_full, 1);
                for (reduced, &full) in keep.iter().enumerate() {
                    extended[(full, 0)] = matrix[(reduced, 0)];
                }
                extended
            }
        }
    }

    pub fn reduce_vector(&self, vector: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.dofs_to_keep.len(), |i, _| {
            vector[self.dofs_to_keep[i]]
        })
    }

    pub fn extend_vector(&self, vector: &DVector<f64>) -> DVector<f64> {
        let mut extended = DVector::zeros(self.n_full);
        for (reduced, &full) in self.dofs_to_keep.iter().enumerate() {
            extended[full] = vector[reduced];
        }
        extended
    }
}
