//! Closed-form consistent mass and Timoshenko stiffness matrices for a
//! prismatic 3D (12×12) or 2D (6×6) beam element.
//!
//! DOF ordering per node is `[x, y, z, a, b, g]` in 3D and `[x, y, g]` in
//! 2D; the element vector concatenates node i then node j. Axial and
//! torsional behaviour decouples into 2×2 blocks; bending couples the
//! transverse translation with the accompanying rotation in each plane
//! (y–g and z–b) through the shear-flexibility ratios `py`/`pz`. With
//! `py = pz = 0` the matrices reduce to the classical Euler-Bernoulli
//! entries.

use nalgebra::DMatrix;

use crate::parameters::MaterialParameters;

/// Per-element section scalars sampled at the element midpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionProperties {
    pub a: f64,
    pub a_sy: f64,
    pub a_sz: f64,
    pub iy: f64,
    pub iz: f64,
    pub ip: f64,
    pub it: f64,
    pub py: f64,
    pub pz: f64,
}

/// Adds a symmetric sub-block into the element matrix at the given DOF map.
fn scatter(target: &mut DMatrix<f64>, map: &[usize], block: &DMatrix<f64>) {
    for (bi, &gi) in map.iter().enumerate() {
        for (bj, &gj) in map.iter().enumerate() {
            target[(gi, gj)] += block[(bi, bj)];
        }
    }
}

/// 2×2 rod block, `scale * [[d11, d12], [d12, d11]]`.
fn rod_block(scale: f64, d11: f64, d12: f64) -> DMatrix<f64> {
    DMatrix::from_row_slice(2, 2, &[scale * d11, scale * d12, scale * d12, scale * d11])
}

/// Consistent-mass bending block (translational part) for one plane.
///
/// `sign` is +1 for the y–g plane and −1 for the z–b plane, flipping the
/// rotation-coupled entries.
fn bending_mass_translation(m_const: f64, p: f64, l: f64, sign: f64) -> DMatrix<f64> {
    let scale = m_const / 210.0 / (1.0 + p).powi(2);
    let m11 = 70.0 * p * p + 147.0 * p + 78.0;
    let m12 = sign * (35.0 * p * p + 77.0 * p + 44.0) * l / 4.0;
    let m13 = 35.0 * p * p + 63.0 * p + 27.0;
    let m14 = -sign * (35.0 * p * p + 63.0 * p + 26.0) * l / 4.0;
    let m22 = (7.0 * p * p + 14.0 * p + 8.0) * l * l / 4.0;
    let m23 = -m14;
    let m24 = -(7.0 * p * p + 14.0 * p + 6.0) * l * l / 4.0;
    let m33 = m11;
    let m34 = -m12;
    let m44 = m22;
    scale
        * DMatrix::from_row_slice(
            4,
            4,
            &[
                m11, m12, m13, m14, //
                m12, m22, m23, m24, //
                m13, m23, m33, m34, //
                m14, m24, m34, m44,
            ],
        )
}

/// Consistent-mass bending block (rotatory-inertia part) for one plane.
fn bending_mass_rotation(rho: f64, inertia: f64, p: f64, l: f64, sign: f64) -> DMatrix<f64> {
    let scale = rho * inertia / 30.0 / (1.0 + p).powi(2) / l;
    let m11 = 36.0;
    let m12 = -sign * (15.0 * p - 3.0) * l;
    let m13 = -m11;
    let m14 = m12;
    let m22 = (10.0 * p * p + 5.0 * p + 4.0) * l * l;
    let m23 = -m12;
    let m24 = (5.0 * p * p - 5.0 * p - 1.0) * l * l;
    let m33 = m11;
    let m34 = -m12;
    let m44 = m22;
    scale
        * DMatrix::from_row_slice(
            4,
            4,
            &[
                m11, m12, m13, m14, //
                m12, m22, m23, m24, //
                m13, m23, m33, m34, //
                m14, m24, m34, m44,
            ],
        )
}

/// Shear-flexible bending stiffness block for one plane.
fn bending_stiffness(e: f64, inertia: f64, p: f64, l: f64, sign: f64) -> DMatrix<f64> {
    let scale = e * inertia / (1.0 + p) / l.powi(3);
    let k11 = 12.0;
    let k12 = sign * 6.0 * l;
    let k13 = -12.0;
    let k14 = k12;
    let k22 = (4.0 + p) * l * l;
    let k23 = -k12;
    let k24 = (2.0 - p) * l * l;
    let k33 = k11;
    let k34 = -k12;
    let k44 = k22;
    scale
        * DMatrix::from_row_slice(
            4,
            4,
            &[
                k11, k12, k13, k14, //
                k12, k22, k23, k24, //
                k13, k23, k33, k34, //
                k14, k24, k34, k44,
            ],
        )
}

// DOF maps into the 12-entry 3D element vector.
const MAP_3D_AXIAL: [usize; 2] = [0, 6];
const MAP_3D_TORSION: [usize; 2] = [3, 9];
const MAP_3D_BENDING_YG: [usize; 4] = [1, 5, 7, 11];
const MAP_3D_BENDING_ZB: [usize; 4] = [2, 4, 8, 10];

// DOF maps into the 6-entry 2D element vector.
const MAP_2D_AXIAL: [usize; 2] = [0, 3];
const MAP_2D_BENDING_YG: [usize; 4] = [1, 2, 4, 5];

/// 12×12 consistent mass matrix of a 3D Timoshenko beam element.
pub fn mass_matrix_3d(
    section: &SectionProperties,
    material: &MaterialParameters,
    l: f64,
) -> DMatrix<f64> {
    let m_const = material.rho * section.a * l;
    let mut m = DMatrix::zeros(12, 12);

    // axial inertia along x
    scatter(&mut m, &MAP_3D_AXIAL, &rod_block(m_const / 6.0, 2.0, 1.0));
    // torsional inertia around x
    let m_a = m_const * section.ip / section.a / 6.0;
    scatter(&mut m, &MAP_3D_TORSION, &rod_block(m_a, 2.0, 1.0));

    // bending, y translation with g rotation
    let yg = bending_mass_translation(m_const, section.py, l, 1.0)
        + bending_mass_rotation(material.rho, section.iz, section.py, l, 1.0);
    scatter(&mut m, &MAP_3D_BENDING_YG, &yg);

    // bending, z translation with b rotation
    let zb = bending_mass_translation(m_const, section.pz, l, -1.0)
        + bending_mass_rotation(material.rho, section.iy, section.pz, l, -1.0);
    scatter(&mut m, &MAP_3D_BENDING_ZB, &zb);

    m
}

/// 12×12 stiffness matrix of a 3D Timoshenko beam element.
pub fn stiffness_matrix_3d(
    section: &SectionProperties,
    material: &MaterialParameters,
    l: f64,
) -> DMatrix<f64> {
    let mut k = DMatrix::zeros(12, 12);

    // axial stiffness along x
    let k_x = material.e * section.a / l;
    scatter(&mut k, &MAP_3D_AXIAL, &rod_block(k_x, 1.0, -1.0));
    // torsional stiffness around x
    let k_a = material.g * section.it / l;
    scatter(&mut k, &MAP_3D_TORSION, &rod_block(k_a, 1.0, -1.0));

    scatter(
        &mut k,
        &MAP_3D_BENDING_YG,
        &bending_stiffness(material.e, section.iz, section.py, l, 1.0),
    );
    scatter(
        &mut k,
        &MAP_3D_BENDING_ZB,
        &bending_stiffness(material.e, section.iy, section.pz, l, -1.0),
    );

    k
}

/// 6×6 consistent mass matrix of the planar element (x, y, g DOFs).
pub fn mass_matrix_2d(
    section: &SectionProperties,
    material: &MaterialParameters,
    l: f64,
) -> DMatrix<f64> {
    let m_const = material.rho * section.a * l;
    let mut m = DMatrix::zeros(6, 6);

    scatter(&mut m, &MAP_2D_AXIAL, &rod_block(m_const / 6.0, 2.0, 1.0));

    let yg = bending_mass_translation(m_const, section.py, l, 1.0)
        + bending_mass_rotation(material.rho, section.iz, section.py, l, 1.0);
    scatter(&mut m, &MAP_2D_BENDING_YG, &yg);

    m
}

/// 6×6 stiffness matrix of the planar element.
pub fn stiffness_matrix_2d(
    section: &SectionProperties,
    material: &MaterialParameters,
    l: f64,
) -> DMatrix<f64> {
    let mut k = DMatrix::zeros(6, 6);

    let k_x = material.e * section.a / l;
    scatter(&mut k, &MAP_2D_AXIAL, &rod_block(k_x, 1.0, -1.0));

    scatter(
        &mut k,
        &MAP_2D_BENDING_YG,
        &bending_stiffness(material.e, section.iz, section.py, l, 1.0),
    );

    k
}
