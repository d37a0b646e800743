//! Configuration data model for the towerdyn structural dynamics engine.
//!
//! This crate owns the JSON-facing configuration structs and the error
//! taxonomy shared by the solver and CLI crates. It performs the structural
//! validation that does not require knowledge of the DOF tables (interval
//! coverage, positivity of material constants, matching target lists);
//! semantic validation against the support and mode-category tables lives
//! in `towerdyn-solver`.

pub mod config;
pub mod error;

pub use config::{
    GeometryConfig, GeometricTargets, IntervalBound, IntervalConfig, MaterialConfig, ModeTarget,
    ModelConfig, SystemParameters, TargetValues,
};
pub use error::{ModelError, Result};
