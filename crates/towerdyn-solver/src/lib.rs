//! Structural-dynamics engine for slender beam structures.
//!
//! The crate assembles a finite-element model of a straight prismatic
//! Timoshenko beam, reduces it under boundary conditions, solves the
//! generalized eigenproblem with mode categorization, tunes parameters
//! against target eigenfrequencies and integrates the equations of motion
//! in time.

pub mod analysis;
pub mod assembly;
pub mod dof;
pub mod eigen;
pub mod elements;
pub mod model;
pub mod optimization;
pub mod parameters;
pub mod residual;
pub mod schemes;
pub mod solver;

pub use analysis::{
    AnalysisType, DynamicAnalysis, DynamicResults, EigenReport, EigenvalueAnalysis,
    StaticAnalysis, StaticResults,
};
pub use assembly::{PointValues, assemble_mass, assemble_stiffness};
pub use dof::{DofLabel, DofReducer, DomainSize, ReductionAxis, SupportCondition};
pub use eigen::{EigenSolution, ModeCategory, generalized_eigen};
pub use elements::SectionProperties;
pub use model::StructureModel;
pub use optimization::{
    MinimizePairResult, MinimizeResult, TuningOutcome, minimize_bounded_pair,
    minimize_scalar_bounded,
};
pub use parameters::{MaterialParameters, ModelParameters, PolynomialProperty, SectionProperty};
pub use residual::{
    InternalForces, IterationMethod, ResidualBasedSolver, StepConvergence,
};
pub use schemes::{
    BackwardEuler1, Bdf2, CompModel, Euler12, ForwardEuler1, GeneralizedAlpha, InitialConditions,
    RungeKutta4, SchemeKind, TimeIntegrationScheme,
};
pub use solver::Solver;
