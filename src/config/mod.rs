//! Configuration module for loading simulation parameters.
//!
//! Sections are plain serde structs with defaults; `Parameters::validate`
//! rejects inconsistent sets before any stepping begins.

mod parameters;

pub use parameters::{
    BoundaryCondition, CellParameters, DomainParameters, Parameters, ProliferationParameters,
    RunParameters,
};
