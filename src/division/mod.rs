//! Division engine.
//!
//! - [`clock`]: per-cell timer against an Ornstein-Uhlenbeck threshold
//! - [`stress`]: hydrostatic mutation criterion and 2x2 eigen-decomposition
//! - [`split`]: mass-conserving field split

pub mod clock;
pub mod split;
pub mod stress;

pub use clock::{inherit_threshold_mean, DivisionClock, OuProcess};
pub use split::{split_cell, SplitPlane, SPLIT_SHARPNESS};
pub use stress::{
    daughter_property, decide_mutation, eigen_2x2, most_anisotropic, AnisotropyPick, Eigen2,
    MutationDecision,
};
