//! Parameter structures for the phase-field population engine.
//!
//! Every section loads from its own JSON file and falls back to defaults,
//! so a run directory only needs to override what it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level parameters container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    /// Domain and patch geometry
    pub domain: DomainParameters,
    /// Cell shape and inherited properties
    pub cell: CellParameters,
    /// Division timing and mutation
    pub proliferation: ProliferationParameters,
    /// Step counts and reporting
    pub run: RunParameters,
}

impl Parameters {
    /// Load parameters from JSON files, or use defaults if files don't exist
    pub fn load_or_default() -> Self {
        Self::load_from_dir("data/parameters")
    }

    /// Load parameters from specific directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            domain: load_section(dir.join("domain.json"), "domain"),
            cell: load_section(dir.join("cell.json"), "cell"),
            proliferation: load_section(dir.join("proliferation.json"), "proliferation"),
            run: load_section(dir.join("run.json"), "run"),
        }
    }

    /// Check the parameter set before any stepping begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [lx, ly, lz] = self.domain.size;
        if lx == 0 || ly == 0 || lz == 0 {
            return Err(ConfigError::EmptyDomain { size: self.domain.size });
        }
        if self.cell.radius <= 0.0 {
            return Err(ConfigError::invalid("cell.radius", "must be positive"));
        }
        if (self.domain.margin as f64) < self.cell.radius {
            return Err(ConfigError::MarginTooSmall {
                margin: self.domain.margin,
                radius: self.cell.radius,
            });
        }
        match self.domain.birth_boundaries.len() {
            0 | 4 => {}
            n => return Err(ConfigError::BirthBoundaries { len: n }),
        }
        if self.cell.founders == 0 {
            return Err(ConfigError::invalid("cell.founders", "at least one founder is required"));
        }
        if let Some(positions) = &self.cell.founder_positions {
            if positions.len() != self.cell.founders {
                return Err(ConfigError::invalid(
                    "cell.founder_positions",
                    format!("expected {} positions, got {}", self.cell.founders, positions.len()),
                ));
            }
        }

        let p = &self.proliferation;
        if p.correlation_time <= 0.0 {
            return Err(ConfigError::invalid("proliferation.correlation_time", "must be positive"));
        }
        if p.sigma < 0.0 {
            return Err(ConfigError::invalid("proliferation.sigma", "must be non-negative"));
        }
        if p.mean_division_interval <= 0.0 {
            return Err(ConfigError::invalid(
                "proliferation.mean_division_interval",
                "must be positive",
            ));
        }
        if p.min_property > p.max_property {
            return Err(ConfigError::invalid(
                "proliferation.min_property",
                format!("{} exceeds max_property {}", p.min_property, p.max_property),
            ));
        }

        if self.run.ninfo == 0 || self.run.nsubsteps == 0 {
            return Err(ConfigError::invalid("run.ninfo", "reporting interval must be non-zero"));
        }
        Ok(())
    }
}

fn load_section<T, P>(path: P, name: &str) -> T
where
    T: Default + for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    match std::fs::read_to_string(path.as_ref()) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(params) => {
                log::info!("Loaded {} parameters from {:?}", name, path.as_ref());
                params
            }
            Err(e) => {
                log::warn!("Failed to parse {} parameters: {}, using defaults", name, e);
                T::default()
            }
        },
        Err(_) => {
            log::info!("{} parameters file not found, using defaults", name);
            T::default()
        }
    }
}

/// Boundary treatment of the global domain.
///
/// Addressing is periodic in every mode; walls only enlarge the box and
/// switch on the (external) wall potentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    #[default]
    Periodic,
    /// Walls at the bottom and top of the z axis
    Channel,
    /// Walls on all four lateral faces; x and y are padded by 4 wall thicknesses
    Box,
}

/// Global grid and patch window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainParameters {
    /// Grid size (Lx, Ly, Lz) before wall padding
    pub size: [u32; 3],
    /// Patch half-width; clamped per axis so a patch never exceeds half the domain
    pub margin: u32,
    pub boundary: BoundaryCondition,
    /// Wall thickness in nodes (used by `BoundaryCondition::Box`)
    pub wall_thickness: f64,
    /// Founder placement region `[xmin, xmax, ymin, ymax]`; empty means the whole domain
    pub birth_boundaries: Vec<u32>,
}

impl DomainParameters {
    /// Domain size after wall padding
    pub fn effective_size(&self) -> [u32; 3] {
        let [lx, ly, lz] = self.size;
        match self.boundary {
            BoundaryCondition::Box => {
                let pad = (4.0 * self.wall_thickness) as u32;
                [lx + pad, ly + pad, lz]
            }
            _ => [lx, ly, lz],
        }
    }
}

impl Default for DomainParameters {
    fn default() -> Self {
        Self {
            size: [48, 48, 24],
            margin: 12,
            boundary: BoundaryCondition::Periodic,
            wall_thickness: 7.0,
            birth_boundaries: Vec::new(),
        }
    }
}

/// Cell shape and the properties daughters inherit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CellParameters {
    /// Number of founder cells
    pub founders: usize,
    /// Explicit founder centres; lattice placement when absent
    pub founder_positions: Option<Vec<[u32; 3]>>,
    /// Cell radius R (nodes)
    pub radius: f64,
    /// Mutable physical property of founders (surface tension gamma)
    pub gamma: f64,
    pub omega_cc: f64,
    pub omega_cs: f64,
    pub alpha: f64,
    pub dpol: f64,
    /// Polarisation magnitude given to newborn cells
    pub polarization_strength: f64,
    /// Angular noise on newborn polarisation (fraction of pi)
    pub polarization_noise: f64,
}

impl Default for CellParameters {
    fn default() -> Self {
        Self {
            founders: 4,
            founder_positions: None,
            radius: 8.0,
            gamma: 0.007,
            omega_cc: 0.001,
            omega_cs: 0.0025,
            alpha: 0.05,
            dpol: 0.01,
            polarization_strength: 1.0,
            polarization_noise: 1.0,
        }
    }
}

/// Division timing (OU threshold) and mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProliferationParameters {
    pub enabled: bool,
    /// Step after which division timers start running
    pub warmup_step: u64,
    /// Mean of the exponential offset added to the warm-up for founder threshold means
    pub mean_division_interval: f64,
    /// OU correlation time (steps)
    pub correlation_time: f64,
    /// OU noise amplitude
    pub sigma: f64,
    /// Relative change of the physical property on mutation
    pub mutation_strength: f64,
    pub min_property: f64,
    pub max_property: f64,
    /// Population cap
    pub max_cells: usize,
}

impl Default for ProliferationParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            warmup_step: 50,
            mean_division_interval: 50.0,
            correlation_time: 5.0,
            sigma: 2.0,
            mutation_strength: 0.1,
            min_property: 0.005,
            max_property: 0.009,
            max_cells: 400,
        }
    }
}

/// Step counts, reporting and seeding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    /// Total number of reporting ticks
    pub nsteps: u64,
    /// Reporting ticks per block
    pub ninfo: u64,
    /// Steps per reporting tick
    pub nsubsteps: u64,
    /// Seed for all generators; entropy when absent
    pub seed: Option<u64>,
    /// Host backend memory budget in bytes; unlimited when absent
    pub device_memory_limit: Option<usize>,
}

impl RunParameters {
    /// Steps between two writes; lineage times are expressed in these units.
    pub fn reporting_interval(&self) -> u64 {
        self.nsubsteps * self.ninfo
    }
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            nsteps: 300,
            ninfo: 10,
            nsubsteps: 5,
            seed: None,
            device_memory_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_validate() {
        assert!(Parameters::default().validate().is_ok());
    }

    #[test]
    fn test_margin_smaller_than_radius_rejected() {
        let mut params = Parameters::default();
        params.domain.margin = 4;
        params.cell.radius = 8.0;
        assert!(matches!(params.validate(), Err(ConfigError::MarginTooSmall { .. })));
    }

    #[test]
    fn test_malformed_birth_boundaries_rejected() {
        let mut params = Parameters::default();
        params.domain.birth_boundaries = vec![0, 10, 0];
        assert!(matches!(
            params.validate(),
            Err(ConfigError::BirthBoundaries { len: 3 })
        ));
    }

    #[test]
    fn test_box_walls_pad_lateral_axes() {
        let domain = DomainParameters {
            size: [20, 30, 10],
            boundary: BoundaryCondition::Box,
            wall_thickness: 2.0,
            ..Default::default()
        };
        assert_eq!(domain.effective_size(), [28, 38, 10]);
    }

    #[test]
    fn test_serialization() {
        let params = Parameters::default();
        let json = serde_json::to_string_pretty(&params).unwrap();
        let parsed: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.domain.size, params.domain.size);
        assert!((parsed.cell.radius - params.cell.radius).abs() < 1e-12);
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let parsed: ProliferationParameters = serde_json::from_str(r#"{"sigma": 0.5}"#).unwrap();
        assert_eq!(parsed.sigma, 0.5);
        assert_eq!(parsed.warmup_step, ProliferationParameters::default().warmup_step);
    }
}
