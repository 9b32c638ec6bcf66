//! Simulation context: everything the lifecycle operations read or mutate.

use glam::{DVec3, UVec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Parameters;
use crate::device::{ComputeBackend, DeviceMirror, HostBackend};
use crate::division::{DivisionClock, OuProcess};
use crate::error::LifecycleError;
use crate::geometry::{Grid, NeighborTable, PatchGeometry};
use crate::state::{
    CellStore, GlobalFields, InheritedTraits, PopulationMetrics, PopulationRegistry,
    PopulationStatus,
};

/// Independent random streams.
///
/// `field_noise` drives polarisation and split directions, `ou` the division
/// thresholds. Call-local generators are forked from a private seeder so a
/// seeded run stays reproducible.
#[derive(Debug, Clone)]
pub struct RandomStreams {
    pub field_noise: StdRng,
    pub ou: StdRng,
    seeder: StdRng,
}

impl RandomStreams {
    pub fn new(seed: Option<u64>) -> Self {
        let mut seeder = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            field_noise: StdRng::seed_from_u64(seeder.gen()),
            ou: StdRng::seed_from_u64(seeder.gen()),
            seeder,
        }
    }

    /// Fresh generator for a single call
    pub fn call_local(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.seeder.gen())
    }

    /// Seed handed to the compute backend's noise streams
    pub fn device_seed(&mut self) -> u64 {
        self.seeder.gen()
    }
}

/// Random in-plane polarisation of magnitude `strength`, with angular spread
/// `noise * pi` around the x axis.
pub(crate) fn random_polarization<R: Rng + ?Sized>(
    strength: f64,
    noise: f64,
    rng: &mut R,
) -> (f64, DVec3) {
    let u: f64 = rng.gen();
    let theta = noise * std::f64::consts::PI * (1.0 - 2.0 * u);
    (theta, DVec3::new(theta.cos(), theta.sin(), 0.0) * strength)
}

/// State of one simulation, passed explicitly to every lifecycle operation
#[derive(Debug)]
pub struct SimulationContext<B: ComputeBackend = HostBackend> {
    pub params: Parameters,
    pub domain: Grid,
    pub domain_neighbors: NeighborTable,
    pub patch: PatchGeometry,
    pub cells: CellStore,
    pub registry: PopulationRegistry,
    pub fields: GlobalFields,
    pub mirror: DeviceMirror<B>,
    pub rngs: RandomStreams,
    pub ou: OuProcess,
    /// Divisions performed so far
    pub divisions: u64,
    /// Deaths recorded against unknown ledger ids
    pub lineage_anomalies: u64,
}

impl<B: ComputeBackend> SimulationContext<B> {
    /// Validate parameters, build the grids, seed the founders and upload
    /// them to the backend.
    pub fn new(params: Parameters, backend: B) -> Result<Self, LifecycleError> {
        params.validate()?;

        let domain = Grid::new(params.domain.effective_size());
        let domain_neighbors = NeighborTable::build(&domain);
        let patch = PatchGeometry::new(&domain, params.domain.margin);
        let min_margin = patch.margin().min_element();
        if (min_margin as f64) < params.cell.radius {
            log::warn!(
                "patch margin clamped to {} by the domain, below R = {}",
                min_margin,
                params.cell.radius
            );
        }

        let mut ctx = Self {
            cells: CellStore::new(patch.len()),
            registry: PopulationRegistry::new(),
            fields: GlobalFields::zeroed(domain.len()),
            mirror: DeviceMirror::new(backend, patch.len()),
            rngs: RandomStreams::new(params.run.seed),
            ou: OuProcess::from_parameters(&params.proliferation),
            divisions: 0,
            lineage_anomalies: 0,
            domain,
            domain_neighbors,
            patch,
            params,
        };
        ctx.seed_founders()?;

        let device_seed = ctx.rngs.device_seed();
        ctx.mirror.initialize(&ctx.cells, device_seed)?;

        log::info!(
            "domain {:?}, patch {:?} ({} nodes), {} founders",
            ctx.domain.size().to_array(),
            ctx.patch.size().to_array(),
            ctx.patch.len(),
            ctx.cells.len()
        );
        Ok(ctx)
    }

    fn seed_founders(&mut self) -> Result<(), LifecycleError> {
        let centers = founder_centers(&self.params, &self.domain);
        let radius = self.params.cell.radius;
        let cell = &self.params.cell;
        let proliferation = &self.params.proliferation;
        let c = self.patch.center().as_dvec3();

        for center in centers {
            let registration = self.registry.register_founder(cell.gamma)?;
            let start = self.cells.len();
            self.cells.grow_to(start + 1);
            let slot = self
                .cells
                .get_mut(start)
                .ok_or(LifecycleError::SlotOutOfRange { slot: start, len: start })?;

            slot.lineage_id = registration.lineage_id;
            slot.anchor = self.patch.anchor_for_center(&self.domain, center);
            slot.patch_min = slot.anchor;
            slot.patch_max = self
                .domain
                .wrap(slot.anchor.as_ivec3() + self.patch.size().as_ivec3() - glam::IVec3::ONE);
            for (q, phi) in slot.fields.phi.iter_mut().enumerate() {
                let r = self.patch.local_coords(q).as_dvec3() - c;
                if r.length_squared() < radius * radius {
                    *phi = 1.0;
                }
            }
            slot.fields.phi_old.copy_from_slice(&slot.fields.phi);
            slot.refresh_volume();
            slot.com = center.as_dvec3();
            slot.com_prev = slot.com;
            slot.gamma = cell.gamma;
            slot.traits = InheritedTraits {
                omega_cc: cell.omega_cc,
                omega_cs: cell.omega_cs,
                alpha: cell.alpha,
                dpol: cell.dpol,
            };
            let (theta, pol) = random_polarization(
                cell.polarization_strength,
                cell.polarization_noise,
                &mut self.rngs.field_noise,
            );
            slot.theta_pol = theta;
            slot.theta_pol_old = theta;
            slot.polarization = pol;
            slot.clock = DivisionClock::founder(
                proliferation.warmup_step,
                proliferation.mean_division_interval,
                &mut self.rngs.field_noise,
            );
        }
        Ok(())
    }

    pub fn population(&self) -> usize {
        self.cells.len()
    }

    /// Time of `step` in reporting intervals
    pub fn time_of(&self, step: u64) -> f64 {
        step as f64 / self.params.run.reporting_interval() as f64
    }

    pub fn metrics(&self, step: u64) -> PopulationMetrics {
        PopulationMetrics {
            step,
            time: self.time_of(step),
            status: PopulationStatus::from_state(
                step,
                self.params.proliferation.warmup_step,
                self.cells.len(),
                self.params.proliferation.max_cells,
            ),
            divisions: self.divisions,
            lineage_anomalies: self.lineage_anomalies,
            ..PopulationMetrics::collect(&self.cells, &self.registry)
        }
    }

    /// The slot table, the live list and the ledger agree: one slot per
    /// live identity, and every slot's lineage id is a live ledger entry.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.cells.len() != self.registry.live_count() {
            return Err(format!(
                "{} slots but {} live identities",
                self.cells.len(),
                self.registry.live_count()
            ));
        }
        for (i, slot) in self.cells.iter().enumerate() {
            if slot.fields.len() != self.patch.len() {
                return Err(format!("slot {} has {} nodes", i, slot.fields.len()));
            }
            match self.registry.ledger().get(slot.lineage_id) {
                Some(record) if record.is_alive() => {}
                Some(_) => return Err(format!("slot {} holds dead lineage id {}", i, slot.lineage_id)),
                None => return Err(format!("slot {} holds unknown lineage id {}", i, slot.lineage_id)),
            }
        }
        Ok(())
    }

    /// Log the division clock of every slot at debug level.
    pub fn log_clocks(&self) {
        for (i, slot) in self.cells.iter().enumerate() {
            log::debug!(
                "slot {} (id {}): timer {:.1}, threshold {:.2}, mean {:.2}",
                i,
                slot.lineage_id,
                slot.clock.timer,
                slot.clock.threshold,
                slot.clock.threshold_mean
            );
        }
    }
}

impl SimulationContext<HostBackend> {
    /// Context on the host backend, honouring the configured memory budget.
    pub fn on_host(params: Parameters) -> Result<Self, LifecycleError> {
        let backend = match params.run.device_memory_limit {
            Some(limit) => HostBackend::with_memory_limit(limit),
            None => HostBackend::new(),
        };
        Self::new(params, backend)
    }
}

/// Founder centres: configured positions, or a lattice inside the birth
/// region at mid-height.
pub fn founder_centers(params: &Parameters, domain: &Grid) -> Vec<UVec3> {
    if let Some(positions) = &params.cell.founder_positions {
        return positions
            .iter()
            .map(|p| domain.wrap(UVec3::from_array(*p).as_ivec3()))
            .collect();
    }

    let size = domain.size();
    let (xmin, xmax, ymin, ymax) = match params.domain.birth_boundaries.as_slice() {
        [x0, x1, y0, y1] => (*x0 as f64, *x1 as f64, *y0 as f64, *y1 as f64),
        _ => (0.0, size.x as f64, 0.0, size.y as f64),
    };
    let n = params.cell.founders;
    let cols = (n as f64).sqrt().ceil().max(1.0) as usize;
    let rows = n.div_ceil(cols);
    let dx = (xmax - xmin) / cols as f64;
    let dy = (ymax - ymin) / rows as f64;
    let z = size.z / 2;

    (0..n)
        .map(|i| {
            let x = xmin + (i % cols) as f64 * dx + 0.5 * dx;
            let y = ymin + (i / cols) as f64 * dy + 0.5 * dy;
            domain.wrap(glam::IVec3::new(x.floor() as i32, y.floor() as i32, z as i32))
        })
        .collect()
}
