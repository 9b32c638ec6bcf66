//! Birth and death sequencing.
//!
//! Once per step [`proliferate`] advances every division clock, then divides
//! the slots whose timer reached the threshold. All resizes of a step happen
//! behind a single device barrier.

use std::f64::consts::TAU;

use rand::Rng;

use super::context::{random_polarization, SimulationContext};
use crate::device::ComputeBackend;
use crate::division::{
    daughter_property, decide_mutation, inherit_threshold_mean, split_cell, SplitPlane,
};
use crate::error::LifecycleError;
use crate::mechanics::{accumulate_phase_sums, reduce_cell_stress, StressSource};

/// Outcome of one division
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionReport {
    pub step: u64,
    pub parent_lineage: i32,
    pub daughters: [i32; 2],
    /// Whether the daughters' property was mutated
    pub mutated: bool,
    /// Principal stress direction of the parent (radians)
    pub stress_angle: f64,
    /// Direction actually used to place the daughters (radians)
    pub split_direction: f64,
}

/// Advance division clocks and divide every cell that is due.
pub fn proliferate<B: ComputeBackend>(
    ctx: &mut SimulationContext<B>,
    step: u64,
) -> Result<Vec<DivisionReport>, LifecycleError> {
    let params = &ctx.params.proliferation;
    if !params.enabled || step <= params.warmup_step || ctx.cells.len() >= params.max_cells {
        return Ok(Vec::new());
    }
    let max_cells = params.max_cells;

    // Snapshot by identity: dense positions shift as parents are erased.
    let ou = ctx.ou;
    let mut candidates = Vec::new();
    for (slot, &identity) in ctx.cells.iter_mut().zip(ctx.registry.identities()) {
        if slot.clock.advance(&ou, &mut ctx.rngs.ou) {
            candidates.push(identity);
        }
    }
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    ctx.log_clocks();

    let barrier = ctx.mirror.begin_structural_change(&mut ctx.cells)?;
    let mut reports = Vec::with_capacity(candidates.len());
    let mut failure = None;
    for identity in candidates {
        if ctx.cells.len() >= max_cells {
            log::info!("population cap {} reached at step {}", max_cells, step);
            break;
        }
        let Some(index) = ctx.registry.position_of(identity) else {
            continue;
        };
        match divide(ctx, index, step) {
            Ok(report) => reports.push(report),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    ctx.mirror.end_structural_change(barrier, &ctx.cells)?;

    match failure {
        Some(e) => Err(e),
        None => Ok(reports),
    }
}

fn divide<B: ComputeBackend>(
    ctx: &mut SimulationContext<B>,
    index: usize,
    step: u64,
) -> Result<DivisionReport, LifecycleError> {
    let len = ctx.cells.len();
    let parent = ctx
        .cells
        .get(index)
        .ok_or(LifecycleError::SlotOutOfRange { slot: index, len })?;
    let parent_lineage = parent.lineage_id;
    let parent_com = parent.com;
    let parent_mean = parent.clock.threshold_mean;

    let time = ctx.time_of(step);
    let decision = decide_mutation(ctx.cells.slots(), index);
    let property = daughter_property(parent.gamma, decision.mutate, &ctx.params.proliferation);

    // Threshold means come from slots that exist before the daughters.
    let means: Vec<f64> = ctx.cells.iter().map(|c| c.clock.threshold_mean).collect();
    let mut local = ctx.rngs.call_local();
    let mean_a = inherit_threshold_mean(&means, &mut local).unwrap_or(parent_mean);
    let mean_b = inherit_threshold_mean(&means, &mut local).unwrap_or(parent_mean);

    ctx.registry.ensure_capacity(2)?;
    let reg_a = ctx.registry.register_birth(parent_lineage, time, property)?;
    let reg_b = ctx.registry.register_birth(parent_lineage, time, property)?;
    ctx.cells.grow_to(len + 2);

    let split_direction = ctx.rngs.field_noise.gen_range(0.0..TAU);
    let plane = SplitPlane::through(parent_com, split_direction, ctx.params.cell.radius);
    let cell_params = &ctx.params.cell;
    {
        let (parent, a, b) = ctx.cells.parent_and_daughters(index, len, len + 1);
        split_cell(parent, a, b, &plane, property, &ctx.domain, &ctx.patch);

        for (daughter, reg, mean) in [(a, reg_a, mean_a), (b, reg_b, mean_b)] {
            daughter.lineage_id = reg.lineage_id;
            daughter.clock.threshold_mean = mean;
            let (theta, pol) = random_polarization(
                cell_params.polarization_strength,
                cell_params.polarization_noise,
                &mut ctx.rngs.field_noise,
            );
            daughter.theta_pol = theta;
            daughter.theta_pol_old = theta;
            daughter.polarization = pol;
            daughter.com = daughter
                .occupied_center(&ctx.domain, &ctx.patch)
                .unwrap_or(parent.com);
            daughter.com_prev = daughter.com;
        }
    }

    remove_cell(ctx, index, step)?;
    ctx.divisions += 1;

    log::debug!(
        "step {}: cell {} divided into {} and {} (property {:.5}{})",
        step,
        parent_lineage,
        reg_a.lineage_id,
        reg_b.lineage_id,
        property,
        if decision.mutate { ", mutated" } else { "" }
    );

    Ok(DivisionReport {
        step,
        parent_lineage,
        daughters: [reg_a.lineage_id, reg_b.lineage_id],
        mutated: decision.mutate,
        stress_angle: decision.angle,
        split_direction,
    })
}

/// Remove the cell in dense slot `index`: record its death, clear its
/// footprint in the global fields and erase the slot.
///
/// A death that the ledger rejects is logged and counted as an anomaly
/// rather than aborting the run.
pub fn remove_cell<B: ComputeBackend>(
    ctx: &mut SimulationContext<B>,
    index: usize,
    step: u64,
) -> Result<(), LifecycleError> {
    let len = ctx.cells.len();
    let slot = ctx
        .cells
        .get(index)
        .ok_or(LifecycleError::SlotOutOfRange { slot: index, len })?;
    let lineage_id = slot.lineage_id;
    let anchor = slot.anchor;

    let time = ctx.time_of(step);
    if let Err(e) = ctx.registry.record_death(lineage_id, time) {
        log::error!("lineage ledger rejected death at step {}: {}", step, e);
        ctx.lineage_anomalies += 1;
    }

    let patch = &ctx.patch;
    let domain = &ctx.domain;
    ctx.fields
        .clear_footprint((0..patch.len()).map(|q| patch.to_global(domain, anchor, q)));

    ctx.cells.erase(index);
    ctx.registry.remove(index);
    Ok(())
}

/// Host-side pass between divisions: rebuild the global sums, take stress
/// from `source`, reduce it per cell and refresh volumes and centres.
pub fn sweep<B: ComputeBackend, S: StressSource>(
    ctx: &mut SimulationContext<B>,
    source: &mut S,
    step: u64,
) -> Result<(), LifecycleError> {
    ctx.mirror.begin_sweep(ctx.cells.len())?;
    ctx.mirror.sync_to_host(&mut ctx.cells)?;

    accumulate_phase_sums(&ctx.cells, &ctx.domain, &ctx.patch, &mut ctx.fields);
    source.fill(step, &ctx.domain, &mut ctx.fields);
    reduce_cell_stress(&mut ctx.cells, &ctx.domain, &ctx.patch, &ctx.fields.stress);

    for cell in ctx.cells.iter_mut() {
        cell.com_prev = cell.com;
        cell.refresh_volume();
        if let Some(center) = cell.occupied_center(&ctx.domain, &ctx.patch) {
            cell.com = center;
        }
    }

    ctx.mirror.commit_host_changes(&ctx.cells)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parameters;
    use crate::device::SyncState;

    fn context(founders: usize) -> SimulationContext {
        let mut params = Parameters::default();
        params.domain.size = [24, 24, 8];
        params.domain.margin = 3;
        params.cell.radius = 3.0;
        params.cell.founders = founders;
        params.run.seed = Some(3);
        SimulationContext::on_host(params).unwrap()
    }

    fn force_due(ctx: &mut SimulationContext, slot: usize) {
        let clock = &mut ctx.cells.get_mut(slot).unwrap().clock;
        clock.timer = 1.0e6;
        clock.threshold_mean = 1.0e5;
    }

    #[test]
    fn test_no_division_during_warmup() {
        let mut ctx = context(2);
        force_due(&mut ctx, 0);
        let warmup = ctx.params.proliferation.warmup_step;
        assert!(proliferate(&mut ctx, warmup).unwrap().is_empty());
        assert_eq!(ctx.cells.get(0).unwrap().clock.timer, 1.0e6, "clock frozen in warm-up");
    }

    #[test]
    fn test_due_cell_divides() {
        let mut ctx = context(2);
        force_due(&mut ctx, 1);
        let parent_id = ctx.cells.get(1).unwrap().lineage_id;
        let mass_before: f64 = ctx.cells.get(1).unwrap().fields.mass();

        let reports = proliferate(&mut ctx, 51).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].parent_lineage, parent_id);
        assert_eq!(ctx.population(), 3);
        assert!(ctx.check_invariants().is_ok());
        assert_eq!(ctx.mirror.state(), SyncState::Clean);

        let daughters: f64 = ctx.cells.iter().skip(1).map(|c| c.fields.mass()).sum();
        assert!((daughters - mass_before).abs() < 1e-9);
        assert!(!ctx.registry.ledger().get(parent_id).unwrap().is_alive());
        assert_eq!(ctx.divisions, 1);
    }

    #[test]
    fn test_cap_stops_divisions() {
        let mut ctx = context(2);
        ctx.params.proliferation.max_cells = 3;
        force_due(&mut ctx, 0);
        force_due(&mut ctx, 1);
        let reports = proliferate(&mut ctx, 60).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(ctx.population(), 3);
    }

    #[test]
    fn test_exhausted_identities_leave_population_untouched() {
        let mut ctx = context(2);
        ctx.registry.set_next_lineage_id(i64::from(i32::MAX));
        force_due(&mut ctx, 0);

        let err = proliferate(&mut ctx, 51).unwrap_err();
        assert!(matches!(err, LifecycleError::IdentityExhausted(_)));
        assert_eq!(ctx.population(), 2);
        assert_eq!(ctx.registry.live_count(), 2);
        assert_eq!(ctx.registry.ledger().len(), 2);
        assert!(ctx.check_invariants().is_ok());
        assert_eq!(ctx.mirror.state(), SyncState::Clean);
        assert_eq!(ctx.divisions, 0);
    }

    #[test]
    fn test_unknown_death_counted() {
        let mut ctx = context(1);
        ctx.cells.get_mut(0).unwrap().lineage_id = 999;
        remove_cell(&mut ctx, 0, 10).unwrap();
        assert_eq!(ctx.lineage_anomalies, 1);
        assert_eq!(ctx.population(), 0);
    }

    #[test]
    fn test_sweep_reduces_stress() {
        let mut ctx = context(2);
        let mut source = crate::mechanics::CrowdingStress::default();
        sweep(&mut ctx, &mut source, 1).unwrap();
        assert_eq!(ctx.mirror.state(), SyncState::Clean);
        for cell in &ctx.cells {
            assert!(cell.volume > 0.0);
        }
    }
}
