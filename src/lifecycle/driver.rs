//! Step loop shared by the binary and the integration tests.

use anyhow::Result;

use super::context::SimulationContext;
use super::orchestrator::{proliferate, sweep};
use crate::device::ComputeBackend;
use crate::export::LineageLogWriter;
use crate::mechanics::StressSource;
use crate::state::PopulationMetrics;

/// Totals of one call to [`run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    /// Divisions performed during the run
    pub divisions: u64,
    /// Lineage snapshots that could not be written
    pub log_failures: u64,
}

/// Advance `ctx` through steps `1..=total_steps`.
///
/// Every reporting interval the ledger goes to `lineage_log` and the
/// metrics to `on_report` together with the divisions since the previous
/// report. A snapshot that cannot be written is logged and skipped; only
/// lifecycle errors and errors from `on_report` end the run. A last
/// snapshot is written after the final step.
pub fn run<B, S, F>(
    ctx: &mut SimulationContext<B>,
    source: &mut S,
    total_steps: u64,
    mut lineage_log: Option<&mut LineageLogWriter>,
    mut on_report: F,
) -> Result<RunSummary>
where
    B: ComputeBackend,
    S: StressSource,
    F: FnMut(&PopulationMetrics, usize) -> Result<()>,
{
    let interval = ctx.params.run.reporting_interval();
    let mut summary = RunSummary::default();
    let mut divisions_in_block = 0usize;

    for step in 1..=total_steps {
        sweep(ctx, source, step)?;
        let born = proliferate(ctx, step)?.len();
        divisions_in_block += born;
        summary.divisions += born as u64;
        summary.steps = step;

        if step % interval == 0 {
            if let Some(writer) = lineage_log.as_deref_mut() {
                if let Err(e) = writer.write_snapshot(ctx.time_of(step), ctx.registry.ledger()) {
                    log::warn!("lineage log write failed at step {}: {:#}", step, e);
                    summary.log_failures += 1;
                }
            }
            on_report(&ctx.metrics(step), divisions_in_block)?;
            divisions_in_block = 0;
        }
    }

    if let Some(writer) = lineage_log {
        if let Err(e) = writer.write_snapshot(ctx.time_of(total_steps), ctx.registry.ledger()) {
            log::warn!("final lineage log write failed: {:#}", e);
            summary.log_failures += 1;
        }
    }
    Ok(summary)
}
