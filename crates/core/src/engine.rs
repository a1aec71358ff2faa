//! The core `Engine` trait that every surface generator implements.
//!
//! The trait is object-safe so generators can be driven as `dyn Engine`
//! for runtime switching between growth models. Two driving styles are
//! supported: `run()` takes the simulation to completion (or cooperative
//! cancellation) with stride-based progress reporting, while a host that
//! wants intermediate previews calls `step()` on its own cadence, reads
//! `field()` between steps, and calls `finalize()` when it stops; the
//! engine never schedules callbacks or owns a timer.

use crate::error::EngineError;
use crate::field::HeightField;
use crate::progress::{ProgressReporter, RunStatus};
use serde_json::Value;

/// Core trait for stochastic surface-growth engines.
///
/// Each engine advances a discrete-time deposition process on a periodic
/// [`HeightField`] it owns for the duration of the run.
pub trait Engine {
    /// Advance the simulation by one discrete iteration.
    ///
    /// A no-op once the requested iteration count has been reached.
    fn step(&mut self) -> Result<(), EngineError>;

    /// Drive the simulation to completion or cancellation.
    ///
    /// Polls `reporter` at a coarse work stride; a `false` return stops
    /// the loop. Finalization runs on both exits, so the field never
    /// retains inconsistent in-flight state.
    fn run(&mut self, reporter: &mut dyn ProgressReporter) -> Result<RunStatus, EngineError>;

    /// Settle any in-flight simulation state into the field.
    ///
    /// Called by `run()`; hosts driving `step()` themselves call it once
    /// after the last step. Idempotent.
    fn finalize(&mut self) -> Result<(), EngineError>;

    /// The working height field, in raw lattice units.
    fn field(&self) -> &HeightField;

    /// Completed fraction of the requested iterations, in [0, 1].
    fn progress(&self) -> f64;

    /// True once the requested iteration count has been reached.
    fn finished(&self) -> bool;

    /// Current parameter values as a JSON object.
    fn params(&self) -> Value;

    /// Schema describing all available parameters, their types, ranges,
    /// and defaults.
    fn param_schema(&self) -> Value;
}
