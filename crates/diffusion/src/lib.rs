#![deny(unsafe_code)]
//! Diffusion-limited aggregation growth engine.
//!
//! Particles arrive on a periodic height lattice at a configurable flux
//! and migrate in discrete time under neighbour-dependent rules: an
//! occupied neighbour blocks movement into its direction, and the more
//! occupied neighbours a particle has, the less likely it is to break
//! its bonds and the more likely it is to stick for good. An optional
//! Schwoebel barrier makes migration across a downward step edge
//! unlikely, modelling the energy barrier to interlayer diffusion. The
//! result is the familiar island morphology of submonolayer epitaxy.
//!
//! The engine is a synchronous state machine: `run()` drives it to
//! completion or cooperative cancellation, `step()` advances one
//! iteration for hosts that poll their own preview cadence, and
//! finalization settles every in-flight particle so the field is never
//! handed back in an inconsistent state.

pub mod particle;
pub mod probability;

use serde_json::{json, Value};
use surface_synth_core::engine::Engine;
use surface_synth_core::error::EngineError;
use surface_synth_core::field::HeightField;
use surface_synth_core::params::{param_bool, param_f64};
use surface_synth_core::progress::{ProgressReporter, RunStatus};
use surface_synth_core::rng::RandomStreamSet;
use surface_synth_core::sampler::{EvolutionCurve, EvolutionSampler, SampleFlags};

use particle::{Particle, ParticlePool, NEIGH_SCHWOEBEL};
use probability::ProbabilityTable;

/// Stream serving injection site coordinates.
const STREAM_INJECT: usize = 0;
/// Stream serving sticking/breaking/barrier probability draws.
const STREAM_PROB: usize = 1;
/// Stream serving batched direction bits.
const STREAM_DIRECTION: usize = 2;
/// Number of named streams the engine owns.
const N_STREAMS: usize = 3;

/// Work units (particle visits) between progress reports.
const WORK_UPDATE_STRIDE: u64 = 1_000_000;

/// Initial pool reservation; the pool grows as needed beyond this.
const POOL_RESERVE: usize = 1024;

/// Default target coverage in monolayers.
const DEFAULT_COVERAGE: f64 = 0.25;
/// Default flux in particles per site per iteration.
const DEFAULT_FLUX: f64 = 1e-10;
/// Default sticking probability at one occupied neighbour.
const DEFAULT_P_STICK: f64 = 0.1;
/// Default per-neighbour migration decay.
const DEFAULT_P_BREAK: f64 = 0.01;
/// Default Schwoebel barrier passing probability (1 = no barrier).
const DEFAULT_SCHWOEBEL: f64 = 1.0;
/// Default output height multiplier.
const DEFAULT_HEIGHT_SCALE: f64 = 1.0;

/// Sanitize bounds.
const MAX_COVERAGE: f64 = 16.0;
const MIN_FLUX: f64 = 1e-13;
const MAX_FLUX: f64 = 1e-3;
const MIN_HEIGHT_SCALE: f64 = 1e-3;
const MAX_HEIGHT_SCALE: f64 = 1e4;

/// Barrier passing probabilities at or above this threshold disable
/// Schwoebel handling entirely.
const SCHWOEBEL_PASSING_LIMIT: f64 = 0.999;

/// Simulation parameters for the diffusion engine.
///
/// Use [`Default`] for a low-flux submonolayer growth setup. Values are
/// clamped into their documented ranges by [`DiffusionParams::sanitized`]
/// before a run starts; out-of-range input is not an error.
#[derive(Debug, Clone, Copy)]
pub struct DiffusionParams {
    /// Target deposited amount in monolayers, in [0, 16].
    pub coverage: f64,
    /// Particles injected per site per iteration (linear scale), in
    /// [1e-13, 1e-3].
    pub flux: f64,
    /// Sticking probability at one occupied neighbour, in [0, 1].
    pub p_stick: f64,
    /// Per-neighbour migration decay, in [0, 1].
    pub p_break: f64,
    /// Probability that migration across a step-down barrier is allowed,
    /// in [0, 1]. The host derives this from its log-scale control;
    /// values at or above 0.999 switch barrier handling off.
    pub schwoebel: f64,
    /// Output multiplier applied to the raw lattice on hand-back.
    pub height_scale: f64,
    /// Which evolution quantities to record during the run.
    pub sample_flags: SampleFlags,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            coverage: DEFAULT_COVERAGE,
            flux: DEFAULT_FLUX,
            p_stick: DEFAULT_P_STICK,
            p_break: DEFAULT_P_BREAK,
            schwoebel: DEFAULT_SCHWOEBEL,
            height_scale: DEFAULT_HEIGHT_SCALE,
            sample_flags: SampleFlags::NONE,
        }
    }
}

impl DiffusionParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    pub fn from_json(params: &Value) -> Self {
        let mut flags = SampleFlags::NONE;
        if param_bool(params, "sample_mean", false) {
            flags = flags | SampleFlags::MEAN;
        }
        if param_bool(params, "sample_rms", false) {
            flags = flags | SampleFlags::RMS;
        }
        Self {
            coverage: param_f64(params, "coverage", DEFAULT_COVERAGE),
            flux: param_f64(params, "flux", DEFAULT_FLUX),
            p_stick: param_f64(params, "p_stick", DEFAULT_P_STICK),
            p_break: param_f64(params, "p_break", DEFAULT_P_BREAK),
            schwoebel: param_f64(params, "schwoebel", DEFAULT_SCHWOEBEL),
            height_scale: param_f64(params, "height_scale", DEFAULT_HEIGHT_SCALE),
            sample_flags: flags,
        }
    }

    /// Clamps every value into its documented range.
    pub fn sanitized(mut self) -> Self {
        self.coverage = self.coverage.clamp(0.0, MAX_COVERAGE);
        self.flux = self.flux.clamp(MIN_FLUX, MAX_FLUX);
        self.p_stick = self.p_stick.clamp(0.0, 1.0);
        self.p_break = self.p_break.clamp(0.0, 1.0);
        self.schwoebel = self.schwoebel.clamp(0.0, 1.0);
        self.height_scale = self.height_scale.clamp(MIN_HEIGHT_SCALE, MAX_HEIGHT_SCALE);
        self
    }
}

/// Serves uniformly random cardinal directions, two bits at a time, from
/// a batched 64-bit draw refilled when exhausted.
///
/// Engine-owned state; a fresh engine always starts with an empty batch.
#[derive(Debug, Clone)]
struct DirectionSource {
    bits: u64,
    remaining: u32,
}

impl DirectionSource {
    fn new() -> Self {
        Self {
            bits: 0,
            remaining: 0,
        }
    }

    fn next(&mut self, rng: &mut RandomStreamSet) -> u8 {
        if self.remaining == 0 {
            self.bits = rng.next_u64(STREAM_DIRECTION);
            self.remaining = 32;
        }
        let direction = (self.bits & 0x3) as u8;
        self.bits >>= 2;
        self.remaining -= 1;
        direction
    }
}

/// Diffusion-limited aggregation engine.
///
/// Owns the height field, the particle pool, the probability tables, and
/// the random streams for the duration of one run; `into_field` hands the
/// surface back with the height scale applied.
pub struct DiffusionEngine {
    field: HeightField,
    pool: ParticlePool,
    rng: RandomStreamSet,
    table: ProbabilityTable,
    directions: DirectionSource,
    params: DiffusionParams,
    use_schwoebel: bool,
    flux_per_iter: f64,
    fluence: f64,
    iter: u64,
    niter: u64,
    workdone: u64,
    sampler: Option<EvolutionSampler>,
}

impl DiffusionEngine {
    /// Creates an engine growing on an initially flat (zero) surface.
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        params: DiffusionParams,
    ) -> Result<Self, EngineError> {
        Self::with_field(HeightField::new(width, height)?, seed, params)
    }

    /// Creates an engine growing on an existing surface.
    ///
    /// The field is interpreted in raw lattice units: one unit per
    /// deposited particle. Occupancy comparisons and the one-unit
    /// Schwoebel step test assume the caller's heights are on that scale.
    pub fn with_field(
        field: HeightField,
        seed: u64,
        params: DiffusionParams,
    ) -> Result<Self, EngineError> {
        let params = params.sanitized();
        let sites = field.site_count();
        let pool = ParticlePool::with_capacity(POOL_RESERVE.min(sites))?;
        let sampler = (!params.sample_flags.is_empty()).then(|| {
            EvolutionSampler::new(params.sample_flags, params.flux, params.height_scale)
        });
        Ok(Self {
            field,
            pool,
            rng: RandomStreamSet::new(seed, N_STREAMS),
            table: ProbabilityTable::new(params.p_stick, params.p_break),
            directions: DirectionSource::new(),
            use_schwoebel: params.schwoebel < SCHWOEBEL_PASSING_LIMIT,
            flux_per_iter: sites as f64 * params.flux,
            fluence: 0.0,
            iter: 0,
            niter: (params.coverage / params.flux + 0.5) as u64,
            workdone: 0,
            sampler,
            params,
        })
    }

    /// Creates an engine from a JSON params object.
    pub fn from_json(
        width: usize,
        height: usize,
        seed: u64,
        json_params: &Value,
    ) -> Result<Self, EngineError> {
        Self::new(width, height, seed, DiffusionParams::from_json(json_params))
    }

    /// Iterations completed so far (including skip-ahead jumps).
    pub fn iterations(&self) -> u64 {
        self.iter
    }

    /// Requested iteration count, `coverage / flux`.
    pub fn target_iterations(&self) -> u64 {
        self.niter
    }

    /// Number of particles currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pool.len()
    }

    /// True when the Schwoebel barrier affects migration in this run.
    pub fn schwoebel_active(&self) -> bool {
        self.use_schwoebel
    }

    /// Consumes the recorded evolution curves, one per sampled quantity.
    pub fn take_curves(&mut self) -> Vec<EvolutionCurve> {
        self.sampler
            .take()
            .map(EvolutionSampler::into_curves)
            .unwrap_or_default()
    }

    /// Settles outstanding particles and hands the field back with the
    /// height scale applied.
    pub fn into_field(mut self) -> HeightField {
        self.settle();
        let mut field = self.field;
        field.scale_assign(self.params.height_scale);
        field
    }

    /// One pass over the pool (stick or migrate each particle), then
    /// fluence accumulation and injection.
    fn one_iteration(&mut self) {
        let mut i = 0;
        while i < self.pool.len() {
            let p = self.pool.get_mut(i);
            p.update_neighbours(self.field.data(), self.use_schwoebel);
            let ps = self.table.p_stick(p.nneigh);
            if ps == 1.0 || (ps > 0.0 && self.rng.uniform01(STREAM_PROB) < ps) {
                // Bonded permanently; its occupied cell already counts the
                // deposit, so the field does not change.
                self.pool.swap_remove(i);
            } else {
                self.try_move(i);
                i += 1;
            }
        }

        self.fluence += self.flux_per_iter;
        while self.fluence >= 1.0 {
            self.inject();
            self.fluence -= 1.0;
        }
    }

    /// Attempts one migration of the particle at pool index `i`.
    ///
    /// Must be called with the particle's neighbourhood classification
    /// current. Rejection order: occupancy, Schwoebel barrier, bond
    /// breaking.
    fn try_move(&mut self, i: usize) {
        let direction = self.directions.next(&mut self.rng);
        let p = self.pool.get_mut(i);

        if p.neighbours & (1 << direction) != 0 {
            return;
        }
        if self.use_schwoebel
            && p.neighbours & (1 << (direction + NEIGH_SCHWOEBEL)) != 0
            && self.rng.uniform01(STREAM_PROB) >= self.params.schwoebel
        {
            return;
        }
        if self.rng.uniform01(STREAM_PROB) >= self.table.p_break(p.nneigh) {
            return;
        }

        self.field.data_mut()[p.k] -= 1.0;
        p.advance(&self.field, direction);
        self.field.data_mut()[p.k] += 1.0;
    }

    /// Injects one particle at a uniformly random site.
    fn inject(&mut self) {
        let col = self.rng.uniform_int(STREAM_INJECT, 0, self.field.width());
        let row = self.rng.uniform_int(STREAM_INJECT, 0, self.field.height());
        let p = Particle::at(&self.field, col, row);
        self.field.data_mut()[p.k] += 1.0;
        self.pool.push(p);
    }

    /// Gives every remaining particle one last sticking test with
    /// migration disabled. Stickers keep their deposited unit (already in
    /// the field); the rest desorb and have it removed. Idempotent: the
    /// pool is empty afterwards.
    fn settle(&mut self) {
        let mut i = 0;
        while i < self.pool.len() {
            let p = self.pool.get_mut(i);
            p.update_neighbours(self.field.data(), false);
            let ps = self.table.p_stick(p.nneigh);
            let k = p.k;
            if ps == 1.0 || (ps > 0.0 && self.rng.uniform01(STREAM_PROB) < ps) {
                self.pool.swap_remove(i);
            } else {
                self.field.data_mut()[k] -= 1.0;
                i += 1;
            }
        }
        self.pool.clear();
    }
}

impl Engine for DiffusionEngine {
    fn step(&mut self) -> Result<(), EngineError> {
        if self.iter >= self.niter {
            return Ok(());
        }
        self.workdone += self.pool.len() as u64;
        self.one_iteration();

        if self.pool.is_empty() {
            // Low-flux case: there may be no mobile particle for long
            // stretches; skip to the iteration where the next one arrives
            // and inject it. This consumes fewer random draws than the
            // naive per-iteration loop would.
            self.inject();
            self.iter += ((1.0 - self.fluence) / self.flux_per_iter + 0.5) as u64;
            self.fluence = 0.0;
        } else {
            self.iter += 1;
        }

        if let Some(sampler) = &mut self.sampler {
            if sampler.due(self.iter) {
                sampler.record(self.iter, &self.field);
            }
        }
        Ok(())
    }

    fn run(&mut self, reporter: &mut dyn ProgressReporter) -> Result<RunStatus, EngineError> {
        while self.iter < self.niter {
            self.step()?;
            if self.workdone >= WORK_UPDATE_STRIDE {
                self.workdone -= WORK_UPDATE_STRIDE;
                if !reporter.report(self.progress()) {
                    self.settle();
                    return Ok(RunStatus::Cancelled);
                }
            }
        }
        self.settle();
        Ok(RunStatus::Done)
    }

    fn finalize(&mut self) -> Result<(), EngineError> {
        self.settle();
        Ok(())
    }

    fn field(&self) -> &HeightField {
        &self.field
    }

    fn progress(&self) -> f64 {
        if self.niter == 0 {
            1.0
        } else {
            (self.iter as f64 / self.niter as f64).min(1.0)
        }
    }

    fn finished(&self) -> bool {
        self.iter >= self.niter
    }

    fn params(&self) -> Value {
        json!({
            "coverage": self.params.coverage,
            "flux": self.params.flux,
            "p_stick": self.params.p_stick,
            "p_break": self.params.p_break,
            "schwoebel": self.params.schwoebel,
            "height_scale": self.params.height_scale,
            "sample_mean": self.params.sample_flags.contains(SampleFlags::MEAN),
            "sample_rms": self.params.sample_flags.contains(SampleFlags::RMS),
        })
    }

    fn param_schema(&self) -> Value {
        json!({
            "coverage": {
                "type": "number",
                "default": DEFAULT_COVERAGE,
                "min": 0.0,
                "max": MAX_COVERAGE,
                "description": "Target deposited amount in monolayers"
            },
            "flux": {
                "type": "number",
                "default": DEFAULT_FLUX,
                "min": MIN_FLUX,
                "max": MAX_FLUX,
                "description": "Particles injected per site per iteration"
            },
            "p_stick": {
                "type": "number",
                "default": DEFAULT_P_STICK,
                "min": 0.0,
                "max": 1.0,
                "description": "Sticking probability at one occupied neighbour"
            },
            "p_break": {
                "type": "number",
                "default": DEFAULT_P_BREAK,
                "min": 0.0,
                "max": 1.0,
                "description": "Per-neighbour migration decay"
            },
            "schwoebel": {
                "type": "number",
                "default": DEFAULT_SCHWOEBEL,
                "min": 0.0,
                "max": 1.0,
                "description": "Probability of passing a step-down barrier"
            },
            "height_scale": {
                "type": "number",
                "default": DEFAULT_HEIGHT_SCALE,
                "min": MIN_HEIGHT_SCALE,
                "max": MAX_HEIGHT_SCALE,
                "description": "Output multiplier for the raw lattice heights"
            },
            "sample_mean": {
                "type": "boolean",
                "default": false,
                "description": "Record the mean height evolution curve"
            },
            "sample_rms": {
                "type": "boolean",
                "default": false,
                "description": "Record the rms roughness evolution curve"
            }
        })
    }
}
