#![deny(unsafe_code)]
//! Ballistic deposition growth engine.
//!
//! The pure growth member of the family: each iteration drops one
//! particle on a uniformly random site and sticks it at the highest of
//! its own landing height and the four neighbouring columns, modelling
//! sticky vertical incidence. An optional uniform height noise varies the
//! particle size. There is no migration and no desorption, so no lattice
//! cell ever decreases and the surface roughens into the familiar
//! ballistic-deposition texture.

use serde_json::{json, Value};
use surface_synth_core::engine::Engine;
use surface_synth_core::error::EngineError;
use surface_synth_core::field::HeightField;
use surface_synth_core::params::{param_bool, param_f64};
use surface_synth_core::progress::{ProgressReporter, RunStatus};
use surface_synth_core::rng::RandomStreamSet;
use surface_synth_core::sampler::{EvolutionCurve, EvolutionSampler, SampleFlags};

/// Stream serving deposition site indices.
const STREAM_SITE: usize = 0;
/// Stream serving height-noise draws.
const STREAM_HEIGHT: usize = 1;
/// Number of named streams the engine owns.
const N_STREAMS: usize = 2;

/// Deposition events between progress reports.
const WORK_UPDATE_STRIDE: u64 = 1_000_000;

/// Default target coverage in monolayers.
const DEFAULT_COVERAGE: f64 = 1.0;
/// Default height noise amplitude (0 = uniform particle size).
const DEFAULT_HEIGHT_NOISE: f64 = 0.0;
/// Default output height multiplier.
const DEFAULT_HEIGHT_SCALE: f64 = 1.0;

/// Sanitize bounds.
const MAX_COVERAGE: f64 = 100.0;
const MIN_HEIGHT_SCALE: f64 = 1e-3;
const MAX_HEIGHT_SCALE: f64 = 1e4;

/// Simulation parameters for the ballistic engine.
///
/// Values are clamped into their documented ranges by
/// [`BallisticParams::sanitized`] before a run starts.
#[derive(Debug, Clone, Copy)]
pub struct BallisticParams {
    /// Target deposited amount in monolayers, in [0, 100].
    pub coverage: f64,
    /// Relative spread of particle heights, in [0, 1]: a particle adds
    /// `noise * u + 1 - noise` with `u` uniform in [0, 1).
    pub height_noise: f64,
    /// Output multiplier applied to the raw lattice on hand-back.
    pub height_scale: f64,
    /// Which evolution quantities to record during the run.
    pub sample_flags: SampleFlags,
}

impl Default for BallisticParams {
    fn default() -> Self {
        Self {
            coverage: DEFAULT_COVERAGE,
            height_noise: DEFAULT_HEIGHT_NOISE,
            height_scale: DEFAULT_HEIGHT_SCALE,
            sample_flags: SampleFlags::NONE,
        }
    }
}

impl BallisticParams {
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
            height_noise: param_f64(params, "height_noise", DEFAULT_HEIGHT_NOISE),
            height_scale: param_f64(params, "height_scale", DEFAULT_HEIGHT_SCALE),
            sample_flags: flags,
        }
    }

    /// Clamps every value into its documented range.
    pub fn sanitized(mut self) -> Self {
        self.coverage = self.coverage.clamp(0.0, MAX_COVERAGE);
        self.height_noise = self.height_noise.clamp(0.0, 1.0);
        self.height_scale = self.height_scale.clamp(MIN_HEIGHT_SCALE, MAX_HEIGHT_SCALE);
        self
    }
}

/// Ballistic deposition engine.
///
/// One iteration is one deposition event; the effective flux is one
/// particle per lattice per iteration, i.e. `1 / (width * height)` per
/// site.
pub struct BallisticEngine {
    field: HeightField,
    rng: RandomStreamSet,
    params: BallisticParams,
    flux: f64,
    iter: u64,
    niter: u64,
    workdone: u64,
    sampler: Option<EvolutionSampler>,
}

impl BallisticEngine {
    /// Creates an engine growing on an initially flat (zero) surface.
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        params: BallisticParams,
    ) -> Result<Self, EngineError> {
        Self::with_field(HeightField::new(width, height)?, seed, params)
    }

    /// Creates an engine growing on an existing surface, in raw lattice
    /// units.
    pub fn with_field(
        field: HeightField,
        seed: u64,
        params: BallisticParams,
    ) -> Result<Self, EngineError> {
        let params = params.sanitized();
        let sites = field.site_count();
        let flux = 1.0 / sites as f64;
        let sampler = (!params.sample_flags.is_empty())
            .then(|| EvolutionSampler::new(params.sample_flags, flux, params.height_scale));
        Ok(Self {
            field,
            rng: RandomStreamSet::new(seed, N_STREAMS),
            flux,
            iter: 0,
            niter: (params.coverage * sites as f64 + 0.5) as u64,
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
        Self::new(width, height, seed, BallisticParams::from_json(json_params))
    }

    /// Deposition events completed so far.
    pub fn iterations(&self) -> u64 {
        self.iter
    }

    /// Requested deposition event count, `coverage * sites`.
    pub fn target_iterations(&self) -> u64 {
        self.niter
    }

    /// Consumes the recorded evolution curves, one per sampled quantity.
    pub fn take_curves(&mut self) -> Vec<EvolutionCurve> {
        self.sampler
            .take()
            .map(EvolutionSampler::into_curves)
            .unwrap_or_default()
    }

    /// Hands the field back with the height scale applied.
    pub fn into_field(self) -> HeightField {
        let mut field = self.field;
        field.scale_assign(self.params.height_scale);
        field
    }

    /// Deposits one particle: pick a site, add its height, stick at the
    /// highest of the landing column and its four neighbours.
    fn deposit(&mut self) {
        let sites = self.field.site_count();
        let k = self.rng.uniform_int(STREAM_SITE, 0, sites);
        let noise = self.params.height_noise;
        let v = if noise > 0.0 {
            noise * self.rng.uniform01(STREAM_HEIGHT) + 1.0 - noise
        } else {
            1.0
        };
        let [up, left, right, down] = self.field.neighbour_indices(k);
        let d = self.field.data_mut();
        let landed = d[k] + v;
        d[k] = landed
            .max(d[up].max(d[left]))
            .max(d[right].max(d[down]));
    }
}

impl Engine for BallisticEngine {
    fn step(&mut self) -> Result<(), EngineError> {
        if self.iter >= self.niter {
            return Ok(());
        }
        self.deposit();
        self.iter += 1;
        self.workdone += 1;

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
                    return Ok(RunStatus::Cancelled);
                }
            }
        }
        Ok(RunStatus::Done)
    }

    /// Nothing to settle: every particle bonds the moment it lands.
    fn finalize(&mut self) -> Result<(), EngineError> {
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
            "height_noise": self.params.height_noise,
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
            "height_noise": {
                "type": "number",
                "default": DEFAULT_HEIGHT_NOISE,
                "min": 0.0,
                "max": 1.0,
                "description": "Relative spread of particle heights"
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
