#![deny(unsafe_code)]
//! Engine registry: maps engine names to implementations, resolved at
//! compile time.
//!
//! This crate sits between `surface-synth-core` (which defines the
//! `Engine` trait) and the individual growth-engine crates. Hosts that
//! select a generator by name (from a dialog or a stored [`RunSpec`])
//! construct through [`EngineKind`] instead of naming concrete types.

use serde_json::Value;
use surface_synth_ballistic::BallisticEngine;
use surface_synth_core::engine::Engine;
use surface_synth_core::error::EngineError;
use surface_synth_core::field::HeightField;
use surface_synth_core::progress::{ProgressReporter, RunStatus};
use surface_synth_core::sampler::EvolutionCurve;
use surface_synth_core::spec::RunSpec;
use surface_synth_diffusion::DiffusionEngine;

/// All available engine names.
const ENGINE_NAMES: &[&str] = &["diffusion", "ballistic"];

/// Enumeration of all available growth engines.
///
/// Wraps each engine implementation and delegates the `Engine` trait
/// methods. Use [`EngineKind::from_name`] or [`EngineKind::from_spec`]
/// for string-based construction.
pub enum EngineKind {
    /// Diffusion-limited aggregation.
    Diffusion(DiffusionEngine),
    /// Ballistic deposition.
    Ballistic(BallisticEngine),
}

impl EngineKind {
    /// Constructs an engine by name.
    ///
    /// Returns `EngineError::UnknownEngine` if the name is not recognized.
    pub fn from_name(
        name: &str,
        width: usize,
        height: usize,
        seed: u64,
        params: &Value,
    ) -> Result<Self, EngineError> {
        match name {
            "diffusion" => Ok(EngineKind::Diffusion(DiffusionEngine::from_json(
                width, height, seed, params,
            )?)),
            "ballistic" => Ok(EngineKind::Ballistic(BallisticEngine::from_json(
                width, height, seed, params,
            )?)),
            _ => Err(EngineError::UnknownEngine(name.to_string())),
        }
    }

    /// Constructs an engine from a validated [`RunSpec`].
    pub fn from_spec(spec: &RunSpec) -> Result<Self, EngineError> {
        spec.validate()?;
        Self::from_name(&spec.engine, spec.width, spec.height, spec.seed, &spec.params)
    }

    /// Returns a slice of all recognized engine names.
    pub fn list_engines() -> &'static [&'static str] {
        ENGINE_NAMES
    }

    /// Settles outstanding state and hands the field back with the
    /// engine's height scale applied.
    pub fn into_field(self) -> HeightField {
        match self {
            EngineKind::Diffusion(e) => e.into_field(),
            EngineKind::Ballistic(e) => e.into_field(),
        }
    }

    /// Consumes the recorded evolution curves, one per sampled quantity.
    pub fn take_curves(&mut self) -> Vec<EvolutionCurve> {
        match self {
            EngineKind::Diffusion(e) => e.take_curves(),
            EngineKind::Ballistic(e) => e.take_curves(),
        }
    }
}

impl Engine for EngineKind {
    fn step(&mut self) -> Result<(), EngineError> {
        match self {
            EngineKind::Diffusion(e) => e.step(),
            EngineKind::Ballistic(e) => e.step(),
        }
    }

    fn run(&mut self, reporter: &mut dyn ProgressReporter) -> Result<RunStatus, EngineError> {
        match self {
            EngineKind::Diffusion(e) => e.run(reporter),
            EngineKind::Ballistic(e) => e.run(reporter),
        }
    }

    fn finalize(&mut self) -> Result<(), EngineError> {
        match self {
            EngineKind::Diffusion(e) => e.finalize(),
            EngineKind::Ballistic(e) => e.finalize(),
        }
    }

    fn field(&self) -> &HeightField {
        match self {
            EngineKind::Diffusion(e) => e.field(),
            EngineKind::Ballistic(e) => e.field(),
        }
    }

    fn progress(&self) -> f64 {
        match self {
            EngineKind::Diffusion(e) => e.progress(),
            EngineKind::Ballistic(e) => e.progress(),
        }
    }

    fn finished(&self) -> bool {
        match self {
            EngineKind::Diffusion(e) => e.finished(),
            EngineKind::Ballistic(e) => e.finished(),
        }
    }

    fn params(&self) -> Value {
        match self {
            EngineKind::Diffusion(e) => e.params(),
            EngineKind::Ballistic(e) => e.params(),
        }
    }

    fn param_schema(&self) -> Value {
        match self {
            EngineKind::Diffusion(e) => e.param_schema(),
            EngineKind::Ballistic(e) => e.param_schema(),
        }
    }
}
