#![deny(unsafe_code)]
//! Core types and traits for the surface-synth growth simulators.
//!
//! Provides the `Engine` trait, the periodic `HeightField` lattice, the
//! `RandomStreamSet` multi-stream PRNG, the `EvolutionSampler` diagnostic
//! recorder, the `ProgressReporter` host contract, `RunSpec`, and typed
//! parameter helpers.

pub mod engine;
pub mod error;
pub mod field;
pub mod params;
pub mod progress;
pub mod rng;
pub mod sampler;
pub mod spec;

pub use engine::Engine;
pub use error::EngineError;
pub use field::HeightField;
pub use progress::{ProgressReporter, RunStatus, SilentProgress};
pub use rng::RandomStreamSet;
pub use sampler::{EvolutionCurve, EvolutionSampler, SampleFlags, SampleQuantity};
pub use spec::RunSpec;
