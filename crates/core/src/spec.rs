//! Reproducible description of one generator run.
//!
//! A [`RunSpec`] captures everything needed to recreate a surface: engine
//! name, lattice dimensions, parameter overrides, and the RNG seed. It is
//! a pure in-memory structure; persisting it is the host's concern.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Reproducible run description.
///
/// Two identical `RunSpec` values fed to the same engine binary produce
/// bit-identical output fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSpec {
    pub engine: String,
    pub width: usize,
    pub height: usize,
    pub params: serde_json::Value,
    pub seed: u64,
}

impl RunSpec {
    /// Creates a new spec with default (empty) params.
    pub fn new(engine: &str, width: usize, height: usize, seed: u64) -> Self {
        Self {
            engine: engine.to_string(),
            width,
            height,
            params: serde_json::Value::Object(serde_json::Map::new()),
            seed,
        }
    }

    /// Validates that the dimensions are non-zero and do not overflow.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidDimensions);
        }
        self.width
            .checked_mul(self.height)
            .ok_or(EngineError::InvalidDimensions)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_starts_with_empty_params() {
        let spec = RunSpec::new("diffusion", 320, 240, 42);
        assert_eq!(spec.engine, "diffusion");
        assert_eq!((spec.width, spec.height), (320, 240));
        assert_eq!(spec.seed, 42);
        assert_eq!(spec.params, serde_json::json!({}));
    }

    #[test]
    fn json_round_trip_preserves_custom_params() {
        let mut spec = RunSpec::new("ballistic", 200, 160, 99);
        spec.params = serde_json::json!({
            "coverage": 3.5,
            "height_noise": 0.25,
            "sample_rms": true
        });
        let text = serde_json::to_string_pretty(&spec).unwrap();
        let restored: RunSpec = serde_json::from_str(&text).unwrap();
        assert_eq!(spec, restored);
    }

    #[test]
    fn serialized_form_contains_every_field() {
        let value = serde_json::to_value(RunSpec::new("diffusion", 128, 96, 1)).unwrap();
        for key in ["engine", "width", "height", "params", "seed"] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn validate_accepts_sane_dimensions() {
        assert!(RunSpec::new("diffusion", 320, 320, 42).validate().is_ok());
        assert!(RunSpec::new("ballistic", 1, 1, 0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_or_overflowing_dimensions() {
        assert!(RunSpec::new("diffusion", 0, 320, 42).validate().is_err());
        assert!(RunSpec::new("diffusion", 320, 0, 42).validate().is_err());
        assert!(RunSpec::new("diffusion", usize::MAX, 2, 42)
            .validate()
            .is_err());
    }
}
