//! Evolution sampling: scalar surface statistics recorded on a
//! geometrically growing iteration schedule.
//!
//! Growth runs span many decades of iterations, so diagnostic curves are
//! sampled densely at the start and sparsely later: the next sampling
//! threshold advances by a flux-scaled base step plus a capped fraction
//! of the threshold itself. Abscissae are mean deposited heights
//! (`iter * flux`), ordinates field statistics; both carry the engine's
//! output height scale.

use crate::field::HeightField;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// Base threshold step, in units of 1/flux.
const STEP_PER_FLUX: f64 = 1e-4;
/// Fraction of the current threshold added per advance.
const GROWTH_FACTOR: f64 = 0.2;
/// Cap on the proportional term, in units of 1/flux.
const CAP_PER_FLUX: f64 = 0.08;

/// Bitset selecting which scalar quantities an engine records during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SampleFlags(u32);

impl SampleFlags {
    /// Record nothing.
    pub const NONE: SampleFlags = SampleFlags(0);
    /// Record the mean height.
    pub const MEAN: SampleFlags = SampleFlags(1);
    /// Record the rms deviation from the mean height.
    pub const RMS: SampleFlags = SampleFlags(1 << 1);

    /// True when every flag in `other` is set in `self`.
    pub fn contains(self, other: SampleFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw bit representation.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Builds flags from raw bits, ignoring unknown bits.
    pub fn from_bits(bits: u32) -> SampleFlags {
        SampleFlags(bits & (Self::MEAN.0 | Self::RMS.0))
    }
}

impl BitOr for SampleFlags {
    type Output = SampleFlags;

    fn bitor(self, rhs: SampleFlags) -> SampleFlags {
        SampleFlags(self.0 | rhs.0)
    }
}

/// Identifier of a sampled scalar quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleQuantity {
    /// Mean height.
    Mean,
    /// Rms deviation from the mean height.
    Rms,
}

/// One sampled diagnostic curve: ordered (x, y) pairs where x is the mean
/// deposited height at sampling time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionCurve {
    pub quantity: SampleQuantity,
    pub points: Vec<(f64, f64)>,
}

/// Records selected field statistics whenever the iteration count crosses
/// a monotonically growing threshold.
#[derive(Debug, Clone)]
pub struct EvolutionSampler {
    flags: SampleFlags,
    flux: f64,
    height_scale: f64,
    next_iter: f64,
    base_step: f64,
    cap: f64,
    mean: Vec<(f64, f64)>,
    rms: Vec<(f64, f64)>,
}

impl EvolutionSampler {
    /// Creates a sampler for the given flags, per-site flux, and output
    /// height scale.
    ///
    /// `flux` scales the schedule so that sampling density is comparable
    /// across runs regardless of how many iterations one monolayer takes;
    /// it must be positive (engines sanitize it before constructing the
    /// sampler). `height_scale` converts raw lattice units to output
    /// units for both axes.
    pub fn new(flags: SampleFlags, flux: f64, height_scale: f64) -> Self {
        Self {
            flags,
            flux,
            height_scale,
            next_iter: 0.0,
            base_step: STEP_PER_FLUX / flux,
            cap: CAP_PER_FLUX / flux,
            mean: Vec::new(),
            rms: Vec::new(),
        }
    }

    /// The quantities this sampler records.
    pub fn flags(&self) -> SampleFlags {
        self.flags
    }

    /// True when `iter` has crossed the current sampling threshold.
    pub fn due(&self, iter: u64) -> bool {
        iter as f64 >= self.next_iter
    }

    /// Appends one sample for iteration `iter` and advances the threshold.
    pub fn record(&mut self, iter: u64, field: &HeightField) {
        let x = iter as f64 * self.flux * self.height_scale;
        if self.flags.contains(SampleFlags::MEAN) {
            self.mean.push((x, field.mean() * self.height_scale));
        }
        if self.flags.contains(SampleFlags::RMS) {
            self.rms.push((x, field.rms() * self.height_scale));
        }
        self.next_iter += self.base_step + (GROWTH_FACTOR * self.next_iter).min(self.cap);
    }

    /// Number of samples recorded so far.
    pub fn sample_count(&self) -> usize {
        self.mean.len().max(self.rms.len())
    }

    /// Consumes the sampler, yielding one curve per recorded quantity.
    pub fn into_curves(self) -> Vec<EvolutionCurve> {
        let mut curves = Vec::new();
        if self.flags.contains(SampleFlags::MEAN) {
            curves.push(EvolutionCurve {
                quantity: SampleQuantity::Mean,
                points: self.mean,
            });
        }
        if self.flags.contains(SampleFlags::RMS) {
            curves.push(EvolutionCurve {
                quantity: SampleQuantity::Rms,
                points: self.rms,
            });
        }
        curves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- SampleFlags --

    #[test]
    fn flags_union_and_contains() {
        let both = SampleFlags::MEAN | SampleFlags::RMS;
        assert!(both.contains(SampleFlags::MEAN));
        assert!(both.contains(SampleFlags::RMS));
        assert!(!SampleFlags::MEAN.contains(SampleFlags::RMS));
        assert!(SampleFlags::NONE.is_empty());
        assert!(!both.is_empty());
    }

    #[test]
    fn from_bits_ignores_unknown_bits() {
        let flags = SampleFlags::from_bits(0xFF);
        assert_eq!(flags, SampleFlags::MEAN | SampleFlags::RMS);
    }

    #[test]
    fn flags_serde_roundtrip() {
        let flags = SampleFlags::MEAN | SampleFlags::RMS;
        let json = serde_json::to_string(&flags).unwrap();
        let restored: SampleFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(flags, restored);
    }

    // -- Sampler schedule --

    #[test]
    fn first_sample_is_due_immediately() {
        let sampler = EvolutionSampler::new(SampleFlags::MEAN, 1e-3, 1.0);
        assert!(sampler.due(0));
    }

    #[test]
    fn threshold_spacing_grows_monotonically() {
        let field = HeightField::new(4, 4).unwrap();
        let mut sampler = EvolutionSampler::new(SampleFlags::MEAN, 1e-3, 1.0);
        let mut thresholds = Vec::new();
        for _ in 0..50 {
            thresholds.push(sampler.next_iter);
            sampler.record(0, &field);
        }
        let gaps: Vec<f64> = thresholds.windows(2).map(|w| w[1] - w[0]).collect();
        for pair in gaps.windows(2) {
            assert!(
                pair[1] >= pair[0] - 1e-9,
                "sampling gaps must not shrink: {pair:?}"
            );
        }
        // Density really does decrease: the last gap exceeds the first.
        assert!(gaps.last().unwrap() > gaps.first().unwrap());
    }

    #[test]
    fn proportional_term_is_capped() {
        let flux = 1e-3;
        let field = HeightField::new(4, 4).unwrap();
        let mut sampler = EvolutionSampler::new(SampleFlags::MEAN, flux, 1.0);
        // Push the threshold far past the cap crossover.
        for _ in 0..200 {
            sampler.record(0, &field);
        }
        let before = sampler.next_iter;
        sampler.record(0, &field);
        let gap = sampler.next_iter - before;
        let max_gap = STEP_PER_FLUX / flux + CAP_PER_FLUX / flux;
        assert!(
            gap <= max_gap + 1e-6,
            "gap {gap} exceeds capped maximum {max_gap}"
        );
    }

    #[test]
    fn due_respects_threshold() {
        let field = HeightField::new(4, 4).unwrap();
        let mut sampler = EvolutionSampler::new(SampleFlags::MEAN, 1e-2, 1.0);
        sampler.record(0, &field);
        // base_step = 1e-4 / 1e-2 = 1e-2, so iteration 0 is no longer due
        // but any iteration >= 1 is.
        assert!(!sampler.due(0));
        assert!(sampler.due(1));
    }

    // -- Recorded curves --

    #[test]
    fn record_captures_mean_and_rms_in_output_units() {
        let field = HeightField::from_data(2, 2, vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        let mut sampler =
            EvolutionSampler::new(SampleFlags::MEAN | SampleFlags::RMS, 1e-3, 2.0);
        sampler.record(1000, &field);
        let curves = sampler.into_curves();
        assert_eq!(curves.len(), 2);
        // x = 1000 * 1e-3 * 2.0 = 2.0 for both curves.
        assert_eq!(curves[0].quantity, SampleQuantity::Mean);
        let (x, y) = curves[0].points[0];
        assert!((x - 2.0).abs() < 1e-12);
        assert!((y - 2.0).abs() < 1e-12, "mean 1.0 scaled by 2.0");
        assert_eq!(curves[1].quantity, SampleQuantity::Rms);
        assert!((curves[1].points[0].1 - 2.0).abs() < 1e-12, "rms 1.0 scaled by 2.0");
    }

    #[test]
    fn only_requested_quantities_are_recorded() {
        let field = HeightField::new(2, 2).unwrap();
        let mut sampler = EvolutionSampler::new(SampleFlags::RMS, 1e-3, 1.0);
        sampler.record(0, &field);
        sampler.record(10, &field);
        let curves = sampler.into_curves();
        assert_eq!(curves.len(), 1);
        assert_eq!(curves[0].quantity, SampleQuantity::Rms);
        assert_eq!(curves[0].points.len(), 2);
    }

    #[test]
    fn empty_flags_yield_no_curves() {
        let field = HeightField::new(2, 2).unwrap();
        let mut sampler = EvolutionSampler::new(SampleFlags::NONE, 1e-3, 1.0);
        sampler.record(0, &field);
        assert_eq!(sampler.sample_count(), 0);
        assert!(sampler.into_curves().is_empty());
    }

    #[test]
    fn abscissae_are_increasing_in_iteration() {
        let field = HeightField::new(2, 2).unwrap();
        let mut sampler = EvolutionSampler::new(SampleFlags::MEAN, 1e-3, 1.0);
        for iter in [0_u64, 100, 500, 2000] {
            sampler.record(iter, &field);
        }
        let xs: Vec<f64> = sampler.into_curves()[0]
            .points
            .iter()
            .map(|p| p.0)
            .collect();
        assert!(xs.windows(2).all(|w| w[1] > w[0]), "x must increase: {xs:?}");
    }
}
