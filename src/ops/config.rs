use crate::ops::error::Error;
use std::collections::BTreeSet;
use std::fmt;

/// Source of connectivity used by the graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BondingStrategy {
    /// Bonds declared by the input file; falls back to distance when none were declared.
    #[default]
    Declared,
    /// Pairwise distance cutoff on one coordinate model.
    Distance,
}

impl fmt::Display for BondingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BondingStrategy::Declared => write!(f, "declared"),
            BondingStrategy::Distance => write!(f, "distance"),
        }
    }
}

/// Longest bonding distance accepted, in ångströms.
pub const MAX_CUTOFF: f64 = 4.0;

/// Atom count above which distance bonding is reported as oversized.
pub const DEFAULT_MAX_ATOMS: usize = 2_000_000;

/// Knobs threaded through bonding and ring perception.
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionConfig {
    pub strategy: BondingStrategy,
    /// Maximum bonding distance in ångströms (inclusive).
    pub cutoff: f64,
    /// Coordinate model used by distance bonding.
    pub model_index: usize,
    /// Ring sizes retained after perception.
    pub ring_sizes: BTreeSet<usize>,
    /// Soft limit on assembly size; larger inputs are still processed but reported.
    pub max_atoms: usize,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            strategy: BondingStrategy::Declared,
            cutoff: 1.65,
            model_index: 0,
            ring_sizes: BTreeSet::from([5, 6]),
            max_atoms: DEFAULT_MAX_ATOMS,
        }
    }
}

impl PerceptionConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return Err(Error::invalid_config(format!(
                "bond cutoff must be a positive distance, got {}",
                self.cutoff
            )));
        }
        if self.cutoff > MAX_CUTOFF {
            return Err(Error::invalid_config(format!(
                "bond cutoff {} exceeds the {MAX_CUTOFF} Å limit",
                self.cutoff
            )));
        }
        if self.ring_sizes.is_empty() {
            return Err(Error::invalid_config("at least one ring size is required"));
        }
        if let Some(size) = self.ring_sizes.iter().find(|&&s| s < 3) {
            return Err(Error::invalid_config(format!(
                "ring size {size} is below the smallest possible ring"
            )));
        }
        Ok(())
    }

    /// Largest ring size perception has to enumerate.
    pub fn max_ring_size(&self) -> usize {
        self.ring_sizes.iter().next_back().copied().unwrap_or(0)
    }
}
