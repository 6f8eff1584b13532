//! Force-field parameter tables keyed by atom-type tuples.
//!
//! Tables are deserialized from TOML:
//!
//! ```toml
//! [[bonds]]
//! types = ["CG", "OS"]
//! k = 320.0
//! r0 = 1.41
//!
//! [[dihedrals]]
//! types = ["X", "CG", "OS", "X"]
//! terms = [{ barrier = 0.38, periodicity = 3.0, phase = 0.0 }]
//! ```
//!
//! Lookups accept any equivalent ordering of the query (see
//! [`equivalent_orderings`](super::terms::equivalent_orderings)). Dihedral and improper entries
//! may use the `X` wildcard; an exact entry always wins over a wildcard one, and fewer
//! wildcards win over more.

use super::terms::{TermKind, WILDCARD, equivalent_orderings};
use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::HashMap;
use thiserror::Error;

/// Rejection of a parameter table.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("malformed TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{kind} parameter {types:?} needs {} types", .kind.arity())]
    Arity { kind: TermKind, types: Vec<String> },

    #[error("dihedral parameter {types:?} has no terms")]
    EmptyDihedral { types: Vec<String> },
}

fn default_scee() -> f64 {
    1.2
}

fn default_scnb() -> f64 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BondParameter {
    pub types: Vec<String>,
    pub k: f64,
    pub r0: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AngleParameter {
    pub types: Vec<String>,
    pub k: f64,
    pub theta0: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TorsionTerm {
    pub barrier: f64,
    pub periodicity: f64,
    #[serde(default)]
    pub phase: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DihedralParameter {
    pub types: Vec<String>,
    pub terms: Vec<TorsionTerm>,
    #[serde(default = "default_scee")]
    pub scee: f64,
    #[serde(default = "default_scnb")]
    pub scnb: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImproperParameter {
    pub types: Vec<String>,
    pub barrier: f64,
    pub periodicity: f64,
    #[serde(default)]
    pub phase: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MassParameter {
    #[serde(rename = "type")]
    pub atom_type: String,
    pub mass: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterTable {
    #[serde(default)]
    pub bonds: Vec<BondParameter>,
    #[serde(default)]
    pub angles: Vec<AngleParameter>,
    #[serde(default)]
    pub dihedrals: Vec<DihedralParameter>,
    #[serde(default)]
    pub impropers: Vec<ImproperParameter>,
    #[serde(default)]
    pub masses: Vec<MassParameter>,
}

trait Keyed {
    fn types(&self) -> &[String];
}

macro_rules! impl_keyed {
    ($($ty:ty),*) => {
        $(impl Keyed for $ty {
            fn types(&self) -> &[String] {
                &self.types
            }
        })*
    };
}

impl_keyed!(BondParameter, AngleParameter, DihedralParameter, ImproperParameter);

/// Number of wildcards an entry needs to match `query`, or `None` if it does not match.
fn match_cost(entry: &[String], query: &[SmolStr]) -> Option<usize> {
    if entry.len() != query.len() {
        return None;
    }
    let mut wildcards = 0;
    for (e, q) in entry.iter().zip(query) {
        if e == WILDCARD {
            wildcards += 1;
        } else if e != q.as_str() {
            return None;
        }
    }
    Some(wildcards)
}

fn best_match<'a, P: Keyed>(
    entries: &'a [P],
    kind: TermKind,
    query: &[SmolStr],
    allow_wildcards: bool,
) -> Option<&'a P> {
    let orderings = equivalent_orderings(kind, query);
    entries
        .iter()
        .filter_map(|entry| {
            orderings
                .iter()
                .filter_map(|o| match_cost(entry.types(), o))
                .min()
                .map(|cost| (cost, entry))
        })
        .filter(|&(cost, _)| allow_wildcards || cost == 0)
        .min_by_key(|&(cost, _)| cost)
        .map(|(_, entry)| entry)
}

impl ParameterTable {
    /// Parses and validates a TOML parameter table.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::Toml`] for malformed TOML, [`ParameterError::Arity`] when an
    /// entry has the wrong number of types and [`ParameterError::EmptyDihedral`] when a dihedral
    /// has no terms.
    pub fn from_toml_str(content: &str) -> Result<Self, ParameterError> {
        let table: ParameterTable = toml::from_str(content)?;
        table.validate()?;
        log::debug!(
            "Loaded parameter table: {} bonds, {} angles, {} dihedrals, {} impropers",
            table.bonds.len(),
            table.angles.len(),
            table.dihedrals.len(),
            table.impropers.len()
        );
        Ok(table)
    }

    fn validate(&self) -> Result<(), ParameterError> {
        let arity = |kind: TermKind, types: &[String]| {
            if types.len() == kind.arity() {
                Ok(())
            } else {
                Err(ParameterError::Arity {
                    kind,
                    types: types.to_vec(),
                })
            }
        };
        for p in &self.bonds {
            arity(TermKind::Bond, &p.types)?;
        }
        for p in &self.angles {
            arity(TermKind::Angle, &p.types)?;
        }
        for p in &self.dihedrals {
            arity(TermKind::Dihedral, &p.types)?;
            if p.terms.is_empty() {
                return Err(ParameterError::EmptyDihedral {
                    types: p.types.clone(),
                });
            }
        }
        for p in &self.impropers {
            arity(TermKind::Improper, &p.types)?;
        }
        Ok(())
    }

    pub fn bond(&self, types: &[SmolStr]) -> Option<&BondParameter> {
        best_match(&self.bonds, TermKind::Bond, types, false)
    }

    pub fn angle(&self, types: &[SmolStr]) -> Option<&AngleParameter> {
        best_match(&self.angles, TermKind::Angle, types, false)
    }

    pub fn dihedral(&self, types: &[SmolStr]) -> Option<&DihedralParameter> {
        best_match(&self.dihedrals, TermKind::Dihedral, types, true)
    }

    /// Improper entry for a tuple whose third type is the central atom.
    pub fn improper(&self, types: &[SmolStr]) -> Option<&ImproperParameter> {
        best_match(&self.impropers, TermKind::Improper, types, true)
    }

    pub fn masses(&self) -> HashMap<&str, f64> {
        self.masses
            .iter()
            .map(|m| (m.atom_type.as_str(), m.mass))
            .collect()
    }

    pub fn mass(&self, atom_type: &str) -> Option<f64> {
        self.masses
            .iter()
            .find(|m| m.atom_type == atom_type)
            .map(|m| m.mass)
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
            && self.angles.is_empty()
            && self.dihedrals.is_empty()
            && self.impropers.is_empty()
    }
}
