//! Non-fatal diagnostics collected while building and analyzing a topology.
//!
//! Every stage appends [`Issue`]s to a shared [`Report`] instead of failing. Callers inspect
//! the report afterwards and decide whether the (possibly partial) result is usable.

use crate::model::assembly::Assembly;
use crate::model::terms::TermKind;
use crate::model::types::ResidueKind;
use std::fmt;
use thiserror::Error;

/// Broad taxonomy of non-fatal conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    /// Bond references an unknown atom, duplicate atom ids, missing coordinates.
    StructuralInput,
    /// No parameter-table match for a type tuple.
    UnresolvedType,
    /// Degenerate orientation, missing or doubled anomeric center, unknown pattern.
    Ambiguous,
    /// Cyclic linkages or inconsistent graph algorithms.
    MalformedTopology,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Issue {
    #[error("declared bond references unknown atom serial {serial}")]
    UnknownBondAtom { serial: u32 },

    #[error("duplicate atom serial {serial}; bonds resolve to the first occurrence")]
    DuplicateSerial { serial: u32 },

    #[error("atom {atom} ('{name}') has no coordinates for model {model}")]
    MissingCoordinates {
        atom: usize,
        name: String,
        model: usize,
    },

    #[error("no declared bonds available; fell back to distance bonding")]
    DeclaredBondsMissing,

    #[error("assembly has {atoms} atoms, above the {limit}-atom limit")]
    OversizedAssembly { atoms: usize, limit: usize },

    #[error("atom {atom} ('{name}') has no force-field type; using its element symbol")]
    MissingAtomType { atom: usize, name: String },

    #[error("no {kind} parameters for types {types}")]
    UnresolvedType { kind: TermKind, types: String },

    #[error("ring {ring} has no anomeric carbon")]
    NoAnomericCarbon { ring: String },

    #[error("ring {ring} has more than one anomeric candidate")]
    AmbiguousAnomericCarbon { ring: String },

    #[error("ring {ring}: substituent orientation at position {label} is degenerate")]
    AmbiguousOrientation { ring: String, label: String },

    #[error("ring {ring}: unrecognized substituent on atom '{atom}'")]
    UnrecognizedSubstituent { ring: String, atom: String },

    #[error("ring {ring}: no monosaccharide matches chemical code {code}")]
    UnknownStereoCode { ring: String, code: String },

    #[error("cyclic glycosidic linkage reached ring {ring}; oligosaccharide tree truncated")]
    CyclicLinkage { ring: String },

    #[error("cycle {ring} found by depth-first search was missed by path-graph reduction")]
    RingValidation { ring: String },
}

impl Issue {
    pub fn category(&self) -> IssueCategory {
        match self {
            Issue::UnknownBondAtom { .. }
            | Issue::DuplicateSerial { .. }
            | Issue::MissingCoordinates { .. }
            | Issue::DeclaredBondsMissing
            | Issue::OversizedAssembly { .. }
            | Issue::MissingAtomType { .. } => IssueCategory::StructuralInput,
            Issue::UnresolvedType { .. } => IssueCategory::UnresolvedType,
            Issue::NoAnomericCarbon { .. }
            | Issue::AmbiguousAnomericCarbon { .. }
            | Issue::AmbiguousOrientation { .. }
            | Issue::UnrecognizedSubstituent { .. }
            | Issue::UnknownStereoCode { .. } => IssueCategory::Ambiguous,
            Issue::CyclicLinkage { .. } | Issue::RingValidation { .. } => {
                IssueCategory::MalformedTopology
            }
        }
    }
}

/// Ordered accumulation of [`Issue`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    issues: Vec<Issue>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an issue and mirrors it to the log.
    pub fn push(&mut self, issue: Issue) {
        log::warn!("{issue}");
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: Report) {
        self.issues.extend(other.issues);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn count(&self, category: IssueCategory) -> usize {
        self.issues
            .iter()
            .filter(|i| i.category() == category)
            .count()
    }

    pub fn of_category(&self, category: IssueCategory) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.category() == category)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Non-polymer, non-water residue found in an assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct HetResidue {
    /// Global residue index.
    pub index: usize,
    pub name: String,
    pub id: i32,
    pub insertion_code: Option<char>,
    pub chain_id: String,
    pub kind: ResidueKind,
    pub atoms: usize,
    pub heavy_atoms: usize,
}

impl fmt::Display for HetResidue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.id)?;
        if let Some(code) = self.insertion_code {
            write!(f, "{code}")?;
        }
        if !self.chain_id.is_empty() {
            write!(f, " (chain {})", self.chain_id)?;
        }
        write!(f, ": {} atoms", self.atoms)
    }
}

/// Hetero residues and ions in global order; waters are left out.
pub fn het_residues(assembly: &Assembly) -> Vec<HetResidue> {
    assembly
        .iter_residues()
        .enumerate()
        .filter(|(_, r)| matches!(r.kind, ResidueKind::Hetero | ResidueKind::Ion))
        .map(|(index, r)| HetResidue {
            index,
            name: r.name.clone(),
            id: r.id,
            insertion_code: r.insertion_code,
            chain_id: r.chain_id.clone(),
            kind: r.kind,
            atoms: r.atom_count(),
            heavy_atoms: r.heavy_atom_count(),
        })
        .collect()
}
