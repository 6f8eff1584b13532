//! Carbohydrate annotations derived from perceived rings.
//!
//! A [`Monosaccharide`] records the ring in canonical order (anomeric carbon first, ring
//! oxygen last), one [`RingPosition`] per ring carbon, the compact [`ChemicalCode`] built from
//! substituent orientations, and, when the code matched a known stem, a [`SugarName`].
//! Glycosidic [`Linkage`]s connect monosaccharides into [`Oligosaccharide`] trees.

use super::ring::Ring;
use smol_str::SmolStr;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ANOMERIC_LABEL: &str = "a";
pub const KETOSE_CARBON_LABEL: &str = "-1";

/// Side of the ring mean plane a substituent points to, in Haworth terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Up,
    Down,
    /// Normalized triple product within tolerance of zero.
    Ambiguous,
}

impl Orientation {
    pub fn mirrored(self) -> Self {
        match self {
            Orientation::Up => Orientation::Down,
            Orientation::Down => Orientation::Up,
            Orientation::Ambiguous => Orientation::Ambiguous,
        }
    }

    fn marker(self) -> char {
        match self {
            Orientation::Up => '^',
            Orientation::Down => '_',
            Orientation::Ambiguous => '~',
        }
    }

    fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '^' => Some(Orientation::Up),
            '_' => Some(Orientation::Down),
            '~' => Some(Orientation::Ambiguous),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingForm {
    Pyranose,
    Furanose,
}

impl RingForm {
    pub fn from_size(size: usize) -> Option<Self> {
        match size {
            6 => Some(RingForm::Pyranose),
            5 => Some(RingForm::Furanose),
            _ => None,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            RingForm::Pyranose => 6,
            RingForm::Furanose => 5,
        }
    }

    /// Letter leading a chemical code.
    pub fn code_letter(&self) -> char {
        match self {
            RingForm::Pyranose => 'P',
            RingForm::Furanose => 'F',
        }
    }

    /// Ring-size letter used in condensed names (`Glcp`, `Fruf`).
    pub fn suffix(&self) -> char {
        match self {
            RingForm::Pyranose => 'p',
            RingForm::Furanose => 'f',
        }
    }
}

/// Ring form plus ordered `(position label, orientation)` pairs, e.g. `P^{a}_{2}^{3}_{4}^{+1}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChemicalCode {
    pub form: RingForm,
    pub entries: Vec<(SmolStr, Orientation)>,
}

impl ChemicalCode {
    pub fn new(form: RingForm) -> Self {
        Self {
            form,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, label: &str, orientation: Orientation) {
        self.entries.push((SmolStr::new(label), orientation));
    }

    pub fn orientation(&self, label: &str) -> Option<Orientation> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, o)| *o)
    }

    pub fn is_ambiguous(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, o)| *o == Orientation::Ambiguous)
    }

    /// Code without the anomeric entries, which is what identifies a stem.
    pub fn stereo_key(&self) -> ChemicalCode {
        ChemicalCode {
            form: self.form,
            entries: self
                .entries
                .iter()
                .filter(|(l, _)| l != ANOMERIC_LABEL && l != KETOSE_CARBON_LABEL)
                .cloned()
                .collect(),
        }
    }

    /// Enantiomer of this code: every orientation flipped.
    pub fn mirrored(&self) -> ChemicalCode {
        ChemicalCode {
            form: self.form,
            entries: self
                .entries
                .iter()
                .map(|(l, o)| (l.clone(), o.mirrored()))
                .collect(),
        }
    }
}

impl fmt::Display for ChemicalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.form.code_letter())?;
        for (label, orientation) in &self.entries {
            write!(f, "{}{{{}}}", orientation.marker(), label)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeParseError {
    #[error("chemical code '{code}' must start with P or F")]
    InvalidForm { code: String },

    #[error("invalid orientation marker '{marker}' in chemical code '{code}'")]
    InvalidMarker { marker: char, code: String },

    #[error("expected '{{' after '{marker}' in chemical code '{code}'")]
    MissingBrace { marker: char, code: String },

    #[error("empty position label in chemical code '{code}'")]
    EmptyLabel { code: String },
}

impl FromStr for ChemicalCode {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let code_string = || text.to_string();
        let mut chars = text.chars();
        let form = match chars.next() {
            Some('P') => RingForm::Pyranose,
            Some('F') => RingForm::Furanose,
            _ => return Err(CodeParseError::InvalidForm { code: code_string() }),
        };

        let mut code = ChemicalCode::new(form);
        while let Some(marker) = chars.next() {
            let orientation =
                Orientation::from_marker(marker).ok_or_else(|| CodeParseError::InvalidMarker {
                    marker,
                    code: code_string(),
                })?;
            if chars.next() != Some('{') {
                return Err(CodeParseError::MissingBrace {
                    marker,
                    code: code_string(),
                });
            }
            let label: String = chars.by_ref().take_while(|&c| c != '}').collect();
            if label.is_empty() {
                return Err(CodeParseError::EmptyLabel { code: code_string() });
            }
            code.push(&label, orientation);
        }
        Ok(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anomer {
    Alpha,
    Beta,
}

impl fmt::Display for Anomer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomer::Alpha => write!(f, "α"),
            Anomer::Beta => write!(f, "β"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Configuration {
    D,
    L,
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Configuration::D => write!(f, "D"),
            Configuration::L => write!(f, "L"),
        }
    }
}

/// Recognized substituent patterns on a sugar carbon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivativeKind {
    NGlycolyl,
    NAcetyl,
    OAcetyl,
    Sulfate { on_nitrogen: bool },
    Phosphate { on_nitrogen: bool },
    Methyl { on_nitrogen: bool },
    Carboxylate,
    Amine,
}

impl DerivativeKind {
    pub fn code(&self) -> &'static str {
        match self {
            DerivativeKind::NGlycolyl => "NGc",
            DerivativeKind::NAcetyl => "NAc",
            DerivativeKind::OAcetyl => "Ac",
            DerivativeKind::Sulfate { on_nitrogen: true } => "NS",
            DerivativeKind::Sulfate { on_nitrogen: false } => "S",
            DerivativeKind::Phosphate { on_nitrogen: true } => "NP",
            DerivativeKind::Phosphate { on_nitrogen: false } => "P",
            DerivativeKind::Methyl { on_nitrogen: true } => "NMe",
            DerivativeKind::Methyl { on_nitrogen: false } => "Me",
            DerivativeKind::Carboxylate => "A",
            DerivativeKind::Amine => "N",
        }
    }

    /// Whether the group replaces the hydroxyl with a nitrogen.
    pub fn on_nitrogen(&self) -> bool {
        match self {
            DerivativeKind::NGlycolyl | DerivativeKind::NAcetyl | DerivativeKind::Amine => true,
            DerivativeKind::Sulfate { on_nitrogen }
            | DerivativeKind::Phosphate { on_nitrogen }
            | DerivativeKind::Methyl { on_nitrogen } => *on_nitrogen,
            DerivativeKind::OAcetyl | DerivativeKind::Carboxylate => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Derivative {
    /// Carbon number the substituent hangs off.
    pub carbon: u8,
    pub kind: DerivativeKind,
}

impl Derivative {
    /// Whether condensed notation drops the locant (`GlcpNAc`, `GlcpNS`, `GlcpA`).
    fn implicit_locant(&self, terminal_carbon: u8) -> bool {
        match self.kind {
            DerivativeKind::Carboxylate => self.carbon == terminal_carbon,
            kind => kind.on_nitrogen() && self.carbon == 2,
        }
    }
}

/// Trivial name such as `β-D-GlcpNAc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SugarName {
    pub anomer: Anomer,
    pub configuration: Configuration,
    pub stem: String,
    pub form: RingForm,
    pub derivatives: Vec<Derivative>,
    /// Highest carbon number of the backbone, where a carboxylate needs no locant.
    pub terminal_carbon: u8,
}

impl fmt::Display for SugarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}{}",
            self.anomer,
            self.configuration,
            self.stem,
            self.form.suffix()
        )?;
        let (implicit, explicit): (Vec<&Derivative>, Vec<&Derivative>) = self
            .derivatives
            .iter()
            .partition(|d| d.implicit_locant(self.terminal_carbon));
        for derivative in implicit {
            write!(f, "{}", derivative.kind.code())?;
        }
        for derivative in explicit {
            write!(f, "{}{}", derivative.carbon, derivative.kind.code())?;
        }
        Ok(())
    }
}

/// One ring carbon with its chosen substituent.
#[derive(Debug, Clone, PartialEq)]
pub struct RingPosition {
    pub label: SmolStr,
    pub carbon: usize,
    pub carbon_number: u8,
    /// Exocyclic atom whose orientation is recorded; `None` for a deoxy position.
    pub substituent: Option<usize>,
    pub orientation: Option<Orientation>,
}

/// Exocyclic backbone carbon beyond the ring (`+1`, `+2`, ... or `-1`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChainCarbon {
    pub label: SmolStr,
    pub atom: usize,
    pub carbon_number: u8,
    /// Stereo descriptor, present when the carbon carries a heteroatom and continues the chain.
    pub orientation: Option<Orientation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Monosaccharide {
    /// Ring traversed from the anomeric carbon, ring oxygen last.
    pub ring: Ring,
    pub residue_name: String,
    pub residue_id: i32,
    pub chain_id: String,
    pub anomeric_carbon: usize,
    pub ring_oxygen: usize,
    pub ketose: bool,
    pub positions: Vec<RingPosition>,
    pub chain: Vec<ChainCarbon>,
    pub code: ChemicalCode,
    pub deoxy: Vec<SmolStr>,
    pub derivatives: Vec<Derivative>,
    /// `None` when the ring is unclassified.
    pub name: Option<SugarName>,
}

impl Monosaccharide {
    /// Carbon number of a backbone atom, ring or chain.
    pub fn carbon_number_of(&self, atom: usize) -> Option<u8> {
        self.positions
            .iter()
            .find(|p| p.carbon == atom)
            .map(|p| p.carbon_number)
            .or_else(|| {
                self.chain
                    .iter()
                    .find(|c| c.atom == atom)
                    .map(|c| c.carbon_number)
            })
    }

    /// Every backbone carbon atom.
    pub fn backbone(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions
            .iter()
            .map(|p| p.carbon)
            .chain(self.chain.iter().map(|c| c.atom))
    }

    pub fn anomeric_number(&self) -> u8 {
        if self.ketose { 2 } else { 1 }
    }

    pub fn is_classified(&self) -> bool {
        self.name.is_some()
    }

    /// Trivial name, or the residue name when unclassified.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => self.residue_name.clone(),
        }
    }
}

/// Glycosidic bond from a child's anomeric carbon to a carbon of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linkage {
    pub child: usize,
    pub parent: usize,
    pub child_carbon: u8,
    pub parent_carbon: u8,
    /// Bridging heteroatom.
    pub bridge: usize,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}-{})", self.child_carbon, self.parent_carbon)
    }
}

/// What the reducing-end monosaccharide is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Free,
    Aglycone { residue: String, residue_id: i32 },
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Free => write!(f, "OH"),
            Terminal::Aglycone { residue, .. } => write!(f, "{}", residue),
        }
    }
}

/// Tree of monosaccharides rooted at the reducing end.
#[derive(Debug, Clone, PartialEq)]
pub struct Oligosaccharide {
    /// Index into the monosaccharide list.
    pub root: usize,
    pub members: Vec<usize>,
    pub linkages: Vec<Linkage>,
    pub terminal: Terminal,
    /// Set when traversal stopped at a cyclic linkage.
    pub truncated: bool,
}

impl Oligosaccharide {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Condensed sequence, e.g. `β-D-Galp(1-4)β-D-GlcpNAc-ASN`.
    ///
    /// Branches are ordered by ascending parent carbon; all but the first are bracketed.
    pub fn sequence(&self, monosaccharides: &[Monosaccharide]) -> String {
        let mut visited = HashSet::new();
        let mut out = self.subtree(self.root, monosaccharides, &mut visited);
        out.push('-');
        out.push_str(&self.terminal.to_string());
        out
    }

    fn subtree(
        &self,
        node: usize,
        monosaccharides: &[Monosaccharide],
        visited: &mut HashSet<usize>,
    ) -> String {
        visited.insert(node);
        let mut children: Vec<&Linkage> = self
            .linkages
            .iter()
            .filter(|l| l.parent == node && !visited.contains(&l.child))
            .collect();
        children.sort_by_key(|l| (l.parent_carbon, l.child));

        let mut out = String::new();
        for (i, linkage) in children.iter().enumerate() {
            if visited.contains(&linkage.child) {
                continue;
            }
            let branch = format!(
                "{}{}",
                self.subtree(linkage.child, monosaccharides, visited),
                linkage
            );
            if i == 0 {
                out.push_str(&branch);
            } else {
                out.push('[');
                out.push_str(&branch);
                out.push(']');
            }
        }
        match monosaccharides.get(node) {
            Some(mono) => out.push_str(&mono.display_name()),
            None => out.push('?'),
        }
        out
    }
}
