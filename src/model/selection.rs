//! Pattern-based atom selection over an assembly tree.
//!
//! A selection is a `;`-separated list of clauses; an atom is selected when any clause matches
//! it. Each clause reads `[assemblies:]residues[@atoms]`:
//!
//! * `assemblies` - comma-separated hierarchical ids. The root is `1`, its children `1.1`,
//!   `1.2`, and so on; `*` matches any single level. An id also covers every assembly nested
//!   below it.
//! * `residues` - comma-separated residue names, `#id` or `#first-last` id ranges, or `*`.
//! * `atoms` - comma-separated atom names, `^prefix`, `suffix$`, `#serial` or
//!   `#first-last` serial ranges, or `*`.
//!
//! For example `1.*:#520,MAN,GAL@#3740-3750,^C;NAG@O$` selects, inside any child assembly, the
//! atoms of residue 520, `MAN` and `GAL` with serials 3740 to 3750 or names starting with `C`,
//! plus every atom of any `NAG` whose name ends in `O`.

use super::assembly::Assembly;
use super::atom::Atom;
use super::residue::Residue;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("empty selection pattern")]
    Empty,

    #[error("invalid range '{token}' in selection pattern")]
    InvalidRange { token: String },

    #[error("invalid assembly id '{token}' in selection pattern")]
    InvalidAssemblyId { token: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum IdSegment {
    Index(usize),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ResidueMatcher {
    Any,
    Name(String),
    Ids(i32, i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AtomMatcher {
    Any,
    Name(String),
    Prefix(String),
    Suffix(String),
    Serials(u32, u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    /// Empty means every assembly.
    assemblies: Vec<Vec<IdSegment>>,
    residues: Vec<ResidueMatcher>,
    atoms: Vec<AtomMatcher>,
}

/// Parsed selection pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    clauses: Vec<Clause>,
}

impl Selection {
    fn matches(&self, path: &[usize], residue: &Residue, atom: &Atom) -> bool {
        self.clauses.iter().any(|clause| {
            (clause.assemblies.is_empty() || clause.assemblies.iter().any(|id| covers(id, path)))
                && clause.residues.iter().any(|m| m.matches(residue))
                && clause.atoms.iter().any(|m| m.matches(atom))
        })
    }
}

fn covers(id: &[IdSegment], path: &[usize]) -> bool {
    id.len() <= path.len()
        && id.iter().zip(path).all(|(segment, &index)| match segment {
            IdSegment::Any => true,
            IdSegment::Index(i) => *i == index,
        })
}

impl ResidueMatcher {
    fn matches(&self, residue: &Residue) -> bool {
        match self {
            ResidueMatcher::Any => true,
            ResidueMatcher::Name(name) => residue.name == *name,
            ResidueMatcher::Ids(first, last) => (*first..=*last).contains(&residue.id),
        }
    }
}

impl AtomMatcher {
    fn matches(&self, atom: &Atom) -> bool {
        match self {
            AtomMatcher::Any => true,
            AtomMatcher::Name(name) => atom.name == name.as_str(),
            AtomMatcher::Prefix(prefix) => atom.name.starts_with(prefix.as_str()),
            AtomMatcher::Suffix(suffix) => atom.name.ends_with(suffix.as_str()),
            AtomMatcher::Serials(first, last) => (*first..=*last).contains(&atom.serial),
        }
    }
}

fn parse_range<T: FromStr + PartialOrd + Copy>(token: &str) -> Result<(T, T), SelectionError> {
    let invalid = || SelectionError::InvalidRange {
        token: token.to_string(),
    };
    let body = token.strip_prefix('#').ok_or_else(invalid)?;
    // A leading minus belongs to a negative residue id, not to the range separator.
    let split = body
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(i, _)| i);
    let (first, last) = match split {
        Some(i) => (&body[..i], &body[i + 1..]),
        None => (body, body),
    };
    let first: T = first.trim().parse().map_err(|_| invalid())?;
    let last: T = last.trim().parse().map_err(|_| invalid())?;
    if first > last {
        return Err(invalid());
    }
    Ok((first, last))
}

fn parse_assembly_id(token: &str) -> Result<Vec<IdSegment>, SelectionError> {
    token
        .split('.')
        .map(|segment| match segment.trim() {
            "*" => Ok(IdSegment::Any),
            text => text
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .map(IdSegment::Index)
                .ok_or_else(|| SelectionError::InvalidAssemblyId {
                    token: token.to_string(),
                }),
        })
        .collect()
}

fn parse_residue(token: &str) -> Result<ResidueMatcher, SelectionError> {
    Ok(match token {
        "*" => ResidueMatcher::Any,
        t if t.starts_with('#') => {
            let (first, last) = parse_range(t)?;
            ResidueMatcher::Ids(first, last)
        }
        t => ResidueMatcher::Name(t.to_string()),
    })
}

fn parse_atom(token: &str) -> Result<AtomMatcher, SelectionError> {
    Ok(match token {
        "*" => AtomMatcher::Any,
        t if t.starts_with('#') => {
            let (first, last) = parse_range(t)?;
            AtomMatcher::Serials(first, last)
        }
        t if t.len() > 1 && t.starts_with('^') => AtomMatcher::Prefix(t[1..].to_string()),
        t if t.len() > 1 && t.ends_with('$') => AtomMatcher::Suffix(t[..t.len() - 1].to_string()),
        t => AtomMatcher::Name(t.to_string()),
    })
}

fn tokens(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn parse_clause(text: &str) -> Result<Clause, SelectionError> {
    let (scope, atoms) = text.split_once('@').unwrap_or((text, "*"));
    let (assemblies, residues) = match scope.split_once(':') {
        Some((assemblies, residues)) => (assemblies, residues),
        None => ("", scope),
    };

    let assemblies = tokens(assemblies)
        .map(parse_assembly_id)
        .collect::<Result<Vec<_>, _>>()?;
    let mut residues = tokens(residues)
        .map(parse_residue)
        .collect::<Result<Vec<_>, _>>()?;
    if residues.is_empty() {
        residues.push(ResidueMatcher::Any);
    }
    let mut atoms = tokens(atoms).map(parse_atom).collect::<Result<Vec<_>, _>>()?;
    if atoms.is_empty() {
        atoms.push(AtomMatcher::Any);
    }

    Ok(Clause {
        assemblies,
        residues,
        atoms,
    })
}

impl FromStr for Selection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clauses = s
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(parse_clause)
            .collect::<Result<Vec<_>, _>>()?;
        if clauses.is_empty() {
            return Err(SelectionError::Empty);
        }
        Ok(Self { clauses })
    }
}

impl Assembly {
    /// Global indices of the atoms matching `selection`, in ascending order.
    pub fn select(&self, selection: &Selection) -> Vec<usize> {
        let mut selected = Vec::new();
        let mut next = 0;
        collect(self, &mut vec![1], selection, &mut next, &mut selected);
        selected
    }
}

fn collect(
    assembly: &Assembly,
    path: &mut Vec<usize>,
    selection: &Selection,
    next: &mut usize,
    selected: &mut Vec<usize>,
) {
    for residue in assembly.residues() {
        for atom in residue.iter_atoms() {
            if selection.matches(path, residue, atom) {
                selected.push(*next);
            }
            *next += 1;
        }
    }
    for (i, child) in assembly.assemblies().iter().enumerate() {
        path.push(i + 1);
        collect(child, path, selection, next, selected);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Element, Point, ResidueKind};

    fn residue(id: i32, name: &str, atoms: &[(&str, u32)]) -> Residue {
        let mut residue = Residue::new(id, name, "A", ResidueKind::Hetero);
        for &(atom_name, serial) in atoms {
            let element = if atom_name.starts_with('O') {
                Element::O
            } else {
                Element::C
            };
            residue.add_atom(Atom::new(atom_name, element, Point::origin()).with_serial(serial));
        }
        residue
    }

    /// Root holds ASN 7; child 1.1 holds NAG 1 and NAG 2; child 1.2 holds MAN 3.
    fn glycoprotein() -> Assembly {
        let mut root = Assembly::new("protein");
        root.add_residue(residue(7, "ASN", &[("ND2", 1), ("CG", 2)]));

        let mut core = Assembly::new("core");
        core.add_residue(residue(1, "NAG", &[("C1", 3), ("O5", 4), ("C2", 5)]));
        core.add_residue(residue(2, "NAG", &[("C1", 6), ("O4", 7)]));
        root.add_assembly(core);

        let mut arm = Assembly::new("arm");
        arm.add_residue(residue(3, "MAN", &[("C1", 8), ("O6", 9)]));
        root.add_assembly(arm);
        root
    }

    fn select(pattern: &str) -> Vec<usize> {
        glycoprotein().select(&pattern.parse().unwrap())
    }

    #[test]
    fn residue_names_and_atom_names_combine() {
        assert_eq!(select("NAG@C1"), vec![2, 5]);
        assert_eq!(select("NAG"), vec![2, 3, 4, 5, 6]);
        assert_eq!(select("*@O4"), vec![6]);
    }

    #[test]
    fn residue_id_ranges_and_serial_ranges() {
        assert_eq!(select("#2-3"), vec![5, 6, 7, 8]);
        assert_eq!(select("#7@*"), vec![0, 1]);
        assert_eq!(select("*@#4-6"), vec![3, 4, 5]);
    }

    #[test]
    fn prefix_and_suffix_atom_patterns() {
        assert_eq!(select("@^O"), vec![3, 6, 8]);
        assert_eq!(select("NAG,MAN@1$"), vec![2, 5, 7]);
    }

    #[test]
    fn assembly_ids_cover_nested_assemblies() {
        assert_eq!(select("1:*").len(), 9);
        assert_eq!(select("1.*:*"), vec![2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(select("1.2:*"), vec![7, 8]);
        assert_eq!(select("1.1,1.2:@C1"), vec![2, 5, 7]);
    }

    #[test]
    fn clauses_are_unioned() {
        assert_eq!(select("ASN@ND2; 1.2:MAN@O6"), vec![0, 8]);
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert_eq!(" ; ".parse::<Selection>(), Err(SelectionError::Empty));
        assert!(matches!(
            "#5-2".parse::<Selection>(),
            Err(SelectionError::InvalidRange { .. })
        ));
        assert!(matches!(
            "*@#x".parse::<Selection>(),
            Err(SelectionError::InvalidRange { .. })
        ));
        assert!(matches!(
            "1.a:NAG".parse::<Selection>(),
            Err(SelectionError::InvalidAssemblyId { .. })
        ));
    }

    #[test]
    fn negative_residue_ids_parse() {
        let selection: Selection = "#-3--1".parse().unwrap();
        let assembly: Assembly = [residue(-2, "HOH", &[("O", 1)])].into_iter().collect();
        assert_eq!(assembly.select(&selection), vec![0]);
    }
}
