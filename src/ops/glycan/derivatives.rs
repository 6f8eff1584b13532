use super::Molecule;
use crate::model::glycan::{Derivative, DerivativeKind, Monosaccharide};
use crate::model::types::Element;
use crate::ops::report::{Issue, Report};
use std::collections::HashMap;

/// What a heteroatom on a backbone carbon turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Substituent {
    Hydroxyl,
    Derivative(DerivativeKind),
    /// Bridge to a carbon of another monosaccharide.
    Linkage,
    Unrecognized,
}

/// Annotates the derivatives of `monosaccharides[idx]`.
///
/// The anomeric substituent is left to linkage detection. Returns `false` when any substituent
/// could not be recognized, which keeps the residue unnamed.
pub(super) fn assign_derivatives(
    molecule: &Molecule,
    mono: &mut Monosaccharide,
    idx: usize,
    backbone: &HashMap<usize, (usize, u8)>,
    report: &mut Report,
) -> bool {
    let mut derivatives = Vec::new();
    let mut recognized = true;
    let terminal = mono.chain.last().map(|c| c.atom);

    let carbons: Vec<(usize, u8)> = mono
        .backbone()
        .filter(|&c| c != mono.anomeric_carbon)
        .filter_map(|c| mono.carbon_number_of(c).map(|n| (c, n)))
        .collect();

    for (carbon, number) in carbons {
        if Some(carbon) == terminal && is_carboxylate(molecule, carbon) {
            derivatives.push(Derivative {
                carbon: number,
                kind: DerivativeKind::Carboxylate,
            });
            continue;
        }

        let heteroatoms: Vec<usize> = molecule
            .heavy_neighbors(carbon)
            .filter(|&x| molecule.element(x).is_heteroatom() && !mono.ring.contains(x))
            .collect();
        for hetero in heteroatoms {
            match classify_substituent(molecule, carbon, hetero, idx, backbone) {
                Substituent::Hydroxyl | Substituent::Linkage => {}
                Substituent::Derivative(kind) => derivatives.push(Derivative {
                    carbon: number,
                    kind,
                }),
                Substituent::Unrecognized => {
                    recognized = false;
                    report.push(Issue::UnrecognizedSubstituent {
                        ring: mono.ring.key().to_string(),
                        atom: molecule.atom(hetero).name.to_string(),
                    });
                }
            }
        }
    }

    derivatives.sort_by_key(|d| d.carbon);
    mono.derivatives = derivatives;
    recognized
}

fn classify_substituent(
    molecule: &Molecule,
    carbon: usize,
    hetero: usize,
    owner: usize,
    backbone: &HashMap<usize, (usize, u8)>,
) -> Substituent {
    let on_nitrogen = molecule.element(hetero) == Element::N;
    let others: Vec<usize> = molecule
        .heavy_neighbors(hetero)
        .filter(|&n| n != carbon)
        .collect();

    if others
        .iter()
        .any(|o| backbone.get(o).is_some_and(|&(m, _)| m != owner))
    {
        return Substituent::Linkage;
    }

    match (molecule.element(hetero), others.as_slice()) {
        (Element::O, []) => Substituent::Hydroxyl,
        (Element::N, []) => Substituent::Derivative(DerivativeKind::Amine),
        (Element::O | Element::N, &[group]) => match group_kind(molecule, hetero, group, on_nitrogen) {
            Some(kind) => Substituent::Derivative(kind),
            None => Substituent::Unrecognized,
        },
        _ => Substituent::Unrecognized,
    }
}

/// Recognizes the group hanging off a substituent heteroatom.
fn group_kind(
    molecule: &Molecule,
    hetero: usize,
    group: usize,
    on_nitrogen: bool,
) -> Option<DerivativeKind> {
    let rest: Vec<usize> = molecule
        .heavy_neighbors(group)
        .filter(|&n| n != hetero)
        .collect();

    match molecule.element(group) {
        Element::C if rest.is_empty() => Some(DerivativeKind::Methyl { on_nitrogen }),
        Element::C => acyl_kind(molecule, group, &rest, on_nitrogen),
        Element::S if is_oxyacid(molecule, &rest) => Some(DerivativeKind::Sulfate { on_nitrogen }),
        Element::P if is_oxyacid(molecule, &rest) => {
            Some(DerivativeKind::Phosphate { on_nitrogen })
        }
        _ => None,
    }
}

/// Acetyl (`C(=O)CH3`) or glycolyl (`C(=O)CH2OH`, nitrogen only).
fn acyl_kind(
    molecule: &Molecule,
    carbonyl: usize,
    rest: &[usize],
    on_nitrogen: bool,
) -> Option<DerivativeKind> {
    let [a, b] = *rest else {
        return None;
    };
    let (oxygen, methyl) = match (molecule.element(a), molecule.element(b)) {
        (Element::O, Element::C) => (a, b),
        (Element::C, Element::O) => (b, a),
        _ => return None,
    };
    if !is_terminal(molecule, oxygen) {
        return None;
    }

    let tail: Vec<usize> = molecule
        .heavy_neighbors(methyl)
        .filter(|&n| n != carbonyl)
        .collect();
    match tail.as_slice() {
        [] if on_nitrogen => Some(DerivativeKind::NAcetyl),
        [] => Some(DerivativeKind::OAcetyl),
        &[hydroxyl]
            if on_nitrogen
                && molecule.element(hydroxyl) == Element::O
                && is_terminal(molecule, hydroxyl) =>
        {
            Some(DerivativeKind::NGlycolyl)
        }
        _ => None,
    }
}

/// Three terminal oxygens besides the bridging heteroatom.
fn is_oxyacid(molecule: &Molecule, rest: &[usize]) -> bool {
    rest.len() == 3
        && rest
            .iter()
            .all(|&o| molecule.element(o) == Element::O && is_terminal(molecule, o))
}

fn is_carboxylate(molecule: &Molecule, carbon: usize) -> bool {
    molecule
        .heavy_neighbors(carbon)
        .filter(|&o| molecule.element(o) == Element::O && is_terminal(molecule, o))
        .count()
        >= 2
}

fn is_terminal(molecule: &Molecule, atom: usize) -> bool {
    molecule.heavy_neighbors(atom).count() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Element::*;
    use crate::ops::testing::graph;

    // Carbon 0 carries the heteroatom 1; the group starts at atom 2.
    fn classify(elements: &[Element], bonds: &[(usize, usize)]) -> Substituent {
        let topology = graph(elements, bonds);
        let molecule = Molecule::new(&topology, 0);
        classify_substituent(&molecule, 0, 1, 0, &HashMap::new())
    }

    #[test]
    fn bare_heteroatoms() {
        assert_eq!(classify(&[C, O], &[(0, 1)]), Substituent::Hydroxyl);
        assert_eq!(
            classify(&[C, N], &[(0, 1)]),
            Substituent::Derivative(DerivativeKind::Amine)
        );
    }

    #[test]
    fn acyl_groups() {
        let acetyl = [(0, 1), (1, 2), (2, 3), (2, 4)];
        assert_eq!(
            classify(&[C, N, C, O, C], &acetyl),
            Substituent::Derivative(DerivativeKind::NAcetyl)
        );
        assert_eq!(
            classify(&[C, O, C, O, C], &acetyl),
            Substituent::Derivative(DerivativeKind::OAcetyl)
        );

        let glycolyl = [(0, 1), (1, 2), (2, 3), (2, 4), (4, 5)];
        assert_eq!(
            classify(&[C, N, C, O, C, O], &glycolyl),
            Substituent::Derivative(DerivativeKind::NGlycolyl)
        );
        // Glycolyl on oxygen is not a known pattern.
        assert_eq!(
            classify(&[C, O, C, O, C, O], &glycolyl),
            Substituent::Unrecognized
        );
    }

    #[test]
    fn methyl_groups() {
        assert_eq!(
            classify(&[C, O, C], &[(0, 1), (1, 2)]),
            Substituent::Derivative(DerivativeKind::Methyl { on_nitrogen: false })
        );
        assert_eq!(
            classify(&[C, N, C], &[(0, 1), (1, 2)]),
            Substituent::Derivative(DerivativeKind::Methyl { on_nitrogen: true })
        );
    }

    #[test]
    fn sulfate_and_phosphate() {
        let oxyacid = [(0, 1), (1, 2), (2, 3), (2, 4), (2, 5)];
        assert_eq!(
            classify(&[C, O, S, O, O, O], &oxyacid),
            Substituent::Derivative(DerivativeKind::Sulfate { on_nitrogen: false })
        );
        assert_eq!(
            classify(&[C, N, S, O, O, O], &oxyacid),
            Substituent::Derivative(DerivativeKind::Sulfate { on_nitrogen: true })
        );
        assert_eq!(
            classify(&[C, O, P, O, O, O], &oxyacid),
            Substituent::Derivative(DerivativeKind::Phosphate { on_nitrogen: false })
        );
        // Diester phosphate bridging to a further carbon.
        assert_eq!(
            classify(&[C, O, P, O, O, O, C], &[(0, 1), (1, 2), (2, 3), (2, 4), (2, 5), (5, 6)]),
            Substituent::Unrecognized
        );
    }

    #[test]
    fn bridge_to_another_monosaccharide_is_a_linkage() {
        let topology = graph(&[C, O, C], &[(0, 1), (1, 2)]);
        let molecule = Molecule::new(&topology, 0);
        let backbone = HashMap::from([(0, (0, 4)), (2, (1, 1))]);

        assert_eq!(
            classify_substituent(&molecule, 0, 1, 0, &backbone),
            Substituent::Linkage
        );
        // Same owner: an internal ether, not a linkage.
        assert_eq!(
            classify_substituent(&molecule, 0, 1, 1, &backbone),
            Substituent::Derivative(DerivativeKind::Methyl { on_nitrogen: false })
        );
    }

    #[test]
    fn carboxylate_needs_two_terminal_oxygens() {
        let topology = graph(&[C, C, O, O], &[(0, 1), (1, 2), (1, 3)]);
        let molecule = Molecule::new(&topology, 0);
        assert!(is_carboxylate(&molecule, 1));
        assert!(!is_carboxylate(&molecule, 0));
    }
}
