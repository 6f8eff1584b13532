use super::Molecule;
use crate::model::glycan::{Linkage, Monosaccharide, Oligosaccharide, Terminal};
use crate::ops::report::{Issue, Report};
use std::collections::{HashMap, HashSet};

/// Glycosidic bonds from each anomeric substituent to a backbone carbon of another residue.
///
/// When two anomeric carbons share one bridge (sucrose-like), only the first direction is kept.
pub(super) fn find_linkages(
    molecule: &Molecule,
    monosaccharides: &[Monosaccharide],
    backbone: &HashMap<usize, (usize, u8)>,
) -> Vec<Linkage> {
    let mut linkages: Vec<Linkage> = Vec::new();

    for (child, mono) in monosaccharides.iter().enumerate() {
        let Some(bridge) = mono.positions.first().and_then(|p| p.substituent) else {
            continue;
        };

        for neighbor in molecule.heavy_neighbors(bridge) {
            if neighbor == mono.anomeric_carbon {
                continue;
            }
            let Some(&(parent, parent_carbon)) = backbone.get(&neighbor) else {
                continue;
            };
            if parent == child {
                continue;
            }
            let reverse = linkages
                .iter()
                .any(|l| l.child == parent && l.parent == child && l.bridge == bridge);
            if reverse {
                log::debug!(
                    "Skipping reverse glycosidic bond {} -> {} through shared bridge",
                    child,
                    parent
                );
                continue;
            }

            linkages.push(Linkage {
                child,
                parent,
                child_carbon: mono.anomeric_number(),
                parent_carbon,
                bridge,
            });
            break;
        }
    }

    linkages
}

/// Groups linked monosaccharides into trees rooted at their reducing ends.
///
/// Residues without a parent are roots. Residues left over after growing those trees lie on
/// glycosidic cycles; each such cycle is opened at its lowest index and reported.
pub(super) fn build_trees(
    molecule: &Molecule,
    monosaccharides: &[Monosaccharide],
    linkages: &[Linkage],
    report: &mut Report,
) -> Vec<Oligosaccharide> {
    let sugar_atoms: HashSet<usize> = monosaccharides
        .iter()
        .flat_map(|m| m.ring.atoms().iter().copied().chain(m.backbone()))
        .collect();
    let children_of = |node: usize| {
        let mut children: Vec<&Linkage> = linkages.iter().filter(|l| l.parent == node).collect();
        children.sort_by_key(|l| (l.parent_carbon, l.child));
        children
    };
    let has_parent: HashSet<usize> = linkages.iter().map(|l| l.child).collect();

    let mut assigned = vec![false; monosaccharides.len()];
    let mut trees = Vec::new();
    let roots: Vec<usize> = (0..monosaccharides.len())
        .filter(|i| !has_parent.contains(i))
        .collect();

    let grow = |root: usize, assigned: &mut [bool], report: &mut Report| {
        let mut members = Vec::new();
        let mut tree_linkages = Vec::new();
        let mut truncated = false;
        let mut stack = vec![root];
        assigned[root] = true;

        while let Some(node) = stack.pop() {
            members.push(node);
            for linkage in children_of(node).into_iter().rev() {
                if assigned[linkage.child] {
                    truncated = true;
                    report.push(Issue::CyclicLinkage {
                        ring: monosaccharides[linkage.child].ring.key().to_string(),
                    });
                    continue;
                }
                assigned[linkage.child] = true;
                tree_linkages.push(*linkage);
                stack.push(linkage.child);
            }
        }

        Oligosaccharide {
            root,
            members,
            linkages: tree_linkages,
            terminal: terminal_of(molecule, &monosaccharides[root], &sugar_atoms),
            truncated,
        }
    };

    for &root in &roots {
        trees.push(grow(root, &mut assigned, report));
    }
    while let Some(start) = assigned.iter().position(|&done| !done) {
        trees.push(grow(start, &mut assigned, report));
    }

    trees
}

/// What the root's anomeric substituent is attached to besides the sugar itself.
///
/// A substituent bridging into another monosaccharide (anomeric-to-anomeric links) leaves the
/// reducing end free.
fn terminal_of(
    molecule: &Molecule,
    root: &Monosaccharide,
    sugar_atoms: &HashSet<usize>,
) -> Terminal {
    let Some(hetero) = root.positions.first().and_then(|p| p.substituent) else {
        return Terminal::Free;
    };
    let others: Vec<usize> = molecule
        .heavy_neighbors(hetero)
        .filter(|&n| n != root.anomeric_carbon)
        .collect();
    let Some(&first) = others.first() else {
        return Terminal::Free;
    };
    if sugar_atoms.contains(&hetero) || others.iter().any(|n| sugar_atoms.contains(n)) {
        return Terminal::Free;
    }

    let topology = molecule.topology();
    let sugar_residue = topology.residue_index_of(root.anomeric_carbon);
    let owner = if topology.residue_index_of(hetero) != sugar_residue {
        hetero
    } else {
        first
    };
    let residue = topology.residue_of(owner);
    Terminal::Aglycone {
        residue: residue.name.clone(),
        residue_id: residue.id,
    }
}
