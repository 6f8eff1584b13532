use super::{GlycanRules, Molecule};
use crate::model::glycan::{
    ANOMERIC_LABEL, Anomer, ChainCarbon, ChemicalCode, Configuration, KETOSE_CARBON_LABEL,
    Monosaccharide, Orientation, RingForm, RingPosition, SugarName,
};
use crate::model::ring::Ring;
use crate::model::types::Element;
use crate::ops::report::{Issue, Report};
use smol_str::SmolStr;

/// Builds the monosaccharide skeleton for a ring, or `None` when it is not a sugar ring.
pub(super) fn classify_ring(
    molecule: &Molecule,
    ring: &Ring,
    ring_atoms: &[usize],
    rules: &GlycanRules,
    report: &mut Report,
) -> Option<Monosaccharide> {
    let form = RingForm::from_size(ring.len())?;
    let topology = molecule.topology();

    if rules.skip_polymer_residues
        && ring
            .atoms()
            .iter()
            .all(|&a| topology.residue_of(a).kind.is_polymer())
    {
        return None;
    }
    if ring
        .atoms()
        .iter()
        .any(|&a| !matches!(molecule.element(a), Element::C | Element::O))
    {
        return None;
    }
    let oxygens: Vec<usize> = ring
        .atoms()
        .iter()
        .copied()
        .filter(|&a| molecule.element(a) == Element::O)
        .collect();
    let [ring_oxygen] = oxygens[..] else {
        log::debug!("Ring {} has {} ring oxygens; skipping", ring.key(), oxygens.len());
        return None;
    };

    let anomeric = find_anomeric_carbon(molecule, ring, ring_oxygen, ring_atoms, report)?;
    let (before, after) = ring.flanking(anomeric)?;
    let next = if before == ring_oxygen { after } else { before };
    let ordered = ring.reordered(anomeric, next)?;

    let carbons = &ordered.atoms()[..ordered.len() - 1];
    let ketose = exocyclic(molecule, &ordered, anomeric)
        .any(|a| molecule.element(a) == Element::C);
    let offset = u8::from(ketose);
    let tolerance = rules.orientation_tolerance;
    let mut code = ChemicalCode::new(form);
    let mut positions = Vec::with_capacity(carbons.len());
    let mut chain = Vec::new();
    let mut deoxy = Vec::new();

    for (k, &carbon) in carbons.iter().enumerate() {
        let carbon_number = k as u8 + 1 + offset;
        let (prev, next) = ordered.flanking(carbon)?;
        let (label, substituent) = if k == 0 {
            (SmolStr::new(ANOMERIC_LABEL), pick_heteroatom(molecule, &ordered, carbon))
        } else if k + 1 == carbons.len() {
            (SmolStr::new("+1"), pick_carbon(molecule, &ordered, carbon, &[]))
        } else {
            let hetero = pick_heteroatom(molecule, &ordered, carbon);
            let label = SmolStr::new((k + 1).to_string());
            let substituent = hetero.or_else(|| pick_carbon(molecule, &ordered, carbon, &[]));
            if substituent.is_none() {
                deoxy.push(label.clone());
            }
            (label, substituent)
        };

        let orientation = substituent.map(|s| orient(molecule, prev, carbon, next, s, tolerance));
        if let Some(orientation) = orientation {
            code.push(&label, orientation);
            if k == 0 && ketose {
                if let Some(c1) = pick_carbon(molecule, &ordered, carbon, &[]) {
                    code.push(
                        KETOSE_CARBON_LABEL,
                        orient(molecule, prev, carbon, next, c1, tolerance),
                    );
                    chain.push(ChainCarbon {
                        label: SmolStr::new(KETOSE_CARBON_LABEL),
                        atom: c1,
                        carbon_number: 1,
                        orientation: None,
                    });
                }
            }
        }

        positions.push(RingPosition {
            label: label.clone(),
            carbon,
            carbon_number,
            substituent,
            orientation,
        });

        if k + 1 == carbons.len() {
            if let Some(first) = substituent {
                walk_chain(
                    molecule,
                    &ordered,
                    carbon,
                    first,
                    carbon_number,
                    tolerance,
                    &mut chain,
                    &mut deoxy,
                );
            }
        }
    }

    for (label, orientation) in &code.entries {
        if *orientation == Orientation::Ambiguous {
            report.push(Issue::AmbiguousOrientation {
                ring: ring.key().to_string(),
                label: label.to_string(),
            });
        }
    }
    deoxy.sort();

    let residue = topology.residue_of(anomeric);
    Some(Monosaccharide {
        ring: ordered,
        residue_name: residue.name.clone(),
        residue_id: residue.id,
        chain_id: residue.chain_id.clone(),
        anomeric_carbon: anomeric,
        ring_oxygen,
        ketose,
        positions,
        chain,
        code,
        deoxy,
        derivatives: Vec::new(),
        name: None,
    })
}

/// Looks the stereo key up and assembles the trivial name.
pub(super) fn name_monosaccharide(
    mono: &Monosaccharide,
    recognized: bool,
    rules: &GlycanRules,
    report: &mut Report,
) -> Option<SugarName> {
    if mono.code.is_ambiguous() {
        return None;
    }
    let anomeric = mono.code.orientation(ANOMERIC_LABEL)?;

    let key = mono.code.stereo_key();
    let Some((entry, configuration)) = rules.database.identify(&key, mono.ketose, &mono.deoxy)
    else {
        report.push(Issue::UnknownStereoCode {
            ring: mono.ring.key().to_string(),
            code: mono.code.to_string(),
        });
        return None;
    };
    if !recognized {
        return None;
    }

    let flipped = configuration == Configuration::L;
    let anomer = if (anomeric == Orientation::Up) != flipped {
        Anomer::Beta
    } else {
        Anomer::Alpha
    };
    let terminal_carbon = mono
        .positions
        .iter()
        .map(|p| p.carbon_number)
        .chain(mono.chain.iter().map(|c| c.carbon_number))
        .max()
        .unwrap_or(0);

    Some(SugarName {
        anomer,
        configuration,
        stem: entry.stem.clone(),
        form: mono.code.form,
        derivatives: mono.derivatives.clone(),
        terminal_carbon,
    })
}

/// Ring carbon next to the ring oxygen that carries an exocyclic O or N.
///
/// When both flanking carbons qualify, the one whose heteroatom bridges to another ring wins.
fn find_anomeric_carbon(
    molecule: &Molecule,
    ring: &Ring,
    ring_oxygen: usize,
    ring_atoms: &[usize],
    report: &mut Report,
) -> Option<usize> {
    let (a, b) = ring.flanking(ring_oxygen)?;
    let candidates: Vec<usize> = [a, b]
        .into_iter()
        .filter(|&c| molecule.element(c) == Element::C)
        .filter(|&c| {
            exocyclic(molecule, ring, c).any(|x| matches!(molecule.element(x), Element::O | Element::N))
        })
        .collect();

    match candidates[..] {
        [] => {
            report.push(Issue::NoAnomericCarbon {
                ring: ring.key().to_string(),
            });
            None
        }
        [only] => Some(only),
        _ => {
            let glycosidic: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&c| {
                    exocyclic(molecule, ring, c).any(|x| {
                        molecule.element(x).is_heteroatom()
                            && molecule
                                .heavy_neighbors(x)
                                .any(|y| y != c && ring_atoms.contains(&y) && !ring.contains(y))
                    })
                })
                .collect();
            match glycosidic[..] {
                [only] => Some(only),
                _ => {
                    report.push(Issue::AmbiguousAnomericCarbon {
                        ring: ring.key().to_string(),
                    });
                    None
                }
            }
        }
    }
}

fn exocyclic<'a>(
    molecule: &'a Molecule,
    ring: &'a Ring,
    atom: usize,
) -> impl Iterator<Item = usize> + 'a {
    molecule
        .heavy_neighbors(atom)
        .filter(move |&n| !ring.contains(n))
}

/// Exocyclic heteroatom of a ring carbon, preferring oxygen, then nitrogen, then lowest index.
fn pick_heteroatom(molecule: &Molecule, ring: &Ring, atom: usize) -> Option<usize> {
    exocyclic(molecule, ring, atom)
        .filter(|&x| molecule.element(x).is_heteroatom())
        .min_by_key(|&x| {
            let rank = match molecule.element(x) {
                Element::O => 0,
                Element::N => 1,
                _ => 2,
            };
            (rank, x)
        })
}

fn pick_carbon(molecule: &Molecule, ring: &Ring, atom: usize, exclude: &[usize]) -> Option<usize> {
    exocyclic(molecule, ring, atom)
        .filter(|&x| molecule.element(x) == Element::C && !exclude.contains(&x))
        .min()
}

/// Sign of the normalized triple product `((p - c) x (n - c)) . (s - c)`.
fn orient(
    molecule: &Molecule,
    prev: usize,
    center: usize,
    next: usize,
    substituent: usize,
    tolerance: f64,
) -> Orientation {
    let (Some(p), Some(c), Some(n), Some(s)) = (
        molecule.position(prev),
        molecule.position(center),
        molecule.position(next),
        molecule.position(substituent),
    ) else {
        return Orientation::Ambiguous;
    };

    let u = p - c;
    let w = n - c;
    let v = s - c;
    let denominator = u.norm() * w.norm() * v.norm();
    if denominator < 1e-9 {
        return Orientation::Ambiguous;
    }

    let value = u.cross(&w).dot(&v) / denominator;
    if value > tolerance {
        Orientation::Up
    } else if value < -tolerance {
        Orientation::Down
    } else {
        Orientation::Ambiguous
    }
}

/// Follows exocyclic backbone carbons beyond the last ring carbon.
#[allow(clippy::too_many_arguments)]
fn walk_chain(
    molecule: &Molecule,
    ring: &Ring,
    ring_carbon: usize,
    first: usize,
    ring_carbon_number: u8,
    tolerance: f64,
    chain: &mut Vec<ChainCarbon>,
    deoxy: &mut Vec<SmolStr>,
) {
    let mut visited = vec![ring_carbon];
    let mut prev = ring_carbon;
    let mut current = first;
    let mut step = 1u8;

    loop {
        visited.push(current);
        let next = pick_carbon(molecule, ring, current, &visited);
        let hetero = pick_heteroatom(molecule, ring, current);
        let label = SmolStr::new(format!("+{step}"));

        let orientation = match (next, hetero) {
            (Some(n), Some(h)) => Some(orient(molecule, prev, current, n, h, tolerance)),
            _ => None,
        };
        chain.push(ChainCarbon {
            label: label.clone(),
            atom: current,
            carbon_number: ring_carbon_number + step,
            orientation,
        });

        match next {
            Some(n) if step < 8 => {
                prev = current;
                current = n;
                step += 1;
            }
            _ => {
                if hetero.is_none() {
                    deoxy.push(label);
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Element::*;
    use crate::ops::testing::{assemble, graph, ring_sugar};

    fn rules() -> GlycanRules {
        GlycanRules::default()
    }

    #[test]
    fn orientation_within_tolerance_is_ambiguous() {
        let piece = ring_sugar("GLC", 1, 6, &[true, false, true, false, true], true);
        let topology = assemble(vec![piece], &[]);
        let molecule = Molecule::new(&topology, 0);

        // O1 (6) sits above C1 (0) between O5 (5) and C2 (1).
        assert_eq!(orient(&molecule, 5, 0, 1, 6, 0.05), Orientation::Up);
        assert_eq!(orient(&molecule, 1, 0, 5, 6, 0.05), Orientation::Down);
        assert_eq!(orient(&molecule, 5, 0, 1, 6, 0.99), Orientation::Ambiguous);
        // Ring atoms are coplanar.
        assert_eq!(orient(&molecule, 5, 0, 1, 2, 0.05), Orientation::Ambiguous);
    }

    #[test]
    fn anomeric_carbon_is_the_ring_oxygen_neighbor_with_exocyclic_oxygen() {
        // C1..C5, O5, O1 on C1, C6 on C5.
        let topology = graph(
            &[C, C, C, C, C, O, O, C],
            &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 6), (4, 7)],
        );
        let ring = Ring::new(vec![0, 1, 2, 3, 4, 5]);
        let molecule = Molecule::new(&topology, 0);
        let mut report = Report::new();

        let anomeric = find_anomeric_carbon(&molecule, &ring, 5, ring.atoms(), &mut report);

        assert_eq!(anomeric, Some(0));
        assert!(report.is_empty());
    }

    #[test]
    fn two_candidates_without_glycosidic_bridge_are_ambiguous() {
        let topology = graph(
            &[C, C, C, C, C, O, O, O],
            &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 6), (4, 7)],
        );
        let ring = Ring::new(vec![0, 1, 2, 3, 4, 5]);
        let molecule = Molecule::new(&topology, 0);
        let mut report = Report::new();

        let anomeric = find_anomeric_carbon(&molecule, &ring, 5, ring.atoms(), &mut report);

        assert_eq!(anomeric, None);
        assert!(matches!(
            report.issues(),
            [Issue::AmbiguousAnomericCarbon { .. }]
        ));
    }

    #[test]
    fn glycosidic_bridge_breaks_anomeric_tie() {
        // Ring A (0-5) with O6 on C0 and O7 on C4; O6 also bonds to ring B carbon 10.
        let topology = graph(
            &[C, C, C, C, C, O, O, O, C, C, C, C, O],
            &[
                (0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 6), (4, 7),
                (8, 9), (9, 10), (10, 11), (11, 12), (12, 8), (6, 10),
            ],
        );
        let ring = Ring::new(vec![0, 1, 2, 3, 4, 5]);
        let all: Vec<usize> = (0..6).chain(8..13).collect();
        let molecule = Molecule::new(&topology, 0);
        let mut report = Report::new();

        let anomeric = find_anomeric_carbon(&molecule, &ring, 5, &all, &mut report);

        assert_eq!(anomeric, Some(0));
    }

    #[test]
    fn missing_anomeric_carbon_is_reported() {
        // Tetrahydropyran without substituents.
        let topology = graph(
            &[C, C, C, C, C, O],
            &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0)],
        );
        let ring = Ring::new(vec![0, 1, 2, 3, 4, 5]);
        let molecule = Molecule::new(&topology, 0);
        let mut report = Report::new();

        let mono = classify_ring(&molecule, &ring, ring.atoms(), &rules(), &mut report);

        assert!(mono.is_none());
        assert!(matches!(report.issues(), [Issue::NoAnomericCarbon { .. }]));
    }

    #[test]
    fn positions_carry_labels_and_carbon_numbers() {
        let piece = ring_sugar("GLC", 1, 6, &[true, false, true, false, true], true);
        let topology = assemble(vec![piece], &[]);
        let molecule = Molecule::new(&topology, 0);
        let ring = Ring::new(vec![0, 1, 2, 3, 4, 5]);
        let mut report = Report::new();

        let mono = classify_ring(&molecule, &ring, ring.atoms(), &rules(), &mut report).unwrap();

        let labels: Vec<(&str, u8)> = mono
            .positions
            .iter()
            .map(|p| (p.label.as_str(), p.carbon_number))
            .collect();
        assert_eq!(
            labels,
            vec![("a", 1), ("2", 2), ("3", 3), ("4", 4), ("+1", 5)]
        );
        assert!(!mono.ketose);
        assert_eq!(mono.chain.len(), 1);
        assert_eq!(mono.chain[0].carbon_number, 6);
        assert_eq!(mono.carbon_number_of(10), Some(6));
        assert!(mono.deoxy.is_empty());
    }

    #[test]
    fn deoxy_ring_position_is_left_out_of_the_code() {
        // 2-deoxy ribofuranose: no substituent on C2.
        let mut piece = ring_sugar("DRB", 1, 5, &[true, false, false, true], true);
        piece.detach("O2");
        let topology = assemble(vec![piece], &[]);
        let molecule = Molecule::new(&topology, 0);
        let ring = Ring::new(vec![0, 1, 2, 3, 4]);
        let mut report = Report::new();

        let mono = classify_ring(&molecule, &ring, ring.atoms(), &rules(), &mut report).unwrap();
        let name = name_monosaccharide(&mono, true, &rules(), &mut report).unwrap();

        assert_eq!(mono.deoxy, vec!["2"]);
        assert_eq!(mono.code.to_string(), "F^{a}_{3}^{+1}");
        assert_eq!(name.to_string(), "β-D-dRibf");
    }

    #[test]
    fn unknown_stereo_code_is_reported() {
        let mut piece = ring_sugar("UNK", 1, 6, &[true, false, true, false, true], true);
        piece.detach("O3");
        piece.detach("O4");
        let topology = assemble(vec![piece], &[]);
        let molecule = Molecule::new(&topology, 0);
        let ring = Ring::new(vec![0, 1, 2, 3, 4, 5]);
        let mut report = Report::new();

        let mono = classify_ring(&molecule, &ring, ring.atoms(), &rules(), &mut report).unwrap();
        let name = name_monosaccharide(&mono, true, &rules(), &mut report);

        assert!(name.is_none());
        assert!(matches!(report.issues(), [Issue::UnknownStereoCode { .. }]));
    }
}
