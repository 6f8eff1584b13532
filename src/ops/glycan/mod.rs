//! Carbohydrate perception on top of a bond graph and its ring set.
//!
//! Each oxygen-containing five- or six-membered ring is tested for an anomeric carbon,
//! walked in canonical order, and annotated with substituent orientations. The resulting
//! chemical code is matched against the [`MonosaccharideDb`] to name the residue. Glycosidic
//! bridges between anomeric substituents and other sugar carbons then assemble the
//! monosaccharides into oligosaccharide trees.

mod classify;
mod derivatives;
mod linkage;

pub use crate::db::{DatabaseError, MonosaccharideDb, MonosaccharideEntry};

use crate::model::{
    atom::Atom,
    glycan::{Monosaccharide, Oligosaccharide},
    ring::RingSet,
    topology::Topology,
    types::{Element, Point},
};
use crate::ops::error::Error;
use crate::ops::report::Report;
use crate::ops::rings::ensure_current;
use std::collections::HashMap;

/// Tunables for glycan perception.
#[derive(Debug, Clone)]
pub struct GlycanRules {
    pub database: MonosaccharideDb,
    /// Normalized triple products within `±tolerance` are treated as degenerate.
    pub orientation_tolerance: f64,
    /// Coordinate model used for orientation.
    pub model_index: usize,
    /// Skip rings made entirely of amino-acid or nucleotide atoms.
    pub skip_polymer_residues: bool,
}

impl GlycanRules {
    /// Default rules with extra `[[monosaccharide]]` records merged over the built-in table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] when the records are malformed or duplicate a known stem.
    pub fn with_extra_entries(content: &str) -> Result<Self, Error> {
        let mut rules = Self::default();
        rules.database.extend_from_toml(content)?;
        Ok(rules)
    }
}

impl Default for GlycanRules {
    fn default() -> Self {
        Self {
            database: MonosaccharideDb::builtin(),
            orientation_tolerance: 0.05,
            model_index: 0,
            skip_polymer_residues: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlycanAnalysis {
    pub monosaccharides: Vec<Monosaccharide>,
    pub oligosaccharides: Vec<Oligosaccharide>,
}

impl GlycanAnalysis {
    /// Condensed sequence of every oligosaccharide, in root order.
    pub fn sequences(&self) -> Vec<String> {
        self.oligosaccharides
            .iter()
            .map(|o| o.sequence(&self.monosaccharides))
            .collect()
    }
}

/// Classifies sugar rings and builds oligosaccharide trees.
///
/// # Arguments
///
/// * `topology` - Bond graph the rings were perceived from.
/// * `rings` - Output of [`perceive_rings`](crate::ops::perceive_rings) for this topology.
/// * `rules` - Reference data and tolerances.
/// * `report` - Sink for ambiguous or malformed findings.
///
/// # Errors
///
/// Returns [`Error::StaleRings`] when bonds changed after the rings were perceived.
pub fn analyze_glycans(
    topology: &Topology,
    rings: &RingSet,
    rules: &GlycanRules,
    report: &mut Report,
) -> Result<GlycanAnalysis, Error> {
    ensure_current(rings, topology)?;
    let molecule = Molecule::new(topology, rules.model_index);

    let ring_atoms: Vec<usize> = rings.iter().flat_map(|r| r.atoms().iter().copied()).collect();
    let mut monosaccharides: Vec<Monosaccharide> = rings
        .iter()
        .filter_map(|ring| classify::classify_ring(&molecule, ring, &ring_atoms, rules, report))
        .collect();

    let backbone: HashMap<usize, (usize, u8)> = monosaccharides
        .iter()
        .enumerate()
        .flat_map(|(idx, mono)| {
            mono.backbone()
                .filter_map(move |atom| mono.carbon_number_of(atom).map(|n| (atom, (idx, n))))
                .collect::<Vec<_>>()
        })
        .collect();

    for idx in 0..monosaccharides.len() {
        let recognized =
            derivatives::assign_derivatives(&molecule, &mut monosaccharides[idx], idx, &backbone, report);
        monosaccharides[idx].name =
            classify::name_monosaccharide(&monosaccharides[idx], recognized, rules, report);
    }

    let linkages = linkage::find_linkages(&molecule, &monosaccharides, &backbone);
    let oligosaccharides = linkage::build_trees(&molecule, &monosaccharides, &linkages, report);

    log::info!(
        "Classified {} monosaccharides into {} oligosaccharides",
        monosaccharides.len(),
        oligosaccharides.len()
    );

    Ok(GlycanAnalysis {
        monosaccharides,
        oligosaccharides,
    })
}

/// Read-only view over the topology with atoms flattened for indexed access.
pub(crate) struct Molecule<'a> {
    topology: &'a Topology,
    atoms: Vec<&'a Atom>,
    model_index: usize,
}

impl<'a> Molecule<'a> {
    pub(crate) fn new(topology: &'a Topology, model_index: usize) -> Self {
        Self {
            topology,
            atoms: topology.atoms(),
            model_index,
        }
    }

    fn element(&self, idx: usize) -> Element {
        self.atoms[idx].element
    }

    fn atom(&self, idx: usize) -> &Atom {
        self.atoms[idx]
    }

    fn position(&self, idx: usize) -> Option<&Point> {
        self.atoms[idx].position(self.model_index)
    }

    fn heavy_neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.topology
            .neighbors(idx)
            .iter()
            .copied()
            .filter(|&n| self.atoms[n].element.is_heavy_atom())
    }

    fn topology(&self) -> &Topology {
        self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::glycan::{Anomer, Configuration, DerivativeKind, Orientation, Terminal};
    use crate::ops::config::PerceptionConfig;
    use crate::ops::report::{Issue, IssueCategory};
    use crate::ops::rings::perceive_rings;
    use crate::ops::testing::{Piece, assemble, graph, ring_sugar};
    use crate::model::types::BondOrder;

    fn analyze(topology: &Topology) -> (GlycanAnalysis, Report) {
        let mut report = Report::new();
        let rings = perceive_rings(topology, &PerceptionConfig::default(), &mut report);
        let analysis =
            analyze_glycans(topology, &rings, &GlycanRules::default(), &mut report).unwrap();
        (analysis, report)
    }

    fn glucose(up_anomer: bool) -> Piece {
        ring_sugar("GLC", 1, 6, &[up_anomer, false, true, false, true], true)
    }

    #[test]
    fn beta_glucopyranose_is_named_from_ideal_geometry() {
        let topology = assemble(vec![glucose(true)], &[]);
        let (analysis, report) = analyze(&topology);

        assert_eq!(analysis.monosaccharides.len(), 1);
        let mono = &analysis.monosaccharides[0];
        assert_eq!(topology.atom(mono.anomeric_carbon).name, "C1");
        assert_eq!(topology.atom(mono.ring_oxygen).name, "O5");
        assert_eq!(mono.code.to_string(), "P^{a}_{2}^{3}_{4}^{+1}");
        let name = mono.name.as_ref().unwrap();
        assert_eq!(name.anomer, Anomer::Beta);
        assert_eq!(name.configuration, Configuration::D);
        assert_eq!(name.to_string(), "β-D-Glcp");
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn alpha_anomer_points_down() {
        let topology = assemble(vec![glucose(false)], &[]);
        let (analysis, _) = analyze(&topology);

        let mono = &analysis.monosaccharides[0];
        assert_eq!(mono.code.orientation("a"), Some(Orientation::Down));
        assert_eq!(mono.display_name(), "α-D-Glcp");
    }

    #[test]
    fn canonical_order_starts_at_anomeric_carbon_and_ends_at_ring_oxygen() {
        let topology = assemble(vec![glucose(true)], &[]);
        let (analysis, _) = analyze(&topology);

        let names: Vec<&str> = analysis.monosaccharides[0]
            .ring
            .atoms()
            .iter()
            .map(|&i| topology.atom(i).name.as_str())
            .collect();
        assert_eq!(names, vec!["C1", "C2", "C3", "C4", "C5", "O5"]);
    }

    #[test]
    fn alpha_l_fucose_is_found_through_the_mirror_key() {
        let fucose = ring_sugar("FUC", 1, 6, &[true, true, false, false, false], false);
        let topology = assemble(vec![fucose], &[]);
        let (analysis, _) = analyze(&topology);

        let mono = &analysis.monosaccharides[0];
        assert_eq!(mono.deoxy, vec!["+1"]);
        assert_eq!(mono.display_name(), "α-L-Fucp");
    }

    #[test]
    fn furanose_ring_is_named() {
        let ribose = ring_sugar("RIB", 1, 5, &[true, false, false, true], true);
        let topology = assemble(vec![ribose], &[]);
        let (analysis, _) = analyze(&topology);

        assert_eq!(analysis.monosaccharides[0].display_name(), "β-D-Ribf");
    }

    #[test]
    fn n_acetyl_glucosamine_gets_its_derivative() {
        let glcnac = glucose(true).with_n_acetyl(2);
        let topology = assemble(vec![glcnac], &[]);
        let (analysis, report) = analyze(&topology);

        assert_eq!(analysis.monosaccharides[0].display_name(), "β-D-GlcpNAc");
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn glucuronic_acid_drops_its_terminal_locant() {
        let glca = glucose(true).with_group("C6", Element::O, 0);
        let topology = assemble(vec![glca], &[]);
        let (analysis, report) = analyze(&topology);

        let name = analysis.monosaccharides[0].name.as_ref().unwrap();
        assert_eq!(name.derivatives[0].kind, DerivativeKind::Carboxylate);
        assert_eq!(name.to_string(), "β-D-GlcpA");
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn mannose_6_phosphate_keeps_its_locant() {
        let mannose = ring_sugar("MAN", 1, 6, &[false, true, true, false, true], true)
            .with_group("O6", Element::P, 3);
        let topology = assemble(vec![mannose], &[]);
        let (analysis, report) = analyze(&topology);

        assert_eq!(analysis.monosaccharides[0].display_name(), "α-D-Manp6P");
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn nitrogen_bound_groups_at_c2_are_named_without_locant() {
        let glcns = glucose(true).with_nitrogen(2).with_group("N2", Element::S, 3);
        let glcnme = glucose(true).with_nitrogen(2).with_group("N2", Element::C, 0);
        let glcn = glucose(true).with_nitrogen(2);

        for (piece, expected) in [
            (glcns, "β-D-GlcpNS"),
            (glcnme, "β-D-GlcpNMe"),
            (glcn, "β-D-GlcpN"),
        ] {
            let topology = assemble(vec![piece], &[]);
            let (analysis, report) = analyze(&topology);
            assert_eq!(analysis.monosaccharides[0].display_name(), expected);
            assert!(report.is_empty(), "{report}");
        }
    }

    #[test]
    fn o_sulfate_and_o_methyl_carry_their_locants() {
        let sulfated = glucose(true).with_group("O6", Element::S, 3);
        let methylated = glucose(true).with_group("O3", Element::C, 0);

        let topology = assemble(vec![sulfated], &[]);
        assert_eq!(analyze(&topology).0.monosaccharides[0].display_name(), "β-D-Glcp6S");
        let topology = assemble(vec![methylated], &[]);
        assert_eq!(analyze(&topology).0.monosaccharides[0].display_name(), "β-D-Glcp3Me");
    }

    #[test]
    fn disaccharide_forms_a_linked_tree() {
        let mut galactose = ring_sugar("GAL", 2, 6, &[true, false, true, true, true], true);
        galactose.detach("O1");
        let glcnac = glucose(true).with_n_acetyl(2).shifted(12.0);
        let topology = assemble(vec![galactose, glcnac], &[((0, "C1"), (1, "O4"))]);

        let (analysis, report) = analyze(&topology);

        assert_eq!(analysis.monosaccharides.len(), 2);
        assert_eq!(analysis.oligosaccharides.len(), 1);
        let tree = &analysis.oligosaccharides[0];
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.terminal, Terminal::Free);
        assert_eq!(tree.linkages.len(), 1);
        assert_eq!(
            analysis.sequences(),
            vec!["β-D-Galp(1-4)β-D-GlcpNAc-OH".to_string()]
        );
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn anomeric_to_anomeric_link_leaves_the_reducing_end_free() {
        let first = glucose(true);
        let mut second = glucose(true).shifted(12.0);
        second.detach("O1");
        let topology = assemble(vec![first, second], &[((0, "O1"), (1, "C1"))]);

        let (analysis, _) = analyze(&topology);

        assert_eq!(analysis.monosaccharides.len(), 2);
        assert_eq!(analysis.oligosaccharides.len(), 1);
        let tree = &analysis.oligosaccharides[0];
        assert_eq!(tree.terminal, Terminal::Free);
        assert_eq!(tree.linkages.len(), 1);
        assert_eq!(tree.linkages[0].to_string(), "(1-1)");
        let sequence = &analysis.sequences()[0];
        assert!(sequence.starts_with("β-D-Glcp(1-1)"), "{sequence}");
        assert!(sequence.ends_with("-D-Glcp-OH"), "{sequence}");
    }

    #[test]
    fn cyclic_linkages_terminate_and_are_reported() {
        use Element::*;
        // Three furanoid rings; each anomeric oxygen bridges to the next ring's C3.
        let mut elements = Vec::new();
        let mut bonds = Vec::new();
        for r in 0..3 {
            let base = r * 6;
            elements.extend([C, C, C, C, O, O]);
            bonds.extend([
                (base, base + 1),
                (base + 1, base + 2),
                (base + 2, base + 3),
                (base + 3, base + 4),
                (base + 4, base),
                (base, base + 5),
            ]);
        }
        bonds.extend([(5, 8), (11, 14), (17, 2)]);
        let topology = graph(&elements, &bonds);

        let mut report = Report::new();
        let config = PerceptionConfig::default();
        let rings = perceive_rings(&topology, &config, &mut report);
        let analysis =
            analyze_glycans(&topology, &rings, &GlycanRules::default(), &mut report).unwrap();

        assert_eq!(analysis.monosaccharides.len(), 3);
        assert_eq!(analysis.oligosaccharides.len(), 1);
        assert!(analysis.oligosaccharides[0].truncated);
        assert_eq!(analysis.oligosaccharides[0].len(), 3);
        assert!(
            report
                .issues()
                .iter()
                .any(|i| matches!(i, Issue::CyclicLinkage { .. }))
        );
        assert!(report.count(IssueCategory::MalformedTopology) >= 1);
    }

    #[test]
    fn stale_rings_are_rejected() {
        let mut topology = assemble(vec![glucose(true)], &[]);
        let mut report = Report::new();
        let rings = perceive_rings(&topology, &PerceptionConfig::default(), &mut report);
        topology.add_bond(6, 7, BondOrder::Single);

        let result = analyze_glycans(&topology, &rings, &GlycanRules::default(), &mut report);
        assert!(matches!(result, Err(Error::StaleRings { .. })));
    }

    #[test]
    fn extra_database_entries_merge_or_fail_typed() {
        let base = MonosaccharideDb::builtin().len();
        let rules = GlycanRules::with_extra_entries(
            "[[monosaccharide]]\nstem = \"Xyz\"\ncode = \"P^{2}^{3}^{4}\"\n",
        )
        .unwrap();
        assert_eq!(rules.database.len(), base + 1);

        let duplicate = GlycanRules::with_extra_entries(
            "[[monosaccharide]]\nstem = \"Glc\"\ncode = \"P_{2}^{3}_{4}^{+1}\"\n",
        );
        assert!(matches!(
            duplicate,
            Err(Error::Database(DatabaseError::Duplicate { .. }))
        ));
    }

    #[test]
    fn non_sugar_rings_are_ignored() {
        use Element::*;
        // Pyrrolidine: no ring oxygen.
        let topology = graph(&[N, C, C, C, C], &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]);
        let (analysis, report) = analyze(&topology);

        assert!(analysis.monosaccharides.is_empty());
        assert!(report.is_empty());
    }
}
