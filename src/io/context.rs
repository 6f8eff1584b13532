use crate::model::types::ResidueKind;
use std::collections::HashMap;

/// Residue-name lookup that readers use to classify residues.
///
/// Names are matched exactly and case-sensitively. Anything unregistered is an ion when it
/// holds a single heavy atom and a generic hetero residue otherwise, which is where
/// carbohydrate residues land.
#[derive(Debug, Clone)]
pub struct IoContext {
    kinds: HashMap<String, ResidueKind>,
}

impl IoContext {
    pub fn new_default() -> Self {
        let mut kinds = HashMap::new();

        macro_rules! register {
            ($kind:expr; $($name:literal),* $(,)?) => {
                $(kinds.insert($name.to_string(), $kind);)*
            };
        }

        register!(ResidueKind::AminoAcid;
            "ALA", "ARG", "ARN", "ASN", "ASP", "ASH", "CYS", "CYM", "CYX", "GLN", "GLU", "GLH",
            "GLY", "HIS", "HID", "HIE", "HIP", "ILE", "LEU", "LYS", "LYN", "MET", "PHE", "PRO",
            "SER", "THR", "TRP", "TYR", "TYM", "VAL", "ACE", "NME",
        );
        register!(ResidueKind::Nucleotide;
            "DA", "DC", "DG", "DT", "DI", "A", "C", "G", "U", "I",
            "DA5", "DA3", "DC5", "DC3", "DG5", "DG3", "DT5", "DT3",
            "A5", "A3", "C5", "C3", "G5", "G3", "U5", "U3",
        );
        register!(ResidueKind::Hetero; "ROH", "OME", "TBT", "NLN");
        register!(ResidueKind::Water; "HOH", "WAT", "SOL", "TIP3", "TIP4", "SPC", "DOD");
        register!(ResidueKind::Ion;
            "NA", "K", "CL", "MG", "CA", "ZN", "FE", "MN", "CU", "CO", "NI", "CD", "LI", "RB",
            "CS", "BR", "IOD", "Na+", "K+", "Cl-",
        );

        Self { kinds }
    }

    /// Registers or overrides the kind of a residue name.
    pub fn register(&mut self, name: impl Into<String>, kind: ResidueKind) {
        self.kinds.insert(name.into(), kind);
    }

    pub fn known_kind(&self, name: &str) -> Option<ResidueKind> {
        self.kinds.get(name).copied()
    }

    /// Kind of a residue given its name and number of heavy atoms.
    pub fn classify_residue(&self, name: &str, heavy_atoms: usize) -> ResidueKind {
        match self.known_kind(name) {
            Some(kind) => kind,
            None if heavy_atoms == 1 => ResidueKind::Ion,
            None => ResidueKind::Hetero,
        }
    }
}

impl Default for IoContext {
    fn default() -> Self {
        Self::new_default()
    }
}
