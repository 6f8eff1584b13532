use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;

pub type Point = Point3<f64>;

macro_rules! elements {
    ($($variant:ident = $number:literal, $symbol:literal, $mass:literal;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Element {
            Unknown = 0,
            $($variant = $number,)*
        }

        impl Element {
            const ALL: &'static [Element] = &[$(Element::$variant,)*];

            pub fn symbol(&self) -> &'static str {
                match self {
                    Element::Unknown => "X",
                    $(Element::$variant => $symbol,)*
                }
            }

            pub fn atomic_mass(&self) -> f64 {
                match self {
                    Element::Unknown => 0.0,
                    $(Element::$variant => $mass,)*
                }
            }
        }
    };
}

elements! {
    H = 1, "H", 1.008;
    He = 2, "He", 4.0026;
    Li = 3, "Li", 6.94;
    Be = 4, "Be", 9.0122;
    B = 5, "B", 10.81;
    C = 6, "C", 12.011;
    N = 7, "N", 14.007;
    O = 8, "O", 15.999;
    F = 9, "F", 18.998;
    Ne = 10, "Ne", 20.180;
    Na = 11, "Na", 22.990;
    Mg = 12, "Mg", 24.305;
    Al = 13, "Al", 26.982;
    Si = 14, "Si", 28.085;
    P = 15, "P", 30.974;
    S = 16, "S", 32.06;
    Cl = 17, "Cl", 35.45;
    Ar = 18, "Ar", 39.948;
    K = 19, "K", 39.098;
    Ca = 20, "Ca", 40.078;
    Sc = 21, "Sc", 44.956;
    Ti = 22, "Ti", 47.867;
    V = 23, "V", 50.942;
    Cr = 24, "Cr", 51.996;
    Mn = 25, "Mn", 54.938;
    Fe = 26, "Fe", 55.845;
    Co = 27, "Co", 58.933;
    Ni = 28, "Ni", 58.693;
    Cu = 29, "Cu", 63.546;
    Zn = 30, "Zn", 65.38;
    Ga = 31, "Ga", 69.723;
    Ge = 32, "Ge", 72.630;
    As = 33, "As", 74.922;
    Se = 34, "Se", 78.971;
    Br = 35, "Br", 79.904;
    Kr = 36, "Kr", 83.798;
    Rb = 37, "Rb", 85.468;
    Sr = 38, "Sr", 87.62;
    Y = 39, "Y", 88.906;
    Zr = 40, "Zr", 91.224;
    Nb = 41, "Nb", 92.906;
    Mo = 42, "Mo", 95.95;
    Tc = 43, "Tc", 98.0;
    Ru = 44, "Ru", 101.07;
    Rh = 45, "Rh", 102.91;
    Pd = 46, "Pd", 106.42;
    Ag = 47, "Ag", 107.87;
    Cd = 48, "Cd", 112.41;
    In = 49, "In", 114.82;
    Sn = 50, "Sn", 118.71;
    Sb = 51, "Sb", 121.76;
    Te = 52, "Te", 127.60;
    I = 53, "I", 126.90;
    Xe = 54, "Xe", 131.29;
    Cs = 55, "Cs", 132.91;
    Ba = 56, "Ba", 137.33;
    W = 74, "W", 183.84;
    Pt = 78, "Pt", 195.08;
    Au = 79, "Au", 196.97;
    Hg = 80, "Hg", 200.59;
    Pb = 82, "Pb", 207.2;
    U = 92, "U", 238.03;
}

impl Element {
    pub fn atomic_number(&self) -> u8 {
        *self as u8
    }

    pub fn is_heavy_atom(&self) -> bool {
        !matches!(self, Element::H | Element::Unknown)
    }

    /// Heteroatoms that can carry a sugar substituent or close a glycosidic bridge.
    pub fn is_heteroatom(&self) -> bool {
        !matches!(self, Element::H | Element::C | Element::Unknown)
    }

    /// Guesses an element from an atom label such as `C1`, `HO2`, `C.3`, or `Na+`.
    ///
    /// Two-letter symbols win only when the label is exactly that symbol (after stripping
    /// digits and charge marks), which keeps `CA` as carbon alpha while `NA` in an ion
    /// residue must be resolved by the caller.
    pub fn infer_from_label(label: &str) -> Element {
        let stem: String = label
            .split('.')
            .next()
            .unwrap_or("")
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();

        if stem.is_empty() {
            return Element::Unknown;
        }

        if stem.len() == 2 {
            if let Some(element) = Self::from_symbol(&stem) {
                if !matches!(
                    element,
                    Element::Ca | Element::Co | Element::Cd | Element::Hg | Element::Ne
                ) {
                    return element;
                }
            }
        }

        Self::from_symbol(&stem[..1]).unwrap_or(Element::Unknown)
    }

    fn from_symbol(symbol: &str) -> Option<Element> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.symbol().eq_ignore_ascii_case(symbol))
    }

    fn from_number(number: u8) -> Option<Element> {
        if number == 0 {
            return Some(Element::Unknown);
        }
        Self::ALL.iter().copied().find(|e| *e as u8 == number)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(num) = trimmed.parse::<u8>() {
            return Self::from_number(num).ok_or_else(|| format!("Invalid atomic number: {}", s));
        }
        Ok(Self::from_symbol(trimmed).unwrap_or(Element::Unknown))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    pub fn value(&self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Aromatic => 1.5,
        }
    }

    /// Token used by Tripos MOL2 bond records.
    pub fn mol2_token(&self) -> &'static str {
        match self {
            BondOrder::Single => "1",
            BondOrder::Double => "2",
            BondOrder::Triple => "3",
            BondOrder::Aromatic => "ar",
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for BondOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "1.0" | "single" | "am" => Ok(BondOrder::Single),
            "2" | "2.0" | "double" => Ok(BondOrder::Double),
            "3" | "3.0" | "triple" => Ok(BondOrder::Triple),
            "1.5" | "ar" | "aromatic" => Ok(BondOrder::Aromatic),
            _ => Err(format!("Invalid bond order: {}", s)),
        }
    }
}

/// Coarse residue classification assigned by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResidueKind {
    AminoAcid,
    Nucleotide,
    Water,
    Ion,
    #[default]
    Hetero,
}

impl ResidueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResidueKind::AminoAcid => "Amino Acid",
            ResidueKind::Nucleotide => "Nucleotide",
            ResidueKind::Water => "Water",
            ResidueKind::Ion => "Ion",
            ResidueKind::Hetero => "Hetero",
        }
    }

    /// Polymer residues are never candidates for sugar perception.
    pub fn is_polymer(&self) -> bool {
        matches!(self, ResidueKind::AminoAcid | ResidueKind::Nucleotide)
    }
}

impl fmt::Display for ResidueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_symbol_and_mass_come_from_one_table() {
        assert_eq!(Element::C.symbol(), "C");
        assert_eq!(Element::Na.symbol(), "Na");
        assert!((Element::O.atomic_mass() - 15.999).abs() < 1e-9);
        assert_eq!(Element::Unknown.atomic_mass(), 0.0);
        assert_eq!(Element::S.atomic_number(), 16);
    }

    #[test]
    fn element_from_str_accepts_numbers_and_symbols() {
        assert_eq!(Element::from_str("8").unwrap(), Element::O);
        assert_eq!(Element::from_str("cl").unwrap(), Element::Cl);
        assert_eq!(Element::from_str(" N ").unwrap(), Element::N);
        assert_eq!(Element::from_str("Zz").unwrap(), Element::Unknown);
        assert!(Element::from_str("200").is_err());
    }

    #[test]
    fn infer_from_label_handles_common_atom_names() {
        assert_eq!(Element::infer_from_label("C1"), Element::C);
        assert_eq!(Element::infer_from_label("HO2"), Element::H);
        assert_eq!(Element::infer_from_label("O5"), Element::O);
        assert_eq!(Element::infer_from_label("C.ar"), Element::C);
        assert_eq!(Element::infer_from_label("CA"), Element::C);
        assert_eq!(Element::infer_from_label("Cl"), Element::Cl);
        assert_eq!(Element::infer_from_label("S1"), Element::S);
        assert_eq!(Element::infer_from_label("123"), Element::Unknown);
    }

    #[test]
    fn heteroatom_excludes_carbon_and_hydrogen() {
        assert!(Element::O.is_heteroatom());
        assert!(Element::N.is_heteroatom());
        assert!(!Element::C.is_heteroatom());
        assert!(!Element::H.is_heteroatom());
        assert!(Element::C.is_heavy_atom());
        assert!(!Element::H.is_heavy_atom());
    }

    #[test]
    fn bond_order_parses_mol2_tokens() {
        assert_eq!(BondOrder::from_str("ar").unwrap(), BondOrder::Aromatic);
        assert_eq!(BondOrder::from_str("am").unwrap(), BondOrder::Single);
        assert_eq!(BondOrder::from_str("2").unwrap(), BondOrder::Double);
        assert!(BondOrder::from_str("du").is_err());
        assert_eq!(BondOrder::Aromatic.mol2_token(), "ar");
    }

    #[test]
    fn residue_kind_flags_polymers() {
        assert!(ResidueKind::AminoAcid.is_polymer());
        assert!(ResidueKind::Nucleotide.is_polymer());
        assert!(!ResidueKind::Hetero.is_polymer());
        assert_eq!(ResidueKind::Water.to_string(), "Water");
    }
}
