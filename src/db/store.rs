use super::error::DatabaseError;
use super::loader;
use super::schema::MonosaccharideFile;
use crate::model::glycan::{ChemicalCode, Configuration};
use smol_str::SmolStr;

/// Known stem with the stereo key of its D enantiomer.
#[derive(Debug, Clone, PartialEq)]
pub struct MonosaccharideEntry {
    pub stem: String,
    pub key: ChemicalCode,
    pub ketose: bool,
    pub deoxy: Vec<SmolStr>,
}

/// Lookup table from stereo keys to monosaccharide stems.
///
/// Owned by the caller; build it once with [`MonosaccharideDb::builtin`] and pass it around.
#[derive(Debug, Clone, Default)]
pub struct MonosaccharideDb {
    entries: Vec<MonosaccharideEntry>,
}

impl MonosaccharideDb {
    /// Table compiled into the crate.
    pub fn builtin() -> Self {
        loader::load_builtin()
    }

    /// Parses additional `[[monosaccharide]]` records and appends them.
    pub fn extend_from_toml(&mut self, content: &str) -> Result<(), DatabaseError> {
        let file: MonosaccharideFile = toml::from_str(content)?;
        for record in file.entries {
            let key: ChemicalCode = record.code.parse().map_err(|source| DatabaseError::Code {
                stem: record.stem.clone(),
                source,
            })?;
            let mut deoxy: Vec<SmolStr> = record.deoxy.iter().map(SmolStr::new).collect();
            deoxy.sort();

            if self
                .entries
                .iter()
                .any(|e| e.stem == record.stem && e.key.form == key.form)
            {
                return Err(DatabaseError::Duplicate {
                    stem: record.stem,
                    form: key.form,
                });
            }

            self.entries.push(MonosaccharideEntry {
                stem: record.stem,
                key,
                ketose: record.ketose,
                deoxy,
            });
        }
        Ok(())
    }

    pub fn entries(&self) -> &[MonosaccharideEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matches a stereo key directly (D) or through its mirror image (L).
    ///
    /// `deoxy` must be sorted.
    pub fn identify(
        &self,
        key: &ChemicalCode,
        ketose: bool,
        deoxy: &[SmolStr],
    ) -> Option<(&MonosaccharideEntry, Configuration)> {
        let matches =
            |entry: &&MonosaccharideEntry| entry.ketose == ketose && entry.deoxy.as_slice() == deoxy;

        if let Some(entry) = self.entries.iter().filter(matches).find(|e| &e.key == key) {
            return Some((entry, Configuration::D));
        }
        let mirrored = key.mirrored();
        self.entries
            .iter()
            .filter(matches)
            .find(|e| e.key == mirrored)
            .map(|entry| (entry, Configuration::L))
    }
}
