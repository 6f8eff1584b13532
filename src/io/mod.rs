mod amber;
mod context;
mod error;
mod mol2;
mod pdb;

use crate::model::parameters::ParameterTable;
use std::path::Path;

pub use pdb::reader::read as read_pdb_assembly;
pub use pdb::writer::{
    write_structure as write_pdb_assembly, write_topology as write_pdb_topology,
};

pub use mol2::reader::read as read_mol2_assembly;
pub use mol2::writer::write_topology as write_mol2_topology;

pub use amber::inpcrd::{read as read_inpcrd, write as write_inpcrd};
pub use amber::prmtop::{CHARGE_FACTOR, read as read_prmtop, write as write_prmtop};

pub use context::IoContext;

pub use error::Error;

/// Loads a TOML force-field parameter table from disk.
pub fn read_parameters(path: impl AsRef<Path>) -> Result<ParameterTable, Error> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::from_io(e, Some(path.to_path_buf())))?;
    ParameterTable::from_toml_str(&content).map_err(|source| Error::Parameters {
        path: Some(path.to_path_buf()),
        source,
    })
}
