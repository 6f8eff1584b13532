use crate::db::DatabaseError;
use crate::model::parameters::ParameterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("assembly '{name}' contains no atoms")]
    EmptyAssembly { name: String },

    #[error(
        "ring set was perceived at bond-graph revision {rings} but the topology is at revision {topology}"
    )]
    StaleRings { rings: u64, topology: u64 },

    #[error("invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("invalid parameter table: {0}")]
    Parameters(#[from] ParameterError),

    #[error("invalid monosaccharide database: {0}")]
    Database(#[from] DatabaseError),

    #[error("malformed {format} structure: {details}")]
    MalformedFile {
        format: &'static str,
        details: String,
    },
}

impl Error {
    pub fn empty_assembly(name: impl Into<String>) -> Self {
        Self::EmptyAssembly { name: name.into() }
    }

    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    pub fn malformed_file(format: &'static str, details: impl Into<String>) -> Self {
        Self::MalformedFile {
            format,
            details: details.into(),
        }
    }
}
