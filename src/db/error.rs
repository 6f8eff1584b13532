use crate::model::glycan::{CodeParseError, RingForm};
use thiserror::Error;

/// Rejection of a monosaccharide table.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("malformed monosaccharide table: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("monosaccharide '{stem}' has an invalid code: {source}")]
    Code {
        stem: String,
        #[source]
        source: CodeParseError,
    },

    #[error("duplicate monosaccharide '{stem}' ({form:?})")]
    Duplicate { stem: String, form: RingForm },
}
