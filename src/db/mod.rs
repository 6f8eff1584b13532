//! Embedded monosaccharide reference data.
//!
//! TOML tables under `templates/glycans/` map the stereo key of each D-configured stem to its
//! trivial name. The tables are parsed into an owned [`MonosaccharideDb`] on demand.

mod error;
mod loader;
mod schema;
mod store;

pub use error::DatabaseError;
pub use store::{MonosaccharideDb, MonosaccharideEntry};
