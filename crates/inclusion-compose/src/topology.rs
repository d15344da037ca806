//! Port wiring.
//!
//! A [`Topology`] maps process name → port name → relative [`Path`]. Paths
//! are relative to the node containing the process, so `('boundary',)`
//! from a process at `/agents/1/division` means `/agents/1/boundary`.

use indexmap::IndexMap;
use inclusion_core::Path;

use crate::error::ComposeError;
use crate::schema::Schema;

/// Port name → relative path, for one process.
pub type Wiring = IndexMap<String, Path>;

/// Process name → wiring.
pub type Topology = IndexMap<String, Wiring>;

/// Build a [`Wiring`] from `(port, path)` pairs.
pub fn wiring<I, K>(entries: I) -> Wiring
where
    I: IntoIterator<Item = (K, Path)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Check that `wiring` covers exactly the ports in `schema`.
///
/// Reports the first declared port without a path as
/// [`ComposeError::MissingPortPath`], then the first wired port that is not
/// declared as [`ComposeError::UndeclaredPort`].
pub fn validate_wiring(process: &str, schema: &Schema, wiring: &Wiring) -> Result<(), ComposeError> {
    if let Some(port) = schema.keys().find(|p| !wiring.contains_key(*p)) {
        return Err(ComposeError::MissingPortPath {
            process: process.to_string(),
            port: port.clone(),
        });
    }
    if let Some(port) = wiring.keys().find(|p| !schema.contains_key(*p)) {
        return Err(ComposeError::UndeclaredPort {
            process: process.to_string(),
            port: port.clone(),
        });
    }
    Ok(())
}
