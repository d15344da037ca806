//! Test utilities and fixture processes for inclusion development.
//!
//! Provides fixture processes and composers (see [`fixtures`]) plus helpers
//! for driving a single process outside an engine.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use inclusion_compose::{Process, StepContext, Update};
use inclusion_core::{AbsolutePath, ProcessError, StepId, Tree, Value};

/// Build a port view from `(port, value)` pairs.
pub fn ports<I, K>(entries: I) -> Tree
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Run one step of `process` against `ports` with `dt`.
///
/// The process is placed at `/agents/0/<name>`.
pub fn run_once(process: &dyn Process, ports: &Tree, dt: f64) -> Result<Update, ProcessError> {
    let location = AbsolutePath::new(["agents", "0", process.name()]);
    let ctx = StepContext::new(&location, ports, StepId(0), 0.0, dt);
    process.next_update(&ctx)
}

/// The float an update carries for `variable` inside branch `port`.
pub fn branch_delta(update: &Update, port: &str, variable: &str) -> Option<f64> {
    update.ports().get(port)?.as_map()?.get(variable)?.as_f64()
}
