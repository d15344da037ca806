//! Core types for inclusion-body agent composition.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! path algebra used by every topology ([`Path`], [`AbsolutePath`],
//! [`resolve`]), the state tree value model ([`Value`], [`Tree`]),
//! immutable configuration maps ([`Config`]), and the shared error enums.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod id;
pub mod path;
pub mod value;

pub use config::Config;
pub use error::{ConfigError, PathError, ProcessError, StateError};
pub use id::StepId;
pub use path::{resolve, AbsolutePath, Path, Segment, PARENT};
pub use value::{tree, Tree, TreeExt, Value};
