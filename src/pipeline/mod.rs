//! The three-stage pipeline with a validation gate
//!
//! Data flows strictly left to right through intermediate artifacts:
//! extract writes raw datasets, transform writes cleaned datasets,
//! validate reads cleaned datasets without mutating them, load writes
//! the warehouse. No stage reads a downstream artifact.

pub mod artifacts;
pub mod extract;
pub mod load;
pub mod transform;
pub mod validate;

pub use artifacts::{Artifact, ArtifactStore, DatasetKind, Stage};
pub use extract::Extractor;
pub use load::Loader;
pub use transform::Transformer;
pub use validate::{run_validation, Finding, Severity, ValidationReport};
