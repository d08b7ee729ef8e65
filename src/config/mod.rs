//! Pipeline configuration

mod settings;

pub use settings::{LoadMode, Settings};
