//! Error types for the list engine

use std::path::PathBuf;

use thiserror::Error;

use crate::list::strategies::StrategyScope;
use crate::view::ViewError;

/// Failures that can surface from the list engine.
///
/// Structural inconsistencies in the document are never reported here; they are
/// repaired by the postfixer. Only setup problems and invalid external input are.
#[derive(Error, Debug)]
pub enum ListError {
    #[error("Invalid list configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A downcast strategy for `{attribute}` ({scope:?} scope) is already registered")]
    StrategyConflict {
        attribute: String,
        scope: StrategyScope,
    },

    #[error("Unknown command `{0}`")]
    UnknownCommand(String),

    #[error("Markup error: {0}")]
    Markup(#[from] ViewError),
}

pub type Result<T> = std::result::Result<T, ListError>;
