//! Error types for the digwire generator.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::metadata::ModulePath;

/// Errors surfaced by the digwire pipeline.
///
/// Every variant is fatal: generation is all-or-nothing, and no output is
/// written once any file fails. Variants carry the originating file and
/// declaration name where one is available.
#[derive(Debug, Error)]
pub enum DigwireError {
    #[error("cargo metadata failed: {0}")]
    Metadata(#[from] cargo_metadata::Error),

    #[error("failed to parse {path}: {source}")]
    Syntax {
        path: Utf8PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("invalid directive on '{decl}' in {path}: {message}")]
    Directive {
        path: Utf8PathBuf,
        decl: String,
        message: String,
    },

    #[error("multiple return-marker fields on '{decl}' in {path}")]
    MultipleReturnMarkers { path: Utf8PathBuf, decl: String },

    #[error("field '{field}' on '{decl}' in {path} is grouped but its type is not a sequence")]
    GroupedFieldNotSequence {
        path: Utf8PathBuf,
        decl: String,
        field: String,
    },

    #[error("unsupported type shape on '{decl}' in {path}: {message}")]
    TypeShape {
        path: Utf8PathBuf,
        decl: String,
        message: String,
    },

    #[error("module path '{0}' missing from the canonical alias table")]
    Resolution(ModulePath),

    #[error("file {0} does not belong to any workspace package")]
    UnownedFile(Utf8PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DigwireError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
