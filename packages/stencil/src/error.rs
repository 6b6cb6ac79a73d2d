//! Error types.
//!
//! Contract violations (missing components, bad indices, unknown templates)
//! surface as `Error`. Data-quality problems met while building templates are
//! `FieldError`s, which are logged and skipped rather than propagated.

use std::path::PathBuf;

use thiserror::Error;

use crate::entity::EntityID;

/// The error type for stencil operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A component type was used before it was ever registered.
    #[error("component type {component} is not registered")]
    NotRegistered {
        component: &'static str,
    },

    /// No template exists for the reference id.
    #[error("no template registered for reference id {0:?}")]
    TemplateNotFound(String),

    /// No live entity matches the lookup.
    #[error("no entity found for {0}")]
    EntityNotFound(String),

    /// The entity does not carry the requested component.
    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        entity: EntityID,
        component: &'static str,
    },

    /// A storage index outside `[0, len)`.
    #[error("index {index} out of range for {component} storage of length {len}")]
    OutOfRange {
        component: &'static str,
        index: usize,
        len: usize,
    },

    /// A template or definition is missing required data.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A type-erased value did not have the type its storage expected.
    #[error("component type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Reading a file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A content or configuration file is not valid RON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    /// A system returned an error from its update.
    #[error("system {name} failed: {source}")]
    System {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an `Error::Io` for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error::Io { path: path.into(), source }
    }

    /// Create an `Error::Parse` for the given path.
    pub fn parse(path: impl Into<PathBuf>, source: ron::error::SpannedError) -> Error {
        Error::Parse { path: path.into(), source }
    }
}

/// A failure to assign a single component field from content data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The component has no writable field with this name.
    #[error("{component} has no field {field:?}")]
    UnknownField {
        component: &'static str,
        field: String,
    },

    /// The raw value could not be converted to the field's type.
    #[error("cannot set {component}.{field} from {value:?}: {reason}")]
    Conversion {
        component: &'static str,
        field: String,
        value: String,
        reason: String,
    },
}

/// The result type for stencil operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
