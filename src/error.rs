use thiserror::Error;

use crate::model::{FeatureId, GeometryType};

/// Failure reported by the persistence collaborator for one layer's bundle.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{message}")]
pub struct PersistError {
    pub message: String,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self { PersistError { message: message.into() } }
}

/// Failure reported by the related-tables collaborator.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{message}")]
pub struct RelatedError {
    pub message: String,
}

impl RelatedError {
    pub fn new(message: impl Into<String>) -> Self { RelatedError { message: message.into() } }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid editor options: {0}")]
    Parse(String),

    #[error("option '{key}' names unknown layer '{layer}'")]
    UnknownLayer { key: &'static str, layer: String },

    #[error("layer '{0}' is declared more than once")]
    DuplicateLayer(String),

    #[error("option '{key}' is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EditorError {
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    #[error("layer '{0}' is not editable")]
    NotEditable(String),

    #[error("\"geometryType\" is not set for {0}")]
    MissingGeometryType(String),

    #[error("cannot add a {got} geometry to layer '{layer}' of type {expected}")]
    GeometryTypeMismatch { layer: String, expected: GeometryType, got: GeometryType },

    #[error("cannot save, the geometry is invalid")]
    InvalidGeometry,

    #[error("feature '{id}' not found in layer '{layer}'")]
    FeatureNotFound { layer: String, id: FeatureId },

    #[error("operation '{operation}' is not allowed on layer '{layer}'")]
    OperationNotAllowed { layer: String, operation: &'static str },

    #[error("nothing is selected")]
    NoSelection,

    #[error("no attribute dialog is open")]
    NoDialog,

    #[error("attribute '{0}' is not in the open dialog")]
    UnknownAttribute(String),

    #[error("constraint '{0}' is malformed, expected event:attribute:value")]
    InvalidConstraint(String),

    #[error("related tables nested deeper than {0} levels")]
    CascadeTooDeep(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("related tables: {0}")]
    RelatedTables(#[from] RelatedError),

    #[error("commit of layer '{layer}' failed: {source}")]
    Persistence { layer: String, source: PersistError },
}

impl EditorError {
    /// Stable machine-readable code used by the browser binding.
    pub fn code(&self) -> &'static str {
        match self {
            EditorError::UnknownLayer(_) => "unknown_layer",
            EditorError::NotEditable(_) => "not_editable",
            EditorError::MissingGeometryType(_) => "missing_geometry_type",
            EditorError::GeometryTypeMismatch { .. } => "geometry_type_mismatch",
            EditorError::InvalidGeometry => "invalid_geometry",
            EditorError::FeatureNotFound { .. } => "feature_not_found",
            EditorError::OperationNotAllowed { .. } => "operation_not_allowed",
            EditorError::NoSelection => "no_selection",
            EditorError::NoDialog => "no_dialog",
            EditorError::UnknownAttribute(_) => "unknown_attribute",
            EditorError::InvalidConstraint(_) => "invalid_constraint",
            EditorError::CascadeTooDeep(_) => "cascade_too_deep",
            EditorError::Config(_) => "config",
            EditorError::RelatedTables(_) => "related_tables",
            EditorError::Persistence { .. } => "persistence",
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
