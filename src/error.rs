use thiserror::Error;

/// Errors reported by the tree view and its collaborators.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The builder was finished without a tree model.
    #[error("tree view requires a model")]
    MissingModel,
    /// The builder was finished without a label provider.
    #[error("tree view requires a label provider")]
    MissingLabels,
    /// The builder was finished without a drawing surface.
    #[error("tree view requires a drawing surface")]
    MissingSurface,
    /// A state store failed to load or save.
    #[error("state store for `{widget_id}` failed: {message}")]
    Store { widget_id: String, message: String },
}

pub type Result<T, E = TreeError> = std::result::Result<T, E>;
