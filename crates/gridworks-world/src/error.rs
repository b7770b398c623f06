use gridworks_core::catalog::CatalogError;
use gridworks_core::config::ConfigError;
use gridworks_core::id::DefinitionId;
use gridworks_gesture::EditError;

/// Errors raised while building or configuring a [`World`](crate::World).
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The simulation config failed to load or validate.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The definition catalog failed to load or validate.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A selection named a definition the catalog does not have.
    #[error("unknown definition {0:?}")]
    UnknownDefinition(DefinitionId),

    /// A lookup named a definition the catalog does not have.
    #[error("no definition named '{0}'")]
    UnknownName(String),

    /// A scripted edit was refused.
    #[error(transparent)]
    Edit(#[from] EditError),
}
