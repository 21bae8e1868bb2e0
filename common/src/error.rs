//! The error taxonomy shared by every layer.
//!
//! Registry and configuration failures are caught before a plugin is ever
//! constructed; lifecycle violations surface as their own variants; anything
//! backend-specific travels inside [`KitError::PluginExecution`] tagged with
//! enough context to tell which plugin and action blew up.

use thiserror::Error;

use crate::model::PluginKind;

/// Boxed backend failure carried as an error source.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type KitResult<T> = Result<T, KitError>;

#[derive(Debug, Error)]
pub enum KitError {
    /// Caller-supplied parameters failed validation; no plugin was touched.
    #[error("invalid configuration: {0}")]
    ConfigValidation(String),

    #[error("unknown plugin {kind}/{name}")]
    UnknownPlugin { kind: PluginKind, name: String },

    #[error("plugin {kind}/{name} is already registered")]
    DuplicateRegistration { kind: PluginKind, name: String },

    /// A data-bearing operation was requested before `setup` ran.
    #[error("environment is not ready, run setup first")]
    EnvironmentNotReady,

    #[error("environment setup failed")]
    SetupFailed {
        #[source]
        cause: BoxedCause,
    },

    /// `generate` was called without a usable model artifact.
    #[error("no trained model available, run train first")]
    ModelNotTrained,

    #[error("target count must be greater than zero")]
    InvalidCount,

    /// The unique sampler ran out of attempts before reaching the target.
    #[error("candidate space exhausted: found {found} of {requested} requested addresses")]
    InsufficientCandidates { found: u64, requested: u64 },

    /// Wrapper for any backend-specific failure, tagged for diagnostics.
    #[error("{kind}/{name} failed during {action}")]
    PluginExecution {
        kind: PluginKind,
        name: String,
        action: String,
        #[source]
        cause: BoxedCause,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("i/o failure")]
    Io(#[from] std::io::Error),
}

impl KitError {
    pub fn setup_failed(cause: impl Into<BoxedCause>) -> Self {
        KitError::SetupFailed {
            cause: cause.into(),
        }
    }

    pub fn execution(
        kind: PluginKind,
        name: &str,
        action: &str,
        cause: impl Into<BoxedCause>,
    ) -> Self {
        KitError::PluginExecution {
            kind,
            name: name.to_string(),
            action: action.to_string(),
            cause: cause.into(),
        }
    }
}
