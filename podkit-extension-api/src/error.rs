//! Error types shared by the runtime and extension authors

use thiserror::Error;

/// Something an extension needs is not installed on this system.
#[derive(Error, Debug)]
pub enum MissingDependency {
    /// A module (shared library or importable unit) could not be resolved
    #[error("Module not found: {module}")]
    Module {
        /// Name of the unresolved module
        module: String,
        /// Underlying loader failure, if any
        #[source]
        cause: Option<Box<ExtensionError>>,
    },

    /// A required external executable was not found on `PATH`
    #[error("{message}")]
    Command {
        /// The command name, or the comma-joined candidate list
        command: String,
        /// User-facing description
        message: String,
    },
}

impl MissingDependency {
    /// Create a missing-module error without an underlying cause
    pub fn module(module: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            cause: None,
        }
    }

    /// Name of the missing dependency (module name or command list)
    pub fn dependency(&self) -> &str {
        match self {
            Self::Module { module, .. } => module,
            Self::Command { command, .. } => command,
        }
    }
}

/// Errors raised while loading or running an extension
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// A dependency of the extension is missing
    #[error(transparent)]
    MissingDependency(#[from] MissingDependency),

    /// The extension's code unit failed to import
    #[error("Failed to import {unit}: {message}")]
    Import {
        /// Base filename of the unit being imported
        unit: String,
        /// The module that could not be resolved, when the loader can tell
        module: Option<String>,
        /// Loader diagnostic
        message: String,
    },

    /// The file is not a valid extension
    #[error("Invalid extension {unit}: {reason}")]
    Invalid { unit: String, reason: String },

    /// No loadable unit exists for the extension
    #[error("Extension not found: {0}")]
    NotFound(String),

    /// API version mismatch between host and extension
    #[error("API version mismatch: host expects {expected}, extension has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Extension code panicked
    #[error("Extension panicked: {0}")]
    Panicked(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl ExtensionError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an import failure naming the module that could not be resolved
    pub fn import(unit: impl Into<String>, module: impl Into<String>) -> Self {
        let module = module.into();
        Self::Import {
            unit: unit.into(),
            message: format!("No module named '{}'", module),
            module: Some(module),
        }
    }

    /// Convert a caught panic payload into an error
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked(message)
    }

    /// Whether this is a missing-module failure
    pub fn is_missing_module(&self) -> bool {
        matches!(
            self,
            Self::MissingDependency(MissingDependency::Module { .. })
        )
    }

    /// Whether this is a missing-command failure
    pub fn is_missing_command(&self) -> bool {
        matches!(
            self,
            Self::MissingDependency(MissingDependency::Command { .. })
        )
    }
}
