//! ExtensionContext - an extension's handle to the host
//!
//! The runtime builds one context per extension when the extension is
//! instantiated. It carries the extension's identity, its configuration
//! section, and helpers for checking external tool dependencies.

use std::path::{Path, PathBuf};

use crate::config::ConfigSection;
use crate::error::MissingDependency;

/// Extension's interface to host capabilities
#[derive(Debug, Clone)]
pub struct ExtensionContext {
    name: String,
    filename: Option<PathBuf>,
    config: ConfigSection,
}

impl ExtensionContext {
    /// Create a new extension context
    pub fn new(name: impl Into<String>, filename: Option<PathBuf>, config: ConfigSection) -> Self {
        Self {
            name: name.into(),
            filename,
            config,
        }
    }

    /// The extension's name (filename without ordering prefix)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the extension was loaded from (`None` for built-in extensions)
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Settings scoped to this extension, with declared defaults applied
    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    /// Resolve a command to its full path.
    ///
    /// # Example
    /// ```ignore
    /// let ffmpeg = ctx.require_command("ffmpeg")?;
    /// ```
    pub fn require_command(&self, command: &str) -> Result<PathBuf, MissingDependency> {
        require_command(command)
    }

    /// Resolve the first installed command of a list of candidates
    pub fn require_any_command(&self, commands: &[&str]) -> Result<PathBuf, MissingDependency> {
        require_any_command(commands)
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically tagged with the extension name)
    pub fn log_info(&self, message: &str) {
        tracing::info!(extension = %self.name, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(extension = %self.name, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(extension = %self.name, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(extension = %self.name, "{}", message);
    }
}

/// Check that a command is installed and return its full path
pub fn require_command(command: &str) -> Result<PathBuf, MissingDependency> {
    which::which(command).map_err(|_| MissingDependency::Command {
        command: command.to_string(),
        message: format!("Command not found: {}", command),
    })
}

/// Return the full path of the first installed command in the list
pub fn require_any_command(commands: &[&str]) -> Result<PathBuf, MissingDependency> {
    if let Some(path) = commands.iter().find_map(|c| which::which(c).ok()) {
        return Ok(path);
    }

    let list = commands.join(", ");
    Err(MissingDependency::Command {
        message: format!("Need at least one of the following commands: {}", list),
        command: list,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;

    const MISSING: &str = "podkit-test-command-that-does-not-exist";

    fn context() -> ExtensionContext {
        let store = ConfigStore::new();
        ExtensionContext::new(
            "test",
            Some(PathBuf::from("/tmp/test.so")),
            store.extension_section("test"),
        )
    }

    #[test]
    fn test_context_creation() {
        let ctx = context();
        assert_eq!(ctx.name(), "test");
        assert_eq!(ctx.filename(), Some(Path::new("/tmp/test.so")));
        assert_eq!(ctx.config().path(), "extensions.test");
    }

    #[test]
    fn test_context_config_writes_reach_store() {
        let ctx = context();
        ctx.config().set("threshold", 100i64).unwrap();
        assert_eq!(
            ctx.config().store().get_as::<i64>("extensions.test.threshold"),
            Some(100)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_require_command_finds_shell() {
        let path = require_command("sh").unwrap();
        assert!(path.is_absolute());
    }

    #[test]
    fn test_require_command_missing() {
        let err = context().require_command(MISSING).unwrap_err();
        assert_eq!(err.dependency(), MISSING);
        assert_eq!(err.to_string(), format!("Command not found: {}", MISSING));
    }

    #[cfg(unix)]
    #[test]
    fn test_require_any_command_returns_first_found() {
        let path = require_any_command(&[MISSING, "sh"]).unwrap();
        assert!(path.ends_with("sh"));
    }

    #[test]
    fn test_require_any_command_all_missing() {
        let second = "podkit-another-missing-command";
        let err = require_any_command(&[MISSING, second]).unwrap_err();
        let expected = format!("{}, {}", MISSING, second);
        assert_eq!(err.dependency(), expected);
        assert!(err.to_string().contains(&expected));
        assert!(
            err.to_string()
                .starts_with("Need at least one of the following commands")
        );
    }
}
