//! XDG Base Directory paths for podkit.
//!
//! Settings live under the config directory, user-installed extensions under
//! the data directory, and extensions shipped with the application under the
//! install prefix.

use std::path::PathBuf;

/// Get the podkit config directory.
///
/// Returns `$XDG_CONFIG_HOME/podkit` if set, otherwise `~/.config/podkit`.
///
/// # Examples
///
/// ```
/// use podkit_paths::config_dir;
///
/// let settings = config_dir().join("settings.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("podkit")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/podkit")
    } else {
        PathBuf::from(".config/podkit")
    }
}

/// Get the podkit data directory.
///
/// Returns `$XDG_DATA_HOME/podkit` if set, otherwise `~/.local/share/podkit`.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("podkit")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share/podkit")
    } else {
        PathBuf::from(".local/share/podkit")
    }
}

/// Default location of the settings file.
pub fn settings_file() -> PathBuf {
    config_dir().join("settings.toml")
}

/// Directory holding user-installed extensions.
pub fn user_extensions_dir() -> PathBuf {
    data_dir().join("Extensions")
}

/// Install prefix of the application.
///
/// `$PODKIT_PREFIX` wins; otherwise the prefix is derived from the running
/// executable (`<prefix>/bin/podkit`), falling back to `/usr`.
pub fn prefix() -> PathBuf {
    if let Ok(prefix) = std::env::var("PODKIT_PREFIX") {
        return PathBuf::from(prefix);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("/usr"))
}

/// Directory holding extensions shipped with the application.
pub fn builtin_extensions_dir() -> PathBuf {
    prefix().join("share/podkit/extensions")
}
