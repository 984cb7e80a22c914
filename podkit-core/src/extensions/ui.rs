//! UI-runtime flags consulted by `only_for`, `mandatory_in` and `disable_in`

use serde::Serialize;

/// User interface flavours the host can run as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiKind {
    Gtk,
    Cli,
    Web,
}

/// Boolean flags describing the running UI.
///
/// Chosen once by the host at composition time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UiContext {
    pub gtk: bool,
    pub cli: bool,
    pub web: bool,
    pub osx: bool,
    pub win32: bool,
}

impl UiContext {
    /// Flags for the given UI on the current platform
    pub fn new(kind: UiKind) -> Self {
        Self {
            gtk: kind == UiKind::Gtk,
            cli: kind == UiKind::Cli,
            web: kind == UiKind::Web,
            osx: cfg!(target_os = "macos"),
            win32: cfg!(target_os = "windows"),
        }
    }

    /// Look up a flag by name, ignoring case. Unknown flags are `false`.
    pub fn flag(&self, name: &str) -> bool {
        match name.to_ascii_lowercase().as_str() {
            "gtk" => self.gtk,
            "cli" => self.cli,
            "web" => self.web,
            "osx" => self.osx,
            "win32" => self.win32,
            _ => false,
        }
    }

    /// Names of the flags that are set
    pub fn active_flags(&self) -> Vec<&'static str> {
        [
            ("gtk", self.gtk),
            ("cli", self.cli),
            ("web", self.web),
            ("osx", self.osx),
            ("win32", self.win32),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}
