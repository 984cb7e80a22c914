//! Extension runtime
//!
//! Extensions are discovered as library files in the built-in and user
//! extension directories. Each one is wrapped in an [`ExtensionContainer`]
//! that parses its declared metadata without loading code, loads it on
//! first enable and isolates its failures. The [`ExtensionManager`] owns
//! all containers, follows the `extensions.enabled` setting and fans
//! [`Hook`] events out to every enabled extension.
//!
//! ```text
//! ┌──────────────────────────── ExtensionManager ───────────────────────────┐
//! │  ConfigStore ──observer──▶ reconcile ──▶ ExtensionContainer::set_enabled │
//! │                                                                         │
//! │  on_<hook>(..) ──▶ fan_out ──▶ [container] ──▶ dyn Extension            │
//! │                              └─▶ [container] ──▶ dyn Extension          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod container;
mod hooks;
mod loader;
mod manager;
mod metadata;
mod parser;
mod services;
mod ui;

pub use container::{ExtensionContainer, ExtensionInfo};
pub use hooks::{Hook, Last, Reply};
pub use loader::{
    DylibLoader, ExtensionLoader, ExtensionUnit, LoadRequest, LoadedExtension, StaticLoader,
};
pub use manager::{
    DISABLE_EXTENSIONS_ENV, EXTENSIONS_ENV, ExtensionManager, ExtensionManagerConfig,
    extension_name, find_extensions,
};
pub use metadata::{
    DEFAULT_CATEGORY, DEFAULT_DESCRIPTION, ExtensionMetadata, MissingAttribute, category_label,
    field_default,
};
pub use parser::{load_metadata, parse_metadata};
pub use services::{HostServices, Translator};
pub use ui::{UiContext, UiKind};
