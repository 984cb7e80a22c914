//! podkit-core: Core library for the podkit podcast client
//!
//! This crate hosts the extension runtime:
//!
//! - **Discovery** - [`find_extensions`] scans the built-in and user extension directories
//! - **Containers** - [`ExtensionContainer`] wraps one extension, its metadata and settings
//! - **Manager** - [`ExtensionManager`] applies the enabled-set and dispatches [`Hook`]s
//! - **Loaders** - [`DylibLoader`] for compiled libraries, [`StaticLoader`] for built-in code
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use podkit_core::{
//!     DylibLoader, ExtensionManager, ExtensionManagerConfig, HostServices, UiContext, UiKind,
//! };
//! use podkit_extension_api::ConfigStore;
//!
//! let config = ConfigStore::new();
//! let services = HostServices::new(UiContext::new(UiKind::Cli), config, Arc::new(DylibLoader::new()));
//! let manager = ExtensionManager::new(ExtensionManagerConfig::from_env(), Arc::new(services));
//!
//! manager.on_application_started();
//! for info in manager.get_extensions() {
//!     println!("{} - {}", info.name, info.title);
//! }
//! manager.shutdown();
//! ```

pub mod extensions;

// Re-export key types for convenience
pub use extensions::{
    DylibLoader, ExtensionContainer, ExtensionInfo, ExtensionLoader, ExtensionManager,
    ExtensionManagerConfig, ExtensionMetadata, Hook, HostServices, StaticLoader, UiContext,
    UiKind, find_extensions,
};
