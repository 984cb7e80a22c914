//! ExtensionContainer - one discovered extension and its lifecycle

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use toml::Table;

use podkit_extension_api::{
    ConfigSection, Extension, ExtensionContext, ExtensionError, HookResult, MissingDependency,
};

use super::hooks::guarded;
use super::loader::{LoadRequest, LoadedExtension};
use super::metadata::ExtensionMetadata;
use super::parser;
use super::services::HostServices;

/// Wraps one extension: identity, settings, loaded instance and state
pub struct ExtensionContainer {
    name: String,
    filename: Option<PathBuf>,
    config: ConfigSection,
    module: Option<LoadedExtension>,
    enabled: bool,
    error: Option<Arc<ExtensionError>>,
    default_config: Option<Table>,
    metadata: ExtensionMetadata,
    services: Arc<HostServices>,
}

/// Snapshot of a container for listings
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub filename: Option<PathBuf>,
    pub enabled: bool,
    pub loaded: bool,
    /// Not available in the current UI
    pub unavailable: bool,
    /// Forced on in the current UI
    pub mandatory: bool,
    /// Forced off in the current UI
    pub disabled_in_ui: bool,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Arc<ExtensionError>>,
    /// Declared metadata in display order
    pub metadata: Vec<(String, String)>,
}

fn serialize_error<S: Serializer>(
    error: &Option<Arc<ExtensionError>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ExtensionContainer {
    /// Create a container and read its metadata from `filename`.
    ///
    /// Nothing is loaded until the container is enabled.
    pub fn new(name: impl Into<String>, filename: Option<PathBuf>, services: Arc<HostServices>) -> Self {
        let name = name.into();
        let translate = |text: &str| services.translate(text);
        let fields = parser::load_metadata(filename.as_deref(), &translate);
        let metadata = ExtensionMetadata::new(&name, fields, &translate);

        Self {
            config: services.config.extension_section(&name),
            name,
            filename,
            module: None,
            enabled: false,
            error: None,
            default_config: None,
            metadata,
            services,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the extension code has been loaded
    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    /// The last load failure
    pub fn error(&self) -> Option<&Arc<ExtensionError>> {
        self.error.as_ref()
    }

    /// Settings defaults declared by the extension, once loaded
    pub fn default_config(&self) -> Option<&Table> {
        self.default_config.as_ref()
    }

    pub fn metadata(&self) -> &ExtensionMetadata {
        &self.metadata
    }

    /// Resolve an executable on `PATH`
    pub fn require_command(&self, command: &str) -> Result<PathBuf, MissingDependency> {
        podkit_extension_api::require_command(command)
    }

    /// Resolve the first installed executable among `commands`
    pub fn require_any_command(&self, commands: &[&str]) -> Result<PathBuf, MissingDependency> {
        podkit_extension_api::require_any_command(commands)
    }

    /// The loaded instance, if the container is enabled
    pub(crate) fn active_module(&mut self) -> Option<&mut dyn Extension> {
        if !self.enabled {
            return None;
        }
        self.module.as_mut().map(LoadedExtension::instance)
    }

    /// Enable or disable the extension.
    ///
    /// Load failures are logged and kept in [`error`](Self::error); the
    /// container then stays disabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            match self.load_extension() {
                Ok(()) if self.module.is_some() => {
                    self.error = None;
                    self.enabled = true;
                    self.run_lifecycle("on_load", |ext| ext.on_load());
                }
                Ok(()) => {}
                Err(e) => {
                    let e = normalize_load_error(e);
                    tracing::error!(
                        extension = %self.name,
                        filename = ?self.filename,
                        error = %e,
                        "Cannot load extension"
                    );
                    self.error = Some(Arc::new(e));
                    self.enabled = false;
                }
            }
        } else if !enabled && self.enabled {
            self.run_lifecycle("on_unload", |ext| ext.on_unload());
            self.enabled = false;
        }
    }

    fn load_extension(&mut self) -> Result<(), ExtensionError> {
        if self.module.is_some() {
            tracing::debug!(extension = %self.name, "Module already loaded");
            return Ok(());
        }

        if !self.metadata.available_for_current_ui(&self.services.ui) {
            tracing::info!(
                extension = %self.name,
                only_for = self.metadata.only_for().unwrap_or_default(),
                "Not loading extension in this UI"
            );
            return Ok(());
        }

        let basename = self.basename();
        let request = LoadRequest {
            name: &self.name,
            basename: &basename,
            path: self.filename.as_deref(),
        };
        let unit = self.services.loader.load(&request)?;

        let defaults = unit.default_config().clone();
        if !defaults.is_empty() {
            self.services
                .config
                .extension_section(&self.name)
                .register_defaults(&defaults);
        }
        self.default_config = Some(defaults);
        self.config = self.services.config.extension_section(&self.name);

        let ctx = ExtensionContext::new(&self.name, self.filename.clone(), self.config.clone());
        let module = guarded(|| unit.instantiate(&ctx))?;
        self.module = Some(module);

        tracing::info!(extension = %self.name, filename = ?self.filename, "Module loaded");
        Ok(())
    }

    fn run_lifecycle(&mut self, hook: &'static str, call: impl FnOnce(&mut dyn Extension) -> HookResult) {
        let Some(module) = self.module.as_mut() else {
            return;
        };
        if let Err(e) = guarded(|| call(module.instance())) {
            tracing::error!(extension = %self.name, hook, error = %e, "Extension hook failed");
        }
    }

    fn basename(&self) -> String {
        self.filename
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Snapshot for listings
    pub fn info(&self) -> ExtensionInfo {
        let ui = &self.services.ui;
        ExtensionInfo {
            name: self.name.clone(),
            title: self.metadata.title().to_string(),
            description: self.metadata.description().to_string(),
            category: self.metadata.category().to_string(),
            filename: self.filename.clone(),
            enabled: self.enabled,
            loaded: self.is_loaded(),
            unavailable: !self.metadata.available_for_current_ui(ui),
            mandatory: self.metadata.mandatory_in_current_ui(ui),
            disabled_in_ui: self.metadata.disable_in_current_ui(ui),
            error: self.error.clone(),
            metadata: self
                .metadata
                .get_sorted()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl std::fmt::Debug for ExtensionContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionContainer")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("enabled", &self.enabled)
            .field("loaded", &self.is_loaded())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// An import that failed on a known module becomes a missing dependency
fn normalize_load_error(error: ExtensionError) -> ExtensionError {
    match error {
        ExtensionError::Import {
            unit,
            module: Some(module),
            message,
        } => MissingDependency::Module {
            module: module.clone(),
            cause: Some(Box::new(ExtensionError::Import {
                unit,
                module: Some(module),
                message,
            })),
        }
        .into(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::loader::StaticLoader;
    use crate::extensions::ui::UiContext;
    use podkit_extension_api::{ConfigStore, CreateExtension};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    struct Counting;

    impl CreateExtension for Counting {
        fn create(_ctx: ExtensionContext) -> Result<Self, ExtensionError> {
            Ok(Self)
        }
    }

    impl Extension for Counting {
        fn on_load(&mut self) -> HookResult {
            LOADS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_unload(&mut self) -> HookResult {
            Err(ExtensionError::custom("unload always fails"))
        }
    }

    struct Quiet;

    impl CreateExtension for Quiet {
        fn create(_ctx: ExtensionContext) -> Result<Self, ExtensionError> {
            Ok(Self)
        }
    }

    impl Extension for Quiet {}

    struct Panicking;

    impl CreateExtension for Panicking {
        fn create(_ctx: ExtensionContext) -> Result<Self, ExtensionError> {
            panic!("constructor exploded");
        }
    }

    impl Extension for Panicking {}

    fn services(loader: StaticLoader, ui: UiContext) -> Arc<HostServices> {
        Arc::new(HostServices::new(ui, ConfigStore::new(), Arc::new(loader)))
    }

    fn cli() -> UiContext {
        UiContext {
            cli: true,
            ..Default::default()
        }
    }

    fn extension_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().prefix("ext_").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_new_reads_metadata_without_loading() {
        let file = extension_file("__title__ = 'Counter'\n__category__ = 'interface'\n");
        let container = ExtensionContainer::new(
            "counter",
            Some(file.path().to_path_buf()),
            services(StaticLoader::new(), cli()),
        );

        assert_eq!(container.metadata().title(), "Counter");
        assert_eq!(container.metadata().category(), "Interface");
        assert!(!container.is_loaded());
        assert!(!container.is_enabled());
        assert_eq!(container.config().path(), "extensions.counter");
    }

    #[test]
    fn test_enable_disable_cycle_loads_once() {
        let mut loader = StaticLoader::new();
        loader.register::<Counting>("counting");
        let mut container = ExtensionContainer::new("counting", None, services(loader, cli()));

        let before = LOADS.load(Ordering::SeqCst);
        container.set_enabled(true);
        container.set_enabled(true);
        assert!(container.is_enabled());
        assert!(container.error().is_none());

        // on_unload fails but is swallowed
        container.set_enabled(false);
        assert!(!container.is_enabled());
        assert!(container.is_loaded());

        container.set_enabled(true);
        assert!(container.is_enabled());
        assert_eq!(LOADS.load(Ordering::SeqCst) - before, 2);
    }

    #[test]
    fn test_unavailable_in_ui_is_not_an_error() {
        let file = extension_file("__only_for__ = 'gtk'\n");
        let mut loader = StaticLoader::new();
        loader.register::<Quiet>("gtk_only");
        let mut container = ExtensionContainer::new(
            "gtk_only",
            Some(file.path().to_path_buf()),
            services(loader, cli()),
        );

        container.set_enabled(true);

        assert!(!container.is_loaded());
        assert!(!container.is_enabled());
        assert!(container.error().is_none());
    }

    #[test]
    fn test_missing_module_is_normalized() {
        let mut loader = StaticLoader::new();
        loader.register_failure("needs_lib", |req| {
            ExtensionError::import(req.basename, "libmissing.so.1")
        });
        let mut container = ExtensionContainer::new("needs_lib", None, services(loader, cli()));

        container.set_enabled(true);

        assert!(!container.is_enabled());
        let error = container.error().unwrap();
        assert!(error.is_missing_module());
        assert_eq!(error.to_string(), "Module not found: libmissing.so.1");
    }

    #[test]
    fn test_other_load_errors_are_kept_verbatim() {
        let mut container =
            ExtensionContainer::new("unknown", None, services(StaticLoader::new(), cli()));

        container.set_enabled(true);

        assert!(!container.is_enabled());
        assert!(matches!(
            container.error().map(|e| e.as_ref()),
            Some(ExtensionError::NotFound(_))
        ));
    }

    #[test]
    fn test_constructor_panic_is_captured() {
        let mut loader = StaticLoader::new();
        loader.register::<Panicking>("panicking");
        let mut container = ExtensionContainer::new("panicking", None, services(loader, cli()));

        container.set_enabled(true);

        assert!(!container.is_enabled());
        assert!(!container.is_loaded());
        assert!(matches!(
            container.error().map(|e| e.as_ref()),
            Some(ExtensionError::Panicked(msg)) if msg.contains("constructor exploded")
        ));
    }

    #[test]
    fn test_defaults_registered_on_load() {
        let defaults: Table = toml::from_str("size = 500\nname = \"cover.jpg\"").unwrap();
        let mut loader = StaticLoader::new();
        loader.register_with_defaults::<Quiet>("counting", defaults.clone());
        let services = services(loader, cli());
        services.config.set("extensions.counting.size", 250i64).unwrap();

        let mut container = ExtensionContainer::new("counting", None, services.clone());
        container.set_enabled(true);

        assert_eq!(container.default_config(), Some(&defaults));
        assert_eq!(container.config().get::<i64>("size"), Some(250));
        assert_eq!(
            container.config().get::<String>("name"),
            Some("cover.jpg".to_string())
        );
    }

    #[test]
    fn test_basename_keys_the_loader() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("10_ordered.so");
        std::fs::write(&path, b"").unwrap();

        let mut loader = StaticLoader::new();
        loader.register::<Quiet>("10_ordered");
        let mut container = ExtensionContainer::new("ordered", Some(path), services(loader, cli()));

        container.set_enabled(true);
        assert!(container.is_enabled());
    }

    #[test]
    fn test_info_snapshot() {
        let file = extension_file("__description__ = 'Does things'\n__mandatory_in__ = 'cli'\n");
        let container = ExtensionContainer::new(
            "snap",
            Some(file.path().to_path_buf()),
            services(StaticLoader::new(), cli()),
        );

        let info = container.info();
        assert_eq!(info.title, "snap");
        assert_eq!(info.description, "Does things");
        assert!(info.mandatory);
        assert!(!info.unavailable);
        assert_eq!(info.metadata[0], ("title".to_string(), "snap".to_string()));
    }
}
