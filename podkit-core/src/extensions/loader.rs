//! Loading extension code units
//!
//! [`DylibLoader`] opens compiled extension libraries, [`StaticLoader`]
//! serves extensions compiled into the host.

use std::collections::HashMap;
use std::ffi::CStr;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use libloading::Library;
use regex::Regex;
use toml::Table;

use podkit_extension_api::abi::{
    API_VERSION_SYMBOL, ApiVersionFn, CREATE_SYMBOL, CreateFn, CreateResult,
    DEFAULT_CONFIG_SYMBOL, DefaultConfigFn,
};
use podkit_extension_api::{API_VERSION, CreateExtension, Extension, ExtensionContext, ExtensionError};

/// What to load
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Extension name (ordering prefix stripped)
    pub name: &'a str,
    /// File stem of the extension file, or the name for code-only extensions
    pub basename: &'a str,
    /// Extension file, if any
    pub path: Option<&'a Path>,
}

type Factory = Box<dyn FnOnce(&ExtensionContext) -> CreateResult + Send>;

/// A loaded, not yet instantiated extension
pub struct ExtensionUnit {
    default_config: Table,
    factory: Factory,
    library: Option<Library>,
}

impl ExtensionUnit {
    /// Unit backed by an in-process factory
    pub fn new(
        default_config: Table,
        factory: impl FnOnce(&ExtensionContext) -> CreateResult + Send + 'static,
    ) -> Self {
        Self {
            default_config,
            factory: Box::new(factory),
            library: None,
        }
    }

    /// Settings defaults declared by the extension
    pub fn default_config(&self) -> &Table {
        &self.default_config
    }

    /// Create the extension instance
    pub fn instantiate(self, ctx: &ExtensionContext) -> Result<LoadedExtension, ExtensionError> {
        let instance = (self.factory)(ctx)?;
        Ok(LoadedExtension {
            instance,
            _library: self.library,
        })
    }
}

impl std::fmt::Debug for ExtensionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionUnit")
            .field("default_config", &self.default_config)
            .field("dynamic", &self.library.is_some())
            .finish_non_exhaustive()
    }
}

/// An extension instance together with the code backing it
pub struct LoadedExtension {
    // Declared first: the instance must drop before its library unloads.
    instance: Box<dyn Extension>,
    _library: Option<Library>,
}

impl LoadedExtension {
    pub fn instance(&mut self) -> &mut dyn Extension {
        self.instance.as_mut()
    }
}

/// Source of extension code units
pub trait ExtensionLoader: Send + Sync {
    /// Load the unit for one extension
    fn load(&self, request: &LoadRequest<'_>) -> Result<ExtensionUnit, ExtensionError>;
}

// ─── Dynamic libraries ──────────────────────────────────────────────────

static MISSING_SHARED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^\s:]+): cannot open shared object file|Library not loaded: (\S+)")
        .expect("shared object pattern is valid")
});

/// Loads extensions compiled with `export_extension!` as dynamic libraries.
///
/// Each library is opened from a private temporary copy so that two files
/// with the same name never alias inside the dynamic linker. The copy is
/// removed as soon as the library is open (or failed to open).
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl DylibLoader {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, basename: &str, path: &Path) -> Result<Library, ExtensionError> {
        let shadow = tempfile::Builder::new()
            .prefix(&format!("{}-", basename))
            .suffix(&format!(".{}", std::env::consts::DLL_EXTENSION))
            .tempfile()?;
        std::fs::copy(path, shadow.path())?;

        // SAFETY: Loading a library runs its initializers. The user asked
        // for this extension to be enabled.
        let opened = unsafe { Library::new(shadow.path()) };
        drop(shadow);

        opened.map_err(|e| classify_open_error(basename, &e))
    }
}

impl ExtensionLoader for DylibLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<ExtensionUnit, ExtensionError> {
        let path = request
            .path
            .ok_or_else(|| ExtensionError::NotFound(request.name.to_string()))?;
        let library = self.open(request.basename, path)?;

        let invalid = |reason: String| ExtensionError::Invalid {
            unit: request.basename.to_string(),
            reason,
        };

        // SAFETY: The symbols are generated by export_extension! with these
        // exact signatures.
        let api_version: ApiVersionFn = unsafe { library.get::<ApiVersionFn>(API_VERSION_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|e| invalid(format!("missing API version: {}", e)))?;

        let found = api_version();
        if found != API_VERSION {
            return Err(ExtensionError::ApiVersionMismatch {
                expected: API_VERSION,
                found,
            });
        }

        let default_config = match unsafe { library.get::<DefaultConfigFn>(DEFAULT_CONFIG_SYMBOL) } {
            Ok(symbol) => {
                let raw = symbol();
                if raw.is_null() {
                    Table::new()
                } else {
                    // SAFETY: Points at a NUL-terminated static string.
                    let text = unsafe { CStr::from_ptr(raw) }.to_string_lossy();
                    toml::from_str(&text)
                        .map_err(|e| invalid(format!("invalid default config: {}", e)))?
                }
            }
            Err(_) => Table::new(),
        };

        let create: CreateFn = unsafe { library.get::<CreateFn>(CREATE_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|e| invalid(format!("missing entry point: {}", e)))?;

        let unit = request.basename.to_string();
        let factory = move |ctx: &ExtensionContext| {
            let raw = create(ctx);
            if raw.is_null() {
                return Err(ExtensionError::Invalid {
                    unit,
                    reason: "entry point returned null".to_string(),
                });
            }
            // SAFETY: Allocated with Box::into_raw by the entry point.
            *unsafe { Box::from_raw(raw) }
        };

        tracing::debug!(unit = %request.basename, path = %path.display(), "Extension library opened");

        Ok(ExtensionUnit {
            default_config,
            factory: Box::new(factory),
            library: Some(library),
        })
    }
}

/// Map dynamic linker failures about unresolved dependencies to import errors
fn classify_open_error(basename: &str, error: &libloading::Error) -> ExtensionError {
    let message = error.to_string();
    let module = MISSING_SHARED_OBJECT.captures(&message).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    });

    ExtensionError::Import {
        unit: basename.to_string(),
        module,
        message,
    }
}

// ─── In-process registry ────────────────────────────────────────────────

type StaticFactory = Arc<dyn Fn(&ExtensionContext) -> CreateResult + Send + Sync>;
type LoadFailure = Arc<dyn Fn(&LoadRequest<'_>) -> ExtensionError + Send + Sync>;

enum StaticEntry {
    Factory {
        default_config: Table,
        create: StaticFactory,
    },
    Failure(LoadFailure),
}

/// Registry of extensions compiled into the host, keyed by file basename
/// or by extension name
#[derive(Default)]
pub struct StaticLoader {
    entries: HashMap<String, StaticEntry>,
    fallback: Option<Arc<dyn ExtensionLoader>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that defers unknown units to another loader
    pub fn with_fallback(fallback: Arc<dyn ExtensionLoader>) -> Self {
        Self {
            entries: HashMap::new(),
            fallback: Some(fallback),
        }
    }

    /// Register an extension type
    pub fn register<E: CreateExtension>(&mut self, key: impl Into<String>) -> &mut Self {
        self.register_with_defaults::<E>(key, Table::new())
    }

    /// Register an extension type that declares settings defaults
    pub fn register_with_defaults<E: CreateExtension>(
        &mut self,
        key: impl Into<String>,
        default_config: Table,
    ) -> &mut Self {
        self.register_fn(key, default_config, |ctx| {
            E::create(ctx.clone()).map(|ext| Box::new(ext) as Box<dyn Extension>)
        })
    }

    /// Register a factory function
    pub fn register_fn(
        &mut self,
        key: impl Into<String>,
        default_config: Table,
        create: impl Fn(&ExtensionContext) -> CreateResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.entries.insert(
            key.into(),
            StaticEntry::Factory {
                default_config,
                create: Arc::new(create),
            },
        );
        self
    }

    /// Register a unit whose loading always fails
    pub fn register_failure(
        &mut self,
        key: impl Into<String>,
        failure: impl Fn(&LoadRequest<'_>) -> ExtensionError + Send + Sync + 'static,
    ) -> &mut Self {
        self.entries
            .insert(key.into(), StaticEntry::Failure(Arc::new(failure)));
        self
    }

    /// Whether a unit is registered under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl ExtensionLoader for StaticLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<ExtensionUnit, ExtensionError> {
        let entry = self
            .entries
            .get(request.basename)
            .or_else(|| self.entries.get(request.name));

        match entry {
            Some(StaticEntry::Factory {
                default_config,
                create,
            }) => {
                let create = create.clone();
                Ok(ExtensionUnit::new(default_config.clone(), move |ctx| create(ctx)))
            }
            Some(StaticEntry::Failure(failure)) => Err(failure(request)),
            None => match &self.fallback {
                Some(fallback) => fallback.load(request),
                None => Err(ExtensionError::NotFound(request.basename.to_string())),
            },
        }
    }
}

impl std::fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("StaticLoader")
            .field("entries", &keys)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
