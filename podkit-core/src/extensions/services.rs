//! Environment shared by the manager and every container

use std::sync::Arc;

use podkit_extension_api::ConfigStore;

use super::loader::ExtensionLoader;
use super::ui::UiContext;

/// Translation hook applied to localized metadata and labels
pub type Translator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// What a container needs from the host
pub struct HostServices {
    pub ui: UiContext,
    pub config: ConfigStore,
    pub loader: Arc<dyn ExtensionLoader>,
    pub translator: Translator,
}

impl HostServices {
    /// Services without translation
    pub fn new(ui: UiContext, config: ConfigStore, loader: Arc<dyn ExtensionLoader>) -> Self {
        Self {
            ui,
            config,
            loader,
            translator: Arc::new(str::to_string),
        }
    }

    /// Replace the translation function
    pub fn with_translator(mut self, translator: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    pub fn translate(&self, text: &str) -> String {
        (self.translator)(text)
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("ui", &self.ui)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
