//! ExtensionManager - discovery, enablement policy and event dispatch

use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use regex::Regex;

use podkit_extension_api::{
    ChannelAction, ChannelSettingsTab, ENABLED_KEY, Episode, EpisodesAction, Extension,
    ExtensionError, HookResult, MenuAction, ObserverId, Podcast, PodcastModel, PreferencesTab,
    SyncDevice, UiCallbacks,
};

use super::container::{ExtensionContainer, ExtensionInfo};
use super::hooks::{Hook, Reply, fan_out};
use super::services::HostServices;

/// Explicit whitespace-separated list of extension files
pub const EXTENSIONS_ENV: &str = "PODKIT_EXTENSIONS";

/// Any non-empty value disables all extensions
pub const DISABLE_EXTENSIONS_ENV: &str = "PODKIT_DISABLE_EXTENSIONS";

static ORDERING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]*_").expect("ordering prefix pattern is valid"));

/// Where the manager looks for extensions
#[derive(Debug, Clone)]
pub struct ExtensionManagerConfig {
    /// Extensions shipped with the application
    pub builtin_dir: PathBuf,
    /// Extensions installed by the user; these override built-ins
    pub user_dir: PathBuf,
    /// Explicit files to use instead of scanning the directories
    pub filenames: Vec<PathBuf>,
    /// Skip discovery entirely
    pub disabled: bool,
}

impl Default for ExtensionManagerConfig {
    fn default() -> Self {
        Self {
            builtin_dir: podkit_paths::builtin_extensions_dir(),
            user_dir: podkit_paths::user_extensions_dir(),
            filenames: Vec::new(),
            disabled: false,
        }
    }
}

impl ExtensionManagerConfig {
    /// Defaults, overridden by `PODKIT_EXTENSIONS` and
    /// `PODKIT_DISABLE_EXTENSIONS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(list) = std::env::var(EXTENSIONS_ENV) {
            config.filenames = list.split_whitespace().map(PathBuf::from).collect();
        }
        config.disabled = std::env::var(DISABLE_EXTENSIONS_ENV).is_ok_and(|v| !v.is_empty());
        config
    }
}

/// Extension name for a file: stem without the numeric ordering prefix
pub fn extension_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(ORDERING_PREFIX.replace(stem, "").into_owned())
}

/// Candidate extensions as (name, file), sorted by file.
///
/// Later files replace earlier ones with the same name, so user
/// extensions override built-ins.
pub fn find_extensions(config: &ExtensionManagerConfig) -> Vec<(String, PathBuf)> {
    let filenames = if config.filenames.is_empty() {
        let mut found = list_libraries(&config.builtin_dir);
        found.extend(list_libraries(&config.user_dir));
        found
    } else {
        config.filenames.clone()
    };

    let mut extensions: BTreeMap<String, PathBuf> = BTreeMap::new();
    for filename in filenames {
        if filename.as_os_str().is_empty() || !filename.exists() {
            tracing::info!(filename = %filename.display(), "Skipping non-existing file");
            continue;
        }
        if let Some(name) = extension_name(&filename) {
            extensions.insert(name, filename);
        }
    }

    let mut sorted: Vec<(String, PathBuf)> = extensions.into_iter().collect();
    sorted.sort_by(|a, b| a.1.cmp(&b.1));
    sorted
}

fn list_libraries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::debug!(dir = %dir.display(), "Extension directory does not exist");
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|e| e.to_str())
                    == Some(std::env::consts::DLL_EXTENSION)
        })
        .collect();
    found.sort();
    found
}

fn enabled_names(value: toml::Value) -> Result<Vec<String>, toml::de::Error> {
    value.try_into()
}

struct ManagerShared {
    containers: Mutex<Vec<ExtensionContainer>>,
    /// Set when the enabled-set changed while the containers were busy
    pending: AtomicBool,
    services: Arc<HostServices>,
}

impl ManagerShared {
    fn lock(&self) -> MutexGuard<'_, Vec<ExtensionContainer>> {
        self.containers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a new enabled-set, or defer it if the containers are in use
    fn enabled_changed(&self, names: &[String]) {
        let failed = {
            let mut containers = match self.containers.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    tracing::debug!("Extension list busy, deferring enabled-set change");
                    self.defer();
                    return;
                }
            };
            self.reconcile(&mut containers, names)
        };

        if !failed.is_empty() {
            self.forget(&failed);
        }
        self.drain_pending();
    }

    /// Bring containers in line with the enabled-set; returns names that
    /// failed to enable
    fn reconcile(&self, containers: &mut [ExtensionContainer], names: &[String]) -> Vec<String> {
        let ui = &self.services.ui;
        let mut failed = Vec::new();

        for container in containers.iter_mut() {
            let wanted = names.iter().any(|n| n == container.name());
            if wanted == container.is_enabled() {
                continue;
            }
            // mandatory extensions never appear in the enabled-set
            if !wanted && container.metadata().mandatory_in_current_ui(ui) {
                continue;
            }

            tracing::info!(
                extension = %container.name(),
                "Extension is now {}",
                if wanted { "enabled" } else { "disabled" }
            );
            container.set_enabled(wanted);

            if wanted && !container.is_enabled() {
                tracing::warn!(
                    extension = %container.name(),
                    error = ?container.error().map(|e| e.to_string()),
                    "Could not enable extension"
                );
                failed.push(container.name().to_string());
            }
        }

        failed
    }

    /// Drop names from the persisted enabled-set
    fn forget(&self, names: &[String]) {
        let config = &self.services.config;
        let kept: Vec<String> = config
            .enabled_extensions()
            .into_iter()
            .filter(|name| !names.contains(name))
            .collect();
        if let Err(e) = config.set_enabled_extensions(kept) {
            tracing::error!(error = %e, "Cannot update enabled extensions");
        }
    }

    /// Leave the change to the current holder of the list. If the holder
    /// released it before the flag was set, apply the change here.
    fn defer(&self) {
        self.pending.store(true, Ordering::SeqCst);
        if !matches!(self.containers.try_lock(), Err(TryLockError::WouldBlock)) {
            self.drain_pending();
        }
    }

    fn drain_pending(&self) {
        while self.pending.swap(false, Ordering::SeqCst) {
            let names = self.services.config.enabled_extensions();
            self.enabled_changed(&names);
        }
    }
}

/// Owns all extension containers of one host session.
///
/// Reacts to changes of `extensions.enabled` in the configuration store
/// and fans lifecycle events out to enabled extensions.
pub struct ExtensionManager {
    shared: Arc<ManagerShared>,
    observer: ObserverId,
}

impl ExtensionManager {
    /// Discover extensions and enable the ones the user (or the UI) asks for
    pub fn new(config: ExtensionManagerConfig, services: Arc<HostServices>) -> Self {
        let shared = Arc::new(ManagerShared {
            containers: Mutex::new(Vec::new()),
            pending: AtomicBool::new(false),
            services: services.clone(),
        });

        let weak: Weak<ManagerShared> = Arc::downgrade(&shared);
        let observer = services.config.add_observer(move |change| {
            if change.key != ENABLED_KEY {
                return;
            }
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let names = match change.new_value.clone().map(enabled_names) {
                Some(Ok(names)) => names,
                Some(Err(e)) => {
                    tracing::warn!(
                        key = ENABLED_KEY,
                        error = %e,
                        "Enabled extensions setting is not a list of names, treating it as empty"
                    );
                    Vec::new()
                }
                None => Vec::new(),
            };
            shared.enabled_changed(&names);
        });

        let manager = Self { shared, observer };

        if config.disabled {
            tracing::info!("Disabling all extensions (from environment)");
            return manager;
        }

        manager.with_containers(|containers| {
            let enabled = services.config.enabled_extensions();
            let ui = &services.ui;

            for (name, filename) in find_extensions(&config) {
                tracing::debug!(extension = %name, filename = %filename.display(), "Found extension");
                let mut container = ExtensionContainer::new(&name, Some(filename), services.clone());

                let listed = enabled.contains(&name);
                if listed || container.metadata().mandatory_in_current_ui(ui) {
                    container.set_enabled(true);
                }
                if listed && container.metadata().disable_in_current_ui(ui) {
                    container.set_enabled(false);
                }
                containers.push(container);
            }
        });

        manager
    }

    /// Run `f` on the containers, then apply enabled-set changes made meanwhile
    fn with_containers<T>(&self, f: impl FnOnce(&mut Vec<ExtensionContainer>) -> T) -> T {
        let result = {
            let mut containers = self.shared.lock();
            f(&mut containers)
        };
        self.shared.drain_pending();
        result
    }

    pub fn services(&self) -> &Arc<HostServices> {
        &self.shared.services
    }

    /// Extensions the user can toggle in the current UI
    pub fn get_extensions(&self) -> Vec<ExtensionInfo> {
        self.with_containers(|containers| {
            containers
                .iter()
                .map(ExtensionContainer::info)
                .filter(|info| !info.unavailable && !info.mandatory && !info.disabled_in_ui)
                .collect()
        })
    }

    /// Every discovered extension
    pub fn all_extensions(&self) -> Vec<ExtensionInfo> {
        self.with_containers(|containers| containers.iter().map(ExtensionContainer::info).collect())
    }

    /// Look up one extension by name
    pub fn extension(&self, name: &str) -> Option<ExtensionInfo> {
        self.with_containers(|containers| {
            containers
                .iter()
                .find(|c| c.name() == name)
                .map(ExtensionContainer::info)
        })
    }

    /// Add or remove an extension from the persisted enabled-set.
    ///
    /// Returns whether the extension ended up in the requested state.
    pub fn set_extension_enabled(&self, name: &str, enabled: bool) -> Result<bool, ExtensionError> {
        if self.extension(name).is_none() {
            return Err(ExtensionError::NotFound(name.to_string()));
        }

        let config = &self.shared.services.config;
        let mut names = config.enabled_extensions();
        names.retain(|n| n != name);
        if enabled {
            names.push(name.to_string());
        }
        config.set_enabled_extensions(names)?;

        Ok(self
            .extension(name)
            .is_some_and(|info| info.enabled == enabled))
    }

    /// Disable every extension, keeping them in memory
    pub fn shutdown(&self) {
        self.with_containers(|containers| {
            for container in containers.iter_mut() {
                container.set_enabled(false);
            }
        });
    }

    // ─── Event dispatch ─────────────────────────────────────────────

    /// Fan a hook out to every enabled extension and merge the replies
    pub fn dispatch<R: Reply>(
        &self,
        hook: Hook,
        call: impl FnMut(&mut dyn Extension) -> HookResult<Option<R>>,
    ) -> Option<R> {
        tracing::trace!(hook = hook.name(), "Dispatching hook");
        self.with_containers(|containers| fan_out(containers, hook, call))
    }

    fn notify(&self, hook: Hook, mut call: impl FnMut(&mut dyn Extension) -> HookResult) {
        self.dispatch::<()>(hook, |ext| call(ext).map(|()| None));
    }

    fn collect<T>(
        &self,
        hook: Hook,
        mut call: impl FnMut(&mut dyn Extension) -> HookResult<Vec<T>>,
    ) -> Vec<T> {
        self.dispatch(hook, |ext| call(ext).map(Some))
            .unwrap_or_default()
    }

    pub fn on_ui_initialized(&self, model: &dyn PodcastModel, callbacks: &UiCallbacks) {
        self.notify(Hook::UiInitialized, |ext| ext.on_ui_initialized(model, callbacks));
    }

    pub fn on_podcast_subscribe(&self, podcast: &Podcast) {
        self.notify(Hook::PodcastSubscribe, |ext| ext.on_podcast_subscribe(podcast));
    }

    pub fn on_podcast_updated(&self, podcast: &Podcast) {
        self.notify(Hook::PodcastUpdated, |ext| ext.on_podcast_updated(podcast));
    }

    pub fn on_podcast_update_failed(&self, podcast: &Podcast, error: &str) {
        self.notify(Hook::PodcastUpdateFailed, |ext| {
            ext.on_podcast_update_failed(podcast, error)
        });
    }

    pub fn on_podcast_save(&self, podcast: &Podcast) {
        self.notify(Hook::PodcastSave, |ext| ext.on_podcast_save(podcast));
    }

    pub fn on_podcast_delete(&self, podcast: &Podcast) {
        self.notify(Hook::PodcastDelete, |ext| ext.on_podcast_delete(podcast));
    }

    pub fn on_episode_playback(&self, episode: &Episode) {
        self.notify(Hook::EpisodePlayback, |ext| ext.on_episode_playback(episode));
    }

    pub fn on_episode_save(&self, episode: &Episode) {
        self.notify(Hook::EpisodeSave, |ext| ext.on_episode_save(episode));
    }

    pub fn on_episode_downloaded(&self, episode: &Episode) {
        self.notify(Hook::EpisodeDownloaded, |ext| ext.on_episode_downloaded(episode));
    }

    pub fn on_all_episodes_downloaded(&self) {
        self.notify(Hook::AllEpisodesDownloaded, |ext| ext.on_all_episodes_downloaded());
    }

    pub fn on_episode_synced(&self, device: &dyn SyncDevice, episode: &Episode) {
        self.notify(Hook::EpisodeSynced, |ext| ext.on_episode_synced(device, episode));
    }

    pub fn on_all_episodes_synced(&self) {
        self.notify(Hook::AllEpisodesSynced, |ext| ext.on_all_episodes_synced());
    }

    pub fn on_create_menu(&self) -> Vec<MenuAction> {
        self.collect(Hook::CreateMenu, |ext| ext.on_create_menu())
    }

    pub fn on_episodes_context_menu(&self, episodes: &[Episode]) -> Vec<EpisodesAction> {
        self.collect(Hook::EpisodesContextMenu, |ext| {
            ext.on_episodes_context_menu(episodes)
        })
    }

    pub fn on_channel_context_menu(&self, channel: &Podcast) -> Vec<ChannelAction> {
        self.collect(Hook::ChannelContextMenu, |ext| ext.on_channel_context_menu(channel))
    }

    pub fn on_episode_delete(&self, episode: &Episode, filename: &Path) {
        self.notify(Hook::EpisodeDelete, |ext| ext.on_episode_delete(episode, filename));
    }

    pub fn on_episode_removed_from_podcast(&self, episode: &Episode) {
        self.notify(Hook::EpisodeRemovedFromPodcast, |ext| {
            ext.on_episode_removed_from_podcast(episode)
        });
    }

    pub fn on_notification_show(&self, title: &str, message: &str) {
        self.notify(Hook::NotificationShow, |ext| ext.on_notification_show(title, message));
    }

    pub fn on_download_progress(&self, progress: f64) {
        self.notify(Hook::DownloadProgress, |ext| ext.on_download_progress(progress));
    }

    pub fn on_ui_object_available(&self, name: &str, ui_object: &dyn Any) {
        self.notify(Hook::UiObjectAvailable, |ext| ext.on_ui_object_available(name, ui_object));
    }

    pub fn on_application_started(&self) {
        self.notify(Hook::ApplicationStarted, |ext| ext.on_application_started());
    }

    pub fn on_find_partial_downloads_done(&self) {
        self.notify(Hook::FindPartialDownloadsDone, |ext| {
            ext.on_find_partial_downloads_done()
        });
    }

    pub fn on_preferences(&self) -> Vec<PreferencesTab> {
        self.collect(Hook::Preferences, |ext| ext.on_preferences())
    }

    pub fn on_channel_settings(&self, channel: &Podcast) -> Vec<ChannelSettingsTab> {
        self.collect(Hook::ChannelSettings, |ext| ext.on_channel_settings(channel))
    }
}

impl Drop for ExtensionManager {
    fn drop(&mut self) {
        self.shared.services.config.remove_observer(self.observer);
    }
}

impl std::fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("ExtensionManager");
        // dispatch holds the lock; never block here
        if let Ok(containers) = self.shared.containers.try_lock() {
            let names: Vec<&str> = containers.iter().map(ExtensionContainer::name).collect();
            debug.field("extensions", &names);
        }
        debug.finish_non_exhaustive()
    }
}
