//! podkit-extension-api - Extension API for the podkit podcast client
//!
//! This crate provides the traits and types needed to write extensions for
//! podkit. Extensions are native Rust dynamic libraries that react to
//! lifecycle events of the host (podcast updates, downloads, device syncs)
//! and can contribute menu entries and preference tabs.
//!
//! # Example
//!
//! ```ignore
//! use podkit_extension_api::{
//!     CreateExtension, Extension, ExtensionContext, ExtensionError, Episode, HookResult,
//!     export_extension, extension_metadata,
//! };
//!
//! extension_metadata! {
//!     title = _("Episode logger"),
//!     description = "Logs every downloaded episode",
//!     only_for = "gtk, cli",
//! }
//!
//! pub struct EpisodeLogger {
//!     ctx: ExtensionContext,
//! }
//!
//! impl CreateExtension for EpisodeLogger {
//!     fn create(ctx: ExtensionContext) -> Result<Self, ExtensionError> {
//!         Ok(Self { ctx })
//!     }
//! }
//!
//! impl Extension for EpisodeLogger {
//!     fn on_episode_downloaded(&mut self, episode: &Episode) -> HookResult {
//!         self.ctx.log_info(&format!("Downloaded {}", episode.title));
//!         Ok(())
//!     }
//! }
//!
//! export_extension!(EpisodeLogger, default_config = "verbose = false");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod types;

use std::any::Any;
use std::path::Path;

pub use config::{
    ConfigChange, ConfigSection, ConfigStore, ENABLED_KEY, EXTENSIONS_NAMESPACE, Observer,
    ObserverId,
};
pub use context::{ExtensionContext, require_any_command, require_command};
pub use error::{ExtensionError, MissingDependency};
pub use types::*;

/// Current extension API version. Extensions must match this exactly.
pub const API_VERSION: u32 = 1;

/// Result type of every hook
pub type HookResult<T = ()> = Result<T, ExtensionError>;

/// The extension trait - implement this to create a podkit extension.
///
/// Every hook has a default no-op implementation, so extensions only
/// override the hooks they care about. Errors returned from hooks (and
/// panics) are logged by the host and never reach other extensions.
pub trait Extension: Send + Sync {
    /// Called every time the extension is enabled
    fn on_load(&mut self) -> HookResult {
        Ok(())
    }

    /// Called every time the extension is disabled and on shutdown
    fn on_unload(&mut self) -> HookResult {
        Ok(())
    }

    // ─── Lifecycle Hooks (default no-ops) ───────────────────────────

    /// Called when the user interface is initialized
    fn on_ui_initialized(
        &mut self,
        _model: &dyn PodcastModel,
        _callbacks: &UiCallbacks,
    ) -> HookResult {
        Ok(())
    }

    /// Called when the user subscribes to a new podcast feed
    fn on_podcast_subscribe(&mut self, _podcast: &Podcast) -> HookResult {
        Ok(())
    }

    /// Called when a podcast feed was updated, even without new episodes
    fn on_podcast_updated(&mut self, _podcast: &Podcast) -> HookResult {
        Ok(())
    }

    /// Called when a podcast update failed
    fn on_podcast_update_failed(&mut self, _podcast: &Podcast, _error: &str) -> HookResult {
        Ok(())
    }

    /// Called when a podcast is saved to the database
    fn on_podcast_save(&mut self, _podcast: &Podcast) -> HookResult {
        Ok(())
    }

    /// Called when a podcast is deleted from the database
    fn on_podcast_delete(&mut self, _podcast: &Podcast) -> HookResult {
        Ok(())
    }

    /// Called when an episode is played back or opened
    fn on_episode_playback(&mut self, _episode: &Episode) -> HookResult {
        Ok(())
    }

    /// Called when an episode is saved to the database
    fn on_episode_save(&mut self, _episode: &Episode) -> HookResult {
        Ok(())
    }

    /// Called when an episode has been downloaded
    fn on_episode_downloaded(&mut self, _episode: &Episode) -> HookResult {
        Ok(())
    }

    /// Called when all queued episodes have been downloaded
    fn on_all_episodes_downloaded(&mut self) -> HookResult {
        Ok(())
    }

    /// Called when an episode has been synced to a device
    fn on_episode_synced(&mut self, _device: &dyn SyncDevice, _episode: &Episode) -> HookResult {
        Ok(())
    }

    /// Called when all episodes have been synchronized
    fn on_all_episodes_synced(&mut self) -> HookResult {
        Ok(())
    }

    /// Called when the Extras menu is created
    fn on_create_menu(&mut self) -> HookResult<Vec<MenuAction>> {
        Ok(Vec::new())
    }

    /// Called when the episode list context menu is opened
    fn on_episodes_context_menu(&mut self, _episodes: &[Episode]) -> HookResult<Vec<EpisodesAction>> {
        Ok(Vec::new())
    }

    /// Called when the podcast list context menu is opened
    fn on_channel_context_menu(&mut self, _channel: &Podcast) -> HookResult<Vec<ChannelAction>> {
        Ok(Vec::new())
    }

    /// Called before an episode's downloaded file is deleted
    fn on_episode_delete(&mut self, _episode: &Episode, _filename: &Path) -> HookResult {
        Ok(())
    }

    /// Called before an episode is removed from its podcast
    fn on_episode_removed_from_podcast(&mut self, _episode: &Episode) -> HookResult {
        Ok(())
    }

    /// Called when a notification should be shown
    fn on_notification_show(&mut self, _title: &str, _message: &str) -> HookResult {
        Ok(())
    }

    /// Called when the overall download progress (0..1) changes
    fn on_download_progress(&mut self, _progress: f64) -> HookResult {
        Ok(())
    }

    /// Called when a UI-specific object becomes available
    fn on_ui_object_available(&mut self, _name: &str, _ui_object: &dyn Any) -> HookResult {
        Ok(())
    }

    /// Called once the application started, after the UI hooks
    fn on_application_started(&mut self) -> HookResult {
        Ok(())
    }

    /// Called after the startup scan for partial downloads
    fn on_find_partial_downloads_done(&mut self) -> HookResult {
        Ok(())
    }

    /// Called when the preferences dialog is opened
    fn on_preferences(&mut self) -> HookResult<Vec<PreferencesTab>> {
        Ok(Vec::new())
    }

    /// Called when a podcast's settings dialog is opened
    fn on_channel_settings(&mut self, _channel: &Podcast) -> HookResult<Vec<ChannelSettingsTab>> {
        Ok(Vec::new())
    }
}

/// Construction of the extension's entry-point type from its context
pub trait CreateExtension: Extension + Sized + 'static {
    /// Build the extension. Failing here (for example with a
    /// [`MissingDependency`]) leaves the extension disabled.
    fn create(ctx: ExtensionContext) -> Result<Self, ExtensionError>;
}

/// Symbols exported by [`export_extension!`] and resolved by the host
pub mod abi {
    use super::{Extension, ExtensionContext, ExtensionError};

    /// `extern "C" fn() -> u32`
    pub const API_VERSION_SYMBOL: &[u8] = b"_podkit_extension_api_version";
    /// `extern "C" fn() -> *const c_char` (NUL-terminated TOML)
    pub const DEFAULT_CONFIG_SYMBOL: &[u8] = b"_podkit_extension_default_config";
    /// `extern "C" fn(&ExtensionContext) -> *mut CreateResult`
    pub const CREATE_SYMBOL: &[u8] = b"_podkit_extension_create";

    /// Outcome of instantiating an extension
    pub type CreateResult = Result<Box<dyn Extension>, ExtensionError>;

    pub type ApiVersionFn = extern "C" fn() -> u32;
    pub type DefaultConfigFn = extern "C" fn() -> *const std::ffi::c_char;
    pub type CreateFn = extern "C" fn(&ExtensionContext) -> *mut CreateResult;
}

/// Export an extension type for dynamic loading.
///
/// # Usage
///
/// ```ignore
/// podkit_extension_api::export_extension!(MyExtension);
/// podkit_extension_api::export_extension!(MyExtension, default_config = "size = 500");
/// ```
///
/// # Generated Functions
///
/// - `_podkit_extension_api_version()`: Returns the API version
/// - `_podkit_extension_default_config()`: Returns the declared default settings
/// - `_podkit_extension_create()`: Creates a new extension instance
#[macro_export]
macro_rules! export_extension {
    ($ext:ty) => {
        $crate::export_extension!($ext, default_config = "");
    };
    ($ext:ty, default_config = $toml:literal) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _podkit_extension_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _podkit_extension_default_config() -> *const ::std::ffi::c_char {
            concat!($toml, "\0").as_ptr().cast()
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _podkit_extension_create(
            ctx: &$crate::ExtensionContext,
        ) -> *mut $crate::abi::CreateResult {
            let ctx = ctx.clone();
            let created = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(move || {
                <$ext as $crate::CreateExtension>::create(ctx)
                    .map(|ext| ::std::boxed::Box::new(ext) as ::std::boxed::Box<dyn $crate::Extension>)
            }))
            .unwrap_or_else(|payload| Err($crate::ExtensionError::from_panic(&*payload)));
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(created))
        }
    };
}

/// Embed declarative metadata in an extension library.
///
/// The fields become `__key__ = 'value'` lines (or `__key__ = _('value')`
/// for translatable values) stored verbatim in the library, where the host
/// finds them by scanning the file without loading it.
///
/// ```ignore
/// extension_metadata! {
///     title = _("Rockbox Cover Art Sync"),
///     only_for = "gtk, cli",
///     category = "post-download",
/// }
/// ```
#[macro_export]
macro_rules! extension_metadata {
    (@collect [$($out:tt)*]) => {
        #[doc(hidden)]
        #[used]
        #[allow(non_upper_case_globals)]
        #[unsafe(no_mangle)]
        pub static _podkit_extension_metadata: &str = concat!($($out)*);
    };
    (@collect [$($out:tt)*] $key:ident = _($value:literal) $(, $($rest:tt)*)?) => {
        $crate::extension_metadata!(
            @collect [$($out)* "__", stringify!($key), "__ = _('", $value, "')\n",]
            $($($rest)*)?
        );
    };
    (@collect [$($out:tt)*] $key:ident = $value:literal $(, $($rest:tt)*)?) => {
        $crate::extension_metadata!(
            @collect [$($out)* "__", stringify!($key), "__ = '", $value, "'\n",]
            $($($rest)*)?
        );
    };
    ($($fields:tt)*) => {
        $crate::extension_metadata!(@collect [] $($fields)*);
    };
}
