//! Hook catalog and the generic fan-out over enabled extensions

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use podkit_extension_api::{Extension, ExtensionError, HookResult};

use super::container::ExtensionContainer;

/// Lifecycle points at which the host calls into extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Hook {
    UiInitialized,
    PodcastSubscribe,
    PodcastUpdated,
    PodcastUpdateFailed,
    PodcastSave,
    PodcastDelete,
    EpisodePlayback,
    EpisodeSave,
    EpisodeDownloaded,
    AllEpisodesDownloaded,
    EpisodeSynced,
    AllEpisodesSynced,
    CreateMenu,
    EpisodesContextMenu,
    ChannelContextMenu,
    EpisodeDelete,
    EpisodeRemovedFromPodcast,
    NotificationShow,
    DownloadProgress,
    UiObjectAvailable,
    ApplicationStarted,
    FindPartialDownloadsDone,
    Preferences,
    ChannelSettings,
}

impl Hook {
    /// Every hook, in catalog order
    pub const ALL: [Hook; 24] = [
        Hook::UiInitialized,
        Hook::PodcastSubscribe,
        Hook::PodcastUpdated,
        Hook::PodcastUpdateFailed,
        Hook::PodcastSave,
        Hook::PodcastDelete,
        Hook::EpisodePlayback,
        Hook::EpisodeSave,
        Hook::EpisodeDownloaded,
        Hook::AllEpisodesDownloaded,
        Hook::EpisodeSynced,
        Hook::AllEpisodesSynced,
        Hook::CreateMenu,
        Hook::EpisodesContextMenu,
        Hook::ChannelContextMenu,
        Hook::EpisodeDelete,
        Hook::EpisodeRemovedFromPodcast,
        Hook::NotificationShow,
        Hook::DownloadProgress,
        Hook::UiObjectAvailable,
        Hook::ApplicationStarted,
        Hook::FindPartialDownloadsDone,
        Hook::Preferences,
        Hook::ChannelSettings,
    ];

    /// Method name on the `Extension` trait
    pub fn name(self) -> &'static str {
        match self {
            Hook::UiInitialized => "on_ui_initialized",
            Hook::PodcastSubscribe => "on_podcast_subscribe",
            Hook::PodcastUpdated => "on_podcast_updated",
            Hook::PodcastUpdateFailed => "on_podcast_update_failed",
            Hook::PodcastSave => "on_podcast_save",
            Hook::PodcastDelete => "on_podcast_delete",
            Hook::EpisodePlayback => "on_episode_playback",
            Hook::EpisodeSave => "on_episode_save",
            Hook::EpisodeDownloaded => "on_episode_downloaded",
            Hook::AllEpisodesDownloaded => "on_all_episodes_downloaded",
            Hook::EpisodeSynced => "on_episode_synced",
            Hook::AllEpisodesSynced => "on_all_episodes_synced",
            Hook::CreateMenu => "on_create_menu",
            Hook::EpisodesContextMenu => "on_episodes_context_menu",
            Hook::ChannelContextMenu => "on_channel_context_menu",
            Hook::EpisodeDelete => "on_episode_delete",
            Hook::EpisodeRemovedFromPodcast => "on_episode_removed_from_podcast",
            Hook::NotificationShow => "on_notification_show",
            Hook::DownloadProgress => "on_download_progress",
            Hook::UiObjectAvailable => "on_ui_object_available",
            Hook::ApplicationStarted => "on_application_started",
            Hook::FindPartialDownloadsDone => "on_find_partial_downloads_done",
            Hook::Preferences => "on_preferences",
            Hook::ChannelSettings => "on_channel_settings",
        }
    }

    /// Argument names passed to the hook
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Hook::UiInitialized => &["model", "callbacks"],
            Hook::PodcastSubscribe
            | Hook::PodcastUpdated
            | Hook::PodcastSave
            | Hook::PodcastDelete => &["podcast"],
            Hook::PodcastUpdateFailed => &["podcast", "error"],
            Hook::EpisodePlayback
            | Hook::EpisodeSave
            | Hook::EpisodeDownloaded
            | Hook::EpisodeRemovedFromPodcast => &["episode"],
            Hook::EpisodeSynced => &["device", "episode"],
            Hook::EpisodesContextMenu => &["episodes"],
            Hook::ChannelContextMenu | Hook::ChannelSettings => &["channel"],
            Hook::EpisodeDelete => &["episode", "filename"],
            Hook::NotificationShow => &["title", "message"],
            Hook::DownloadProgress => &["progress"],
            Hook::UiObjectAvailable => &["name", "ui_object"],
            Hook::AllEpisodesDownloaded
            | Hook::AllEpisodesSynced
            | Hook::CreateMenu
            | Hook::ApplicationStarted
            | Hook::FindPartialDownloadsDone
            | Hook::Preferences => &[],
        }
    }

    /// Whether extensions contribute entries that are concatenated
    pub fn returns_entries(self) -> bool {
        matches!(
            self,
            Hook::CreateMenu
                | Hook::EpisodesContextMenu
                | Hook::ChannelContextMenu
                | Hook::Preferences
                | Hook::ChannelSettings
        )
    }

    /// One-line description of when the hook fires
    pub fn description(self) -> &'static str {
        match self {
            Hook::UiInitialized => "The user interface is initialized",
            Hook::PodcastSubscribe => "The user subscribes to a new podcast feed",
            Hook::PodcastUpdated => "A podcast feed was updated, even without new episodes",
            Hook::PodcastUpdateFailed => "A podcast update failed",
            Hook::PodcastSave => "A podcast is saved to the database",
            Hook::PodcastDelete => "A podcast is deleted from the database",
            Hook::EpisodePlayback => "An episode is played back or opened",
            Hook::EpisodeSave => "An episode is saved to the database",
            Hook::EpisodeDownloaded => "An episode has been downloaded",
            Hook::AllEpisodesDownloaded => "All queued episodes have been downloaded",
            Hook::EpisodeSynced => "An episode has been synced to a device",
            Hook::AllEpisodesSynced => "All episodes have been synchronized",
            Hook::CreateMenu => "The Extras menu is created",
            Hook::EpisodesContextMenu => "The episode list context menu is opened",
            Hook::ChannelContextMenu => "The podcast list context menu is opened",
            Hook::EpisodeDelete => "An episode's downloaded file is about to be deleted",
            Hook::EpisodeRemovedFromPodcast => "An episode is about to be removed from its podcast",
            Hook::NotificationShow => "A notification should be shown",
            Hook::DownloadProgress => "The overall download progress changed",
            Hook::UiObjectAvailable => "A UI-specific object became available",
            Hook::ApplicationStarted => "The application started",
            Hook::FindPartialDownloadsDone => "The startup scan for partial downloads finished",
            Hook::Preferences => "The preferences dialog is opened",
            Hook::ChannelSettings => "A podcast settings dialog is opened",
        }
    }
}

impl From<Hook> for &'static str {
    fn from(hook: Hook) -> Self {
        hook.name()
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How replies of several extensions combine
pub trait Reply {
    fn merge(self, next: Self) -> Self;
}

impl<T> Reply for Vec<T> {
    fn merge(mut self, next: Self) -> Self {
        self.extend(next);
        self
    }
}

impl Reply for () {
    fn merge(self, _next: Self) -> Self {}
}

/// Scalar reply where the last extension to answer wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Last<T>(pub T);

impl<T> Reply for Last<T> {
    fn merge(self, next: Self) -> Self {
        next
    }
}

fn merge<R: Reply>(aggregate: Option<R>, reply: Option<R>) -> Option<R> {
    match (aggregate, reply) {
        (Some(aggregate), Some(reply)) => Some(aggregate.merge(reply)),
        (None, reply) => reply,
        (aggregate, None) => aggregate,
    }
}

/// Run extension code, turning panics into errors
pub(crate) fn guarded<T>(call: impl FnOnce() -> Result<T, ExtensionError>) -> Result<T, ExtensionError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(ExtensionError::from_panic(&*payload)))
}

/// Call a hook on every enabled container in order and merge the replies.
///
/// A failing or panicking extension is logged and skipped.
pub(crate) fn fan_out<R, F>(containers: &mut [ExtensionContainer], hook: Hook, mut call: F) -> Option<R>
where
    R: Reply,
    F: FnMut(&mut dyn Extension) -> HookResult<Option<R>>,
{
    let mut aggregate = None;
    for container in containers.iter_mut() {
        let Some(module) = container.active_module() else {
            continue;
        };
        match guarded(|| call(module)) {
            Ok(reply) => aggregate = merge(aggregate, reply),
            Err(e) => {
                tracing::error!(
                    extension = %container.name(),
                    filename = ?container.filename(),
                    hook = hook.name(),
                    error = %e,
                    "Error in extension hook"
                );
            }
        }
    }
    aggregate
}
