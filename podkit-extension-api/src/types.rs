//! Host model types passed to extension hooks

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A subscribed podcast feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    /// Feed URL
    pub url: String,
    /// Display title
    pub title: String,
    /// Cover art path without file extension, as stored by the host
    pub cover_file: Option<PathBuf>,
    /// Folder holding downloaded episodes
    pub download_folder: Option<PathBuf>,
}

/// One episode of a podcast
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Media URL
    pub url: String,
    /// Display title
    pub title: String,
    /// The podcast this episode belongs to
    pub podcast: Podcast,
    /// Downloaded media file, if any
    pub local_filename: Option<PathBuf>,
}

impl Episode {
    /// Folder containing the downloaded media file
    pub fn local_folder(&self) -> Option<&Path> {
        self.local_filename.as_deref().and_then(Path::parent)
    }
}

/// A device episodes are synchronized to
pub trait SyncDevice: Send + Sync {
    /// Human-readable device name
    fn name(&self) -> &str;

    /// Folder on the device an episode was synced into.
    ///
    /// Devices that are not file based return `None`.
    fn episode_folder_on_device(&self, _episode: &Episode) -> Option<PathBuf> {
        None
    }
}

/// Read access to the host's podcast list
pub trait PodcastModel: Send + Sync {
    /// All subscribed podcasts
    fn podcasts(&self) -> Vec<Podcast>;
}

/// Callbacks handed to extensions when the UI comes up
#[derive(Clone)]
pub struct UiCallbacks {
    /// Refresh one podcast feed
    pub update_podcast: Arc<dyn Fn(&Podcast) + Send + Sync>,
    /// Queue an episode for download
    pub download_episode: Arc<dyn Fn(&Episode) + Send + Sync>,
}

impl std::fmt::Debug for UiCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiCallbacks").finish_non_exhaustive()
    }
}

/// An opaque UI panel built by an extension (toolkit specific)
pub type Panel = Box<dyn Any + Send>;

/// A labelled callback contributed to a menu or dialog
pub struct MenuEntry<F: ?Sized> {
    /// Label shown to the user
    pub label: String,
    /// Invoked when the entry is activated
    pub callback: Arc<F>,
}

impl<F: ?Sized> Clone for MenuEntry<F> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            callback: self.callback.clone(),
        }
    }
}

impl<F: ?Sized> std::fmt::Debug for MenuEntry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuEntry")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Entry for the Extras menu
pub type MenuAction = MenuEntry<dyn Fn() + Send + Sync>;
/// Entry for the episode list context menu
pub type EpisodesAction = MenuEntry<dyn Fn(&[Episode]) + Send + Sync>;
/// Entry for the podcast list context menu
pub type ChannelAction = MenuEntry<dyn Fn(&Podcast) + Send + Sync>;
/// Extra tab for the preferences dialog
pub type PreferencesTab = MenuEntry<dyn Fn() -> Panel + Send + Sync>;
/// Extra tab for the podcast settings dialog
pub type ChannelSettingsTab = MenuEntry<dyn Fn(&Podcast) -> Panel + Send + Sync>;

impl MenuAction {
    /// Create an Extras menu entry
    pub fn new(label: impl Into<String>, callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }
}

impl EpisodesAction {
    /// Create an episode context menu entry
    pub fn new(
        label: impl Into<String>,
        callback: impl Fn(&[Episode]) + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }
}

impl ChannelAction {
    /// Create a podcast context menu entry
    pub fn new(
        label: impl Into<String>,
        callback: impl Fn(&Podcast) + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }
}

impl PreferencesTab {
    /// Create a preferences tab
    pub fn new(
        label: impl Into<String>,
        callback: impl Fn() -> Panel + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }
}

impl ChannelSettingsTab {
    /// Create a podcast settings tab
    pub fn new(
        label: impl Into<String>,
        callback: impl Fn(&Podcast) -> Panel + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }
}
