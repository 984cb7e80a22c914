//! Rockbox Cover Art - copies podcast cover art to file based players
//!
//! After an episode is synced to a device that stores episodes in folders,
//! the podcast's `folder.jpg` is copied next to it under the name the
//! player looks for (`cover.jpg` by default).
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p ~/.local/share/podkit/Extensions
//! cp target/release/librockbox_coverart.so ~/.local/share/podkit/Extensions/rockbox_coverart.so
//! podkit extension enable rockbox_coverart
//! ```

use std::path::{Path, PathBuf};

use podkit_extension_api::{
    CreateExtension, Episode, Extension, ExtensionContext, ExtensionError, HookResult,
    PreferencesTab, SyncDevice, export_extension, extension_metadata,
};

extension_metadata! {
    title = _("Rockbox Cover Art Sync"),
    description = _("Copy Cover Art To Rockboxed Media Player"),
    only_for = "gtk, cli",
    authors = "podkit contributors",
    category = "post-download",
}

const DEFAULT_ART_NAME: &str = "cover.jpg";

/// Art file the podcast download folder is expected to contain
const SOURCE_ART_NAME: &str = "folder.jpg";

/// Settings shown in the preferences tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArtPreferences {
    pub art_name_on_device: String,
}

pub struct RockboxCoverArt {
    ctx: ExtensionContext,
}

impl RockboxCoverArt {
    fn art_name(&self) -> String {
        device_art_name(
            &self
                .ctx
                .config()
                .get_or("art_name_on_device", DEFAULT_ART_NAME.to_string()),
        )
    }

    /// Copy the podcast art into `device_folder` unless it is already there
    fn copy_art(&self, episode_folder: &Path, device_folder: &Path) -> Result<Option<PathBuf>, ExtensionError> {
        let source = episode_folder.join(SOURCE_ART_NAME);
        let target = device_folder.join(self.art_name());

        if !source.is_file() || target.exists() {
            return Ok(None);
        }

        std::fs::copy(&source, &target)?;
        Ok(Some(target))
    }
}

/// Normalize the configured art name: only JPEG and PNG are supported,
/// anything else becomes a `.jpg` with the same stem.
pub fn device_art_name(configured: &str) -> String {
    let (stem, extension) = match configured.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, extension),
        _ => (configured, ""),
    };

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" => configured.to_string(),
        _ if stem.is_empty() => DEFAULT_ART_NAME.to_string(),
        _ => format!("{}.jpg", stem),
    }
}

impl CreateExtension for RockboxCoverArt {
    fn create(ctx: ExtensionContext) -> Result<Self, ExtensionError> {
        Ok(Self { ctx })
    }
}

impl Extension for RockboxCoverArt {
    fn on_load(&mut self) -> HookResult {
        self.ctx
            .log_debug(&format!("Syncing cover art as {}", self.art_name()));
        Ok(())
    }

    fn on_episode_synced(&mut self, device: &dyn SyncDevice, episode: &Episode) -> HookResult {
        let Some(device_folder) = device.episode_folder_on_device(episode) else {
            return Ok(());
        };
        let Some(episode_folder) = episode.local_folder() else {
            return Ok(());
        };

        if let Some(target) = self.copy_art(episode_folder, &device_folder)? {
            self.ctx.log_info(&format!(
                "Synced cover art for {} to {}",
                episode.podcast.title,
                target.display()
            ));
        }
        Ok(())
    }

    fn on_preferences(&mut self) -> HookResult<Vec<PreferencesTab>> {
        let art_name = self.art_name();
        Ok(vec![PreferencesTab::new("Rockbox Coverart", move || {
            Box::new(CoverArtPreferences {
                art_name_on_device: art_name.clone(),
            })
        })])
    }
}

export_extension!(RockboxCoverArt, default_config = "art_name_on_device = \"cover.jpg\"\n");
