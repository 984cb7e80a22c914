//! Loads the rockbox-coverart demo as a real dynamic library
//!
//! The demo crate is built once per test run into this package's test
//! scratch directory, then discovered and enabled through
//! ExtensionManager with a DylibLoader.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};

use podkit_core::extensions::{
    DylibLoader, ExtensionManager, ExtensionManagerConfig, HostServices, UiContext,
};
use podkit_extension_api::{ConfigStore, Episode, Podcast, SyncDevice};
use serial_test::serial;
use tempfile::TempDir;

const NAME: &str = "rockbox_coverart";

fn demo_library() -> &'static Path {
    static LIBRARY: OnceLock<PathBuf> = OnceLock::new();
    LIBRARY.get_or_init(|| {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../demos/extensions/rockbox-coverart/Cargo.toml");
        let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("rockbox-coverart");

        let status = Command::new(env!("CARGO"))
            .args(["build", "--quiet", "--manifest-path"])
            .arg(&manifest)
            .arg("--target-dir")
            .arg(&target_dir)
            .status()
            .expect("Failed to run cargo build for the demo extension");
        assert!(status.success(), "demo extension failed to build");

        target_dir.join("debug").join(format!(
            "{}{}{}",
            std::env::consts::DLL_PREFIX,
            NAME,
            std::env::consts::DLL_SUFFIX
        ))
    })
}

/// Install the demo as `<dir>/rockbox_coverart.<ext>`
fn install(dir: &Path) -> PathBuf {
    let path = dir.join(format!("{}.{}", NAME, std::env::consts::DLL_EXTENSION));
    fs::copy(demo_library(), &path).unwrap();
    path
}

fn start(config: &ConfigStore, builtin: &Path) -> ExtensionManager {
    let ui = UiContext {
        cli: true,
        ..Default::default()
    };
    let services = HostServices::new(ui, config.clone(), Arc::new(DylibLoader::new()));
    ExtensionManager::new(
        ExtensionManagerConfig {
            builtin_dir: builtin.to_path_buf(),
            user_dir: builtin.join("user"),
            filenames: Vec::new(),
            disabled: false,
        },
        Arc::new(services),
    )
}

fn shadow_copies() -> Vec<PathBuf> {
    fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&format!("{}-", NAME)))
        })
        .collect()
}

struct FolderDevice {
    root: PathBuf,
}

impl SyncDevice for FolderDevice {
    fn name(&self) -> &str {
        "player"
    }

    fn episode_folder_on_device(&self, episode: &Episode) -> Option<PathBuf> {
        Some(self.root.join(&episode.podcast.title))
    }
}

// serial: shadow copies share the temp dir
#[test]
#[serial]
fn demo_library_loads_and_runs_hooks() {
    let builtin = TempDir::new().unwrap();
    install(builtin.path());
    let config = ConfigStore::new();
    config.set_enabled_extensions(vec![NAME.to_string()]).unwrap();

    let manager = start(&config, builtin.path());

    let info = manager.extension(NAME).unwrap();
    assert_eq!(info.title, "Rockbox Cover Art Sync");
    assert_eq!(info.category, "Post download");
    assert!(info.error.is_none(), "load failed: {:?}", info.error);
    assert!(info.loaded);
    assert!(info.enabled);
    assert!(shadow_copies().is_empty());

    assert_eq!(
        config.get_as::<String>("extensions.rockbox_coverart.art_name_on_device"),
        Some("cover.jpg".to_string())
    );

    let tabs: Vec<String> = manager
        .on_preferences()
        .into_iter()
        .map(|tab| tab.label)
        .collect();
    assert_eq!(tabs, vec!["Rockbox Coverart"]);

    let downloads = TempDir::new().unwrap();
    let device_root = TempDir::new().unwrap();
    fs::write(downloads.path().join("folder.jpg"), b"art").unwrap();
    fs::create_dir(device_root.path().join("Show")).unwrap();
    let episode = Episode {
        podcast: Podcast {
            title: "Show".into(),
            ..Default::default()
        },
        local_filename: Some(downloads.path().join("episode.mp3")),
        ..Default::default()
    };
    manager.on_episode_synced(
        &FolderDevice {
            root: device_root.path().to_path_buf(),
        },
        &episode,
    );
    assert_eq!(
        fs::read(device_root.path().join("Show/cover.jpg")).unwrap(),
        b"art"
    );

    // the instance is released before its library
    manager.shutdown();
    drop(manager);
}

#[test]
#[serial]
fn user_setting_wins_over_library_default() {
    let builtin = TempDir::new().unwrap();
    install(builtin.path());
    let config = ConfigStore::new();
    config
        .set("extensions.rockbox_coverart.art_name_on_device", "folder.png")
        .unwrap();
    config.set_enabled_extensions(vec![NAME.to_string()]).unwrap();

    let manager = start(&config, builtin.path());

    assert!(manager.extension(NAME).unwrap().enabled);
    assert_eq!(
        config.get_as::<String>("extensions.rockbox_coverart.art_name_on_device"),
        Some("folder.png".to_string())
    );
}
