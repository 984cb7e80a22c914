//! Extension management commands

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use podkit_core::extensions::{
    DylibLoader, ExtensionInfo, ExtensionManager, ExtensionManagerConfig, Hook, HostServices,
    UiContext, UiKind,
};
use podkit_extension_api::ConfigStore;

/// Extension management arguments
#[derive(Args)]
pub struct ExtensionArgs {
    #[command(subcommand)]
    pub command: ExtensionCommands,
}

/// Extension subcommands
#[derive(Subcommand)]
pub enum ExtensionCommands {
    /// List extensions that can be toggled in this UI
    List {
        /// Include mandatory and unavailable extensions
        #[arg(long)]
        all: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Enable an extension
    Enable {
        /// Extension name to enable
        name: String,
    },
    /// Disable an extension
    Disable {
        /// Extension name to disable
        name: String,
    },
    /// Show extension details
    Info {
        /// Extension name
        name: String,
    },
    /// List the hooks extensions can implement
    Hooks,
}

/// Where the host reads its settings and which UI it runs as
pub struct HostOptions {
    pub settings: PathBuf,
    pub ui: UiKind,
}

/// A running extension host backed by a settings file
struct Host {
    manager: ExtensionManager,
    config: ConfigStore,
    settings: PathBuf,
}

impl Host {
    fn open(options: &HostOptions) -> Result<Self> {
        let config = ConfigStore::load(&options.settings)?;
        let services = HostServices::new(
            UiContext::new(options.ui),
            config.clone(),
            Arc::new(DylibLoader::new()),
        );
        let manager = ExtensionManager::new(ExtensionManagerConfig::from_env(), Arc::new(services));

        Ok(Self {
            manager,
            config,
            settings: options.settings.clone(),
        })
    }

    /// Persist settings if anything changed
    fn save(&self) -> Result<()> {
        if self.config.is_dirty() {
            self.config.save(&self.settings)?;
            tracing::debug!(path = %self.settings.display(), "Saved settings");
        }
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.manager.shutdown();
        self.save()
    }
}

/// Run extension command
pub fn run(args: ExtensionArgs, options: &HostOptions) -> Result<()> {
    if let ExtensionCommands::Hooks = args.command {
        list_hooks();
        return Ok(());
    }

    let host = Host::open(options)?;
    let result = match args.command {
        ExtensionCommands::List { all, json } => list_extensions(&host, all, json),
        ExtensionCommands::Enable { name } => set_enabled(&host, &name, true),
        ExtensionCommands::Disable { name } => set_enabled(&host, &name, false),
        ExtensionCommands::Info { name } => show_extension_info(&host, &name),
        ExtensionCommands::Hooks => Ok(()),
    };
    host.close()?;
    result
}

fn list_extensions(host: &Host, all: bool, json: bool) -> Result<()> {
    let extensions = if all {
        host.manager.all_extensions()
    } else {
        host.manager.get_extensions()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&extensions)?);
        return Ok(());
    }

    if extensions.is_empty() {
        println!("No extensions installed");
        println!();
        println!("Extension directories:");
        println!("  {}", podkit_paths::builtin_extensions_dir().display());
        println!("  {}", podkit_paths::user_extensions_dir().display());
        return Ok(());
    }

    let mut category = None;
    for info in &extensions {
        if category != Some(info.category.as_str()) {
            if category.is_some() {
                println!();
            }
            println!("{}:", info.category);
            category = Some(info.category.as_str());
        }
        println!("  {} {:<24} {}", status_marker(info), info.name, info.title);
    }

    Ok(())
}

fn status_marker(info: &ExtensionInfo) -> &'static str {
    if info.error.is_some() {
        "✗"
    } else if info.enabled {
        "✓"
    } else {
        "○"
    }
}

fn set_enabled(host: &Host, name: &str, enabled: bool) -> Result<()> {
    let action = if enabled { "enable" } else { "disable" };

    if let Some(info) = host.manager.extension(name) {
        if info.mandatory && !enabled {
            bail!("Extension '{}' is mandatory in this UI", name);
        }
        if info.disabled_in_ui && enabled {
            bail!("Extension '{}' is disabled in this UI", name);
        }
    }

    if !host.manager.set_extension_enabled(name, enabled)? {
        let reason = host
            .manager
            .extension(name)
            .and_then(|info| info.error.map(|e| e.to_string()))
            .unwrap_or_else(|| "not available in this UI".to_string());
        bail!("Could not {} extension '{}': {}", action, name, reason);
    }

    println!("{}d extension: {}", capitalize(action), name);
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn show_extension_info(host: &Host, name: &str) -> Result<()> {
    let Some(info) = host.manager.extension(name) else {
        println!("Extension '{}' not found", name);
        println!();
        println!("Run 'podkit extension list --all' to see all extensions.");
        return Ok(());
    };

    println!("Name:        {}", info.name);
    println!("Title:       {}", info.title);
    println!("Category:    {}", info.category);
    println!("Description: {}", info.description);
    if let Some(filename) = &info.filename {
        println!("File:        {}", filename.display());
    }
    println!();

    let status = match (&info.error, info.enabled) {
        (Some(error), _) => format!("Failed ({})", error),
        (None, true) => "Enabled".to_string(),
        (None, false) if info.unavailable => "Not available in this UI".to_string(),
        (None, false) => "Disabled".to_string(),
    };
    println!("Status:      {}", status);
    if info.mandatory {
        println!("             Mandatory in this UI");
    }
    if info.disabled_in_ui {
        println!("             Disabled in this UI");
    }

    if !info.metadata.is_empty() {
        println!();
        println!("Metadata:");
        for (key, value) in &info.metadata {
            println!("  {:<14} {}", key, value);
        }
    }

    let settings = host.config.extension_section(name).table();
    if !settings.is_empty() {
        println!();
        println!("Settings:");
        print!("{}", indent(&toml::to_string_pretty(&settings)?));
    }

    Ok(())
}

fn indent(text: &str) -> String {
    text.lines().map(|line| format!("  {}\n", line)).collect()
}

fn list_hooks() {
    for hook in Hook::ALL {
        let marker = if hook.returns_entries() { "+" } else { " " };
        println!(
            "{} {}({})",
            marker,
            hook.name(),
            hook.params().join(", ")
        );
        println!("    {}", hook.description());
    }
    println!();
    println!("+ returns entries that are concatenated across extensions");
}

/// Default location of the settings file
pub fn default_settings() -> PathBuf {
    podkit_paths::settings_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        cmd: ExtensionCommands,
    }

    #[test]
    fn test_extension_args_parsing() {
        let cli = TestCli::parse_from(["test", "list"]);
        assert!(matches!(cli.cmd, ExtensionCommands::List { all: false, json: false }));

        let cli = TestCli::parse_from(["test", "list", "--all", "--json"]);
        assert!(matches!(cli.cmd, ExtensionCommands::List { all: true, json: true }));

        let cli = TestCli::parse_from(["test", "enable", "rockbox_coverart"]);
        assert!(matches!(cli.cmd, ExtensionCommands::Enable { name } if name == "rockbox_coverart"));

        let cli = TestCli::parse_from(["test", "disable", "rockbox_coverart"]);
        assert!(matches!(cli.cmd, ExtensionCommands::Disable { name } if name == "rockbox_coverart"));

        let cli = TestCli::parse_from(["test", "info", "x"]);
        assert!(matches!(cli.cmd, ExtensionCommands::Info { name } if name == "x"));

        let cli = TestCli::parse_from(["test", "hooks"]);
        assert!(matches!(cli.cmd, ExtensionCommands::Hooks));
    }

    #[test]
    fn test_enable_requires_a_name() {
        assert!(TestCli::try_parse_from(["test", "enable"]).is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("enable"), "Enable");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a = 1\nb = 2\n"), "  a = 1\n  b = 2\n");
    }

    #[test]
    #[serial]
    fn test_unknown_extension_is_an_error_and_nothing_is_saved() {
        let dir = TempDir::new().unwrap();
        // SAFETY: serialized with the other environment tests
        unsafe {
            std::env::set_var("PODKIT_PREFIX", dir.path());
            std::env::set_var("XDG_DATA_HOME", dir.path());
        }

        let options = HostOptions {
            settings: dir.path().join("settings.toml"),
            ui: UiKind::Cli,
        };
        let result = run(
            ExtensionArgs {
                command: ExtensionCommands::Enable {
                    name: "ghost".to_string(),
                },
            },
            &options,
        );

        unsafe {
            std::env::remove_var("PODKIT_PREFIX");
            std::env::remove_var("XDG_DATA_HOME");
        }
        assert!(result.is_err());
        assert!(!options.settings.exists());
    }
}
