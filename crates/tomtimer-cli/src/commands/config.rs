use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::config_profiles::{
    default_config_path, normalize_text_option, CliProfile, CliProfilesConfig, ProviderKind,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub name: String,
    pub active: bool,
    pub provider: ProviderKind,
    pub store_path: Option<PathBuf>,
    pub collection: Option<String>,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

pub fn run_config(
    command: ConfigCommands,
    global_profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            provider,
            store_path,
            collection,
            no_activate,
        } => {
            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = apply_config_init(
                &mut config,
                profile.as_deref().or(global_profile),
                provider,
                store_path,
                collection,
                no_activate,
            );
            let path = config.save().map_err(CliError::Config)?;
            println!("Profile '{profile_name}' initialized at {}", path.display());

            let missing = config
                .profile(&profile_name)
                .map(CliProfile::missing_fields)
                .unwrap_or_default();
            if missing.is_empty() {
                println!("Profile '{profile_name}' is ready. Run `tomtimer sync`.");
            } else {
                println!("Profile '{profile_name}' is missing: {}", missing.join(", "));
            }
            Ok(())
        }
        ConfigCommands::Show { json } => {
            let config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let view = profile_view(&config, global_profile, db_path);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                for line in format_profile_view(&view) {
                    println!("{line}");
                }
            }
            Ok(())
        }
    }
}

/// Merge explicit values, then environment, then what the profile already has
pub fn apply_config_init(
    config: &mut CliProfilesConfig,
    profile_name: Option<&str>,
    provider: Option<ProviderKind>,
    store_path: Option<PathBuf>,
    collection: Option<String>,
    no_activate: bool,
) -> String {
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged_collection = normalize_text_option(collection)
        .or_else(|| normalize_text_option(env::var("TOMTIMER_COLLECTION").ok()))
        .or_else(|| existing.collection());
    let merged_store_path = store_path
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| env::var_os("TOMTIMER_STORE_PATH").map(PathBuf::from))
        .or(existing.store_path);

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(provider) = provider {
        profile.provider = provider;
    }
    profile.store_path = merged_store_path;
    profile.collection = merged_collection;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }
    if config.version == 0 {
        config.version = 1;
    }

    profile_name
}

pub fn profile_view(
    config: &CliProfilesConfig,
    explicit: Option<&str>,
    db_path: &Path,
) -> ProfileView {
    let name = config.resolve_profile_name(explicit);
    let profile = config.profile(&name).cloned().unwrap_or_default();
    ProfileView {
        active: config.active_profile.as_deref() == Some(name.as_str()),
        provider: profile.provider,
        store_path: profile.store_path.clone(),
        collection: profile.collection(),
        db_path: db_path.to_path_buf(),
        config_path: default_config_path(),
        name,
    }
}

pub fn format_profile_view(view: &ProfileView) -> Vec<String> {
    let unset = || "(not set)".to_string();
    vec![
        format!(
            "profile:     {}{}",
            view.name,
            if view.active { " (active)" } else { "" }
        ),
        format!("provider:    {}", view.provider.label()),
        format!(
            "store path:  {}",
            view.store_path
                .as_ref()
                .map_or_else(unset, |path| path.display().to_string())
        ),
        format!(
            "collection:  {}",
            view.collection.clone().unwrap_or_else(unset)
        ),
        format!("database:    {}", view.db_path.display()),
        format!("config file: {}", view.config_path.display()),
    ]
}
