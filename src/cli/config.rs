//! CLI config command handlers.

use std::path::Path;

use crate::auth::{Credential, CredentialStore, FileCredentialStore};
use crate::config::{config_dir, Config, OutputFormat};
use crate::error::{BbError, Result};

/// Handle `bb config view`.
pub fn handle_view() -> Result<()> {
    let dir = config_dir();
    let store = FileCredentialStore::new(dir.clone());
    for line in view_lines(&dir, &store)? {
        println!("{line}");
    }
    Ok(())
}

fn view_lines(dir: &Path, store: &dyn CredentialStore) -> Result<Vec<String>> {
    let config = Config::load(dir)?;
    let workspace = if config.default_workspace.is_empty() {
        "(not set)"
    } else {
        config.default_workspace.as_str()
    };
    // A broken token file should not hide the rest of the configuration.
    let method = match store.load() {
        Ok(Some(Credential::OAuth(_))) => "OAuth 2.0".to_string(),
        Ok(Some(Credential::AppPassword { username, .. })) => {
            format!("App Password (user: {username})")
        }
        Ok(None) => "(not authenticated)".to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read stored credential");
            "(unreadable)".to_string()
        }
    };
    Ok(vec![
        format!("Default Workspace: {workspace}"),
        format!("Default Format:    {}", config.default_format),
        format!("OAuth Key:         {}", mask_value(&config.oauth_key)),
        format!("Auth Method:       {method}"),
        format!("Config Directory:  {}", dir.display()),
    ])
}

/// Handle `bb config set-default-workspace <workspace>`.
pub fn handle_set_default_workspace(workspace: &str) -> Result<()> {
    set_default_workspace(&config_dir(), workspace)?;
    println!("Default workspace set to '{workspace}'.");
    Ok(())
}

fn set_default_workspace(dir: &Path, workspace: &str) -> Result<()> {
    let workspace = workspace.trim();
    if workspace.is_empty() {
        return Err(BbError::InvalidArgument(
            "workspace slug must not be empty".to_string(),
        ));
    }
    let mut config = Config::load(dir)?;
    config.default_workspace = workspace.to_string();
    config.save(dir)
}

/// Handle `bb config set-format <format>`.
pub fn handle_set_format(format: &str) -> Result<()> {
    let format = set_format(&config_dir(), format)?;
    println!("Default output format set to '{format}'.");
    Ok(())
}

fn set_format(dir: &Path, format: &str) -> Result<OutputFormat> {
    let format: OutputFormat = format.parse().map_err(|_| {
        BbError::InvalidArgument(format!(
            "invalid format '{format}': must be 'table' or 'json'"
        ))
    })?;
    let mut config = Config::load(dir)?;
    config.default_format = format;
    config.save(dir)?;
    Ok(format)
}

/// Show only the first four characters of a secret-ish value.
fn mask_value(value: &str) -> String {
    if value.is_empty() {
        return "(not set)".to_string();
    }
    match value.char_indices().nth(4) {
        Some((end, _)) => format!("{}****", &value[..end]),
        None => "****".to_string(),
    }
}
