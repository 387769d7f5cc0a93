//! CLI entry point for bb.

pub mod api;
pub mod auth;
pub mod config;

use std::io::BufRead;

use clap::{Parser, Subcommand};

use crate::error::{BbError, Result};

/// Bitbucket Cloud CLI
#[derive(Parser, Debug)]
#[command(name = "bb", version, about = "Work with Bitbucket Cloud from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Bitbucket
    Auth(AuthArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
    /// Make an authenticated API request
    Api(ApiArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Configure OAuth consumer credentials
    Setup,
    /// Log in via OAuth 2.0 or with an app password
    Login(LoginArgs),
    /// Log out and remove stored credentials
    Logout,
    /// Show current authentication status
    Status,
}

/// Arguments for `bb auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Read an app password from stdin instead of running the OAuth flow
    #[arg(long)]
    pub with_token: bool,

    /// Bitbucket username the app password belongs to
    #[arg(short, long, requires = "with_token")]
    pub username: Option<String>,
}

/// Arguments for the `config` subcommand group.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    View,
    /// Set the default workspace
    SetDefaultWorkspace {
        /// Workspace slug
        workspace: String,
    },
    /// Set default output format (table, json)
    SetFormat {
        /// Output format
        format: String,
    },
}

/// Arguments for `bb api`.
#[derive(Parser, Debug)]
pub struct ApiArgs {
    /// Endpoint path relative to the API base, or an absolute URL
    pub path: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// JSON request body; `-` reads it from stdin
    #[arg(long, conflicts_with = "form")]
    pub json: Option<String>,

    /// Form field as key=value (repeatable)
    #[arg(long = "form", value_name = "KEY=VALUE")]
    pub form: Vec<String>,
}

/// Read one trimmed line from `input`.
pub(crate) fn read_line(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Prompt on stdout, then read one trimmed line.
pub(crate) fn prompt(label: &str, input: &mut impl BufRead) -> Result<String> {
    use std::io::Write;
    print!("{label}");
    std::io::stdout().flush()?;
    read_line(input)
}

pub(crate) fn require(value: String, what: &str) -> Result<String> {
    if value.is_empty() {
        return Err(BbError::InvalidArgument(format!("{what} is required")));
    }
    Ok(value)
}
