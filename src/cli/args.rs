//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--config <path>`: Use this config file instead of searching
//! - `--sso` / `-S`: SSO instance to use (also `AWS_SSO`)
//! - `--url-action` / `-u`: How to present the verification URL
//! - `--browser` / `-b`: Browser for `--url-action open`
//! - `--store`: Secure store backend
//! - `--debug`: Enable debug logging
//! - `--no-interactive`: Never start the device flow

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::config::schema::{SECURE_STORES, URL_ACTIONS};
use crate::inject::RoleSelector;

/// ssoenv - run commands with AWS SSO role credentials
#[derive(Parser, Debug)]
#[command(name = "ssoenv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SSO instance name from the config file
    #[arg(short = 'S', long, global = true, env = "AWS_SSO")]
    pub sso: Option<String>,

    /// How to present the verification URL
    #[arg(short = 'u', long, global = true, value_parser = URL_ACTIONS.to_vec())]
    pub url_action: Option<String>,

    /// Browser used by `--url-action open`
    #[arg(short = 'b', long, global = true)]
    pub browser: Option<String>,

    /// Secure store backend
    #[arg(long, global = true, value_parser = SECURE_STORES.to_vec())]
    pub store: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Fail instead of starting a device authorization
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Interactive unless `--no-interactive` was given or stdin is not a
    /// terminal.
    pub fn interactive(&self) -> bool {
        !self.no_interactive && std::io::stdin().is_terminal()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command with role credentials in its environment
    #[command(
        name = "exec",
        long_about = "Run a command with role credentials in its environment.\n\n\
            The role is selected by profile name, by ARN, or by account and role \
            name together. Without a command, your shell is started.",
        after_help = "\
EXAMPLES:
    ssoenv exec -p 000000000042:admin -- aws s3 ls
    ssoenv exec -a arn:aws:iam::000000000042:role/admin
    ssoenv exec -A 000000000042 -R admin -- terraform plan"
    )]
    Exec {
        /// Profile name from the role catalog
        #[arg(short = 'p', long)]
        profile: Option<String>,

        /// Role ARN
        #[arg(short = 'a', long)]
        arn: Option<String>,

        /// Account ID (requires --role)
        #[arg(short = 'A', long)]
        account: Option<String>,

        /// Role name (requires --account)
        #[arg(short = 'R', long)]
        role: Option<String>,

        /// Do not set AWS_DEFAULT_REGION
        #[arg(long)]
        no_region: bool,

        /// Command and arguments (defaults to your shell)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Authenticate to the SSO instance
    Login,

    /// Refresh the cached role list
    Cache,

    /// List available roles
    List {
        /// Show recently used roles instead
        #[arg(long)]
        history: bool,
    },

    /// Delete cached credentials
    Flush {
        /// What to delete
        #[arg(long, value_enum, default_value_t = FlushKind::All)]
        kind: FlushKind,
    },
}

/// Cached secrets removed by `flush`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FlushKind {
    /// The SSO access token
    Token,
    /// Role credentials
    Creds,
    /// Both
    All,
}

impl FlushKind {
    pub fn token(self) -> bool {
        matches!(self, FlushKind::Token | FlushKind::All)
    }

    pub fn creds(self) -> bool {
        matches!(self, FlushKind::Creds | FlushKind::All)
    }
}

/// Build a role selector from the `exec` flags.
pub fn selector(
    profile: Option<String>,
    arn: Option<String>,
    account: Option<String>,
    role: Option<String>,
) -> RoleSelector {
    RoleSelector {
        profile,
        arn,
        account,
        role,
    }
}
