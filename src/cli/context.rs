//! cli::context
//!
//! Per-invocation state: configuration with flag overrides applied, storage
//! paths, and the handles commands build on.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::auth::{AuthMachine, BrowserLauncher, LauncherError, UrlAction};
use crate::catalog::CatalogManager;
use crate::core::config::{Config, ConfigError, SsoInstance};
use crate::core::paths::SsoPaths;
use crate::identity::HttpIdentityClient;
use crate::secrets::{self, EnvOrPromptPassphrase, SecureStore};

use super::args::Cli;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub paths: SsoPaths,
    /// Instance selector from `--sso` or `AWS_SSO`
    pub sso: Option<String>,
    pub interactive: bool,
}

impl Context {
    /// Load configuration and apply the global flags on top of it.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        apply_overrides(&mut config, cli)?;

        let paths = SsoPaths::discover()
            .ok_or_else(|| anyhow!("cannot determine the home directory; set SSOENV_HOME"))?;

        Ok(Self {
            config,
            paths,
            sso: cli.sso.clone(),
            interactive: cli.interactive(),
        })
    }

    /// The selected SSO instance.
    pub fn instance(&self) -> Result<(&str, &SsoInstance), ConfigError> {
        self.config.select_sso(self.sso.as_deref())
    }

    /// Launcher configured from `url_action`, `browser`, and
    /// `url_exec_command`.
    pub fn launcher(&self) -> Result<BrowserLauncher, LauncherError> {
        let action = UrlAction::from_str(self.config.url_action())?;
        Ok(BrowserLauncher::new(action)
            .with_browser(self.config.browser().map(str::to_string))
            .with_exec_template(self.config.url_exec_command().map(<[String]>::to_vec)))
    }

    /// Open the configured secure store.
    pub fn open_store(&self) -> Result<SecureStore, secrets::SecretError> {
        secrets::create_store(
            self.config.secure_store(),
            &self.paths,
            Arc::new(EnvOrPromptPassphrase::new()),
        )
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<(), ConfigError> {
    let settings = &mut config.settings;
    if let Some(action) = &cli.url_action {
        settings.url_action = Some(action.clone());
    }
    if let Some(browser) = &cli.browser {
        settings.browser = Some(browser.clone());
    }
    if let Some(store) = &cli.store {
        settings.secure_store = Some(store.clone());
    }
    settings.validate()
}

/// Handles for one SSO instance.
pub struct Session<'c> {
    pub ctx: &'c Context,
    pub sso_name: &'c str,
    pub instance: &'c SsoInstance,
    pub client: HttpIdentityClient,
    pub store: SecureStore,
    pub launcher: BrowserLauncher,
}

impl<'c> Session<'c> {
    pub fn open(ctx: &'c Context) -> Result<Self> {
        let (sso_name, instance) = ctx.instance()?;
        let client = HttpIdentityClient::new(&instance.sso_region)?;
        let store = ctx.open_store()?;
        let launcher = ctx.launcher()?;
        tracing::debug!(sso = sso_name, store = store.backend_name(), "opened session");
        Ok(Self {
            ctx,
            sso_name,
            instance,
            client,
            store,
            launcher,
        })
    }

    pub fn auth(&self) -> AuthMachine<'_> {
        AuthMachine::new(
            &self.client,
            &self.store,
            self.instance.sso_region.as_str(),
            self.instance.start_url.as_str(),
        )
        .interactive(self.ctx.interactive)
    }

    pub fn catalogs(&self) -> CatalogManager<'_> {
        CatalogManager::new(&self.client, &self.ctx.config, &self.ctx.paths)
    }
}

/// Single-threaded runtime for one command.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            &cli(&["ssoenv", "login", "-u", "print", "-b", "lynx", "--store", "file"]),
        )
        .unwrap();
        assert_eq!(config.url_action(), "print");
        assert_eq!(config.browser(), Some("lynx"));
        assert_eq!(config.secure_store(), "file");
    }

    #[test]
    fn exec_action_without_template_is_config_error() {
        let mut config = Config::default();
        let err = apply_overrides(&mut config, &cli(&["ssoenv", "login", "-u", "exec"])).unwrap_err();
        assert!(err.to_string().contains("url_exec_command"));
    }
}
