use std::fmt;

use anyhow::Result;
use appnix_domain::{load_config, AppConfig, ConfigError};

use crate::core::config::{AppnixPaths, Config, GlobalOptions};
use crate::core::effects::{Effects, SharedEffects};
use crate::core::toolchain::CachedRuntime;
use crate::core::tooling::errors::AppnixError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandGroup {
    Build,
    Install,
    Reinstall,
    Uninstall,
    List,
    Desktop,
    All,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Build => "build",
            CommandGroup::Install => "install",
            CommandGroup::Reinstall => "reinstall",
            CommandGroup::Uninstall => "uninstall",
            CommandGroup::List => "list",
            CommandGroup::Desktop => "desktop",
            CommandGroup::All => "all",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a command context from the process environment.
    ///
    /// # Errors
    /// Returns an error if the appnix paths cannot be resolved.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        let config = Config::from_env(global.config.as_deref())?;
        Ok(Self::with_config(global, config, effects))
    }

    #[must_use]
    pub fn with_config(global: &'a GlobalOptions, config: Config, effects: SharedEffects) -> Self {
        Self {
            global,
            config,
            effects,
        }
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn paths(&self) -> &AppnixPaths {
        self.config.paths()
    }

    pub fn runtime(&self) -> &CachedRuntime {
        self.config.runtime()
    }

    /// Loads and validates `config.yml`.
    ///
    /// # Errors
    /// Returns [`AppnixError::ConfigInvalid`] when the file is missing, malformed, or invalid.
    pub fn load_app_config(&self) -> Result<AppConfig> {
        let path = &self.paths().config_file;
        load_config(path).map_err(|err| {
            let hint = match &err {
                ConfigError::Read { .. } => format!("create {} first", path.display()),
                ConfigError::Parse { .. } | ConfigError::Invalid(_) => {
                    format!("fix the errors in {}", path.display())
                }
            };
            AppnixError::ConfigInvalid {
                message: error_chain(&err),
                hint,
            }
            .into()
        })
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
