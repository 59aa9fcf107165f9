use anyhow::Result;

use crate::config::{Config, EnvSnapshot, GlobalOptions, InstallLayout};
use crate::effects::{Effects, SharedEffects};

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a new command context with the provided global options.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be prepared.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        let config = Config::from_snapshot(&EnvSnapshot::capture())?;
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

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &InstallLayout {
        self.config.layout()
    }

    pub fn is_online(&self) -> bool {
        self.config.network().online
    }
}
