// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Evaluator settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables with the `WSE_` prefix (e.g. `WSE_EVALUATOR=surrogate`
//! or `WSE_CONSISTENCY_TOLERANCE=0.05`).

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::eval_error;
use crate::types::{EvalError, EvalResult};

pub const DEFAULT_CONSISTENCY_TOLERANCE: f64 = 0.01;

pub const ENV_PREFIX: &str = "WSE_";

#[derive(
    clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Eq, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    #[default]
    /// Solve the bottleneck frequency linear program
    Lp,

    /// Predict the latency of the hottest link
    Surrogate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    pub evaluator: EvaluatorKind,

    /// Largest relative error allowed when rebuilding the LP latency from a
    /// training sample
    pub consistency_tolerance: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorKind::default(),
            consistency_tolerance: DEFAULT_CONSISTENCY_TOLERANCE,
        }
    }
}

impl EvaluatorConfig {
    fn figment_with_defaults() -> Figment {
        Figment::new().merge(Serialized::defaults(Self::default()))
    }

    fn figment_conf_file_merge(config: Figment, conf_file: &Path) -> Result<Figment, EvalError> {
        if conf_file.is_dir() {
            return eval_error!(Config, "{} is not a file path", conf_file.display());
        }
        if !conf_file.exists() {
            return eval_error!(Config, "{} not found", conf_file.display());
        }
        Ok(config.merge(Toml::file(conf_file)))
    }

    fn figment_env_var_merge(config: Figment) -> Figment {
        config.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the settings, reading `conf_file` if one is given.
    pub fn load(conf_file: Option<&Path>) -> Result<Self, EvalError> {
        let mut config = Self::figment_with_defaults();
        if let Some(conf_file) = conf_file {
            config = Self::figment_conf_file_merge(config, conf_file)?;
        }
        config = Self::figment_env_var_merge(config);

        let config: Self = config
            .extract()
            .map_err(|e| EvalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EvalResult {
        if !(self.consistency_tolerance.is_finite() && self.consistency_tolerance > 0.0) {
            return eval_error!(
                Config,
                "consistency_tolerance must be positive, got {}",
                self.consistency_tolerance
            );
        }
        Ok(())
    }
}
