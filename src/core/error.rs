use crate::provision::Step;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Provisioning step '{step}' failed: {reason}")]
    Provisioning { step: Step, reason: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl ProvisionError {
    /// Wraps any collaborator failure as a failure of `step`.
    pub fn step_failed(step: Step, reason: impl std::fmt::Display) -> Self {
        Self::Provisioning {
            step,
            reason: reason.to_string(),
        }
    }

    /// Step that aborted the run, if this is a provisioning failure.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Provisioning { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
