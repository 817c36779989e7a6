//! Process exit codes.

use medchain::RegistryError;

use crate::config::ConfigError;

pub mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const NOT_FOUND: u8 = 1;
    pub const ALREADY_REGISTERED: u8 = 2;
    pub const INPUT_REJECTED: u8 = 3;
    pub const CONNECTIVITY: u8 = 4;
    pub const CONFIG_ERROR: u8 = 5;
    pub const UNEXPECTED_ERROR: u8 = 6;
}

/// How a command that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    NotFound,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Done => exit_codes::SUCCESS,
            Outcome::NotFound => exit_codes::NOT_FOUND,
        }
    }
}

/// Pick the exit code for a failed command from the first classified
/// error in its chain.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit_codes::CONFIG_ERROR;
        }
        if let Some(e) = cause.downcast_ref::<RegistryError>() {
            return match e {
                RegistryError::AlreadyRegistered { .. } => exit_codes::ALREADY_REGISTERED,
                RegistryError::InputRejected(_) | RegistryError::Invalid(_) => {
                    exit_codes::INPUT_REJECTED
                }
                RegistryError::Connectivity(_) | RegistryError::Timeout { .. } => {
                    exit_codes::CONNECTIVITY
                }
                RegistryError::NotConnected | RegistryError::Unauthorized(_) => {
                    exit_codes::CONFIG_ERROR
                }
                RegistryError::Closed | RegistryError::Io(_) | RegistryError::Store(_) => {
                    exit_codes::UNEXPECTED_ERROR
                }
            };
        }
    }
    exit_codes::UNEXPECTED_ERROR
}

/// The message to show for a failed command.
pub fn describe(err: &anyhow::Error) -> String {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<RegistryError>() {
            return e.user_message();
        }
    }
    format!("{:#}", err)
}
