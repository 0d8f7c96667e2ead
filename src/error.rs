use std::{panic, process};

use crate::ErrorHandling;

/// Malformed flag syntax or a value that failed to convert.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagError {
    #[error("flag provided but not defined: -{0}")]
    Undefined(String),
    #[error("flag needs an argument: -{0}")]
    MissingValue(String),
    #[error("invalid value {value:?} for flag -{name}: {reason}")]
    InvalidValue { name: String, value: String, reason: String },
    #[error("invalid boolean value {value:?} for -{name}: {reason}")]
    InvalidBool { name: String, value: String, reason: String },
    #[error("bad flag syntax: {0}")]
    BadSyntax(String),
    #[error("help requested")]
    Help,
}

/// Failure to pick a command out of the tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("missing command")]
    Missing,
    #[error("missing command for \"{0}\"")]
    MissingFor(String),
    #[error("no such command \"{0}\"")]
    Unknown(String),
    #[error("no handler for \"{0}\"")]
    NoHandler(String),
}

/// Everything [`Command::resolve`](crate::Command::resolve) and
/// [`Command::run_and_dispatch`](crate::Command::run_and_dispatch) can fail
/// with.
///
/// Flag and command errors are both "command errors" (see
/// [`Error::is_command_system`]); whatever a handler returns is kept as is
/// in [`Error::Handler`] so that a usage mistake can be told apart from a
/// failed operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("command error: flag parse error: {0}")]
    Flag(#[from] FlagError),
    #[error("command error: command parse error: {0}")]
    Command(#[from] CommandError),
    #[error(transparent)]
    Handler(anyhow::Error),
}

impl Error {
    pub fn is_command_system(&self) -> bool {
        self.is_flag() || self.is_command()
    }

    pub fn is_flag(&self) -> bool {
        matches!(self, Error::Flag(_))
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Error::Command(_))
    }

    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Error::Handler(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_handler_error(self) -> Result<anyhow::Error, Error> {
        match self {
            Error::Handler(err) => Ok(err),
            err => Err(err),
        }
    }

    /// The status [`ErrorHandling::ExitOnError`] terminates the process with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Flag(_) => 2,
            Error::Command(_) => 3,
            Error::Handler(_) => 1,
        }
    }

    /// Applies the outermost policy. Only returns under
    /// [`ErrorHandling::ReturnOnError`].
    pub(crate) fn handle(self, policy: ErrorHandling) -> Error {
        match policy {
            ErrorHandling::ReturnOnError => self,
            ErrorHandling::ExitOnError => {
                let code = self.exit_code();
                tracing::error!(error = %self, code, "command failed, exiting");
                eprintln!("{self}");
                process::exit(code)
            }
            ErrorHandling::PanicOnError => {
                tracing::error!(error = %self, "command failed, panicking");
                panic::panic_any(self)
            }
        }
    }
}
