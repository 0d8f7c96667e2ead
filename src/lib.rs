//! Nested sub-command dispatch.
//!
//! A [`Command`] owns a [`FlagSet`], an optional [`Handler`] and a list of
//! child commands. [`Command::run_and_dispatch`] walks the tree one level
//! per selector token, letting every level parse its own flags, and invokes
//! the handler of the leaf it lands on:
//!
//! ```
//! use cmds::{Command, ErrorHandling, FlagSet};
//!
//! let mut root_flags = FlagSet::new("tool", ErrorHandling::ReturnOnError);
//! let verbose = root_flags.bool("v", false, "verbose output");
//!
//! let mut root = Command::new("tool").flags(root_flags).subcommand(
//!     Command::new("echo").handler(|_cmd, args| {
//!         println!("{}", args.join(" "));
//!         Ok(())
//!     }),
//! );
//!
//! root.run_and_dispatch(["-v", "echo", "hi"]).unwrap();
//! assert!(verbose.get());
//! ```
use std::fmt;

mod command;
mod error;
mod flag;
mod usage;

pub mod default;

pub use crate::{
    command::{Command, Handler, UsageFn},
    error::{CommandError, Error, FlagError},
    flag::{Flag, FlagInfo, FlagSet},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What to do once a parse failure surfaces.
///
/// On a [`Command`] this is evaluated once, for the root, after the whole
/// dispatch has failed. On a [`FlagSet`] it governs only that set's own flag
/// syntax errors, independently of the command layer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorHandling {
    #[default]
    ReturnOnError,
    /// Exit with 2 for flag errors, 3 for command errors and 1 for handler
    /// errors. A flag set exits with 0 when help was requested.
    ExitOnError,
    PanicOnError,
}

impl fmt::Display for ErrorHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorHandling::ReturnOnError => "ReturnOnError",
            ErrorHandling::ExitOnError => "ExitOnError",
            ErrorHandling::PanicOnError => "PanicOnError",
        };
        f.write_str(name)
    }
}
