//! A ready-made root command for programs with a single command tree.
//!
//! The root is created on first use, named after the program, and uses
//! [`ErrorHandling::ExitOnError`] both for itself and for its flag set.
//! Populate it at program entry and dispatch once:
//!
//! ```no_run
//! use cmds::{default, Command};
//!
//! default::add([Command::new("hello").handler(|_cmd, args| {
//!     println!("hello {}", args.join(" "));
//!     Ok(())
//! })]);
//! default::run_and_dispatch().unwrap();
//! ```
//!
//! The root lives in a thread-local, so it belongs to the thread that first
//! touched it. Handlers must not call back into this module while dispatch
//! is running.
use std::{cell::RefCell, env, path::Path};

use crate::{Command, ErrorHandling, FlagSet, Result};

thread_local! {
    static ROOT: RefCell<Command> = RefCell::new(program());
}

fn program() -> Command {
    let name = program_name();
    let flags = FlagSet::new(name.clone(), ErrorHandling::ExitOnError);
    Command::new(name).flags(flags).error_handling(ErrorHandling::ExitOnError)
}

fn program_name() -> String {
    let argv0 = match env::args_os().next() {
        Some(it) => it,
        None => return String::new(),
    };
    let path = Path::new(&argv0);
    path.file_name().unwrap_or(path.as_os_str()).to_string_lossy().into_owned()
}

/// Process arguments without the program name.
fn args() -> Vec<String> {
    env::args_os().skip(1).map(|it| it.to_string_lossy().into_owned()).collect()
}

pub fn with_root<R>(f: impl FnOnce(&mut Command) -> R) -> R {
    ROOT.with(|root| f(&mut root.borrow_mut()))
}

pub fn with_flags<R>(f: impl FnOnce(&mut FlagSet) -> R) -> R {
    with_root(|root| f(root.flags_mut()))
}

pub fn add(cmds: impl IntoIterator<Item = Command>) {
    with_root(|root| root.add(cmds))
}

/// Resolves the process arguments and hands the leaf to `f`.
pub fn resolve<R>(f: impl FnOnce(&Command, Vec<String>) -> R) -> Result<R> {
    with_root(|root| {
        let (leaf, args) = root.resolve(args())?;
        Ok(f(leaf, args))
    })
}

pub fn run_and_dispatch() -> Result<()> {
    with_root(|root| root.run_and_dispatch(args()))
}

/// Invokes the root's own handler with `args`, without any parsing.
pub fn run(args: &[String]) -> Result<()> {
    with_root(|root| root.run(args))
}
