//! `echo [-v] echo [-c] <words>...` and `echo [-v] repeat [-n N] <word>`.
//!
//! Set `RUST_LOG=cmds=trace` to watch the dispatch.
use std::{env, path::Path, process};

use anyhow::bail;
use cmds::{Command, ErrorHandling, FlagSet};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let name = env::args()
        .next()
        .and_then(|it| Path::new(&it).file_name().map(|it| it.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "echo".to_string());

    let mut root_flags = FlagSet::new(name.as_str(), ErrorHandling::ExitOnError);
    let verbose = root_flags.bool("v", false, "verbose output");

    let mut echo_flags = FlagSet::new("echo", ErrorHandling::ExitOnError);
    let capitalize = echo_flags.bool("c", false, "capitalize output");

    let mut repeat_flags = FlagSet::new("repeat", ErrorHandling::ExitOnError);
    let count = repeat_flags.int("n", 2, "how many times");

    let echo = {
        let verbose = verbose.clone();
        Command::new("echo")
            .short_desc("print arguments")
            .long_desc("Prints every argument on its own line.")
            .flags(echo_flags)
            .handler(move |_cmd, args| {
                if verbose.get() {
                    eprintln!("echoing {} arguments", args.len());
                }
                for arg in args {
                    if capitalize.get() {
                        println!("{}", arg.to_uppercase());
                    } else {
                        println!("{arg}");
                    }
                }
                Ok(())
            })
    };

    let repeat = Command::new("repeat")
        .short_desc("print one word several times")
        .flags(repeat_flags)
        .handler(move |_cmd, args| {
            let word = match args {
                [word] => word,
                _ => bail!("expected exactly one word"),
            };
            let count = count.get();
            if count < 0 {
                bail!("negative count {count}");
            }
            if verbose.get() {
                eprintln!("repeating {word:?} {count} times");
            }
            for _ in 0..count {
                println!("{word}");
            }
            Ok(())
        });

    let mut root = Command::new(name)
        .long_desc("Demonstrates nested sub-commands.")
        .flags(root_flags)
        .subcommands([echo, repeat]);

    match root.run_and_dispatch(env::args().skip(1)) {
        Ok(()) => (),
        Err(err) => {
            eprintln!("{err}");
            process::exit(err.exit_code())
        }
    }
}
