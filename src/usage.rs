//! Default help text for commands and standalone flag sets.
use std::fmt::Write;

use crate::{Command, FlagSet};

macro_rules! w {
    ($($tt:tt)*) => {
        {
            let _ = write!($($tt)*);
        }
    };
}

pub(crate) fn command(cmd: &Command) -> String {
    let mut buf = String::new();
    header(&mut buf, cmd.name());

    if !cmd.get_long_desc().is_empty() {
        w!(buf, "\n{}\n", cmd.get_long_desc());
    }

    if !cmd.children().is_empty() {
        let longest = cmd.children().iter().map(|it| it.name().len()).max().unwrap_or(0);
        w!(buf, "\nCommands:\n");
        for sub in cmd.children().iter().filter(|it| !it.name().is_empty()) {
            let line = format!("  {:<width$}  {}", sub.name(), sub.get_short_desc(), width = longest + 1);
            w!(buf, "{}\n", line.trim_end());
        }
    }

    if let Some(fset) = cmd.get_flags() {
        flags(&mut buf, fset);
    }
    buf
}

pub(crate) fn flag_set(fset: &FlagSet) -> String {
    let mut buf = String::new();
    header(&mut buf, fset.name());
    flags(&mut buf, fset);
    buf
}

fn header(buf: &mut String, name: &str) {
    if name.is_empty() {
        w!(buf, "Usage:\n");
    } else {
        w!(buf, "Usage of {name}:\n");
    }
}

fn flags(buf: &mut String, fset: &FlagSet) {
    let longest = fset.flags().map(|it| it.name().len()).max().unwrap_or(0);
    if longest == 0 {
        return;
    }

    w!(buf, "\nFlags:\n");
    for flag in fset.flags() {
        // Keep flags with and without usage text aligned.
        let mut usage = flag.usage().to_string();
        if !usage.is_empty() {
            usage.push(' ');
        }
        w!(
            buf,
            "  -{:<width$}  {usage}(default: {})\n",
            flag.name(),
            flag.default_value(),
            width = longest + 1
        );
    }
}
