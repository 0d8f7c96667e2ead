use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    io::{self, Write},
    panic, process,
    rc::Rc,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{usage, ErrorHandling, FlagError};

/// Shared handle to the storage a flag writes into.
///
/// Defining a flag on a [`FlagSet`] hands one of these back; clones observe
/// the same value, so handlers can capture them.
pub struct Flag<T> {
    slot: Rc<RefCell<T>>,
}

impl<T> Flag<T> {
    pub fn new(value: T) -> Self {
        Flag { slot: Rc::new(RefCell::new(value)) }
    }

    pub fn set(&self, value: T) {
        *self.slot.borrow_mut() = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.borrow())
    }
}

impl<T: Clone> Flag<T> {
    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }
}

impl<T> Clone for Flag<T> {
    fn clone(&self) -> Self {
        Flag { slot: Rc::clone(&self.slot) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Flag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Flag").field(&*self.slot.borrow()).finish()
    }
}

trait Value {
    fn set(&self, raw: &str) -> Result<(), String>;
    fn render(&self) -> String;
}

impl<T> Value for Flag<T>
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    fn set(&self, raw: &str) -> Result<(), String> {
        let value = raw.parse::<T>().map_err(|err| err.to_string())?;
        *self.slot.borrow_mut() = value;
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.borrow().to_string()
    }
}

/// A boolean flag: present means `true`, never consumes the next argument.
struct Switch(Flag<bool>);

impl Value for Switch {
    fn set(&self, raw: &str) -> Result<(), String> {
        let value = match raw {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => true,
            "0" | "f" | "F" | "false" | "FALSE" | "False" => false,
            _ => return Err("parse error".to_string()),
        };
        self.0.set(value);
        Ok(())
    }

    fn render(&self) -> String {
        self.0.get().to_string()
    }
}

/// An integer flag, accepting `0x`, `0o`, `0b` and leading-zero octal
/// prefixes as well as `_` digit separators.
struct Int(Flag<i64>);

impl Value for Int {
    fn set(&self, raw: &str) -> Result<(), String> {
        self.0.set(parse_int(raw)?);
        Ok(())
    }

    fn render(&self) -> String {
        self.0.get().to_string()
    }
}

fn parse_int(raw: &str) -> Result<i64, String> {
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        Some("0o" | "0O") => (8, &unsigned[2..]),
        Some("0b" | "0B") => (2, &unsigned[2..]),
        _ if unsigned.len() > 1 && unsigned.starts_with('0') => (8, &unsigned[1..]),
        _ => (10, unsigned),
    };
    // A separator may follow a base prefix directly: `0x_ff`.
    let digits = match digits.strip_prefix('_') {
        Some(rest) if radix != 10 => rest,
        _ => digits,
    };
    if digits.is_empty()
        || digits.starts_with(['_', '+', '-'])
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err("invalid syntax".to_string());
    }

    let magnitude =
        u64::from_str_radix(&digits.replace('_', ""), radix).map_err(|err| err.to_string())?;
    let value = if negative { -i128::from(magnitude) } else { i128::from(magnitude) };
    i64::try_from(value).map_err(|_| "value out of range".to_string())
}

struct Def {
    usage: String,
    default: String,
    switch: bool,
    value: Box<dyn Value>,
}

impl Def {
    fn assign(&self, name: &str, raw: &str) -> Result<(), FlagError> {
        self.value.set(raw).map_err(|reason| {
            let (name, value) = (name.to_string(), raw.to_string());
            if self.switch {
                FlagError::InvalidBool { name, value, reason }
            } else {
                FlagError::InvalidValue { name, value, reason }
            }
        })
    }
}

/// A defined flag, as seen through [`FlagSet::flags`] or [`FlagSet::lookup`].
#[derive(Clone, Copy)]
pub struct FlagInfo<'a> {
    name: &'a str,
    def: &'a Def,
}

impl<'a> FlagInfo<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn usage(&self) -> &'a str {
        &self.def.usage
    }

    /// The value at definition time, rendered.
    pub fn default_value(&self) -> &'a str {
        &self.def.default
    }

    pub fn value(&self) -> String {
        self.def.value.render()
    }

    pub fn is_bool(&self) -> bool {
        self.def.switch
    }
}

impl fmt::Debug for FlagInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagInfo")
            .field("name", &self.name)
            .field("value", &self.value())
            .field("default", &self.def.default)
            .finish()
    }
}

static TRAVERSALS: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_traversal() -> u64 {
    TRAVERSALS.fetch_add(1, Ordering::Relaxed)
}

/// Typed, named options parsed off the front of an argument list.
///
/// Parsing stops at the first argument that is not a flag, or right after
/// `--`; everything from there on is left for the caller as positional
/// arguments. Accepted forms are `-name`, `--name`, `-name=value` and, for
/// non-boolean flags, `-name value`.
pub struct FlagSet {
    name: String,
    error_handling: ErrorHandling,
    defs: BTreeMap<String, Def>,
    args: Vec<String>,
    parsed: bool,
    traversal: Option<u64>,
    output: Option<Box<dyn Write>>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>, error_handling: ErrorHandling) -> FlagSet {
        FlagSet {
            name: name.into(),
            error_handling,
            defs: BTreeMap::new(),
            args: Vec::new(),
            parsed: false,
            traversal: None,
            output: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Positional arguments left over by the last successful parse.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Where errors and usage text go. Defaults to stderr.
    pub fn set_output(&mut self, output: impl Write + 'static) {
        self.output = Some(Box::new(output));
    }

    pub fn bool(&mut self, name: &str, default: bool, usage: &str) -> Flag<bool> {
        let flag = Flag::new(default);
        self.bind_bool(&flag, name, usage);
        flag
    }

    /// Besides decimal, values may use `0x`, `0o`, `0b` or a leading `0`
    /// (octal), with `_` between digits.
    pub fn int(&mut self, name: &str, default: i64, usage: &str) -> Flag<i64> {
        let flag = Flag::new(default);
        self.define(name, usage, false, Box::new(Int(flag.clone())));
        flag
    }

    pub fn string(&mut self, name: &str, default: &str, usage: &str) -> Flag<String> {
        self.value(name, default.to_string(), usage)
    }

    pub fn value<T>(&mut self, name: &str, default: T, usage: &str) -> Flag<T>
    where
        T: FromStr + fmt::Display + 'static,
        T::Err: fmt::Display,
    {
        let flag = Flag::new(default);
        self.bind(&flag, name, usage);
        flag
    }

    /// Defines a boolean flag writing into `flag`. Its current value becomes
    /// the default.
    pub fn bind_bool(&mut self, flag: &Flag<bool>, name: &str, usage: &str) {
        self.define(name, usage, true, Box::new(Switch(flag.clone())));
    }

    pub fn bind<T>(&mut self, flag: &Flag<T>, name: &str, usage: &str)
    where
        T: FromStr + fmt::Display + 'static,
        T::Err: fmt::Display,
    {
        self.define(name, usage, false, Box::new(flag.clone()));
    }

    fn define(&mut self, name: &str, usage: &str, switch: bool, value: Box<dyn Value>) {
        assert!(!self.defs.contains_key(name), "{} flag redefined: {name}", self.name);
        let def = Def { usage: usage.to_string(), default: value.render(), switch, value };
        self.defs.insert(name.to_string(), def);
    }

    pub fn lookup(&self, name: &str) -> Option<FlagInfo<'_>> {
        self.defs.get_key_value(name).map(|(name, def)| FlagInfo { name, def })
    }

    /// All defined flags in lexical order.
    pub fn flags(&self) -> impl Iterator<Item = FlagInfo<'_>> {
        self.defs.iter().map(|(name, def)| FlagInfo { name, def })
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError> {
        match self.defs.get(name) {
            Some(def) => def.assign(name, value),
            None => Err(FlagError::Undefined(name.to_string())),
        }
    }

    /// Parses flags off the front of `args`, applying this set's
    /// [`ErrorHandling`] on failure.
    pub fn parse<I>(&mut self, args: I) -> Result<Vec<String>, FlagError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        match self.parse_args(args.into_iter().map(Into::into).collect()) {
            Ok(rest) => Ok(rest),
            Err(err) => {
                let usage = usage::flag_set(self);
                Err(self.fail(err, &usage))
            }
        }
    }

    /// Parses flags off the front of `args` without reporting anything.
    pub fn try_parse<I>(&mut self, args: I) -> Result<Vec<String>, FlagError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.parse_args(args.into_iter().map(Into::into).collect())
    }

    pub(crate) fn parse_args(&mut self, mut args: Vec<String>) -> Result<Vec<String>, FlagError> {
        self.parsed = true;

        let mut i = 0;
        while let Some(arg) = args.get(i) {
            if arg.len() < 2 || !arg.starts_with('-') {
                break;
            }
            let name = match arg.strip_prefix("--") {
                Some("") => {
                    i += 1;
                    break;
                }
                Some(long) => long,
                None => &arg[1..],
            };
            if name.starts_with('-') || name.starts_with('=') {
                return Err(FlagError::BadSyntax(arg.clone()));
            }
            i += 1;

            let (name, inline) = match name.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (name, None),
            };
            let def = match self.defs.get(name) {
                Some(it) => it,
                None if name == "h" || name == "help" => return Err(FlagError::Help),
                None => return Err(FlagError::Undefined(name.to_string())),
            };

            if def.switch {
                def.assign(name, inline.unwrap_or("true"))?;
                continue;
            }
            let value = match inline {
                Some(it) => it,
                None => {
                    let next = args.get(i).ok_or_else(|| FlagError::MissingValue(name.to_string()))?;
                    i += 1;
                    next.as_str()
                }
            };
            def.assign(name, value)?;
        }

        self.args = args.split_off(i);
        Ok(self.args.clone())
    }

    /// Marks the set as visited by dispatch traversal `id`.
    pub(crate) fn enter(&mut self, id: u64) {
        debug_assert_ne!(
            self.traversal,
            Some(id),
            "flag set {:?} parsed twice in one dispatch",
            self.name
        );
        self.traversal = Some(id);
    }

    /// Reports `err` to the output followed by `usage`, then applies this
    /// set's policy.
    pub(crate) fn fail(&mut self, err: FlagError, usage: &str) -> FlagError {
        self.report(&err, usage);
        match self.error_handling {
            ErrorHandling::ReturnOnError => err,
            ErrorHandling::ExitOnError => {
                let code = if err == FlagError::Help { 0 } else { 2 };
                tracing::error!(flags = %self.name, error = %err, code, "flag parse failed, exiting");
                process::exit(code)
            }
            ErrorHandling::PanicOnError => {
                tracing::error!(flags = %self.name, error = %err, "flag parse failed, panicking");
                panic::panic_any(err)
            }
        }
    }

    fn report(&mut self, err: &FlagError, usage: &str) {
        let write = |out: &mut dyn Write| {
            if *err != FlagError::Help {
                drop(writeln!(out, "{err}"));
            }
            drop(out.write_all(usage.as_bytes()));
        };
        match &mut self.output {
            Some(out) => write(out.as_mut()),
            None => write(&mut io::stderr().lock()),
        }
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSet")
            .field("name", &self.name)
            .field("error_handling", &self.error_handling)
            .field("flags", &self.flags().map(|it| (it.name, it.value())).collect::<Vec<_>>())
            .field("parsed", &self.parsed)
            .field("args", &self.args)
            .finish()
    }
}
