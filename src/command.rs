use std::fmt;

use crate::{flag, usage, CommandError, Error, ErrorHandling, FlagSet, Result};

/// What a leaf command does once dispatch lands on it.
///
/// `cmd` is the resolved leaf and `args` the positional arguments that
/// remained after every level parsed its flags. Any closure with a matching
/// signature is a handler.
pub trait Handler {
    fn invoke(&self, cmd: &Command, args: &[String]) -> anyhow::Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&Command, &[String]) -> anyhow::Result<()>,
{
    fn invoke(&self, cmd: &Command, args: &[String]) -> anyhow::Result<()> {
        self(cmd, args)
    }
}

/// Custom usage renderer, see [`Command::usage_with`].
pub type UsageFn = Box<dyn Fn(&Command) -> String>;

/// A node of the command tree.
///
/// A command without children is a leaf and needs a handler; a command with
/// children only parses its own flags and picks the next child by name. The
/// root's name is never matched, so it may be empty.
#[derive(Default)]
pub struct Command {
    name: String,
    short_desc: String,
    long_desc: String,
    flags: Option<FlagSet>,
    error_handling: ErrorHandling,
    handler: Option<Box<dyn Handler>>,
    usage: Option<UsageFn>,
    children: Vec<Command>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Command {
        Command { name: name.into(), ..Command::default() }
    }

    /// One line, shown next to the name in the parent's command listing.
    pub fn short_desc(mut self, text: impl Into<String>) -> Command {
        self.short_desc = text.into();
        self
    }

    /// Shown under the header of this command's own usage text.
    pub fn long_desc(mut self, text: impl Into<String>) -> Command {
        self.long_desc = text.into();
        self
    }

    /// Without one, a flag set is created on first visit, inheriting the
    /// error handling of the root's flag set.
    pub fn flags(mut self, flags: FlagSet) -> Command {
        self.flags = Some(flags);
        self
    }

    /// Only consulted on the root, once dispatch has failed.
    pub fn error_handling(mut self, error_handling: ErrorHandling) -> Command {
        self.error_handling = error_handling;
        self
    }

    pub fn handler(
        mut self,
        handler: impl Fn(&Command, &[String]) -> anyhow::Result<()> + 'static,
    ) -> Command {
        self.set_handler(handler);
        self
    }

    pub fn handler_with(mut self, handler: impl Handler + 'static) -> Command {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn subcommand(mut self, cmd: Command) -> Command {
        self.children.push(cmd);
        self
    }

    pub fn subcommands(mut self, cmds: impl IntoIterator<Item = Command>) -> Command {
        self.add(cmds);
        self
    }

    pub fn usage_with(mut self, render: impl Fn(&Command) -> String + 'static) -> Command {
        self.usage = Some(Box::new(render));
        self
    }

    pub fn set_handler(
        &mut self,
        handler: impl Fn(&Command, &[String]) -> anyhow::Result<()> + 'static,
    ) {
        self.handler = Some(Box::new(handler));
    }

    pub fn add(&mut self, cmds: impl IntoIterator<Item = Command>) {
        self.children.extend(cmds);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_short_desc(&self) -> &str {
        &self.short_desc
    }

    pub fn get_long_desc(&self) -> &str {
        &self.long_desc
    }

    pub fn get_error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    pub fn get_flags(&self) -> Option<&FlagSet> {
        self.flags.as_ref()
    }

    /// This command's flag set, created with [`ErrorHandling::ExitOnError`]
    /// if there is none yet.
    pub fn flags_mut(&mut self) -> &mut FlagSet {
        let name = &self.name;
        self.flags.get_or_insert_with(|| FlagSet::new(name.clone(), ErrorHandling::ExitOnError))
    }

    pub fn children(&self) -> &[Command] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// First child named exactly `name`.
    pub fn find(&self, name: &str) -> Option<&Command> {
        self.children.iter().find(|it| it.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Command> {
        self.children.iter_mut().find(|it| it.name == name)
    }

    pub fn usage(&self) -> String {
        match &self.usage {
            Some(render) => render(self),
            None => self.default_usage(),
        }
    }

    /// Name, long description, sub-commands and flags.
    pub fn default_usage(&self) -> String {
        usage::command(self)
    }

    /// Walks the tree along `args`, parsing each level's flags, and returns
    /// the leaf command together with the arguments left for it.
    ///
    /// On failure the root's [`ErrorHandling`] decides whether the error is
    /// returned, the process exits or a panic carrying the [`Error`] is
    /// raised.
    pub fn resolve<I>(&mut self, args: I) -> Result<(&Command, Vec<String>)>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let policy = self.error_handling;
        let inherited = self.flags.as_ref().map_or(ErrorHandling::ExitOnError, FlagSet::error_handling);
        let traversal = flag::next_traversal();
        let args = args.into_iter().map(Into::into).collect();

        let (leaf, args) =
            self.descend(args, 0, inherited, traversal).map_err(|err| err.handle(policy))?;
        Ok((&*leaf, args))
    }

    /// [`resolve`](Command::resolve)s `args` and invokes the leaf's handler.
    ///
    /// A leaf without a handler is a [`CommandError::NoHandler`]. Errors from
    /// the handler come back as [`Error::Handler`], untouched.
    pub fn run_and_dispatch<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let policy = self.error_handling;
        let (leaf, args) = self.resolve(args)?;
        let handler = match &leaf.handler {
            Some(it) => it,
            None => return Err(Error::from(CommandError::NoHandler(leaf.name.clone())).handle(policy)),
        };

        tracing::debug!(command = %leaf.name, ?args, "invoking handler");
        handler.invoke(leaf, &args).map_err(|err| Error::Handler(err).handle(policy))
    }

    /// Invokes this command's own handler, without any parsing.
    pub fn run(&self, args: &[String]) -> Result<()> {
        let handler =
            self.handler.as_ref().ok_or_else(|| CommandError::NoHandler(self.name.clone()))?;
        handler.invoke(self, args).map_err(Error::Handler)
    }

    fn descend(
        &mut self,
        mut args: Vec<String>,
        depth: usize,
        inherited: ErrorHandling,
        traversal: u64,
    ) -> Result<(&mut Command, Vec<String>)> {
        // The selector that led here goes before this level's flags.
        if depth > 0 && !args.is_empty() {
            args.remove(0);
        }
        tracing::trace!(command = %self.name, depth, ?args, "parsing flags");
        let args = self.parse_flags(args, inherited, traversal)?;

        if self.children.is_empty() {
            tracing::debug!(command = %self.name, ?args, "resolved leaf command");
            return Ok((self, args));
        }

        let selector = match args.first() {
            Some(it) => it,
            None if depth == 0 => return Err(CommandError::Missing.into()),
            None => return Err(CommandError::MissingFor(self.name.clone()).into()),
        };
        let child = match self.children.iter_mut().find(|it| it.name == *selector) {
            Some(it) => it,
            None => return Err(CommandError::Unknown(selector.clone()).into()),
        };
        child.descend(args, depth + 1, inherited, traversal)
    }

    fn parse_flags(
        &mut self,
        args: Vec<String>,
        inherited: ErrorHandling,
        traversal: u64,
    ) -> Result<Vec<String>> {
        let name = &self.name;
        let fset = self.flags.get_or_insert_with(|| FlagSet::new(name.clone(), inherited));
        fset.enter(traversal);

        let err = match fset.parse_args(args) {
            Ok(rest) => return Ok(rest),
            Err(err) => err,
        };
        let usage = self.usage();
        Err(self.flags_mut().fail(err, &usage).into())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("error_handling", &self.error_handling)
            .field("flags", &self.flags)
            .field("handler", &self.handler.is_some())
            .field("children", &self.children)
            .finish()
    }
}
