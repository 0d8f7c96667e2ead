
use std::{cell::RefCell, io, rc::Rc};

use cmds::{Command, ErrorHandling, FlagSet};
use expect_test::{expect, Expect};

fn args(args: &str) -> Vec<String> {
    args.split_ascii_whitespace().map(String::from).collect()
}

fn check(root: &mut Command, args_: &str, expect: Expect) {
    match root.resolve(args(args_)) {
        Ok((leaf, rest)) => expect.assert_eq(&format!("{} {:?}", leaf.name(), rest)),
        Err(err) => expect.assert_eq(&err.to_string()),
    }
}

fn nop(_: &Command, _: &[String]) -> anyhow::Result<()> {
    Ok(())
}

/// A flag set that returns its errors and writes nothing.
fn quiet(name: &str) -> FlagSet {
    let mut fset = FlagSet::new(name, ErrorHandling::ReturnOnError);
    fset.set_output(io::sink());
    fset
}

/// Records which handler ran, and with what.
#[derive(Clone, Default)]
struct Calls(Rc<RefCell<Vec<String>>>);

impl Calls {
    fn handler(&self) -> impl Fn(&Command, &[String]) -> anyhow::Result<()> {
        let calls = self.clone();
        move |cmd: &Command, args: &[String]| -> anyhow::Result<()> {
            calls.0.borrow_mut().push(format!("{} {:?}", cmd.name(), args));
            Ok(())
        }
    }

    fn take(&self) -> Vec<String> {
        self.0.take()
    }
}

#[test]
fn handler_missing() {
    let mut cmd = Command::default();
    let err = cmd.run_and_dispatch(args("")).unwrap_err();
    assert!(err.is_command());
    expect![[r#"command error: command parse error: no handler for """#]]
        .assert_eq(&err.to_string());
}

#[test]
fn handler_nop() {
    let mut cmd = Command::default().handler(nop);
    cmd.run_and_dispatch(args("")).unwrap();
}

#[test]
fn root_leaf_args() {
    let calls = Calls::default();
    let mut cmd = Command::default().handler(calls.handler());
    cmd.run_and_dispatch(args("a b")).unwrap();
    expect![[r#"
        [
            " [\"a\", \"b\"]",
        ]
    "#]]
    .assert_debug_eq(&calls.take());
}

#[test]
fn root_leaf_flag_prefix() {
    let mut fset = quiet("root");
    let verbose = fset.bool("v", false, "");
    let level = fset.int("l", 0, "");
    let mut root = Command::new("root").flags(fset);

    check(&mut root, "-v -l 3 a -b", expect![[r#"root ["a", "-b"]"#]]);
    assert!(verbose.get());
    assert_eq!(level.get(), 3);
}

#[test]
fn flags_at_each_level() {
    let mut root_flags = quiet("test");
    let c = root_flags.bool("c", false, "");
    let mut sub_flags = quiet("sub");
    let d = sub_flags.bool("d", false, "");

    let calls = Calls::default();
    let mut root = Command::default()
        .flags(root_flags)
        .subcommand(Command::new("sub").flags(sub_flags).handler(calls.handler()));

    root.run_and_dispatch(args("-c sub -d a b")).unwrap();
    assert!(c.get());
    assert!(d.get());
    expect![[r#"
        [
            "sub [\"a\", \"b\"]",
        ]
    "#]]
    .assert_debug_eq(&calls.take());
}

#[test]
fn sibling_flags_stay_untouched() {
    let mut root_flags = quiet("root");
    let a = root_flags.bool("a", false, "");
    let mut sub0_flags = quiet("sub0");
    let b = sub0_flags.bool("b", false, "");
    let mut sub1_flags = quiet("sub1");
    let c = sub1_flags.bool("c", false, "");

    let mut root = Command::default().flags(root_flags).subcommands([
        Command::new("sub0").flags(sub0_flags).handler(nop),
        Command::new("sub1").flags(sub1_flags).handler(nop),
    ]);

    root.run_and_dispatch(args("-a sub0 -b")).unwrap();
    assert!(a.get());
    assert!(b.get());
    assert!(!c.get());
}

#[test]
fn commands_without_flags() {
    let mut root = Command::default().subcommands([Command::new("sub0"), Command::new("sub1")]);

    for input in ["", "sub0", "sub1", "sub2"] {
        let err = root.run_and_dispatch(args(input)).unwrap_err();
        assert!(err.is_command(), "{input:?}: {err}");
    }

    let calls = Calls::default();
    for name in ["sub0", "sub1"] {
        root.find_mut(name).unwrap().set_handler(calls.handler());
    }

    assert!(root.run_and_dispatch(args("")).is_err());
    root.run_and_dispatch(args("sub0")).unwrap();
    root.run_and_dispatch(args("sub1")).unwrap();
    let err = root.run_and_dispatch(args("sub2")).unwrap_err();
    expect![[r#"command error: command parse error: no such command "sub2""#]]
        .assert_eq(&err.to_string());

    expect![[r#"
        [
            "sub0 []",
            "sub1 []",
        ]
    "#]]
    .assert_debug_eq(&calls.take());
}

#[test]
fn nested_resolution() {
    let mut root = Command::new("git").subcommand(
        Command::new("remote")
            .subcommands([Command::new("add").handler(nop), Command::new("remove").handler(nop)]),
    );

    check(&mut root, "remote add origin url", expect![[r#"add ["origin", "url"]"#]]);
    check(&mut root, "remote remove origin", expect![[r#"remove ["origin"]"#]]);
    check(&mut root, "remote", expect![[r#"command error: command parse error: missing command for "remote""#]]);
    check(&mut root, "", expect!["command error: command parse error: missing command"]);
    check(&mut root, "remote Add", expect![[r#"command error: command parse error: no such command "Add""#]]);
    check(&mut root, "rem add", expect![[r#"command error: command parse error: no such command "rem""#]]);
}

#[test]
fn first_match_wins() {
    let calls = Calls::default();
    let mut root = Command::default().subcommands([
        Command::new("dup").short_desc("first").handler(calls.handler()),
        Command::new("dup").short_desc("second").handler(nop),
    ]);

    let (leaf, _) = root.resolve(args("dup")).unwrap();
    assert_eq!(leaf.get_short_desc(), "first");
    root.run_and_dispatch(args("dup x")).unwrap();
    assert_eq!(calls.take(), vec![r#"dup ["x"]"#.to_string()]);
}

#[test]
fn selector_is_stripped_before_child_flags() {
    let mut root_flags = quiet("root");
    let mode = root_flags.string("m", "", "");
    let mut sub_flags = quiet("sub");
    let d = sub_flags.bool("d", false, "");
    let mut root = Command::new("root")
        .flags(root_flags)
        .subcommand(Command::new("sub").flags(sub_flags).handler(nop));

    check(&mut root, "sub -d a", expect![[r#"sub ["a"]"#]]);
    assert!(d.get());

    // A flag value that collides with the selector is still the flag's.
    d.set(false);
    check(&mut root, "-m sub sub x", expect![[r#"sub ["x"]"#]]);
    assert_eq!(mode.get(), "sub");
    assert!(!d.get());
}

#[test]
fn child_named_like_root() {
    let mut root = Command::new("tool").subcommand(Command::new("tool").handler(nop));
    check(&mut root, "tool x", expect![[r#"tool ["x"]"#]]);
}

#[test]
fn lazy_flag_set_inherits_root_policy() {
    let mut root = Command::new("root")
        .flags(quiet("root"))
        .subcommand(Command::new("sub").handler(nop));
    assert!(root.find("sub").unwrap().get_flags().is_none());

    check(&mut root, "sub -z", expect!["command error: flag parse error: flag provided but not defined: -z"]);

    let sub = root.find("sub").unwrap().get_flags().unwrap();
    assert_eq!(sub.name(), "sub");
    assert_eq!(sub.error_handling(), ErrorHandling::ReturnOnError);
}

#[test]
fn unknown_flag_fails_before_lookup() {
    let calls = Calls::default();
    let mut root = Command::new("root")
        .flags(quiet("root"))
        .subcommand(Command::new("sub").handler(calls.handler()));

    check(&mut root, "-z sub", expect!["command error: flag parse error: flag provided but not defined: -z"]);
    check(&mut root, "-z nope", expect!["command error: flag parse error: flag provided but not defined: -z"]);
    assert!(calls.take().is_empty());
}

#[test]
fn reparse_across_dispatches() {
    let mut fset = quiet("root");
    let a = fset.bool("a", false, "");
    let b = fset.int("b", 0, "");
    let c = fset.string("c", "", "");
    let mut root = Command::new("root").flags(fset).handler(nop);

    root.run_and_dispatch(Vec::<String>::new()).unwrap();
    assert_eq!((a.get(), b.get(), c.get()), (false, 0, String::new()));

    root.run_and_dispatch(["-a", "-b", "42", "-c", "a b"]).unwrap();
    assert_eq!((a.get(), b.get(), c.get()), (true, 42, "a b".to_string()));

    let err = root.run_and_dispatch(["-z"]).unwrap_err();
    assert!(err.is_flag());
    assert!(root.get_flags().unwrap().parsed());
}

#[test]
fn run_skips_parsing() {
    let calls = Calls::default();
    let cmd = Command::new("direct").handler(calls.handler());
    cmd.run(&args("-x y")).unwrap();
    assert_eq!(calls.take(), vec![r#"direct ["-x", "y"]"#.to_string()]);

    let err = Command::new("bare").run(&[]).unwrap_err();
    assert!(err.is_command());
}

struct Greeter {
    greeting: &'static str,
    out: Calls,
}

impl cmds::Handler for Greeter {
    fn invoke(&self, cmd: &Command, args: &[String]) -> anyhow::Result<()> {
        self.out.0.borrow_mut().push(format!("{} {} {}", cmd.name(), self.greeting, args.join(" ")));
        Ok(())
    }
}

#[test]
fn handler_trait_object() {
    let out = Calls::default();
    let mut root = Command::default()
        .subcommand(Command::new("greet").handler_with(Greeter { greeting: "hello", out: out.clone() }));
    root.run_and_dispatch(args("greet world")).unwrap();
    assert_eq!(out.take(), vec!["greet hello world".to_string()]);
}

#[test]
fn error_handling_names() {
    let names = [ErrorHandling::ReturnOnError, ErrorHandling::ExitOnError, ErrorHandling::PanicOnError]
        .map(|it| it.to_string());
    assert_eq!(names, ["ReturnOnError", "ExitOnError", "PanicOnError"]);
    assert_eq!(ErrorHandling::default(), ErrorHandling::ReturnOnError);
}
