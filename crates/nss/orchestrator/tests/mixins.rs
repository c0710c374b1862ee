#![cfg(test)]
//! Mixin resolution end to end: parameter binding, guards with
//! `default()`, pattern dispatch, namespaces and the error surface.

mod common;

use anyhow::Result;
use common::{block, compile, compound, declaration, keyword, number, pixels, selector, variable};
use nss_tree::error::ErrorKind;
use nss_tree::tree::{
    Arg, Call, Condition, ConditionOp, MixinCall, MixinDefinition, Param, Rule, Value,
};
use std::rc::Rc;

fn definition(
    name: &str,
    params: Vec<Param>,
    rules: Vec<Rule>,
    condition: Option<Condition>,
) -> Rule {
    Rule::MixinDefinition(Rc::new(MixinDefinition::new(
        name, params, rules, condition, false,
    )))
}

fn call(name: &str, args: Vec<Arg>) -> Rule {
    Rule::MixinCall(MixinCall::new(selector(name), args))
}

/// The `default()` guard, as written `when (default())`.
fn default_guard() -> Condition {
    Condition::new(
        ConditionOp::Equal,
        Value::Call(Call::new("default", Vec::new())),
        keyword("true"),
    )
}

#[test]
fn missing_arguments_fall_back_to_parameter_defaults() -> Result<()> {
    common::init_logs();
    // .m(@x: 1) { width: @x }  .use { .m() }
    let sheet = compile(vec![
        definition(
            ".m",
            vec![Param::with_default("@x", number(1.0))],
            vec![declaration("width", variable("@x"))],
            None,
        ),
        block(vec![selector(".use")], vec![call(".m", Vec::new())]),
    ])?;
    assert_eq!(sheet, ".use {\n  width: 1;\n}\n");
    Ok(())
}

#[test]
fn named_arguments_bind_out_of_order() -> Result<()> {
    common::init_logs();
    // .m(@x: 1, @y: 2) { width: @x; height: @y }  .use { .m(@y: 10px) }
    let sheet = compile(vec![
        definition(
            ".m",
            vec![
                Param::with_default("@x", number(1.0)),
                Param::with_default("@y", number(2.0)),
            ],
            vec![
                declaration("width", variable("@x")),
                declaration("height", variable("@y")),
            ],
            None,
        ),
        block(
            vec![selector(".use")],
            vec![call(".m", vec![Arg::named("@y", pixels(10.0))])],
        ),
    ])?;
    assert_eq!(sheet, ".use {\n  width: 1;\n  height: 10px;\n}\n");
    Ok(())
}

#[test]
fn default_guard_yields_when_another_definition_matches() -> Result<()> {
    common::init_logs();
    // .choose(@size) when (@size > 10) { color: red }
    // .choose(@size) when (default())  { color: blue }
    let definitions = || {
        let sized = Condition::new(ConditionOp::Greater, variable("@size"), number(10.0));
        vec![
            definition(
                ".choose",
                vec![Param::named("@size")],
                vec![declaration("color", keyword("red"))],
                Some(sized),
            ),
            definition(
                ".choose",
                vec![Param::named("@size")],
                vec![declaration("color", keyword("blue"))],
                Some(default_guard()),
            ),
        ]
    };

    let mut wide_rules = definitions();
    wide_rules.push(block(
        vec![selector(".use")],
        vec![call(".choose", vec![Arg::positional(number(20.0))])],
    ));
    let wide = compile(wide_rules)?;
    assert_eq!(wide, ".use {\n  color: red;\n}\n");

    let mut narrow_rules = definitions();
    narrow_rules.push(block(
        vec![selector(".use")],
        vec![call(".choose", vec![Arg::positional(number(5.0))])],
    ));
    let narrow = compile(narrow_rules)?;
    assert_eq!(narrow, ".use {\n  color: blue;\n}\n");
    Ok(())
}

#[test]
fn pattern_parameters_dispatch_on_the_argument_value() -> Result<()> {
    common::init_logs();
    // .mode(dark) { color: black }  .mode(light) { color: white }
    let sheet = compile(vec![
        definition(
            ".mode",
            vec![Param::pattern(keyword("dark"))],
            vec![declaration("color", keyword("black"))],
            None,
        ),
        definition(
            ".mode",
            vec![Param::pattern(keyword("light"))],
            vec![declaration("color", keyword("white"))],
            None,
        ),
        block(
            vec![selector(".use")],
            vec![call(".mode", vec![Arg::positional(keyword("dark"))])],
        ),
    ])?;
    assert_eq!(sheet, ".use {\n  color: black;\n}\n");
    Ok(())
}

#[test]
fn important_calls_mark_every_expanded_declaration() -> Result<()> {
    common::init_logs();
    // .m() { color: red }  .use { .m() !important }
    let mut important_call = MixinCall::new(selector(".m"), Vec::new());
    important_call.important = true;
    let sheet = compile(vec![
        definition(
            ".m",
            Vec::new(),
            vec![declaration("color", keyword("red"))],
            None,
        ),
        block(
            vec![selector(".use")],
            vec![Rule::MixinCall(important_call)],
        ),
    ])?;
    assert_eq!(sheet, ".use {\n  color: red !important;\n}\n");
    Ok(())
}

#[test]
fn plain_rulesets_are_callable_as_mixins() -> Result<()> {
    common::init_logs();
    // .base { color: red }  .use { .base; }
    let sheet = compile(vec![
        block(
            vec![selector(".base")],
            vec![declaration("color", keyword("red"))],
        ),
        block(vec![selector(".use")], vec![call(".base", Vec::new())]),
    ])?;
    assert_eq!(
        sheet,
        ".base {\n  color: red;\n}\n.use {\n  color: red;\n}\n"
    );
    Ok(())
}

#[test]
fn namespaced_mixins_resolve_through_their_container() -> Result<()> {
    common::init_logs();
    // #ns { .m() { color: green } }  .use { #ns.m() }
    let namespaced = compound(&["#ns", ".m"]);
    let sheet = compile(vec![
        block(
            vec![selector("#ns")],
            vec![definition(
                ".m",
                Vec::new(),
                vec![declaration("color", keyword("green"))],
                None,
            )],
        ),
        block(
            vec![selector(".use")],
            vec![Rule::MixinCall(MixinCall::new(namespaced, Vec::new()))],
        ),
    ])?;
    assert_eq!(sheet, ".use {\n  color: green;\n}\n");
    Ok(())
}

#[test]
fn competing_default_guards_are_ambiguous() -> Result<()> {
    common::init_logs();
    // Two candidates that both hinge on default() cannot be ordered.
    let error = common::expect_error(compile(vec![
        definition(
            ".pick",
            vec![Param::named("@x")],
            vec![declaration("color", keyword("red"))],
            Some(default_guard()),
        ),
        definition(
            ".pick",
            vec![Param::named("@x")],
            vec![declaration("color", keyword("blue"))],
            Some(default_guard()),
        ),
        block(
            vec![selector(".use")],
            vec![call(".pick", vec![Arg::positional(number(1.0))])],
        ),
    ]))?;
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert!(
        error.message.contains("Ambiguous use of `default()`"),
        "{error}"
    );
    Ok(())
}

#[test]
fn unknown_mixin_names_report_a_name_error() -> Result<()> {
    common::init_logs();
    let error = common::expect_error(compile(vec![block(
        vec![selector(".use")],
        vec![call(".nope", Vec::new())],
    )]))?;
    assert_eq!(error.kind, ErrorKind::Name);
    assert!(error.message.contains(".nope is undefined"), "{error}");
    Ok(())
}

#[test]
fn arity_mismatches_report_no_matching_definition() -> Result<()> {
    common::init_logs();
    let error = common::expect_error(compile(vec![
        definition(
            ".m",
            vec![Param::named("@a"), Param::named("@b")],
            Vec::new(),
            None,
        ),
        block(
            vec![selector(".use")],
            vec![call(".m", vec![Arg::positional(number(1.0))])],
        ),
    ]))?;
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert!(
        error.message.contains("No matching definition was found"),
        "{error}"
    );
    Ok(())
}
