#![cfg(test)]
//! Final CSS generation: formatting in both modes, declaration merging
//! and deduplication, `@charset` handling, arithmetic and the error
//! surface of rendering.

mod common;

use anyhow::Result;
use common::{
    anonymous, block, compile, compile_compressed, declaration, expect_error, keyword, number,
    pixels, selector, variable,
};
use nss_orchestrator::transform;
use nss_tree::error::ErrorKind;
use nss_tree::output::{Output, RenderCtx};
use nss_tree::{MathMode, Options};
use nss_visitors::ToCssVisitor;
use nss_tree::tree::declaration::MergeMode;
use nss_tree::tree::expression::{Expression, Operation};
use nss_tree::tree::{
    AtRule, Comment, Declaration, Dimension, Operator, Quoted, Rule, Ruleset, Value,
};

fn merged(name: &str, value: Value, mode: MergeMode) -> Rule {
    let mut declaration = Declaration::new(name, value);
    declaration.merge = Some(mode);
    Rule::Declaration(declaration)
}

#[test]
fn pretty_output_separates_blocks_with_newlines() -> Result<()> {
    common::init_logs();
    let sheet = compile(vec![
        block(
            vec![selector(".a")],
            vec![
                declaration("color", keyword("red")),
                declaration("width", pixels(1.0)),
            ],
        ),
        block(
            vec![selector(".b")],
            vec![declaration("color", keyword("blue"))],
        ),
    ])?;
    assert_eq!(
        sheet,
        ".a {\n  color: red;\n  width: 1px;\n}\n.b {\n  color: blue;\n}\n"
    );
    Ok(())
}

#[test]
fn compressed_output_drops_whitespace_and_the_last_semicolon() -> Result<()> {
    common::init_logs();
    let sheet = compile_compressed(vec![block(
        vec![selector(".a")],
        vec![
            declaration("color", keyword("red")),
            declaration("width", pixels(1.0)),
        ],
    )])?;
    assert_eq!(sheet, ".a{color:red;width:1px}");
    Ok(())
}

#[test]
fn comma_merge_collects_values_into_the_first_occurrence() -> Result<()> {
    common::init_logs();
    // box-shadow+: ... twice merges into one comma list.
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![
            merged("box-shadow", anonymous("0 0 2px red"), MergeMode::Comma),
            merged("box-shadow", anonymous("0 0 4px blue"), MergeMode::Comma),
        ],
    )])?;
    assert_eq!(
        sheet,
        ".a {\n  box-shadow: 0 0 2px red, 0 0 4px blue;\n}\n"
    );
    Ok(())
}

#[test]
fn space_merge_extends_the_current_value_run() -> Result<()> {
    common::init_logs();
    // box-shadow+_: appends with a space instead of a comma.
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![
            merged("box-shadow", anonymous("0 0 2px red"), MergeMode::Comma),
            merged("box-shadow", anonymous("inset"), MergeMode::Space),
        ],
    )])?;
    assert_eq!(sheet, ".a {\n  box-shadow: 0 0 2px red inset;\n}\n");
    Ok(())
}

#[test]
fn identical_declarations_collapse_but_distinct_ones_stay() -> Result<()> {
    common::init_logs();
    let duplicated = compile(vec![block(
        vec![selector(".a")],
        vec![
            declaration("color", keyword("red")),
            declaration("color", keyword("red")),
        ],
    )])?;
    assert_eq!(duplicated, ".a {\n  color: red;\n}\n");

    let overridden = compile(vec![block(
        vec![selector(".a")],
        vec![
            declaration("color", keyword("red")),
            declaration("color", keyword("blue")),
        ],
    )])?;
    assert_eq!(overridden, ".a {\n  color: red;\n  color: blue;\n}\n");
    Ok(())
}

#[test]
fn charset_hoists_to_the_front_and_deduplicates() -> Result<()> {
    common::init_logs();
    let charset = || {
        Rule::AtRule(AtRule::new(
            "@charset",
            Some(Value::Quoted(Quoted::new("utf-8", '"', false))),
            None,
        ))
    };
    let sheet = compile(vec![
        block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        ),
        charset(),
        charset(),
    ])?;
    assert_eq!(sheet, "@charset \"utf-8\";\n.a {\n  color: red;\n}\n");
    Ok(())
}

#[test]
fn bodied_at_rules_render_their_block() -> Result<()> {
    common::init_logs();
    let font_face = AtRule::new(
        "@font-face",
        None,
        Some(Ruleset::new(
            Vec::new(),
            vec![declaration("font-family", keyword("test"))],
        )),
    );
    let sheet = compile(vec![Rule::AtRule(font_face)])?;
    assert_eq!(sheet, "@font-face {\n  font-family: test;\n}\n");
    Ok(())
}

#[test]
fn properties_at_the_root_are_rejected() -> Result<()> {
    common::init_logs();
    let error = expect_error(compile(vec![declaration("color", keyword("red"))]))?;
    assert_eq!(error.kind, ErrorKind::Syntax);
    assert_eq!(
        error.message,
        "Properties must be inside selector blocks. They cannot be in the root"
    );
    Ok(())
}

#[test]
fn undefined_variables_are_reported_by_name() -> Result<()> {
    common::init_logs();
    let error = expect_error(compile(vec![block(
        vec![selector(".a")],
        vec![declaration("width", variable("@width"))],
    )]))?;
    assert_eq!(error.kind, ErrorKind::Name);
    assert_eq!(error.message, "variable @width is undefined");
    Ok(())
}

#[test]
fn variable_definitions_substitute_and_never_render() -> Result<()> {
    common::init_logs();
    let sheet = compile(vec![
        declaration("@width", pixels(10.0)),
        block(
            vec![selector(".a")],
            vec![declaration("width", variable("@width"))],
        ),
    ])?;
    assert_eq!(sheet, ".a {\n  width: 10px;\n}\n");
    Ok(())
}

#[test]
fn addition_folds_to_a_single_dimension() -> Result<()> {
    common::init_logs();
    let sum = Value::Operation(Operation::new(Operator::Add, vec![pixels(1.0), pixels(2.0)]));
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![declaration("width", sum)],
    )])?;
    assert_eq!(sheet, ".a {\n  width: 3px;\n}\n");
    Ok(())
}

#[test]
fn division_stays_symbolic_outside_parentheses() -> Result<()> {
    common::init_logs();
    let mut ratio = Operation::new(Operator::Divide, vec![pixels(10.0), number(2.0)]);
    ratio.is_spaced = true;
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![declaration("width", Value::Operation(ratio))],
    )])?;
    assert_eq!(sheet, ".a {\n  width: 10px / 2;\n}\n");
    Ok(())
}

#[test]
fn division_folds_inside_parentheses() -> Result<()> {
    common::init_logs();
    let ratio = Operation::new(Operator::Divide, vec![pixels(10.0), number(2.0)]);
    let wrapped = Value::Expression(Expression::parenthesized(vec![Value::Operation(ratio)]));
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![declaration("width", wrapped)],
    )])?;
    assert_eq!(sheet, ".a {\n  width: 5px;\n}\n");
    Ok(())
}

#[test]
fn folding_zero_over_zero_is_rejected() -> Result<()> {
    common::init_logs();
    // (0 / 0) folds and must fail rather than emit NaN.
    let ratio = Operation::new(Operator::Divide, vec![number(0.0), number(0.0)]);
    let wrapped = Value::Expression(Expression::parenthesized(vec![Value::Operation(ratio)]));
    let error = expect_error(compile(vec![block(
        vec![selector(".a")],
        vec![declaration("width", wrapped)],
    )]))?;
    assert_eq!(error.kind, ErrorKind::Operation);
    assert!(error.message.contains("Dimension is not a number"), "{error}");
    Ok(())
}

#[test]
fn strict_units_reject_mismatched_operands() -> Result<()> {
    common::init_logs();
    let options = Options {
        strict_units: true,
        ..Options::default()
    };
    let sum = Value::Operation(Operation::new(
        Operator::Add,
        vec![pixels(1.0), Value::Dimension(Dimension::with_unit(1.0, "s"))],
    ));
    let error = expect_error(common::compile_with(
        vec![block(vec![selector(".a")], vec![declaration("width", sum)])],
        &options,
    ))?;
    assert_eq!(error.kind, ErrorKind::Operation);
    assert!(error.message.contains("Incompatible units"), "{error}");
    Ok(())
}

#[test]
fn block_comments_render_and_line_comments_disappear() -> Result<()> {
    common::init_logs();
    let sheet = compile(vec![
        Rule::Comment(Comment::new("/* banner */", false)),
        Rule::Comment(Comment::new("// silent", true)),
        block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        ),
    ])?;
    assert_eq!(sheet, "/* banner */\n.a {\n  color: red;\n}\n");
    Ok(())
}

#[test]
fn compression_keeps_only_bang_comments() -> Result<()> {
    common::init_logs();
    let sheet = compile_compressed(vec![
        Rule::Comment(Comment::new("/*! license */", false)),
        Rule::Comment(Comment::new("/* chatter */", false)),
        block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        ),
    ])?;
    assert_eq!(sheet, "/*! license */.a{color:red}");
    Ok(())
}

#[test]
fn important_markers_render_after_the_value() -> Result<()> {
    common::init_logs();
    let mut important = Declaration::new("color", keyword("red"));
    important.important = " !important".to_owned();
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![Rule::Declaration(important)],
    )])?;
    assert_eq!(sheet, ".a {\n  color: red !important;\n}\n");
    Ok(())
}

#[test]
fn always_math_divides_without_parentheses() -> Result<()> {
    common::init_logs();
    let options = Options {
        math: MathMode::Always,
        ..Options::default()
    };
    let ratio = Value::Operation(Operation::new(
        Operator::Divide,
        vec![pixels(10.0), number(2.0)],
    ));
    let sheet = common::compile_with(
        vec![block(
            vec![selector(".a")],
            vec![declaration("width", ratio)],
        )],
        &options,
    )?;
    assert_eq!(sheet, ".a {\n  width: 5px;\n}\n");
    Ok(())
}

#[test]
fn important_variables_carry_their_marker_to_the_use_site() -> Result<()> {
    common::init_logs();
    // @v: 1px !important;  .a { width: @v }
    let mut definition = Declaration::new("@v", pixels(1.0));
    definition.important = " !important".to_owned();
    let sheet = compile(vec![
        Rule::Declaration(definition),
        block(
            vec![selector(".a")],
            vec![declaration("width", variable("@v"))],
        ),
    ])?;
    assert_eq!(sheet, ".a {\n  width: 1px !important;\n}\n");
    Ok(())
}

#[test]
fn finalization_is_idempotent() -> Result<()> {
    common::init_logs();
    let options = Options::default();
    let root = Ruleset::root(vec![
        block(
            vec![selector(".a")],
            vec![
                declaration("color", keyword("red")),
                block(
                    vec![selector(".b")],
                    vec![declaration("width", pixels(1.0))],
                ),
            ],
        ),
        Rule::Comment(Comment::new("/* banner */", false)),
    ]);
    let finalized = transform(root, &options)?;

    let render = |tree: &Ruleset| -> Result<String> {
        let mut context = RenderCtx::from_options(&options);
        let mut sink = Output::new();
        tree.gen_css(&mut context, &mut sink)?;
        Ok(sink.into_string())
    };
    let once = render(&finalized)?;
    let again = ToCssVisitor::new(&options).run(finalized)?;
    assert_eq!(render(&again)?, once);
    Ok(())
}

#[test]
fn numeric_output_rounds_to_the_configured_precision() -> Result<()> {
    common::init_logs();
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![declaration("width", number(1.0 / 3.0))],
    )])?;
    assert_eq!(sheet, ".a {\n  width: 0.33333333;\n}\n");
    Ok(())
}
