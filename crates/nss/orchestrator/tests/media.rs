#![cfg(test)]
//! `@media` hoisting: blocks bubble to the root wrapped in their
//! enclosing selectors, and nested blocks permute their features.

mod common;

use anyhow::Result;
use common::{anonymous, block, compile, declaration, keyword, selector};
use nss_tree::tree::{Media, Rule, Ruleset, Value};

fn media(features: Value, rules: Vec<Rule>) -> Rule {
    Rule::Media(Media::new(features, Ruleset::new(Vec::new(), rules)))
}

#[test]
fn root_level_blocks_render_in_place() -> Result<()> {
    common::init_logs();
    // @media screen { .a { color: red } }
    let sheet = compile(vec![media(
        keyword("screen"),
        vec![block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        )],
    )])?;
    assert_eq!(sheet, "@media screen {\n  .a {\n    color: red;\n  }\n}\n");
    Ok(())
}

#[test]
fn blocks_inside_rulesets_adopt_the_outer_selector() -> Result<()> {
    common::init_logs();
    // .wrap { @media screen { color: red } }
    let sheet = compile(vec![block(
        vec![selector(".wrap")],
        vec![media(
            keyword("screen"),
            vec![declaration("color", keyword("red"))],
        )],
    )])?;
    assert_eq!(sheet, "@media screen {\n  .wrap {\n    color: red;\n  }\n}\n");
    Ok(())
}

#[test]
fn nested_blocks_permute_features_and_hoist_to_the_root() -> Result<()> {
    common::init_logs();
    // @media screen { .a { color: red } @media (min-width: 768px) { .b { color: blue } } }
    let sheet = compile(vec![media(
        keyword("screen"),
        vec![
            block(
                vec![selector(".a")],
                vec![declaration("color", keyword("red"))],
            ),
            media(
                anonymous("(min-width: 768px)"),
                vec![block(
                    vec![selector(".b")],
                    vec![declaration("color", keyword("blue"))],
                )],
            ),
        ],
    )])?;
    assert_eq!(
        sheet,
        "@media screen {\n  .a {\n    color: red;\n  }\n}\n\
         @media screen and (min-width: 768px) {\n  .b {\n    color: blue;\n  }\n}\n"
    );
    Ok(())
}

#[test]
fn rulesets_between_nested_blocks_wrap_the_inner_body() -> Result<()> {
    common::init_logs();
    // @media screen { .wrap { @media print { color: red } } }
    let sheet = compile(vec![media(
        keyword("screen"),
        vec![block(
            vec![selector(".wrap")],
            vec![media(
                keyword("print"),
                vec![declaration("color", keyword("red"))],
            )],
        )],
    )])?;
    assert_eq!(
        sheet,
        "@media screen and print {\n  .wrap {\n    color: red;\n  }\n}\n"
    );
    Ok(())
}

#[test]
fn empty_blocks_disappear_from_the_output() -> Result<()> {
    common::init_logs();
    let sheet = compile(vec![
        media(keyword("screen"), Vec::new()),
        block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        ),
    ])?;
    assert_eq!(sheet, ".a {\n  color: red;\n}\n");
    Ok(())
}

#[test]
fn compressed_blocks_drop_whitespace() -> Result<()> {
    common::init_logs();
    let sheet = common::compile_compressed(vec![media(
        keyword("screen"),
        vec![block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        )],
    )])?;
    assert_eq!(sheet, "@media screen{.a{color:red}}");
    Ok(())
}
