#![cfg(test)]
//! Nested-selector joining: `&` substitution, implied descendants and
//! comma-group multiplication.

mod common;

use anyhow::Result;
use common::{block, compile, declaration, keyword, pixels, selector};
use nss_tree::tree::selector::{Combinator, Element, Selector};

#[test]
fn nesting_implies_a_descendant_combinator() -> Result<()> {
    common::init_logs();
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![block(
            vec![selector(".c")],
            vec![declaration("width", pixels(1.0))],
        )],
    )])?;
    assert_eq!(sheet, ".a .c {\n  width: 1px;\n}\n");
    Ok(())
}

#[test]
fn comma_groups_multiply_into_nested_blocks() -> Result<()> {
    common::init_logs();
    let sheet = compile(vec![block(
        vec![selector(".a"), selector(".b")],
        vec![block(
            vec![selector(".c")],
            vec![declaration("width", pixels(1.0))],
        )],
    )])?;
    assert_eq!(sheet, ".a .c,\n.b .c {\n  width: 1px;\n}\n");
    Ok(())
}

#[test]
fn parent_reference_appends_to_the_outer_selector() -> Result<()> {
    common::init_logs();
    // .a { color: red; &:hover { color: blue } }
    let hover = Selector::new(vec![
        Element::parent(Combinator::none()),
        Element::ident(Combinator::none(), ":hover"),
    ]);
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![
            declaration("color", keyword("red")),
            block(vec![hover], vec![declaration("color", keyword("blue"))]),
        ],
    )])?;
    assert_eq!(
        sheet,
        ".a {\n  color: red;\n}\n.a:hover {\n  color: blue;\n}\n"
    );
    Ok(())
}

#[test]
fn parent_reference_can_sit_at_the_end() -> Result<()> {
    common::init_logs();
    // .a { .x & { color: red } }
    let reversed = Selector::new(vec![
        Element::ident(Combinator::none(), ".x"),
        Element::parent(Combinator::descendant()),
    ]);
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![block(
            vec![reversed],
            vec![declaration("color", keyword("red"))],
        )],
    )])?;
    assert_eq!(sheet, ".x .a {\n  color: red;\n}\n");
    Ok(())
}

#[test]
fn explicit_child_combinator_survives_the_join() -> Result<()> {
    common::init_logs();
    // .a { > .c { width: 1px } }
    let child = Selector::new(vec![Element::ident(Combinator::new(">"), ".c")]);
    let sheet = compile(vec![block(
        vec![selector(".a")],
        vec![block(vec![child], vec![declaration("width", pixels(1.0))])],
    )])?;
    assert_eq!(sheet, ".a > .c {\n  width: 1px;\n}\n");
    Ok(())
}

#[test]
fn repeated_parent_references_permute_the_outer_group() -> Result<()> {
    common::init_logs();
    // .a, .b { & + & { color: red } }
    let doubled = Selector::new(vec![
        Element::parent(Combinator::none()),
        Element::parent(Combinator::new("+")),
    ]);
    let sheet = compile(vec![block(
        vec![selector(".a"), selector(".b")],
        vec![block(
            vec![doubled],
            vec![declaration("color", keyword("red"))],
        )],
    )])?;
    assert_eq!(
        sheet,
        ".a + .a,\n.a + .b,\n.b + .a,\n.b + .b {\n  color: red;\n}\n"
    );
    Ok(())
}
