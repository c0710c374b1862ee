#![cfg(test)]
//! The extend engine: selector-level `:extend(...)`, the `&:extend`
//! rule form, `all` substitution, chains and scoping.

mod common;

use anyhow::Result;
use common::{block, compile, compound, declaration, keyword, pixels, selector};
use nss_tree::error::ErrorKind;
use nss_tree::tree::selector::Selector;
use nss_tree::tree::{Extend, ExtendMode, Media, Rule, Ruleset};

fn extending(name: &str, target: Selector, mode: ExtendMode) -> Selector {
    let mut extended = selector(name);
    extended.extend_list = vec![Extend::new(target, mode)];
    extended
}

#[test]
fn exact_extend_joins_the_target_selector_group() -> Result<()> {
    common::init_logs();
    // .a { color: red }  .b:extend(.a) { width: 1px }
    let sheet = compile(vec![
        block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        ),
        block(
            vec![extending(".b", selector(".a"), ExtendMode::Exact)],
            vec![declaration("width", pixels(1.0))],
        ),
    ])?;
    assert_eq!(
        sheet,
        ".a,\n.b {\n  color: red;\n}\n.b {\n  width: 1px;\n}\n"
    );
    Ok(())
}

#[test]
fn extend_rule_inside_a_block_behaves_like_the_selector_form() -> Result<()> {
    common::init_logs();
    // .a { color: red }  .b { &:extend(.a); width: 1px }
    let sheet = compile(vec![
        block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        ),
        block(
            vec![selector(".b")],
            vec![
                Rule::Extend(Extend::new(selector(".a"), ExtendMode::Exact)),
                declaration("width", pixels(1.0)),
            ],
        ),
    ])?;
    assert_eq!(
        sheet,
        ".a,\n.b {\n  color: red;\n}\n.b {\n  width: 1px;\n}\n"
    );
    Ok(())
}

#[test]
fn exact_extend_ignores_compound_variants() -> Result<()> {
    common::init_logs();
    // .a:hover is not an exact occurrence of .a, so nothing matches.
    let sheet = compile(vec![
        block(
            vec![compound(&[".a", ":hover"])],
            vec![declaration("color", keyword("blue"))],
        ),
        block(
            vec![extending(".b", selector(".a"), ExtendMode::Exact)],
            vec![declaration("width", pixels(1.0))],
        ),
    ])?;
    assert_eq!(
        sheet,
        ".a:hover {\n  color: blue;\n}\n.b {\n  width: 1px;\n}\n"
    );
    Ok(())
}

#[test]
fn all_mode_substitutes_inside_compound_selectors() -> Result<()> {
    common::init_logs();
    // .a:hover { color: blue }  .b:extend(.a all) { width: 1px }
    let sheet = compile(vec![
        block(
            vec![compound(&[".a", ":hover"])],
            vec![declaration("color", keyword("blue"))],
        ),
        block(
            vec![extending(".b", selector(".a"), ExtendMode::All)],
            vec![declaration("width", pixels(1.0))],
        ),
    ])?;
    assert_eq!(
        sheet,
        ".a:hover,\n.b:hover {\n  color: blue;\n}\n.b {\n  width: 1px;\n}\n"
    );
    Ok(())
}

#[test]
fn extend_chains_reach_the_transitive_target() -> Result<()> {
    common::init_logs();
    // .a { color: red }  .b:extend(.a) { width: 1px }  .c:extend(.b) {}
    let sheet = compile(vec![
        block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        ),
        block(
            vec![extending(".b", selector(".a"), ExtendMode::Exact)],
            vec![declaration("width", pixels(1.0))],
        ),
        block(
            vec![extending(".c", selector(".b"), ExtendMode::Exact)],
            Vec::new(),
        ),
    ])?;
    assert_eq!(
        sheet,
        ".a,\n.b,\n.c {\n  color: red;\n}\n.b,\n.c {\n  width: 1px;\n}\n"
    );
    Ok(())
}

#[test]
fn unmatched_extend_leaves_the_sheet_alone() -> Result<()> {
    common::init_logs();
    let sheet = compile(vec![block(
        vec![extending(".b", selector(".zzz"), ExtendMode::Exact)],
        vec![declaration("color", keyword("red"))],
    )])?;
    assert_eq!(sheet, ".b {\n  color: red;\n}\n");
    Ok(())
}

#[test]
fn extend_inside_media_only_matches_within_that_block() -> Result<()> {
    common::init_logs();
    // .a { color: red }
    // @media screen { .a { color: blue } .b:extend(.a) {} }
    let media_body = Ruleset::new(
        Vec::new(),
        vec![
            block(
                vec![selector(".a")],
                vec![declaration("color", keyword("blue"))],
            ),
            block(
                vec![extending(".b", selector(".a"), ExtendMode::Exact)],
                Vec::new(),
            ),
        ],
    );
    let sheet = compile(vec![
        block(
            vec![selector(".a")],
            vec![declaration("color", keyword("red"))],
        ),
        Rule::Media(Media::new(keyword("screen"), media_body)),
    ])?;
    assert_eq!(
        sheet,
        ".a {\n  color: red;\n}\n@media screen {\n  .a,\n  .b {\n    color: blue;\n  }\n}\n"
    );
    Ok(())
}

#[test]
fn runaway_extend_chains_are_cut_off() -> Result<()> {
    common::init_logs();
    // A chain of single-link extends long enough to outlast the
    // 100-iteration chaining guard.
    let mut rules: Vec<Rule> = (0..104)
        .map(|index| {
            block(
                vec![extending(
                    &format!(".e{index}"),
                    selector(&format!(".e{}", index + 1)),
                    ExtendMode::All,
                )],
                vec![declaration("color", keyword("red"))],
            )
        })
        .collect();
    rules.push(block(
        vec![selector(".e104")],
        vec![declaration("width", pixels(1.0))],
    ));
    let error = common::expect_error(compile(rules))?;
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert!(
        error.message.contains("extend circular reference detected"),
        "{error}"
    );
    Ok(())
}
