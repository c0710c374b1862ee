#![allow(dead_code)]
//! Shared tree builders for compiler tests. The parser is out of scope,
//! so tests construct the evaluated-side input trees by hand.

use nss_orchestrator::compile_tree;
use nss_tree::Options;
use nss_tree::error::{CompileError, CompileResult};
use nss_tree::tree::selector::{Combinator, Element, Selector};
use nss_tree::tree::{Anonymous, Declaration, Dimension, Keyword, Rule, Ruleset, Value, Variable};

pub fn init_logs() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// A one-fragment selector such as `.a` or `#id`.
pub fn selector(name: &str) -> Selector {
    Selector::new(vec![Element::ident(Combinator::none(), name)])
}

/// A compound selector with no combinators, e.g. `.a:hover`.
pub fn compound(fragments: &[&str]) -> Selector {
    let elements = fragments
        .iter()
        .map(|fragment| Element::ident(Combinator::none(), *fragment))
        .collect();
    Selector::new(elements)
}

/// A descendant chain, e.g. `.a .b`.
pub fn descendant(fragments: &[&str]) -> Selector {
    let elements = fragments
        .iter()
        .enumerate()
        .map(|(position, fragment)| {
            let combinator = if position == 0 {
                Combinator::none()
            } else {
                Combinator::descendant()
            };
            Element::ident(combinator, *fragment)
        })
        .collect();
    Selector::new(elements)
}

pub fn block(selectors: Vec<Selector>, rules: Vec<Rule>) -> Rule {
    Rule::Ruleset(Ruleset::new(selectors, rules))
}

pub fn declaration(name: &str, value: Value) -> Rule {
    Rule::Declaration(Declaration::new(name, value))
}

pub fn keyword(text: &str) -> Value {
    Value::Keyword(Keyword::new(text))
}

pub fn anonymous(text: &str) -> Value {
    Value::Anonymous(Anonymous::new(text))
}

pub fn number(value: f64) -> Value {
    Value::Dimension(Dimension::number(value))
}

pub fn pixels(value: f64) -> Value {
    Value::Dimension(Dimension::with_unit(value, "px"))
}

pub fn variable(name: &str) -> Value {
    Value::Variable(Variable::new(name))
}

pub fn compile(rules: Vec<Rule>) -> CompileResult<String> {
    compile_tree(Ruleset::root(rules), &Options::default())
}

pub fn compile_with(rules: Vec<Rule>, options: &Options) -> CompileResult<String> {
    compile_tree(Ruleset::root(rules), options)
}

pub fn compile_compressed(rules: Vec<Rule>) -> CompileResult<String> {
    let options = Options {
        compress: true,
        ..Options::default()
    };
    compile_tree(Ruleset::root(rules), &options)
}

/// Unwrap the error side of a compile, failing the test with the
/// rendered sheet when compilation unexpectedly succeeded.
pub fn expect_error(result: CompileResult<String>) -> anyhow::Result<CompileError> {
    match result {
        Err(error) => Ok(error),
        Ok(sheet) => Err(anyhow::anyhow!("expected a compile error, got: {sheet}")),
    }
}
