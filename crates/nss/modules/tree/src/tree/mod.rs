//! The typed node model. `Value` covers everything that can sit on the
//! right-hand side of a declaration; `Rule` covers everything that can
//! sit inside a ruleset body.
//!
//! Evaluation turns a parsed tree into an output-ready one: variables
//! and calls collapse, mixin calls splice their produced rules in, and
//! arithmetic folds where the math mode allows it.

pub mod anonymous;
pub mod atrule;
pub mod color;
pub mod comment;
pub mod declaration;
pub mod dimension;
pub mod expression;
pub mod extend;
pub mod mixin;
pub mod quoted;
pub mod ruleset;
pub mod selector;
pub mod variable;

pub use anonymous::{Anonymous, Assignment, Keyword};
pub use atrule::{AtRule, Media};
pub use color::Color;
pub use comment::Comment;
pub use declaration::{Declaration, DeclarationName, MergeMode};
pub use dimension::Dimension;
pub use expression::{Condition, ConditionOp, Expression, Negative, Operation, Paren, ValueList};
pub use extend::{Extend, ExtendMode};
pub use mixin::{Arg, MixinCall, MixinDefinition, Param};
pub use quoted::{Quoted, Url};
pub use ruleset::Ruleset;
pub use selector::{Attribute, Combinator, Element, ElementValue, Selector};
pub use variable::{Call, Property, Variable};

use crate::context::Eval;
use crate::error::CompileResult;
use crate::output::{Output, RenderCtx};
use core::cmp::Ordering;
use std::rc::Rc;

/// Binary operators arithmetic understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    #[inline]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    #[inline]
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide => lhs / rhs,
        }
    }
}

/// Reference visibility carried by output nodes. Blocks count how many
/// reference imports enclose a node; `visible` is the tri-state the
/// visibility pass and extend engine resolve together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeVisibility {
    blocks: u32,
    visible: Option<bool>,
}

impl NodeVisibility {
    #[inline]
    pub fn blocks_visibility(&self) -> bool {
        self.blocks > 0
    }

    #[inline]
    pub fn add_block(&mut self) {
        self.blocks += 1;
    }

    #[inline]
    pub fn remove_block(&mut self) {
        self.blocks = self.blocks.saturating_sub(1);
    }

    #[inline]
    pub fn ensure_visibility(&mut self) {
        self.visible = Some(true);
    }

    #[inline]
    pub fn ensure_invisibility(&mut self) {
        self.visible = Some(false);
    }

    #[inline]
    pub fn is_visible(&self) -> Option<bool> {
        self.visible
    }

    /// Adopt another node's visibility wholesale, the way replacement
    /// nodes inherit it from the construct they replace.
    #[inline]
    pub fn copy_from(&mut self, other: &NodeVisibility) {
        *self = other.clone();
    }
}

/// Expression-level nodes.
#[derive(Clone, Debug)]
pub enum Value {
    Anonymous(Anonymous),
    Keyword(Keyword),
    Assignment(Assignment),
    Quoted(Quoted),
    Url(Url),
    Color(Color),
    Dimension(Dimension),
    Paren(Paren),
    Negative(Negative),
    Operation(Operation),
    Expression(Expression),
    /// A comma-separated list.
    List(ValueList),
    Condition(Box<Condition>),
    Variable(Variable),
    Property(Property),
    Call(Call),
}

impl Value {
    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        match self {
            Self::Anonymous(node) => Ok(Self::Anonymous(node.clone())),
            Self::Keyword(node) => Ok(Self::Keyword(node.clone())),
            Self::Assignment(node) => node.eval(context),
            Self::Quoted(node) => node.eval(context).map(Self::Quoted),
            Self::Url(node) => node.eval(context).map(Self::Url),
            Self::Color(node) => Ok(Self::Color(node.clone())),
            Self::Dimension(node) => Ok(Self::Dimension(node.clone())),
            Self::Paren(node) => node.eval(context),
            Self::Negative(node) => node.eval(context),
            Self::Operation(node) => node.eval(context),
            Self::Expression(node) => node.eval(context),
            Self::List(node) => node.eval(context),
            Self::Condition(node) => node
                .eval_bool(context)
                .map(|flag| Self::Keyword(Keyword::bool(flag))),
            Self::Variable(node) => node.eval(context),
            Self::Property(node) => node.eval(context),
            Self::Call(node) => node.eval(context),
        }
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        match self {
            Self::Anonymous(node) => node.gen_css(output),
            Self::Keyword(node) => node.gen_css(output)?,
            Self::Assignment(node) => node.gen_css(context, output)?,
            Self::Quoted(node) => node.gen_css(output),
            Self::Url(node) => node.gen_css(context, output)?,
            Self::Color(node) => node.gen_css(context, output),
            Self::Dimension(node) => node.gen_css(context, output)?,
            Self::Paren(node) => node.gen_css(context, output)?,
            Self::Negative(node) => node.gen_css(context, output)?,
            Self::Operation(node) => node.gen_css(context, output)?,
            Self::Expression(node) => node.gen_css(context, output)?,
            Self::List(node) => node.gen_css(context, output)?,
            Self::Condition(_) => {}
            Self::Variable(node) => node.gen_css(output),
            Self::Property(node) => node.gen_css(output),
            Self::Call(node) => node.gen_css(context, output)?,
        }
        Ok(())
    }

    pub fn to_css(&self, context: &mut RenderCtx) -> CompileResult<String> {
        let mut output = Output::new();
        self.gen_css(context, &mut output)?;
        Ok(output.into_string())
    }

    /// Rendered text under default output settings, for comparisons and
    /// diagnostics where no render context is in scope.
    pub fn plain_css(&self) -> CompileResult<String> {
        self.to_css(&mut RenderCtx::plain())
    }
}

/// Statement-level nodes, the contents of a ruleset body.
#[derive(Clone, Debug)]
pub enum Rule {
    Declaration(Declaration),
    Comment(Comment),
    Ruleset(Ruleset),
    Media(Media),
    AtRule(AtRule),
    MixinDefinition(Rc<MixinDefinition>),
    MixinCall(MixinCall),
    Extend(Extend),
}

impl Rule {
    /// Evaluate a rule in place. Mixin calls are not handled here; they
    /// expand to many rules and are spliced by `Ruleset::eval` directly.
    pub fn eval(&self, context: &mut Eval) -> CompileResult<Rule> {
        match self {
            Self::Declaration(node) => node.eval(context).map(Self::Declaration),
            Self::Comment(node) => Ok(Self::Comment(node.clone())),
            Self::Ruleset(node) => node.eval(context).map(Self::Ruleset),
            Self::Media(node) => node.eval(context),
            Self::AtRule(node) => node.eval(context).map(Self::AtRule),
            Self::MixinDefinition(node) => Ok(Self::MixinDefinition(Rc::clone(node))),
            Self::MixinCall(node) => Ok(Self::MixinCall(node.clone())),
            Self::Extend(node) => node.eval(context).map(Self::Extend),
        }
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        match self {
            Self::Declaration(node) => node.gen_css(context, output),
            Self::Comment(node) => {
                node.gen_css(context, output);
                Ok(())
            }
            Self::Ruleset(node) => node.gen_css(context, output),
            Self::Media(node) => node.gen_css(context, output),
            Self::AtRule(node) => node.gen_css(context, output),
            Self::MixinDefinition(_) | Self::MixinCall(_) | Self::Extend(_) => Ok(()),
        }
    }

    /// Whether output for this rule ends in its own block instead of a
    /// semicolon, which changes separator handling in parents.
    pub fn is_ruleset_like(&self) -> bool {
        match self {
            Self::Ruleset(_) | Self::Media(_) => true,
            Self::AtRule(node) => node.is_ruleset_like(),
            _ => false,
        }
    }

    pub fn visibility(&self) -> &NodeVisibility {
        match self {
            Self::Declaration(node) => &node.visibility,
            Self::Comment(node) => &node.visibility,
            Self::Ruleset(node) => &node.visibility,
            Self::Media(node) => &node.visibility,
            Self::AtRule(node) => &node.visibility,
            Self::MixinDefinition(node) => &node.visibility,
            Self::MixinCall(node) => &node.visibility,
            Self::Extend(node) => &node.visibility,
        }
    }

    pub fn visibility_mut(&mut self) -> &mut NodeVisibility {
        match self {
            Self::Declaration(node) => &mut node.visibility,
            Self::Comment(node) => &mut node.visibility,
            Self::Ruleset(node) => &mut node.visibility,
            Self::Media(node) => &mut node.visibility,
            Self::AtRule(node) => &mut node.visibility,
            Self::MixinDefinition(node) => {
                &mut Rc::make_mut(node).visibility
            }
            Self::MixinCall(node) => &mut node.visibility,
            Self::Extend(node) => &mut node.visibility,
        }
    }
}

/// Numeric ordering with lexicographic fallback for strings, shared by
/// guard comparisons.
#[inline]
pub fn numeric_compare(lhs: f64, rhs: f64) -> Option<Ordering> {
    lhs.partial_cmp(&rhs)
}

/// Compare two values the way guard operators do. `None` means the two
/// are not comparable and every ordering operator is false.
pub fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Quoted(first), Value::Quoted(second)) => first.compare_quoted(second),
        (Value::Quoted(_) | Value::Anonymous(_), _)
        | (_, Value::Quoted(_) | Value::Anonymous(_)) => css_equal(lhs, rhs),
        (Value::Dimension(first), Value::Dimension(second)) => first.compare(second),
        (Value::Dimension(_), _) | (_, Value::Dimension(_)) => None,
        (Value::Color(first), Value::Color(second)) => first.compare(second),
        (Value::Color(_), _) | (_, Value::Color(_)) => None,
        (Value::Keyword(first), Value::Keyword(second)) => {
            (first.value == second.value).then_some(Ordering::Equal)
        }
        (Value::Expression(first), Value::Expression(second)) => {
            compare_lists(&first.value, &second.value)
        }
        (Value::List(first), Value::List(second)) => compare_lists(&first.value, &second.value),
        _ => None,
    }
}

fn compare_lists(lhs: &[Value], rhs: &[Value]) -> Option<Ordering> {
    if lhs.len() != rhs.len() {
        return None;
    }
    for (first, second) in lhs.iter().zip(rhs) {
        if compare(first, second) != Some(Ordering::Equal) {
            return None;
        }
    }
    Some(Ordering::Equal)
}

fn css_equal(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    let (Ok(first), Ok(second)) = (lhs.plain_css(), rhs.plain_css()) else {
        return None;
    };
    (first == second).then_some(Ordering::Equal)
}
