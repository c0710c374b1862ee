//! Generic at-rules and the hoisted conditional blocks (`@media`,
//! `@supports` style) that bubble to the root with permuted features.

use crate::context::{Eval, Frame};
use crate::error::CompileResult;
use crate::info::{DebugInfo, FileInfo};
use crate::output::{Output, RenderCtx};
use crate::tree::expression::{Expression, ValueList};
use crate::tree::ruleset::Ruleset;
use crate::tree::selector::Selector;
use crate::tree::{Anonymous, NodeVisibility, Rule, Value};
use std::rc::Rc;

/// An at-rule such as `@charset` or `@font-face`: a name, an optional
/// prelude value, and an optional body.
#[derive(Clone, Debug)]
pub struct AtRule {
    pub name: String,
    pub value: Option<Value>,
    pub rules: Option<Box<Ruleset>>,
    /// Rooted at-rules (`@font-face` style) always render their body
    /// bare, whatever nesting they were written at.
    pub is_rooted: bool,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub debug_info: Option<DebugInfo>,
    pub visibility: NodeVisibility,
}

impl AtRule {
    pub fn new(name: impl Into<String>, value: Option<Value>, rules: Option<Ruleset>) -> Self {
        let rules = rules.map(|mut body| {
            if body.selectors.is_empty() {
                body.selectors = vec![Selector::empty_parent()];
            }
            Box::new(body)
        });
        Self {
            name: name.into(),
            value,
            rules,
            is_rooted: false,
            index: 0,
            file_info: None,
            debug_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    #[inline]
    pub fn is_charset(&self) -> bool {
        self.name == "@charset"
    }

    #[inline]
    pub fn is_ruleset_like(&self) -> bool {
        self.rules.is_some() || !self.is_charset()
    }

    /// Hoisted blocks inside another at-rule stay inside it; the
    /// hoisting buffers are saved and restored around the body.
    pub fn eval(&self, context: &mut Eval) -> CompileResult<AtRule> {
        let saved_blocks = core::mem::take(&mut context.media_blocks);
        let saved_path = core::mem::take(&mut context.media_path);
        let value = match &self.value {
            Some(value) => Some(value.eval(context)?),
            None => None,
        };
        let rules = match &self.rules {
            Some(body) => {
                let mut evaluated = body.eval(context)?;
                evaluated.root = true;
                Some(Box::new(evaluated))
            }
            None => None,
        };
        context.media_blocks = saved_blocks;
        context.media_path = saved_path;
        Ok(AtRule {
            name: self.name.clone(),
            value,
            rules,
            is_rooted: self.is_rooted,
            index: self.index,
            file_info: self.file_info.clone(),
            debug_info: self.debug_info.clone(),
            visibility: self.visibility.clone(),
        })
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        output.add_located(&self.name, self.file_info.as_deref(), self.index);
        if let Some(value) = &self.value {
            output.add(" ");
            value.gen_css(context, output)?;
        }
        match &self.rules {
            Some(body) => output_ruleset(context, output, body)?,
            None => output.add(";"),
        }
        Ok(())
    }
}

/// A `@media` block mid-compile. Evaluation hoists it: the block
/// registers itself in document order, nested blocks permute their
/// features with every enclosing block's, and the enclosing rulesets
/// wrap their selectors around the body on the way out.
#[derive(Clone, Debug)]
pub struct Media {
    pub features: Value,
    pub rules: Vec<Ruleset>,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub debug_info: Option<DebugInfo>,
    pub visibility: NodeVisibility,
}

impl Media {
    pub fn new(features: Value, body: Ruleset) -> Self {
        let mut body = body;
        if body.selectors.is_empty() {
            body.selectors = vec![Selector::empty_parent()];
        }
        Self {
            features,
            rules: vec![body],
            index: 0,
            file_info: None,
            debug_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Rule> {
        let features = self.features.eval(context)?;
        // Reserve this block's output slot before the body runs, so
        // inner blocks keep document order.
        let slot = context.media_blocks.len();
        context.media_blocks.push(None);
        context.media_path.push(features.clone());

        let Some(body) = self.rules.first() else {
            context.media_path.pop();
            return Ok(Rule::Ruleset(Ruleset::new(Vec::new(), Vec::new())));
        };
        let mut body = body.clone();
        if let Some(debug_info) = &self.debug_info {
            body.debug_info = Some(debug_info.clone());
        }
        let body_frame = Frame::new(body.rules.clone(), body.original_id);
        context.frames.insert(0, body_frame);
        let evaluated_body = body.eval(context);
        context.frames.remove(0);
        let evaluated_body = evaluated_body?;

        context.media_path.pop();
        let mut evaluated = Media {
            features,
            rules: vec![evaluated_body],
            index: self.index,
            file_info: self.file_info.clone(),
            debug_info: self.debug_info.clone(),
            visibility: self.visibility.clone(),
        };
        if context.media_path.is_empty() {
            context.media_blocks[slot] = Some(evaluated);
            Ok(Self::eval_top(context))
        } else {
            evaluated.features = permuted_features(&context.media_path, &evaluated.features);
            context.media_blocks[slot] = Some(evaluated);
            Ok(Rule::Ruleset(Ruleset::new(Vec::new(), Vec::new())))
        }
    }

    /// The outermost block collects everything hoisted below it. One
    /// block returns itself; several wrap in a multi-block ruleset.
    fn eval_top(context: &mut Eval) -> Rule {
        let blocks: Vec<Media> = context.media_blocks.drain(..).flatten().collect();
        context.media_path.clear();
        if blocks.len() == 1 {
            return blocks
                .into_iter()
                .next()
                .map_or_else(|| Rule::Ruleset(Ruleset::new(Vec::new(), Vec::new())), Rule::Media);
        }
        let visibility = blocks
            .first()
            .map(|block| block.visibility.clone())
            .unwrap_or_default();
        let rules = blocks.into_iter().map(Rule::Media).collect();
        let mut wrapper = Ruleset::new(vec![Selector::empty_parent()], rules);
        wrapper.multi_media = true;
        wrapper.visibility = visibility;
        Rule::Ruleset(wrapper)
    }

    /// Wrap the body in the enclosing ruleset's selectors, so joined
    /// output selectors survive the hoist.
    pub fn bubble_selectors(&mut self, selectors: &[Selector]) {
        if selectors.is_empty() {
            return;
        }
        let Some(body) = self.rules.pop() else {
            return;
        };
        self.rules = vec![Ruleset::new(
            selectors.to_vec(),
            vec![Rule::Ruleset(body)],
        )];
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        output.add_located("@media ", self.file_info.as_deref(), self.index);
        self.features.gen_css(context, output)?;
        match self.rules.first() {
            Some(body) => output_ruleset(context, output, body),
            None => {
                output.add(";");
                Ok(())
            }
        }
    }
}

/// Cross-join the features of every enclosing block with this block's
/// own, producing `outer and inner` alternatives for each combination.
fn permuted_features(path: &[Value], own: &Value) -> Value {
    let mut groups: Vec<Vec<Value>> = Vec::with_capacity(path.len() + 1);
    for features in path.iter().chain(core::iter::once(own)) {
        let alternatives = match features {
            Value::List(list) => list.value.clone(),
            other => vec![other.clone()],
        };
        groups.push(alternatives);
    }
    let combinations = permute(&groups);
    let joined = combinations
        .into_iter()
        .map(|combination| {
            let mut parts = Vec::with_capacity(combination.len() * 2);
            for (position, fragment) in combination.into_iter().enumerate() {
                if position > 0 {
                    parts.push(Value::Anonymous(Anonymous::new("and")));
                }
                parts.push(fragment);
            }
            Value::Expression(Expression::new(parts))
        })
        .collect();
    Value::List(ValueList::new(joined))
}

fn permute(groups: &[Vec<Value>]) -> Vec<Vec<Value>> {
    match groups {
        [] => Vec::new(),
        [only] => only.iter().map(|alternative| vec![alternative.clone()]).collect(),
        [first, rest @ ..] => {
            let tails = permute(rest);
            let mut combinations = Vec::with_capacity(first.len() * tails.len());
            for head in first {
                for tail in &tails {
                    let mut combination = Vec::with_capacity(tail.len() + 1);
                    combination.push(head.clone());
                    combination.extend(tail.iter().cloned());
                    combinations.push(combination);
                }
            }
            combinations
        }
    }
}

/// Shared block-body rendering for at-rules and hoisted blocks.
pub(crate) fn output_ruleset(
    context: &mut RenderCtx,
    output: &mut Output,
    body: &Ruleset,
) -> CompileResult<()> {
    context.tab_level += 1;
    if context.compress {
        output.add("{");
        body.gen_css(context, output)?;
        output.add("}");
        context.tab_level -= 1;
        return Ok(());
    }
    let tab_set = format!("\n{}", "  ".repeat(context.tab_level.saturating_sub(1)));
    let tab_rule = format!("{tab_set}  ");
    if body.rules.is_empty() {
        output.add(" {");
        output.add(&tab_set);
        output.add("}");
    } else {
        output.add(" {");
        output.add(&tab_rule);
        body.gen_css(context, output)?;
        output.add(&tab_set);
        output.add("}");
    }
    context.tab_level -= 1;
    Ok(())
}
