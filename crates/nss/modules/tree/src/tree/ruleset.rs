//! Rulesets: the scoped body evaluation pass order (guards, definition
//! capture, mixin expansion, general evaluation, parent folding) and
//! block rendering.

use crate::context::{Eval, Frame};
use crate::error::CompileResult;
use crate::info::{DebugInfo, FileInfo};
use crate::output::{Output, RenderCtx};
use crate::tree::declaration::Declaration;
use crate::tree::mixin::MixinDefinition;
use crate::tree::selector::Selector;
use crate::tree::{NodeVisibility, Rule};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::rc::Rc;

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(1);

/// A fresh identity for a scope-carrying node. Evaluation copies keep
/// their source's identity so recursion is detectable across copies.
pub(crate) fn next_node_id() -> usize {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Debug)]
pub struct Ruleset {
    pub selectors: Vec<Selector>,
    pub rules: Vec<Rule>,
    /// Root rulesets render bare, without selectors or braces.
    pub root: bool,
    /// The outermost root of the whole compile.
    pub first_root: bool,
    /// Synthesized wrapper around several hoisted blocks.
    pub multi_media: bool,
    /// Joined output selector paths, filled by the join visitor.
    pub paths: Vec<Vec<Selector>>,
    pub original_id: usize,
    pub debug_info: Option<DebugInfo>,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub visibility: NodeVisibility,
}

impl Ruleset {
    pub fn new(selectors: Vec<Selector>, rules: Vec<Rule>) -> Self {
        Self {
            selectors,
            rules,
            root: false,
            first_root: false,
            multi_media: false,
            paths: Vec::new(),
            original_id: next_node_id(),
            debug_info: None,
            index: 0,
            file_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    /// The root ruleset wrapping a whole stylesheet.
    pub fn root(rules: Vec<Rule>) -> Self {
        let mut ruleset = Self::new(Vec::new(), rules);
        ruleset.root = true;
        ruleset.first_root = true;
        ruleset
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Ruleset> {
        let mut selectors = Vec::new();
        let mut has_passing_selector = true;
        if !self.selectors.is_empty() {
            has_passing_selector = false;
            // Selector guards may not call default(); arm the error it
            // surfaces as.
            context
                .default_state
                .set_error("it is currently only allowed in parametric mixin guards,");
            for selector in &self.selectors {
                let evaluated = selector.eval(context)?;
                if evaluated.evald_condition {
                    has_passing_selector = true;
                }
                selectors.push(evaluated);
            }
            context.default_state.reset();
        }
        let body = if has_passing_selector {
            self.rules.clone()
        } else {
            Vec::new()
        };
        let frame = Frame::new(body, self.original_id);
        context.frames.insert(0, Rc::clone(&frame));
        let media_block_count = context.media_blocks.len();

        // First pass: mixin definitions capture their environment
        // before anything else evaluates.
        for position in 0..frame.rules_len() {
            if let Some(Rule::MixinDefinition(definition)) = frame.rule_at(position) {
                let captured = definition.eval(context);
                frame.replace_rule(position, Rule::MixinDefinition(Rc::new(captured)));
            }
        }

        // Second pass: expand mixin calls in place. Produced variable
        // definitions never override ones this scope declares itself.
        let mut position = 0;
        while position < frame.rules_len() {
            let Some(rule) = frame.rule_at(position) else {
                break;
            };
            if let Rule::MixinCall(call) = rule {
                let produced = call.eval(context)?;
                let replacement: Vec<Rule> = produced
                    .into_iter()
                    .filter(|new_rule| match new_rule {
                        Rule::Declaration(declaration) if declaration.variable => {
                            frame.variable(declaration.name_text()).is_none()
                        }
                        _ => true,
                    })
                    .collect();
                let advance = replacement.len();
                frame.splice_rules(position, replacement);
                frame.reset_cache();
                position += advance;
            } else {
                position += 1;
            }
        }

        // Third pass: evaluate everything that is not a definition.
        for position in 0..frame.rules_len() {
            let Some(rule) = frame.rule_at(position) else {
                break;
            };
            if matches!(rule, Rule::MixinDefinition(_)) {
                continue;
            }
            let evaluated = rule.eval(context)?;
            frame.replace_rule(position, evaluated);
        }

        // Fourth pass: fold `&`-only child rulesets into this body.
        let mut position = 0;
        while position < frame.rules_len() {
            let Some(Rule::Ruleset(child)) = frame.rule_at(position) else {
                position += 1;
                continue;
            };
            let folds = child.selectors.len() == 1
                && child
                    .selectors
                    .first()
                    .is_some_and(Selector::is_just_parent_selector);
            if !folds {
                position += 1;
                continue;
            }
            let mut replacement = Vec::with_capacity(child.rules.len());
            for mut folded in child.rules {
                if let Rule::Declaration(declaration) = &folded {
                    if declaration.variable {
                        continue;
                    }
                }
                folded.visibility_mut().copy_from(&child.visibility);
                replacement.push(folded);
            }
            let advance = replacement.len();
            frame.splice_rules(position, replacement);
            position += advance;
        }

        context.frames.remove(0);

        // Hoisted blocks created inside this body wrap themselves in
        // this ruleset's selectors on the way out.
        for slot in media_block_count..context.media_blocks.len() {
            if let Some(media) = context.media_blocks.get_mut(slot).and_then(Option::as_mut) {
                media.bubble_selectors(&selectors);
            }
        }

        let mut evaluated = Ruleset::new(selectors, frame.clone_rules());
        evaluated.original_id = self.original_id;
        evaluated.root = self.root;
        evaluated.first_root = self.first_root;
        evaluated.multi_media = self.multi_media;
        evaluated.debug_info = self.debug_info.clone();
        evaluated.index = self.index;
        evaluated.file_info = self.file_info.clone();
        evaluated.visibility = self.visibility.clone();
        Ok(evaluated)
    }

    pub fn make_important(&self) -> Ruleset {
        let mut important = self.clone();
        important.rules = important
            .rules
            .into_iter()
            .map(|rule| match rule {
                Rule::Declaration(declaration) => {
                    Rule::Declaration(declaration.make_important())
                }
                Rule::MixinDefinition(definition) => {
                    Rule::MixinDefinition(Rc::new(definition.make_important()))
                }
                other => other,
            })
            .collect();
        important
    }

    /// The last `@name` declaration directly in this body.
    pub fn variable(&self, name: &str) -> Option<&Declaration> {
        self.rules.iter().rev().find_map(|rule| match rule {
            Rule::Declaration(declaration)
                if declaration.variable && declaration.name_text() == name =>
            {
                Some(declaration)
            }
            _ => None,
        })
    }

    /// Definitions wrapped from this ruleset keep its identity.
    pub fn as_definition(&self) -> MixinDefinition {
        MixinDefinition::anonymous(self)
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        if !self.root {
            context.tab_level += 1;
        }
        let tab_set = if context.compress {
            String::new()
        } else {
            "  ".repeat(context.tab_level.saturating_sub(1))
        };
        let tab_rule = if context.compress {
            String::new()
        } else {
            "  ".repeat(context.tab_level)
        };

        // @charset must lead the output; hoist any to the front,
        // keeping their relative order.
        let mut ordered: Vec<&Rule> = Vec::with_capacity(self.rules.len());
        let mut charset_index = 0;
        for rule in &self.rules {
            let is_charset = matches!(rule, Rule::AtRule(at_rule) if at_rule.is_charset());
            if is_charset {
                ordered.insert(charset_index, rule);
                charset_index += 1;
            } else {
                ordered.push(rule);
            }
        }

        if !self.root {
            if let Some(debug_info) = &self.debug_info {
                let rendered = debug_info.render(context.dump_line_numbers, context.compress);
                if !rendered.is_empty() {
                    output.add(&rendered);
                    output.add(&tab_set);
                }
            }
            let separator = if context.compress {
                ",".to_owned()
            } else {
                format!(",\n{tab_set}")
            };
            let mut first_path = true;
            for path in &self.paths {
                if path.is_empty() {
                    continue;
                }
                if !first_path {
                    output.add(&separator);
                }
                first_path = false;
                context.first_selector = true;
                for (position, selector) in path.iter().enumerate() {
                    selector.gen_css(context, output)?;
                    if position == 0 {
                        context.first_selector = false;
                    }
                }
            }
            output.add(if context.compress { "{" } else { " {\n" });
            output.add(&tab_rule);
        }

        let visible_count = ordered.len();
        for (position, rule) in ordered.iter().enumerate() {
            if position + 1 == visible_count {
                context.last_rule = true;
            }
            let last_rule = context.last_rule;
            if rule.is_ruleset_like() {
                context.last_rule = false;
            }
            rule.gen_css(context, output)?;
            context.last_rule = last_rule;
            if !context.last_rule && rule.visibility().is_visible() == Some(true) {
                if !context.compress {
                    output.add("\n");
                    output.add(&tab_rule);
                }
            } else {
                context.last_rule = false;
            }
        }

        if !self.root {
            output.add(if context.compress { "}" } else { "\n" });
            if !context.compress {
                output.add(&tab_set);
                output.add("}");
            }
            context.tab_level -= 1;
        }
        if !output.is_empty() && !context.compress && self.first_root {
            output.add("\n");
        }
        Ok(())
    }
}
