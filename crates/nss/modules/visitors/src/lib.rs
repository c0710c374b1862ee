//! The compilation passes that run between tree evaluation and CSS
//! rendering: selector joining, visibility marking, extend processing,
//! and output finalization.
//!
//! All four share one generic driver. A pass implements [`Visitor`] and
//! the driver walks the rule tree, calling the in-hook before a node's
//! children and the out-hook after. Replacing passes splice the hook's
//! result into the parent rule list; non-replacing passes mutate nodes
//! in place and always hand them back.

#![forbid(unsafe_code)]

pub mod extend;
pub mod join;
pub mod to_css;
pub mod visibility;

pub use extend::ProcessExtendsVisitor;
pub use join::JoinSelectorVisitor;
pub use to_css::ToCssVisitor;
pub use visibility::mark_visibility;

use nss_tree::error::{CompileError, CompileResult};
use nss_tree::tree::{Rule, Ruleset};
use std::rc::Rc;

/// What the in-hook did with a node.
pub enum Splice {
    Keep(Rule),
    Remove,
    /// Flattened into the parent's rule list in replacing mode.
    Many(Vec<Rule>),
}

/// Per-visit flags the in-hook can set.
pub struct VisitArgs {
    /// Cleared by hooks that handle their own children.
    pub visit_deeper: bool,
}

pub trait Visitor {
    fn is_replacing(&self) -> bool {
        false
    }

    fn visit(&mut self, rule: Rule, args: &mut VisitArgs) -> CompileResult<Splice>;

    fn visit_out(&mut self, _rule: &mut Rule) -> CompileResult<()> {
        Ok(())
    }
}

/// Run a pass over the whole tree. The root ruleset goes through the
/// same hook protocol as any other rule.
pub fn visit_root<V: Visitor>(visitor: &mut V, root: Ruleset) -> CompileResult<Ruleset> {
    let mut visited = visit_one(visitor, Rule::Ruleset(root))?;
    match visited.len() {
        1 => match visited.remove(0) {
            Rule::Ruleset(ruleset) => Ok(ruleset),
            _ => Err(CompileError::runtime("pass replaced the root ruleset")),
        },
        _ => Err(CompileError::runtime("pass replaced the root ruleset")),
    }
}

/// Run a pass over one rule list, splicing replacing results.
pub fn visit_rules<V: Visitor>(visitor: &mut V, rules: Vec<Rule>) -> CompileResult<Vec<Rule>> {
    let mut visited = Vec::with_capacity(rules.len());
    for rule in rules {
        visited.extend(visit_one(visitor, rule)?);
    }
    Ok(visited)
}

pub(crate) fn visit_one<V: Visitor>(visitor: &mut V, rule: Rule) -> CompileResult<Vec<Rule>> {
    let mut args = VisitArgs { visit_deeper: true };
    let produced = match visitor.visit(rule, &mut args)? {
        Splice::Keep(kept) => vec![kept],
        Splice::Remove => Vec::new(),
        Splice::Many(many) => many,
    };
    let mut finished = Vec::with_capacity(produced.len());
    for mut kept in produced {
        if args.visit_deeper {
            descend(visitor, &mut kept)?;
        }
        visitor.visit_out(&mut kept)?;
        finished.push(kept);
    }
    Ok(finished)
}

/// Recurse into the rule-bearing children of a node.
fn descend<V: Visitor>(visitor: &mut V, rule: &mut Rule) -> CompileResult<()> {
    match rule {
        Rule::Ruleset(ruleset) => {
            let body = core::mem::take(&mut ruleset.rules);
            ruleset.rules = visit_rules(visitor, body)?;
        }
        Rule::Media(media) => {
            let bodies = core::mem::take(&mut media.rules);
            let mut visited = Vec::with_capacity(bodies.len());
            for body in bodies {
                for inner in visit_one(visitor, Rule::Ruleset(body))? {
                    if let Rule::Ruleset(ruleset) = inner {
                        visited.push(ruleset);
                    }
                }
            }
            media.rules = visited;
        }
        Rule::AtRule(at_rule) => {
            if let Some(body) = at_rule.rules.take() {
                let mut visited = visit_one(visitor, Rule::Ruleset(*body))?;
                if visited.len() == 1 {
                    if let Rule::Ruleset(ruleset) = visited.remove(0) {
                        at_rule.rules = Some(Box::new(ruleset));
                    }
                }
            }
        }
        Rule::MixinDefinition(definition) => {
            let inner = Rc::make_mut(definition);
            let body = core::mem::take(&mut inner.rules);
            inner.rules = visit_rules(visitor, body)?;
        }
        Rule::Declaration(_) | Rule::Comment(_) | Rule::MixinCall(_) | Rule::Extend(_) => {}
    }
    Ok(())
}
