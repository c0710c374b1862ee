//! Tree-wide visibility seeding. Before extend processing every node is
//! marked visible (reference-blocked subtrees are left untouched); the
//! extend engine then derives per-selector visibility from the extends
//! it applies, and finalization filters on the result.

use nss_tree::tree::selector::Selector;
use nss_tree::tree::{NodeVisibility, Rule, Ruleset};
use std::rc::Rc;

/// Mark every non-blocked node in the tree visible or invisible.
pub fn mark_visibility(ruleset: &mut Ruleset, visible: bool) {
    if ruleset.visibility.blocks_visibility() {
        return;
    }
    mark(&mut ruleset.visibility, visible);
    for selector in &mut ruleset.selectors {
        mark_selector(selector, visible);
    }
    for path in &mut ruleset.paths {
        for selector in path {
            mark_selector(selector, visible);
        }
    }
    for rule in &mut ruleset.rules {
        mark_rule(rule, visible);
    }
}

fn mark_rule(rule: &mut Rule, visible: bool) {
    if rule.visibility().blocks_visibility() {
        return;
    }
    match rule {
        Rule::Ruleset(ruleset) => mark_visibility(ruleset, visible),
        Rule::Media(media) => {
            mark(&mut media.visibility, visible);
            for body in &mut media.rules {
                mark_visibility(body, visible);
            }
        }
        Rule::AtRule(at_rule) => {
            mark(&mut at_rule.visibility, visible);
            if let Some(body) = at_rule.rules.as_mut() {
                mark_visibility(body, visible);
            }
        }
        Rule::MixinDefinition(definition) => {
            let inner = Rc::make_mut(definition);
            mark(&mut inner.visibility, visible);
            for body_rule in &mut inner.rules {
                mark_rule(body_rule, visible);
            }
        }
        Rule::Extend(extend) => mark(&mut extend.visibility, visible),
        Rule::Declaration(_) | Rule::Comment(_) | Rule::MixinCall(_) => {
            mark(rule.visibility_mut(), visible);
        }
    }
}

fn mark_selector(selector: &mut Selector, visible: bool) {
    if selector.visibility.blocks_visibility() {
        return;
    }
    mark(&mut selector.visibility, visible);
    for extend in &mut selector.extend_list {
        if !extend.visibility.blocks_visibility() {
            mark(&mut extend.visibility, visible);
        }
    }
}

fn mark(visibility: &mut NodeVisibility, visible: bool) {
    if visible {
        visibility.ensure_visibility();
    } else {
        visibility.ensure_invisibility();
    }
}
