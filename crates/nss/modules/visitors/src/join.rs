//! Selector joining: replaces `&` parent references with the enclosing
//! output paths and multiplies nested selectors across comma groups.
//!
//! A path is a chain of selectors separated by descent; a ruleset's
//! `paths` list holds one path per comma alternative per parent
//! alternative. `.a, .b { .c {} }` produces the paths `.a .c` and
//! `.b .c`.

use crate::{Splice, VisitArgs, Visitor, visit_root};
use nss_tree::error::CompileResult;
use nss_tree::tree::selector::{Combinator, Element, ElementValue, Selector};
use nss_tree::tree::{Rule, Ruleset};

pub struct JoinSelectorVisitor {
    /// Parent path lists, innermost last. The root contributes an empty
    /// list so top-level selectors join against nothing.
    contexts: Vec<Vec<Vec<Selector>>>,
}

impl JoinSelectorVisitor {
    pub fn new() -> Self {
        Self {
            contexts: vec![Vec::new()],
        }
    }

    pub fn run(&mut self, root: Ruleset) -> CompileResult<Ruleset> {
        visit_root(self, root)
    }
}

impl Default for JoinSelectorVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for JoinSelectorVisitor {
    fn visit(&mut self, rule: Rule, args: &mut VisitArgs) -> CompileResult<Splice> {
        match rule {
            Rule::Declaration(_) | Rule::MixinDefinition(_) => {
                args.visit_deeper = false;
                Ok(Splice::Keep(rule))
            }
            Rule::Ruleset(mut ruleset) => {
                let context = self.contexts.last().cloned().unwrap_or_default();
                let mut paths = Vec::new();
                if !ruleset.root {
                    ruleset.selectors.retain(Selector::get_is_output);
                    if ruleset.selectors.is_empty() {
                        ruleset.rules = Vec::new();
                    } else {
                        for selector in &ruleset.selectors {
                            join_selector(&mut paths, &context, selector);
                        }
                    }
                    ruleset.paths = paths.clone();
                }
                self.contexts.push(paths);
                Ok(Splice::Keep(Rule::Ruleset(ruleset)))
            }
            Rule::Media(mut media) => {
                let parent_empty = self.contexts.last().is_none_or(Vec::is_empty);
                if let Some(body) = media.rules.first_mut() {
                    body.root = parent_empty;
                }
                Ok(Splice::Keep(Rule::Media(media)))
            }
            Rule::AtRule(mut at_rule) => {
                let parent_empty = self.contexts.last().is_none_or(Vec::is_empty);
                let rooted = at_rule.is_rooted;
                if let Some(body) = at_rule.rules.as_mut() {
                    body.root = rooted || parent_empty;
                }
                Ok(Splice::Keep(Rule::AtRule(at_rule)))
            }
            other => Ok(Splice::Keep(other)),
        }
    }

    fn visit_out(&mut self, rule: &mut Rule) -> CompileResult<()> {
        if matches!(rule, Rule::Ruleset(_)) {
            self.contexts.pop();
        }
        Ok(())
    }
}

/// Join one selector against every parent path, appending the results
/// to `paths`. Selectors without `&` prepend each parent path wholesale.
pub fn join_selector(paths: &mut Vec<Vec<Selector>>, context: &[Vec<Selector>], selector: &Selector) {
    let mut new_paths = Vec::new();
    let had_parent_selector = replace_parent_selector(&mut new_paths, context, selector);
    if !had_parent_selector {
        if context.is_empty() {
            new_paths = vec![vec![selector.clone()]];
        } else {
            new_paths = context
                .iter()
                .map(|parent_path| {
                    let mut concatenated: Vec<Selector> = parent_path
                        .iter()
                        .map(|parent| {
                            let mut derived =
                                parent.create_derived(parent.elements.clone(), None);
                            derived.visibility.copy_from(&selector.visibility);
                            derived
                        })
                        .collect();
                    concatenated.push(selector.clone());
                    concatenated
                })
                .collect();
        }
    }
    paths.append(&mut new_paths);
}

/// Replace every `&` inside `in_selector` by the parent paths, writing
/// the results to `paths`. Returns whether a `&` was found.
fn replace_parent_selector(
    paths: &mut Vec<Vec<Selector>>,
    context: &[Vec<Selector>],
    in_selector: &Selector,
) -> bool {
    let mut had_parent_selector = false;
    let mut current_elements: Vec<Element> = Vec::new();
    // Built up by multiplying against the parents, seeded with one
    // empty path.
    let mut new_selectors: Vec<Vec<Selector>> = vec![Vec::new()];

    for element in &in_selector.elements {
        if element.is_parent_reference() {
            had_parent_selector = true;
            merge_elements_on_to_selectors(&current_elements, &mut new_selectors);
            current_elements = Vec::new();

            let mut multiplied = Vec::new();
            for path in &new_selectors {
                if context.is_empty() {
                    // No parents: keep the path, moving the combinator
                    // of `&` onto a placeholder so it is not lost.
                    let mut kept = path.clone();
                    if let Some(first) = kept.first_mut() {
                        let mut carrier = Element::ident(element.combinator.clone(), "");
                        carrier.index = element.index;
                        carrier.file_info = element.file_info.clone();
                        first.elements.push(carrier);
                    }
                    multiplied.push(kept);
                } else {
                    for parent_path in context {
                        multiplied.push(add_replacement_into_path(
                            path,
                            parent_path,
                            element,
                            in_selector,
                        ));
                    }
                }
            }
            new_selectors = multiplied;
        } else if let ElementValue::Nested(nested) = &element.value {
            merge_elements_on_to_selectors(&current_elements, &mut new_selectors);
            current_elements = Vec::new();

            let mut nested_paths = Vec::new();
            let replaced = replace_parent_selector(&mut nested_paths, context, nested);
            had_parent_selector = had_parent_selector || replaced;
            let mut replaced_selectors = Vec::new();
            for nested_path in &nested_paths {
                let replacement = nested_replacement_selector(nested_path, element);
                for path in &new_selectors {
                    replaced_selectors.push(add_replacement_into_path(
                        path,
                        core::slice::from_ref(&replacement),
                        element,
                        in_selector,
                    ));
                }
            }
            new_selectors = replaced_selectors;
        } else {
            current_elements.push(element.clone());
        }
    }

    // Trailing elements after the last `&` tack onto every result.
    merge_elements_on_to_selectors(&current_elements, &mut new_selectors);

    for mut new_path in new_selectors {
        if new_path.is_empty() {
            continue;
        }
        if let Some(last) = new_path.last_mut() {
            *last = last.create_derived(last.elements.clone(), Some(in_selector.extend_list.clone()));
        }
        paths.push(new_path);
    }
    had_parent_selector
}

/// Join `beginning_path` with `add_path`, substituting `add_path` for
/// the element being replaced.
fn add_replacement_into_path(
    beginning_path: &[Selector],
    add_path: &[Selector],
    replaced_element: &Element,
    original_selector: &Selector,
) -> Vec<Selector> {
    let mut new_path: Vec<Selector>;
    let mut joined: Selector;
    if beginning_path.is_empty() {
        new_path = Vec::new();
        joined = original_selector.create_derived(Vec::new(), None);
    } else {
        new_path = beginning_path.to_vec();
        let last = new_path.pop().unwrap_or_else(|| original_selector.clone());
        joined = original_selector.create_derived(last.elements, None);
    }

    if let Some(parent_first) = add_path.first().and_then(|parent| parent.elements.first()) {
        // An explicit combinator on `&` wins; otherwise the parent's
        // own leading combinator survives the join.
        let combinator = if replaced_element.combinator.empty_or_whitespace
            && !parent_first.combinator.empty_or_whitespace
        {
            parent_first.combinator.clone()
        } else {
            replaced_element.combinator.clone()
        };
        let mut bridged = Element::new(combinator, parent_first.value.clone());
        bridged.index = replaced_element.index;
        bridged.file_info = replaced_element.file_info.clone();
        joined.elements.push(bridged);
        if let Some(parent) = add_path.first() {
            joined
                .elements
                .extend(parent.elements.iter().skip(1).cloned());
        }
    }

    if !joined.elements.is_empty() {
        new_path.push(joined);
    }

    if add_path.len() > 1 {
        new_path.extend(
            add_path[1..]
                .iter()
                .map(|selector| selector.create_derived(selector.elements.clone(), Some(Vec::new()))),
        );
    }
    new_path
}

/// Append pending literal elements onto every selector list built so
/// far, extending the last selector in each or starting one.
fn merge_elements_on_to_selectors(elements: &[Element], selectors: &mut Vec<Vec<Selector>>) {
    if elements.is_empty() {
        return;
    }
    if selectors.is_empty() {
        selectors.push(vec![Selector::new(elements.to_vec())]);
        return;
    }
    for path in selectors.iter_mut() {
        if let Some(last) = path.last_mut() {
            let mut combined = last.elements.clone();
            combined.extend(elements.iter().cloned());
            *last = last.create_derived(combined, None);
        } else {
            path.push(Selector::new(elements.to_vec()));
        }
    }
}

/// Wrap a resolved nested path back into a single parenthesized element
/// carried by a fresh one-element selector.
fn nested_replacement_selector(nested_path: &[Selector], original: &Element) -> Selector {
    let mut collapsed_elements = Vec::new();
    for (position, selector) in nested_path.iter().enumerate() {
        let mut parts = selector.elements.clone();
        if position > 0 {
            if let Some(first) = parts.first_mut() {
                if first.combinator.value.is_empty() {
                    first.combinator = Combinator::descendant();
                }
            }
        }
        collapsed_elements.extend(parts);
    }
    let collapsed = Selector::new(collapsed_elements);
    let mut wrapper = Element::new(
        Combinator::none(),
        ElementValue::Nested(Box::new(collapsed)),
    );
    wrapper.index = original.index;
    wrapper.file_info = original.file_info.clone();
    Selector::new(vec![wrapper])
}
