//! The extend engine. A finder pass collects every extend riding on the
//! joined selector paths; the processor first chains extends onto each
//! other to a fixed point, then matches every extend against every
//! path and splices the extending selectors in.

use crate::{Splice, VisitArgs, Visitor, visit_root};
use nss_tree::error::{CompileError, CompileResult};
use nss_tree::output::RenderCtx;
use nss_tree::tree::selector::{Combinator, Element, ElementValue, Selector};
use nss_tree::tree::{Extend, Rule, Ruleset, Value};
use std::collections::{HashMap, HashSet};

/// An extend pulled off the tree, with the bookkeeping the processor
/// needs that the node itself does not carry.
#[derive(Clone)]
struct FoundExtend {
    extend: Extend,
    /// Only the first extend found on a selector path multiplies that
    /// path during chaining; the rest would produce duplicates.
    first_on_path: bool,
}

/// Collects extends from every joined path, assigning fresh identities,
/// and records which conditional block each one is scoped to.
struct ExtendFinder {
    all_extends_stack: Vec<Vec<FoundExtend>>,
    /// Extend lists of every media / at-rule block in visit order, so
    /// the processor (walking the same tree in the same order) can pair
    /// them back up.
    scoped: Vec<Vec<FoundExtend>>,
    open_scopes: Vec<usize>,
    found: bool,
}

impl ExtendFinder {
    fn new() -> Self {
        Self {
            all_extends_stack: vec![Vec::new()],
            scoped: Vec::new(),
            open_scopes: Vec::new(),
            found: false,
        }
    }

    fn enter_scope(&mut self) {
        self.scoped.push(Vec::new());
        self.open_scopes.push(self.scoped.len() - 1);
        self.all_extends_stack.push(Vec::new());
    }

    fn exit_scope(&mut self) {
        if let (Some(slot), Some(list)) = (self.open_scopes.pop(), self.all_extends_stack.pop()) {
            if let Some(entry) = self.scoped.get_mut(slot) {
                *entry = list;
            }
        }
    }
}

impl Visitor for ExtendFinder {
    fn visit(&mut self, rule: Rule, args: &mut VisitArgs) -> CompileResult<Splice> {
        match rule {
            Rule::Declaration(_) | Rule::MixinDefinition(_) => {
                args.visit_deeper = false;
                Ok(Splice::Keep(rule))
            }
            Rule::Ruleset(mut ruleset) => {
                if !ruleset.root {
                    // `&:extend(...);` rules apply to every path of the
                    // ruleset.
                    let every_path_extends: Vec<Extend> = ruleset
                        .rules
                        .iter()
                        .filter_map(|body_rule| match body_rule {
                            Rule::Extend(extend) => Some(extend.clone()),
                            _ => None,
                        })
                        .collect();
                    for path in &mut ruleset.paths {
                        let Some(last) = path.last() else {
                            continue;
                        };
                        let mut combined: Vec<Extend> = last
                            .extend_list
                            .iter()
                            .chain(&every_path_extends)
                            .map(Extend::derive)
                            .collect();
                        for (position, extend) in combined.iter_mut().enumerate() {
                            self.found = true;
                            extend.set_self_selectors(core::slice::from_ref(path));
                            if let Some(active) = self.all_extends_stack.last_mut() {
                                active.push(FoundExtend {
                                    extend: extend.clone(),
                                    first_on_path: position == 0,
                                });
                            }
                        }
                        // Write the derived copies back so the processor
                        // can recognize this path by their identities.
                        if let Some(last) = path.last_mut() {
                            last.extend_list = combined;
                        }
                    }
                }
                Ok(Splice::Keep(Rule::Ruleset(ruleset)))
            }
            Rule::Media(_) | Rule::AtRule(_) => {
                self.enter_scope();
                Ok(Splice::Keep(rule))
            }
            other => Ok(Splice::Keep(other)),
        }
    }

    fn visit_out(&mut self, rule: &mut Rule) -> CompileResult<()> {
        if matches!(rule, Rule::Media(_) | Rule::AtRule(_)) {
            self.exit_scope();
        }
        Ok(())
    }
}

/// Matches extends against the joined paths and appends the extended
/// selectors. Chained extends (an extend matching another extend's own
/// selector) are resolved up front, to a fixed point.
pub struct ProcessExtendsVisitor {
    all_extends_stack: Vec<Vec<FoundExtend>>,
    scoped: Vec<Vec<FoundExtend>>,
    scope_cursor: usize,
    /// Paths produced by chaining, waiting for the ruleset that owns
    /// the target extend; keyed by the target's identity.
    pending_paths: HashMap<usize, Vec<Vec<Selector>>>,
    matched: HashSet<usize>,
    warned: HashSet<String>,
}

impl ProcessExtendsVisitor {
    pub fn new() -> Self {
        Self {
            all_extends_stack: Vec::new(),
            scoped: Vec::new(),
            scope_cursor: 0,
            pending_paths: HashMap::new(),
            matched: HashSet::new(),
            warned: HashSet::new(),
        }
    }

    pub fn run(&mut self, root: Ruleset) -> CompileResult<Ruleset> {
        let mut finder = ExtendFinder::new();
        let root = visit_root(&mut finder, root)?;
        if !finder.found {
            return Ok(root);
        }
        let mut all_extends = finder
            .all_extends_stack
            .into_iter()
            .next()
            .unwrap_or_default();
        let targets = all_extends.clone();
        all_extends.extend(self.chain(&targets, &targets, 0)?);
        self.scoped = finder.scoped;
        self.scope_cursor = 0;
        self.all_extends_stack = vec![all_extends];
        let new_root = visit_root(self, root)?;
        self.warn_unmatched();
        Ok(new_root)
    }

    fn warn_unmatched(&mut self) {
        let Some(all_extends) = self.all_extends_stack.first() else {
            return;
        };
        for found in all_extends {
            if found.extend.parent_ids.len() != 1 || self.matched.contains(&found.extend.object_id)
            {
                continue;
            }
            let selector = found
                .extend
                .selector
                .to_css(&mut RenderCtx::plain())
                .unwrap_or_else(|_| "_unknown_".to_owned());
            let key = format!("{} {selector}", found.extend.index);
            if self.warned.insert(key) {
                log::warn!("extend '{selector}' has no matches");
            }
        }
    }

    /// Extend-on-extend: an extend whose target matches another
    /// extend's own selector derives a new extend carrying both
    /// lineages. Derived extends chain further until nothing new
    /// appears.
    fn chain(
        &mut self,
        extends_list: &[FoundExtend],
        targets: &[FoundExtend],
        iteration: usize,
    ) -> CompileResult<Vec<FoundExtend>> {
        let mut to_add: Vec<FoundExtend> = Vec::new();
        for found in extends_list {
            for target in targets {
                if found.extend.parent_ids.contains(&target.extend.object_id) {
                    continue;
                }
                let Some(target_self) = target.extend.self_selectors.first() else {
                    continue;
                };
                let haystack = core::slice::from_ref(target_self);
                let matches = find_match(&found.extend, haystack);
                if matches.is_empty() {
                    continue;
                }
                self.matched.insert(found.extend.object_id);
                let is_visible = found.extend.visibility.is_visible() == Some(true);
                for self_selector in &found.extend.self_selectors {
                    let new_path = extend_selector(&matches, haystack, self_selector, is_visible);
                    let mut new_extend =
                        Extend::new(target.extend.selector.clone(), target.extend.mode);
                    new_extend.file_info = target.extend.file_info.clone();
                    new_extend.visibility = target.extend.visibility.clone();
                    new_extend.self_selectors = new_path.clone();
                    let own_id = new_extend.object_id;
                    new_extend.parent_ids = core::iter::once(own_id)
                        .chain(target.extend.parent_ids.iter().copied())
                        .chain(found.extend.parent_ids.iter().copied())
                        .collect();
                    let mut out_path = new_path;
                    if let Some(last) = out_path.last_mut() {
                        last.extend_list = vec![new_extend.clone()];
                    }
                    if target.first_on_path {
                        self.pending_paths
                            .entry(target.extend.object_id)
                            .or_default()
                            .push(out_path);
                    }
                    to_add.push(FoundExtend {
                        extend: new_extend,
                        first_on_path: target.first_on_path,
                    });
                }
            }
        }
        if to_add.is_empty() {
            return Ok(to_add);
        }
        if iteration > 100 {
            let render = |selector: &Selector| {
                selector
                    .to_css(&mut RenderCtx::plain())
                    .unwrap_or_else(|_| "{unable to calculate}".to_owned())
            };
            let own = to_add
                .first()
                .and_then(|found| found.extend.self_selectors.first())
                .map_or_else(|| "{unable to calculate}".to_owned(), render);
            let target = to_add
                .first()
                .map_or_else(|| "{unable to calculate}".to_owned(), |found| {
                    render(&found.extend.selector)
                });
            return Err(CompileError::runtime(format!(
                "extend circular reference detected. One of the circular extends is currently:{own}:extend({target})"
            )));
        }
        let chained = self.chain(&to_add, targets, iteration + 1)?;
        to_add.extend(chained);
        Ok(to_add)
    }

    /// Paths produced by chaining land on the ruleset owning the target
    /// extend; appended paths can themselves carry pending targets.
    fn append_pending_paths(&mut self, ruleset: &mut Ruleset) {
        let mut queue: Vec<usize> = ruleset
            .paths
            .iter()
            .filter_map(|path| path.last())
            .flat_map(|last| last.extend_list.iter().map(|extend| extend.object_id))
            .collect();
        while let Some(target_id) = queue.pop() {
            let Some(new_paths) = self.pending_paths.remove(&target_id) else {
                continue;
            };
            for new_path in new_paths {
                if let Some(last) = new_path.last() {
                    queue.extend(last.extend_list.iter().map(|extend| extend.object_id));
                }
                ruleset.paths.push(new_path);
            }
        }
    }
}

impl Default for ProcessExtendsVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for ProcessExtendsVisitor {
    fn visit(&mut self, rule: Rule, args: &mut VisitArgs) -> CompileResult<Splice> {
        match rule {
            Rule::Declaration(_) | Rule::MixinDefinition(_) => {
                args.visit_deeper = false;
                Ok(Splice::Keep(rule))
            }
            Rule::Ruleset(mut ruleset) => {
                if !ruleset.root {
                    self.append_pending_paths(&mut ruleset);
                    let all_extends = self.all_extends_stack.last().cloned().unwrap_or_default();
                    let extend_on_every_path = ruleset
                        .rules
                        .iter()
                        .any(|body_rule| matches!(body_rule, Rule::Extend(_)));
                    let mut paths_to_add = Vec::new();
                    for found in &all_extends {
                        for path in &ruleset.paths {
                            // Paths that carry extends themselves were
                            // handled by chaining already.
                            if extend_on_every_path {
                                continue;
                            }
                            if path.last().is_some_and(|last| !last.extend_list.is_empty()) {
                                continue;
                            }
                            let matches = find_match(&found.extend, path);
                            if matches.is_empty() {
                                continue;
                            }
                            self.matched.insert(found.extend.object_id);
                            let is_visible =
                                found.extend.visibility.is_visible() == Some(true);
                            for self_selector in &found.extend.self_selectors {
                                paths_to_add.push(extend_selector(
                                    &matches,
                                    path,
                                    self_selector,
                                    is_visible,
                                ));
                            }
                        }
                    }
                    ruleset.paths.extend(paths_to_add);
                }
                Ok(Splice::Keep(Rule::Ruleset(ruleset)))
            }
            Rule::Media(_) | Rule::AtRule(_) => {
                let scoped = self
                    .scoped
                    .get(self.scope_cursor)
                    .cloned()
                    .unwrap_or_default();
                self.scope_cursor += 1;
                let mut combined = scoped.clone();
                combined.extend(self.all_extends_stack.last().cloned().unwrap_or_default());
                let chained = self.chain(&combined, &scoped, 0)?;
                combined.extend(chained);
                self.all_extends_stack.push(combined);
                Ok(Splice::Keep(rule))
            }
            other => Ok(Splice::Keep(other)),
        }
    }

    fn visit_out(&mut self, rule: &mut Rule) -> CompileResult<()> {
        if matches!(rule, Rule::Media(_) | Rule::AtRule(_)) {
            self.all_extends_stack.pop();
        }
        Ok(())
    }
}

/// A completed span of haystack elements the extend target matched.
#[derive(Clone)]
struct MatchSpan {
    path_index: usize,
    index: usize,
    initial_combinator: Combinator,
    end_path_index: usize,
    end_path_element_index: usize,
}

struct PotentialMatch {
    path_index: usize,
    index: usize,
    matched: usize,
    initial_combinator: Combinator,
}

/// Scan a selector path for spans matching the extend's target
/// selector. Without `all`, the target must cover the whole path.
fn find_match(extend: &Extend, haystack_path: &[Selector]) -> Vec<MatchSpan> {
    let needle = &extend.selector.elements;
    let mut potential: Vec<PotentialMatch> = Vec::new();
    let mut matches: Vec<MatchSpan> = Vec::new();

    for (path_index, haystack_selector) in haystack_path.iter().enumerate() {
        for (element_index, haystack_element) in haystack_selector.elements.iter().enumerate() {
            if extend.allows_before() || (path_index == 0 && element_index == 0) {
                potential.push(PotentialMatch {
                    path_index,
                    index: element_index,
                    matched: 0,
                    initial_combinator: haystack_element.combinator.clone(),
                });
            }

            let mut position = 0;
            while position < potential.len() {
                // An empty combinator at the front of a non-leading
                // selector renders as descent, so match it as one.
                let target_combinator = if haystack_element.combinator.value.is_empty()
                    && element_index == 0
                {
                    " "
                } else {
                    haystack_element.combinator.value.as_str()
                };
                let candidate = &potential[position];
                let step = needle.get(candidate.matched);
                let step_matches = step.is_some_and(|needle_element| {
                    element_values_equal(&needle_element.value, &haystack_element.value)
                        && (candidate.matched == 0
                            || needle_element.combinator.value == target_combinator)
                });
                if !step_matches {
                    potential.remove(position);
                    continue;
                }
                let entry = &mut potential[position];
                entry.matched += 1;
                let finished = entry.matched == needle.len();
                let has_tail = element_index + 1 < haystack_selector.elements.len()
                    || path_index + 1 < haystack_path.len();
                if finished && !extend.allows_after() && has_tail {
                    potential.remove(position);
                    continue;
                }
                if finished {
                    let completed = potential.remove(position);
                    matches.push(MatchSpan {
                        path_index: completed.path_index,
                        index: completed.index,
                        initial_combinator: completed.initial_combinator,
                        end_path_index: path_index,
                        end_path_element_index: element_index + 1,
                    });
                    // Matches never overlap; restart from scratch.
                    potential.clear();
                    break;
                }
                position += 1;
            }
        }
    }
    matches
}

/// Structural element equality, with attribute values compared by text.
fn element_values_equal(lhs: &ElementValue, rhs: &ElementValue) -> bool {
    match (lhs, rhs) {
        (ElementValue::Ident(first), ElementValue::Ident(second)) => first == second,
        (ElementValue::Attribute(first), ElementValue::Attribute(second)) => {
            if first.op != second.op || first.key != second.key {
                return false;
            }
            match (&first.value, &second.value) {
                (None, None) => true,
                (Some(first_value), Some(second_value)) => {
                    attribute_text(first_value) == attribute_text(second_value)
                }
                _ => false,
            }
        }
        (ElementValue::Nested(first), ElementValue::Nested(second)) => {
            selectors_equal(first, second)
        }
        _ => false,
    }
}

fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Quoted(quoted) => Some(quoted.value.clone()),
        other => other.plain_css().ok(),
    }
}

fn selectors_equal(lhs: &Selector, rhs: &Selector) -> bool {
    if lhs.elements.len() != rhs.elements.len() {
        return false;
    }
    for (position, (first, second)) in lhs.elements.iter().zip(&rhs.elements).enumerate() {
        if first.combinator.value != second.combinator.value {
            // Leading combinators loosen: empty and descendant are the
            // same thing at the front of a selector.
            let first_combinator = loosened(&first.combinator);
            let second_combinator = loosened(&second.combinator);
            if position != 0 || first_combinator != second_combinator {
                return false;
            }
        }
        if !element_values_equal(&first.value, &second.value) {
            return false;
        }
    }
    true
}

fn loosened(combinator: &Combinator) -> &str {
    if combinator.value.is_empty() {
        " "
    } else {
        &combinator.value
    }
}

/// Replace each matched span in the path with the extending selector,
/// keeping the unmatched surroundings intact.
fn extend_selector(
    matches: &[MatchSpan],
    selector_path: &[Selector],
    replacement: &Selector,
    is_visible: bool,
) -> Vec<Selector> {
    let mut current_path_index = 0;
    let mut current_element_index = 0;
    let mut path: Vec<Selector> = Vec::new();

    for (match_position, span) in matches.iter().enumerate() {
        let Some(matched_selector) = selector_path.get(span.path_index) else {
            continue;
        };
        let Some(replacement_head) = replacement.elements.first() else {
            continue;
        };
        let mut first_element =
            Element::new(span.initial_combinator.clone(), replacement_head.value.clone());
        first_element.index = replacement_head.index;
        first_element.file_info = replacement_head.file_info.clone();

        if span.path_index > current_path_index && current_element_index > 0 {
            if let (Some(last), Some(previous)) =
                (path.last_mut(), selector_path.get(current_path_index))
            {
                last.elements
                    .extend(previous.elements.iter().skip(current_element_index).cloned());
            }
            current_element_index = 0;
            current_path_index += 1;
        }

        let mut new_elements: Vec<Element> = matched_selector
            .elements
            .iter()
            .take(span.index)
            .skip(current_element_index)
            .cloned()
            .collect();
        new_elements.push(first_element);
        new_elements.extend(replacement.elements.iter().skip(1).cloned());

        if current_path_index == span.path_index && match_position > 0 {
            if let Some(last) = path.last_mut() {
                last.elements.extend(new_elements);
            }
        } else {
            path.extend(
                selector_path
                    .iter()
                    .take(span.path_index)
                    .skip(current_path_index)
                    .cloned(),
            );
            path.push(Selector::new(new_elements));
        }

        current_path_index = span.end_path_index;
        current_element_index = span.end_path_element_index;
        let span_selector_len = selector_path
            .get(current_path_index)
            .map_or(0, |selector| selector.elements.len());
        if current_element_index >= span_selector_len {
            current_element_index = 0;
            current_path_index += 1;
        }
    }

    if current_path_index < selector_path.len() && current_element_index > 0 {
        if let (Some(last), Some(rest)) = (path.last_mut(), selector_path.get(current_path_index)) {
            last.elements
                .extend(rest.elements.iter().skip(current_element_index).cloned());
        }
        current_path_index += 1;
    }
    path.extend(selector_path.iter().skip(current_path_index).cloned());

    path.into_iter()
        .map(|selector| {
            let mut derived = selector.create_derived(selector.elements.clone(), None);
            if is_visible {
                derived.visibility.ensure_visibility();
            } else {
                derived.visibility.ensure_invisibility();
            }
            derived
        })
        .collect()
}
