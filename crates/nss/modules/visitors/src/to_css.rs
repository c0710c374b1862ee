//! Output finalization: the replacing pass that strips everything that
//! never renders (variables, mixin machinery, silent comments, blocked
//! subtrees), flattens nested rulesets into siblings, compiles joined
//! paths into output selectors, merges `+` declarations and drops
//! textual duplicates.

use crate::{Splice, VisitArgs, Visitor, visit_one, visit_root, visit_rules};
use nss_tree::error::{CompileError, CompileResult};
use nss_tree::options::Options;
use nss_tree::output::{Output, RenderCtx};
use nss_tree::tree::declaration::{Declaration, DeclarationName, MergeMode};
use nss_tree::tree::expression::{Expression, ValueList};
use nss_tree::tree::selector::Combinator;
use nss_tree::tree::{AtRule, Comment, Media, Rule, Ruleset, Value};
use std::collections::HashMap;

pub struct ToCssVisitor {
    render: RenderCtx,
    compress: bool,
    charset_seen: bool,
}

impl ToCssVisitor {
    pub fn new(options: &Options) -> Self {
        Self {
            render: RenderCtx::from_options(options),
            compress: options.compress,
            charset_seen: false,
        }
    }

    pub fn run(&mut self, root: Ruleset) -> CompileResult<Ruleset> {
        visit_root(self, root)
    }

    fn finalize_ruleset(
        &mut self,
        mut ruleset: Ruleset,
        args: &mut VisitArgs,
    ) -> CompileResult<Splice> {
        check_valid_nodes(&ruleset.rules, ruleset.first_root)?;
        let mut hoisted: Vec<Rule> = Vec::new();
        if ruleset.root {
            ruleset.rules = visit_rules(self, core::mem::take(&mut ruleset.rules))?;
        } else {
            compile_ruleset_paths(&mut ruleset);
            // Nested blocks move out to become siblings of this ruleset.
            let mut remaining = Vec::new();
            for child in core::mem::take(&mut ruleset.rules) {
                if is_rule_bearing(&child) {
                    hoisted.extend(visit_one(self, child)?);
                } else {
                    remaining.push(child);
                }
            }
            ruleset.rules = visit_rules(self, remaining)?;
        }
        args.visit_deeper = false;

        merge_declaration_rules(&mut ruleset.rules);
        self.remove_duplicate_rules(&mut ruleset.rules)?;

        if is_visible_ruleset(&ruleset) {
            ruleset.visibility.ensure_visibility();
            hoisted.insert(0, Rule::Ruleset(ruleset));
        }
        if hoisted.len() == 1 {
            hoisted
                .pop()
                .map_or(Ok(Splice::Remove), |only| Ok(Splice::Keep(only)))
        } else {
            Ok(Splice::Many(hoisted))
        }
    }

    fn finalize_media(&mut self, mut media: Media, args: &mut VisitArgs) -> CompileResult<Splice> {
        args.visit_deeper = false;
        let had_silent_child = media
            .rules
            .first()
            .is_some_and(|body| contains_silent_non_blocked(&body.rules, self.compress));
        let bodies = core::mem::take(&mut media.rules);
        for body in bodies {
            for finalized in visit_one(self, Rule::Ruleset(body))? {
                if let Rule::Ruleset(ruleset) = finalized {
                    media.rules.push(ruleset);
                }
            }
        }
        let empty = media.rules.is_empty();
        self.resolve_visibility(Rule::Media(media), empty, had_silent_child)
    }

    fn finalize_at_rule(
        &mut self,
        mut at_rule: AtRule,
        args: &mut VisitArgs,
    ) -> CompileResult<Splice> {
        let Some(body) = at_rule.rules.take() else {
            return self.finalize_bodyless_at_rule(at_rule);
        };
        args.visit_deeper = false;
        let had_silent_child = contains_silent_non_blocked(&body.rules, self.compress);
        let mut finalized = visit_one(self, Rule::Ruleset(*body))?;
        if finalized.len() == 1 {
            if let Some(Rule::Ruleset(ruleset)) = finalized.pop() {
                at_rule.rules = Some(Box::new(ruleset));
            }
        }
        if let Some(body) = at_rule.rules.as_mut() {
            merge_declaration_rules(&mut body.rules);
        }
        let empty = at_rule.rules.is_none();
        self.resolve_visibility(Rule::AtRule(at_rule), empty, had_silent_child)
    }

    /// `@charset` may legally appear only once, on the first line; any
    /// later one is dropped, or kept as a comment when it carries debug
    /// location info.
    fn finalize_bodyless_at_rule(&mut self, at_rule: AtRule) -> CompileResult<Splice> {
        if at_rule.visibility.blocks_visibility() {
            return Ok(Splice::Remove);
        }
        if at_rule.is_charset() {
            if self.charset_seen {
                if let Some(debug_info) = &at_rule.debug_info {
                    let mut output = Output::new();
                    at_rule.gen_css(&mut self.render.clone(), &mut output)?;
                    let text = output.into_string().replace('\n', "");
                    let mut comment = Comment::new(format!("/* {text} */\n"), false);
                    comment.debug_info = Some(debug_info.clone());
                    if comment.is_silent(self.compress) {
                        return Ok(Splice::Remove);
                    }
                    return Ok(Splice::Keep(Rule::Comment(comment)));
                }
                return Ok(Splice::Remove);
            }
            self.charset_seen = true;
        }
        Ok(Splice::Keep(Rule::AtRule(at_rule)))
    }

    /// A visibility-blocked block survives only if a referenced child
    /// made it visible; an unblocked one survives unless it came out
    /// empty without ever holding real content.
    fn resolve_visibility(
        &mut self,
        mut node: Rule,
        empty: bool,
        had_silent_child: bool,
    ) -> CompileResult<Splice> {
        if !node.visibility().blocks_visibility() {
            if empty && !had_silent_child {
                return Ok(Splice::Remove);
            }
            return Ok(Splice::Keep(node));
        }
        let body_rules = match &mut node {
            Rule::Media(media) => media.rules.first_mut().map(|body| &mut body.rules),
            Rule::AtRule(at_rule) => at_rule.rules.as_mut().map(|body| &mut body.rules),
            _ => None,
        };
        let Some(body_rules) = body_rules else {
            return Ok(Splice::Remove);
        };
        body_rules.retain(|child| child.visibility().is_visible() == Some(true));
        if body_rules.is_empty() {
            return Ok(Splice::Remove);
        }
        node.visibility_mut().ensure_visibility();
        node.visibility_mut().remove_block();
        Ok(Splice::Keep(node))
    }

    /// Walking backwards, drop declarations whose rendering matches an
    /// already-seen rendering for the same property name.
    fn remove_duplicate_rules(&mut self, rules: &mut Vec<Rule>) -> CompileResult<()> {
        let mut cache: HashMap<String, Vec<String>> = HashMap::new();
        let mut position = rules.len();
        while position > 0 {
            position -= 1;
            let Rule::Declaration(declaration) = &rules[position] else {
                continue;
            };
            let mut output = Output::new();
            declaration.gen_css(&mut self.render.clone(), &mut output)?;
            let rendered = output.into_string();
            let seen = cache
                .entry(declaration.name_text().to_owned())
                .or_default();
            if seen.contains(&rendered) {
                rules.remove(position);
            } else {
                seen.push(rendered);
            }
        }
        Ok(())
    }
}

impl Visitor for ToCssVisitor {
    fn is_replacing(&self) -> bool {
        true
    }

    fn visit(&mut self, rule: Rule, args: &mut VisitArgs) -> CompileResult<Splice> {
        match rule {
            Rule::Declaration(declaration) => {
                if declaration.visibility.blocks_visibility() || declaration.variable {
                    return Ok(Splice::Remove);
                }
                if matches!(declaration.name, DeclarationName::Parts(_)) {
                    return Err(CompileError::syntax("Properties must end with a semicolon")
                        .at(
                            declaration.index,
                            declaration
                                .file_info
                                .as_ref()
                                .map(|info| info.filename.as_str()),
                        ));
                }
                Ok(Splice::Keep(Rule::Declaration(declaration)))
            }
            Rule::Comment(comment) => {
                if comment.visibility.blocks_visibility() || comment.is_silent(self.compress) {
                    return Ok(Splice::Remove);
                }
                Ok(Splice::Keep(Rule::Comment(comment)))
            }
            Rule::MixinDefinition(_) | Rule::MixinCall(_) | Rule::Extend(_) => Ok(Splice::Remove),
            Rule::Ruleset(ruleset) => self.finalize_ruleset(ruleset, args),
            Rule::Media(media) => self.finalize_media(media, args),
            Rule::AtRule(at_rule) => self.finalize_at_rule(at_rule, args),
        }
    }
}

fn is_rule_bearing(rule: &Rule) -> bool {
    match rule {
        Rule::Ruleset(_) | Rule::Media(_) => true,
        Rule::AtRule(at_rule) => at_rule.rules.is_some(),
        _ => false,
    }
}

fn check_valid_nodes(rules: &[Rule], is_root: bool) -> CompileResult<()> {
    if !is_root {
        return Ok(());
    }
    for rule in rules {
        if let Rule::Declaration(declaration) = rule {
            if !declaration.variable {
                return Err(CompileError::syntax(
                    "Properties must be inside selector blocks. They cannot be in the root",
                )
                .at(
                    declaration.index,
                    declaration
                        .file_info
                        .as_ref()
                        .map(|info| info.filename.as_str()),
                ));
            }
        }
    }
    Ok(())
}

/// Keep only visible, output-worthy paths, and strip the leading
/// descendant combinator a join may have left on the first selector.
fn compile_ruleset_paths(ruleset: &mut Ruleset) {
    ruleset.paths.retain_mut(|path| {
        if let Some(first_element) = path
            .first_mut()
            .and_then(|selector| selector.elements.first_mut())
        {
            if first_element.combinator.value == " " {
                first_element.combinator = Combinator::none();
            }
        }
        path.iter()
            .any(|selector| selector.visibility.is_visible() == Some(true) && selector.get_is_output())
    });
}

fn is_visible_ruleset(ruleset: &Ruleset) -> bool {
    if ruleset.first_root {
        return true;
    }
    if ruleset.rules.is_empty() {
        return false;
    }
    if !ruleset.root && ruleset.paths.is_empty() {
        return false;
    }
    true
}

fn contains_silent_non_blocked(rules: &[Rule], compress: bool) -> bool {
    rules.iter().any(|rule| {
        matches!(rule, Rule::Comment(comment)
            if comment.is_silent(compress) && !comment.visibility.blocks_visibility())
    })
}

/// Merge `+` / `+_` flagged declarations of the same property into the
/// first occurrence: `+` starts a new comma group, `+_` extends the
/// current space run. Importance is adopted from the first flagged
/// declaration that carries it.
fn merge_declaration_rules(rules: &mut Vec<Rule>) {
    let mut first_of: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Declaration>)> = Vec::new();
    let mut position = 0;
    while position < rules.len() {
        let merged_name = match &rules[position] {
            Rule::Declaration(declaration) if declaration.merge.is_some() => {
                Some(declaration.name_text().to_owned())
            }
            _ => None,
        };
        let Some(name) = merged_name else {
            position += 1;
            continue;
        };
        let Rule::Declaration(declaration) = rules[position].clone() else {
            position += 1;
            continue;
        };
        if let Some(&group) = first_of.get(&name) {
            if let Some((_, members)) = groups.get_mut(group) {
                members.push(declaration);
            }
            rules.remove(position);
        } else {
            first_of.insert(name.clone(), groups.len());
            groups.push((name, vec![declaration]));
            position += 1;
        }
    }

    for (name, members) in groups {
        if members.len() < 2 {
            continue;
        }
        let (value, important) = merged_value(&members);
        let target = rules.iter_mut().find_map(|rule| match rule {
            Rule::Declaration(declaration)
                if declaration.merge.is_some() && declaration.name_text() == name =>
            {
                Some(declaration)
            }
            _ => None,
        });
        if let Some(declaration) = target {
            declaration.value = value;
            declaration.important = important;
        }
    }
}

fn merged_value(members: &[Declaration]) -> (Value, String) {
    let mut comma_groups: Vec<Vec<Value>> = vec![Vec::new()];
    let mut important = String::new();
    for member in members {
        if member.merge == Some(MergeMode::Comma)
            && comma_groups.last().is_some_and(|group| !group.is_empty())
        {
            comma_groups.push(Vec::new());
        }
        if let Some(current) = comma_groups.last_mut() {
            current.push(member.value.clone());
        }
        if important.is_empty() && !member.important.is_empty() {
            important = member.important.clone();
        }
    }
    let groups = comma_groups
        .into_iter()
        .map(|group| {
            if group.len() == 1 {
                group
                    .into_iter()
                    .next()
                    .map_or_else(|| Value::Expression(Expression::default()), |single| single)
            } else {
                Value::Expression(Expression::new(group))
            }
        })
        .collect();
    (Value::List(ValueList::new(groups)), important)
}
