//! Mixin definitions and calls: parameter binding, pattern and guard
//! matching, the `default()` bucket protocol, and namespace lookup.

use crate::context::{Eval, Frame};
use crate::error::{CompileError, CompileResult};
use crate::info::FileInfo;
use crate::output::RenderCtx;
use crate::tree::declaration::Declaration;
use crate::tree::expression::{Condition, Expression};
use crate::tree::ruleset::{Ruleset, next_node_id};
use crate::tree::selector::{Combinator, Element, Selector};
use crate::tree::{NodeVisibility, Rule, Value};
use std::rc::Rc;

/// A formal parameter: `@name`, `@name: default`, a literal pattern
/// (no name), or `@rest...`.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: Option<String>,
    pub value: Option<Value>,
    pub variadic: bool,
}

impl Param {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: None,
            variadic: false,
        }
    }

    pub fn with_default(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value),
            variadic: false,
        }
    }

    pub fn pattern(value: Value) -> Self {
        Self {
            name: None,
            value: Some(value),
            variadic: false,
        }
    }

    pub fn rest(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: None,
            variadic: true,
        }
    }
}

/// An actual argument at a call site.
#[derive(Clone, Debug)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Value,
    /// `...` after the argument spreads a list into positional args.
    pub expand: bool,
}

impl Arg {
    pub fn positional(value: Value) -> Self {
        Self {
            name: None,
            value,
            expand: false,
        }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value,
            expand: false,
        }
    }
}

/// A parametric mixin definition. Evaluation (the eval-first pass)
/// captures the lexical frames; calling binds parameters into a scope
/// frame and evaluates the body inside the captured environment.
#[derive(Clone, Debug)]
pub struct MixinDefinition {
    pub name: String,
    /// The name as a one-element selector, for lookup.
    pub selectors: Vec<Selector>,
    pub params: Vec<Param>,
    pub rules: Vec<Rule>,
    pub condition: Option<Condition>,
    pub variadic: bool,
    pub arity: usize,
    pub required: usize,
    pub optional_parameters: Vec<String>,
    pub frames: Option<Vec<Rc<Frame>>>,
    pub original_id: usize,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub visibility: NodeVisibility,
}

impl MixinDefinition {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        rules: Vec<Rule>,
        condition: Option<Condition>,
        variadic: bool,
    ) -> Self {
        let name = name.into();
        let selectors = vec![Selector::new(vec![Element::ident(
            Combinator::none(),
            name.clone(),
        )])];
        let mut required = 0;
        let mut optional_parameters = Vec::new();
        for param in &params {
            match &param.name {
                Some(param_name) if param.value.is_some() => {
                    optional_parameters.push(param_name.clone());
                }
                _ => required += 1,
            }
        }
        Self {
            name,
            selectors,
            arity: params.len(),
            required,
            optional_parameters,
            params,
            rules,
            condition,
            variadic,
            frames: None,
            original_id: next_node_id(),
            index: 0,
            file_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    /// Wrap a plain ruleset so namespace-style calls reuse the calling
    /// machinery. Keeps the source ruleset's identity for recursion
    /// detection.
    pub fn anonymous(source: &Ruleset) -> Self {
        let mut definition = Self::new("", Vec::new(), source.rules.clone(), None, false);
        definition.original_id = source.original_id;
        definition.visibility = source.visibility.clone();
        definition
    }

    /// Capture the current frames. Runs in the eval-first pass so later
    /// calls see the definition's lexical environment.
    pub fn eval(&self, context: &Eval) -> MixinDefinition {
        let mut captured = self.clone();
        if captured.frames.is_none() {
            captured.frames = Some(context.frames.clone());
        }
        captured
    }

    pub fn make_important(&self) -> MixinDefinition {
        let mut important = self.clone();
        important.rules = important
            .rules
            .into_iter()
            .map(make_rule_important)
            .collect();
        important
    }

    /// Zero-argument compatibility, the namespace recursion filter.
    pub fn match_no_args(&self) -> bool {
        if self.variadic {
            self.required <= 1
        } else {
            self.required == 0
        }
    }

    /// Arity and pattern check. Patterns (unnamed parameters with a
    /// value) compare by rendered CSS against the call argument.
    pub fn match_args(&self, args: &[Arg], context: &mut Eval) -> CompileResult<bool> {
        let required_args = args
            .iter()
            .filter(|arg| {
                arg.name
                    .as_ref()
                    .is_none_or(|name| !self.optional_parameters.contains(name))
            })
            .count();
        if self.variadic {
            if required_args < self.required.saturating_sub(1) {
                return Ok(false);
            }
        } else {
            if required_args < self.required {
                return Ok(false);
            }
            if args.len() > self.params.len() {
                return Ok(false);
            }
        }
        let compare_len = required_args.min(self.arity);
        for position in 0..compare_len {
            let Some(param) = self.params.get(position) else {
                break;
            };
            if param.name.is_none() && !param.variadic {
                let (Some(arg), Some(pattern)) = (args.get(position), &param.value) else {
                    continue;
                };
                let arg_css = arg.value.eval(context)?.plain_css()?;
                let pattern_css = pattern.eval(context)?.plain_css()?;
                if arg_css != pattern_css {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Bind arguments to parameters, producing the scope frame the body
    /// evaluates inside. `evald_args` fills with the value bound to
    /// each parameter position, for `@arguments`.
    pub fn eval_params(
        &self,
        context: &mut Eval,
        mixin_frames: &[Rc<Frame>],
        args: &[Arg],
        evald_args: &mut Vec<Option<Value>>,
    ) -> CompileResult<Rc<Frame>> {
        let frame = Frame::new(Vec::new(), next_node_id());
        evald_args.clear();
        evald_args.resize(self.params.len().max(args.len()), None);
        let mut remaining: Vec<Arg> = args.to_vec();

        // Named arguments bind first, to their parameter's position.
        let mut position = 0;
        while position < remaining.len() {
            let Some(name) = remaining[position].name.clone() else {
                position += 1;
                continue;
            };
            let mut bound = false;
            for (slot, param) in self.params.iter().enumerate() {
                if evald_args[slot].is_none() && param.name.as_deref() == Some(name.as_str()) {
                    let value = remaining[position].value.eval(context)?;
                    frame.prepend_rule(Rule::Declaration(Declaration::new(
                        name.clone(),
                        value.clone(),
                    )));
                    evald_args[slot] = Some(value);
                    bound = true;
                    break;
                }
            }
            if bound {
                remaining.remove(position);
            } else {
                return Err(CompileError::runtime(format!(
                    "Named argument for {} {} not found",
                    self.name, name
                )));
            }
        }

        let args_length = remaining.len();
        let mut arg_index = 0;
        for (slot, param) in self.params.iter().enumerate() {
            if evald_args[slot].is_some() {
                continue;
            }
            if let Some(name) = &param.name {
                if param.variadic {
                    let mut rest = Vec::new();
                    for spread in remaining.iter().skip(arg_index) {
                        rest.push(spread.value.eval(context)?);
                    }
                    let bundled = Expression::new(rest).eval(context)?;
                    frame.prepend_rule(Rule::Declaration(Declaration::new(
                        name.clone(),
                        bundled,
                    )));
                } else {
                    let value = if let Some(arg) = remaining.get(arg_index) {
                        arg.value.eval(context)?
                    } else if let Some(default) = &param.value {
                        // Defaults see the parameters bound so far plus
                        // the mixin's own environment.
                        let mut default_frames =
                            Vec::with_capacity(mixin_frames.len() + 1);
                        default_frames.push(Rc::clone(&frame));
                        default_frames.extend(mixin_frames.iter().map(Rc::clone));
                        let value = context
                            .with_frames(default_frames, |scoped| default.eval(scoped))?;
                        frame.reset_cache();
                        value
                    } else {
                        return Err(CompileError::runtime(format!(
                            "wrong number of arguments for {} ({args_length} for {})",
                            self.name, self.arity
                        )));
                    };
                    frame.prepend_rule(Rule::Declaration(Declaration::new(
                        name.clone(),
                        value.clone(),
                    )));
                    evald_args[slot] = Some(value);
                }
            }
            if param.variadic {
                for (spread_slot, spread) in
                    remaining.iter().enumerate().skip(arg_index)
                {
                    evald_args[spread_slot] = Some(spread.value.eval(context)?);
                }
            }
            arg_index += 1;
        }
        Ok(frame)
    }

    /// Evaluate the body against bound arguments. The frame order is:
    /// the body's own scope (pushed by ruleset evaluation), the raw
    /// definition rules, the parameter frame, then the captured
    /// environment.
    pub fn eval_call(
        &self,
        context: &mut Eval,
        args: &[Arg],
        important: bool,
    ) -> CompileResult<Ruleset> {
        let mut mixin_frames: Vec<Rc<Frame>> = Vec::new();
        if let Some(frames) = &self.frames {
            mixin_frames.extend(frames.iter().map(Rc::clone));
        }
        mixin_frames.extend(context.frames.iter().map(Rc::clone));

        let mut evald_args = Vec::new();
        let params_frame = self.eval_params(context, &mixin_frames, args, &mut evald_args)?;
        let arguments: Vec<Value> = evald_args.into_iter().flatten().collect();
        let bundled = Expression::new(arguments).eval(context)?;
        params_frame.prepend_rule(Rule::Declaration(Declaration::new("@arguments", bundled)));

        let mut body = Ruleset::new(Vec::new(), self.rules.clone());
        body.original_id = self.original_id;
        let definition_frame = Frame::new(self.rules.clone(), self.original_id);
        let mut body_frames = Vec::with_capacity(mixin_frames.len() + 2);
        body_frames.push(definition_frame);
        body_frames.push(params_frame);
        body_frames.extend(mixin_frames);
        let mut evaluated = context.with_frames(body_frames, |scoped| body.eval(scoped))?;
        if important {
            evaluated = evaluated.make_important();
        }
        Ok(evaluated)
    }

    /// Evaluate the guard, binding arguments first so parameters are in
    /// scope inside the condition.
    pub fn match_condition(
        &self,
        args: &[Arg],
        context: &mut Eval,
    ) -> CompileResult<bool> {
        let Some(condition) = self.condition.clone() else {
            return Ok(true);
        };
        let mut mixin_frames: Vec<Rc<Frame>> = Vec::new();
        if let Some(frames) = &self.frames {
            mixin_frames.extend(frames.iter().map(Rc::clone));
        }
        mixin_frames.extend(context.frames.iter().map(Rc::clone));
        let mut evald_args = Vec::new();
        let params_frame = self.eval_params(context, &mixin_frames, args, &mut evald_args)?;

        let mut condition_frames = Vec::with_capacity(mixin_frames.len() + 1);
        condition_frames.push(params_frame);
        if let Some(frames) = &self.frames {
            condition_frames.extend(frames.iter().map(Rc::clone));
        }
        condition_frames.extend(context.frames.iter().map(Rc::clone));
        context.with_frames(condition_frames, |scoped| condition.eval_bool(scoped))
    }
}

fn make_rule_important(rule: Rule) -> Rule {
    match rule {
        Rule::Declaration(declaration) => Rule::Declaration(declaration.make_important()),
        Rule::MixinDefinition(definition) => {
            Rule::MixinDefinition(Rc::new(definition.make_important()))
        }
        other => other,
    }
}

/// A lookup result: the matched mixin and the namespaces walked through
/// to reach it, innermost first.
#[derive(Clone, Debug)]
pub struct FoundMixin {
    pub candidate: MixinCandidate,
    pub path: Vec<MixinCandidate>,
}

/// Anything callable as a mixin: a parametric definition, or a plain
/// ruleset called by selector.
#[derive(Clone, Debug)]
pub enum MixinCandidate {
    Definition(Rc<MixinDefinition>),
    Ruleset(Ruleset),
}

impl MixinCandidate {
    fn rules(&self) -> &[Rule] {
        match self {
            Self::Definition(definition) => &definition.rules,
            Self::Ruleset(ruleset) => &ruleset.rules,
        }
    }

    fn match_no_args(&self) -> bool {
        match self {
            Self::Definition(definition) => definition.match_no_args(),
            Self::Ruleset(_) => true,
        }
    }

    pub fn match_args(&self, args: &[Arg], context: &mut Eval) -> CompileResult<bool> {
        match self {
            Self::Definition(definition) => definition.match_args(args, context),
            Self::Ruleset(_) => Ok(args.is_empty()),
        }
    }

    /// Guard evaluation; plain rulesets have no guard of their own.
    pub fn match_condition(
        &self,
        args: &[Arg],
        context: &mut Eval,
    ) -> CompileResult<Option<bool>> {
        match self {
            Self::Definition(definition) => {
                definition.match_condition(args, context).map(Some)
            }
            Self::Ruleset(_) => Ok(None),
        }
    }
}

/// Search a rule list for mixins matching a call selector, descending
/// into namespaces whose remaining fragments match and which accept a
/// zero-argument call.
pub fn find_in_rules(rules: &[Rule], selector: &Selector) -> Vec<FoundMixin> {
    let mut found = Vec::new();
    for rule in rules {
        let candidate = match rule {
            Rule::Ruleset(ruleset) => MixinCandidate::Ruleset(ruleset.clone()),
            Rule::MixinDefinition(definition) => {
                MixinCandidate::Definition(Rc::clone(definition))
            }
            _ => continue,
        };
        let selectors = match &candidate {
            MixinCandidate::Definition(definition) => &definition.selectors,
            MixinCandidate::Ruleset(ruleset) => &ruleset.selectors,
        };
        for rule_selector in selectors {
            let matched = selector.match_prefix(rule_selector);
            if matched == 0 {
                continue;
            }
            if selector.elements.len() > matched {
                if candidate.match_no_args() {
                    let rest = Selector::new(selector.elements[matched..].to_vec());
                    for mut inner in find_in_rules(candidate.rules(), &rest) {
                        inner.path.push(candidate.clone());
                        found.push(inner);
                    }
                }
            } else {
                found.push(FoundMixin {
                    candidate: candidate.clone(),
                    path: Vec::new(),
                });
            }
            break;
        }
    }
    found
}

/// Which `default()` outcome lets a candidate's guard pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DefaultGroup {
    /// Fails either way.
    Never,
    /// Passes regardless of `default()`.
    Always,
    /// Passes only when `default()` is true.
    OnlyDefault,
    /// Passes only when `default()` is false.
    OnlyNonDefault,
}

/// A mixin call site.
#[derive(Clone, Debug)]
pub struct MixinCall {
    pub selector: Selector,
    pub args: Vec<Arg>,
    pub important: bool,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub visibility: NodeVisibility,
}

impl MixinCall {
    pub fn new(selector: Selector, args: Vec<Arg>) -> Self {
        Self {
            selector,
            args,
            important: false,
            index: 0,
            file_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    /// Resolve and expand the call, returning the produced rules.
    ///
    /// Guards evaluate twice, once per forced `default()` value, and
    /// candidates land in buckets; the final decision is global across
    /// candidates so definition order never matters.
    pub fn eval(&self, context: &mut Eval) -> CompileResult<Vec<Rule>> {
        let selector = self.selector.eval(context)?;
        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let value = arg.value.eval(context)?;
            let spread = match (&arg.expand, &value) {
                (true, Value::List(list)) => Some(list.value.clone()),
                (true, Value::Expression(expression)) => Some(expression.value.clone()),
                _ => None,
            };
            match spread {
                Some(parts) => {
                    args.extend(parts.into_iter().map(Arg::positional));
                }
                None => args.push(Arg {
                    name: arg.name.clone(),
                    value,
                    expand: false,
                }),
            }
        }

        let mut is_one_found = false;
        let frames = context.frames.clone();
        for frame in &frames {
            let mixins = frame.find(&selector);
            if mixins.is_empty() {
                continue;
            }
            is_one_found = true;
            let mut matched = false;
            let mut candidates: Vec<(FoundMixin, DefaultGroup)> = Vec::new();
            for found in mixins {
                if let MixinCandidate::Ruleset(ruleset) = &found.candidate {
                    let recursive = frames
                        .iter()
                        .any(|open| open.original_id == ruleset.original_id);
                    if recursive {
                        continue;
                    }
                }
                if found.candidate.match_args(&args, context)? {
                    matched = true;
                    let group = self.default_group(&found, &args, context)?;
                    if group != DefaultGroup::Never {
                        candidates.push((found, group));
                    }
                }
            }
            context.default_state.reset();

            let count = |group: DefaultGroup| {
                candidates
                    .iter()
                    .filter(|(_, candidate_group)| *candidate_group == group)
                    .count()
            };
            let chosen = if count(DefaultGroup::Always) > 0 {
                DefaultGroup::OnlyNonDefault
            } else {
                if count(DefaultGroup::OnlyDefault) + count(DefaultGroup::OnlyNonDefault) > 1 {
                    return Err(self.located(CompileError::runtime(format!(
                        "Ambiguous use of `default()` found when matching for `{}`",
                        self.format(&args)
                    ))));
                }
                DefaultGroup::OnlyDefault
            };

            let mut rules = Vec::new();
            for (found, group) in &candidates {
                if *group != DefaultGroup::Always && *group != chosen {
                    continue;
                }
                let definition = match &found.candidate {
                    MixinCandidate::Definition(definition) => Rc::clone(definition),
                    MixinCandidate::Ruleset(ruleset) => {
                        Rc::new(MixinDefinition::anonymous(ruleset))
                    }
                };
                let produced = definition
                    .eval_call(context, &args, self.important)
                    .map_err(|error| self.located(error))?;
                let mut new_rules = produced.rules;
                if self.visibility.blocks_visibility() {
                    for new_rule in &mut new_rules {
                        new_rule.visibility_mut().add_block();
                    }
                }
                rules.extend(new_rules);
            }
            if matched {
                return Ok(rules);
            }
        }

        if is_one_found {
            Err(self.located(CompileError::runtime(format!(
                "No matching definition was found for `{}`",
                self.format(&args)
            ))))
        } else {
            let name = selector
                .to_css(&mut RenderCtx::plain())
                .unwrap_or_default();
            Err(self.located(CompileError::name(format!(
                "{} is undefined",
                name.trim()
            ))))
        }
    }

    /// Evaluate all guards along the namespace path and on the mixin
    /// itself under both forced `default()` values.
    fn default_group(
        &self,
        found: &FoundMixin,
        args: &[Arg],
        context: &mut Eval,
    ) -> CompileResult<DefaultGroup> {
        let mut passes = [true, true];
        for (bucket, forced) in [(0_usize, false), (1, true)] {
            context.default_state.set_value(forced);
            for namespace in &found.path {
                if !passes[bucket] {
                    break;
                }
                if let Some(result) = namespace.match_condition(&[], context)? {
                    passes[bucket] = passes[bucket] && result;
                }
            }
            if passes[bucket] {
                if let Some(result) = found.candidate.match_condition(args, context)? {
                    passes[bucket] = passes[bucket] && result;
                }
            }
        }
        Ok(match (passes[0], passes[1]) {
            (false, false) => DefaultGroup::Never,
            (true, true) => DefaultGroup::Always,
            (false, true) => DefaultGroup::OnlyDefault,
            (true, false) => DefaultGroup::OnlyNonDefault,
        })
    }

    fn format(&self, args: &[Arg]) -> String {
        let mut render = RenderCtx::plain();
        let name = self
            .selector
            .to_css(&mut render)
            .unwrap_or_default()
            .trim()
            .to_owned();
        let rendered: Vec<String> = args
            .iter()
            .map(|arg| {
                let value = arg
                    .value
                    .to_css(&mut render)
                    .unwrap_or_else(|_| "???".to_owned());
                match &arg.name {
                    Some(arg_name) => format!("{arg_name}:{value}"),
                    None => value,
                }
            })
            .collect();
        format!("{name}({})", rendered.join(", "))
    }

    fn located(&self, error: CompileError) -> CompileError {
        error.at(
            self.index,
            self.file_info.as_ref().map(|info| info.filename.as_str()),
        )
    }
}
