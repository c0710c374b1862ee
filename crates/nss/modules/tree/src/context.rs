//! The evaluation context: the lexical frame stack, math and calc
//! state, important-scope tracking, media hoisting buffers and the
//! function registry.

use crate::functions::{DefaultState, FunctionRegistry};
use crate::options::{MathMode, Options, RewriteUrls};
use crate::tree::declaration::{Declaration, DeclarationName};
use crate::tree::mixin::{FoundMixin, find_in_rules};
use crate::tree::selector::Selector;
use crate::tree::{Media, Operator, Rule, Value};
use core::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// One lexical scope on the frame stack. A frame wraps the rules of a
/// ruleset mid-evaluation; lookups are lazy and cached, and the cache
/// resets whenever mixin expansion splices new rules in.
#[derive(Debug, Default)]
pub struct Frame {
    rules: RefCell<Vec<Rule>>,
    variables: RefCell<Option<HashMap<String, Declaration>>>,
    properties: RefCell<Option<HashMap<String, Vec<Declaration>>>>,
    /// Identity of the ruleset this frame evaluates, stable across
    /// evaluation copies. Used to refuse recursive mixin calls.
    pub original_id: usize,
}

impl Frame {
    pub fn new(rules: Vec<Rule>, original_id: usize) -> Rc<Self> {
        Rc::new(Self {
            rules: RefCell::new(rules),
            variables: RefCell::new(None),
            properties: RefCell::new(None),
            original_id,
        })
    }

    #[inline]
    pub fn rules_len(&self) -> usize {
        self.rules.borrow().len()
    }

    #[inline]
    pub fn rule_at(&self, position: usize) -> Option<Rule> {
        self.rules.borrow().get(position).cloned()
    }

    pub fn replace_rule(&self, position: usize, rule: Rule) {
        let mut rules = self.rules.borrow_mut();
        if let Some(slot) = rules.get_mut(position) {
            *slot = rule;
        }
    }

    /// Replace the rule at `position` with many rules, as mixin call
    /// expansion does.
    pub fn splice_rules(&self, position: usize, replacement: Vec<Rule>) {
        let mut rules = self.rules.borrow_mut();
        if position < rules.len() {
            rules.splice(position..=position, replacement);
        }
    }

    /// Insert a rule at the front, used while binding mixin parameters.
    pub fn prepend_rule(&self, rule: Rule) {
        self.rules.borrow_mut().insert(0, rule);
        self.reset_cache();
    }

    #[inline]
    pub fn clone_rules(&self) -> Vec<Rule> {
        self.rules.borrow().clone()
    }

    pub fn reset_cache(&self) {
        *self.variables.borrow_mut() = None;
        *self.properties.borrow_mut() = None;
    }

    /// The last `@name` declaration in this scope, if any.
    pub fn variable(&self, name: &str) -> Option<Declaration> {
        self.ensure_variable_cache();
        self.variables
            .borrow()
            .as_ref()
            .and_then(|cache| cache.get(name).cloned())
    }

    /// Every `$name` declaration in this scope, in order.
    pub fn property(&self, name: &str) -> Option<Vec<Declaration>> {
        self.ensure_property_cache();
        self.properties
            .borrow()
            .as_ref()
            .and_then(|cache| cache.get(name).cloned())
    }

    /// Mixin lookup against this scope's rules.
    pub fn find(&self, selector: &Selector) -> Vec<FoundMixin> {
        find_in_rules(&self.rules.borrow(), selector)
    }

    fn ensure_variable_cache(&self) {
        if self.variables.borrow().is_some() {
            return;
        }
        let mut cache = HashMap::new();
        for rule in self.rules.borrow().iter() {
            if let Rule::Declaration(declaration) = rule {
                if declaration.variable {
                    if let DeclarationName::Plain(name) = &declaration.name {
                        cache.insert(name.clone(), declaration.clone());
                    }
                }
            }
        }
        *self.variables.borrow_mut() = Some(cache);
    }

    fn ensure_property_cache(&self) {
        if self.properties.borrow().is_some() {
            return;
        }
        let mut cache: HashMap<String, Vec<Declaration>> = HashMap::new();
        for rule in self.rules.borrow().iter() {
            if let Rule::Declaration(declaration) = rule {
                if !declaration.variable {
                    if let DeclarationName::Plain(name) = &declaration.name {
                        cache
                            .entry(format!("${name}"))
                            .or_default()
                            .push(declaration.clone());
                    }
                }
            }
        }
        *self.properties.borrow_mut() = Some(cache);
    }
}

/// Everything evaluation threads through the tree.
pub struct Eval {
    pub options: Options,
    /// Innermost scope first.
    pub frames: Vec<Rc<Frame>>,
    pub math_on: bool,
    pub in_calc: bool,
    calc_stack: Vec<bool>,
    parens_stack: Vec<bool>,
    important_scope: Vec<Option<String>>,
    /// Completed hoisted blocks in document order. A slot reserves its
    /// position when its block starts evaluating and fills on finish.
    pub media_blocks: Vec<Option<Media>>,
    /// Evaluated feature lists of the enclosing hoisted blocks.
    pub media_path: Vec<Value>,
    pub default_state: DefaultState,
    functions: Rc<FunctionRegistry>,
    evaluating_variables: HashSet<String>,
    evaluating_properties: HashSet<String>,
}

impl Eval {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            frames: Vec::new(),
            math_on: true,
            in_calc: false,
            calc_stack: Vec::new(),
            parens_stack: Vec::new(),
            important_scope: Vec::new(),
            media_blocks: Vec::new(),
            media_path: Vec::new(),
            default_state: DefaultState::default(),
            functions: FunctionRegistry::with_builtins(),
            evaluating_variables: HashSet::new(),
            evaluating_properties: HashSet::new(),
        }
    }

    #[inline]
    pub fn functions(&self) -> Rc<FunctionRegistry> {
        Rc::clone(&self.functions)
    }

    /// Whether arithmetic folds here. Division outside parentheses only
    /// folds in full math mode, and the parens modes fold nothing
    /// outside parentheses.
    pub fn is_math_on(&self, op: Option<Operator>) -> bool {
        if !self.math_on {
            return false;
        }
        if op == Some(Operator::Divide)
            && self.options.math != MathMode::Always
            && self.parens_stack.is_empty()
        {
            return false;
        }
        if matches!(self.options.math, MathMode::Parens | MathMode::StrictLegacy) {
            return !self.parens_stack.is_empty();
        }
        true
    }

    pub fn enter_calc(&mut self) {
        self.calc_stack.push(true);
        self.in_calc = true;
    }

    pub fn exit_calc(&mut self) {
        self.calc_stack.pop();
        if self.calc_stack.is_empty() {
            self.in_calc = false;
        }
    }

    #[inline]
    pub fn in_parenthesis(&mut self) {
        self.parens_stack.push(true);
    }

    #[inline]
    pub fn out_of_parenthesis(&mut self) {
        self.parens_stack.pop();
    }

    pub fn push_important_scope(&mut self) {
        self.important_scope.push(None);
    }

    pub fn pop_important_scope(&mut self) -> Option<String> {
        self.important_scope.pop().flatten()
    }

    /// Record that a resolved reference carried `!important`, so the
    /// enclosing declaration inherits it.
    pub fn adopt_important(&mut self, important: &str) {
        if let Some(slot) = self.important_scope.last_mut() {
            *slot = Some(important.to_owned());
        }
    }

    /// Run a closure with a different frame stack, restoring the
    /// current one afterwards. This is how mixin bodies evaluate in
    /// their captured environment.
    pub fn with_frames<T>(
        &mut self,
        frames: Vec<Rc<Frame>>,
        action: impl FnOnce(&mut Eval) -> T,
    ) -> T {
        let saved = core::mem::replace(&mut self.frames, frames);
        let result = action(self);
        self.frames = saved;
        result
    }

    /// True when the name was not already being resolved; marks it.
    pub fn begin_variable(&mut self, name: &str) -> bool {
        self.evaluating_variables.insert(name.to_owned())
    }

    pub fn end_variable(&mut self, name: &str) {
        self.evaluating_variables.remove(name);
    }

    pub fn begin_property(&mut self, name: &str) -> bool {
        self.evaluating_properties.insert(name.to_owned())
    }

    pub fn end_property(&mut self, name: &str) {
        self.evaluating_properties.remove(name);
    }

    pub fn path_requires_rewrite(&self, path: &str) -> bool {
        if self.options.rewrite_urls == RewriteUrls::Local {
            is_path_local_relative(path)
        } else {
            is_path_relative(path)
        }
    }

    pub fn rewrite_path(&self, path: &str, root_path: &str) -> String {
        let mut joined = self.normalize_path(&format!("{root_path}{path}"));
        if is_path_local_relative(path)
            && is_path_relative(root_path)
            && !is_path_local_relative(&joined)
        {
            joined = format!("./{joined}");
        }
        joined
    }

    /// Collapse `.` and `..` segments without touching the leading
    /// empty segment of absolute paths.
    pub fn normalize_path(&self, path: &str) -> String {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "." => {}
                ".." => {
                    if segments.is_empty() || segments.last() == Some(&"..") {
                        segments.push(segment);
                    } else {
                        segments.pop();
                    }
                }
                other => segments.push(other),
            }
        }
        segments.join("/")
    }
}

fn is_path_local_relative(path: &str) -> bool {
    path.starts_with('.')
}

fn is_path_relative(path: &str) -> bool {
    let scheme_length = path
        .chars()
        .take_while(|character| character.is_ascii_alphabetic() || *character == '-')
        .count();
    let scheme_like = scheme_length > 0 && path[scheme_length..].starts_with(':');
    !(scheme_like || path.starts_with('/') || path.starts_with('#'))
}
