//! Selectors: combinator-prefixed elements, attribute brackets, nested
//! selector groups, and the matching primitive the mixin resolver and
//! extend engine share.

use crate::context::Eval;
use crate::error::CompileResult;
use crate::info::FileInfo;
use crate::output::{Output, RenderCtx};
use crate::tree::expression::Condition;
use crate::tree::extend::Extend;
use crate::tree::quoted::Quoted;
use crate::tree::{NodeVisibility, Value};
use std::rc::Rc;

/// The combinator in front of an element. An empty value means plain
/// concatenation, a single space means descent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Combinator {
    pub value: String,
    pub empty_or_whitespace: bool,
}

impl Combinator {
    pub fn new(value: &str) -> Self {
        if value == " " {
            return Self {
                value: " ".to_owned(),
                empty_or_whitespace: true,
            };
        }
        let trimmed = value.trim();
        Self {
            empty_or_whitespace: trimmed.is_empty(),
            value: trimmed.to_owned(),
        }
    }

    #[inline]
    pub fn none() -> Self {
        Self::new("")
    }

    #[inline]
    pub fn descendant() -> Self {
        Self::new(" ")
    }

    pub fn gen_css(&self, context: &RenderCtx, output: &mut Output) {
        let no_space =
            context.compress || matches!(self.value.as_str(), "" | " " | "|");
        let space = if no_space { "" } else { " " };
        output.add(space);
        output.add(&self.value);
        output.add(space);
    }
}

/// What an element consists of once the combinator is stripped.
#[derive(Clone, Debug)]
pub enum ElementValue {
    /// A plain fragment: tag, class, id, pseudo, or `&`.
    Ident(String),
    /// An interpolated fragment still carrying a string node.
    Quoted(Quoted),
    /// An attribute bracket.
    Attribute(Attribute),
    /// A parenthesized selector group, e.g. the target of `:not(...)`.
    Nested(Box<Selector>),
}

/// One step of a selector.
#[derive(Clone, Debug)]
pub struct Element {
    pub combinator: Combinator,
    pub value: ElementValue,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub visibility: NodeVisibility,
}

impl Element {
    pub fn new(combinator: Combinator, value: ElementValue) -> Self {
        Self {
            combinator,
            value,
            index: 0,
            file_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    pub fn ident(combinator: Combinator, name: impl Into<String>) -> Self {
        Self::new(combinator, ElementValue::Ident(name.into()))
    }

    /// The implicit `&` element of an otherwise empty selector.
    pub fn parent(combinator: Combinator) -> Self {
        Self::ident(combinator, "&")
    }

    pub fn is_parent_reference(&self) -> bool {
        matches!(&self.value, ElementValue::Ident(name) if name == "&")
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Element> {
        let value = match &self.value {
            ElementValue::Ident(name) => ElementValue::Ident(name.clone()),
            ElementValue::Quoted(quoted) => ElementValue::Quoted(quoted.eval(context)?),
            ElementValue::Attribute(attribute) => {
                ElementValue::Attribute(attribute.eval(context)?)
            }
            ElementValue::Nested(selector) => {
                ElementValue::Nested(Box::new(selector.eval(context)?))
            }
        };
        Ok(Element {
            combinator: self.combinator.clone(),
            value,
            index: self.index,
            file_info: self.file_info.clone(),
            visibility: self.visibility.clone(),
        })
    }

    pub fn to_css(&self, context: &mut RenderCtx) -> CompileResult<String> {
        let text = match &self.value {
            ElementValue::Ident(name) => name.clone(),
            ElementValue::Quoted(quoted) => {
                let mut output = Output::new();
                quoted.gen_css(&mut output);
                output.into_string()
            }
            ElementValue::Attribute(attribute) => attribute.to_css(context)?,
            ElementValue::Nested(selector) => {
                // A nested group restarts leading-space handling.
                let saved = context.first_selector;
                context.first_selector = true;
                let mut output = Output::new();
                output.add("(");
                selector.gen_css(context, &mut output)?;
                output.add(")");
                context.first_selector = saved;
                output.into_string()
            }
        };
        if text.is_empty() && self.combinator.value.starts_with('&') {
            return Ok(String::new());
        }
        let mut output = Output::new();
        self.combinator.gen_css(context, &mut output);
        output.add(&text);
        Ok(output.into_string())
    }
}

/// An `[attr]`, `[attr=value]` or similar bracket.
#[derive(Clone, Debug)]
pub struct Attribute {
    pub key: String,
    pub op: Option<String>,
    pub value: Option<Box<Value>>,
}

impl Attribute {
    pub fn new(key: impl Into<String>, op: Option<String>, value: Option<Value>) -> Self {
        Self {
            key: key.into(),
            op,
            value: value.map(Box::new),
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Attribute> {
        let value = match &self.value {
            Some(value) => Some(Box::new(value.eval(context)?)),
            None => None,
        };
        Ok(Attribute {
            key: self.key.clone(),
            op: self.op.clone(),
            value,
        })
    }

    pub fn to_css(&self, context: &mut RenderCtx) -> CompileResult<String> {
        let mut text = format!("[{}", self.key);
        if let (Some(op), Some(value)) = (&self.op, &self.value) {
            text.push_str(op);
            text.push_str(&value.to_css(context)?);
        }
        text.push(']');
        Ok(text)
    }
}

/// A full selector: an element chain plus the extends and guard that
/// ride on it.
#[derive(Clone, Debug)]
pub struct Selector {
    pub elements: Vec<Element>,
    pub extend_list: Vec<Extend>,
    pub condition: Option<Condition>,
    /// The guard's result once evaluated; selectors without a guard
    /// count as passing.
    pub evald_condition: bool,
    /// Marks the synthesized selector of a media body, which joins
    /// transparently.
    pub media_empty: bool,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub visibility: NodeVisibility,
}

impl Selector {
    pub fn new(elements: Vec<Element>) -> Self {
        let elements = if elements.is_empty() {
            vec![Element::parent(Combinator::none())]
        } else {
            elements
        };
        Self {
            elements,
            extend_list: Vec::new(),
            condition: None,
            evald_condition: true,
            media_empty: false,
            index: 0,
            file_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    pub fn with_condition(elements: Vec<Element>, condition: Condition) -> Self {
        let mut selector = Self::new(elements);
        selector.evald_condition = false;
        selector.condition = Some(condition);
        selector
    }

    /// The placeholder selector wrapping a hoisted block's body.
    pub fn empty_parent() -> Self {
        let mut selector = Self::new(Vec::new());
        selector.media_empty = true;
        selector
    }

    /// A copy carrying new elements but this selector's identity:
    /// location, visibility, guard result and media marker.
    pub fn create_derived(&self, elements: Vec<Element>, extend_list: Option<Vec<Extend>>) -> Self {
        Self {
            elements,
            extend_list: extend_list.unwrap_or_else(|| self.extend_list.clone()),
            condition: None,
            evald_condition: self.evald_condition,
            media_empty: self.media_empty,
            index: self.index,
            file_info: self.file_info.clone(),
            visibility: self.visibility.clone(),
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Selector> {
        let evald_condition = match &self.condition {
            Some(condition) => condition.eval_bool(context)?,
            None => self.evald_condition,
        };
        let mut elements = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            elements.push(element.eval(context)?);
        }
        let mut extend_list = Vec::with_capacity(self.extend_list.len());
        for extend in &self.extend_list {
            extend_list.push(extend.eval(context)?);
        }
        let mut derived = self.create_derived(elements, Some(extend_list));
        derived.evald_condition = evald_condition;
        Ok(derived)
    }

    /// The flat fragment list mixin matching compares against: text of
    /// every element, split on fragment boundaries, with a leading `&`
    /// dropped.
    pub fn mixin_elements(&self) -> Vec<String> {
        let mut joined = String::new();
        for element in &self.elements {
            joined.push_str(&element.combinator.value);
            if let ElementValue::Ident(name) = &element.value {
                joined.push_str(name);
            }
        }
        let mut fragments: Vec<String> = Vec::new();
        let mut current = String::new();
        for character in joined.chars() {
            let starts_fragment = matches!(character, ',' | '&' | '#' | '*' | '.')
                || character.is_ascii_alphanumeric()
                || character == '-'
                || character == '_';
            let continues = character.is_ascii_alphanumeric()
                || character == '-'
                || character == '_';
            if current.is_empty() {
                if starts_fragment {
                    current.push(character);
                }
            } else if continues {
                current.push(character);
            } else {
                fragments.push(current.clone());
                current.clear();
                if starts_fragment {
                    current.push(character);
                }
            }
        }
        if !current.is_empty() {
            fragments.push(current);
        }
        if fragments.first().is_some_and(|fragment| fragment == "&") {
            fragments.remove(0);
        }
        fragments
    }

    /// How many leading fragments of `other` this selector's elements
    /// match; zero means no match.
    pub fn match_prefix(&self, other: &Selector) -> usize {
        let theirs = other.mixin_elements();
        if theirs.is_empty() || self.elements.len() < theirs.len() {
            return 0;
        }
        for (element, fragment) in self.elements.iter().zip(&theirs) {
            let ElementValue::Ident(name) = &element.value else {
                return 0;
            };
            if name != fragment {
                return 0;
            }
        }
        theirs.len()
    }

    /// True for the bare `&` selector the joiner folds away.
    pub fn is_just_parent_selector(&self) -> bool {
        !self.media_empty
            && self.elements.len() == 1
            && self.extend_list.is_empty()
            && self.elements.first().is_some_and(|element| {
                element.is_parent_reference()
                    && matches!(element.combinator.value.as_str(), "" | " ")
            })
    }

    #[inline]
    pub fn get_is_output(&self) -> bool {
        self.evald_condition
    }

    pub fn to_css(&self, context: &mut RenderCtx) -> CompileResult<String> {
        let mut output = Output::new();
        self.gen_css(context, &mut output)?;
        Ok(output.into_string())
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        if !context.first_selector
            && self
                .elements
                .first()
                .is_some_and(|element| element.combinator.value.is_empty())
        {
            output.add(" ");
        }
        for element in &self.elements {
            let text = element.to_css(context)?;
            output.add(&text);
        }
        Ok(())
    }
}
