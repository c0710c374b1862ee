//! `property: value` declarations, including variable definitions and
//! the `+` / `+_` merge forms.

use crate::context::Eval;
use crate::error::CompileResult;
use crate::info::FileInfo;
use crate::options::MathMode;
use crate::output::{Output, RenderCtx};
use crate::tree::expression::{Expression, ValueList};
use crate::tree::{Keyword, NodeVisibility, Value};
use std::rc::Rc;

/// Merge behavior for repeated declarations of the same property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// `+`: merged values join with commas.
    Comma,
    /// `+_`: merged values join with spaces.
    Space,
}

/// A declaration name: fixed text, or parts still containing variable
/// interpolation.
#[derive(Clone, Debug)]
pub enum DeclarationName {
    Plain(String),
    Parts(Vec<Value>),
}

#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: DeclarationName,
    pub value: Value,
    /// `" !important"` or empty; kept as written for output.
    pub important: String,
    pub merge: Option<MergeMode>,
    pub inline: bool,
    /// True for `@name` definitions, which never render.
    pub variable: bool,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub visibility: NodeVisibility,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        let variable = name.starts_with('@');
        Self {
            name: DeclarationName::Plain(name),
            value,
            important: String::new(),
            merge: None,
            inline: false,
            variable,
            index: 0,
            file_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    pub fn with_parts(parts: Vec<Value>, value: Value) -> Self {
        Self {
            name: DeclarationName::Parts(parts),
            value,
            important: String::new(),
            merge: None,
            inline: false,
            variable: false,
            index: 0,
            file_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    /// The plain name, once interpolation is resolved.
    pub fn name_text(&self) -> &str {
        match &self.name {
            DeclarationName::Plain(name) => name,
            DeclarationName::Parts(_) => "",
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Declaration> {
        let (name, variable) = match &self.name {
            DeclarationName::Plain(name) => (name.clone(), self.variable),
            DeclarationName::Parts(parts) => (eval_name(parts, context)?, false),
        };
        // Fonts carry legacy shorthand slashes, so full math mode backs
        // off to parens-division for this one property.
        let math_bypass = name == "font" && context.options.math == MathMode::Always;
        let saved_math = context.options.math;
        if math_bypass {
            context.options.math = MathMode::ParensDivision;
        }
        context.push_important_scope();
        let evaluated = self.value.eval(context);
        let scope_important = context.pop_important_scope();
        if math_bypass {
            context.options.math = saved_math;
        }
        let value = evaluated.map_err(|error| {
            error.at(
                self.index,
                self.file_info.as_ref().map(|info| info.filename.as_str()),
            )
        })?;
        let mut important = self.important.clone();
        if important.is_empty() {
            if let Some(adopted) = scope_important {
                important = adopted;
            }
        }
        Ok(Declaration {
            name: DeclarationName::Plain(name),
            value,
            important,
            merge: self.merge,
            inline: self.inline,
            variable,
            index: self.index,
            file_info: self.file_info.clone(),
            visibility: self.visibility.clone(),
        })
    }

    pub fn make_important(&self) -> Declaration {
        let mut important = self.clone();
        important.important = " !important".to_owned();
        important
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        let name = match &self.name {
            DeclarationName::Plain(name) => name.clone(),
            DeclarationName::Parts(_) => String::new(),
        };
        output.add(&name);
        output.add(if context.compress { ":" } else { ": " });
        self.value.gen_css(context, output).map_err(|error| {
            error.at(
                self.index,
                self.file_info.as_ref().map(|info| info.filename.as_str()),
            )
        })?;
        output.add(&self.important);
        if !(self.inline || context.last_rule && context.compress) {
            output.add(";");
        }
        Ok(())
    }
}

fn eval_name(parts: &[Value], context: &mut Eval) -> CompileResult<String> {
    if let [Value::Keyword(keyword)] = parts {
        return Ok(keyword.value.clone());
    }
    let mut name = String::new();
    let mut render = RenderCtx::plain();
    for part in parts {
        let evaluated = part.eval(context)?;
        if let Value::Keyword(Keyword { value }) = &evaluated {
            name.push_str(value);
        } else {
            name.push_str(&evaluated.to_css(&mut render)?);
        }
    }
    Ok(name)
}

/// Merge same-named declarations flagged with `+` or `+_` into the
/// first occurrence, comma-separating `+` groups and space-separating
/// `+_` runs. Unflagged declarations are left alone.
pub fn merge_rules(declarations: &mut Vec<Declaration>) {
    let needs_merge = declarations
        .iter()
        .filter(|declaration| declaration.merge.is_some())
        .count()
        > 1;
    if !needs_merge {
        return;
    }
    let mut merged: Vec<Declaration> = Vec::with_capacity(declarations.len());
    for declaration in declarations.drain(..) {
        if declaration.merge.is_none() {
            merged.push(declaration);
            continue;
        }
        let existing = merged.iter_mut().find(|candidate| {
            candidate.merge.is_some() && candidate.name_text() == declaration.name_text()
        });
        match existing {
            Some(target) => {
                if !declaration.important.is_empty() {
                    target.important = declaration.important.clone();
                }
                append_merged(target, declaration);
            }
            None => merged.push(declaration),
        }
    }
    *declarations = merged;
}

fn append_merged(target: &mut Declaration, incoming: Declaration) {
    // The merged value is a comma list of space expressions.
    let mut comma_groups: Vec<Vec<Value>> = match target.value.clone() {
        Value::List(list) => list
            .value
            .into_iter()
            .map(|group| match group {
                Value::Expression(expression) => expression.value,
                other => vec![other],
            })
            .collect(),
        other => vec![vec![other]],
    };
    match incoming.merge {
        Some(MergeMode::Comma) => comma_groups.push(vec![incoming.value]),
        _ => {
            if let Some(last) = comma_groups.last_mut() {
                last.push(incoming.value);
            }
        }
    }
    let groups = comma_groups
        .into_iter()
        .map(|group| {
            if group.len() == 1 {
                group.into_iter().next().map_or_else(
                    || Value::Expression(Expression::default()),
                    |single| single,
                )
            } else {
                Value::Expression(Expression::new(group))
            }
        })
        .collect();
    target.value = Value::List(ValueList::new(groups));
}
