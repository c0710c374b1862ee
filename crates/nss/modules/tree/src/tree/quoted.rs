//! Quoted strings with `@{name}` / `${name}` interpolation, and
//! `url(...)` values with path rewriting.

use crate::context::Eval;
use crate::error::CompileResult;
use crate::info::FileInfo;
use crate::output::Output;
use crate::output::RenderCtx;
use crate::tree::variable::{Property, Variable};
use crate::tree::Value;
use core::cmp::Ordering;
use std::rc::Rc;

/// A string literal. `escaped` strings (`~"..."`) drop their quotes on
/// output and compare by rendered text only.
#[derive(Clone, Debug)]
pub struct Quoted {
    pub value: String,
    pub quote: char,
    pub escaped: bool,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
}

impl Quoted {
    pub fn new(value: impl Into<String>, quote: char, escaped: bool) -> Self {
        Self {
            value: value.into(),
            quote,
            escaped,
            index: 0,
            file_info: None,
        }
    }

    /// Interpolate `@{name}` and `${name}` references until the text
    /// stops changing, so replacements that produce new references get
    /// resolved too.
    pub fn eval(&self, context: &mut Eval) -> CompileResult<Quoted> {
        let mut value = replace_until_stable(&self.value, '@', context, |name, context| {
            let mut variable = Variable::new(format!("@{name}"));
            variable.index = self.index;
            variable.file_info = self.file_info.clone();
            interpolated_text(variable.eval(context)?)
        })?;
        value = replace_until_stable(&value, '$', context, |name, context| {
            let mut property = Property::new(format!("${name}"));
            property.index = self.index;
            property.file_info = self.file_info.clone();
            interpolated_text(property.eval(context)?)
        })?;
        Ok(Quoted {
            value,
            quote: self.quote,
            escaped: self.escaped,
            index: self.index,
            file_info: self.file_info.clone(),
        })
    }

    pub fn gen_css(&self, output: &mut Output) {
        if !self.escaped {
            let mut quote = [0u8; 4];
            output.add(self.quote.encode_utf8(&mut quote));
        }
        output.add(&self.value);
        if !self.escaped {
            let mut quote = [0u8; 4];
            output.add(self.quote.encode_utf8(&mut quote));
        }
    }

    /// Two unescaped strings order by content; any other pairing only
    /// ever compares equal, by rendered text.
    pub fn compare_quoted(&self, other: &Quoted) -> Option<Ordering> {
        if !self.escaped && !other.escaped {
            return Some(self.value.cmp(&other.value));
        }
        let mut lhs = Output::new();
        let mut rhs = Output::new();
        self.gen_css(&mut lhs);
        other.gen_css(&mut rhs);
        (lhs.into_string() == rhs.into_string()).then_some(Ordering::Equal)
    }
}

fn interpolated_text(value: Value) -> CompileResult<String> {
    match value {
        Value::Quoted(quoted) => Ok(quoted.value),
        other => other.plain_css(),
    }
}

/// Replace every `@{word}`-shaped reference (with the configured sigil)
/// in one pass, repeating until a pass changes nothing.
fn replace_until_stable<F>(
    text: &str,
    sigil: char,
    context: &mut Eval,
    mut resolve: F,
) -> CompileResult<String>
where
    F: FnMut(&str, &mut Eval) -> CompileResult<String>,
{
    let marker = format!("{sigil}{{");
    let mut current = text.to_owned();
    loop {
        let mut replaced = String::with_capacity(current.len());
        let mut rest = current.as_str();
        let mut changed = false;
        while let Some(start) = rest.find(&marker) {
            let after = &rest[start + marker.len()..];
            let end = after.find('}');
            let Some(end) = end else {
                break;
            };
            let name = &after[..end];
            if !name.is_empty()
                && name
                    .chars()
                    .all(|character| character.is_ascii_alphanumeric() || character == '-' || character == '_')
            {
                replaced.push_str(&rest[..start]);
                replaced.push_str(&resolve(name, context)?);
                changed = true;
            } else {
                replaced.push_str(&rest[..start + marker.len() + end + 1]);
            }
            rest = &after[end + 1..];
        }
        replaced.push_str(rest);
        if !changed || replaced == current {
            return Ok(replaced);
        }
        current = replaced;
    }
}

/// A `url(...)` value. Evaluation resolves interpolation in the target
/// and applies root-path rewriting exactly once.
#[derive(Clone, Debug)]
pub struct Url {
    pub value: Box<Value>,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    /// Set after evaluation so re-evaluating never rewrites twice.
    pub is_evald: bool,
}

impl Url {
    pub fn new(value: Value) -> Self {
        Self {
            value: Box::new(value),
            index: 0,
            file_info: None,
            is_evald: false,
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Url> {
        let mut value = self.value.eval(context)?;
        if !self.is_evald {
            let root_path = self
                .file_info
                .as_ref()
                .map(|info| info.root_path.clone())
                .unwrap_or_default();
            if let Some((text, quoted)) = url_target(&value) {
                let rewritten = if !root_path.is_empty() && context.path_requires_rewrite(&text) {
                    let prefix = if quoted {
                        root_path
                    } else {
                        escape_path(&root_path)
                    };
                    context.rewrite_path(&text, &prefix)
                } else {
                    context.normalize_path(&text)
                };
                let with_args = match &context.options.url_args {
                    Some(args) if !rewritten.trim_start().starts_with("data:") => {
                        append_url_args(&rewritten, args)
                    }
                    _ => rewritten,
                };
                set_url_target(&mut value, with_args);
            }
        }
        Ok(Url {
            value: Box::new(value),
            index: self.index,
            file_info: self.file_info.clone(),
            is_evald: true,
        })
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        output.add("url(");
        self.value.gen_css(context, output)?;
        output.add(")");
        Ok(())
    }
}

fn url_target(value: &Value) -> Option<(String, bool)> {
    match value {
        Value::Quoted(quoted) => Some((quoted.value.clone(), true)),
        Value::Anonymous(text) => Some((text.value.clone(), false)),
        _ => None,
    }
}

fn set_url_target(value: &mut Value, text: String) {
    match value {
        Value::Quoted(quoted) => quoted.value = text,
        Value::Anonymous(raw) => raw.value = text,
        _ => {}
    }
}

fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for character in path.chars() {
        if matches!(character, '(' | ')' | '\'' | '"') || character.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

fn append_url_args(path: &str, args: &str) -> String {
    let separator = if path.contains('?') { "&" } else { "?" };
    match path.find('#') {
        Some(hash) => format!("{}{}{}{}", &path[..hash], separator, args, &path[hash..]),
        None => format!("{path}{separator}{args}"),
    }
}
