//! Variable and property references, and function calls.

use crate::context::Eval;
use crate::error::{CompileError, CompileResult};
use crate::info::FileInfo;
use crate::output::{Output, RenderCtx};
use crate::tree::declaration::merge_rules;
use crate::tree::Value;
use std::rc::Rc;

/// An `@name` reference. Resolution walks the frame stack innermost
/// first and evaluates the found declaration's value lazily.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 0,
            file_info: None,
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        let mut name = self.name.clone();
        // An `@@name` reference resolves the inner variable first and
        // uses its text as the outer variable's name.
        if let Some(inner_name) = name.strip_prefix("@@") {
            let mut inner = Variable::new(format!("@{inner_name}"));
            inner.index = self.index;
            inner.file_info = self.file_info.clone();
            let resolved = inner.eval(context)?;
            name = format!("@{}", reference_text(resolved)?);
        }
        if !context.begin_variable(&name) {
            return Err(self.located(CompileError::name(format!(
                "Recursive variable definition for {name}"
            ))));
        }
        let frames = context.frames.clone();
        let mut found = None;
        for frame in &frames {
            let Some(declaration) = frame.variable(&name) else {
                continue;
            };
            if !declaration.important.is_empty() {
                context.adopt_important(&declaration.important);
            }
            let value = if context.in_calc {
                // Inside calc() the referenced value must not fold
                // again; the identity call shields it.
                Call::identity(declaration.value.clone()).eval(context)?
            } else {
                declaration.value.eval(context)?
            };
            found = Some(value);
            break;
        }
        context.end_variable(&name);
        found.ok_or_else(|| {
            self.located(CompileError::name(format!("variable {name} is undefined")))
        })
    }

    fn located(&self, error: CompileError) -> CompileError {
        error.at(
            self.index,
            self.file_info.as_ref().map(|info| info.filename.as_str()),
        )
    }

    #[inline]
    pub fn gen_css(&self, output: &mut Output) {
        output.add(&self.name);
    }
}

/// A `$name` reference to another property's value in scope. All
/// matching declarations merge first; the last one wins.
#[derive(Clone, Debug)]
pub struct Property {
    pub name: String,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 0,
            file_info: None,
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        let name = self.name.clone();
        if !context.begin_property(&name) {
            return Err(self.located(CompileError::name(format!(
                "Recursive property reference for {name}"
            ))));
        }
        let frames = context.frames.clone();
        let mut found = None;
        for frame in &frames {
            let Some(mut declarations) = frame.property(&name) else {
                continue;
            };
            merge_rules(&mut declarations);
            let Some(last) = declarations.last() else {
                continue;
            };
            if !last.important.is_empty() {
                context.adopt_important(&last.important);
            }
            found = Some(last.value.eval(context)?);
            break;
        }
        context.end_property(&name);
        found.ok_or_else(|| {
            self.located(CompileError::name(format!("Property '{name}' is undefined")))
        })
    }

    fn located(&self, error: CompileError) -> CompileError {
        error.at(
            self.index,
            self.file_info.as_ref().map(|info| info.filename.as_str()),
        )
    }

    #[inline]
    pub fn gen_css(&self, output: &mut Output) {
        output.add(&self.name);
    }
}

/// A function call. Known names dispatch into the function registry;
/// unknown names render as literal CSS with evaluated arguments.
#[derive(Clone, Debug)]
pub struct Call {
    pub name: String,
    pub args: Vec<Value>,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
            index: 0,
            file_info: None,
        }
    }

    /// The internal identity call used to shield values inside calc().
    fn identity(value: Value) -> Self {
        Self::new("_self", vec![value])
    }

    #[inline]
    fn is_calc(&self) -> bool {
        self.name == "calc"
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        // Math turns off inside calc() itself but back on for nested
        // calls within it.
        let outer_math = context.math_on;
        context.math_on = !self.is_calc();
        let entered_calc = self.is_calc() || context.in_calc;
        if entered_calc {
            context.enter_calc();
        }
        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            args.push(arg.eval(context)?);
        }
        if entered_calc {
            context.exit_calc();
        }
        context.math_on = outer_math;

        let lowered = self.name.to_lowercase();
        if let Some(builtin) = context.functions().get(&lowered) {
            let call_args = flatten_args(&args);
            let result = (builtin.func)(context, &call_args).map_err(|error| {
                self.located(CompileError::new(
                    error.kind,
                    format!("error evaluating function `{}`: {}", self.name, error.message),
                ))
            })?;
            if let Some(value) = result {
                return Ok(value);
            }
        }
        Ok(Value::Call(Call {
            name: self.name.clone(),
            args,
            index: self.index,
            file_info: self.file_info.clone(),
        }))
    }

    fn located(&self, error: CompileError) -> CompileError {
        error.at(
            self.index,
            self.file_info.as_ref().map(|info| info.filename.as_str()),
        )
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        output.add(&self.name);
        output.add("(");
        for (position, arg) in self.args.iter().enumerate() {
            arg.gen_css(context, output)?;
            if position + 1 < self.args.len() {
                output.add(", ");
            }
        }
        output.add(")");
        Ok(())
    }
}

/// The text an indirect reference contributes, e.g. the content of a
/// quoted string naming another variable.
fn reference_text(value: Value) -> CompileResult<String> {
    match value {
        Value::Quoted(quoted) => Ok(quoted.value),
        Value::Keyword(keyword) => Ok(keyword.value),
        Value::Anonymous(text) => Ok(text.value),
        other => other.plain_css(),
    }
}

/// Single-item expressions unwrap before reaching a builtin, so
/// functions see the value a variable carried rather than its wrapper.
fn flatten_args(args: &[Value]) -> Vec<Value> {
    args.iter()
        .map(|arg| match arg {
            Value::Expression(expression) if expression.value.len() == 1 => expression
                .value
                .first()
                .cloned()
                .unwrap_or_else(|| arg.clone()),
            other => other.clone(),
        })
        .collect()
}
