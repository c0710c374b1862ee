//! The builtin function registry and the `default()` guard function's
//! shared state.

use crate::context::Eval;
use crate::error::{CompileError, CompileResult};
use crate::tree::{Anonymous, Dimension, Keyword, Value};
use nss_units::Unit;
use std::collections::HashMap;
use std::rc::Rc;

/// State the mixin resolver drives while guards run. `default()` reads
/// the forced value; outside mixin guards it is an error to call it.
#[derive(Clone, Debug, Default)]
pub struct DefaultState {
    value: Option<bool>,
    error: Option<String>,
}

impl DefaultState {
    #[inline]
    pub fn set_value(&mut self, value: bool) {
        self.value = Some(value);
    }

    #[inline]
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    #[inline]
    pub fn reset(&mut self) {
        self.value = None;
        self.error = None;
    }

    fn eval(&self) -> CompileResult<Option<Value>> {
        if let Some(message) = &self.error {
            return Err(CompileError::syntax(message.clone()));
        }
        Ok(self
            .value
            .map(|value| Value::Keyword(Keyword::bool(value))))
    }
}

/// Signature of a builtin. Returning `None` leaves the call in the
/// output as literal CSS.
pub type BuiltinFn = fn(&mut Eval, &[Value]) -> CompileResult<Option<Value>>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub func: BuiltinFn,
}

/// Case-insensitive function lookup with an inheritance chain, so local
/// scopes can shadow the global set.
#[derive(Default)]
pub struct FunctionRegistry {
    entries: HashMap<String, Builtin>,
    parent: Option<Rc<FunctionRegistry>>,
}

impl FunctionRegistry {
    /// The global registry with every builtin registered.
    pub fn with_builtins() -> Rc<Self> {
        let mut registry = Self::default();
        registry.add("default", default_fn);
        registry.add("unit", unit_fn);
        registry.add("get-unit", get_unit_fn);
        registry.add("percentage", percentage_fn);
        registry.add("convert", convert_fn);
        registry.add("_self", self_fn);
        Rc::new(registry)
    }

    pub fn inherit(parent: &Rc<FunctionRegistry>) -> Self {
        Self {
            entries: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }
    }

    pub fn add(&mut self, name: &str, func: BuiltinFn) {
        self.entries.insert(name.to_lowercase(), Builtin { func });
    }

    pub fn get(&self, lowered_name: &str) -> Option<Builtin> {
        self.entries.get(lowered_name).copied().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.get(lowered_name))
        })
    }
}

fn default_fn(context: &mut Eval, _args: &[Value]) -> CompileResult<Option<Value>> {
    context.default_state.eval()
}

fn self_fn(_context: &mut Eval, args: &[Value]) -> CompileResult<Option<Value>> {
    Ok(args.first().cloned())
}

fn unit_fn(_context: &mut Eval, args: &[Value]) -> CompileResult<Option<Value>> {
    let Some(first) = args.first() else {
        return Err(CompileError::argument(
            "the first argument to unit must be a number",
        ));
    };
    let Value::Dimension(dimension) = first else {
        let hint = if matches!(first, Value::Operation(_)) {
            ". Have you forgotten parenthesis?"
        } else {
            ""
        };
        return Err(CompileError::argument(format!(
            "the first argument to unit must be a number{hint}"
        )));
    };
    let unit = match args.get(1) {
        Some(Value::Keyword(keyword)) => Unit::single(&keyword.value),
        Some(other) => Unit::single(&other.plain_css()?),
        None => Unit::empty(),
    };
    Ok(Some(Value::Dimension(Dimension::new(dimension.value, unit))))
}

fn get_unit_fn(_context: &mut Eval, args: &[Value]) -> CompileResult<Option<Value>> {
    match args.first() {
        Some(Value::Dimension(dimension)) => Ok(Some(Value::Anonymous(Anonymous::new(
            dimension.unit.to_string(),
        )))),
        _ => Err(CompileError::argument("argument must be a number")),
    }
}

fn percentage_fn(_context: &mut Eval, args: &[Value]) -> CompileResult<Option<Value>> {
    match args.first() {
        Some(Value::Dimension(dimension)) => Ok(Some(Value::Dimension(Dimension::new(
            dimension.value * 100.0,
            Unit::single("%"),
        )))),
        _ => Err(CompileError::argument("argument must be a number")),
    }
}

fn convert_fn(_context: &mut Eval, args: &[Value]) -> CompileResult<Option<Value>> {
    let (Some(Value::Dimension(dimension)), Some(target)) = (args.first(), args.get(1)) else {
        return Err(CompileError::argument("argument must be a number"));
    };
    let unit_name = match target {
        Value::Keyword(keyword) => keyword.value.clone(),
        Value::Quoted(quoted) => quoted.value.clone(),
        other => other.plain_css()?,
    };
    Ok(Some(Value::Dimension(
        dimension.convert_to_unit(&unit_name),
    )))
}
