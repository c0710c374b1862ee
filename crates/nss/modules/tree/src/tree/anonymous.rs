//! The pass-through nodes: raw text, bare keywords, and `key=value`
//! assignments inside call arguments.

use crate::context::Eval;
use crate::error::{CompileError, CompileResult};
use crate::output::{Output, RenderCtx};
use crate::tree::Value;

/// Literal text the evaluator treats as opaque. Unknown function calls
/// and unparsed fragments end up here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Anonymous {
    pub value: String,
}

impl Anonymous {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    #[inline]
    pub fn gen_css(&self, output: &mut Output) {
        output.add(&self.value);
    }
}

/// An identifier with no further structure, e.g. `solid` or `inherit`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyword {
    pub value: String,
}

impl Keyword {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    #[inline]
    pub fn truth() -> Self {
        Self::new("true")
    }

    #[inline]
    pub fn falsehood() -> Self {
        Self::new("false")
    }

    #[inline]
    pub fn bool(flag: bool) -> Self {
        if flag { Self::truth() } else { Self::falsehood() }
    }

    #[inline]
    pub fn is_true(&self) -> bool {
        self.value == "true"
    }

    pub fn gen_css(&self, output: &mut Output) -> CompileResult<()> {
        if self.value == "%" {
            return Err(CompileError::syntax("Invalid % without number"));
        }
        output.add(&self.value);
        Ok(())
    }
}

/// A `key=value` pair inside a call argument list, as in
/// `filter: alpha(opacity=50)`.
#[derive(Clone, Debug)]
pub struct Assignment {
    pub key: String,
    pub value: Box<Value>,
}

impl Assignment {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value: Box::new(value),
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        Ok(Value::Assignment(Self {
            key: self.key.clone(),
            value: Box::new(self.value.eval(context)?),
        }))
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        output.add(&self.key);
        output.add("=");
        self.value.gen_css(context, output)
    }
}
