//! The typed stylesheet tree and its evaluation machinery: node types,
//! the scope-frame evaluation context, the builtin function registry,
//! and CSS rendering.
//!
//! A compile evaluates the root [`tree::Ruleset`] in a fresh
//! [`context::Eval`], runs the output visitors over the result, and
//! renders it through [`output::Output`].

#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod functions;
pub mod info;
pub mod options;
pub mod output;
pub mod tree;

pub use context::{Eval, Frame};
pub use error::{CompileError, CompileResult, ErrorKind};
pub use functions::{BuiltinFn, DefaultState, FunctionRegistry};
pub use info::{DebugInfo, FileInfo};
pub use options::{DumpLineNumbers, MathMode, Options, RewriteUrls};
pub use output::{Output, RenderCtx};
