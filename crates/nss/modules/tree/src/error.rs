//! Compile errors with a kind tag and best-effort source location.
//!
//! Nodes raise errors with whatever location they know; callers that know
//! more fill in the blanks on the way up (`CompileError::at`), so the
//! innermost located frame wins.

use core::error::Error;
use core::fmt;

/// Category tags mirroring the classic stylesheet-compiler taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structurally invalid input, e.g. an unterminated declaration name.
    Syntax,
    /// An undefined or recursively defined name.
    Name,
    /// A builtin function received the wrong arguments.
    Argument,
    /// Arithmetic on values that cannot be operated on.
    Operation,
    /// Everything that only surfaces while evaluating, e.g. failed
    /// mixin resolution.
    Runtime,
    /// Path handling problems.
    File,
}

impl ErrorKind {
    #[inline]
    fn label(self) -> &'static str {
        match self {
            Self::Syntax => "SyntaxError",
            Self::Name => "NameError",
            Self::Argument => "ArgumentError",
            Self::Operation => "OperationError",
            Self::Runtime => "RuntimeError",
            Self::File => "FileError",
        }
    }
}

/// A failed compilation. At most one of these surfaces per compile; the
/// first error aborts the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    /// Byte offset into the originating source, when known.
    pub index: Option<usize>,
    pub filename: Option<String>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            index: None,
            filename: None,
        }
    }

    #[inline]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    #[inline]
    pub fn name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Name, message)
    }

    #[inline]
    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, message)
    }

    #[inline]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, message)
    }

    #[inline]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    /// Fill in location details that are still missing. Existing values
    /// are kept, so the innermost caller that knew a location wins.
    pub fn at(mut self, index: usize, filename: Option<&str>) -> Self {
        if self.index.is_none() && index != 0 {
            self.index = Some(index);
        }
        if self.filename.is_none() {
            self.filename = filename.map(str::to_owned);
        }
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind.label(), self.message)?;
        if let Some(index) = self.index {
            write!(formatter, " at offset {index}")?;
        }
        if let Some(filename) = &self.filename {
            write!(formatter, " in {filename}")?;
        }
        Ok(())
    }
}

impl Error for CompileError {}

/// Shorthand for evaluation results throughout the compiler.
pub type CompileResult<T> = Result<T, CompileError>;
