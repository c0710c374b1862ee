//! End-to-end stylesheet compilation: tree evaluation, the transform
//! passes, and final CSS rendering, in that order.
//!
//! Callers hand in a parsed root [`Ruleset`] and [`Options`] and get the
//! rendered stylesheet back. The pass order is load-bearing: selectors
//! join before extends run, and visibility seeds between the two so the
//! extend engine can derive per-selector visibility from what it
//! applies.

#![forbid(unsafe_code)]

use nss_tree::error::{CompileError, CompileResult};
use nss_tree::output::{Output, RenderCtx};
use nss_tree::tree::Ruleset;
use nss_tree::{Eval, Options};
use nss_visitors::{JoinSelectorVisitor, ProcessExtendsVisitor, ToCssVisitor, mark_visibility};

/// A reusable compiler configured once.
pub struct Compiler {
    options: Options,
}

impl Compiler {
    #[inline]
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Compile one evaluated-and-rendered stylesheet from its root.
    pub fn compile(&self, root: Ruleset) -> anyhow::Result<String> {
        Ok(compile_tree(root, &self.options)?)
    }
}

/// Compile a root ruleset to CSS text.
pub fn compile_tree(root: Ruleset, options: &Options) -> CompileResult<String> {
    let finalized = transform(root, options)?;
    render(&finalized, options)
}

/// Run evaluation and the transform passes, returning the finalized
/// tree without rendering it. Useful when inspecting pass output.
pub fn transform(root: Ruleset, options: &Options) -> CompileResult<Ruleset> {
    let mut context = Eval::new(options.clone());
    let evaluated = root.eval(&mut context)?;
    log::debug!("evaluation done, {} top-level rules", evaluated.rules.len());

    let joined = JoinSelectorVisitor::new().run(evaluated)?;
    log::debug!("selector join done");

    let mut visible = joined;
    mark_visibility(&mut visible, true);

    let extended = ProcessExtendsVisitor::new().run(visible)?;
    log::debug!("extend processing done");

    let finalized = ToCssVisitor::new(options).run(extended)?;
    log::debug!("finalization done");
    Ok(finalized)
}

fn render(finalized: &Ruleset, options: &Options) -> Result<String, CompileError> {
    let mut context = RenderCtx::from_options(options);
    let mut output = Output::new();
    finalized.gen_css(&mut context, &mut output)?;
    Ok(output.into_string())
}
