//! The `:extend(...)` node. The heavy lifting lives in the extend
//! visitor; this node carries the target selector, the match mode, and
//! the identity chain that stops infinite extend-on-extend loops.

use crate::context::Eval;
use crate::error::CompileResult;
use crate::info::FileInfo;
use crate::tree::selector::{Combinator, Selector};
use crate::tree::NodeVisibility;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::rc::Rc;

static NEXT_EXTEND_ID: AtomicUsize = AtomicUsize::new(0);

/// Matching breadth of an extend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtendMode {
    /// The target must equal a whole output selector.
    #[default]
    Exact,
    /// `all`: the target may appear anywhere inside an output selector.
    All,
}

#[derive(Clone, Debug)]
pub struct Extend {
    pub selector: Selector,
    pub mode: ExtendMode,
    /// Identity of this extend instance.
    pub object_id: usize,
    /// Identities of every extend this one was derived from through
    /// chaining; a selector never re-extends an ancestor.
    pub parent_ids: Vec<usize>,
    /// The joined selectors of the ruleset this extend rides on, filled
    /// in by the extend visitor before matching starts.
    pub self_selectors: Vec<Selector>,
    pub index: usize,
    pub file_info: Option<Rc<FileInfo>>,
    pub visibility: NodeVisibility,
}

impl Extend {
    pub fn new(selector: Selector, mode: ExtendMode) -> Self {
        let object_id = NEXT_EXTEND_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            selector,
            mode,
            object_id,
            parent_ids: vec![object_id],
            self_selectors: Vec::new(),
            index: 0,
            file_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    #[inline]
    pub fn allows_before(&self) -> bool {
        self.mode == ExtendMode::All
    }

    #[inline]
    pub fn allows_after(&self) -> bool {
        self.mode == ExtendMode::All
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Extend> {
        let mut evaluated = self.clone();
        evaluated.selector = self.selector.eval(context)?;
        Ok(evaluated)
    }

    /// A fresh instance (new identity) with the same target, used when
    /// chaining derives new extends.
    pub fn derive(&self) -> Extend {
        let mut derived = Extend::new(self.selector.clone(), self.mode);
        derived.index = self.index;
        derived.file_info = self.file_info.clone();
        derived.visibility = self.visibility.clone();
        derived
    }

    /// Collapse the owning ruleset's selector paths into the single
    /// flattened selector list matching works against.
    pub fn set_self_selectors(&mut self, paths: &[Vec<Selector>]) {
        for path in paths {
            let mut elements = Vec::new();
            for (position, selector) in path.iter().enumerate() {
                let mut parts = selector.elements.clone();
                if position > 0 {
                    if let Some(first) = parts.first_mut() {
                        if first.combinator.value.is_empty() {
                            first.combinator = Combinator::descendant();
                        }
                    }
                }
                elements.extend(parts);
            }
            let mut collapsed = Selector::new(elements);
            collapsed.visibility.copy_from(&self.visibility);
            self.self_selectors.push(collapsed);
        }
    }
}
