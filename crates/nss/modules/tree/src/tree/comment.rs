//! Comments survive evaluation verbatim; the finalizer decides which
//! ones reach the output.

use crate::info::DebugInfo;
use crate::output::{Output, RenderCtx};
use crate::tree::NodeVisibility;

#[derive(Clone, Debug)]
pub struct Comment {
    /// Full text including delimiters.
    pub value: String,
    pub is_line_comment: bool,
    pub debug_info: Option<DebugInfo>,
    pub visibility: NodeVisibility,
}

impl Comment {
    pub fn new(value: impl Into<String>, is_line_comment: bool) -> Self {
        Self {
            value: value.into(),
            is_line_comment,
            debug_info: None,
            visibility: NodeVisibility::default(),
        }
    }

    /// Line comments never render; block comments drop under compression
    /// unless marked `/*!`.
    pub fn is_silent(&self, compress: bool) -> bool {
        let important = self.value.len() > 2 && self.value.as_bytes().get(2) == Some(&b'!');
        self.is_line_comment || (compress && !important)
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) {
        if let Some(debug_info) = &self.debug_info {
            output.add(&debug_info.render(context.dump_line_numbers, context.compress));
        }
        output.add(&self.value);
    }
}
