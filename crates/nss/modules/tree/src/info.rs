//! Per-file metadata nodes carry around: where a node came from, and the
//! optional debug location rendered by `dump_line_numbers`.

use crate::options::DumpLineNumbers;

/// Source-file description shared by every node parsed from one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub filename: String,
    /// Prefix applied to relative `url(...)` targets from this file.
    pub root_path: String,
    /// The file was pulled in by reference; its output is hidden unless
    /// something extends into it.
    pub reference: bool,
}

impl FileInfo {
    pub fn named(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }
}

/// Line-level location attached to rulesets for debug-comment output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugInfo {
    pub line_number: usize,
    pub filename: String,
}

impl DebugInfo {
    /// Render per the configured mode. Compressed output never carries
    /// debug locations.
    pub fn render(&self, mode: DumpLineNumbers, compress: bool) -> String {
        if compress {
            return String::new();
        }
        match mode {
            DumpLineNumbers::None => String::new(),
            DumpLineNumbers::Comments => self.as_comment(),
            DumpLineNumbers::MediaQuery => self.as_media_query(),
            DumpLineNumbers::All => format!("{}{}", self.as_comment(), self.as_media_query()),
        }
    }

    fn as_comment(&self) -> String {
        format!("/* line {}, {} */\n", self.line_number, self.filename)
    }

    fn as_media_query(&self) -> String {
        let mut escaped = String::new();
        for character in self.filename.chars() {
            if character.is_ascii_alphanumeric() || character == '_' {
                escaped.push(character);
            } else {
                escaped.push('\\');
                escaped.push(character);
            }
        }
        format!(
            "@media -sass-debug-info{{filename{{font-family:{}}}line{{font-family:\\00003{}}}}}\n",
            escaped, self.line_number
        )
    }
}
