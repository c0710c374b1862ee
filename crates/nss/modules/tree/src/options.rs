//! Compile options. These are plain data so hosts can persist or ship
//! them; everything defaults to the permissive pretty-printing profile.

use serde::{Deserialize, Serialize};

/// When arithmetic applies to a `/` or any operator outside parentheses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MathMode {
    /// Operate everywhere, including bare `/`.
    Always,
    /// Operate everywhere except `/`, which needs parentheses.
    #[default]
    ParensDivision,
    /// Any operation needs parentheses.
    Parens,
    /// Like `Parens`, but parentheses that wrap a whole operand list
    /// keep their legacy literal meaning.
    StrictLegacy,
}

/// Debug-comment emission in front of rulesets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DumpLineNumbers {
    #[default]
    None,
    /// `/* line N, file */` comments.
    Comments,
    /// SASS-style `@media -sass-debug-info` blocks.
    MediaQuery,
    /// Both forms.
    All,
}

/// Which `url(...)` targets get the root path prepended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteUrls {
    #[default]
    Off,
    /// Only targets that are explicitly relative (`./`, `../`).
    Local,
    /// Every non-absolute target.
    All,
}

/// Everything that changes how a tree compiles or renders.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Minified output: no whitespace, short hex colors, no final
    /// semicolons.
    pub compress: bool,
    /// Refuse unit-incompatible arithmetic instead of coercing.
    pub strict_units: bool,
    pub math: MathMode,
    /// Decimal places rendered numbers round to; `None` disables
    /// rounding entirely.
    pub numeric_precision: Option<u32>,
    pub dump_line_numbers: DumpLineNumbers,
    pub rewrite_urls: RewriteUrls,
    /// Query string appended to every non-data `url(...)` target, for
    /// cache busting.
    pub url_args: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            compress: false,
            strict_units: false,
            math: MathMode::default(),
            numeric_precision: Some(8),
            dump_line_numbers: DumpLineNumbers::default(),
            rewrite_urls: RewriteUrls::default(),
            url_args: None,
        }
    }
}
