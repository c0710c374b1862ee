//! The CSS text sink nodes render into, and the rendering context that
//! travels alongside it (indentation, compression, precision).

use crate::info::FileInfo;
use crate::options::{DumpLineNumbers, Options};

/// Accumulates rendered CSS chunks. Location arguments are accepted for
/// parity with mapping-aware sinks but plain text output ignores them.
#[derive(Debug, Default)]
pub struct Output {
    css: String,
}

impl Output {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, chunk: &str) {
        self.css.push_str(chunk);
    }

    #[inline]
    pub fn add_located(&mut self, chunk: &str, _file_info: Option<&FileInfo>, _index: usize) {
        self.add(chunk);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.css.is_empty()
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.css
    }
}

/// Mutable rendering state. The tab level and the first-selector /
/// last-rule flags change as the tree renders; the rest mirrors options.
#[derive(Clone, Debug)]
pub struct RenderCtx {
    pub compress: bool,
    pub strict_units: bool,
    pub numeric_precision: Option<u32>,
    pub dump_line_numbers: DumpLineNumbers,
    pub tab_level: usize,
    pub last_rule: bool,
    pub first_selector: bool,
}

impl RenderCtx {
    pub fn from_options(options: &Options) -> Self {
        Self {
            compress: options.compress,
            strict_units: options.strict_units,
            numeric_precision: options.numeric_precision,
            dump_line_numbers: options.dump_line_numbers,
            tab_level: 0,
            last_rule: false,
            first_selector: false,
        }
    }

    /// Defaults used when rendering outside a compile, e.g. for value
    /// comparisons in guards.
    pub fn plain() -> Self {
        Self::from_options(&Options::default())
    }

    /// Round a value to the configured precision, biased past binary
    /// representation noise so `1.000000005` rounds up as written.
    pub fn fround(&self, value: f64) -> f64 {
        self.numeric_precision.map_or(value, |precision| {
            let scale = 10f64.powi(precision as i32);
            ((value + 2e-16) * scale).round() / scale
        })
    }
}

/// Render a number the way stylesheet output expects: no trailing
/// zeros, no negative zero, fixed notation for very small magnitudes.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    if value.abs() < 1e-6 {
        let fixed = format!("{value:.20}");
        return fixed.trim_end_matches('0').to_owned();
    }
    format!("{value}")
}
