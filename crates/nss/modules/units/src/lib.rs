//! Unit algebra for dimension values: compound units as sorted
//! numerator/denominator lists, cancellation, and conversion between
//! units of the same physical group.
//! Absolute-length factors per <https://www.w3.org/TR/css-values-3/#absolute-lengths>.

#![forbid(unsafe_code)]

pub mod conversions;

pub use conversions::UnitGroup;

use core::fmt;
use std::collections::HashMap;

/// A compound unit attached to a numeric value, e.g. `px`, `em/s` or the
/// empty unit of a bare number.
///
/// Both lists stay sorted so that textually different spellings of the
/// same compound unit compare equal. `backup_unit` remembers one atomic
/// unit to fall back on when rendering a unit whose parts all cancelled
/// (`px/px` still renders as `px` outside strict mode).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Unit {
    pub numerator: Vec<String>,
    pub denominator: Vec<String>,
    pub backup_unit: Option<String>,
}

impl Unit {
    /// Build a unit from unsorted parts. The backup unit defaults to the
    /// first numerator part.
    pub fn new(
        mut numerator: Vec<String>,
        mut denominator: Vec<String>,
        backup_unit: Option<String>,
    ) -> Self {
        numerator.sort_unstable();
        denominator.sort_unstable();
        let backup = backup_unit.or_else(|| numerator.first().cloned());
        Self {
            numerator,
            denominator,
            backup_unit: backup,
        }
    }

    /// The unit of a plain number.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A simple single-name unit such as `px`.
    #[inline]
    pub fn single(name: &str) -> Self {
        Self::new(vec![name.to_owned()], Vec::new(), None)
    }

    /// True when no unit parts remain (a dimensionless number).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.numerator.is_empty() && self.denominator.is_empty()
    }

    /// True for exactly one numerator part and no denominator, the only
    /// shape most CSS contexts accept.
    #[inline]
    pub fn is_singular(&self) -> bool {
        self.numerator.len() <= 1 && self.denominator.is_empty()
    }

    /// Case-insensitive comparison against a unit spelling such as `"px"`.
    #[inline]
    pub fn is(&self, unit_text: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(unit_text)
    }

    /// True when the unit renders as a CSS length, including the
    /// font-relative and viewport-relative units that have no
    /// conversion factor.
    pub fn is_length(&self) -> bool {
        const LENGTH_UNITS: [&str; 14] = [
            "px", "em", "ex", "ch", "rem", "in", "cm", "mm", "pc", "pt", "vw", "vh", "vmin", "vmax",
        ];
        self.render_unit(false)
            .is_some_and(|unit| LENGTH_UNITS.iter().any(|name| unit.eq_ignore_ascii_case(name)))
    }

    /// True when the unit renders to `deg`, `grad`, `rad` or `turn`.
    pub fn is_angle(&self) -> bool {
        UnitGroup::of(&self.to_string()) == Some(UnitGroup::Angle)
    }

    /// The unit spelling to emit after a number, if any. Outside strict
    /// mode a fully cancelled unit falls back to `backup_unit`, then to
    /// the first denominator part.
    pub fn render_unit(&self, strict_units: bool) -> Option<&str> {
        if self.numerator.len() == 1 {
            self.numerator.first().map(String::as_str)
        } else if !strict_units && self.backup_unit.is_some() {
            self.backup_unit.as_deref()
        } else if !strict_units {
            self.denominator.first().map(String::as_str)
        } else {
            None
        }
    }

    /// One representative atomic unit per conversion group present in
    /// this unit, used to pick conversion targets for unification.
    pub fn used_units(&self) -> Vec<(UnitGroup, String)> {
        let mut seen: Vec<(UnitGroup, String)> = Vec::new();
        for part in self.numerator.iter().chain(self.denominator.iter()) {
            if let Some(group) = UnitGroup::of(part) {
                if !seen.iter().any(|(existing, _)| *existing == group) {
                    seen.push((group, part.clone()));
                }
            }
        }
        seen
    }

    /// Rewrite each atomic unit in place. The callback receives the unit
    /// name and whether it sits in the denominator, and returns the
    /// replacement spelling. Lists are re-sorted afterwards.
    pub fn map_units<F>(&mut self, mut rewrite: F)
    where
        F: FnMut(&str, bool) -> String,
    {
        for part in &mut self.numerator {
            *part = rewrite(part, false);
        }
        for part in &mut self.denominator {
            *part = rewrite(part, true);
        }
        self.numerator.sort_unstable();
        self.denominator.sort_unstable();
    }

    /// Cancel matching numerator/denominator parts, so `px*s/px`
    /// becomes `s`. Remembers the first atomic unit seen as the backup
    /// spelling for rendering fully cancelled units.
    pub fn cancel(&mut self) {
        let mut counts: HashMap<String, i32> = HashMap::new();
        let mut first_seen: Option<String> = None;

        for part in &self.numerator {
            first_seen.get_or_insert_with(|| part.clone());
            *counts.entry(part.clone()).or_insert(0) += 1;
        }
        for part in &self.denominator {
            first_seen.get_or_insert_with(|| part.clone());
            *counts.entry(part.clone()).or_insert(0) -= 1;
        }

        self.numerator.clear();
        self.denominator.clear();
        for (part, count) in counts {
            if count > 0 {
                for _ in 0..count {
                    self.numerator.push(part.clone());
                }
            } else if count < 0 {
                for _ in 0..-count {
                    self.denominator.push(part.clone());
                }
            }
        }
        if let Some(backup) = first_seen {
            self.backup_unit = Some(backup);
        }
        self.numerator.sort_unstable();
        self.denominator.sort_unstable();
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = self.numerator.join("*");
        for part in &self.denominator {
            text.push('/');
            text.push_str(part);
        }
        formatter.write_str(&text)
    }
}
