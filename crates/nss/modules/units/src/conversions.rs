//! Conversion groups and factors between compatible atomic units.
//!
//! Factors express each unit in terms of the group's reference unit
//! (metre, second, full turn). Two units convert by the ratio of their
//! factors; canonical units are what `unify` targets.

use core::f64::consts::PI;

/// A family of mutually convertible units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitGroup {
    Length,
    Duration,
    Angle,
}

impl UnitGroup {
    /// All groups, in the order unification visits them.
    pub const ALL: [Self; 3] = [Self::Length, Self::Duration, Self::Angle];

    /// The group a unit spelling belongs to, if it is convertible at all.
    pub fn of(unit: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|group| group.factor(unit).is_some())
    }

    /// The unit every member of this group converts to under `unify`.
    #[inline]
    pub fn canonical(self) -> &'static str {
        match self {
            Self::Length => "px",
            Self::Duration => "s",
            Self::Angle => "rad",
        }
    }

    /// The scale of `unit` relative to the group's reference unit, or
    /// `None` when the spelling is not a member of this group.
    pub fn factor(self, unit: &str) -> Option<f64> {
        match self {
            Self::Length => match unit {
                "m" => Some(1.0),
                "cm" => Some(0.01),
                "mm" => Some(0.001),
                "in" => Some(0.0254),
                "px" => Some(0.0254 / 96.0),
                "pt" => Some(0.0254 / 72.0),
                "pc" => Some(0.0254 / 72.0 * 12.0),
                _ => None,
            },
            Self::Duration => match unit {
                "s" => Some(1.0),
                "ms" => Some(0.001),
                _ => None,
            },
            Self::Angle => match unit {
                "rad" => Some(1.0 / (2.0 * PI)),
                "deg" => Some(1.0 / 360.0),
                "grad" => Some(1.0 / 400.0),
                "turn" => Some(1.0),
                _ => None,
            },
        }
    }
}
