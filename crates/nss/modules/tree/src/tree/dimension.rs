//! A number with an optional compound unit, and the unit coercion rules
//! arithmetic follows.

use crate::error::{CompileError, CompileResult};
use crate::output::{Output, RenderCtx, format_number};
use crate::tree::{Color, Operator, numeric_compare};
use core::cmp::Ordering;
use nss_units::{Unit, UnitGroup};

#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    pub value: f64,
    pub unit: Unit,
}

impl Dimension {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// A bare number.
    #[inline]
    pub fn number(value: f64) -> Self {
        Self::new(value, Unit::empty())
    }

    #[inline]
    pub fn with_unit(value: f64, unit: &str) -> Self {
        Self::new(value, Unit::single(unit))
    }

    /// The gray color a number becomes when operated against a color.
    #[inline]
    pub fn to_color(&self) -> Color {
        Color::gray(self.value)
    }

    /// Apply an operator, coercing units. Addition and subtraction
    /// convert the right operand into the left operand's units;
    /// multiplication and division merge and cancel unit lists.
    pub fn operate(
        &self,
        op: Operator,
        other: &Dimension,
        strict_units: bool,
    ) -> CompileResult<Dimension> {
        let mut value = op.apply(self.value, other.value);
        let mut unit = self.unit.clone();
        match op {
            Operator::Add | Operator::Subtract => {
                if unit.is_empty() {
                    unit = other.unit.clone();
                    if let Some(backup) = &self.unit.backup_unit {
                        unit.backup_unit = Some(backup.clone());
                    }
                } else if other.unit.is_empty() && unit.denominator.is_empty() {
                    // keep the left unit as-is
                } else {
                    let converted = other.convert_to_groups(&self.unit.used_units());
                    if strict_units && converted.unit.to_string() != unit.to_string() {
                        return Err(CompileError::operation(format!(
                            "Incompatible units. Change the units or use the unit function. \
                             Bad units: '{}' and '{}'.",
                            unit, converted.unit
                        )));
                    }
                    value = op.apply(self.value, converted.value);
                }
            }
            Operator::Multiply => {
                unit.numerator.extend(other.unit.numerator.iter().cloned());
                unit.denominator
                    .extend(other.unit.denominator.iter().cloned());
                unit.cancel();
            }
            Operator::Divide => {
                unit.numerator.extend(other.unit.denominator.iter().cloned());
                unit.denominator.extend(other.unit.numerator.iter().cloned());
                unit.cancel();
            }
        }
        if value.is_nan() {
            return Err(CompileError::operation("Dimension is not a number."));
        }
        Ok(Dimension::new(value, unit))
    }

    /// Ordering after unifying both sides to canonical units. Unitless
    /// operands compare against the bare number; incompatible units do
    /// not compare at all.
    pub fn compare(&self, other: &Dimension) -> Option<Ordering> {
        if self.unit.is_empty() || other.unit.is_empty() {
            return numeric_compare(self.value, other.value);
        }
        let lhs = self.unify();
        let rhs = other.unify();
        if lhs.unit.to_string() != rhs.unit.to_string() {
            return None;
        }
        numeric_compare(lhs.value, rhs.value)
    }

    /// Convert to the canonical unit of each group present (px, s, rad).
    pub fn unify(&self) -> Dimension {
        let targets: Vec<(UnitGroup, String)> = UnitGroup::ALL
            .iter()
            .map(|group| (*group, group.canonical().to_owned()))
            .collect();
        self.convert_to_groups(&targets)
    }

    /// Convert to a named unit, inferring its conversion group.
    pub fn convert_to_unit(&self, target: &str) -> Dimension {
        match UnitGroup::of(target) {
            Some(group) => self.convert_to_groups(&[(group, target.to_owned())]),
            None => self.clone(),
        }
    }

    /// Convert each unit part belonging to one of the target groups to
    /// the group's target spelling, scaling the value accordingly.
    pub fn convert_to_groups(&self, targets: &[(UnitGroup, String)]) -> Dimension {
        let mut value = self.value;
        let mut unit = self.unit.clone();
        for (group, target) in targets {
            let Some(target_factor) = group.factor(target) else {
                continue;
            };
            unit.map_units(|atomic, denominator| {
                let Some(factor) = group.factor(atomic) else {
                    return atomic.to_owned();
                };
                if denominator {
                    value /= factor / target_factor;
                } else {
                    value *= factor / target_factor;
                }
                target.clone()
            });
        }
        unit.cancel();
        Dimension::new(value, unit)
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        if context.strict_units && !self.unit.is_singular() {
            return Err(CompileError::syntax(format!(
                "Multiple units in dimension. Correct the units or use the unit function. \
                 Bad unit: {}",
                self.unit
            )));
        }
        let value = context.fround(self.value);
        let mut text = format_number(value);
        if context.compress {
            // Zero lengths need no unit at all.
            if value == 0.0 && self.unit.is_length() {
                output.add(&text);
                return Ok(());
            }
            if value > 0.0 && value < 1.0 {
                text = text.trim_start_matches('0').to_owned();
            }
        }
        output.add(&text);
        if let Some(unit) = self.unit.render_unit(context.strict_units) {
            output.add(unit);
        }
        Ok(())
    }
}
