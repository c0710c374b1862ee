#![cfg(test)]

use core::cmp::Ordering;
use nss_tree::error::CompileResult;
use nss_tree::tree::{Dimension, Operator};

#[test]
fn conversion_round_trips_through_canonical_units() {
    let inches = Dimension::with_unit(2.0, "in");
    let pixels = inches.convert_to_unit("px");
    assert_eq!(pixels.unit.to_string(), "px");
    assert!((pixels.value - 192.0).abs() < 1e-9);

    let back = pixels.convert_to_unit("in");
    assert_eq!(back.unit.to_string(), "in");
    assert!((back.value - 2.0).abs() < 1e-9);
}

#[test]
fn addition_coerces_to_the_left_operands_unit() -> CompileResult<()> {
    let centimeters = Dimension::with_unit(1.0, "cm");
    let millimeters = Dimension::with_unit(5.0, "mm");
    let sum = centimeters.operate(Operator::Add, &millimeters, false)?;
    assert_eq!(sum.unit.to_string(), "cm");
    assert!((sum.value - 1.5).abs() < 1e-9);
    Ok(())
}

#[test]
fn comparison_unifies_before_ordering() {
    let seconds = Dimension::with_unit(1.0, "s");
    let millis = Dimension::with_unit(500.0, "ms");
    assert_eq!(seconds.compare(&millis), Some(Ordering::Greater));

    let millis_full = Dimension::with_unit(1000.0, "ms");
    assert_eq!(seconds.compare(&millis_full), Some(Ordering::Equal));

    // Incompatible units do not order at all.
    let pixels = Dimension::with_unit(1.0, "px");
    assert_eq!(seconds.compare(&pixels), None);
}

#[test]
fn arithmetic_never_yields_a_nan_dimension() {
    let zero = Dimension::number(0.0);
    let result = zero.operate(Operator::Divide, &Dimension::number(0.0), false);
    assert!(matches!(result, Err(error) if error.message.contains("Dimension is not a number")));
}

#[test]
fn strict_addition_rejects_unrelated_units() {
    let pixels = Dimension::with_unit(1.0, "px");
    let seconds = Dimension::with_unit(1.0, "s");
    let result = pixels.operate(Operator::Add, &seconds, true);
    assert!(matches!(result, Err(error) if error.message.contains("Incompatible units")));
}
