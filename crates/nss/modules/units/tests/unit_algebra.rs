#![cfg(test)]

use nss_units::{Unit, UnitGroup};

#[test]
fn cancel_removes_paired_parts() {
    let mut unit = Unit::new(
        vec!["px".to_owned(), "s".to_owned()],
        vec!["px".to_owned()],
        None,
    );
    unit.cancel();
    assert_eq!(unit.numerator, vec!["s".to_owned()]);
    assert!(unit.denominator.is_empty());
    assert_eq!(unit.to_string(), "s");
}

#[test]
fn fully_cancelled_unit_keeps_backup_for_rendering() {
    let mut unit = Unit::new(vec!["px".to_owned()], vec!["px".to_owned()], None);
    unit.cancel();
    assert!(unit.is_empty());
    assert_eq!(unit.render_unit(false), Some("px"));
    assert_eq!(unit.render_unit(true), None);
}

#[test]
fn display_joins_numerator_and_denominator() {
    let unit = Unit::new(
        vec!["em".to_owned(), "px".to_owned()],
        vec!["s".to_owned()],
        None,
    );
    assert_eq!(unit.to_string(), "em*px/s");
}

#[test]
fn group_lookup_and_canonicals() {
    assert_eq!(UnitGroup::of("px"), Some(UnitGroup::Length));
    assert_eq!(UnitGroup::of("ms"), Some(UnitGroup::Duration));
    assert_eq!(UnitGroup::of("grad"), Some(UnitGroup::Angle));
    assert_eq!(UnitGroup::of("em"), None);
    assert_eq!(UnitGroup::Length.canonical(), "px");
    assert_eq!(UnitGroup::Duration.canonical(), "s");
    assert_eq!(UnitGroup::Angle.canonical(), "rad");
}

#[test]
fn conversion_factors_are_consistent() {
    let inches = UnitGroup::Length.factor("in").unwrap_or_default();
    let pixels = UnitGroup::Length.factor("px").unwrap_or_default();
    // 96 px per inch.
    assert!((inches / pixels - 96.0).abs() < 1e-9);

    let points = UnitGroup::Length.factor("pt").unwrap_or_default();
    let picas = UnitGroup::Length.factor("pc").unwrap_or_default();
    // 12 pt per pica.
    assert!((picas / points - 12.0).abs() < 1e-9);
}

#[test]
fn used_units_reports_one_per_group() {
    let unit = Unit::new(
        vec!["px".to_owned(), "cm".to_owned(), "s".to_owned()],
        Vec::new(),
        None,
    );
    let used = unit.used_units();
    assert_eq!(used.len(), 2);
    assert!(used.iter().any(|(group, _)| *group == UnitGroup::Length));
    assert!(
        used.iter()
            .any(|(group, name)| *group == UnitGroup::Duration && name == "s")
    );
}

#[test]
fn is_length_follows_the_rendered_unit() {
    assert!(Unit::single("em").is_length());
    assert!(Unit::single("vmin").is_length());
    assert!(!Unit::single("deg").is_length());
    assert!(Unit::single("deg").is_angle());

    // A compound unit renders its first numerator part only.
    let per_second = Unit::new(vec!["px".to_owned()], vec!["s".to_owned()], None);
    assert!(per_second.is_length());
    let inverse = Unit::new(vec!["s".to_owned()], vec!["px".to_owned()], None);
    assert!(!inverse.is_length());
}
