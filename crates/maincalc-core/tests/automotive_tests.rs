use maincalc_core::automotive::{horsepower, tire};
use maincalc_core::input::FormValues;
use maincalc_core::presentation::{evaluate_form, render, PageView, Present};
use maincalc_core::{CalcError, CalcResult, ComputationOutput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

// ===========================================================================
// Horsepower / torque
// ===========================================================================

#[test]
fn test_curves_cross_at_5252_rpm() {
    let r = horsepower::convert_power(&horsepower::PowerInput {
        rpm: dec!(5252),
        horsepower: Some(dec!(450)),
        ..Default::default()
    })
    .unwrap()
    .result;
    assert_eq!(r.torque_lbft, dec!(450));
}

#[test]
fn test_unit_constants() {
    assert_eq!(horsepower::hp_to_kw(dec!(100)), dec!(74.5699872));
    assert_eq!(horsepower::lbft_to_nm(dec!(100)).unwrap(), dec!(135.581795));
    assert!((horsepower::kw_to_hp(horsepower::hp_to_kw(dec!(321))).unwrap() - dec!(321)).abs() < dec!(0.0000001));
}

#[test]
fn test_torque_in_newton_metres() {
    let form = FormValues::new()
        .with("rpm", "3,000")
        .with("torque_nm", "400");
    let input = horsepower::PowerInput::try_from(&form).unwrap();
    let r = horsepower::convert_power(&input).unwrap().result;
    assert_eq!(r.solved_for, horsepower::PowerUnknown::Horsepower);
    // 400 N·m ≈ 295.02 lb·ft; × 3000 / 5252 ≈ 168.5 hp
    assert!((r.torque_lbft - dec!(295.02)).abs() < dec!(0.01));
    assert!((r.horsepower - dec!(168.52)).abs() < dec!(0.01));
}

// ===========================================================================
// Tires
// ===========================================================================

#[test]
fn test_tire_geometry_from_size_text() {
    let size = tire::parse_tire_size("205/55R16").unwrap();
    let g = tire::tire_geometry(&size).unwrap();
    assert_eq!(g.sidewall_mm, dec!(112.75));
    assert_eq!(g.diameter_mm, dec!(631.9));
    assert_eq!(g.size, "205/55R16");
}

#[test]
fn test_speedometer_error_for_smaller_tire() {
    let form = FormValues::new()
        .with("original", "225/45R17")
        .with("replacement", "205/45R17")
        .with("reference_speed", "100");
    let input = tire::TireComparisonInput::try_from(&form).unwrap();
    let r = tire::compare_tires(&input).unwrap().result;

    // Smaller tire: the car goes slower than the speedometer says
    assert!(r.actual_speed < dec!(100));
    assert!(r.speedometer_error_percent < Decimal::ZERO);
    assert_eq!(r.diameter_difference_mm, dec!(-18));
}

#[test]
fn test_tire_page_renders() {
    let size = tire::parse_tire_size("265/70R17").unwrap();
    let view = render(tire::calculate_tire(&size));
    let PageView::Ready { summary, .. } = view else {
        panic!("expected a rendered tire page");
    };
    assert_eq!(summary[0].value, "265/70R17");
}

#[test]
fn test_bad_size_rejected() {
    assert!(tire::parse_tire_size("big tires").is_err());
}

// ===========================================================================
// Edge-of-range forms
// ===========================================================================

const DECIMAL_MAX: &str = "79228162514264337593543950335";

fn form(fields: &[(&str, &str)]) -> FormValues {
    fields.iter().fold(FormValues::new(), |form, (k, v)| form.with(k, *v))
}

/// Every form must come back as a page, rendered (`true`) or `Invalid`.
fn check_pages<I, T, F>(calculator: &str, cases: &[(&[(&str, &str)], bool)], evaluate: F)
where
    I: for<'a> TryFrom<&'a FormValues, Error = CalcError>,
    T: Serialize + Present,
    F: Fn(&I) -> CalcResult<ComputationOutput<T>>,
{
    for (i, (fields, ready)) in cases.iter().enumerate() {
        let view = evaluate_form::<I, T, _>(&form(fields), &evaluate);
        assert_eq!(view.is_ready(), *ready, "{calculator} case {i}: {fields:?}");
    }
}

#[test]
fn test_extreme_automotive_forms_stay_on_the_page() {
    check_pages(
        "horsepower",
        &[
            (&[("rpm", "6000"), ("torque_lbft", "4e28")], false),
            (&[("rpm", "0.0000000000000000000000000001"), ("horsepower", "1")], false),
            (&[("rpm", "1"), ("horsepower", "0.0000000000000000000000000001")], true),
            (&[("rpm", "1"), ("kilowatts", DECIMAL_MAX)], false),
        ],
        horsepower::convert_power,
    );
    check_pages(
        "tire",
        &[(&[("size", "500/100R30")], true), (&[("size", "99/45R17")], false)],
        tire::calculate_tire,
    );
    check_pages(
        "tire comparison",
        &[
            (&[("original", "205/55R16"), ("replacement", "275/60R18"), ("reference_speed", DECIMAL_MAX)], false),
            (
                &[
                    ("original", "205/55R16"),
                    ("replacement", "275/60R18"),
                    ("reference_speed", "0.0000000000000000000000000001"),
                ],
                true,
            ),
        ],
        tire::compare_tires,
    );
}
