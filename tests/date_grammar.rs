use gedtree::dates::{Approximated, Calendar, Date, DateValue};
use gedtree::error::GedtreeError;

#[test]
fn printed_form_is_stable() {
    let fixtures = [
        "28 DEC 1990",
        "20 JAN 2013",
        "JAN 2013",
        "2013",
        "ABT 20 JAN 2013",
        "CAL 20 JAN 2013",
        "EST 20 DEC 2013",
        "BET 04 JAN 2013 AND 25 JAN 2013",
        "BEF 20 JAN 2013",
        "AFT 20 JAN 2013",
        "FROM 04 JAN 2013 TO 25 JAN 2013",
        "FROM 04 JAN 2013",
        "TO 25 JAN 2013",
        "INT 20 JAN 2013 (about three weeks in)",
    ];
    for text in &fixtures {
        let value = DateValue::parse(text).unwrap_or_else(|e| panic!("{text}: {e}"));
        let printed = value.to_string();
        assert_eq!(&printed, text, "first print should reproduce the input");
        let reparsed = DateValue::parse(&printed).expect("printed form parses");
        assert_eq!(reparsed.to_string(), printed, "second print is identical");
    }
}

#[test]
fn calendar_escapes_round_trip() {
    let fixtures = [
        "@#DJULIAN@ 01 MAR 1980",
        "@#DHEBREW@ 01 CSH 1980",
        "@#DFRENCH R@ 01 BRUM 1980",
    ];
    for text in &fixtures {
        let value = DateValue::parse(text).unwrap_or_else(|e| panic!("{text}: {e}"));
        assert_eq!(value.to_string(), *text);
    }
}

#[test]
fn dual_years_keep_the_modifier() {
    let value = DateValue::parse("26 FEB 1721/22").expect("dual year parses");
    assert_eq!(value.to_string(), "26 FEB 1721/22");
    // An unpadded day normalizes while the second year stays verbatim.
    let value = DateValue::parse("3 MAY 1835/1838").expect("dual year parses");
    assert_eq!(value.to_string(), "03 MAY 1835/1838");
    // Year-only forms glue the same way.
    let value = DateValue::parse("1716/1717").expect("dual year parses");
    assert_eq!(value.to_string(), "1716/1717");
    let value = DateValue::parse("1716/20").expect("dual year parses");
    assert_eq!(value.to_string(), "1716/20");
}

#[test]
fn empty_dual_year_collapses() {
    // A trailing slash with no secondary year is dropped on output.
    let value = DateValue::parse("26 FEB 1721/").expect("bare slash parses");
    assert_eq!(value.to_string(), "26 FEB 1721");
}

#[test]
fn bc_years_round_trip() {
    let value = DateValue::parse("15 MAR 44B.C.").expect("bc year parses");
    assert_eq!(value.to_string(), "15 MAR 44B.C.");
    let value = DateValue::parse("01 FEB 1934/11B.C.").expect("dual bc year parses");
    assert_eq!(value.to_string(), "01 FEB 1934/11B.C.");
}

#[test]
fn wrong_month_names_the_calendar_and_token() {
    // VEN is a French Republican month, not a Gregorian one.
    let err = DateValue::parse("01 VEN 1980").unwrap_err();
    match err {
        GedtreeError::Month { calendar, token } => {
            assert_eq!(calendar, Calendar::Gregorian);
            assert_eq!(token, "VEN");
        }
        other => panic!("expected a month error, got {other}"),
    }
    let err = DateValue::parse("@#DHEBREW@ 01 BRUM 1980").unwrap_err();
    match err {
        GedtreeError::Month { calendar, token } => {
            assert_eq!(calendar, Calendar::Hebrew);
            assert_eq!(token, "BRUM");
        }
        other => panic!("expected a month error, got {other}"),
    }
}

#[test]
fn incomplete_range_is_an_error() {
    assert!(DateValue::parse("BET 04 JAN 2013").is_err(), "missing AND bound");
    assert!(
        DateValue::parse("BET 04 JAN 2013 X 25 JAN 2013").is_err(),
        "junk between the bounds"
    );
}

#[test]
fn blank_input_is_the_empty_value() {
    let value = DateValue::parse("   ").expect("blank parses");
    assert!(value.is_empty());
    assert_eq!(value.to_string(), "");
}

#[test]
fn calendar_setters_print_like_parsed_text() {
    let mut date = Date::new();
    date.set_gregorian(28, 12, 1990).expect("valid day");
    assert_eq!(date.to_string(), "28 DEC 1990");

    let mut date = Date::new();
    date.set_julian(1, 3, 1980).expect("valid day");
    assert_eq!(date.to_string(), "@#DJULIAN@ 01 MAR 1980");

    let mut date = Date::new();
    date.set_hebrew(1, 2, 1980).expect("valid day");
    assert_eq!(date.to_string(), "@#DHEBREW@ 01 CSH 1980");

    let mut date = Date::new();
    date.set_french(1, 2, 1980).expect("valid day");
    assert_eq!(date.to_string(), "@#DFRENCH R@ 01 BRUM 1980");
}

#[test]
fn token_setter_rejects_foreign_months() {
    let mut date = Date::new();
    let err = date
        .set_date_tokens(Calendar::Gregorian, 1, "X", 1980, false)
        .unwrap_err();
    match err {
        GedtreeError::Month { calendar, token } => {
            assert_eq!(calendar, Calendar::Gregorian);
            assert_eq!(token, "X");
        }
        other => panic!("expected a month error, got {other}"),
    }
    let mut date = Date::new();
    date.set_date_tokens(Calendar::Gregorian, 20, "JAN", 2013, false)
        .expect("a month from the calendar's own vocabulary");
    assert_eq!(date.to_string(), "20 JAN 2013");
}

#[test]
fn approximation_keyword_tracks_the_setter() {
    let mut date = Date::parse("20 JAN 2013").expect("parses");
    date.set_approximated(Approximated::About);
    assert_eq!(date.to_string(), "ABT 20 JAN 2013");
    date.set_approximated(Approximated::Calculated);
    assert_eq!(date.to_string(), "CAL 20 JAN 2013");
    date.set_approximated(Approximated::Estimated);
    assert_eq!(date.to_string(), "EST 20 JAN 2013");
    // Exact drops the keyword again.
    date.set_approximated(Approximated::Exact);
    assert_eq!(date.to_string(), "20 JAN 2013");
}

#[test]
fn interpreted_phrase_is_not_double_wrapped() {
    let mut value = DateValue::parse("INT 20 JAN 2013 (today)").expect("parses");
    assert_eq!(value.phrase(), Some("today"));
    value.set_phrase("now");
    assert_eq!(value.to_string(), "INT 20 JAN 2013 (now)");
    value.set_phrase("(yesterday)");
    assert_eq!(value.phrase(), Some("yesterday"));
    assert_eq!(value.to_string(), "INT 20 JAN 2013 (yesterday)");
}

#[test]
fn comparison_follows_the_calendar_line() {
    let early = DateValue::parse("28 DEC 1990").expect("parses");
    let late = DateValue::parse("04 JAN 2013").expect("parses");
    assert_eq!(early.compare(&late), std::cmp::Ordering::Less);
    assert_eq!(late.compare(&early), std::cmp::Ordering::Greater);
    assert_eq!(early.compare(&early.clone()), std::cmp::Ordering::Equal);
    // Months dominate days within a year.
    let jan = DateValue::parse("19 JAN 2013").expect("parses");
    let dec = DateValue::parse("20 DEC 2013").expect("parses");
    assert_eq!(dec.compare(&jan), std::cmp::Ordering::Greater);
}

#[test]
fn short_display_marks_shape_and_calendar() {
    let range = DateValue::parse("BET 04 JAN 2013 AND 25 JAN 2013").expect("parses");
    assert_eq!(range.display_short(), "2013.01.04 [G] - 2013.01.25 [G]");
    let about = DateValue::parse("ABT 1620").expect("parses");
    assert_eq!(about.display_short(), "~ 1620.00.00 [G]");
    let open = DateValue::parse("BEF @#DJULIAN@ 01 MAR 1980").expect("parses");
    assert_eq!(open.display_short(), "< 1980.03.01 [J]");
}
