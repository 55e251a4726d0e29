use gedtree::dates::DateValue;
use gedtree::udn::Udn;

fn udn_text(date: &str) -> String {
    DateValue::parse(date)
        .unwrap_or_else(|e| panic!("{date}: {e}"))
        .udn()
        .to_string()
}

#[test]
fn literal_formatting() {
    let fixtures = [
        ("28 DEC 1990", "1990/12/28"),
        ("ABT 20 JAN 2013", "~2013/01/20"),
        ("CAL 20 JAN 2013", "~2013/01/20"),
        ("EST 20 DEC 2013", "~2013/12/20"),
        ("BET 04 JAN 2013 AND 25 JAN 2013", "2013/01/14"),
        ("BEF 20 JAN 2013", "<2013/01/20"),
        ("AFT 20 JAN 2013", ">2013/01/20"),
    ];
    for (input, expected) in &fixtures {
        assert_eq!(&udn_text(input), expected, "from {input}");
    }
}

#[test]
fn period_bounds_are_asymmetric() {
    // A from-only period prints as the start day itself, while a
    // to-only period prints as a before-bound.
    assert_eq!(udn_text("FROM 04 JAN 2013"), "2013/01/04");
    assert_eq!(udn_text("TO 25 JAN 2013"), "<2013/01/25");
    assert_eq!(udn_text("FROM 04 JAN 2013 TO 25 JAN 2013"), "2013/01/14");
}

#[test]
fn partial_dates_mark_unknown_parts() {
    assert_eq!(udn_text("JAN 2013"), "2013/01/??");
    assert_eq!(udn_text("2013"), "2013/??/??");
}

#[test]
fn empty_prints_nothing() {
    assert_eq!(Udn::empty().to_string(), "");
    assert!(Udn::empty().is_empty());
    assert_eq!(udn_text(""), "");
}

#[test]
fn calendars_agree_on_the_day_number() {
    // Julian 1 March 1980 fell on Gregorian 14 March 1980.
    let julian = DateValue::parse("@#DJULIAN@ 01 MAR 1980").expect("parses").udn();
    let gregorian = DateValue::parse("14 MAR 1980").expect("parses").udn();
    assert_eq!(julian, gregorian);
    assert_eq!(julian.to_string(), "1980/03/14");

    // 1 Tishri 5774 fell on Gregorian 5 September 2013.
    let hebrew = DateValue::parse("@#DHEBREW@ 01 TSH 5774").expect("parses").udn();
    assert_eq!(hebrew.to_string(), "2013/09/05");

    // The French Republican epoch was 22 September 1792.
    let french = DateValue::parse("@#DFRENCH R@ 01 VEND 1").expect("parses").udn();
    assert_eq!(french.to_string(), "1792/09/22");
}

#[test]
fn qualifiers_order_around_the_exact_day() {
    let exact = DateValue::parse("20 JAN 2013").expect("parses").udn();
    let about = DateValue::parse("ABT 20 JAN 2013").expect("parses").udn();
    let after = DateValue::parse("AFT 20 JAN 2013").expect("parses").udn();
    let before = DateValue::parse("BEF 20 JAN 2013").expect("parses").udn();
    assert!(exact < about, "exact sorts first");
    assert!(about < after, "approximate before after");
    assert!(after < before, "after before before");
}

#[test]
fn vague_dates_sort_after_full_ones() {
    let full = DateValue::parse("31 DEC 2020").expect("parses").udn();
    let month_only = DateValue::parse("JAN 1800").expect("parses").udn();
    let year_only = DateValue::parse("1800").expect("parses").udn();
    assert!(full < month_only, "a known day beats a missing one even when later");
    assert!(month_only < year_only, "a known month beats a missing one");
}

#[test]
fn between_takes_the_floor_midpoint() {
    let a = DateValue::parse("04 JAN 2013").expect("parses").udn();
    let b = DateValue::parse("25 JAN 2013").expect("parses").udn();
    let mid = Udn::between(a, b);
    assert_eq!(mid.to_string(), "2013/01/14");
    // One day apart floors to the earlier day.
    let a = DateValue::parse("04 JAN 2013").expect("parses").udn();
    let b = DateValue::parse("05 JAN 2013").expect("parses").udn();
    assert_eq!(Udn::between(a, b).to_string(), "2013/01/04");
}
