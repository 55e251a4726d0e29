use std::io::Cursor;

use gedtree::tree::Tree;

const CANONICAL: &str = "\
0 HEAD
1 SOUR gedtree
2 VERS 0.1.0
1 GEDC
2 VERS 5.5.1
1 CHAR UTF-8
0 @I1@ INDI
1 NAME Ivan /Ivanov/
1 SEX M
1 BIRT
2 DATE 28 DEC 1990
2 PLAC Moscow
1 FAMS @F1@
0 @I2@ INDI
1 NAME Anna /Ivanova/
1 SEX F
1 FAMS @F1@
0 @F1@ FAM
1 HUSB @I1@
1 WIFE @I2@
1 MARR
2 DATE BET 04 JAN 2013 AND 25 JAN 2013
0 @N1@ NOTE First line
1 CONT second line
1 CONT
1 CONT fourth line
0 TRLR
";

#[test]
fn canonical_documents_round_trip_byte_for_byte() {
    let mut tree = Tree::new();
    tree.load_from_str(CANONICAL).expect("loads");
    assert_eq!(tree.save_to_string(), CANONICAL);
}

#[test]
fn reading_from_a_buffered_source_matches_the_string_path() {
    let mut tree = Tree::new();
    tree.read_from(Cursor::new(CANONICAL.as_bytes())).expect("loads");
    assert_eq!(tree.save_to_string(), CANONICAL);
    assert_eq!(tree.record_count(), 4);
}

#[test]
fn writing_to_a_sink_matches_the_string_path() {
    let mut tree = Tree::new();
    tree.load_from_str(CANONICAL).expect("loads");
    let mut sink = Vec::new();
    tree.write_to(&mut sink).expect("writes");
    assert_eq!(String::from_utf8(sink).expect("utf8"), CANONICAL);
}

#[test]
fn loaded_values_parse_into_their_payloads() {
    let mut tree = Tree::new();
    tree.load_from_str(CANONICAL).expect("loads");

    let person = tree.find_xref("I1").expect("individual");
    let name = tree.find_tag(person, "NAME").expect("name tag");
    let parts = tree.node(name).expect("node").name_parts().expect("structured name");
    assert_eq!(parts.first_part(), "Ivan");
    assert_eq!(parts.surname(), "Ivanov");

    let birth = tree.find_tag(person, "BIRT").expect("event");
    let date = tree.find_tag(birth, "DATE").expect("date tag");
    let value = tree.node(date).expect("node").date_value().expect("parsed date");
    assert_eq!(value.udn().to_string(), "1990/12/28");

    let note = tree.find_xref("N1").expect("note record");
    assert_eq!(
        tree.node(note).expect("node").value(),
        "First line\nsecond line\n\nfourth line",
        "CONT splices newlines back together"
    );
}

#[test]
fn conc_glues_without_a_newline() {
    let text = "\
0 @N1@ NOTE Long te
1 CONC xt glued
0 TRLR
";
    let mut tree = Tree::new();
    tree.load_from_str(text).expect("loads");
    let note = tree.find_xref("N1").expect("note record");
    assert_eq!(tree.node(note).expect("node").value(), "Long text glued");
    assert!(
        tree.save_to_string().contains("0 @N1@ NOTE Long text glued\n"),
        "the glued text is canonical on output"
    );
}

#[test]
fn addresses_and_extension_tags_round_trip() {
    let text = "\
0 HEAD
0 @I1@ INDI
1 NAME Ivan /Ivanov/
1 RESI
2 ADDR 12 Pushkin Street
3 CONT Moscow
3 CONT 101000
2 PHON +7 495 000-00-00
2 EMAIL ivan@example.com
2 FAX +7 495 000-00-01
2 WWW http://example.com/ivan
1 _TRAVEL Grand tour of 1913
2 _PLAC Paris
0 TRLR
";
    let mut tree = Tree::new();
    tree.load_from_str(text).expect("loads");
    assert_eq!(tree.save_to_string(), text);

    let person = tree.find_xref("I1").expect("individual");
    let residence = tree.find_tag(person, "RESI").expect("residence");
    assert_eq!(
        tree.tag_value(residence, "ADDR"),
        "12 Pushkin Street\nMoscow\n101000",
        "continuations fold into the address value"
    );
    assert_eq!(tree.tag_value(residence, "WWW"), "http://example.com/ivan");
    assert_eq!(tree.tag_value(person, "_TRAVEL"), "Grand tour of 1913");
}

#[test]
fn colliding_xrefs_are_renumbered_and_pointers_follow() {
    let mut tree = Tree::new();
    let original = tree.create_individual();
    assert_eq!(tree.node(original).expect("node").xref(), "I1");

    let text = "\
0 @I1@ INDI
1 NAME Second /Arrival/
0 @F1@ FAM
1 HUSB @I1@
0 TRLR
";
    tree.load_from_str(text).expect("loads");

    assert_eq!(tree.find_xref("I1"), Some(original), "the resident keeps its xref");
    let arrival = tree.find_xref("I2").expect("loaded record was renumbered");
    assert_eq!(tree.tag_value(arrival, "NAME"), "Second /Arrival/");

    let family = tree.find_xref("F1").expect("family");
    let husb = tree.find_tag(family, "HUSB").expect("pointer");
    assert_eq!(tree.node(husb).expect("node").xref(), "I2",
        "the loaded pointer follows the renumbering");
}

#[test]
fn malformed_lines_are_skipped_not_fatal() {
    let text = "\
not a line at all
0 @I1@ INDI
5 NAME Too deep to attach
1 NAME Good /Name/
1 BIRT
2 DATE 31 VEN 1990
0 TRLR
0 @I9@ INDI
";
    let mut tree = Tree::new();
    tree.load_from_str(text).expect("bad lines are not errors");
    assert_eq!(tree.record_count(), 1, "only the real record landed");

    let person = tree.find_xref("I1").expect("individual");
    assert_eq!(tree.tag_value(person, "NAME"), "Good /Name/");

    // The unparseable date is kept as plain text instead of being lost.
    let birth = tree.find_tag(person, "BIRT").expect("event");
    assert_eq!(tree.tag_value(birth, "DATE"), "31 VEN 1990");
}

#[test]
fn loading_appends_to_an_existing_tree() {
    let mut tree = Tree::new();
    tree.load_from_str("0 @I1@ INDI\n1 SEX M\n0 TRLR\n").expect("first load");
    tree.load_from_str("0 @I77@ INDI\n1 SEX F\n0 TRLR\n").expect("second load");
    assert_eq!(tree.record_count(), 2);
    assert!(tree.find_xref("I1").is_some());
    assert!(tree.find_xref("I77").is_some());
}
