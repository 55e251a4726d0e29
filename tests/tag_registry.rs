// The registry is process-wide, so every test here keeps to a tag name
// of its own.

use gedtree::factory;
use gedtree::model::Payload;
use gedtree::tree::Tree;

#[test]
fn unregistered_tags_nest_as_plain_text() {
    let mut tree = Tree::new();
    let person = tree.create_individual();
    let node = tree.add_tag(person, "_QUIRK", "kept verbatim").expect("tag");
    assert!(matches!(tree.node(node).expect("node").payload(), Payload::Plain));
    assert_eq!(tree.node(node).expect("node").value(), "kept verbatim");
}

#[test]
fn a_later_registration_replaces_the_earlier_one() {
    factory::register("_ANNIV", Box::new(|_, _| Payload::Date(Default::default())));
    let mut tree = Tree::new();
    let person = tree.create_individual();
    let dated = tree.add_tag(person, "_ANNIV", "20 JAN 2013").expect("dated tag");
    let node = tree.node(dated).expect("node");
    assert!(matches!(node.payload(), Payload::Date(_)), "the registered shape answers");
    assert!(node.date_value().is_some());
    assert_eq!(node.rendered_value(), "20 JAN 2013");

    factory::register("_ANNIV", Box::new(|_, _| Payload::Plain));
    let plain = tree.add_tag(person, "_ANNIV", "20 JAN 2013").expect("plain tag");
    assert!(
        matches!(tree.node(plain).expect("node").payload(), Payload::Plain),
        "the replacement constructor wins"
    );
    assert_eq!(tree.node(plain).expect("node").value(), "20 JAN 2013");
}
