use gedtree::model::{Handle, VOID};
use gedtree::tree::Tree;

// A bare container node with three plain children, A then B then C.
fn setup() -> (Tree, Handle, [Handle; 3]) {
    let mut tree = Tree::new();
    let person = tree.create_individual();
    let event = tree.add_tag(person, "RESI", "").expect("container");
    let a = tree.add_tag(event, "NOTE", "A").expect("child");
    let b = tree.add_tag(event, "NOTE", "B").expect("child");
    let c = tree.add_tag(event, "NOTE", "C").expect("child");
    (tree, event, [a, b, c])
}

fn values(tree: &Tree, node: Handle) -> Vec<String> {
    tree.node(node)
        .expect("node")
        .children()
        .iter()
        .map(|&child| tree.node(child).expect("child").value().to_owned())
        .collect()
}

#[test]
fn children_keep_insertion_order() {
    let (tree, event, _) = setup();
    assert_eq!(values(&tree, event), ["A", "B", "C"]);
}

#[test]
fn delete_removes_and_disposes() {
    let (mut tree, event, [_, b, _]) = setup();
    assert!(tree.delete_child(event, b));
    assert_eq!(values(&tree, event), ["A", "C"], "order of the rest is unchanged");
    assert!(tree.node(b).is_none(), "deleted child is disposed");
    assert!(!tree.delete_child(event, b), "absent child reports not found");
}

#[test]
fn extract_removes_without_disposing() {
    let (mut tree, event, [a, _, _]) = setup();
    assert_eq!(tree.extract_child(event, a), Some(a));
    assert_eq!(values(&tree, event), ["B", "C"]);
    let node = tree.node(a).expect("extracted child still lives");
    assert_eq!(node.value(), "A");
    assert_eq!(node.parent(), VOID, "extraction unhooks the parent");
    assert_eq!(tree.extract_child(event, a), None, "absent child reports not found");
}

#[test]
fn exchange_swaps_two_positions() {
    let (mut tree, event, _) = setup();
    assert!(tree.exchange_children(event, 0, 2));
    assert_eq!(values(&tree, event), ["C", "B", "A"]);
    assert!(tree.exchange_children(event, 1, 1), "self-swap is a no-op that succeeds");
    assert_eq!(values(&tree, event), ["C", "B", "A"]);
    assert!(!tree.exchange_children(event, 0, 9), "out of range reports not found");
}

#[test]
fn find_tag_returns_the_first_of_many() {
    let (mut tree, event, [a, ..]) = setup();
    assert_eq!(tree.find_tag(event, "NOTE"), Some(a));
    assert_eq!(tree.children_named(event, "NOTE").len(), 3);
    assert_eq!(tree.find_tag(event, "MISSING"), None);
    assert_eq!(tree.tag_value(event, "MISSING"), "", "missing tags read as empty");

    tree.delete_tag(event, "NOTE");
    assert!(tree.children_named(event, "NOTE").is_empty(), "delete_tag takes all of them");
}
