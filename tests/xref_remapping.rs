use gedtree::tree::Tree;
use gedtree::xref::XRefResolver;

#[test]
fn unmapped_references_pass_through() {
    let tree = Tree::new();
    let resolver = XRefResolver::new();
    assert!(resolver.is_empty());
    assert_eq!(resolver.find_new_xref(&tree, "I210"), "I210");
}

#[test]
fn a_mapped_reference_resolves_to_the_live_xref() {
    let mut tree = Tree::new();
    let record = tree.create_individual();
    let current = tree.node(record).expect("node").xref().to_owned();

    let mut resolver = XRefResolver::new();
    resolver.add_xref(record, "I210");
    assert_eq!(resolver.len(), 1);
    assert_eq!(resolver.get(0).expect("entry").old_xref(), "I210");
    assert_eq!(resolver.find_new_xref(&tree, "I210"), current);
    assert_eq!(resolver.find_new_xref(&tree, "I310"), "I310", "others are untouched");
}

#[test]
fn resolution_tracks_later_renumbering() {
    // The resolver stores the record, not a snapshot of its xref, so a
    // lookup sees whatever the record is called right now.
    let mut tree = Tree::new();
    let record = tree.create_individual();
    let mut resolver = XRefResolver::new();
    resolver.add_xref(record, "I210");

    tree.delete_record(record);
    assert_eq!(resolver.find_new_xref(&tree, "I210"), "I210",
        "a dead record falls back to the input");
}

#[test]
fn cross_tree_copies_can_be_repointed_at_each_other() {
    let mut source = Tree::new();
    let person = source.create_individual();
    let family = source.create_family();
    let person_xref = source.node(person).expect("node").xref().to_owned();
    let family_xref = source.node(family).expect("node").xref().to_owned();
    source
        .add_tag(person, "FAMS", &format!("@{family_xref}@"))
        .expect("spouse link");
    source
        .add_tag(family, "HUSB", &format!("@{person_xref}@"))
        .expect("member link");

    // Occupy the low numbers so the imports visibly renumber.
    let mut dest = Tree::new();
    dest.create_individual();
    dest.create_family();

    let mut resolver = XRefResolver::new();
    let person_copy = dest
        .copy_record_from(&source, person, &mut resolver)
        .expect("copied");
    let family_copy = dest
        .copy_record_from(&source, family, &mut resolver)
        .expect("copied");
    assert_eq!(resolver.len(), 2);

    let person_copy_xref = dest.node(person_copy).expect("node").xref().to_owned();
    let family_copy_xref = dest.node(family_copy).expect("node").xref().to_owned();
    assert_ne!(person_copy_xref, person_xref);
    assert_ne!(family_copy_xref, family_xref);

    dest.replace_xrefs(&resolver);

    let fams = dest.find_tag(person_copy, "FAMS").expect("link survived");
    assert_eq!(dest.node(fams).expect("node").xref(), family_copy_xref);
    let husb = dest.find_tag(family_copy, "HUSB").expect("link survived");
    assert_eq!(dest.node(husb).expect("node").xref(), person_copy_xref);
}

#[test]
fn replace_xrefs_rewrites_pointer_nodes() {
    let mut tree = Tree::new();
    let person = tree.create_individual();
    let person_xref = tree.node(person).expect("node").xref().to_owned();

    let family = tree.create_family();
    let husb = tree.add_tag(family, "HUSB", "@I99@").expect("pointer");
    assert_eq!(tree.node(husb).expect("node").xref(), "I99");

    let mut resolver = XRefResolver::new();
    resolver.add_xref(person, "I99");
    tree.replace_xrefs(&resolver);

    assert_eq!(tree.node(husb).expect("node").xref(), person_xref);
    let text = tree.save_to_string();
    assert!(text.contains(&format!("1 HUSB @{person_xref}@")));
}
