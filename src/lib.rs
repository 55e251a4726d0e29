//! Gedtree – an in-memory document model for GEDCOM genealogical data.
//!
//! Gedtree centers on the *node* concept: one line of a GEDCOM file becomes
//! one node in an arena-backed tree, where:
//! * A [`model::Handle`] is an opaque node identity (a simple `u64`).
//! * A [`model::Node`] couples a tag name with a typed [`model::Payload`]
//!   (plain text, a pointer to another record, a parsed date, a structured
//!   personal name, or a record marker).
//! * A [`model::NodeList`] keeps the ordered children of a node.
//! * A [`tree::Tree`] owns every node, the record roster, and the XRef and
//!   UID indexes that make cross-references resolvable.
//!
//! Nodes are owned and recycled by the tree's arena, enabling cheap handles
//! throughout the API while the indexes (a `BiMap` for XRefs, roaring
//! bitmaps per record kind) keep lookups fast on large files.
//!
//! ## Modules
//! * [`model`] – Handles, nodes, payloads and ordered child lists.
//! * [`tree`] – The document tree: records, indexes, tag operations,
//!   load/save of the line-oriented GEDCOM syntax.
//! * [`factory`] – The process-wide tag registry that decides which payload
//!   a freshly parsed tag receives.
//! * [`records`] – Record kinds, XRef sign table, structured personal names
//!   and the event/attribute tag tables.
//! * [`dates`] – The GEDCOM date grammar (parser + five calendars) behind
//!   [`dates::DateValue`]. Grammar details live in `date.pest`.
//! * [`udn`] – Unified date numbers: calendar-independent day numbers used
//!   for comparison and sorting.
//! * [`matching`] – Similarity scoring and duplicate detection across
//!   records of the same kind.
//! * [`xref`] – Remapping of XRef identifiers when trees are merged.
//! * [`error`] – The crate-wide [`error::GedtreeError`] and `Result` alias.
//!
//! ## Dates
//! A [`dates::DateValue`] covers the full GEDCOM 5.5.1 date grammar: simple
//! dates, ranges (`BET`/`AND`), periods (`FROM`/`TO`), approximations and
//! interpretations, in the Gregorian, Julian, Hebrew, French Republican and
//! Roman calendars. Every value collapses to a [`udn::Udn`] so that dates
//! from different calendars order correctly against each other.
//!
//! ## Matching
//! The [`matching`] module scores record pairs with the same rules the
//! interactive tooling uses for duplicate hunting: longest-common-substring
//! name similarity, UDN-based date proximity and per-kind equality checks,
//! all tunable through [`matching::MatchParams`].
//!
//! ## Quick Start
//! ```
//! use gedtree::tree::Tree;
//!
//! let mut tree = Tree::new();
//! let person = tree.create_individual();
//! tree.set_tag_value(person, "NAME", "Alice /Smith/").unwrap();
//! let text = tree.save_to_string();
//! assert!(text.contains("1 NAME Alice /Smith/"));
//! ```

pub mod dates;
pub mod error;
pub mod factory;
pub mod matching;
pub mod model;
pub mod records;
pub mod tree;
pub mod udn;
pub mod xref;
