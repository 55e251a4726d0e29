// The document container: an arena of nodes addressed by handle, the
// record roster with its indexes, structural operations (add, find,
// delete, clear, assign, move, pack), and GEDCOM line I/O.

use std::collections::HashMap;
use std::io::BufRead;
use std::mem;

use bimap::BiMap;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use roaring::RoaringTreemap;
use tracing::{debug, info, warn};

use crate::dates::DateValue;
use crate::error::{GedtreeError, Result};
use crate::factory;
use crate::model::{Handle, HandleGenerator, IndexHasher, Node, Payload, VOID};
use crate::records::{self, create_uid, NameParts, RecordKind};
use crate::xref::XRefResolver;

lazy_static! {
    // <depth> [@xref@] <tag> [value]; one space delimits the value so
    // leading spaces inside it survive.
    static ref LINE_RE: Regex =
        Regex::new(r"^\s*(\d+)\s+(?:@([^@]+)@\s+)?([A-Za-z0-9_]+)(?:\s(.*))?$").unwrap();
}

// ------------- listeners -------------
// Observation hooks, invoked synchronously on the caller's thread after
// the mutation completes. Not a concurrency primitive.

pub type ListenerId = u64;

type ChangeListener = Box<dyn FnMut(&Tree, Handle)>;
type ProgressListener = Box<dyn FnMut(usize)>;

#[derive(Default)]
struct Listeners {
    next_id: ListenerId,
    on_change: Vec<(ListenerId, ChangeListener)>,
    on_progress: Vec<(ListenerId, ProgressListener)>,
}

// ------------- Tree -------------

pub struct Tree {
    slots: Vec<Option<Node>>,
    generator: HandleGenerator,
    header: Handle,
    records: Vec<Handle>,
    xref_index: BiMap<String, Handle>,
    uid_index: HashMap<String, Handle, IndexHasher>,
    kind_index: HashMap<RecordKind, RoaringTreemap, IndexHasher>,
    xref_counters: HashMap<String, u64, IndexHasher>,
    listeners: Listeners,
}

impl Tree {
    pub fn new() -> Self {
        let mut tree = Self {
            slots: vec![None],
            generator: HandleGenerator::new(),
            header: VOID,
            records: Vec::new(),
            xref_index: BiMap::new(),
            uid_index: HashMap::default(),
            kind_index: HashMap::default(),
            xref_counters: HashMap::default(),
            listeners: Listeners::default(),
        };
        tree.header = tree.alloc(VOID, "HEAD", Payload::Plain);
        tree
    }

    // ------------- arena plumbing -------------

    fn alloc(&mut self, parent: Handle, name: &str, payload: Payload) -> Handle {
        let handle = self.generator.generate();
        let index = handle as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(Node::new(handle, parent, name, payload));
        handle
    }

    fn dispose_subtree(&mut self, handle: Handle) {
        let children = match self.node_mut(handle) {
            Some(node) => node.drop_children(),
            None => return,
        };
        for child in children {
            self.dispose_subtree(child);
        }
        self.slots[handle as usize] = None;
        self.generator.release(handle);
    }

    pub fn node(&self, handle: Handle) -> Option<&Node> {
        self.slots.get(handle as usize).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, handle: Handle) -> Option<&mut Node> {
        self.slots.get_mut(handle as usize).and_then(|slot| slot.as_mut())
    }

    fn require(&self, handle: Handle, what: &str) -> Result<&Node> {
        self.node(handle)
            .ok_or_else(|| GedtreeError::InvalidArgument(format!("{what}: no node {handle}")))
    }

    fn attach_child(&mut self, parent: Handle, name: &str, payload: Payload) -> Handle {
        let handle = self.alloc(parent, name, payload);
        if let Some(node) = self.node_mut(parent) {
            node.list_mut().push(handle);
        }
        handle
    }

    fn add_plain_child(&mut self, parent: Handle, name: &str, value: &str) -> Handle {
        let handle = self.attach_child(parent, name, Payload::Plain);
        if let Some(node) = self.node_mut(handle) {
            node.set_raw_value(value);
        }
        handle
    }

    // ------------- accessors -------------

    pub fn header(&self) -> Handle {
        self.header
    }
    pub fn records(&self) -> &[Handle] {
        &self.records
    }
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
    pub fn record_at(&self, index: usize) -> Option<Handle> {
        self.records.get(index).copied()
    }
    pub fn index_of(&self, record: Handle) -> Option<usize> {
        self.records.iter().position(|&r| r == record)
    }

    pub fn find_xref(&self, xref: &str) -> Option<Handle> {
        self.xref_index.get_by_left(xref).copied()
    }

    /// Lookup by UID; an empty key never matches anything.
    pub fn find_uid(&self, uid: &str) -> Option<Handle> {
        if uid.is_empty() {
            return None;
        }
        self.uid_index.get(uid).copied()
    }

    pub fn uid_of(&self, record: Handle) -> Option<String> {
        let child = self.find_tag(record, "_UID")?;
        let value = self.node(child)?.value();
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Records of one kind, in roster order.
    pub fn records_by_kind(&self, kind: RecordKind) -> Vec<Handle> {
        self.records
            .iter()
            .copied()
            .filter(|&r| self.node(r).and_then(|n| n.record_kind()) == Some(kind))
            .collect()
    }

    pub fn count_by_kind(&self, kind: RecordKind) -> u64 {
        self.kind_index.get(&kind).map_or(0, |set| set.len())
    }

    // ------------- listeners -------------

    /// Registers a change listener, called after each mutating operation
    /// with the affected node (VOID for removals and tree-wide changes).
    pub fn on_change<F: FnMut(&Tree, Handle) + 'static>(&mut self, listener: F) -> ListenerId {
        self.listeners.next_id += 1;
        let id = self.listeners.next_id;
        self.listeners.on_change.push((id, Box::new(listener)));
        id
    }

    /// Registers a progress listener, called with a percentage during
    /// long scans.
    pub fn on_progress<F: FnMut(usize) + 'static>(&mut self, listener: F) -> ListenerId {
        self.listeners.next_id += 1;
        let id = self.listeners.next_id;
        self.listeners.on_progress.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let changes = self.listeners.on_change.len() + self.listeners.on_progress.len();
        self.listeners.on_change.retain(|(i, _)| *i != id);
        self.listeners.on_progress.retain(|(i, _)| *i != id);
        changes != self.listeners.on_change.len() + self.listeners.on_progress.len()
    }

    fn notify_change(&mut self, handle: Handle) {
        if self.listeners.on_change.is_empty() {
            return;
        }
        let mut taken = mem::take(&mut self.listeners);
        for (_, listener) in taken.on_change.iter_mut() {
            listener(self, handle);
        }
        // listeners registered inside a callback land in the fresh set
        let added = mem::replace(&mut self.listeners, taken);
        self.listeners.on_change.extend(added.on_change);
        self.listeners.on_progress.extend(added.on_progress);
        self.listeners.next_id = self.listeners.next_id.max(added.next_id);
    }

    fn notify_progress(&mut self, percent: usize) {
        if self.listeners.on_progress.is_empty() {
            return;
        }
        let mut taken = mem::take(&mut self.listeners);
        for (_, listener) in taken.on_progress.iter_mut() {
            listener(percent);
        }
        let added = mem::replace(&mut self.listeners, taken);
        self.listeners.on_change.extend(added.on_change);
        self.listeners.on_progress.extend(added.on_progress);
        self.listeners.next_id = self.listeners.next_id.max(added.next_id);
    }

    // ------------- node operations -------------

    /// Adds a named child, constructing its payload through the registry
    /// unless the parent intercepts the name. A source record keeps one
    /// DATA block and treats REPO children as citations.
    pub fn add_tag(&mut self, parent: Handle, name: &str, value: &str) -> Result<Handle> {
        let parent_kind = self.require(parent, "add target")?.record_kind();
        if parent_kind == Some(RecordKind::Source) && name == "DATA" {
            if let Some(existing) = self.find_tag(parent, "DATA") {
                if !value.is_empty() {
                    if let Some(node) = self.node_mut(existing) {
                        node.apply_value(value)?;
                    }
                }
                return Ok(existing);
            }
        }
        let payload = if parent_kind == Some(RecordKind::Source) && name == "REPO" {
            Payload::Pointer
        } else {
            factory::create_payload(name, value)
        };
        let handle = self.alloc(parent, name, payload);
        let applied = match self.node_mut(handle) {
            Some(node) => node.apply_value(value),
            None => Ok(()),
        };
        if let Err(error) = applied {
            self.dispose_subtree(handle);
            return Err(error);
        }
        if let Some(node) = self.node_mut(parent) {
            node.list_mut().push(handle);
        }
        self.maybe_reindex_uid(parent, name);
        self.notify_change(handle);
        Ok(handle)
    }

    pub fn find_tag(&self, node: Handle, name: &str) -> Option<Handle> {
        self.node(node)?
            .children()
            .iter()
            .copied()
            .find(|&child| self.node(child).is_some_and(|n| n.name() == name))
    }

    pub fn children_named(&self, node: Handle, name: &str) -> Vec<Handle> {
        self.node(node).map_or_else(Vec::new, |n| {
            n.children()
                .iter()
                .copied()
                .filter(|&child| self.node(child).is_some_and(|c| c.name() == name))
                .collect()
        })
    }

    /// Rendered value of the first child with the given name, or empty.
    pub fn tag_value(&self, node: Handle, name: &str) -> String {
        self.find_tag(node, name)
            .and_then(|child| self.node(child))
            .map(|n| n.rendered_value())
            .unwrap_or_default()
    }

    pub fn set_tag_value(&mut self, node: Handle, name: &str, value: &str) -> Result<Handle> {
        match self.find_tag(node, name) {
            Some(existing) => {
                if let Some(n) = self.node_mut(existing) {
                    n.apply_value(value)?;
                }
                self.maybe_reindex_uid(node, name);
                self.notify_change(existing);
                Ok(existing)
            }
            None => self.add_tag(node, name, value),
        }
    }

    pub fn set_value(&mut self, node: Handle, value: &str) -> Result<()> {
        let (parent, name) = {
            let n = self.require(node, "set value")?;
            (n.parent(), n.name().to_string())
        };
        if let Some(n) = self.node_mut(node) {
            n.apply_value(value)?;
        }
        self.maybe_reindex_uid(parent, &name);
        self.notify_change(node);
        Ok(())
    }

    /// Deletes every child with the given name. Missing names are a
    /// silent no-op.
    pub fn delete_tag(&mut self, node: Handle, name: &str) {
        let matches = self.children_named(node, name);
        if matches.is_empty() {
            return;
        }
        for child in matches {
            if let Some(list) = self.node_mut(node).and_then(|n| n.list_opt_mut()) {
                list.remove(child);
            }
            self.dispose_subtree(child);
        }
        self.maybe_reindex_uid(node, name);
        self.notify_change(node);
    }

    /// Removes and disposes one child; false when it is not present.
    pub fn delete_child(&mut self, parent: Handle, child: Handle) -> bool {
        let removed = self
            .node_mut(parent)
            .and_then(|n| n.list_opt_mut())
            .and_then(|list| list.remove(child));
        match removed {
            Some(_) => {
                self.dispose_subtree(child);
                self.notify_change(parent);
                true
            }
            None => false,
        }
    }

    /// Removes one child without disposing it, for a transfer. The node
    /// stays in the arena with no parent.
    pub fn extract_child(&mut self, parent: Handle, child: Handle) -> Option<Handle> {
        self.node_mut(parent)
            .and_then(|n| n.list_opt_mut())
            .and_then(|list| list.remove(child))?;
        if let Some(node) = self.node_mut(child) {
            node.set_parent(VOID);
        }
        self.notify_change(parent);
        Some(child)
    }

    pub fn exchange_children(&mut self, parent: Handle, a: usize, b: usize) -> bool {
        let swapped = self
            .node_mut(parent)
            .and_then(|n| n.list_opt_mut())
            .is_some_and(|list| list.exchange(a, b));
        if swapped {
            self.notify_change(parent);
        }
        swapped
    }

    /// Drops the node's value and children, keeping its name, kind and
    /// XRef identity.
    pub fn clear_node(&mut self, handle: Handle) {
        let children = match self.node_mut(handle) {
            Some(node) => {
                node.set_raw_value("");
                if node.payload().is_pointer() {
                    node.set_xref("");
                }
                let replacement = match node.payload() {
                    Payload::Date(_) => Some(Payload::Date(DateValue::Empty)),
                    Payload::Name(_) => Some(Payload::Name(NameParts::default())),
                    _ => None,
                };
                if let Some(payload) = replacement {
                    node.set_payload(payload);
                }
                node.drop_children()
            }
            None => return,
        };
        for child in children {
            self.dispose_subtree(child);
        }
        self.notify_change(handle);
    }

    /// True iff the node carries no value, no pointer and only empty
    /// children. A record's XRef is identity rather than content, so it
    /// does not count against emptiness.
    pub fn is_empty_node(&self, handle: Handle) -> bool {
        let Some(node) = self.node(handle) else {
            return true;
        };
        let value_empty = match node.payload() {
            Payload::Date(dv) => dv.is_empty(),
            Payload::Name(np) => np.is_empty(),
            _ => node.value().is_empty(),
        };
        let xref_empty = node.payload().is_record() || node.xref().is_empty();
        value_empty
            && xref_empty
            && node.children().iter().all(|&child| self.is_empty_node(child))
    }

    /// Deep-copies the source node's content onto the target. Both must
    /// carry the same name and kind; a record target keeps its own XRef,
    /// UID and change stamp.
    pub fn assign(&mut self, target: Handle, source: Handle) -> Result<()> {
        let (source_name, source_kind) = {
            let n = self.require(source, "assign source")?;
            (n.name().to_string(), n.record_kind())
        };
        let (target_name, target_kind) = {
            let n = self.require(target, "assign target")?;
            (n.name().to_string(), n.record_kind())
        };
        if source_name != target_name || source_kind != target_kind {
            return Err(GedtreeError::InvalidArgument(format!(
                "cannot assign {source_name} content to {target_name}"
            )));
        }
        let is_record = target_kind.is_some();
        let old_children = self
            .node(target)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for child in old_children {
            // a record target keeps its own identity children
            if is_record
                && self
                    .node(child)
                    .is_some_and(|n| matches!(n.name(), "_UID" | "CHAN"))
            {
                continue;
            }
            if let Some(list) = self.node_mut(target).and_then(|n| n.list_opt_mut()) {
                list.remove(child);
            }
            self.dispose_subtree(child);
        }
        let (value, xref, payload, children) = {
            let n = self.require(source, "assign source")?;
            (
                n.value().to_string(),
                n.xref().to_string(),
                n.payload().clone(),
                n.children().to_vec(),
            )
        };
        if let Some(node) = self.node_mut(target) {
            node.set_raw_value(&value);
            if !is_record {
                node.set_xref(&xref);
                node.set_payload(payload);
            }
        }
        for child in children {
            let name = self
                .node(child)
                .map(|n| n.name().to_string())
                .unwrap_or_default();
            if is_record && matches!(name.as_str(), "_UID" | "CHAN") {
                continue;
            }
            if let Some(copy) = self.clone_subtree(child, target) {
                if let Some(node) = self.node_mut(target) {
                    node.list_mut().push(copy);
                }
            }
        }
        self.notify_change(target);
        Ok(())
    }

    fn clone_subtree(&mut self, source: Handle, new_parent: Handle) -> Option<Handle> {
        let (name, value, xref, payload, children) = {
            let node = self.node(source)?;
            (
                node.name().to_string(),
                node.value().to_string(),
                node.xref().to_string(),
                node.payload().clone(),
                node.children().to_vec(),
            )
        };
        let copy = self.alloc(new_parent, &name, payload);
        if let Some(node) = self.node_mut(copy) {
            node.set_raw_value(&value);
            node.set_xref(&xref);
        }
        for child in children {
            if let Some(child_copy) = self.clone_subtree(child, copy) {
                if let Some(node) = self.node_mut(copy) {
                    node.list_mut().push(child_copy);
                }
            }
        }
        Some(copy)
    }

    /// Transplants the source node's children into the target. With
    /// `merge_mode` the target keeps its own content and the source's is
    /// appended; without it the target's content is replaced. Source
    /// records merge their text fields line-wise first.
    pub fn move_to(&mut self, source: Handle, target: Handle, merge_mode: bool) -> Result<()> {
        let (source_name, source_kind) = {
            let n = self.require(source, "move source")?;
            (n.name().to_string(), n.record_kind())
        };
        let (target_name, target_kind) = {
            let n = self.require(target, "move target")?;
            (n.name().to_string(), n.record_kind())
        };
        if source_name != target_name || source_kind != target_kind {
            return Err(GedtreeError::InvalidArgument(format!(
                "cannot move {source_name} content into {target_name}"
            )));
        }
        if !merge_mode {
            let children = self
                .node(target)
                .map(|n| n.children().to_vec())
                .unwrap_or_default();
            for child in children {
                let name = self
                    .node(child)
                    .map(|n| n.name().to_string())
                    .unwrap_or_default();
                if matches!(name.as_str(), "CHAN" | "_UID") {
                    continue;
                }
                if let Some(list) = self.node_mut(target).and_then(|n| n.list_opt_mut()) {
                    list.remove(child);
                }
                self.dispose_subtree(child);
            }
        }
        if source_kind == Some(RecordKind::Source) {
            self.merge_source_texts(source, target)?;
        }
        let children = self
            .node(source)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for child in children {
            let name = self
                .node(child)
                .map(|n| n.name().to_string())
                .unwrap_or_default();
            // identity and bookkeeping stay with their records
            if matches!(name.as_str(), "CHAN" | "_UID") {
                continue;
            }
            if merge_mode && name == "SEX" && self.find_tag(target, "SEX").is_some() {
                continue;
            }
            if source_kind == Some(RecordKind::Source) && name == "DATA" {
                if let Some(target_data) = self.find_tag(target, "DATA") {
                    if target_data != child {
                        self.transplant_children(child, target_data);
                        continue;
                    }
                }
            }
            if let Some(list) = self.node_mut(source).and_then(|n| n.list_opt_mut()) {
                list.remove(child);
            }
            if let Some(node) = self.node_mut(child) {
                node.set_parent(target);
            }
            if let Some(node) = self.node_mut(target) {
                node.list_mut().push(child);
            }
        }
        if source_kind == Some(RecordKind::Individual) {
            self.repoint_family_links(source, target);
        }
        self.notify_change(target);
        Ok(())
    }

    // Families reached through the moved FAMC/FAMS links still point at
    // the source individual; their member pointers follow the move.
    fn repoint_family_links(&mut self, source: Handle, target: Handle) {
        let source_xref = self
            .node(source)
            .map(|n| n.xref().to_string())
            .unwrap_or_default();
        let target_xref = self
            .node(target)
            .map(|n| n.xref().to_string())
            .unwrap_or_default();
        if source_xref.is_empty() || target_xref.is_empty() {
            return;
        }
        let links = self
            .node(target)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for link in links {
            let family = match self.node(link) {
                Some(node) if matches!(node.name(), "FAMC" | "FAMS") => {
                    self.find_xref(node.xref())
                }
                _ => None,
            };
            let Some(family) = family else { continue };
            let members = self
                .node(family)
                .map(|n| n.children().to_vec())
                .unwrap_or_default();
            for member in members {
                if let Some(node) = self.node_mut(member) {
                    if matches!(node.name(), "CHIL" | "HUSB" | "WIFE")
                        && node.xref() == source_xref
                    {
                        node.set_xref(&target_xref);
                    }
                }
            }
        }
    }

    fn transplant_children(&mut self, from: Handle, to: Handle) {
        let children = self
            .node(from)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for child in children {
            if let Some(list) = self.node_mut(from).and_then(|n| n.list_opt_mut()) {
                list.remove(child);
            }
            if let Some(node) = self.node_mut(child) {
                node.set_parent(to);
            }
            if let Some(node) = self.node_mut(to) {
                node.list_mut().push(child);
            }
        }
    }

    // Title, author, publication and text merge line-wise; the source's
    // short title is dropped in favor of the target's.
    fn merge_source_texts(&mut self, source: Handle, target: Handle) -> Result<()> {
        for tag in ["TITL", "AUTH", "PUBL", "TEXT"] {
            let joined = format!("{}\n{}", self.tag_value(target, tag), self.tag_value(source, tag));
            let merged = joined.trim().to_string();
            self.delete_tag(source, tag);
            if merged.is_empty() {
                self.delete_tag(target, tag);
            } else {
                self.set_tag_value(target, tag, &merged)?;
            }
        }
        self.delete_tag(source, "ABBR");
        Ok(())
    }

    /// Strips structurally empty sub-nodes tree-wide. Idempotent.
    pub fn pack(&mut self) {
        let mut removed = self.pack_node(self.header);
        let records = self.records.clone();
        let total = records.len();
        let mut last_percent = 0;
        for (index, record) in records.into_iter().enumerate() {
            removed += self.pack_node(record);
            if total > 0 {
                let percent = (index + 1) * 100 / total;
                if percent != last_percent {
                    self.notify_progress(percent);
                    last_percent = percent;
                }
            }
        }
        debug!(removed, "pack finished");
        self.notify_change(VOID);
    }

    fn pack_node(&mut self, handle: Handle) -> usize {
        let children = self
            .node(handle)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        let mut removed = 0;
        for child in children {
            removed += self.pack_node(child);
            if self.is_empty_node(child) {
                if let Some(list) = self.node_mut(handle).and_then(|n| n.list_opt_mut()) {
                    list.remove(child);
                }
                self.dispose_subtree(child);
                removed += 1;
            }
        }
        removed
    }

    /// Empties the document: every record is disposed, the header loses
    /// its content, and all indexes and XRef counters reset.
    pub fn clear(&mut self) {
        let records = mem::take(&mut self.records);
        self.xref_index.clear();
        self.uid_index.clear();
        self.kind_index.clear();
        self.xref_counters.clear();
        for record in records {
            self.dispose_subtree(record);
        }
        self.clear_node(self.header);
        self.notify_change(VOID);
    }

    /// True when the tree holds no records and the header carries no
    /// content.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.is_empty_node(self.header)
    }

    // ------------- record operations -------------

    pub fn create_record(&mut self, kind: RecordKind) -> Handle {
        let handle = self.create_record_bare(kind);
        let uid = create_uid();
        self.add_plain_child(handle, "_UID", &uid);
        self.uid_index.insert(uid, handle);
        self.touch(handle);
        self.notify_change(handle);
        handle
    }

    // Roster and index wiring without the identity children; the loader
    // uses this so file-supplied UIDs and change stamps stay alone.
    fn create_record_bare(&mut self, kind: RecordKind) -> Handle {
        let handle = self.alloc(VOID, kind.tag(), Payload::Record(kind));
        let xref = self.mint_xref(kind);
        self.set_record_xref(handle, &xref);
        self.records.push(handle);
        self.kind_index.entry(kind).or_default().insert(handle);
        handle
    }

    pub fn create_individual(&mut self) -> Handle {
        self.create_record(RecordKind::Individual)
    }
    pub fn create_family(&mut self) -> Handle {
        self.create_record(RecordKind::Family)
    }
    pub fn create_note(&mut self) -> Handle {
        self.create_record(RecordKind::Note)
    }
    pub fn create_multimedia(&mut self) -> Handle {
        self.create_record(RecordKind::Multimedia)
    }
    pub fn create_source(&mut self) -> Handle {
        self.create_record(RecordKind::Source)
    }
    pub fn create_repository(&mut self) -> Handle {
        self.create_record(RecordKind::Repository)
    }
    pub fn create_group(&mut self) -> Handle {
        self.create_record(RecordKind::Group)
    }
    pub fn create_research(&mut self) -> Handle {
        self.create_record(RecordKind::Research)
    }
    pub fn create_task(&mut self) -> Handle {
        self.create_record(RecordKind::Task)
    }
    pub fn create_communication(&mut self) -> Handle {
        self.create_record(RecordKind::Communication)
    }
    pub fn create_location(&mut self) -> Handle {
        self.create_record(RecordKind::Location)
    }
    pub fn create_submission(&mut self) -> Handle {
        self.create_record(RecordKind::Submission)
    }
    pub fn create_submitter(&mut self) -> Handle {
        self.create_record(RecordKind::Submitter)
    }

    /// The submitter record the header points at, created on first use.
    pub fn submitter(&mut self) -> Handle {
        let header = self.header;
        if let Some(pointer) = self.find_tag(header, "SUBM") {
            let xref = self
                .node(pointer)
                .map(|n| n.xref().to_string())
                .unwrap_or_default();
            if let Some(record) = self.find_xref(&xref) {
                return record;
            }
        }
        let record = self.create_record(RecordKind::Submitter);
        let xref = self
            .node(record)
            .map(|n| n.xref().to_string())
            .unwrap_or_default();
        match self.find_tag(header, "SUBM") {
            Some(pointer) => {
                if let Some(node) = self.node_mut(pointer) {
                    node.set_xref(&xref);
                }
            }
            None => {
                let pointer = self.attach_child(header, "SUBM", Payload::Pointer);
                if let Some(node) = self.node_mut(pointer) {
                    node.set_xref(&xref);
                }
            }
        }
        record
    }

    /// Removes a record and its subtree. False when the handle is not a
    /// record of this tree.
    pub fn delete_record(&mut self, record: Handle) -> bool {
        let Some(position) = self.index_of(record) else {
            return false;
        };
        let kind = self.node(record).and_then(|n| n.record_kind());
        self.records.remove(position);
        self.xref_index.remove_by_right(&record);
        self.uid_index.retain(|_, &mut h| h != record);
        if let Some(kind) = kind {
            if let Some(set) = self.kind_index.get_mut(&kind) {
                set.remove(record);
            }
        }
        self.dispose_subtree(record);
        self.notify_change(VOID);
        true
    }

    /// Takes a record out of the roster and indexes without disposing
    /// its subtree. The nodes stay allocated; [`Tree::adopt_record`]
    /// files the record back in.
    pub fn extract_record(&mut self, record: Handle) -> Option<Handle> {
        let position = self.index_of(record)?;
        let kind = self.node(record).and_then(|n| n.record_kind());
        self.records.remove(position);
        self.xref_index.remove_by_right(&record);
        self.uid_index.retain(|_, &mut h| h != record);
        if let Some(kind) = kind {
            if let Some(set) = self.kind_index.get_mut(&kind) {
                set.remove(record);
            }
        }
        self.notify_change(VOID);
        Some(record)
    }

    /// Files an extracted record back into the roster and indexes,
    /// returning its slot. The record keeps its XRef and UID unless
    /// another record claimed them in the meantime, in which case fresh
    /// ones are minted. A record that is already filed just reports its
    /// current slot.
    pub fn adopt_record(&mut self, record: Handle) -> Result<usize> {
        if let Some(position) = self.index_of(record) {
            return Ok(position);
        }
        let kind = self
            .node(record)
            .and_then(|n| n.record_kind())
            .ok_or_else(|| {
                GedtreeError::InvalidArgument(format!("adoption target {record} is not a record"))
            })?;
        let xref = self
            .node(record)
            .map(|n| n.xref().to_string())
            .unwrap_or_default();
        let xref = if xref.is_empty() || self.xref_index.contains_left(&xref) {
            self.mint_xref(kind)
        } else {
            xref
        };
        self.set_record_xref(record, &xref);
        self.records.push(record);
        self.kind_index.entry(kind).or_default().insert(record);
        match self.uid_of(record) {
            Some(uid) if self.find_uid(&uid).is_none() => {
                self.uid_index.insert(uid, record);
            }
            Some(_) => {
                self.delete_tag(record, "_UID");
                let uid = create_uid();
                self.add_plain_child(record, "_UID", &uid);
                self.uid_index.insert(uid, record);
            }
            None => {}
        }
        self.notify_change(record);
        Ok(self.records.len() - 1)
    }

    /// Refreshes the record's change stamp to the current UTC time.
    pub fn touch(&mut self, record: Handle) {
        if !self.node(record).is_some_and(|n| n.payload().is_record()) {
            return;
        }
        let now = Utc::now();
        let stamp = now.format("%d %b %Y").to_string().to_ascii_uppercase();
        let time = now.format("%H:%M:%S").to_string();
        let chan = match self.find_tag(record, "CHAN") {
            Some(handle) => handle,
            None => self.add_plain_child(record, "CHAN", ""),
        };
        let date = match self.find_tag(chan, "DATE") {
            Some(handle) => handle,
            None => self.add_plain_child(chan, "DATE", ""),
        };
        if let Some(node) = self.node_mut(date) {
            node.set_raw_value(&stamp);
        }
        let time_node = match self.find_tag(date, "TIME") {
            Some(handle) => handle,
            None => self.add_plain_child(date, "TIME", ""),
        };
        if let Some(node) = self.node_mut(time_node) {
            node.set_raw_value(&time);
        }
        self.notify_change(record);
    }

    /// Adds an event of the given tag, rejecting categories the record
    /// kind cannot hold.
    pub fn add_event(&mut self, record: Handle, tag: &str, date: &str, place: &str) -> Result<Handle> {
        let kind = self.require(record, "event target")?.record_kind();
        let allowed = match kind {
            Some(RecordKind::Individual) => records::is_individual_event(tag),
            Some(RecordKind::Family) => records::is_family_event(tag),
            _ => false,
        };
        if !allowed {
            let target = kind.map(|k| k.tag()).unwrap_or("a non-record node");
            return Err(GedtreeError::InvalidArgument(format!(
                "{tag} event cannot be added to {target}"
            )));
        }
        let event = self.add_tag(record, tag, "")?;
        if !date.is_empty() {
            self.set_tag_value(event, "DATE", date)?;
        }
        if !place.is_empty() {
            self.set_tag_value(event, "PLAC", place)?;
        }
        self.touch(record);
        Ok(event)
    }

    /// Links a note record to a carrier. The carrier's kind must accept
    /// notes and the target must be a note record.
    pub fn add_note_link(&mut self, record: Handle, note: Handle) -> Result<Handle> {
        self.add_record_link(record, note, "NOTE", RecordKind::Note, RecordKind::has_notes)
    }

    /// Cites a source from a carrier record, with an optional page.
    pub fn add_source_citation(
        &mut self,
        record: Handle,
        source: Handle,
        page: &str,
    ) -> Result<Handle> {
        let citation = self.add_record_link(
            record,
            source,
            "SOUR",
            RecordKind::Source,
            RecordKind::has_source_citations,
        )?;
        if !page.is_empty() {
            self.set_tag_value(citation, "PAGE", page)?;
        }
        Ok(citation)
    }

    /// Links a multimedia record to a carrier.
    pub fn add_multimedia_link(&mut self, record: Handle, object: Handle) -> Result<Handle> {
        self.add_record_link(
            record,
            object,
            "OBJE",
            RecordKind::Multimedia,
            RecordKind::has_multimedia_links,
        )
    }

    // Pointer-child plumbing shared by the capability links above.
    fn add_record_link(
        &mut self,
        record: Handle,
        target: Handle,
        tag: &str,
        target_kind: RecordKind,
        allows: fn(&RecordKind) -> bool,
    ) -> Result<Handle> {
        let kind = self.require(record, "link carrier")?.record_kind();
        match kind {
            Some(kind) if allows(&kind) => {}
            Some(kind) => {
                return Err(GedtreeError::InvalidArgument(format!(
                    "{} records do not carry {tag} links",
                    kind.tag()
                )));
            }
            None => {
                return Err(GedtreeError::InvalidArgument(
                    "link carrier is not a record".to_string(),
                ));
            }
        }
        let xref = match self.node(target) {
            Some(node) if node.record_kind() == Some(target_kind) => node.xref().to_string(),
            _ => {
                return Err(GedtreeError::InvalidArgument(format!(
                    "link target {target} is not a {} record",
                    target_kind.tag()
                )));
            }
        };
        let link = self.add_tag(record, tag, &format!("@{xref}@"))?;
        self.touch(record);
        Ok(link)
    }

    /// Folds the source record into the target: content moves across in
    /// merge mode, the source is deleted, and every pointer that named
    /// the source is rewritten to the target.
    pub fn merge_record(&mut self, source: Handle, target: Handle) -> Result<()> {
        if source == target {
            return Err(GedtreeError::InvalidArgument(
                "cannot merge a record into itself".to_string(),
            ));
        }
        let source_xref = self.require(source, "merge source")?.xref().to_string();
        let target_xref = self.require(target, "merge target")?.xref().to_string();
        let mut resolver = XRefResolver::new();
        resolver.add_xref(target, &source_xref);
        self.move_to(source, target, true)?;
        self.delete_record(source);
        self.replace_xrefs(&resolver);
        self.touch(target);
        debug!(source = %source_xref, target = %target_xref, "records merged");
        Ok(())
    }

    /// Deep-copies a record from another tree, minting a fresh XRef. The
    /// source's XRef goes into `resolver` so that pointers among a batch
    /// of copies can be repaired with [`Tree::replace_xrefs`] afterwards.
    /// The UID travels along unless it would collide here.
    pub fn copy_record_from(
        &mut self,
        other: &Tree,
        record: Handle,
        resolver: &mut XRefResolver,
    ) -> Result<Handle> {
        let kind = other
            .node(record)
            .and_then(|n| n.record_kind())
            .ok_or_else(|| {
                GedtreeError::InvalidArgument(format!("copy source {record} is not a record"))
            })?;
        let old_xref = other
            .node(record)
            .map(|n| n.xref().to_string())
            .unwrap_or_default();
        let copy = self.create_record(kind);
        if !old_xref.is_empty() {
            resolver.add_xref(copy, &old_xref);
        }
        self.delete_tag(copy, "_UID");
        let children = other
            .node(record)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for child in children {
            let name = other
                .node(child)
                .map(|n| n.name().to_string())
                .unwrap_or_default();
            if name == "CHAN" {
                continue;
            }
            if let Some(child_copy) = self.clone_foreign_subtree(other, child, copy) {
                if let Some(node) = self.node_mut(copy) {
                    node.list_mut().push(child_copy);
                }
            }
        }
        match self.uid_of(copy) {
            Some(uid) if self.find_uid(&uid).is_none() => {
                self.uid_index.insert(uid, copy);
            }
            _ => {
                self.delete_tag(copy, "_UID");
                let uid = create_uid();
                self.add_plain_child(copy, "_UID", &uid);
                self.uid_index.insert(uid, copy);
            }
        }
        self.notify_change(copy);
        Ok(copy)
    }

    fn clone_foreign_subtree(
        &mut self,
        other: &Tree,
        source: Handle,
        new_parent: Handle,
    ) -> Option<Handle> {
        let node = other.node(source)?;
        let (name, value, xref, payload, children) = (
            node.name().to_string(),
            node.value().to_string(),
            node.xref().to_string(),
            node.payload().clone(),
            node.children().to_vec(),
        );
        let copy = self.alloc(new_parent, &name, payload);
        if let Some(n) = self.node_mut(copy) {
            n.set_raw_value(&value);
            n.set_xref(&xref);
        }
        for child in children {
            if let Some(child_copy) = self.clone_foreign_subtree(other, child, copy) {
                if let Some(n) = self.node_mut(copy) {
                    n.list_mut().push(child_copy);
                }
            }
        }
        Some(copy)
    }

    /// Rewrites every pointer node through the resolver, tree-wide.
    pub fn replace_xrefs(&mut self, resolver: &XRefResolver) {
        let roots: Vec<Handle> = std::iter::once(self.header)
            .chain(self.records.iter().copied())
            .collect();
        for root in roots {
            self.replace_xrefs_in(root, resolver);
        }
        self.notify_change(VOID);
    }

    fn replace_xrefs_in(&mut self, root: Handle, resolver: &XRefResolver) {
        // collect first, then write: the resolver reads the tree
        let mut updates: Vec<(Handle, String)> = Vec::new();
        self.collect_pointer_updates(root, resolver, &mut updates);
        for (handle, xref) in updates {
            if let Some(node) = self.node_mut(handle) {
                node.set_xref(&xref);
            }
        }
    }

    fn collect_pointer_updates(
        &self,
        handle: Handle,
        resolver: &XRefResolver,
        out: &mut Vec<(Handle, String)>,
    ) {
        let Some(node) = self.node(handle) else {
            return;
        };
        if node.payload().is_pointer() && !node.xref().is_empty() {
            let mapped = resolver.find_new_xref(self, node.xref());
            if mapped != node.xref() {
                out.push((handle, mapped));
            }
        }
        for &child in node.children() {
            self.collect_pointer_updates(child, resolver, out);
        }
    }

    // ------------- XRef and UID bookkeeping -------------

    fn mint_xref(&mut self, kind: RecordKind) -> String {
        let sign = kind.xref_sign();
        let counter = self.xref_counters.entry(sign.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{sign}{counter}");
            if !self.xref_index.contains_left(&candidate) {
                return candidate;
            }
        }
    }

    fn set_record_xref(&mut self, record: Handle, xref: &str) {
        let kind = self.node(record).and_then(|n| n.record_kind());
        self.xref_index.remove_by_right(&record);
        self.xref_index.insert(xref.to_string(), record);
        if let Some(node) = self.node_mut(record) {
            node.set_xref(xref);
        }
        // counters never fall behind adopted identifiers
        if let Some(kind) = kind {
            let sign = kind.xref_sign();
            if let Some(number) = xref.strip_prefix(sign).and_then(|rest| rest.parse::<u64>().ok())
            {
                let counter = self.xref_counters.entry(sign.to_string()).or_insert(0);
                if number > *counter {
                    *counter = number;
                }
            }
        }
    }

    fn maybe_reindex_uid(&mut self, parent: Handle, name: &str) {
        if name == "_UID" && self.node(parent).is_some_and(|n| n.payload().is_record()) {
            self.reindex_uid(parent);
        }
    }

    fn reindex_uid(&mut self, record: Handle) {
        self.uid_index.retain(|_, &mut h| h != record);
        if let Some(uid) = self.uid_of(record) {
            self.uid_index.insert(uid, record);
        }
    }

    // ------------- line I/O -------------

    pub fn load_from_str(&mut self, text: &str) -> Result<()> {
        let mut loader = Loader::new(self);
        for (number, line) in text.lines().enumerate() {
            if let Err(error) = loader.push_line(number + 1, line) {
                warn!(%error, "line skipped");
            }
        }
        loader.finish()
    }

    pub fn read_from<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut loader = Loader::new(self);
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if let Err(error) = loader.push_line(number + 1, &line) {
                warn!(%error, "line skipped");
            }
        }
        loader.finish()
    }

    pub fn save_to_string(&self) -> String {
        let mut out = String::new();
        self.emit_node(&mut out, 0, self.header);
        for &record in &self.records {
            self.emit_node(&mut out, 0, record);
        }
        out.push_str("0 TRLR\n");
        out
    }

    pub fn write_to<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        let text = self.save_to_string();
        writer.write_all(text.as_bytes())?;
        info!(records = self.record_count(), bytes = text.len(), "document written");
        Ok(())
    }

    fn emit_node(&self, out: &mut String, depth: usize, handle: Handle) {
        let Some(node) = self.node(handle) else {
            return;
        };
        let value = node.rendered_value();
        let mut lines = value.split('\n');
        let first = lines.next().unwrap_or("");
        out.push_str(&depth.to_string());
        if node.payload().is_record() && !node.xref().is_empty() {
            out.push_str(" @");
            out.push_str(node.xref());
            out.push('@');
        }
        out.push(' ');
        out.push_str(node.name());
        if !first.is_empty() {
            out.push(' ');
            out.push_str(first);
        }
        out.push('\n');
        // embedded line breaks ride as CONT children
        for continuation in lines {
            out.push_str(&(depth + 1).to_string());
            out.push_str(" CONT");
            if !continuation.is_empty() {
                out.push(' ');
                out.push_str(continuation);
            }
            out.push('\n');
        }
        for &child in node.children() {
            self.emit_node(out, depth + 1, child);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Loader -------------
// Single forward pass with a depth-indexed parent stack. Malformed input
// is logged and skipped rather than aborting the document.

struct Loader<'a> {
    tree: &'a mut Tree,
    stack: Vec<(usize, Handle)>,
    resolver: XRefResolver,
    loaded: Vec<Handle>,
    renumbered: bool,
    ended: bool,
}

impl<'a> Loader<'a> {
    fn new(tree: &'a mut Tree) -> Self {
        Self {
            tree,
            stack: Vec::new(),
            resolver: XRefResolver::new(),
            loaded: Vec::new(),
            renumbered: false,
            ended: false,
        }
    }

    fn malformed(line: usize, message: &str) -> GedtreeError {
        GedtreeError::Structure {
            message: message.to_string(),
            line,
        }
    }

    fn push_line(&mut self, number: usize, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        let Some(captures) = LINE_RE.captures(line) else {
            return Err(Self::malformed(number, "unparseable line"));
        };
        let depth: usize = captures[1]
            .parse()
            .map_err(|_| Self::malformed(number, "depth out of range"))?;
        if self.ended {
            return Err(Self::malformed(number, "line after the trailer"));
        }
        let xref = captures.get(2).map(|m| m.as_str());
        let tag = captures[3].to_string();
        let value = captures.get(4).map_or("", |m| m.as_str());

        if depth == 0 {
            self.stack.clear();
            match tag.as_str() {
                "HEAD" => {
                    let header = self.tree.header();
                    self.tree.clear_node(header);
                    self.stack.push((0, header));
                }
                "TRLR" => self.ended = true,
                _ => match RecordKind::from_tag(&tag) {
                    Some(kind) => {
                        let record = self.tree.create_record_bare(kind);
                        if let Some(old) = xref {
                            match self.tree.find_xref(old) {
                                Some(existing) if existing != record => {
                                    self.resolver.add_xref(record, old);
                                    self.renumbered = true;
                                    warn!(line = number, xref = old, "duplicate XRef renumbered");
                                }
                                Some(_) => {}
                                None => self.tree.set_record_xref(record, old),
                            }
                        }
                        if !value.is_empty() {
                            if let Some(node) = self.tree.node_mut(record) {
                                node.set_raw_value(value);
                            }
                        }
                        self.loaded.push(record);
                        self.stack.push((0, record));
                    }
                    None => {
                        return Err(Self::malformed(number, &format!("unknown top-level tag {tag}")))
                    }
                },
            }
            return Ok(());
        }

        while self.stack.last().is_some_and(|&(d, _)| d >= depth) {
            self.stack.pop();
        }
        let Some(&(parent_depth, parent)) = self.stack.last() else {
            return Err(Self::malformed(number, "no open record above this line"));
        };
        if parent_depth != depth - 1 {
            return Err(Self::malformed(
                number,
                &format!("depth {depth} skips a level under {parent_depth}"),
            ));
        }

        if tag == "CONT" || tag == "CONC" {
            // note records also carry their text in the raw value
            let appended = match self.tree.node(parent) {
                Some(node) if matches!(node.payload(), Payload::Plain | Payload::Record(_)) => {
                    let mut text = node.value().to_string();
                    if tag == "CONT" {
                        text.push('\n');
                    }
                    text.push_str(value);
                    Some(text)
                }
                _ => None,
            };
            match appended {
                Some(text) => {
                    if let Some(node) = self.tree.node_mut(parent) {
                        node.set_raw_value(&text);
                    }
                }
                None => {
                    return Err(Self::malformed(number, "continuation under a structured tag"))
                }
            }
            return Ok(());
        }

        let handle = match self.tree.add_tag(parent, &tag, value) {
            Ok(handle) => handle,
            Err(error) => {
                warn!(line = number, %error, "value kept as plain text");
                self.tree.add_plain_child(parent, &tag, value)
            }
        };
        self.stack.push((depth, handle));
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.renumbered {
            for &record in &self.loaded {
                self.tree.replace_xrefs_in(record, &self.resolver);
            }
        }
        for &record in &self.loaded {
            self.tree.reindex_uid(record);
        }
        info!(records = self.loaded.len(), renumbered = self.renumbered, "document loaded");
        let header = self.tree.header();
        self.tree.notify_change(header);
        Ok(())
    }
}
