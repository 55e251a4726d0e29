// used to keep fast indexes over handles and names
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;

// used to recognize pointer-shaped values like @I1@
use lazy_static::lazy_static;
use regex::Regex;

// used to print out readable forms of a node
use std::fmt;

// our own stuff that we need
use crate::dates::DateValue;
use crate::error::Result;
use crate::records::{NameParts, RecordKind};

// ------------- Handle -------------
// Every node in a document is identified by a handle. Handles are issued
// by a generator owned by the tree and reused after release, so they stay
// dense even across heavy churn.
pub type Handle = u64;

pub type IndexHasher = BuildHasherDefault<SeaHasher>;

// The zero handle never refers to a live node.
pub const VOID: Handle = 0;

#[derive(Debug)]
pub struct HandleGenerator {
    lower_bound: Handle,
    released: Vec<Handle>,
}

impl HandleGenerator {
    pub fn new() -> Self {
        Self {
            lower_bound: VOID,
            released: Vec::new(),
        }
    }
    pub fn generate(&mut self) -> Handle {
        self.released.pop().unwrap_or_else(|| {
            self.lower_bound += 1;
            self.lower_bound
        })
    }
    pub fn release(&mut self, h: Handle) {
        if h != VOID {
            self.released.push(h);
        }
    }
    // Highest handle ever issued; the arena sizes its slot vector from it.
    pub fn lower_bound(&self) -> Handle {
        self.lower_bound
    }
}

impl Default for HandleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Payload -------------
// What a node is over and above its tag name. Most tags are plain; the
// registry assigns richer payloads to the tag names that need them.
#[derive(Debug, Clone)]
pub enum Payload {
    Plain,
    Pointer,
    Date(DateValue),
    Name(NameParts),
    Record(RecordKind),
}

impl Payload {
    pub fn is_record(&self) -> bool {
        matches!(self, Payload::Record(_))
    }
    pub fn is_pointer(&self) -> bool {
        matches!(self, Payload::Pointer)
    }
}

lazy_static! {
    // A pointer value is a whole-string @X@ where X is not a calendar
    // escape introducer (#).
    static ref POINTER_RE: Regex = Regex::new(r"^@([^@#][^@]*)@$").unwrap();
}

pub fn pointer_target(value: &str) -> Option<&str> {
    POINTER_RE
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// ------------- Node -------------
#[derive(Debug)]
pub struct Node {
    handle: Handle,
    parent: Handle, // weak: the owning container keeps the child handles
    name: String,
    value: String,
    xref: String,
    children: Option<NodeList>, // absent until the first child arrives
    payload: Payload,
}

impl Node {
    pub fn new(handle: Handle, parent: Handle, name: &str, payload: Payload) -> Self {
        Self {
            handle,
            parent,
            name: name.to_owned(),
            value: String::new(),
            xref: String::new(),
            children: None,
            payload,
        }
    }
    // Identity and structure are encapsulated behind getters; mutation
    // goes through the tree so indexes and parents stay consistent.
    pub fn handle(&self) -> Handle {
        self.handle
    }
    pub fn parent(&self) -> Handle {
        self.parent
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn value(&self) -> &str {
        &self.value
    }
    pub fn xref(&self) -> &str {
        &self.xref
    }
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
    pub fn record_kind(&self) -> Option<RecordKind> {
        match self.payload {
            Payload::Record(kind) => Some(kind),
            _ => None,
        }
    }
    pub fn children(&self) -> &[Handle] {
        self.children.as_ref().map_or(&[], |l| l.as_slice())
    }
    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|l| !l.is_empty())
    }
    pub fn date_value(&self) -> Option<&DateValue> {
        match &self.payload {
            Payload::Date(dv) => Some(dv),
            _ => None,
        }
    }
    pub fn name_parts(&self) -> Option<&NameParts> {
        match &self.payload {
            Payload::Name(np) => Some(np),
            _ => None,
        }
    }
    // The value as it appears on a serialized line.
    pub fn rendered_value(&self) -> String {
        match &self.payload {
            Payload::Pointer if !self.xref.is_empty() => format!("@{}@", self.xref),
            Payload::Date(dv) => dv.to_string(),
            Payload::Name(np) => np.to_string(),
            _ => self.value.clone(),
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Handle) {
        self.parent = parent;
    }
    pub(crate) fn set_xref(&mut self, xref: &str) {
        self.xref = xref.to_owned();
    }
    pub(crate) fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }
    pub(crate) fn list_mut(&mut self) -> &mut NodeList {
        let owner = self.handle;
        self.children.get_or_insert_with(|| NodeList::new(owner))
    }
    pub(crate) fn list_opt_mut(&mut self) -> Option<&mut NodeList> {
        self.children.as_mut()
    }
    pub(crate) fn drop_children(&mut self) -> Vec<Handle> {
        self.children.take().map_or_else(Vec::new, |l| l.items)
    }
    pub(crate) fn set_raw_value(&mut self, value: &str) {
        self.value = value.to_owned();
    }

    // Parses a serialized value into whatever the payload expects. Date
    // values may fail; everything else is total.
    pub(crate) fn apply_value(&mut self, value: &str) -> Result<()> {
        match &mut self.payload {
            Payload::Date(dv) => {
                *dv = DateValue::parse(value)?;
                self.value.clear();
            }
            Payload::Name(np) => {
                *np = NameParts::parse(value);
                self.value.clear();
            }
            Payload::Pointer => match pointer_target(value) {
                Some(target) => {
                    self.xref = target.to_owned();
                    self.value.clear();
                }
                None => {
                    // malformed pointer: keep the raw text so nothing is lost
                    self.xref.clear();
                    self.value = value.to_owned();
                }
            },
            _ => self.value = value.to_owned(),
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.handle)
    }
}

// ------------- NodeList -------------
// An ordered, owner-bound collection of node handles. Insertion order is
// semantically significant: it determines serialization order.
#[derive(Debug)]
pub struct NodeList {
    owner: Handle,
    items: Vec<Handle>,
}

impl NodeList {
    pub fn new(owner: Handle) -> Self {
        Self {
            owner,
            items: Vec::new(),
        }
    }
    pub fn owner(&self) -> Handle {
        self.owner
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<Handle> {
        self.items.get(index).copied()
    }
    pub fn index_of(&self, h: Handle) -> Option<usize> {
        self.items.iter().position(|&i| i == h)
    }
    pub fn as_slice(&self) -> &[Handle] {
        &self.items
    }
    pub fn push(&mut self, h: Handle) {
        self.items.push(h);
    }
    pub fn insert(&mut self, index: usize, h: Handle) {
        let index = index.min(self.items.len());
        self.items.insert(index, h);
    }
    // Removes by position. The caller decides whether the node is
    // disposed (delete) or kept alive for a transfer (extract).
    pub fn remove_at(&mut self, index: usize) -> Option<Handle> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }
    pub fn remove(&mut self, h: Handle) -> Option<usize> {
        let index = self.index_of(h)?;
        self.items.remove(index);
        Some(index)
    }
    pub fn exchange(&mut self, a: usize, b: usize) -> bool {
        if a < self.items.len() && b < self.items.len() {
            self.items.swap(a, b);
            true
        } else {
            false
        }
    }
}
