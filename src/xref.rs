// XRef remapping for merges and imports: an append-only list of
// superseded identifiers and the records that now hold their content.
// The resolver lives for one operation and is discarded afterwards.

use crate::model::Handle;
use crate::tree::Tree;

#[derive(Debug, Clone)]
pub struct XRefEntry {
    old_xref: String,
    record: Handle,
}

impl XRefEntry {
    pub fn old_xref(&self) -> &str {
        &self.old_xref
    }
    pub fn record(&self) -> Handle {
        self.record
    }
}

#[derive(Debug, Default)]
pub struct XRefResolver {
    entries: Vec<XRefEntry>,
}

impl XRefResolver {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Remembers that `old_xref` is now answered by `record`, whatever
    /// XRef the record carries at resolution time.
    pub fn add_xref(&mut self, record: Handle, old_xref: &str) {
        self.entries.push(XRefEntry {
            old_xref: old_xref.to_string(),
            record,
        });
    }

    /// The current XRef for a superseded one. Unknown references come
    /// back unchanged, so already-final pointers pass through.
    pub fn find_new_xref(&self, tree: &Tree, old_xref: &str) -> String {
        for entry in &self.entries {
            if entry.old_xref == old_xref {
                if let Some(node) = tree.node(entry.record) {
                    return node.xref().to_string();
                }
            }
        }
        old_xref.to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&XRefEntry> {
        self.entries.get(index)
    }
}
