// The tag registry: a process-wide mapping from tag name to payload
// constructor. Specialized tags register themselves once; lookup during
// parsing is a plain map hit, and unregistered names fall back to a
// generic payload so unknown extension tags still nest children.

use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::model::{pointer_target, IndexHasher, Payload};
use crate::records::NameParts;

/// Builds the payload shape for a tag from its name and raw value. The
/// value is passed so that shape-dependent tags can pick pointer or
/// inline form; filling the payload happens afterwards through
/// [`crate::model::Node::apply_value`].
pub type Constructor = Box<dyn Fn(&str, &str) -> Payload + Send + Sync>;

pub struct TagRegistry {
    kept: HashMap<String, Constructor, IndexHasher>,
}

impl TagRegistry {
    fn new() -> Self {
        Self {
            kept: HashMap::default(),
        }
    }

    /// Registers a constructor for a tag name. Re-registration replaces
    /// the previous entry.
    pub fn register(&mut self, tag: &str, constructor: Constructor) {
        self.kept.insert(tag.to_string(), constructor);
    }

    pub fn create(&self, tag: &str, value: &str) -> Payload {
        match self.kept.get(tag) {
            Some(constructor) => constructor(tag, value),
            None => Payload::Plain,
        }
    }

    fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("DATE", Box::new(|_, _| Payload::Date(Default::default())));
        registry.register("NAME", Box::new(|_, _| Payload::Name(NameParts::default())));
        // Tags whose value is always a cross-reference.
        for tag in [
            "FAMC", "FAMS", "HUSB", "WIFE", "CHIL", "ALIA", "ASSO", "ANCI", "DESI", "SUBM",
        ] {
            registry.register(tag, Box::new(|_, _| Payload::Pointer));
        }
        // Tags that are a pointer when the value is one, otherwise an
        // inline text node (notes and sources can be embedded).
        for tag in ["NOTE", "OBJE", "SOUR", "REPO"] {
            registry.register(
                tag,
                Box::new(|_, value| {
                    if pointer_target(value).is_some() {
                        Payload::Pointer
                    } else {
                        Payload::Plain
                    }
                }),
            );
        }
        registry
    }
}

lazy_static! {
    static ref REGISTRY: Mutex<TagRegistry> = Mutex::new(TagRegistry::standard());
}

/// Registers a constructor in the process-wide registry, replacing any
/// previous one for the same tag.
pub fn register(tag: &str, constructor: Constructor) {
    REGISTRY.lock().unwrap().register(tag, constructor);
}

/// Looks up the payload for a tag name, falling back to a plain payload
/// for unregistered names.
pub fn create_payload(tag: &str, value: &str) -> Payload {
    REGISTRY.lock().unwrap().create(tag, value)
}
