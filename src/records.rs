// Record-level vocabulary: the closed set of top-level record kinds, the
// capability set saying which auxiliary links a kind may carry, personal
// name pieces, event tag classification and the UID scheme.

use std::fmt;

use uuid::Uuid;

// ------------- RecordKind -------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Individual,
    Family,
    Note,
    Multimedia,
    Source,
    Repository,
    Group,
    Research,
    Task,
    Communication,
    Location,
    Submission,
    Submitter,
}

pub const RECORD_KINDS: [RecordKind; 13] = [
    RecordKind::Individual,
    RecordKind::Family,
    RecordKind::Note,
    RecordKind::Multimedia,
    RecordKind::Source,
    RecordKind::Repository,
    RecordKind::Group,
    RecordKind::Research,
    RecordKind::Task,
    RecordKind::Communication,
    RecordKind::Location,
    RecordKind::Submission,
    RecordKind::Submitter,
];

impl RecordKind {
    pub fn tag(&self) -> &'static str {
        match self {
            RecordKind::Individual => "INDI",
            RecordKind::Family => "FAM",
            RecordKind::Note => "NOTE",
            RecordKind::Multimedia => "OBJE",
            RecordKind::Source => "SOUR",
            RecordKind::Repository => "REPO",
            RecordKind::Group => "_GROUP",
            RecordKind::Research => "_RESEARCH",
            RecordKind::Task => "_TASK",
            RecordKind::Communication => "_COMM",
            RecordKind::Location => "_LOC",
            RecordKind::Submission => "SUBN",
            RecordKind::Submitter => "SUBM",
        }
    }

    pub fn from_tag(tag: &str) -> Option<RecordKind> {
        RECORD_KINDS.iter().copied().find(|kind| kind.tag() == tag)
    }

    // Prefix used when the tree mints a fresh XRef for this kind.
    pub fn xref_sign(&self) -> &'static str {
        match self {
            RecordKind::Individual => "I",
            RecordKind::Family => "F",
            RecordKind::Note => "N",
            RecordKind::Multimedia => "O",
            RecordKind::Source => "S",
            RecordKind::Repository => "R",
            RecordKind::Group => "G",
            RecordKind::Research => "RS",
            RecordKind::Task => "TK",
            RecordKind::Communication => "CM",
            RecordKind::Location => "L",
            RecordKind::Submission => "SN",
            RecordKind::Submitter => "SB",
        }
    }

    // Capability set: which link structures a record kind may carry.
    // Nodes are arena slots rather than per-kind types, so capabilities
    // are kind predicates consulted before attaching a link.
    pub fn has_notes(&self) -> bool {
        !matches!(self, RecordKind::Note)
    }

    pub fn has_source_citations(&self) -> bool {
        matches!(
            self,
            RecordKind::Individual | RecordKind::Family | RecordKind::Note | RecordKind::Multimedia
        )
    }

    pub fn has_multimedia_links(&self) -> bool {
        matches!(
            self,
            RecordKind::Individual
                | RecordKind::Family
                | RecordKind::Source
                | RecordKind::Group
                | RecordKind::Location
                | RecordKind::Submitter
        )
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ------------- personal name pieces -------------

/// The pieces of a personal name value, `first /surname/ last`.
/// The slashes delimit the surname; anything before them is the given
/// name part, anything after is a suffix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameParts {
    first_part: String,
    surname: String,
    last_part: String,
}

impl NameParts {
    pub fn new(first_part: &str, surname: &str, last_part: &str) -> Self {
        Self {
            first_part: first_part.to_string(),
            surname: surname.to_string(),
            last_part: last_part.to_string(),
        }
    }

    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let Some(open) = text.find('/') else {
            return Self {
                first_part: text.to_string(),
                ..Self::default()
            };
        };
        let first_part = text[..open].trim_end().to_string();
        let rest = &text[open + 1..];
        match rest.find('/') {
            None => Self {
                first_part,
                surname: rest.trim().to_string(),
                last_part: String::new(),
            },
            Some(close) => Self {
                first_part,
                surname: rest[..close].to_string(),
                last_part: rest[close + 1..].trim_start().to_string(),
            },
        }
    }

    pub fn first_part(&self) -> &str {
        &self.first_part
    }
    pub fn surname(&self) -> &str {
        &self.surname
    }
    pub fn last_part(&self) -> &str {
        &self.last_part
    }

    pub fn is_empty(&self) -> bool {
        self.first_part.is_empty() && self.surname.is_empty() && self.last_part.is_empty()
    }

    /// The name without surname delimiters, for display and whole-name
    /// comparison.
    pub fn full_name(&self) -> String {
        let mut out = String::new();
        for part in [&self.first_part, &self.surname, &self.last_part] {
            if part.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(part);
        }
        out
    }
}

impl fmt::Display for NameParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = self.first_part.clone();
        if !self.surname.is_empty() || !self.last_part.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push('/');
            out.push_str(&self.surname);
            out.push('/');
            if !self.last_part.is_empty() {
                out.push(' ');
                out.push_str(&self.last_part);
            }
        }
        f.write_str(&out)
    }
}

// ------------- event vocabulary -------------

pub const INDIVIDUAL_EVENTS: [&str; 23] = [
    "ADOP", "BAPM", "BARM", "BASM", "BIRT", "BLES", "BURI", "CENS", "CHR", "CHRA", "CONF",
    "CREM", "DEAT", "EMIG", "EVEN", "FCOM", "GRAD", "IMMI", "NATU", "ORDN", "PROB", "RETI",
    "WILL",
];

pub const INDIVIDUAL_ATTRIBUTES: [&str; 13] = [
    "CAST", "DSCR", "EDUC", "FACT", "IDNO", "NATI", "NMR", "OCCU", "PROP", "RELI", "RESI",
    "SSN", "TITL",
];

pub const FAMILY_EVENTS: [&str; 12] = [
    "ANUL", "CENS", "DIV", "DIVF", "ENGA", "EVEN", "MARB", "MARC", "MARL", "MARR", "MARS",
    "RESI",
];

pub fn is_individual_event(tag: &str) -> bool {
    INDIVIDUAL_EVENTS.contains(&tag) || INDIVIDUAL_ATTRIBUTES.contains(&tag)
}

pub fn is_family_event(tag: &str) -> bool {
    FAMILY_EVENTS.contains(&tag)
}

// ------------- UID scheme -------------

/// A fresh record UID: sixteen random bytes followed by two running
/// checksum bytes, all upper-case hex. Unlike XRefs, which renumber on
/// import, a UID identifies the same record across files.
pub fn create_uid() -> String {
    let bytes = *Uuid::new_v4().as_bytes();
    let mut check_a: u8 = 0;
    let mut check_b: u8 = 0;
    let mut out = String::with_capacity(2 * bytes.len() + 4);
    for b in bytes {
        check_a = check_a.wrapping_add(b);
        check_b = check_b.wrapping_add(check_a);
        push_hex(&mut out, b);
    }
    push_hex(&mut out, check_a);
    push_hex(&mut out, check_b);
    out
}

fn push_hex(out: &mut String, byte: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push(HEX[(byte >> 4) as usize] as char);
    out.push(HEX[(byte & 0x0f) as usize] as char);
}
