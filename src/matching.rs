// Pairwise record matching for deduplication workflows. Everything here
// is a pure read-only query over already-built trees; scores are
// percentages in [0, 100].

use serde::Deserialize;

use crate::dates::DateValue;
use crate::model::Handle;
use crate::records::{NameParts, RecordKind};
use crate::tree::Tree;

// ------------- MatchParams -------------

/// Tuning knobs for a matching run, usually read from configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Minimum string similarity for a name field to count as matching.
    pub names_indistinct_threshold: f32,
    /// Enables year-tolerance date comparison.
    pub dates_check: bool,
    /// Maximum year delta still considered the same date.
    pub years_inaccuracy: i32,
    /// Requires place equality when matching events.
    pub check_event_places: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        MatchParams {
            names_indistinct_threshold: 0.9,
            dates_check: true,
            years_inaccuracy: 3,
            check_event_places: false,
        }
    }
}

// ------------- string similarity -------------

/// Longest-common-substring similarity over lowercased strings: the
/// longest shared run is counted, then both flanks are scored the same
/// way, giving 2*common/(len_a+len_b) in [0, 1].
pub fn similarity(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common = common_run(&a, &b);
    2.0 * common as f32 / (a.len() + b.len()) as f32
}

fn common_run(a: &[char], b: &[char]) -> usize {
    let (len, a_pos, b_pos) = longest_common(a, b);
    if len == 0 {
        return 0;
    }
    len + common_run(&a[..a_pos], &b[..b_pos]) + common_run(&a[a_pos + len..], &b[b_pos + len..])
}

fn longest_common(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut run = 0;
            while i + run < a.len() && j + run < b.len() && a[i + run] == b[j + run] {
                run += 1;
            }
            if run > best.0 {
                best = (run, i, j);
            }
        }
    }
    best
}

// ------------- field matchers -------------

/// Scores two personal names component-wise: surname and given part
/// each count once when either side has them, and the mean of matched
/// components is the score. A counted surname that fails the threshold
/// quarters the result.
pub fn name_match(a: &NameParts, b: &NameParts, params: &MatchParams) -> f32 {
    let exact = params.names_indistinct_threshold >= 0.99;
    let component_hit = |x: &str, y: &str| {
        if exact {
            x.to_lowercase() == y.to_lowercase()
        } else {
            similarity(x, y) >= params.names_indistinct_threshold
        }
    };
    let mut parts = 0u32;
    let mut matched = 0u32;
    let mut surname_ok = true;
    if !(a.surname().is_empty() && b.surname().is_empty()) {
        parts += 1;
        if component_hit(a.surname(), b.surname()) {
            matched += 1;
        } else {
            surname_ok = false;
        }
    }
    if !(a.first_part().is_empty() && b.first_part().is_empty()) {
        parts += 1;
        if component_hit(a.first_part(), b.first_part()) {
            matched += 1;
        }
    }
    if parts == 0 {
        return 0.0;
    }
    let mut score = 100.0 * matched as f32 / parts as f32;
    if !surname_ok {
        score *= 0.25;
    }
    score
}

/// Percentage match of two date values: the same resolved day is 100;
/// with date checking enabled, a year delta within the tolerance is
/// also 100; anything else is 0. Empty dates never match.
pub fn date_match(a: &DateValue, b: &DateValue, params: &MatchParams) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let udn_a = a.udn();
    let udn_b = b.udn();
    if udn_a == udn_b {
        return 100.0;
    }
    if params.dates_check {
        let delta = (udn_a.gregorian_year() - udn_b.gregorian_year()).abs();
        if delta <= params.years_inaccuracy {
            return 100.0;
        }
    }
    0.0
}

/// Matches two events by date and, when enabled, by exact place
/// equality; the enabled fields average into the score.
pub fn event_match(
    tree_a: &Tree,
    event_a: Handle,
    tree_b: &Tree,
    event_b: Handle,
    params: &MatchParams,
) -> f32 {
    let date_score = match (event_date(tree_a, event_a), event_date(tree_b, event_b)) {
        (Some(a), Some(b)) => date_match(a, b, params),
        _ => 0.0,
    };
    if !params.check_event_places {
        return date_score;
    }
    let place_a = tree_a.tag_value(event_a, "PLAC");
    let place_b = tree_b.tag_value(event_b, "PLAC");
    let place_score = if place_a == place_b { 100.0 } else { 0.0 };
    (date_score + place_score) / 2.0
}

fn event_date<'a>(tree: &'a Tree, event: Handle) -> Option<&'a DateValue> {
    let date = tree.find_tag(event, "DATE")?;
    tree.node(date)?.date_value()
}

// ------------- record matchers -------------

/// The matching entry point over whole records. Records of different
/// kinds, or handles that are not records, never match.
pub fn record_match(
    tree_a: &Tree,
    a: Handle,
    tree_b: &Tree,
    b: Handle,
    params: &MatchParams,
) -> f32 {
    let kind_a = tree_a.node(a).and_then(|n| n.record_kind());
    let kind_b = tree_b.node(b).and_then(|n| n.record_kind());
    let (Some(kind_a), Some(kind_b)) = (kind_a, kind_b) else {
        return 0.0;
    };
    if kind_a != kind_b {
        return 0.0;
    }
    match kind_a {
        RecordKind::Individual => individual_match(tree_a, a, tree_b, b, params),
        RecordKind::Family => family_match(tree_a, a, tree_b, b),
        RecordKind::Note => note_match(tree_a, a, tree_b, b),
        RecordKind::Source => source_match(tree_a, a, tree_b, b),
        _ => 0.0,
    }
}

// Sex gates the comparison, and a missed name ends it without looking
// at dates. On a name hit with date checking on, the birth dates
// average in; births absent on both sides count as agreeing.
fn individual_match(tree_a: &Tree, a: Handle, tree_b: &Tree, b: Handle, params: &MatchParams) -> f32 {
    if tree_a.tag_value(a, "SEX") != tree_b.tag_value(b, "SEX") {
        return 0.0;
    }
    let name_a = full_name(tree_a, a);
    let name_b = full_name(tree_b, b);
    if name_a.is_empty() || name_b.is_empty() {
        return 0.0;
    }
    let names_hit = if params.names_indistinct_threshold >= 0.99 {
        name_a.to_lowercase() == name_b.to_lowercase()
    } else {
        similarity(&name_a, &name_b) >= params.names_indistinct_threshold
    };
    if !names_hit {
        return 0.0;
    }
    if !params.dates_check {
        return 100.0;
    }
    let birth_score = match (birth_date(tree_a, a), birth_date(tree_b, b)) {
        (Some(da), Some(db)) => date_match(da, db, params),
        (None, None) => 100.0,
        _ => 0.0,
    };
    (100.0 + birth_score) / 2.0
}

fn full_name(tree: &Tree, individual: Handle) -> String {
    tree.find_tag(individual, "NAME")
        .and_then(|handle| tree.node(handle))
        .and_then(|node| node.name_parts())
        .map(|parts| parts.full_name())
        .unwrap_or_default()
}

fn birth_date<'a>(tree: &'a Tree, individual: Handle) -> Option<&'a DateValue> {
    let birth = tree.find_tag(individual, "BIRT")?;
    event_date(tree, birth)
}

// Families compare as their "husband - wife" name string.
fn family_match(tree_a: &Tree, a: Handle, tree_b: &Tree, b: Handle) -> f32 {
    let title_a = family_string(tree_a, a);
    let title_b = family_string(tree_b, b);
    if title_a.to_lowercase() == title_b.to_lowercase() {
        100.0
    } else {
        0.0
    }
}

fn family_string(tree: &Tree, family: Handle) -> String {
    format!(
        "{} - {}",
        spouse_name(tree, family, "HUSB"),
        spouse_name(tree, family, "WIFE")
    )
}

fn spouse_name(tree: &Tree, family: Handle, role: &str) -> String {
    tree.find_tag(family, role)
        .and_then(|handle| tree.node(handle))
        .map(|node| node.xref().to_string())
        .and_then(|xref| tree.find_xref(&xref))
        .map(|record| full_name(tree, record))
        .unwrap_or_default()
}

fn note_match(tree_a: &Tree, a: Handle, tree_b: &Tree, b: Handle) -> f32 {
    let text_a = tree_a.node(a).map(|n| n.value().to_string()).unwrap_or_default();
    let text_b = tree_b.node(b).map(|n| n.value().to_string()).unwrap_or_default();
    if text_a.to_lowercase() == text_b.to_lowercase() {
        100.0
    } else {
        0.0
    }
}

// Sources compare by their short title (ABBR) alone.
fn source_match(tree_a: &Tree, a: Handle, tree_b: &Tree, b: Handle) -> f32 {
    let abbr_a = tree_a.tag_value(a, "ABBR");
    let abbr_b = tree_b.tag_value(b, "ABBR");
    if abbr_a.to_lowercase() == abbr_b.to_lowercase() {
        100.0
    } else {
        0.0
    }
}

// ------------- deduplication scan -------------

/// Scores every unordered pair of records of one kind and returns those
/// at or above the floor, reporting percent progress between outer
/// iterations.
pub fn find_duplicates<F>(
    tree: &Tree,
    kind: RecordKind,
    params: &MatchParams,
    floor: f32,
    mut progress: F,
) -> Vec<(Handle, Handle, f32)>
where
    F: FnMut(usize),
{
    let candidates = tree.records_by_kind(kind);
    let total = candidates.len();
    let mut out = Vec::new();
    let mut last_percent = 0;
    for (index, &a) in candidates.iter().enumerate() {
        for &b in candidates.iter().skip(index + 1) {
            let score = record_match(tree, a, tree, b, params);
            if score >= floor {
                out.push((a, b, score));
            }
        }
        if total > 0 {
            let percent = (index + 1) * 100 / total;
            if percent != last_percent {
                progress(percent);
                last_percent = percent;
            }
        }
    }
    out
}
