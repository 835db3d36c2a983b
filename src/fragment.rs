//! Fragment model.
//!
//! A [`Fragment`] is the atomic unit of synthesized output: a piece of text
//! plus its context, annotation, external attributes and prosodic
//! personality. The synthesis engine produces an ordered fragment list; the
//! rendering back-ends fold that list into a final string or layout.
//!
//! [`FragmentList`] is the arena-backed doubly-linked list used by
//! post-processing passes that need O(1) neighbor queries (for example the
//! punctuation fix-up, which looks backward for the nearest text-bearing
//! fragment). Index 0 is a reserved sentinel; `prev`/`next` are plain
//! indices into the arena, so there is no aliasing between nodes.

use std::collections::BTreeMap;

use crate::grammar::{Grammar, TextFlags};

/// Prosodic personality keys attached to fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PersonalityKey {
    Pitch,
    Rate,
    Volume,
    Pause,
    Join,
    Layout,
}

impl PersonalityKey {
    /// All keys, in the order they are scanned off component attributes.
    pub const ALL: [PersonalityKey; 6] = [
        PersonalityKey::Pitch,
        PersonalityKey::Rate,
        PersonalityKey::Volume,
        PersonalityKey::Pause,
        PersonalityKey::Join,
        PersonalityKey::Layout,
    ];

    /// The keys that accumulate additively across nested rules.
    pub const NUMERIC: [PersonalityKey; 3] =
        [PersonalityKey::Pitch, PersonalityKey::Rate, PersonalityKey::Volume];

    pub fn name(&self) -> &'static str {
        match self {
            PersonalityKey::Pitch => "pitch",
            PersonalityKey::Rate => "rate",
            PersonalityKey::Volume => "volume",
            PersonalityKey::Pause => "pause",
            PersonalityKey::Join => "join",
            PersonalityKey::Layout => "layout",
        }
    }

    pub fn from_name(name: &str) -> Option<PersonalityKey> {
        PersonalityKey::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// A personality value is either numeric (relative prosody offsets) or an
/// opaque string (named pauses, join separators).
#[derive(Debug, Clone, PartialEq)]
pub enum PersonalityValue {
    Num(f64),
    Str(String),
}

impl PersonalityValue {
    /// Parse a raw attribute value: a float if it parses, otherwise the
    /// string with surrounding double quotes stripped.
    pub fn parse(raw: &str) -> PersonalityValue {
        match raw.parse::<f64>() {
            Ok(n) => PersonalityValue::Num(n),
            Err(_) => {
                let s = if raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2 {
                    raw[1..raw.len() - 1].to_string()
                } else {
                    raw.to_string()
                };
                PersonalityValue::Str(s)
            }
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            PersonalityValue::Num(n) => Some(*n),
            PersonalityValue::Str(_) => None,
        }
    }
}

impl std::fmt::Display for PersonalityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersonalityValue::Num(n) => write!(f, "{}", n),
            PersonalityValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// The personality map of a fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Personality(BTreeMap<PersonalityKey, PersonalityValue>);

impl Personality {
    pub fn new() -> Personality {
        Personality::default()
    }

    pub fn get(&self, key: PersonalityKey) -> Option<&PersonalityValue> {
        self.0.get(&key)
    }

    pub fn set(&mut self, key: PersonalityKey, value: PersonalityValue) {
        self.0.insert(key, value);
    }

    pub fn remove(&mut self, key: PersonalityKey) -> Option<PersonalityValue> {
        self.0.remove(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonalityKey, &PersonalityValue)> {
        self.0.iter()
    }

    /// Merge `other` into this personality. Numeric values accumulate
    /// additively; existing non-numeric values win; absent keys are set.
    pub fn add_relative(&mut self, other: &Personality) {
        for (key, val) in other.iter() {
            match (self.0.get(key), val) {
                (Some(PersonalityValue::Num(mine)), PersonalityValue::Num(theirs)) => {
                    let sum = mine + theirs;
                    self.0.insert(*key, PersonalityValue::Num(sum));
                }
                (Some(_), _) => {}
                (None, _) => {
                    self.0.insert(*key, val.clone());
                }
            }
        }
    }
}

/// The minimal transport unit merged by renderers before final assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Span {
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

impl Span {
    pub fn empty() -> Span {
        Span::default()
    }

    pub fn text(text: impl Into<String>) -> Span {
        Span { text: text.into(), attributes: BTreeMap::new() }
    }

    pub fn with_attrs(text: impl Into<String>, attributes: BTreeMap<String, String>) -> Span {
        Span { text: text.into(), attributes }
    }
}

/// One unit of synthesized output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Leading context (e.g. "item 2") prefixed by multi-node iteration.
    pub context: String,
    /// The spoken or brailled text.
    pub text: String,
    /// Semantic annotation ("punctuation", "number", ...).
    pub annotation: String,
    /// External attributes copied from the source node (id, ext*).
    pub attributes: BTreeMap<String, String>,
    /// Prosodic metadata.
    pub personality: Personality,
    /// Layout tag for the two-dimensional renderer (begin/end markers).
    pub layout: String,
}

impl Fragment {
    pub fn text_only(text: impl Into<String>) -> Fragment {
        Fragment { text: text.into(), ..Fragment::default() }
    }

    pub fn layout_marker(layout: impl Into<String>) -> Fragment {
        Fragment { layout: layout.into(), ..Fragment::default() }
    }

    /// Create a fragment whose text is run through the grammar's
    /// translate/correct pipeline first.
    pub fn create(
        text: impl Into<String>,
        attributes: BTreeMap<String, String>,
        flags: TextFlags,
        grammar: &mut Grammar,
    ) -> Fragment {
        let text = grammar.apply(&text.into(), flags);
        Fragment { text, attributes, ..Fragment::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.text.is_empty() && self.annotation.is_empty()
    }

    /// Context and text joined for rendering.
    pub fn description_string(&self) -> String {
        if !self.context.is_empty() && !self.text.is_empty() {
            format!("{} {}", self.context, self.text)
        } else if !self.context.is_empty() {
            self.context.clone()
        } else {
            self.text.clone()
        }
    }

    pub fn description_span(&self) -> Span {
        Span::with_attrs(self.description_string(), self.attributes.clone())
    }
}

struct Item {
    data: Fragment,
    prev: usize,
    next: usize,
}

/// Arena-backed circular doubly-linked fragment list. Index 0 is the anchor
/// sentinel; it never carries data.
pub struct FragmentList {
    items: Vec<Item>,
}

impl FragmentList {
    pub fn new() -> FragmentList {
        FragmentList { items: vec![Item { data: Fragment::default(), prev: 0, next: 0 }] }
    }

    pub fn from_vec(descrs: Vec<Fragment>) -> FragmentList {
        let mut list = FragmentList::new();
        for descr in descrs {
            list.push(descr);
        }
        list
    }

    /// Append at the tail. Returns the new item's index.
    pub fn push(&mut self, descr: Fragment) -> usize {
        let idx = self.items.len();
        let tail = self.items[0].prev;
        self.items.push(Item { data: descr, prev: tail, next: 0 });
        self.items[tail].next = idx;
        self.items[0].prev = idx;
        idx
    }

    pub fn get(&self, idx: usize) -> &Fragment {
        &self.items[idx].data
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Fragment {
        &mut self.items[idx].data
    }

    pub fn is_empty(&self) -> bool {
        self.items[0].next == 0
    }

    /// Indices in list order, skipping the sentinel.
    pub fn indices(&self) -> Vec<usize> {
        let mut result = Vec::new();
        let mut cur = self.items[0].next;
        while cur != 0 {
            result.push(cur);
            cur = self.items[cur].next;
        }
        result
    }

    /// Nearest previous item with non-empty text, or None if only the
    /// sentinel precedes.
    pub fn prev_text(&self, idx: usize) -> Option<usize> {
        let mut cur = self.items[idx].prev;
        while cur != 0 && self.items[cur].data.text.is_empty() {
            cur = self.items[cur].prev;
        }
        if cur == 0 { None } else { Some(cur) }
    }

    /// Indices of items carrying a non-empty annotation, in list order.
    pub fn annotations(&self) -> Vec<usize> {
        self.indices().into_iter().filter(|&i| !self.items[i].data.annotation.is_empty()).collect()
    }

    pub fn into_vec(self) -> Vec<Fragment> {
        let order = self.indices();
        let mut slots: Vec<Option<Fragment>> =
            self.items.into_iter().map(|item| Some(item.data)).collect();
        order.into_iter().map(|i| slots[i].take().expect("list order is duplicate-free")).collect()
    }
}

impl Default for FragmentList {
    fn default() -> Self {
        FragmentList::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personality_adds_numeric_values() {
        let mut a = Personality::new();
        a.set(PersonalityKey::Pitch, PersonalityValue::Num(5.0));
        let mut b = Personality::new();
        b.set(PersonalityKey::Pitch, PersonalityValue::Num(5.0));
        b.set(PersonalityKey::Rate, PersonalityValue::Num(-10.0));
        a.add_relative(&b);
        assert_eq!(a.get(PersonalityKey::Pitch), Some(&PersonalityValue::Num(10.0)));
        assert_eq!(a.get(PersonalityKey::Rate), Some(&PersonalityValue::Num(-10.0)));
    }

    #[test]
    fn personality_keeps_existing_strings() {
        let mut a = Personality::new();
        a.set(PersonalityKey::Pause, PersonalityValue::Str("long".into()));
        let mut b = Personality::new();
        b.set(PersonalityKey::Pause, PersonalityValue::Str("short".into()));
        a.add_relative(&b);
        assert_eq!(a.get(PersonalityKey::Pause), Some(&PersonalityValue::Str("long".into())));
    }

    #[test]
    fn value_parsing_strips_quotes() {
        assert_eq!(PersonalityValue::parse("200"), PersonalityValue::Num(200.0));
        assert_eq!(PersonalityValue::parse("\"long\""), PersonalityValue::Str("long".into()));
        assert_eq!(PersonalityValue::parse("long"), PersonalityValue::Str("long".into()));
    }

    #[test]
    fn prev_text_skips_empty_fragments() {
        let mut list = FragmentList::new();
        let a = list.push(Fragment::text_only("x"));
        list.push(Fragment::default());
        let c = list.push(Fragment::text_only("y"));
        assert_eq!(list.prev_text(c), Some(a));
        assert_eq!(list.prev_text(a), None);
    }

    #[test]
    fn list_round_trips_in_order() {
        let descrs =
            vec![Fragment::text_only("a"), Fragment::text_only("b"), Fragment::text_only("c")];
        let list = FragmentList::from_vec(descrs.clone());
        assert_eq!(list.into_vec(), descrs);
    }

}
