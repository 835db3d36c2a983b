//! Context functions for multi-node components.
//!
//! A `[m]` component may name a context function (`ctxtFunc`) producing a
//! per-item context prefix and a separator function (`sepFunc`) producing the
//! fragments emitted between items. The classic implementation passes
//! closures around; here each archetype is a closed enum variant carrying its
//! own iteration state, and the separator archetypes that need to synthesize
//! take the engine by mutable reference at each step. An unknown function
//! name logs a warning and falls back to the plain context or separator.

use std::collections::{BTreeMap, VecDeque};

use crate::fragment::{Fragment, PersonalityKey, PersonalityValue};
use crate::grammar::TextFlags;
use crate::tree::{NodeId, SemanticTree};
use crate::Result;

use super::synthesis::SynthesisContext;

/// Per-item context prefix generator for `[m]` components.
pub(super) enum ContextState {
    /// A constant prefix (the plain `context` attribute).
    Fixed(String),
    /// `CTXFnodeCounter`: "base 1", "base 2", ... saturating at the item count.
    Counter { base: String, count: usize, len: usize },
}

impl ContextState {
    pub(super) fn new(func: Option<&str>, context: String, len: usize) -> ContextState {
        match func {
            None => ContextState::Fixed(context),
            Some("CTXFnodeCounter") => ContextState::Counter { base: context, count: 0, len },
            Some(other) => {
                tracing::warn!(func = other, "unknown context function, using plain context");
                ContextState::Fixed(context)
            }
        }
    }

    pub(super) fn next(&mut self) -> String {
        match self {
            ContextState::Fixed(base) => base.clone(),
            ContextState::Counter { base, count, len } => {
                if *count < *len {
                    *count += 1;
                }
                if base.is_empty() {
                    count.to_string()
                } else {
                    format!("{base} {count}")
                }
            }
        }
    }
}

/// Between-item separator generator for `[m]` components.
pub(super) enum SeparatorState {
    /// The plain `separator` attribute, emitted as translated text.
    Text(String),
    /// `CTXFpauseSeparator`: an empty fragment carrying a pause.
    Pause(PersonalityValue),
    /// `CTXFcontentIterator`: pulls the enclosing node's content children
    /// one at a time and synthesizes each in turn, prefixed by the separator
    /// string when one is given.
    Content { queue: VecDeque<NodeId>, prefix: String },
}

impl SeparatorState {
    pub(super) fn new(
        func: Option<&str>,
        tree: &SemanticTree,
        nodes: &[NodeId],
        separator: String,
    ) -> Result<SeparatorState> {
        match func {
            None => Ok(SeparatorState::Text(separator)),
            Some("CTXFpauseSeparator") => {
                Ok(SeparatorState::Pause(PersonalityValue::parse(&separator)))
            }
            Some("CTXFcontentIterator") => {
                let queue = match nodes.first() {
                    Some(&first) => tree.select(first, "../../content/*")?.into(),
                    None => VecDeque::new(),
                };
                Ok(SeparatorState::Content { queue, prefix: separator })
            }
            Some(other) => {
                tracing::warn!(func = other, "unknown separator function, using plain separator");
                Ok(SeparatorState::Text(separator))
            }
        }
    }

    pub(super) fn next(
        &mut self,
        engine: &mut SynthesisContext,
        tree: &SemanticTree,
    ) -> Result<Vec<Fragment>> {
        match self {
            SeparatorState::Text(separator) => {
                if separator.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![Fragment::create(
                    separator.clone(),
                    BTreeMap::new(),
                    TextFlags::translate(),
                    &mut engine.grammar,
                )])
            }
            SeparatorState::Pause(value) => {
                let mut descr = Fragment::default();
                descr.personality.set(PersonalityKey::Pause, value.clone());
                Ok(vec![descr])
            }
            SeparatorState::Content { queue, prefix } => {
                let mut descrs = Vec::new();
                if !prefix.is_empty() {
                    descrs.push(Fragment::create(
                        prefix.clone(),
                        BTreeMap::new(),
                        TextFlags::translate(),
                        &mut engine.grammar,
                    ));
                }
                if let Some(content) = queue.pop_front() {
                    descrs.extend(engine.evaluate_tree(tree, content)?);
                }
                Ok(descrs)
            }
        }
    }
}
