//! sonoria — constraint-driven speech and braille synthesis.
//!
//! A rule engine that walks an annotated semantic tree and produces prosody-
//! tagged output fragments, rendered as plain text, SSML-like markup, or a
//! two-dimensional braille layout. Rules are indexed under a four-axis
//! dynamic constraint (locale, modality, domain, style); lookups degrade
//! gracefully along a fixed axis order when the requested combination has no
//! rules.
//!
//! ```
//! use sonoria::{speak, SemanticTree};
//!
//! let mut tree = SemanticTree::new("fraction");
//! let children = tree.add_child(tree.root(), "children");
//! tree.add_leaf(children, "number", "1");
//! tree.add_leaf(children, "number", "2");
//! assert_eq!(speak(&tree).unwrap(), "the fraction 1 over 2");
//! ```

extern crate self as sonoria;

#[macro_use]
mod macros;
mod api;
mod constraint;
mod engine;
mod fragment;
mod grammar;
mod render;
mod rule;
mod rules;
mod tree;
mod trie;

pub use api::{context, speak, speak_with, EngineFlags, Options, OutputMode, Preference};
pub use constraint::{Axis, Comparator, DynamicConstraint, DynamicProperties};
pub use engine::{process_annotations, Evaluator, SynthesisContext};
pub use fragment::{
    Fragment, FragmentList, Personality, PersonalityKey, PersonalityValue, Span,
};
pub use grammar::{Assignment, Grammar, GrammarValue, TextFlags};
pub use render::{
    personality_markup, render, LayoutRenderer, MarkupItem, SsmlRenderer, StringRenderer,
};
pub use rule::{Action, Component, ComponentKind, Precondition, SpeechRule};
pub use rules::{builtin, RuleDef, RuleSet};
pub use tree::{NodeId, SemanticTree};
pub use trie::{AxisTree, RuleTrie};

use thiserror::Error;

/// Failures surfaced while building rule tables or evaluating selectors.
/// The top-level [`SynthesisContext::evaluate`] call never propagates these;
/// it logs and returns an empty fragment list.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// A rule table entry failed to parse.
    #[error("rule syntax error: {0}")]
    RuleSyntax(String),
    /// A structural selector or predicate was malformed.
    #[error("invalid selector: {0}")]
    Selector(String),
}

pub type Result<T> = std::result::Result<T, SynthesisError>;
