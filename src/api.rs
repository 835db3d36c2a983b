//! Public API surface.
//!
//! The typical flow is: build a [`SemanticTree`], pick a [`Preference`] and
//! [`Options`], and call [`speak_with`] (or [`speak`] for the defaults). For
//! repeated synthesis over many trees, build a [`SynthesisContext`] once via
//! [`context`] and drive it directly.

use bitflags::bitflags;

use crate::constraint::{Axis, DynamicConstraint};
use crate::engine::SynthesisContext;
use crate::render;
use crate::rules;
use crate::tree::SemanticTree;
use crate::Result;

bitflags! {
    /// Engine feature flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EngineFlags: u8 {
        /// No fallback: nodes without a matching rule produce nothing.
        const STRICT = 1 << 0;
        /// Layout renderer emits linebreak ranks for relations/operators.
        const LINEBREAKS = 1 << 1;
        /// Cayley tables keep single separators when the corner is blank.
        const CAYLEY_SHORT = 1 << 2;
        /// Linear renderers drop leading and trailing pauses.
        const CLEAN_PAUSE = 1 << 3;
    }
}

/// Output syntax produced by [`speak_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Ssml,
    Layout,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub flags: EngineFlags,
    pub mode: OutputMode,
}

/// A requested output preference across the four constraint axes.
#[derive(Debug, Clone)]
pub struct Preference {
    pub locale: String,
    pub modality: String,
    pub domain: String,
    pub style: String,
    /// Treat the style value as colon-separated alternatives.
    pub preference: bool,
}

impl Default for Preference {
    fn default() -> Preference {
        Preference {
            locale: Axis::Locale.default_value().to_string(),
            modality: Axis::Modality.default_value().to_string(),
            domain: Axis::Domain.default_value().to_string(),
            style: Axis::Style.default_value().to_string(),
            preference: false,
        }
    }
}

impl Preference {
    pub fn braille() -> Preference {
        Preference { modality: "braille".to_string(), ..Preference::default() }
    }

    pub fn domain(domain: &str) -> Preference {
        Preference { domain: domain.to_string(), ..Preference::default() }
    }

    pub fn style(domain: &str, style: &str) -> Preference {
        Preference {
            domain: domain.to_string(),
            style: style.to_string(),
            ..Preference::default()
        }
    }

    pub(crate) fn to_constraint(&self) -> DynamicConstraint {
        let mut constraint =
            DynamicConstraint::new(&self.locale, &self.modality, &self.domain, &self.style);
        constraint.set_preference(self.preference);
        constraint
    }
}

/// A synthesis context loaded with the built-in rule tables.
pub fn context(options: Options) -> Result<SynthesisContext> {
    let mut ctx = SynthesisContext::new(options);
    for set in rules::builtin() {
        for rule in set.compile()? {
            ctx.add_rule(rule);
        }
    }
    Ok(ctx)
}

/// Synthesize the whole tree under the default preference and options.
pub fn speak(tree: &SemanticTree) -> Result<String> {
    speak_with(tree, &Preference::default(), Options::default())
}

/// Synthesize the whole tree under an explicit preference, rendering in the
/// requested output mode.
pub fn speak_with(
    tree: &SemanticTree,
    preference: &Preference,
    options: Options,
) -> Result<String> {
    let mode = options.mode;
    let flags = options.flags;
    let mut ctx = context(options)?;
    ctx.set_constraint(preference.to_constraint());
    let descrs = ctx.evaluate(tree, tree.root());
    Ok(render::render(&descrs, mode, flags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fraction_tree(num: &str, den: &str) -> SemanticTree {
        let mut tree = SemanticTree::new("fraction");
        let children = tree.add_child(tree.root(), "children");
        tree.add_leaf(children, "number", num);
        tree.add_leaf(children, "number", den);
        tree
    }

    #[test]
    fn speak_uses_default_preference() {
        let tree = fraction_tree("1", "2");
        assert_eq!(speak(&tree).unwrap(), "the fraction 1 over 2");
    }

    #[test]
    fn clearmath_domain_changes_wording() {
        let tree = fraction_tree("1", "2");
        let out = speak_with(&tree, &Preference::domain("clearmath"), Options::default()).unwrap();
        assert_eq!(out, "1 divided by 2");
    }

    #[test]
    fn unknown_node_falls_back_to_its_text() {
        let mut tree = SemanticTree::new("unknown");
        tree.set_text(tree.root(), "x");
        assert_eq!(speak(&tree).unwrap(), "x");
    }

    #[test]
    fn strict_mode_silences_unknown_nodes() {
        let mut tree = SemanticTree::new("unknown");
        tree.set_text(tree.root(), "x");
        let options = Options { flags: EngineFlags::STRICT, ..Options::default() };
        let out = speak_with(&tree, &Preference::default(), options).unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn braille_fraction_renders_layout() {
        let tree = fraction_tree("⠂", "⠆");
        let options = Options { mode: OutputMode::Layout, ..Options::default() };
        let out = speak_with(&tree, &Preference::braille(), options).unwrap();
        assert_eq!(out, "⠀⠼⠂⠀\n⠹⠒⠒⠼\n⠀⠼⠆⠀");
    }
}
