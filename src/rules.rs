//! Built-in rule tables.
//!
//! Tables are declared with the `rule_set!` macro, one set per
//! `(locale, modality, domain)` triple, and compiled into [`SpeechRule`]s at
//! context construction. Declaration order inside a set becomes the rank
//! used for tie-breaking, so later rules shadow earlier ones on otherwise
//! equal footing.

#[path = "rules/braille.rs"]
mod braille;
#[path = "rules/speech.rs"]
mod speech;

use crate::constraint::DynamicConstraint;
use crate::rule::{Action, Precondition, SpeechRule};
use crate::Result;

/// One rule declaration inside a [`RuleSet`].
pub struct RuleDef {
    pub name: &'static str,
    /// The fourth constraint axis; `"default"` unless declared.
    pub style: &'static str,
    pub query: &'static str,
    pub cstr: &'static [&'static str],
    pub action: &'static str,
}

/// A rule table for one `(locale, modality, domain)` triple.
pub struct RuleSet {
    pub locale: &'static str,
    pub modality: &'static str,
    pub domain: &'static str,
    pub defs: Vec<RuleDef>,
}

impl RuleSet {
    /// Parse every declaration into a [`SpeechRule`], ranking by
    /// declaration order.
    pub fn compile(&self) -> Result<Vec<SpeechRule>> {
        let mut rules = Vec::with_capacity(self.defs.len());
        for (rank, def) in self.defs.iter().enumerate() {
            let constraint =
                DynamicConstraint::new(self.locale, self.modality, self.domain, def.style);
            let mut precondition =
                Precondition::new(def.query, def.cstr.iter().map(|s| s.to_string()).collect());
            precondition.rank = rank;
            rules.push(SpeechRule {
                name: def.name.to_string(),
                constraint,
                precondition,
                action: Action::from_string(def.action)?,
            });
        }
        Ok(rules)
    }
}

/// All built-in rule tables.
pub fn builtin() -> Vec<RuleSet> {
    vec![speech::default_rules(), speech::clearmath_rules(), braille::default_rules()]
}
