//! Rule and action model.
//!
//! A [`SpeechRule`] couples a dynamic constraint (where it applies), a
//! [`Precondition`] (when it applies) and an [`Action`] (what it emits). The
//! action grammar is textual and parsed once when a rule table is loaded:
//!
//! ```text
//! [t] "fraction"; [n] children/*[1] (pitch:0.3); [p] (pause:"short")
//! ```
//!
//! Components are `;`-separated. Each starts with a kind tag — `[n]` node,
//! `[m]` multi-node, `[t]` text, `[p]` personality — followed by content and
//! an optional parenthesized attribute list. Separators respect double
//! quotes, so selector strings and literals may contain `;`, `,` and `(`.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constraint::DynamicConstraint;
use crate::grammar::{Assignment, Grammar, GrammarValue};
use crate::tree::{NodeId, SemanticTree};
use crate::{Result, SynthesisError};

/// A single synthesis rule.
#[derive(Debug, Clone)]
pub struct SpeechRule {
    pub name: String,
    pub constraint: DynamicConstraint,
    pub precondition: Precondition,
    pub action: Action,
}

impl fmt::Display for SpeechRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {} ==> {}", self.name, self.constraint, self.precondition, self.action)
    }
}

/// The applicability test of a rule: one structural query plus extra boolean
/// constraints, with a specificity priority and a declaration rank.
#[derive(Debug, Clone)]
pub struct Precondition {
    pub query: String,
    pub constraints: Vec<String>,
    /// Static specificity. Either declared via a trailing `priority=N`
    /// constraint or computed from the query shape.
    pub priority: f64,
    /// Declaration order within the rule table; later declarations win ties.
    pub rank: usize,
}

// Query shapes by increasing specificity. Position (1-based) of the first
// match becomes the hundreds digit of the computed priority.
static QUERY_PRIORITIES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile([r"^self::\*$", r"^self::[\w-]+$", r"^self::\*\[.+\]$", r"^self::[\w-]+\[.+\]$"])
});

// Attribute-predicate shapes, the tens digit.
static ATTRIBUTE_PRIORITIES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile([
        r"^@[\w-]+$",
        r#"^@[\w-]+!=".+"$"#,
        r#"^not\(contains\(@[\w-]+,\s*".+"\)\)$"#,
        r#"^contains\(@[\w-]+,".+"\)$"#,
        r#"^@[\w-]+=".+"$"#,
    ])
});

fn compile<const N: usize>(patterns: [&str; N]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).expect("static pattern")).collect()
}

fn constraint_value(constraint: &str, priorities: &[Regex]) -> f64 {
    for (i, pattern) in priorities.iter().enumerate() {
        if pattern.is_match(constraint) {
            return (i + 1) as f64;
        }
    }
    0.0
}

impl Precondition {
    /// Build a precondition, recognizing a trailing `priority=N` constraint
    /// as an explicit override of the computed priority.
    pub fn new(query: impl Into<String>, mut constraints: Vec<String>) -> Precondition {
        let query = query.into();
        let preset = constraints
            .last()
            .and_then(|c| c.strip_prefix("priority=").map(|v| v.to_string()));
        let priority = match preset {
            Some(value) => {
                constraints.pop();
                value.trim().parse::<f64>().unwrap_or(0.0)
            }
            None => Precondition::calculate_priority(&query),
        };
        Precondition { query, constraints, priority, rank: 0 }
    }

    /// 100 × query specificity + 10 × attribute-predicate specificity. A
    /// query outside the known shapes yields 0 regardless of predicates.
    fn calculate_priority(query: &str) -> f64 {
        let shape = constraint_value(query, &QUERY_PRIORITIES);
        if shape == 0.0 {
            return 0.0;
        }
        let attr = regex!(r"^self::.+\[(.+)\]")
            .captures(query)
            .map(|caps| constraint_value(&caps[1], &ATTRIBUTE_PRIORITIES))
            .unwrap_or(0.0);
        shape * 100.0 + attr * 10.0
    }

    /// True when the query and every extra constraint hold on `node`.
    pub fn applicable(&self, tree: &SemanticTree, node: NodeId) -> Result<bool> {
        if !tree.check(node, &self.query)? {
            return Ok(false);
        }
        for constraint in &self.constraints {
            if !tree.check(node, constraint)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)?;
        for constraint in &self.constraints {
            write!(f, ", {constraint}")?;
        }
        Ok(())
    }
}

/// The component kinds of the action grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// `[n]` — recurse into the selected node.
    Node,
    /// `[m]` — recurse into every selected node, with separators/context.
    Multi,
    /// `[t]` — emit text: a quoted literal or selected text content.
    Text,
    /// `[p]` — emit a personality-only fragment (pauses).
    Personality,
}

impl ComponentKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ComponentKind::Node => "[n]",
            ComponentKind::Multi => "[m]",
            ComponentKind::Text => "[t]",
            ComponentKind::Personality => "[p]",
        }
    }

    fn from_tag(tag: &str) -> Option<ComponentKind> {
        match tag {
            "[n]" => Some(ComponentKind::Node),
            "[m]" => Some(ComponentKind::Multi),
            "[t]" => Some(ComponentKind::Text),
            "[p]" => Some(ComponentKind::Personality),
            _ => None,
        }
    }
}

/// One parsed component of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub kind: ComponentKind,
    /// Selector string, quoted literal, or empty (personality components).
    pub content: String,
    pub attributes: BTreeMap<String, String>,
    /// Parsed `grammar:` attribute, pushed around the component's execution.
    pub grammar: Assignment,
}

impl Component {
    pub fn from_string(input: &str) -> Result<Component> {
        let input = input.trim();
        if input.len() < 3 {
            return Err(SynthesisError::RuleSyntax(format!("component too short: {input}")));
        }
        let kind = ComponentKind::from_tag(&input[..3])
            .ok_or_else(|| SynthesisError::RuleSyntax(format!("unknown component kind: {input}")))?;
        let mut rest = input[3..].trim().to_string();
        let content;
        if kind == ComponentKind::Text && rest.starts_with('"') {
            let quoted = split_string(&rest, '(')?.remove(0).trim().to_string();
            if !quoted.ends_with('"') || quoted.len() < 2 {
                return Err(SynthesisError::RuleSyntax(format!("invalid string syntax: {input}")));
            }
            rest = rest[quoted.len()..].trim().to_string();
            if !rest.contains('(') {
                rest.clear();
            }
            content = quoted;
        } else {
            match rest.find(" (") {
                Some(bracket) => {
                    content = rest[..bracket].trim().to_string();
                    rest = rest[bracket..].trim().to_string();
                }
                None => {
                    content = if rest.starts_with('(') { String::new() } else { std::mem::take(&mut rest) };
                }
            }
        }
        let (attributes, grammar) = if rest.is_empty() {
            (BTreeMap::new(), Assignment::new())
        } else {
            parse_attributes(&rest)?
        };
        Ok(Component { kind, content, attributes, grammar })
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.tag())?;
        if !self.content.is_empty() {
            write!(f, " {}", self.content)?;
        }
        let mut attrs: Vec<String> =
            self.attributes.iter().map(|(k, v)| format!("{k}:{v}")).collect();
        if !self.grammar.is_empty() {
            attrs.push(format!("grammar:{}", assignment_to_string(&self.grammar)));
        }
        if !attrs.is_empty() {
            write!(f, " ({})", attrs.join(", "))?;
        }
        Ok(())
    }
}

/// Parse a `(key:value, flag, grammar:...)` attribute list.
fn parse_attributes(input: &str) -> Result<(BTreeMap<String, String>, Assignment)> {
    if !input.starts_with('(') || !input.ends_with(')') {
        return Err(SynthesisError::RuleSyntax(format!("invalid attribute expression: {input}")));
    }
    let mut attributes = BTreeMap::new();
    let mut grammar = Assignment::new();
    for attr in split_string(&input[1..input.len() - 1], ',')? {
        let attr = attr.trim();
        if attr.is_empty() {
            continue;
        }
        match attr.find(':') {
            None => {
                attributes.insert(attr.to_string(), "true".to_string());
            }
            Some(colon) => {
                let key = attr[..colon].trim();
                let value = attr[colon + 1..].trim();
                if key == "grammar" {
                    grammar = Grammar::parse_input(value);
                } else {
                    attributes.insert(key.to_string(), value.to_string());
                }
            }
        }
    }
    Ok((attributes, grammar))
}

fn assignment_to_string(assignment: &Assignment) -> String {
    let parts: Vec<String> = assignment
        .iter()
        .map(|(key, value)| match value {
            GrammarValue::Text(v) => format!("{key}={v}"),
            GrammarValue::Flag(true) => key.clone(),
            GrammarValue::Flag(false) => format!("!{key}"),
        })
        .collect();
    parts.join(":")
}

/// Split on `sep` outside double quotes. Unbalanced quotes are an error.
fn split_string(input: &str, sep: char) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        }
        if c == sep && !in_quotes {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if in_quotes {
        return Err(SynthesisError::RuleSyntax(format!("invalid string in expression: {input}")));
    }
    parts.push(current);
    Ok(parts)
}

/// An ordered list of components, parsed once at rule-load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Action {
    pub components: Vec<Component>,
}

impl Action {
    pub fn from_string(input: &str) -> Result<Action> {
        let mut components = Vec::new();
        for part in split_string(input, ';')? {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            components.push(Component::from_string(part)?);
        }
        Ok(Action { components })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ladder_orders_query_shapes() {
        let wildcard = Precondition::new("self::*", vec![]);
        let named = Precondition::new("self::fraction", vec![]);
        let predicated = Precondition::new(r#"self::fraction[@role="vulgar"]"#, vec![]);
        assert_eq!(wildcard.priority, 100.0);
        assert_eq!(named.priority, 200.0);
        assert_eq!(predicated.priority, 450.0);
        assert!(predicated.priority > named.priority);
        assert!(named.priority > wildcard.priority);
    }

    #[test]
    fn unknown_query_shape_gets_zero_priority() {
        let pre = Precondition::new("children/fraction", vec![]);
        assert_eq!(pre.priority, 0.0);
    }

    #[test]
    fn preset_priority_overrides_and_is_removed() {
        let pre =
            Precondition::new("self::*", vec!["@role".to_string(), "priority=999".to_string()]);
        assert_eq!(pre.priority, 999.0);
        assert_eq!(pre.constraints, vec!["@role".to_string()]);
    }

    #[test]
    fn attribute_predicate_shapes_rank_equality_highest() {
        let exists = Precondition::new("self::number[@font]", vec![]);
        let contains = Precondition::new(r#"self::number[contains(@font,"bold")]"#, vec![]);
        let equals = Precondition::new(r#"self::number[@font="bold"]"#, vec![]);
        assert_eq!(exists.priority, 410.0);
        assert_eq!(contains.priority, 440.0);
        assert_eq!(equals.priority, 450.0);
    }

    #[test]
    fn component_round_trips() {
        for input in [
            "[n] children/*[1] (pitch:0.3)",
            "[m] children/* (sepFunc:CTXFpauseSeparator, separator:\"short\")",
            "[t] \"open bracket\"",
            "[t] text() (annotation:number)",
            "[p] (pause:200)",
        ] {
            let component = Component::from_string(input).unwrap();
            assert_eq!(component.to_string(), input);
        }
    }

    #[test]
    fn grammar_attribute_is_parsed_not_stored() {
        let component =
            Component::from_string("[n] children/*[1] (grammar:case=upper:!translate)").unwrap();
        assert!(component.attributes.is_empty());
        assert_eq!(component.grammar.len(), 2);
        assert_eq!(component.to_string(), "[n] children/*[1] (grammar:case=upper:!translate)");
    }

    #[test]
    fn text_literal_must_close_its_quote() {
        assert!(Component::from_string("[t] \"unterminated").is_err());
    }

    #[test]
    fn action_splits_on_semicolons_outside_quotes() {
        let action = Action::from_string("[t] \"a; b\"; [p] (pause:100)").unwrap();
        assert_eq!(action.components.len(), 2);
        assert_eq!(action.components[0].content, "\"a; b\"");
    }

    #[test]
    fn unbalanced_quotes_error() {
        assert!(Action::from_string("[t] \"a; [p] (pause:100)").is_err());
    }
}
