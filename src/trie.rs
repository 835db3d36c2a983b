//! Rule index.
//!
//! Rules are indexed in a trie whose first four levels are the dynamic
//! constraint axes (locale, modality, domain, style), followed by one query
//! level and zero or more boolean-constraint levels. Lookup first descends
//! the dynamic levels through the caller's per-axis value sets, then walks
//! the static levels testing each constraint against the input node,
//! collecting every rule whose full path holds. Ranking happens later, in
//! the engine; the trie only answers "which rules are applicable here".
//!
//! Nodes are arena-allocated; children are indices into the flat node
//! vector. Rules are shared via `Arc` so lookup results outlive the borrow
//! of the trie during recursive evaluation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constraint::DynamicProperties;
use crate::rule::SpeechRule;
use crate::tree::{NodeId, SemanticTree};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Root,
    Dynamic,
    Query,
    Boolean,
}

#[derive(Debug)]
struct TrieNode {
    kind: NodeKind,
    constraint: String,
    rule: Option<Arc<SpeechRule>>,
    children: Vec<usize>,
}

/// Nested enumeration of the dynamic-constraint levels present in a trie.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisTree(pub BTreeMap<String, AxisTree>);

#[derive(Debug)]
pub struct RuleTrie {
    nodes: Vec<TrieNode>,
}

impl Default for RuleTrie {
    fn default() -> Self {
        RuleTrie::new()
    }
}

impl RuleTrie {
    pub fn new() -> RuleTrie {
        RuleTrie {
            nodes: vec![TrieNode {
                kind: NodeKind::Root,
                constraint: String::new(),
                rule: None,
                children: Vec::new(),
            }],
        }
    }

    /// Index a rule under its dynamic constraint, query and constraints. A
    /// rule with an identical full path replaces the previous occupant.
    pub fn add_rule(&mut self, rule: Arc<SpeechRule>) {
        let mut current = 0;
        for value in rule.constraint.ordered_values() {
            current = self.get_or_add(current, NodeKind::Dynamic, value);
        }
        current = self.get_or_add(current, NodeKind::Query, &rule.precondition.query);
        for constraint in &rule.precondition.constraints {
            current = self.get_or_add(current, NodeKind::Boolean, constraint);
        }
        self.nodes[current].rule = Some(rule);
    }

    fn get_or_add(&mut self, parent: usize, kind: NodeKind, constraint: &str) -> usize {
        if let Some(&child) = self.nodes[parent]
            .children
            .iter()
            .find(|&&c| self.nodes[c].kind == kind && self.nodes[c].constraint == constraint)
        {
            return child;
        }
        let idx = self.nodes.len();
        self.nodes.push(TrieNode {
            kind,
            constraint: constraint.to_string(),
            rule: None,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    /// All rules applicable to `node` under the given per-axis value sets.
    pub fn lookup_rules(
        &self,
        tree: &SemanticTree,
        node: NodeId,
        properties: &DynamicProperties,
    ) -> Result<Vec<Arc<SpeechRule>>> {
        let mut frontier = vec![0usize];
        for values in properties.ordered() {
            let mut next = Vec::new();
            for idx in frontier {
                for &child in &self.nodes[idx].children {
                    // Static children pass through unconditionally; rules
                    // indexed without a full dynamic path stay reachable.
                    if self.nodes[child].kind != NodeKind::Dynamic
                        || values.iter().any(|v| v == &self.nodes[child].constraint)
                    {
                        next.push(child);
                    }
                }
            }
            frontier = next;
        }
        let mut rules = Vec::new();
        while let Some(idx) = frontier.pop() {
            let trie_node = &self.nodes[idx];
            if trie_node.kind != NodeKind::Dynamic {
                if !tree.check(node, &trie_node.constraint)? {
                    continue;
                }
                if let Some(rule) = &trie_node.rule {
                    rules.push(Arc::clone(rule));
                }
            }
            frontier.extend(trie_node.children.iter().copied());
        }
        Ok(rules)
    }

    /// True when the given constraint path (a prefix of dynamic values) has
    /// an indexed subtrie.
    pub fn has_subtrie(&self, path: &[&str]) -> bool {
        let mut current = 0;
        for value in path {
            match self.nodes[current]
                .children
                .iter()
                .find(|&&c| self.nodes[c].constraint == *value)
            {
                Some(&child) => current = child,
                None => return false,
            }
        }
        true
    }

    /// Enumerate the dynamic-constraint combinations present in the trie.
    pub fn enumerate(&self) -> AxisTree {
        self.enumerate_from(0)
    }

    fn enumerate_from(&self, idx: usize) -> AxisTree {
        let mut tree = AxisTree::default();
        for &child in &self.nodes[idx].children {
            if self.nodes[child].kind == NodeKind::Dynamic {
                tree.0.insert(self.nodes[child].constraint.clone(), self.enumerate_from(child));
            }
        }
        tree
    }

    /// Every indexed rule, in insertion-path order.
    pub fn collect_rules(&self) -> Vec<Arc<SpeechRule>> {
        let mut rules = Vec::new();
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            if let Some(rule) = &self.nodes[idx].rule {
                rules.push(Arc::clone(rule));
            }
            stack.extend(self.nodes[idx].children.iter().rev().copied());
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Axis, DynamicConstraint};
    use crate::rule::{Action, Precondition};

    fn rule(name: &str, cstr: &str, query: &str, constraints: &[&str]) -> Arc<SpeechRule> {
        Arc::new(SpeechRule {
            name: name.to_string(),
            constraint: DynamicConstraint::parse(cstr).unwrap(),
            precondition: Precondition::new(
                query,
                constraints.iter().map(|s| s.to_string()).collect(),
            ),
            action: Action::from_string("[t] \"x\"").unwrap(),
        })
    }

    fn props(domain: &[&str], style: &[&str]) -> DynamicProperties {
        let mut p = DynamicProperties::new();
        p.set(Axis::Locale, vec!["en".to_string()]);
        p.set(Axis::Modality, vec!["speech".to_string()]);
        p.set(Axis::Domain, domain.iter().map(|s| s.to_string()).collect());
        p.set(Axis::Style, style.iter().map(|s| s.to_string()).collect());
        p
    }

    #[test]
    fn lookup_filters_by_axis_value_sets() {
        let mut trie = RuleTrie::new();
        trie.add_rule(rule("frac-default", "en.speech.default.default", "self::fraction", &[]));
        trie.add_rule(rule("frac-clear", "en.speech.clearmath.default", "self::fraction", &[]));
        let tree = SemanticTree::new("fraction");
        let found = trie
            .lookup_rules(&tree, tree.root(), &props(&["default"], &["default"]))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "frac-default");
        let both = trie
            .lookup_rules(&tree, tree.root(), &props(&["clearmath", "default"], &["default"]))
            .unwrap();
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn lookup_tests_query_and_boolean_levels() {
        let mut trie = RuleTrie::new();
        trie.add_rule(rule(
            "vulgar",
            "en.speech.default.default",
            "self::fraction",
            &[r#"@role="vulgar""#],
        ));
        let mut tree = SemanticTree::new("fraction");
        let found =
            trie.lookup_rules(&tree, tree.root(), &props(&["default"], &["default"])).unwrap();
        assert!(found.is_empty());
        tree.set_attr(tree.root(), "role", "vulgar");
        let found =
            trie.lookup_rules(&tree, tree.root(), &props(&["default"], &["default"])).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn has_subtrie_walks_dynamic_prefixes() {
        let mut trie = RuleTrie::new();
        trie.add_rule(rule("r", "en.braille.default.default", "self::*", &[]));
        assert!(trie.has_subtrie(&["en"]));
        assert!(trie.has_subtrie(&["en", "braille", "default"]));
        assert!(!trie.has_subtrie(&["en", "speech"]));
    }

    #[test]
    fn enumerate_lists_dynamic_levels() {
        let mut trie = RuleTrie::new();
        trie.add_rule(rule("a", "en.speech.default.default", "self::*", &[]));
        trie.add_rule(rule("b", "en.speech.clearmath.default", "self::*", &[]));
        let axes = trie.enumerate();
        let speech = axes.0.get("en").unwrap().0.get("speech").unwrap();
        assert!(speech.0.contains_key("default"));
        assert!(speech.0.contains_key("clearmath"));
    }

    #[test]
    fn collect_rules_returns_everything() {
        let mut trie = RuleTrie::new();
        trie.add_rule(rule("a", "en.speech.default.default", "self::fraction", &[]));
        trie.add_rule(rule("b", "en.speech.default.default", "self::number", &[]));
        assert_eq!(trie.collect_rules().len(), 2);
    }
}
