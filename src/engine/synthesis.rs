//! Recursive rule evaluation.
//!
//! [`SynthesisContext`] owns everything a synthesis pass touches: the rule
//! trie, the grammar state stack, the active dynamic constraint with its
//! derived fallback properties and comparator, the engine options, the
//! registered default evaluators, and the per-node annotation side channel.
//! There is no global state; two contexts never interfere.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::api::{EngineFlags, Options};
use crate::constraint::{Axis, Comparator, DynamicConstraint, DynamicProperties};
use crate::fragment::{Fragment, Personality, PersonalityKey, PersonalityValue};
use crate::grammar::{Assignment, Grammar, GrammarValue, TextFlags};
use crate::rule::{Component, ComponentKind, SpeechRule};
use crate::tree::{NodeId, SemanticTree};
use crate::trie::RuleTrie;
use crate::Result;

use super::fixup;
use super::functions::{ContextState, SeparatorState};

/// A default evaluator: produces fragments for a node no rule matches.
pub type Evaluator = fn(&SemanticTree, NodeId, &mut Grammar) -> Vec<Fragment>;

fn default_evaluator(tree: &SemanticTree, node: NodeId, grammar: &mut Grammar) -> Vec<Fragment> {
    let text = tree.text_content(node);
    if text.is_empty() {
        return Vec::new();
    }
    vec![Fragment::create(text, BTreeMap::new(), TextFlags::translate(), grammar)]
}

pub struct SynthesisContext {
    trie: RuleTrie,
    pub grammar: Grammar,
    options: Options,
    constraint: DynamicConstraint,
    properties: DynamicProperties,
    comparator: Comparator,
    evaluators: BTreeMap<(String, String), Evaluator>,
    evaluator: Evaluator,
    annotations: HashMap<NodeId, String>,
}

impl SynthesisContext {
    pub fn new(options: Options) -> SynthesisContext {
        let constraint = DynamicConstraint::defaults();
        let properties = DynamicProperties::new();
        let comparator = Comparator::new(constraint.clone(), properties.clone());
        SynthesisContext {
            trie: RuleTrie::new(),
            grammar: Grammar::new(),
            options,
            constraint,
            properties,
            comparator,
            evaluators: BTreeMap::new(),
            evaluator: default_evaluator,
            annotations: HashMap::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn add_rule(&mut self, rule: SpeechRule) {
        self.trie.add_rule(Arc::new(rule));
    }

    /// Set the requested output preference. The effective constraint may
    /// degrade per axis when the trie has no rules under the request.
    pub fn set_constraint(&mut self, constraint: DynamicConstraint) {
        self.constraint = constraint;
    }

    pub fn constraint(&self) -> &DynamicConstraint {
        &self.constraint
    }

    /// Register the fallback evaluator for a `(locale, modality)` pair.
    pub fn set_evaluator(&mut self, locale: &str, modality: &str, evaluator: Evaluator) {
        self.evaluators.insert((locale.to_string(), modality.to_string()), evaluator);
    }

    /// The grammar state recorded for `node` during the last evaluation.
    pub fn annotation(&self, node: NodeId) -> Option<&str> {
        self.annotations.get(&node).map(|s| s.as_str())
    }

    /// Synthesize the fragment list for `node`. This is the error boundary:
    /// internal failures are logged and yield an empty result.
    pub fn evaluate(&mut self, tree: &SemanticTree, node: NodeId) -> Vec<Fragment> {
        match self.evaluate_node(tree, node) {
            Ok(descrs) => descrs,
            Err(err) => {
                tracing::error!(%err, "synthesis failed");
                Vec::new()
            }
        }
    }

    /// Temporarily override dynamic-constraint axes around a callback,
    /// restoring the previous request afterwards.
    pub fn run_in_setting<T>(
        &mut self,
        assignment: &Assignment,
        callback: impl FnOnce(&mut SynthesisContext) -> T,
    ) -> T {
        let saved = self.apply_axis_assignment(assignment);
        let result = callback(self);
        self.restore_constraint(saved);
        result
    }

    fn evaluate_node(&mut self, tree: &SemanticTree, node: NodeId) -> Result<Vec<Fragment>> {
        self.annotations.clear();
        self.update_constraint();
        let result = self.evaluate_tree(tree, node)?;
        Ok(fixup::process_annotations(result))
    }

    /// Derive the effective per-axis value sets from the requested
    /// constraint, degrading domain, then modality, then locale until the
    /// trie has rules for the combination. Rebuilds the comparator and picks
    /// the default evaluator for the effective locale/modality.
    fn update_constraint(&mut self) {
        let strict = self.options.flags.contains(EngineFlags::STRICT);
        let mut locale = self.constraint.value(Axis::Locale).to_string();
        let mut modality = self.constraint.value(Axis::Modality).to_string();
        let mut domain = self.constraint.value(Axis::Domain).to_string();
        if !self.trie.has_subtrie(&[&locale, &modality, &domain]) {
            domain = Axis::Domain.default_value().to_string();
            if !self.trie.has_subtrie(&[&locale, &modality, &domain]) {
                modality = Axis::Modality.default_value().to_string();
                if !self.trie.has_subtrie(&[&locale, &modality, &domain]) {
                    locale = Axis::Locale.default_value().to_string();
                }
            }
        }
        let mut properties = DynamicProperties::new();
        properties.set(Axis::Locale, vec![locale.clone()]);
        properties.set(
            Axis::Modality,
            vec![if modality == "summary" {
                Axis::Modality.default_value().to_string()
            } else {
                modality.clone()
            }],
        );
        properties.set(
            Axis::Domain,
            vec![if modality == "speech" {
                domain
            } else {
                Axis::Domain.default_value().to_string()
            }],
        );
        let style = self.constraint.value(Axis::Style);
        let mut styles: Vec<String> = if self.constraint.preference() {
            style.split(':').map(|s| s.to_string()).collect()
        } else {
            vec![style.to_string()]
        };
        let default_style = Axis::Style.default_value();
        if !strict && style != default_style {
            styles.push(default_style.to_string());
        }
        properties.set(Axis::Style, styles);
        self.comparator = Comparator::new(self.constraint.clone(), properties.clone());
        self.properties = properties;
        self.evaluator = self
            .evaluators
            .get(&(locale, modality))
            .copied()
            .unwrap_or(default_evaluator);
    }

    /// Find the single best applicable rule for `node`, if any.
    fn lookup_rule(
        &self,
        tree: &SemanticTree,
        node: NodeId,
    ) -> Result<Option<Arc<SpeechRule>>> {
        let mut rules = self.trie.lookup_rules(tree, node, &self.properties)?;
        rules.sort_by(|a, b| {
            self.comparator
                .compare(&a.constraint, &b.constraint)
                .then_with(|| {
                    b.precondition
                        .priority
                        .partial_cmp(&a.precondition.priority)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| {
                    b.precondition.constraints.len().cmp(&a.precondition.constraints.len())
                })
                .then_with(|| b.precondition.rank.cmp(&a.precondition.rank))
        });
        Ok(rules.into_iter().next())
    }

    pub(super) fn evaluate_tree(
        &mut self,
        tree: &SemanticTree,
        node: NodeId,
    ) -> Result<Vec<Fragment>> {
        let state = self.grammar.state_string();
        if !state.is_empty() {
            self.annotations.insert(node, state);
        }
        let Some(rule) = self.lookup_rule(tree, node)? else {
            if self.options.flags.contains(EngineFlags::STRICT) {
                return Ok(Vec::new());
            }
            let mut descrs = (self.evaluator)(tree, node, &mut self.grammar);
            self.add_personality(&mut descrs, &BTreeMap::new(), false, tree, node);
            return Ok(descrs);
        };
        tracing::debug!(rule = %rule.name, constraint = %rule.constraint, "applying rule");
        self.grammar.process_singles();
        let result = self.apply_action(tree, node, &rule);
        self.grammar.pop_state();
        result
    }

    fn apply_action(
        &mut self,
        tree: &SemanticTree,
        node: NodeId,
        rule: &SpeechRule,
    ) -> Result<Vec<Fragment>> {
        let mut result = Vec::new();
        for component in &rule.action.components {
            let pushed = !component.grammar.is_empty();
            if pushed {
                self.grammar.push_state(component.grammar.clone());
            }
            let saved = component
                .attributes
                .get("engine")
                .map(|spec| self.apply_axis_assignment(&Grammar::parse_input(spec)));
            let outcome = self.apply_component(tree, node, component);
            if let Some(saved) = saved {
                self.restore_constraint(saved);
            }
            if pushed {
                self.grammar.pop_state();
            }
            let mut descrs = outcome?;
            let multi = component.kind == ComponentKind::Multi;
            self.add_personality(&mut descrs, &component.attributes, multi, tree, node);
            result.append(&mut descrs);
        }
        Ok(result)
    }

    fn apply_component(
        &mut self,
        tree: &SemanticTree,
        node: NodeId,
        component: &Component,
    ) -> Result<Vec<Fragment>> {
        let attributes = &component.attributes;
        let mut descrs = match component.kind {
            ComponentKind::Node => match tree.query_one(node, &component.content)? {
                Some(selected) => self.evaluate_tree(tree, selected)?,
                None => Vec::new(),
            },
            ComponentKind::Multi => {
                let selected = tree.select(node, &component.content)?;
                if selected.is_empty() {
                    Vec::new()
                } else {
                    let separator =
                        self.construct_string(tree, node, attributes.get("separator"))?;
                    let context = self.construct_string(tree, node, attributes.get("context"))?;
                    self.evaluate_node_list(
                        tree,
                        selected,
                        attributes.get("sepFunc").map(|s| s.as_str()),
                        separator,
                        attributes.get("ctxtFunc").map(|s| s.as_str()),
                        context,
                    )?
                }
            }
            ComponentKind::Text => {
                let mut attrs = BTreeMap::new();
                if let Some(span) = attributes.get("span") {
                    match tree.query_one(node, span)? {
                        Some(found) => attrs = tree.attrs(found).clone(),
                        None => {
                            attrs.insert("kind".to_string(), span.clone());
                        }
                    }
                }
                let text = self.construct_string(tree, node, Some(&component.content))?;
                vec![Fragment::create(text, attrs, TextFlags::adjust(), &mut self.grammar)]
            }
            ComponentKind::Personality => vec![Fragment::text_only(component.content.clone())],
        };
        if component.kind != ComponentKind::Multi && !descrs.is_empty() {
            if let Some(context) = attributes.get("context") {
                let prefix = self.construct_string(tree, node, Some(context))?;
                prepend_context(&mut descrs[0], &prefix);
            }
            if let Some(annotation) = attributes.get("annotation") {
                descrs[0].annotation = annotation.clone();
            }
        }
        add_layout(&mut descrs, attributes);
        Ok(descrs)
    }

    fn evaluate_node_list(
        &mut self,
        tree: &SemanticTree,
        nodes: Vec<NodeId>,
        sep_func: Option<&str>,
        separator: String,
        ctxt_func: Option<&str>,
        context: String,
    ) -> Result<Vec<Fragment>> {
        let len = nodes.len();
        let mut ctxt = ContextState::new(ctxt_func, context, len);
        let mut sep = SeparatorState::new(sep_func, tree, &nodes, separator)?;
        let mut result = Vec::new();
        for (i, item) in nodes.into_iter().enumerate() {
            let mut descrs = self.evaluate_tree(tree, item)?;
            if descrs.is_empty() {
                continue;
            }
            let prefix = ctxt.next();
            prepend_context(&mut descrs[0], &prefix);
            result.append(&mut descrs);
            if i < len - 1 {
                result.extend(sep.next(self, tree)?);
            }
        }
        Ok(result)
    }

    /// Resolve a content expression: empty yields the empty string, a
    /// leading quote yields the literal, anything else is a selector whose
    /// first match contributes its text content. `text()` refers to the
    /// current node.
    fn construct_string(
        &mut self,
        tree: &SemanticTree,
        node: NodeId,
        expr: Option<&String>,
    ) -> Result<String> {
        let Some(expr) = expr else {
            return Ok(String::new());
        };
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(String::new());
        }
        if expr.starts_with('"') && expr.ends_with('"') && expr.len() >= 2 {
            return Ok(expr[1..expr.len() - 1].to_string());
        }
        if expr == "text()" {
            return Ok(tree.text_content(node));
        }
        Ok(match tree.query_one(node, expr)? {
            Some(found) => tree.text_content(found),
            None => String::new(),
        })
    }

    /// Attach the component's prosody to `descrs`: numeric values accumulate
    /// additively into each fragment, the external node attributes land on
    /// the first one, a multi loses its trailing joiner, and a pause is
    /// hoisted into a trailing empty fragment rather than repeated.
    fn add_personality(
        &mut self,
        descrs: &mut Vec<Fragment>,
        attributes: &BTreeMap<String, String>,
        multi: bool,
        tree: &SemanticTree,
        node: NodeId,
    ) {
        let mut personality = Personality::new();
        let mut pause = None;
        for key in PersonalityKey::ALL {
            if key == PersonalityKey::Layout {
                continue;
            }
            if let Some(raw) = attributes.get(key.name()) {
                let value = PersonalityValue::parse(raw);
                if key == PersonalityKey::Pause {
                    pause = Some(value);
                } else {
                    personality.set(key, value);
                }
            }
        }
        for descr in descrs.iter_mut() {
            descr.personality.add_relative(&personality);
        }
        if let Some(first) = descrs.first_mut() {
            for (key, value) in tree.attrs(node) {
                if key == "id" || key.starts_with("ext") {
                    first.attributes.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        if multi && !descrs.is_empty() {
            if let Some(last) = descrs.last_mut() {
                last.personality.remove(PersonalityKey::Join);
            }
        }
        if let Some(pause) = pause {
            if let Some(last) = descrs.last_mut() {
                if last.text.is_empty() && last.personality.is_empty() && last.layout.is_empty() {
                    last.personality.set(PersonalityKey::Pause, pause);
                } else {
                    let mut descr = Fragment::default();
                    descr.personality.set(PersonalityKey::Pause, pause);
                    descrs.push(descr);
                }
            }
        }
    }

    /// Apply an axis assignment (e.g. `modality=braille`) to the active
    /// constraint, returning the previous constraint for restoration.
    fn apply_axis_assignment(&mut self, assignment: &Assignment) -> DynamicConstraint {
        let saved = self.constraint.clone();
        for (key, value) in assignment {
            if let (Some(axis), GrammarValue::Text(v)) = (Axis::from_name(key), value) {
                self.constraint.set_value(axis, v);
            }
        }
        self.update_constraint();
        saved
    }

    fn restore_constraint(&mut self, saved: DynamicConstraint) {
        self.constraint = saved;
        self.update_constraint();
    }
}

/// Prefix a fragment's context, keeping a single space between the parts.
fn prepend_context(descr: &mut Fragment, prefix: &str) {
    if prefix.is_empty() {
        return;
    }
    descr.context = if descr.context.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix} {}", descr.context)
    };
}

/// Wrap `descrs` in layout markers when the component carries a `layout`
/// attribute. Bare tags get both a begin and an end marker.
fn add_layout(descrs: &mut Vec<Fragment>, attributes: &BTreeMap<String, String>) {
    let Some(layout) = attributes.get("layout") else {
        return;
    };
    if layout.starts_with("begin") {
        descrs.insert(0, Fragment::layout_marker(layout));
        return;
    }
    if layout.starts_with("end") {
        descrs.push(Fragment::layout_marker(layout));
        return;
    }
    descrs.insert(0, Fragment::layout_marker(format!("begin{layout}")));
    descrs.push(Fragment::layout_marker(format!("end{layout}")));
}
