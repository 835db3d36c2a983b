//! Semantic tree input boundary.
//!
//! The engine does not depend on any particular DOM library; it needs a tree
//! node exposing a tag name, attribute lookup, ordered children, text
//! content, and evaluation of a small structural-selector subset. This
//! module supplies that capability set with an arena tree: nodes are ids
//! into a flat vector, so traversal never fights the borrow checker and
//! cyclic inputs cannot be constructed.
//!
//! ## Selector subset
//!
//! Paths are `/`-separated steps evaluated against a context node:
//!
//! - `.` and `..` — self and parent
//! - `name` and `*` — children by tag / all children
//! - `following-sibling::*`, `preceding-sibling::*` — sibling axes
//! - `[N]` — 1-based position among the step's matches per context node
//! - `[@attr]`, `[@attr="v"]`, `[@attr!="v"]`, `[contains(@attr,"v")]`,
//!   `[not(contains(@attr,"v"))]`, `[count(*)=N]` — predicates
//!
//! Rule queries additionally use `self::name` / `self::*` tests with the
//! same predicate forms.

use std::collections::BTreeMap;

use crate::{Result, SynthesisError};

/// Index of a node in its [`SemanticTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// An annotated expression tree.
#[derive(Debug, Clone)]
pub struct SemanticTree {
    nodes: Vec<NodeData>,
}

impl SemanticTree {
    pub fn new(root_tag: impl Into<String>) -> SemanticTree {
        SemanticTree {
            nodes: vec![NodeData {
                tag: root_tag.into(),
                attrs: BTreeMap::new(),
                text: String::new(),
                children: Vec::new(),
                parent: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add_child(&mut self, parent: NodeId, tag: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Convenience: add a child carrying only text.
    pub fn add_leaf(&mut self, parent: NodeId, tag: impl Into<String>, text: impl Into<String>) -> NodeId {
        let id = self.add_child(parent, tag);
        self.set_text(id, text);
        id
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.0].text = text.into();
    }

    pub fn set_attr(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        self.nodes[id.0].attrs.insert(key.into(), value.into());
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0].attrs.get(key).map(|s| s.as_str())
    }

    pub fn attrs(&self, id: NodeId) -> &BTreeMap<String, String> {
        &self.nodes[id.0].attrs
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Own text followed by descendant text, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        out.push_str(&self.nodes[id.0].text);
        for child in &self.nodes[id.0].children {
            self.collect_text(*child, out);
        }
    }

    /// Evaluate a selector path, returning matches in document order.
    pub fn select(&self, node: NodeId, path: &str) -> Result<Vec<NodeId>> {
        let mut current = vec![node];
        for raw_step in path.split('/') {
            let raw_step = raw_step.trim();
            if raw_step.is_empty() {
                continue;
            }
            let (axis, preds) = parse_step(raw_step)?;
            let mut next = Vec::new();
            for ctx in current {
                let matches = self.step_matches(ctx, &axis);
                let len = matches.len();
                for (pos, m) in matches.into_iter().enumerate() {
                    if preds.iter().all(|p| self.eval_pred(m, p, pos + 1, len)) {
                        next.push(m);
                    }
                }
            }
            current = next;
        }
        Ok(current)
    }

    /// First match of a selector path.
    pub fn query_one(&self, node: NodeId, path: &str) -> Result<Option<NodeId>> {
        Ok(self.select(node, path)?.into_iter().next())
    }

    /// Evaluate a rule query or boolean constraint against `node`.
    pub fn check(&self, node: NodeId, expr: &str) -> Result<bool> {
        let expr = expr.trim();
        if let Some(rest) = expr.strip_prefix("self::") {
            let (test, preds) = split_predicates(rest)?;
            let tag_ok = test == "*" || self.tag(node) == test;
            if !tag_ok {
                return Ok(false);
            }
            let preds = preds
                .iter()
                .map(|p| parse_predicate(p))
                .collect::<Result<Vec<Predicate>>>()?;
            return Ok(preds.iter().all(|p| self.eval_pred(node, p, 1, 1)));
        }
        if looks_like_predicate(expr) {
            let pred = parse_predicate(expr)?;
            return Ok(self.eval_pred(node, &pred, 1, 1));
        }
        // A bare path constraint holds when it selects anything.
        Ok(!self.select(node, expr)?.is_empty())
    }

    fn step_matches(&self, ctx: NodeId, axis: &StepAxis) -> Vec<NodeId> {
        match axis {
            StepAxis::SelfNode => vec![ctx],
            StepAxis::Parent => self.parent(ctx).into_iter().collect(),
            StepAxis::Children(None) => self.children(ctx).to_vec(),
            StepAxis::Children(Some(tag)) => {
                self.children(ctx).iter().copied().filter(|c| self.tag(*c) == tag).collect()
            }
            StepAxis::FollowingSibling => match self.parent(ctx) {
                Some(p) => {
                    let siblings = self.children(p);
                    let pos = siblings.iter().position(|&s| s == ctx).unwrap_or(0);
                    siblings[pos + 1..].to_vec()
                }
                None => Vec::new(),
            },
            StepAxis::PrecedingSibling => match self.parent(ctx) {
                Some(p) => {
                    let siblings = self.children(p);
                    let pos = siblings.iter().position(|&s| s == ctx).unwrap_or(0);
                    siblings[..pos].to_vec()
                }
                None => Vec::new(),
            },
        }
    }

    fn eval_pred(&self, node: NodeId, pred: &Predicate, position: usize, _len: usize) -> bool {
        match pred {
            Predicate::Index(n) => position == *n,
            Predicate::AttrExists(key) => self.attr(node, key).is_some(),
            Predicate::AttrEq(key, value) => self.attr(node, key) == Some(value.as_str()),
            Predicate::AttrNeq(key, value) => self.attr(node, key) != Some(value.as_str()),
            Predicate::Contains(key, value) => {
                self.attr(node, key).map(|v| v.contains(value.as_str())).unwrap_or(false)
            }
            Predicate::NotContains(key, value) => {
                !self.attr(node, key).map(|v| v.contains(value.as_str())).unwrap_or(false)
            }
            Predicate::ChildCount(n) => self.children(node).len() == *n,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum StepAxis {
    SelfNode,
    Parent,
    Children(Option<String>),
    FollowingSibling,
    PrecedingSibling,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Index(usize),
    AttrExists(String),
    AttrEq(String, String),
    AttrNeq(String, String),
    Contains(String, String),
    NotContains(String, String),
    ChildCount(usize),
}

fn parse_step(step: &str) -> Result<(StepAxis, Vec<Predicate>)> {
    let (name, preds) = split_predicates(step)?;
    let axis = match name {
        "." => StepAxis::SelfNode,
        ".." => StepAxis::Parent,
        "*" => StepAxis::Children(None),
        "following-sibling::*" => StepAxis::FollowingSibling,
        "preceding-sibling::*" => StepAxis::PrecedingSibling,
        tag => StepAxis::Children(Some(tag.to_string())),
    };
    let preds = preds.iter().map(|p| parse_predicate(p)).collect::<Result<Vec<Predicate>>>()?;
    Ok((axis, preds))
}

/// Split `name[p1][p2]` into the name and its predicate strings.
fn split_predicates(step: &str) -> Result<(&str, Vec<&str>)> {
    match step.find('[') {
        None => Ok((step, Vec::new())),
        Some(open) => {
            let name = &step[..open];
            let mut preds = Vec::new();
            let mut rest = &step[open..];
            while !rest.is_empty() {
                if !rest.starts_with('[') || !rest.ends_with(']') {
                    return Err(SynthesisError::Selector(step.to_string()));
                }
                let close = matching_bracket(rest)
                    .ok_or_else(|| SynthesisError::Selector(step.to_string()))?;
                preds.push(&rest[1..close]);
                rest = &rest[close + 1..];
            }
            Ok((name, preds))
        }
    }
}

fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn looks_like_predicate(expr: &str) -> bool {
    expr.starts_with('@') || expr.starts_with("contains(") || expr.starts_with("not(")
        || expr.starts_with("count(")
}

fn parse_predicate(pred: &str) -> Result<Predicate> {
    let pred = pred.trim();
    if let Ok(n) = pred.parse::<usize>() {
        return Ok(Predicate::Index(n));
    }
    if let Some(caps) = regex!(r#"^not\(contains\(@([\w-]+),\s*"([^"]*)"\)\)$"#).captures(pred) {
        return Ok(Predicate::NotContains(caps[1].to_string(), caps[2].to_string()));
    }
    if let Some(caps) = regex!(r#"^contains\(@([\w-]+),\s*"([^"]*)"\)$"#).captures(pred) {
        return Ok(Predicate::Contains(caps[1].to_string(), caps[2].to_string()));
    }
    if let Some(caps) = regex!(r#"^@([\w-]+)!="([^"]*)"$"#).captures(pred) {
        return Ok(Predicate::AttrNeq(caps[1].to_string(), caps[2].to_string()));
    }
    if let Some(caps) = regex!(r#"^@([\w-]+)="([^"]*)"$"#).captures(pred) {
        return Ok(Predicate::AttrEq(caps[1].to_string(), caps[2].to_string()));
    }
    if let Some(caps) = regex!(r"^@([\w-]+)$").captures(pred) {
        return Ok(Predicate::AttrExists(caps[1].to_string()));
    }
    if let Some(caps) = regex!(r"^count\(\*\)=(\d+)$").captures(pred) {
        let n = caps[1].parse::<usize>().map_err(|_| SynthesisError::Selector(pred.to_string()))?;
        return Ok(Predicate::ChildCount(n));
    }
    Err(SynthesisError::Selector(pred.to_string()))
}
