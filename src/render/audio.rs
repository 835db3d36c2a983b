//! Personality markup folding.
//!
//! The linear renderers share this layer: it turns a flat fragment list into
//! a well-nested markup stream. Prosody changes become balanced open/close
//! items, adjacent spans with unchanged prosody merge into one item, and
//! pauses merge additively. Renderers then map the stream to their own
//! syntax without re-deriving nesting.

use crate::fragment::{Fragment, PersonalityKey, PersonalityValue, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupItem {
    /// Open a prosody scope for one key at an absolute offset value.
    Open(PersonalityKey, f64),
    /// Close the innermost scope of the key.
    Close(PersonalityKey),
    /// Consecutive spans rendered under the current prosody. `join` is the
    /// in-item separator when the fragments carried one.
    Span { spans: Vec<Span>, join: Option<String> },
    Pause(PersonalityValue),
}

/// Fold fragments into a nested markup stream. Layout markers are ignored;
/// they belong to the two-dimensional renderer.
pub fn personality_markup(descrs: &[Fragment], clean_pause: bool) -> Vec<MarkupItem> {
    let mut items: Vec<MarkupItem> = Vec::new();
    let mut stack: Vec<(PersonalityKey, f64)> = Vec::new();
    for descr in descrs {
        if !descr.layout.is_empty() {
            continue;
        }
        let pause = descr.personality.get(PersonalityKey::Pause).cloned();
        let text = descr.description_string();
        if text.is_empty() {
            if let Some(pause) = pause {
                // A pause fragment still moves the prosody stack to its own
                // (usually empty) target, so open scopes close before the
                // break instead of swallowing it.
                adjust_prosody(&mut items, &mut stack, &numeric_target(descr));
                push_pause(&mut items, pause);
            }
            continue;
        }
        let target = numeric_target(descr);
        adjust_prosody(&mut items, &mut stack, &target);
        let join = descr
            .personality
            .get(PersonalityKey::Join)
            .map(|v| v.to_string());
        push_span(&mut items, descr.description_span(), join);
        if let Some(pause) = pause {
            push_pause(&mut items, pause);
        }
    }
    for (key, _) in stack.into_iter().rev() {
        items.push(MarkupItem::Close(key));
    }
    if clean_pause {
        while matches!(items.first(), Some(MarkupItem::Pause(_))) {
            items.remove(0);
        }
        while matches!(items.last(), Some(MarkupItem::Pause(_))) {
            items.pop();
        }
    }
    items
}

/// The numeric prosody a fragment asks for, in fixed key order.
fn numeric_target(descr: &Fragment) -> Vec<(PersonalityKey, f64)> {
    PersonalityKey::NUMERIC
        .into_iter()
        .filter_map(|key| {
            descr.personality.get(key).and_then(|v| v.as_num()).map(|n| (key, n))
        })
        .collect()
}

/// Close and open scopes so the stack matches `target`, keeping nesting
/// balanced: everything above the first mismatch closes in reverse order.
fn adjust_prosody(
    items: &mut Vec<MarkupItem>,
    stack: &mut Vec<(PersonalityKey, f64)>,
    target: &[(PersonalityKey, f64)],
) {
    let mut common = 0;
    while common < stack.len() && common < target.len() && stack[common] == target[common] {
        common += 1;
    }
    while stack.len() > common {
        let (key, _) = stack.pop().expect("stack longer than common prefix");
        items.push(MarkupItem::Close(key));
    }
    for &(key, value) in &target[common..] {
        items.push(MarkupItem::Open(key, value));
        stack.push((key, value));
    }
}

fn push_span(items: &mut Vec<MarkupItem>, span: Span, join: Option<String>) {
    if let Some(MarkupItem::Span { spans, join: last_join }) = items.last_mut() {
        if *last_join == join {
            spans.push(span);
            return;
        }
    }
    items.push(MarkupItem::Span { spans: vec![span], join });
}

fn push_pause(items: &mut Vec<MarkupItem>, pause: PersonalityValue) {
    if let Some(MarkupItem::Pause(existing)) = items.last_mut() {
        if let (Some(a), Some(b)) = (existing.as_num(), pause.as_num()) {
            *existing = PersonalityValue::Num(a + b);
        } else {
            *existing = pause;
        }
        return;
    }
    items.push(MarkupItem::Pause(pause));
}
