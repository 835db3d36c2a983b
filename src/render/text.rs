//! Plain-string renderer.
//!
//! Drops prosody scopes and pauses; spans merge on their `join` separator
//! when the fragments carried one, otherwise on the renderer separator.

use crate::fragment::Fragment;

use super::audio::{personality_markup, MarkupItem};

pub struct StringRenderer {
    separator: String,
}

impl StringRenderer {
    pub fn new(separator: impl Into<String>) -> StringRenderer {
        StringRenderer { separator: separator.into() }
    }

    pub fn render(&self, descrs: &[Fragment], clean_pause: bool) -> String {
        let mut chunks = Vec::new();
        for item in personality_markup(descrs, clean_pause) {
            if let MarkupItem::Span { spans, join } = item {
                let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
                let sep = join.as_deref().unwrap_or(&self.separator);
                chunks.push(texts.join(sep));
            }
        }
        chunks.join(&self.separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{PersonalityKey, PersonalityValue};

    #[test]
    fn joins_spans_with_separator() {
        let descrs = vec![Fragment::text_only("one"), Fragment::text_only("half")];
        assert_eq!(StringRenderer::new(" ").render(&descrs, false), "one half");
    }

    #[test]
    fn join_personality_overrides_separator() {
        let mut a = Fragment::text_only("x");
        a.personality.set(PersonalityKey::Join, PersonalityValue::Str(String::new()));
        let mut b = Fragment::text_only("y");
        b.personality.set(PersonalityKey::Join, PersonalityValue::Str(String::new()));
        assert_eq!(StringRenderer::new(" ").render(&[a, b], false), "xy");
    }

    #[test]
    fn context_prefixes_text() {
        let mut descr = Fragment::text_only("1");
        descr.context = "item 1".to_string();
        assert_eq!(StringRenderer::new(" ").render(&[descr], false), "item 1 1");
    }
}
