//! SSML-like markup renderer.
//!
//! Prosody offsets live in the interval [-2, 2] and scale linearly to
//! [-100, 100] percent. Pitch and rate carry a percent sign; volume does
//! not. Pauses become `<break>` elements; named pauses map to fixed
//! durations.

use crate::fragment::{Fragment, PersonalityKey, PersonalityValue};

use super::audio::{personality_markup, MarkupItem};

const PAUSE_SHORT: u64 = 250;
const PAUSE_MEDIUM: u64 = 500;
const PAUSE_LONG: u64 = 750;

pub struct SsmlRenderer {
    separator: String,
}

impl SsmlRenderer {
    pub fn new() -> SsmlRenderer {
        SsmlRenderer { separator: " ".to_string() }
    }

    pub fn render(&self, descrs: &[Fragment], clean_pause: bool) -> String {
        let mut out = Vec::new();
        for item in personality_markup(descrs, clean_pause) {
            match item {
                MarkupItem::Open(key, value) => out.push(prosody_element(key, value)),
                MarkupItem::Close(_) => out.push("</prosody>".to_string()),
                MarkupItem::Pause(value) => {
                    out.push(format!("<break time=\"{}ms\"/>", pause_ms(&value)));
                }
                MarkupItem::Span { spans, join } => {
                    let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
                    let sep = join.as_deref().unwrap_or(&self.separator);
                    out.push(texts.join(sep));
                }
            }
        }
        format!("<speak>{}</speak>", out.join(&self.separator))
    }
}

impl Default for SsmlRenderer {
    fn default() -> Self {
        SsmlRenderer::new()
    }
}

fn prosody_element(key: PersonalityKey, value: f64) -> String {
    let scaled = scale(value);
    let sign = if scaled < 0.0 { "" } else { "+" };
    let unit = if key == PersonalityKey::Volume { "" } else { "%" };
    format!("<prosody {}=\"{sign}{scaled}{unit}\">", key.name())
}

/// Linear map from [-2, 2] to [-100, 100], clamped, two decimals.
fn scale(value: f64) -> f64 {
    let clamped = value.clamp(-2.0, 2.0);
    (clamped * 50.0 * 100.0).round() / 100.0
}

fn pause_ms(value: &PersonalityValue) -> u64 {
    match value {
        PersonalityValue::Num(n) => n.max(0.0) as u64,
        PersonalityValue::Str(name) => match name.as_str() {
            "short" => PAUSE_SHORT,
            "medium" => PAUSE_MEDIUM,
            "long" => PAUSE_LONG,
            _ => PAUSE_SHORT,
        },
    }
}
