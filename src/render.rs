//! Rendering back-ends.
//!
//! Fragments are renderer-agnostic; this module folds a finished fragment
//! list into the requested output syntax:
//!
//! - `audio.rs`: the shared personality-markup layer — balanced prosody
//!   scopes, span merging, pause merging.
//! - `text.rs`: plain string output.
//! - `ssml.rs`: SSML-like tagged markup with prosody and break elements.
//! - `layout.rs`: the two-dimensional braille layout algebra.
//!
//! Dispatch is a closed match on [`OutputMode`]; renderers are plain structs
//! with no shared mutable state.

#[path = "render/audio.rs"]
mod audio;
#[path = "render/layout.rs"]
mod layout;
#[path = "render/ssml.rs"]
mod ssml;
#[path = "render/text.rs"]
mod text;

pub use audio::{personality_markup, MarkupItem};
pub use layout::LayoutRenderer;
pub use ssml::SsmlRenderer;
pub use text::StringRenderer;

use crate::api::{EngineFlags, OutputMode};
use crate::fragment::Fragment;

/// Render a fragment list in the given output mode.
pub fn render(descrs: &[Fragment], mode: OutputMode, flags: EngineFlags) -> String {
    let clean_pause = flags.contains(EngineFlags::CLEAN_PAUSE);
    match mode {
        OutputMode::Text => StringRenderer::new(" ").render(descrs, clean_pause),
        OutputMode::Ssml => SsmlRenderer::new().render(descrs, clean_pause),
        OutputMode::Layout => LayoutRenderer::new(flags).render(descrs),
    }
}
