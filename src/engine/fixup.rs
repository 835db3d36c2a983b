//! Annotation-driven fragment post-processing.
//!
//! Runs after a full evaluation pass, on the flat fragment list. The only
//! built-in pass is the punctuation fix-up: a single-cell punctuation mark
//! that follows ordinary text is ambiguous in braille output, so it gets the
//! punctuation-indicator prefix. Marks following other punctuation or the
//! blank filler cell stay bare.

use crate::fragment::{Fragment, FragmentList};

/// Braille cells that double as punctuation and need disambiguation.
pub(crate) const PUNCTUATION_MARKS: [&str; 6] = ["⠆", "⠒", "⠲", "⠦", "⠴", "⠄"];

/// The punctuation-indicator prefix cell.
const PUNCTUATION_PREFIX: char = '⠸';

/// The blank filler cell used by the layout renderer for padding.
pub(crate) const BLANK_CELL: &str = "⠀";

/// Apply annotation-driven fix-ups over a finished fragment list.
pub fn process_annotations(descrs: Vec<Fragment>) -> Vec<Fragment> {
    let mut list = FragmentList::from_vec(descrs);
    for idx in list.annotations() {
        if list.get(idx).annotation == "punctuation" {
            punctuate(&mut list, idx);
        }
    }
    list.into_vec()
}

fn punctuate(list: &mut FragmentList, idx: usize) {
    let Some(prev) = list.prev_text(idx) else {
        return;
    };
    let before = list.get(prev);
    if before.annotation == "punctuation" || before.text == BLANK_CELL {
        return;
    }
    let text = &list.get(idx).text;
    if text.chars().count() == 1 && PUNCTUATION_MARKS.contains(&text.as_str()) {
        let prefixed = format!("{PUNCTUATION_PREFIX}{text}");
        list.get_mut(idx).text = prefixed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn punct(text: &str) -> Fragment {
        Fragment { text: text.to_string(), annotation: "punctuation".to_string(), ..Fragment::default() }
    }

    #[test]
    fn mark_after_text_gets_indicator() {
        let out = process_annotations(vec![Fragment::text_only("⠭"), punct("⠆")]);
        assert_eq!(out[1].text, "⠸⠆");
    }

    #[test]
    fn leading_mark_stays_bare() {
        let out = process_annotations(vec![punct("⠆"), Fragment::text_only("⠭")]);
        assert_eq!(out[0].text, "⠆");
    }

    #[test]
    fn mark_after_punctuation_stays_bare() {
        let out = process_annotations(vec![Fragment::text_only("⠭"), punct("⠆"), punct("⠒")]);
        assert_eq!(out[1].text, "⠸⠆");
        assert_eq!(out[2].text, "⠒");
    }

    #[test]
    fn mark_after_blank_filler_stays_bare() {
        let out = process_annotations(vec![Fragment::text_only(BLANK_CELL), punct("⠲")]);
        assert_eq!(out[1].text, "⠲");
    }

    #[test]
    fn multi_cell_text_is_untouched() {
        let out = process_annotations(vec![Fragment::text_only("⠭"), punct("⠆⠆")]);
        assert_eq!(out[1].text, "⠆⠆");
    }
}
