//! Two-dimensional braille layout renderer.
//!
//! Consumes the layout markers the engine wraps around rule output and
//! assembles a rectangular block of braille cells. Every intermediate block
//! is rectangular: lines are padded on the right with the blank cell, and
//! blocks combined side by side are padded at the bottom first. Fractions
//! become three-line blocks with a horizontal bar; matrices, tables, case
//! constructs and Cayley tables align cells on per-column maximum widths.

use std::collections::BTreeMap;

use crate::api::EngineFlags;
use crate::engine::BLANK_CELL;
use crate::fragment::Fragment;

/// Horizontal fraction-bar cell.
const BAR_CELL: &str = "⠒";

/// First cell of the Cayley-table header bar.
const CAYLEY_BAR_START: &str = "⠐";

/// Number indicator, prefixed to all-digit fraction parts.
const NUMBER_PREFIX: &str = "⠼";

/// English-letter indicator, prefixed to all-letter fraction parts.
const ENGLISH_PREFIX: &str = "⠰";

const DIGIT_CELLS: &str = "⠂⠆⠒⠲⠢⠖⠶⠦⠔⠴";
const LETTER_CELLS: &str = "⠁⠃⠉⠙⠑⠋⠛⠓⠊⠚⠅⠇⠍⠝⠕⠏⠟⠗⠎⠞⠥⠧⠺⠭⠽⠵";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    All,
    Table,
    Cases,
    Cayley,
    Matrix,
    Cell,
    Row,
    Fraction,
    Numerator,
    Denominator,
    Relation,
    Operator,
    Other,
}

impl BlockKind {
    fn from_tag(tag: &str) -> BlockKind {
        match tag {
            "table" => BlockKind::Table,
            "cases" => BlockKind::Cases,
            "cayley" => BlockKind::Cayley,
            "matrix" => BlockKind::Matrix,
            "cell" => BlockKind::Cell,
            "row" => BlockKind::Row,
            "fraction" => BlockKind::Fraction,
            "numerator" => BlockKind::Numerator,
            "denominator" => BlockKind::Denominator,
            "rel" => BlockKind::Relation,
            "op" => BlockKind::Operator,
            _ => BlockKind::Other,
        }
    }

    fn is_grid(&self) -> bool {
        matches!(self, BlockKind::Table | BlockKind::Cases | BlockKind::Cayley | BlockKind::Matrix)
    }
}

#[derive(Debug)]
enum LayoutNode {
    Text(String),
    Element { kind: BlockKind, value: Option<u64>, children: Vec<LayoutNode> },
}

pub struct LayoutRenderer {
    flags: EngineFlags,
}

impl LayoutRenderer {
    pub fn new(flags: EngineFlags) -> LayoutRenderer {
        LayoutRenderer { flags }
    }

    pub fn render(&self, descrs: &[Fragment]) -> String {
        let root = parse(descrs);
        let ranks = relation_ranks(&root);
        rect(&self.process(&root, &ranks))
    }

    fn process(&self, node: &LayoutNode, ranks: &BTreeMap<u64, usize>) -> String {
        match node {
            LayoutNode::Text(text) => text.clone(),
            LayoutNode::Element { kind, value, children } => {
                if kind.is_grid() {
                    return self.handle_grid(children, *kind, ranks);
                }
                match kind {
                    BlockKind::Fraction => self.handle_fraction(children, ranks),
                    BlockKind::Numerator | BlockKind::Denominator => {
                        handle_fraction_part(&self.combine(children, ranks))
                    }
                    BlockKind::Relation | BlockKind::Operator => {
                        let content = self.combine(children, ranks);
                        match value {
                            Some(value)
                                if self.flags.contains(EngineFlags::LINEBREAKS)
                                    && ranks.contains_key(value) =>
                            {
                                format!("<br value=\"{}\"/>{content}", ranks[value])
                            }
                            _ => content,
                        }
                    }
                    _ => self.combine(children, ranks),
                }
            }
        }
    }

    fn combine(&self, children: &[LayoutNode], ranks: &BTreeMap<u64, usize>) -> String {
        let mut result = String::new();
        for child in children {
            result = combine_content(&result, &self.process(child, ranks));
        }
        result
    }

    /// Children are `[open, numerator, linear bar, denominator, close]`; the
    /// linear bar cell is dropped in favor of a drawn horizontal bar.
    fn handle_fraction(&self, children: &[LayoutNode], ranks: &BTreeMap<u64, usize>) -> String {
        let parts: Vec<String> = children.iter().map(|c| self.process(c, ranks)).collect();
        let [open, numerator, _, denominator, close] = match <[String; 5]>::try_from(parts) {
            Ok(parts) => parts,
            Err(parts) => return parts.iter().fold(String::new(), |a, b| combine_content(&a, b)),
        };
        let width = str_width(&numerator).max(str_width(&denominator));
        let bar = format!("{open}{}{close}", BAR_CELL.repeat(width));
        let top = margin(&center_cell(&numerator, width));
        let bottom = margin(&center_cell(&denominator, width));
        format!("{top}\n{bar}\n{bottom}")
    }

    fn handle_grid(
        &self,
        children: &[LayoutNode],
        kind: BlockKind,
        ranks: &BTreeMap<u64, usize>,
    ) -> String {
        let mut rows = self.assemble_rows(children, ranks);
        match kind {
            BlockKind::Table => {
                for row in &mut rows {
                    if row.len() >= 2 {
                        row.remove(0);
                        row.pop();
                    }
                }
            }
            BlockKind::Cases => {
                for row in &mut rows {
                    row.pop();
                }
            }
            _ => {}
        }
        if rows.is_empty() {
            return String::new();
        }
        let heights: Vec<usize> =
            rows.iter().map(|r| r.iter().map(|c| str_height(c)).max().unwrap_or(1)).collect();
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|j| rows.iter().filter_map(|r| r.get(j)).map(|c| str_width(c)).max().unwrap_or(0))
            .collect();
        let sep = if kind == BlockKind::Cayley && !self.cayley_short(&rows) {
            BLANK_CELL.repeat(2)
        } else {
            BLANK_CELL.to_string()
        };
        let mut lines: Vec<String> = Vec::new();
        let multi_height = heights.iter().any(|&h| h > 1);
        let sep_width = sep.chars().count();
        let total_width =
            widths.iter().sum::<usize>() + sep_width * columns.saturating_sub(1);
        for (i, row) in rows.iter().enumerate() {
            let height = heights[i];
            let padded: Vec<Vec<String>> = row
                .iter()
                .enumerate()
                .map(|(j, cell)| pad_cell(cell, height, widths[j]))
                .collect();
            for line in 0..height {
                let parts: Vec<&str> =
                    padded.iter().map(|cell| cell[line].as_str()).collect();
                lines.push(parts.join(&sep));
            }
            if kind == BlockKind::Cayley && i == 0 {
                let width = lines.last().map(|l| l.chars().count()).unwrap_or(1);
                lines.push(format!("{CAYLEY_BAR_START}{}", BAR_CELL.repeat(width.saturating_sub(1))));
            } else if multi_height && i + 1 < rows.len() {
                lines.push(BLANK_CELL.repeat(total_width));
            }
        }
        rect(&lines.join("\n"))
    }

    /// Cayley short form: separators stay single when enabled and the corner
    /// cell is blank.
    fn cayley_short(&self, rows: &[Vec<String>]) -> bool {
        self.flags.contains(EngineFlags::CAYLEY_SHORT)
            && rows
                .first()
                .and_then(|r| r.first())
                .map(|c| c == BLANK_CELL)
                .unwrap_or(false)
    }

    fn assemble_rows(
        &self,
        children: &[LayoutNode],
        ranks: &BTreeMap<u64, usize>,
    ) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for child in children {
            if let LayoutNode::Element { kind: BlockKind::Row, children, .. } = child {
                let mut cells = Vec::new();
                for cell in children {
                    match cell {
                        LayoutNode::Element { kind: BlockKind::Cell, children, .. } => {
                            cells.push(self.combine(children, ranks));
                        }
                        other => cells.push(self.process(other, ranks)),
                    }
                }
                rows.push(cells);
            }
        }
        rows
    }
}

/// Single-line all-digit parts get the number indicator, all-letter parts
/// the English-letter indicator; everything else passes through.
fn handle_fraction_part(content: &str) -> String {
    if str_height(content) != 1 || content.is_empty() {
        return content.to_string();
    }
    if content.chars().all(|c| DIGIT_CELLS.contains(c)) {
        return format!("{NUMBER_PREFIX}{content}");
    }
    if content.chars().all(|c| LETTER_CELLS.contains(c)) {
        return format!("{ENGLISH_PREFIX}{content}");
    }
    content.to_string()
}

fn parse(descrs: &[Fragment]) -> LayoutNode {
    let mut stack: Vec<(BlockKind, Option<u64>, Vec<LayoutNode>)> =
        vec![(BlockKind::All, None, Vec::new())];
    for descr in descrs {
        if descr.layout.is_empty() {
            let text = descr.description_string();
            if !text.is_empty() {
                stack.last_mut().expect("root frame always present").2.push(LayoutNode::Text(text));
            }
            continue;
        }
        let Some(caps) = regex!(r"^(begin|end)([a-z]*?)(\d*)$").captures(&descr.layout) else {
            continue;
        };
        let kind = BlockKind::from_tag(&caps[2]);
        let value = caps[3].parse::<u64>().ok();
        if &caps[1] == "begin" {
            stack.push((kind, value, Vec::new()));
        } else if stack.len() > 1 {
            let (kind, value, children) = stack.pop().expect("stack has a closable frame");
            stack
                .last_mut()
                .expect("root frame always present")
                .2
                .push(LayoutNode::Element { kind, value, children });
        }
    }
    while stack.len() > 1 {
        let (kind, value, children) = stack.pop().expect("stack is non-empty");
        stack
            .last_mut()
            .expect("root frame always present")
            .2
            .push(LayoutNode::Element { kind, value, children });
    }
    let (kind, value, children) = stack.pop().expect("root frame always present");
    LayoutNode::Element { kind, value, children }
}

/// 1-based linebreak ranks over the distinct relation/operator values, in
/// ascending value order.
fn relation_ranks(root: &LayoutNode) -> BTreeMap<u64, usize> {
    let mut values = Vec::new();
    collect_relation_values(root, &mut values);
    values.sort_unstable();
    values.dedup();
    values.into_iter().enumerate().map(|(i, v)| (v, i + 1)).collect()
}

fn collect_relation_values(node: &LayoutNode, values: &mut Vec<u64>) {
    if let LayoutNode::Element { kind, value, children } = node {
        if matches!(kind, BlockKind::Relation | BlockKind::Operator) {
            if let Some(value) = value {
                values.push(*value);
            }
        }
        for child in children {
            collect_relation_values(child, values);
        }
    }
}

fn str_height(s: &str) -> usize {
    if s.is_empty() { 0 } else { s.lines().count() }
}

fn str_width(s: &str) -> usize {
    s.lines().map(|l| l.chars().count()).max().unwrap_or(0)
}

/// Pad every line on the right with blank cells to the block width (or `w`
/// when larger).
fn pad_width(s: &str, w: usize) -> String {
    let width = str_width(s).max(w);
    s.lines()
        .map(|line| format!("{line}{}", BLANK_CELL.repeat(width - line.chars().count())))
        .collect::<Vec<String>>()
        .join("\n")
}

/// A grid cell as lines, padded to exactly `height` lines of `width` cells.
fn pad_cell(cell: &str, height: usize, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = pad_width(cell, width).lines().map(|l| l.to_string()).collect();
    while lines.len() < height {
        lines.push(BLANK_CELL.repeat(width));
    }
    lines
}

/// Pad a block at the bottom with blank lines to height `h`.
fn pad_height(s: &str, h: usize) -> String {
    let height = str_height(s);
    if height >= h {
        return s.to_string();
    }
    let width = str_width(s);
    let mut lines: Vec<String> = s.lines().map(|l| l.to_string()).collect();
    for _ in height..h {
        lines.push(BLANK_CELL.repeat(width));
    }
    lines.join("\n")
}

fn rect(s: &str) -> String {
    pad_width(s, 0)
}

/// Combine two blocks side by side, bottom-padding the shorter one.
fn combine_content(a: &str, b: &str) -> String {
    if a.is_empty() {
        return b.to_string();
    }
    if b.is_empty() {
        return a.to_string();
    }
    let ha = str_height(a);
    let hb = str_height(b);
    if ha == 1 && hb == 1 {
        return format!("{a}{b}");
    }
    let h = ha.max(hb);
    let a = pad_width(&pad_height(a, h), 0);
    let b = pad_width(&pad_height(b, h), 0);
    a.lines()
        .zip(b.lines())
        .map(|(la, lb)| format!("{la}{lb}"))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Center a block inside `width`, extra cell going to the right.
fn center_cell(cell: &str, width: usize) -> String {
    let cell_width = str_width(cell);
    if cell_width >= width {
        return rect(cell);
    }
    let left = (width - cell_width) / 2;
    let right = width - cell_width - left;
    pad_width(cell, 0)
        .lines()
        .map(|line| format!("{}{line}{}", BLANK_CELL.repeat(left), BLANK_CELL.repeat(right)))
        .collect::<Vec<String>>()
        .join("\n")
}

/// One blank-cell margin on both sides of every line.
fn margin(block: &str) -> String {
    pad_width(block, 0)
        .lines()
        .map(|line| format!("{BLANK_CELL}{line}{BLANK_CELL}"))
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(layout: &str) -> Fragment {
        Fragment::layout_marker(layout)
    }

    fn text(t: &str) -> Fragment {
        Fragment::text_only(t)
    }

    fn fraction_descrs(num: &str, den: &str) -> Vec<Fragment> {
        vec![
            marker("beginfraction"),
            text("⠹"),
            marker("beginnumerator"),
            text(num),
            marker("endnumerator"),
            text("⠌"),
            marker("begindenominator"),
            text(den),
            marker("enddenominator"),
            text("⠼"),
            marker("endfraction"),
        ]
    }

    #[test]
    fn fraction_renders_as_three_lines() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let out = renderer.render(&fraction_descrs("⠂", "⠆"));
        assert_eq!(out, "⠀⠼⠂⠀\n⠹⠒⠒⠼\n⠀⠼⠆⠀");
    }

    #[test]
    fn fraction_centers_the_narrow_part() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let out = renderer.render(&fraction_descrs("⠂", "⠆⠒⠲"));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        // All lines share the bar width.
        assert!(lines.iter().all(|l| l.chars().count() == 6));
        assert_eq!(lines[1], "⠹⠒⠒⠒⠒⠼");
        assert_eq!(lines[0], "⠀⠀⠼⠂⠀⠀");
    }

    #[test]
    fn all_letter_fraction_part_gets_letter_prefix() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let out = renderer.render(&fraction_descrs("⠭", "⠽"));
        assert_eq!(out.lines().next().unwrap(), "⠀⠰⠭⠀");
    }

    fn grid_descrs(tag: &str, rows: &[&[&str]]) -> Vec<Fragment> {
        let mut descrs = vec![marker(&format!("begin{tag}"))];
        for row in rows {
            descrs.push(marker("beginrow"));
            for cell in *row {
                descrs.push(marker("begincell"));
                descrs.push(text(cell));
                descrs.push(marker("endcell"));
            }
            descrs.push(marker("endrow"));
        }
        descrs.push(marker(&format!("end{tag}")));
        descrs
    }

    #[test]
    fn matrix_aligns_columns_on_max_width() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let out = renderer.render(&grid_descrs("matrix", &[&["⠂", "⠆⠒"], &["⠲⠢", "⠖"]]));
        assert_eq!(out, "⠂⠀⠀⠆⠒\n⠲⠢⠀⠖⠀");
    }

    #[test]
    fn table_strips_outer_fence_cells() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let out = renderer.render(&grid_descrs("table", &[&["⠳", "⠂", "⠳"], &["⠳", "⠆", "⠳"]]));
        assert_eq!(out, "⠂\n⠆");
    }

    #[test]
    fn cases_strip_the_last_cell() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let out = renderer.render(&grid_descrs("cases", &[&["⠂", "⠳"], &["⠆", "⠳"]]));
        assert_eq!(out, "⠂\n⠆");
    }

    #[test]
    fn cayley_gets_header_bar_and_doubled_separator() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let out = renderer.render(&grid_descrs("cayley", &[&["⠂", "⠆"], &["⠒", "⠲"]]));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "⠂⠀⠀⠆");
        assert_eq!(lines[1], "⠐⠒⠒⠒");
        assert_eq!(lines[2], "⠒⠀⠀⠲");
    }

    #[test]
    fn multi_height_cells_are_bottom_padded() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let mut descrs = vec![marker("beginmatrix"), marker("beginrow"), marker("begincell")];
        descrs.extend(fraction_descrs("⠂", "⠆"));
        descrs.push(marker("endcell"));
        descrs.push(marker("begincell"));
        descrs.push(text("⠖"));
        descrs.push(marker("endcell"));
        descrs.push(marker("endrow"));
        descrs.push(marker("endmatrix"));
        let out = renderer.render(&descrs);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "⠀⠼⠂⠀⠀⠖");
        // The single-cell column is padded down to the fraction's height.
        assert_eq!(lines[2], "⠀⠼⠆⠀⠀⠀");
    }

    #[test]
    fn multi_height_rows_are_separated_by_a_full_width_blank_line() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let mut descrs = vec![marker("beginmatrix"), marker("beginrow"), marker("begincell")];
        descrs.extend(fraction_descrs("⠂", "⠆"));
        descrs.push(marker("endcell"));
        descrs.push(marker("endrow"));
        descrs.push(marker("beginrow"));
        descrs.push(marker("begincell"));
        descrs.push(text("⠖"));
        descrs.push(marker("endcell"));
        descrs.push(marker("endrow"));
        descrs.push(marker("endmatrix"));
        let out = renderer.render(&descrs);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3], "⠀⠀⠀⠀");
        assert!(lines.iter().all(|l| l.chars().count() == 4));
    }

    #[test]
    fn relation_linebreak_ranks_are_one_based() {
        let flags = EngineFlags::LINEBREAKS;
        let renderer = LayoutRenderer::new(flags);
        let descrs = vec![
            text("⠂"),
            marker("beginrel7"),
            text("⠿"),
            marker("endrel7"),
            text("⠆"),
            marker("beginrel9"),
            text("⠿"),
            marker("endrel9"),
            text("⠒"),
        ];
        let out = renderer.render(&descrs);
        assert_eq!(out, "⠂<br value=\"1\"/>⠿⠆<br value=\"2\"/>⠿⠒");
    }

    #[test]
    fn without_linebreaks_relations_render_plain() {
        let renderer = LayoutRenderer::new(EngineFlags::empty());
        let descrs =
            vec![text("⠂"), marker("beginrel7"), text("⠿"), marker("endrel7"), text("⠆")];
        assert_eq!(renderer.render(&descrs), "⠂⠿⠆");
    }
}
