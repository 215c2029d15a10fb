//! Terminal rendering of the flat model and of the editing view.

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::list::utils::is_first_block_of_list_item;
use crate::list::{LIST_START, ListType, TODO_LIST_CHECKED};
use crate::model::{AttributeValue, Block, BlockId, Document, Position, Selection};
use crate::theme::Theme;
use crate::view::{ViewElement, ViewFragment, ViewNode, to_markup};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    /// Every caret position of the document and where it is drawn.
    pub cursor_map: Vec<(Position, CursorVisualPosition)>,
}

impl RenderResult {
    pub fn position_at(&self, target: Position) -> Option<CursorVisualPosition> {
        self.cursor_map
            .iter()
            .find(|(position, _)| *position == target)
            .map(|(_, visual)| *visual)
    }
}

/// Renders the model one block per paragraph, list blocks with their marker and
/// indent guides. Blocks in `highlighted` get the re-converted background.
pub fn render_document(
    document: &Document,
    selection: &Selection,
    width: usize,
    highlighted: &[BlockId],
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer::new(width.max(8), theme);
    for block in document.blocks() {
        renderer.render_block(document, block, highlighted.contains(&block.id()));
    }
    renderer.finish(selection.focus)
}

struct Renderer<'a> {
    wrap_width: usize,
    theme: &'a Theme,
    lines: Vec<Line<'static>>,
    cursor_map: Vec<(Position, CursorVisualPosition)>,
    counters: Vec<Option<(ListType, i64)>>,
    marker_widths: Vec<usize>,
}

impl<'a> Renderer<'a> {
    fn new(wrap_width: usize, theme: &'a Theme) -> Self {
        Self {
            wrap_width,
            theme,
            lines: Vec::new(),
            cursor_map: Vec::new(),
            counters: Vec::new(),
            marker_widths: Vec::new(),
        }
    }

    fn render_block(&mut self, document: &Document, block: &Block, highlighted: bool) {
        let mut prefix = Vec::new();
        match block.as_list_block() {
            Some(list) => {
                let indent = list.indent();
                for _ in 0..indent {
                    prefix.push(Span::styled("┆ ", self.theme.indent_guide_style()));
                }
                let marker = if is_first_block_of_list_item(document, block.id()) {
                    let marker = self.item_marker(block, indent, list.list_type());
                    self.marker_widths.truncate(indent);
                    self.marker_widths.resize(indent + 1, 0);
                    self.marker_widths[indent] = visible_width(&marker);
                    marker
                } else {
                    self.counters.truncate(indent + 1);
                    let width = self.marker_widths.get(indent).copied().unwrap_or(2);
                    " ".repeat(width)
                };
                prefix.push(Span::styled(marker, self.theme.marker_style()));
            }
            None => {
                self.counters.clear();
                self.marker_widths.clear();
                if block.name() != "paragraph" {
                    prefix.push(Span::styled(
                        format!("<{}> ", block.name()),
                        self.theme.block_name_style(),
                    ));
                }
            }
        }

        let mut style = self.theme.text_style();
        if highlighted {
            style = style.patch(self.theme.reconverted_style());
        }
        if block.name().starts_with("heading") {
            style = style.add_modifier(Modifier::BOLD);
        }
        self.push_text(block, prefix, style);
    }

    fn item_marker(&mut self, block: &Block, indent: usize, list_type: Option<ListType>) -> String {
        self.counters.truncate(indent + 1);
        self.counters.resize(indent + 1, None);
        match list_type {
            Some(ListType::Numbered) => {
                let number = match self.counters[indent] {
                    Some((ListType::Numbered, previous)) => previous + 1,
                    _ => block
                        .attribute(LIST_START)
                        .and_then(AttributeValue::as_integer)
                        .unwrap_or(1),
                };
                self.counters[indent] = Some((ListType::Numbered, number));
                format!("{number}. ")
            }
            Some(ListType::Todo) => {
                self.counters[indent] = Some((ListType::Todo, 0));
                if block.attribute(TODO_LIST_CHECKED) == Some(&AttributeValue::Boolean(true)) {
                    "[x] ".to_string()
                } else {
                    "[ ] ".to_string()
                }
            }
            Some(ListType::Bulleted) => {
                self.counters[indent] = Some((ListType::Bulleted, 0));
                "• ".to_string()
            }
            None => {
                self.counters[indent] = None;
                "? ".to_string()
            }
        }
    }

    /// Lays out the text of one block, wrapping at the available width and at
    /// soft breaks, and records a caret position for every offset.
    fn push_text(&mut self, block: &Block, prefix: Vec<Span<'static>>, style: Style) {
        let prefix_width: usize = prefix
            .iter()
            .map(|span| visible_width(span.content.as_ref()))
            .sum();
        let continuation = " ".repeat(prefix_width);

        let mut spans = prefix;
        let mut current = String::new();
        let mut column = prefix_width;

        for (offset, ch) in block.text().chars().enumerate() {
            let char_width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if ch != '\n' && column > prefix_width && column + char_width > self.wrap_width {
                self.break_line(&mut spans, &mut current, style, &continuation);
                column = prefix_width;
            }
            self.record(block.id(), offset, column);
            if ch == '\n' {
                self.break_line(&mut spans, &mut current, style, &continuation);
                column = prefix_width;
                continue;
            }
            current.push(ch);
            column += char_width;
        }
        self.record(block.id(), block.len(), column);

        if !current.is_empty() {
            spans.push(Span::styled(current, style));
        }
        self.lines.push(Line::from(spans));
    }

    fn break_line(
        &mut self,
        spans: &mut Vec<Span<'static>>,
        current: &mut String,
        style: Style,
        continuation: &str,
    ) {
        if !current.is_empty() {
            spans.push(Span::styled(std::mem::take(current), style));
        }
        self.lines.push(Line::from(std::mem::take(spans)));
        if !continuation.is_empty() {
            spans.push(Span::raw(continuation.to_string()));
        }
    }

    fn record(&mut self, block: BlockId, offset: usize, column: usize) {
        let position = CursorVisualPosition {
            line: self.lines.len(),
            column: u16::try_from(column).unwrap_or(u16::MAX),
        };
        self.cursor_map.push((Position::new(block, offset), position));
    }

    fn finish(mut self, focus: Position) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        let cursor = self
            .cursor_map
            .iter()
            .find(|(position, _)| *position == focus)
            .map(|(_, visual)| *visual);
        RenderResult {
            lines: self.lines,
            cursor,
            total_lines,
            cursor_map: self.cursor_map,
        }
    }
}

/// Pretty-prints view markup as an indented tree. Elements holding only text stay
/// on one line.
pub fn render_markup(fragment: &ViewFragment, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for node in &fragment.children {
        push_node(&mut lines, node, 0, theme);
    }
    if lines.is_empty() {
        lines.push(Line::from(""));
    }
    lines
}

fn push_node(lines: &mut Vec<Line<'static>>, node: &ViewNode, depth: usize, theme: &Theme) {
    let indent = Span::raw("  ".repeat(depth));
    match node {
        ViewNode::Text(text) => {
            if !text.trim().is_empty() {
                lines.push(Line::from(vec![
                    indent,
                    Span::styled(to_markup(std::slice::from_ref(node)), theme.text_style()),
                ]));
            }
        }
        ViewNode::Element(element) => {
            let inline = element
                .children
                .iter()
                .all(|child| matches!(child, ViewNode::Text(_)));
            let mut spans = vec![indent.clone()];
            spans.extend(open_tag(element, theme));
            if inline {
                spans.push(Span::styled(to_markup(&element.children), theme.text_style()));
                spans.push(close_tag(element, theme));
                lines.push(Line::from(spans));
                return;
            }
            lines.push(Line::from(spans));
            for child in &element.children {
                push_node(lines, child, depth + 1, theme);
            }
            lines.push(Line::from(vec![indent, close_tag(element, theme)]));
        }
    }
}

fn open_tag(element: &ViewElement, theme: &Theme) -> Vec<Span<'static>> {
    let mut spans = vec![Span::styled(format!("<{}", element.name), theme.tag_style())];
    for (key, value) in &element.attributes {
        spans.push(Span::styled(
            format!(" {key}=\"{value}\""),
            theme.attribute_style(),
        ));
    }
    if !element.classes.is_empty() {
        let classes: Vec<&str> = element.classes.iter().map(String::as_str).collect();
        spans.push(Span::styled(
            format!(" class=\"{}\"", classes.join(" ")),
            theme.attribute_style(),
        ));
    }
    if !element.styles.is_empty() {
        let styles: Vec<String> = element
            .styles
            .iter()
            .map(|(property, value)| format!("{property}:{value}"))
            .collect();
        spans.push(Span::styled(
            format!(" style=\"{}\"", styles.join(";")),
            theme.attribute_style(),
        ));
    }
    spans.push(Span::styled(">", theme.tag_style()));
    spans
}

fn close_tag(element: &ViewElement, theme: &Theme) -> Span<'static> {
    Span::styled(format!("</{}>", element.name), theme.tag_style())
}

pub fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
