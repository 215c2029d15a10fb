use super::*;
use crate::model::Element;
use crate::test_support::document;
use crate::view::parse_markup;

fn texts(lines: &[Line<'static>]) -> Vec<String> {
    lines.iter().map(line_text).collect()
}

fn render(doc: &Document, width: usize) -> RenderResult {
    let focus = doc.first().map(Block::id).unwrap_or_default();
    render_document(
        doc,
        &Selection::at_start(focus),
        width,
        &[],
        &Theme::default(),
    )
}

// ============================================================================
// Model pane
// ============================================================================

#[test]
fn markers_follow_list_type_and_indent() {
    let doc = document(&[
        "* a",
        "  # b",
        "  # c",
        "    [x] d",
        "  e",
        "plain",
        "# f {listStart=3}",
        "# g",
        "<heading1> title",
    ]);
    let result = render(&doc, 80);
    assert_eq!(
        texts(&result.lines),
        [
            "• a",
            "┆ 1. b",
            "┆ 2. c",
            "┆ ┆ [x] d",
            "  e",
            "plain",
            "3. f",
            "4. g",
            "<heading1> title",
        ]
    );
    assert_eq!(result.total_lines, 9);
}

#[test]
fn numbering_restarts_after_a_type_change() {
    let doc = document(&["# a", "# b", "* c", "# d"]);
    assert_eq!(texts(&render(&doc, 80).lines), ["1. a", "2. b", "• c", "1. d"]);
}

#[test]
fn long_text_wraps_under_the_marker() {
    let doc = document(&["* abcdefghij"]);
    let block = doc.first().map(Block::id).unwrap_or_default();
    let result = render_document(
        &doc,
        &Selection::collapsed(Position::new(block, 6)),
        8,
        &[],
        &Theme::default(),
    );
    assert_eq!(texts(&result.lines), ["• abcdef", "  ghij"]);
    assert_eq!(result.cursor, Some(CursorVisualPosition { line: 1, column: 2 }));
    assert_eq!(
        result.position_at(Position::new(block, 10)),
        Some(CursorVisualPosition { line: 1, column: 6 })
    );
}

#[test]
fn soft_breaks_start_a_new_line() {
    let doc = Document::from_elements(vec![Element::paragraph("x\ny")]);
    let block = doc.first().map(Block::id).unwrap_or_default();
    let result = render(&doc, 80);
    assert_eq!(texts(&result.lines), ["x", "y"]);
    assert_eq!(
        result.position_at(Position::new(block, 1)),
        Some(CursorVisualPosition { line: 0, column: 1 })
    );
    assert_eq!(
        result.position_at(Position::new(block, 2)),
        Some(CursorVisualPosition { line: 1, column: 0 })
    );
}

#[test]
fn every_offset_has_a_caret_position() {
    let doc = document(&["* ab", "cd"]);
    let result = render(&doc, 80);
    assert_eq!(result.cursor_map.len(), 6);
    assert_eq!(result.cursor, Some(CursorVisualPosition { line: 0, column: 2 }));
}

#[test]
fn empty_document_renders_one_blank_line() {
    let result = render(&Document::new(), 80);
    assert_eq!(texts(&result.lines), [""]);
    assert_eq!(result.cursor, None);
}

// ============================================================================
// Markup pane
// ============================================================================

#[test]
fn markup_is_printed_as_an_indented_tree() {
    let fragment =
        parse_markup("<ul><li>a<ol start=\"3\"><li>b</li></ol></li></ul><p>x &amp; y</p>")
            .expect("valid markup");
    assert_eq!(
        texts(&render_markup(&fragment, &Theme::default())),
        [
            "<ul>",
            "  <li>",
            "    a",
            "    <ol start=\"3\">",
            "      <li>b</li>",
            "    </ol>",
            "  </li>",
            "</ul>",
            "<p>x &amp; y</p>",
        ]
    );
}

#[test]
fn classes_and_styles_follow_the_attributes() {
    let fragment = parse_markup(
        "<ul class=\"todo-list\"><li class=\"todo-list__checked\"><span class=\"ck-list-bogus-paragraph\">a</span></li></ul>",
    )
    .expect("valid markup");
    assert_eq!(
        texts(&render_markup(&fragment, &Theme::default())),
        [
            "<ul class=\"todo-list\">",
            "  <li class=\"todo-list__checked\">",
            "    <span class=\"ck-list-bogus-paragraph\">a</span>",
            "  </li>",
            "</ul>",
        ]
    );
}
