use super::*;
use crate::list::strategies::{TodoCheckedStrategy, TodoListStrategy};
use crate::list::{SequentialIds, TODO_LIST_CHECKED};
use crate::model::Model;
use crate::test_support::{block_id, document, raw_model, stringify, stringify_with_ids};
use crate::view::parse_markup;

fn todo_strategies() -> (Schema, StrategyRegistry) {
    let mut schema = Schema::default();
    schema.register_list_attribute(TODO_LIST_CHECKED);
    let mut strategies = StrategyRegistry::new();
    strategies
        .register(Box::new(TodoListStrategy))
        .expect("todo list strategy");
    strategies
        .register(Box::new(TodoCheckedStrategy))
        .expect("todo checked strategy");
    (schema, strategies)
}

fn render(lines: &[&str], mode: RenderMode) -> String {
    let (schema, strategies) = todo_strategies();
    let ctx = ConversionContext {
        schema: &schema,
        strategies: &strategies,
        mode,
    };
    downcast(&document(lines), &ctx).to_markup()
}

fn data(lines: &[&str]) -> String {
    render(lines, RenderMode::Data)
}

fn upcast_markup(markup: &str) -> Document {
    let (_, strategies) = todo_strategies();
    let fragment = parse_markup(markup).expect("valid markup");
    Document::from_elements(upcast(&fragment, &SequentialIds::new("u"), &strategies))
}

// ============================================================================
// Downcast
// ============================================================================

#[test]
fn flat_list_renders_one_list_element() {
    assert_eq!(data(&["* a", "* b"]), "<ul><li>a</li><li>b</li></ul>");
}

#[test]
fn nested_items_render_inside_their_parent_item() {
    assert_eq!(
        data(&["* a", "  * b", "    # c", "* d"]),
        "<ul><li>a<ul><li>b<ol><li>c</li></ol></li></ul></li><li>d</li></ul>"
    );
}

#[test]
fn multi_block_items_keep_their_paragraphs() {
    assert_eq!(
        data(&["* a", "  b", "  * c", "  d"]),
        "<ul><li><p>a</p><p>b</p><ul><li>c</li></ul><p>d</p></li></ul>"
    );
}

#[test]
fn list_type_change_starts_a_new_list_element() {
    assert_eq!(
        data(&["* a", "# b", "plain", "* c"]),
        "<ul><li>a</li></ul><ol><li>b</li></ol><p>plain</p><ul><li>c</li></ul>"
    );
}

#[test]
fn bogus_paragraph_is_a_span_while_editing() {
    assert_eq!(
        render(&["* a"], RenderMode::Editing),
        "<ul><li><span class=\"ck-list-bogus-paragraph\">a</span></li></ul>"
    );
}

#[test]
fn extra_attributes_and_other_blocks_are_never_bogus() {
    assert_eq!(
        data(&["* a {alignment=left}", "* <heading1> t", "* <imageBlock>"]),
        "<ul><li><p>a</p></li><li><h1>t</h1></li><li><figure class=\"image\"></figure></li></ul>"
    );
}

#[test]
fn empty_bogus_paragraph_leaves_an_empty_item() {
    assert_eq!(data(&["* <paragraph>"]), "<ul><li></li></ul>");
}

#[test]
fn strategies_decorate_the_wrappers() {
    assert_eq!(
        data(&["[x] a", "[ ] b"]),
        "<ul class=\"todo-list\"><li class=\"todo-list__checked\">a</li><li>b</li></ul>"
    );
}

#[test]
fn wrappers_run_from_the_outermost_list_inward() {
    let doc = document(&["* a", "  # b", "    * c"]);
    let strategies = StrategyRegistry::new();
    let c = doc.block_at(2).expect("block");
    let wrappers = block_wrappers(&doc, c, &strategies);
    let shape: Vec<(&str, &str)> = wrappers
        .iter()
        .map(|level| (level.list.name.as_str(), level.item_id.as_str()))
        .collect();
    assert_eq!(shape, [("ul", "i0"), ("ol", "i1"), ("ul", "i2")]);

    let plain = document(&["plain"]);
    let block = plain.block_at(0).expect("block");
    assert!(block_wrappers(&plain, block, &strategies).is_empty());
}

// ============================================================================
// Upcast
// ============================================================================

#[test]
fn nested_lists_become_indents() {
    let doc = upcast_markup("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>");
    assert_eq!(
        stringify_with_ids(&doc),
        ["* a {id=u0}", "  * b {id=u1}", "* c {id=u2}"]
    );
}

#[test]
fn item_starting_with_a_nested_list_keeps_an_empty_block() {
    let doc = upcast_markup("<ul><li><ol><li>b</li></ol></li></ul>");
    assert_eq!(stringify(&doc), ["* <paragraph>", "  # b"]);

    let doc = upcast_markup("<ol><li></li></ol>");
    assert_eq!(stringify(&doc), ["# <paragraph>"]);
}

#[test]
fn lists_nested_directly_in_a_list_keep_their_items() {
    let doc = upcast_markup("<ul><li>a</li><ul><li>b</li></ul><li>c</li></ul>");
    assert_eq!(stringify(&doc), ["* a", "  * b", "* c"]);

    let doc = upcast_markup("<ol><ul><li>b</li></ul><li>c</li></ol>");
    assert_eq!(stringify(&doc), ["# <paragraph>", "  * b", "# c"]);
}

#[test]
fn loose_text_in_a_list_becomes_an_item() {
    let doc = upcast_markup("<ul>\n  <li>a</li>\n  b <em>c</em>\n  <li>d</li>\n</ul>");
    assert_eq!(
        stringify_with_ids(&doc),
        ["* a {id=u0}", "* b c {id=u1}", "* d {id=u2}"]
    );
}

#[test]
fn block_content_of_an_item_shares_its_id() {
    let doc = upcast_markup("<ul><li><p>a</p><h2>b</h2><ul><li>c</li></ul>d</li></ul>");
    assert_eq!(
        stringify_with_ids(&doc),
        ["* a {id=u0}", "  <heading2> b {id=u0}", "  * c {id=u1}", "  d {id=u0}"]
    );
}

#[test]
fn content_outside_lists_is_kept_as_blocks() {
    let doc = upcast_markup("<h2>Title</h2>\n<p>text</p>\n<div>more <b>bold</b></div><hr/>");
    assert_eq!(
        stringify(&doc),
        ["<heading2> Title", "text", "more bold", "<horizontalLine>"]
    );
}

#[test]
fn editing_markup_reads_back() {
    let doc = upcast_markup(
        "<ul class=\"todo-list\">\n  <li class=\"todo-list__checked\"><span class=\"ck-list-bogus-paragraph\">a</span></li>\n  <li>b</li>\n</ul>",
    );
    assert_eq!(stringify(&doc), ["[x] a", "[ ] b"]);
}

#[test]
fn downcast_then_upcast_reproduces_the_model() {
    let lines = [
        "* a",
        "  b",
        "  * c",
        "    # d",
        "  e",
        "# f",
        "plain",
        "[x] g",
        "  h",
        "[ ] i",
        "<heading1> end",
    ];
    for mode in [RenderMode::Data, RenderMode::Editing] {
        let markup = render(&lines, mode);
        let doc = upcast_markup(&markup);
        assert_eq!(stringify(&doc), lines, "round trip in {mode:?} mode");
    }
}

// ============================================================================
// Editing view
// ============================================================================

struct Harness {
    model: Model,
    schema: Schema,
    strategies: StrategyRegistry,
    view: EditingView,
}

impl Harness {
    fn new(lines: &[&str]) -> Self {
        let model = raw_model(lines);
        let (schema, strategies) = todo_strategies();
        let mut view = EditingView::new(RenderMode::Editing);
        view.render_all(model.document(), &schema, &strategies);
        Self {
            model,
            schema,
            strategies,
            view,
        }
    }

    fn change(&mut self, f: impl FnOnce(&mut crate::model::Writer<'_>)) -> Vec<usize> {
        self.model.change(f);
        let changes = self.model.take_changes();
        let reconverted =
            self.view
                .apply_changes(self.model.document(), &self.schema, &self.strategies, &changes);
        reconverted
            .iter()
            .filter_map(|block| self.model.document().index_of(*block))
            .collect()
    }

    fn assert_matches_fresh_render(&self) {
        let ctx = ConversionContext {
            schema: &self.schema,
            strategies: &self.strategies,
            mode: RenderMode::Editing,
        };
        assert_eq!(
            self.view.to_markup(self.model.document()),
            downcast(self.model.document(), &ctx).to_markup()
        );
    }
}

#[test]
fn type_change_re_renders_the_nested_items() {
    let mut harness = Harness::new(&["* a", "  * b", "* c"]);
    let a = block_id(harness.model.document(), 0);
    let reconverted = harness.change(|writer| writer.set_attribute(LIST_TYPE, "numbered", a));

    assert_eq!(reconverted, [1]);
    assert_eq!(
        harness.view.to_markup(harness.model.document()),
        "<ol><li><span class=\"ck-list-bogus-paragraph\">a</span><ul><li><span class=\"ck-list-bogus-paragraph\">b</span></li></ul></li></ol>\
         <ul><li><span class=\"ck-list-bogus-paragraph\">c</span></li></ul>"
    );
    harness.assert_matches_fresh_render();
}

#[test]
fn second_block_turns_the_bogus_paragraph_into_a_paragraph() {
    let mut harness = Harness::new(&["* a", "* b"]);
    let a = block_id(harness.model.document(), 0);
    let reconverted = harness.change(|writer| {
        let element = writer
            .document()
            .get(a)
            .map(|block| block.to_element().with_text("a2"));
        if let Some(element) = element {
            writer.insert_after(element, a);
        }
    });

    assert_eq!(reconverted, [0]);
    assert_eq!(
        harness.view.rendering(a).and_then(BlockRendering::content_tag),
        Some("p")
    );
    assert_eq!(
        harness.view.to_markup(harness.model.document()),
        "<ul><li><p>a</p><p>a2</p></li><li><span class=\"ck-list-bogus-paragraph\">b</span></li></ul>"
    );
}

#[test]
fn view_stays_in_sync_through_structural_edits() {
    let mut harness = Harness::new(&["* a", "  b", "  * c", "    # d", "* e", "plain", "[ ] f"]);
    let blocks: Vec<BlockId> = harness.model.document().blocks().iter().map(Block::id).collect();

    harness.change(|writer| {
        writer.remove(blocks[1]);
    });
    harness.assert_matches_fresh_render();

    harness.change(|writer| writer.set_attribute(LIST_INDENT, 0usize, blocks[2]));
    harness.assert_matches_fresh_render();

    harness.change(|writer| writer.set_attribute(TODO_LIST_CHECKED, true, blocks[6]));
    harness.assert_matches_fresh_render();

    harness.change(|writer| {
        writer.remove(blocks[5]);
        writer.set_attribute(LIST_TYPE, "todo", blocks[4]);
    });
    harness.assert_matches_fresh_render();
}
