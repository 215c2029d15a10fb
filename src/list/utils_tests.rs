use super::*;
use crate::list::SequentialIds;
use crate::test_support::{
    block_id, block_ids, document, indices, raw_model, stringify, stringify_with_ids,
};

// ============================================================================
// Queries
// ============================================================================

#[test]
fn list_item_blocks_in_each_direction() {
    let doc = document(&["* a", "  b", "  * c", "  d", "* e"]);
    let d = block_id(&doc, 3);

    let backward = get_list_item_blocks(&doc, d, Direction::Backward, false);
    assert_eq!(indices(&doc, &backward), [0, 1]);
    let backward = get_list_item_blocks(&doc, d, Direction::Backward, true);
    assert_eq!(indices(&doc, &backward), [0, 1, 2]);

    let forward = get_list_item_blocks(&doc, block_id(&doc, 0), Direction::Forward, false);
    assert_eq!(indices(&doc, &forward), [0, 1, 3]);
}

#[test]
fn all_list_item_blocks() {
    let doc = document(&["* a", "  b", "  * c", "  d", "* e"]);
    let b = block_id(&doc, 1);
    assert_eq!(indices(&doc, &get_all_list_item_blocks(&doc, b, false)), [0, 1, 3]);
    assert_eq!(indices(&doc, &get_all_list_item_blocks(&doc, b, true)), [0, 1, 2, 3]);
    let e = block_id(&doc, 4);
    assert_eq!(indices(&doc, &get_all_list_item_blocks(&doc, e, false)), [4]);
}

#[test]
fn first_and_last_block_of_item() {
    let doc = document(&["* a", "  b", "  c", "* d"]);
    let checks: Vec<(bool, bool)> = (0..4)
        .map(|index| {
            let block = block_id(&doc, index);
            (
                is_first_block_of_list_item(&doc, block),
                is_last_block_of_list_item(&doc, block),
            )
        })
        .collect();
    assert_eq!(
        checks,
        [(true, false), (false, false), (false, true), (true, true)]
    );
}

#[test]
fn list_item_block_detection() {
    let doc = document(&["* a", "plain"]);
    assert!(is_list_item_block(&doc, block_id(&doc, 0)));
    assert!(!is_list_item_block(&doc, block_id(&doc, 1)));
}

#[test]
fn nested_list_blocks_follow_the_item() {
    let doc = document(&["* a", "  * b", "    * c", "* d"]);
    let nested = get_nested_list_blocks(&doc, block_id(&doc, 0));
    assert_eq!(indices(&doc, &nested), [1, 2]);
    assert!(get_nested_list_blocks(&doc, block_id(&doc, 3)).is_empty());
}

#[test]
fn list_items_skip_nested_lists_and_stop_at_type_change() {
    let doc = document(&["* a", "  * x", "* b", "* c", "# d"]);
    let items = get_list_items(&doc, block_id(&doc, 3));
    assert_eq!(indices(&doc, &items), [0, 2, 3]);
}

#[test]
fn expand_to_complete_items() {
    let doc = document(&["* a", "  b", "  * c", "* d"]);
    let b = block_ids(&doc, &[1]);
    let with_nested = expand_list_blocks_to_complete_items(&doc, &b, true);
    assert_eq!(indices(&doc, &with_nested), [0, 1, 2]);
    let without = expand_list_blocks_to_complete_items(&doc, &b, false);
    assert_eq!(indices(&doc, &without), [0, 1]);
}

#[test]
fn expand_to_complete_list() {
    let doc = document(&["* a", "  * x", "* b", "# c"]);
    let blocks = block_ids(&doc, &[2]);
    let list = expand_list_blocks_to_complete_list(&doc, &blocks);
    assert_eq!(indices(&doc, &list), [0, 2]);
}

#[test]
fn single_list_item_check() {
    let doc = document(&["* a", "  b", "* c", "plain"]);
    assert!(is_single_list_item(&doc, &block_ids(&doc, &[0, 1])));
    assert!(!is_single_list_item(&doc, &block_ids(&doc, &[1, 2])));
    assert!(!is_single_list_item(&doc, &block_ids(&doc, &[3])));
    assert!(!is_single_list_item(&doc, &[]));
}

#[test]
fn sort_blocks_orders_and_drops_duplicates_and_removed_blocks() {
    let mut model = raw_model(&["a", "b", "c", "d"]);
    let blocks = block_ids(model.document(), &[3, 0, 2, 0]);
    let removed = blocks[2];
    model.change(|writer| {
        writer.remove(removed);
    });
    let sorted = sort_blocks(model.document(), blocks);
    assert_eq!(sorted.len(), 2);
    assert_eq!(indices(model.document(), &sorted), [0, 2]);
}

// ============================================================================
// Writer helpers
// ============================================================================

#[test]
fn split_item_before_a_block() {
    let mut model = raw_model(&["* a", "  b", "  c"]);
    let ids = SequentialIds::new("new");
    let b = block_id(model.document(), 1);
    let changed = model.change(|writer| split_list_item_before(writer, b, &ids));

    assert_eq!(indices(model.document(), &changed), [1, 2]);
    assert_eq!(
        stringify_with_ids(model.document()),
        ["* a {id=i0}", "* b {id=new0}", "  c {id=new0}"]
    );
}

#[test]
fn merge_item_into_the_previous_one() {
    let mut model = raw_model(&["* a", "# b", "  c", "* d"]);
    let (b, a) = (block_id(model.document(), 1), block_id(model.document(), 0));
    model.change(|writer| merge_list_item_before(writer, b, a));

    assert_eq!(
        stringify_with_ids(model.document()),
        ["* a {id=i0}", "  b {id=i0}", "  c {id=i0}", "* d {id=i2}"]
    );
}

#[test]
fn indent_expands_to_whole_items() {
    let mut model = raw_model(&["* a", "* b", "  c", "* d"]);
    let b = block_ids(model.document(), &[1]);
    let changed = model.change(|writer| {
        indent_blocks(
            writer,
            &b,
            IndentOptions {
                indent_by: 1,
                expand: true,
            },
        )
    });
    assert_eq!(indices(model.document(), &changed), [1, 2]);
    assert_eq!(stringify(model.document()), ["* a", "  * b", "    c", "* d"]);
}

#[test]
fn indent_below_zero_leaves_the_list() {
    let mut model = raw_model(&["* a", "  * b"]);
    let blocks = block_ids(model.document(), &[0, 1]);
    model.change(|writer| {
        indent_blocks(
            writer,
            &blocks,
            IndentOptions {
                indent_by: -1,
                expand: false,
            },
        )
    });
    assert_eq!(stringify(model.document()), ["a", "* b"]);
}

#[test]
fn outdent_merges_into_a_parent_that_continues() {
    let mut model = raw_model(&["* a", "  * b", "  c"]);
    let b = block_ids(model.document(), &[1]);
    model.change(|writer| outdent_blocks_with_merge(writer, &b));
    assert_eq!(
        stringify_with_ids(model.document()),
        ["* a {id=i0}", "  b {id=i0}", "  c {id=i0}"]
    );
}

#[test]
fn outdent_of_a_trailing_nested_item_creates_a_sibling() {
    let mut model = raw_model(&["* a", "  * b"]);
    let b = block_ids(model.document(), &[1]);
    model.change(|writer| outdent_blocks_with_merge(writer, &b));
    assert_eq!(
        stringify_with_ids(model.document()),
        ["* a {id=i0}", "* b {id=i1}"]
    );
}

#[test]
fn outdent_moves_nested_items_along() {
    let mut model = raw_model(&["* a", "  * b", "    * c", "* d"]);
    let b = block_ids(model.document(), &[1]);
    let changed = model.change(|writer| outdent_blocks_with_merge(writer, &b));
    assert_eq!(indices(model.document(), &changed), [1, 2]);
    assert_eq!(stringify(model.document()), ["* a", "* b", "  * c", "* d"]);
}

#[test]
fn outdent_at_indent_zero_removes_the_list() {
    let mut model = raw_model(&["* a", "  b", "* c"]);
    let a = block_ids(model.document(), &[0]);
    model.change(|writer| outdent_blocks_with_merge(writer, &a));
    assert_eq!(stringify(model.document()), ["a", "b", "* c"]);
}

#[test]
fn remove_list_attributes_strips_every_list_key() {
    let mut model = raw_model(&["[x] a {listStyle=disc}", "plain {align=left}"]);
    let blocks = block_ids(model.document(), &[0, 1]);
    model.change(|writer| remove_list_attributes(writer, &blocks));

    let doc = model.document();
    assert!(doc.block_at(0).expect("block").attributes().is_empty());
    assert_eq!(
        stringify_with_ids(doc),
        ["a", "plain"]
    );
    assert!(doc.block_at(1).expect("block").has_attribute("align"));
}

#[test]
fn outdent_following_items_uses_the_running_minimum() {
    let mut model = raw_model(&["* a", "    * b", "  * c", "    * d", "* e"]);
    let a = block_id(model.document(), 0);
    let changed = model.change(|writer| {
        remove_list_attributes(writer, &[a]);
        outdent_following_items(writer, a)
    });
    assert_eq!(indices(model.document(), &changed), [1, 2, 3]);
    assert_eq!(
        stringify(model.document()),
        ["a", "* b", "* c", "  * d", "* e"]
    );
}
