//! Queries return block ids in document order. Helpers taking a [`Writer`] return
//! the blocks they changed.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::walker::{Direction, ListWalker, SiblingListBlocks, WalkerOptions};
use super::{
    LIST_INDENT, LIST_ITEM_ID, LIST_TYPE, ListItemIdGenerator, TODO_LIST_CHECKED, indent_of,
};
use crate::model::{Attributes, Block, BlockId, Document, Writer};

fn ids<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Vec<BlockId> {
    blocks.into_iter().map(Block::id).collect()
}

pub fn is_list_item_block(document: &Document, block: BlockId) -> bool {
    document
        .get(block)
        .map(|block| block.as_list_block().is_some())
        .unwrap_or(false)
}

/// Going forward the block itself is included. With `higher_indent` the nested
/// blocks in between are included as well.
pub fn get_list_item_blocks(
    document: &Document,
    block: BlockId,
    direction: Direction,
    higher_indent: bool,
) -> Vec<BlockId> {
    let Some(start) = document.get(block) else {
        return Vec::new();
    };
    let forward = direction == Direction::Forward;
    let mut options = WalkerOptions::new()
        .direction(direction)
        .same_indent()
        .same_attributes(&[LIST_ITEM_ID])
        .with_higher_indent(higher_indent);
    if forward {
        options = options.include_self();
    }
    let mut blocks = ids(ListWalker::new(document, start, options));
    if !forward {
        blocks.reverse();
    }
    blocks
}

pub fn get_all_list_item_blocks(
    document: &Document,
    block: BlockId,
    higher_indent: bool,
) -> Vec<BlockId> {
    let mut blocks = get_list_item_blocks(document, block, Direction::Backward, higher_indent);
    blocks.extend(get_list_item_blocks(
        document,
        block,
        Direction::Forward,
        higher_indent,
    ));
    blocks
}

pub fn get_nested_list_blocks(document: &Document, block: BlockId) -> Vec<BlockId> {
    let Some(start) = document.get(block) else {
        return Vec::new();
    };
    ids(ListWalker::new(
        document,
        start,
        WalkerOptions::new().forward().higher_indent(),
    ))
}

pub fn get_list_items(document: &Document, block: BlockId) -> Vec<BlockId> {
    let Some(start) = document.get(block) else {
        return Vec::new();
    };
    let options = WalkerOptions::new()
        .same_indent()
        .same_attributes(&[LIST_TYPE]);
    let mut blocks = ids(ListWalker::new(document, start, options.clone()));
    blocks.reverse();
    blocks.extend(ids(ListWalker::new(
        document,
        start,
        options.forward().include_self(),
    )));
    blocks
}

fn is_item_boundary(document: &Document, block: BlockId, direction: Direction) -> bool {
    let Some(start) = document.get(block) else {
        return false;
    };
    let options = WalkerOptions::new()
        .direction(direction)
        .same_indent()
        .same_attributes(&[LIST_ITEM_ID]);
    ListWalker::first(document, start, options).is_none()
}

pub fn is_first_block_of_list_item(document: &Document, block: BlockId) -> bool {
    is_item_boundary(document, block, Direction::Backward)
}

pub fn is_last_block_of_list_item(document: &Document, block: BlockId) -> bool {
    is_item_boundary(document, block, Direction::Forward)
}

pub fn expand_list_blocks_to_complete_items(
    document: &Document,
    blocks: &[BlockId],
    with_nested: bool,
) -> Vec<BlockId> {
    let mut all = Vec::new();
    for &block in blocks {
        all.extend(get_all_list_item_blocks(document, block, with_nested));
    }
    sort_blocks(document, all)
}

pub fn expand_list_blocks_to_complete_list(
    document: &Document,
    blocks: &[BlockId],
) -> Vec<BlockId> {
    let mut all = Vec::new();
    for &block in blocks {
        all.extend(get_list_items(document, block));
    }
    sort_blocks(document, all)
}

pub fn split_list_item_before(
    writer: &mut Writer<'_>,
    block: BlockId,
    ids: &dyn ListItemIdGenerator,
) -> Vec<BlockId> {
    let blocks = get_list_item_blocks(writer.document(), block, Direction::Forward, false);
    let id = ids.next_id();
    for &target in &blocks {
        writer.set_attribute(LIST_ITEM_ID, id.as_str(), target);
    }
    blocks
}

pub fn merge_list_item_before(
    writer: &mut Writer<'_>,
    block: BlockId,
    parent_block: BlockId,
) -> Vec<BlockId> {
    let Some(parent) = writer.document().get(parent_block) else {
        return Vec::new();
    };
    let attributes: Attributes = parent
        .attributes()
        .iter()
        .filter(|(key, _)| key.starts_with("list"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let blocks = get_list_item_blocks(writer.document(), block, Direction::Forward, false);
    for &target in &blocks {
        writer.set_attributes(&attributes, target);
    }
    blocks
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndentOptions {
    pub indent_by: i64,
    pub expand: bool,
}

impl Default for IndentOptions {
    fn default() -> Self {
        Self {
            indent_by: 1,
            expand: false,
        }
    }
}

/// Blocks that would end up below 0 leave the list.
pub fn indent_blocks(
    writer: &mut Writer<'_>,
    blocks: &[BlockId],
    options: IndentOptions,
) -> Vec<BlockId> {
    let all = if options.expand {
        expand_list_blocks_to_complete_items(writer.document(), blocks, true)
    } else {
        blocks.to_vec()
    };
    for &block in &all {
        let Some(current) = writer.document().get(block).map(indent_of) else {
            continue;
        };
        let indent = current as i64 + options.indent_by;
        if indent < 0 {
            remove_list_attributes(writer, &[block]);
        } else {
            writer.set_attribute(LIST_INDENT, indent, block);
        }
    }
    all
}

/// An item at the lowest selected indent is merged into its former parent item
/// when that parent continues after it.
pub fn outdent_blocks_with_merge(writer: &mut Writer<'_>, blocks: &[BlockId]) -> Vec<BlockId> {
    let all = expand_list_blocks_to_complete_items(writer.document(), blocks, true);
    let Some(reference_indent) = all
        .iter()
        .filter_map(|&block| writer.document().get(block).map(indent_of))
        .min()
    else {
        return Vec::new();
    };

    let parents: HashMap<BlockId, Option<BlockId>> = {
        let document = writer.document();
        all.iter()
            .filter_map(|&id| document.get(id))
            .map(|block| {
                let parent =
                    ListWalker::first(document, block, WalkerOptions::new().lower_indent());
                (block.id(), parent.map(Block::id))
            })
            .collect()
    };

    let mut visited = HashSet::new();
    for &block in &all {
        if !visited.insert(block) {
            continue;
        }
        let Some(indent) = writer.document().get(block).map(indent_of) else {
            continue;
        };
        if indent == 0 {
            remove_list_attributes(writer, &[block]);
            continue;
        }
        if indent == reference_indent {
            if let Some(parent) = parents.get(&block).copied().flatten() {
                let merged = merge_list_item_if_not_last(writer, block, parent);
                if !merged.is_empty() {
                    visited.extend(merged);
                    continue;
                }
            }
        }
        writer.set_attribute(LIST_INDENT, indent - 1, block);
    }
    sort_blocks(writer.document(), visited)
}

fn merge_list_item_if_not_last(
    writer: &mut Writer<'_>,
    block: BlockId,
    parent: BlockId,
) -> Vec<BlockId> {
    let document = writer.document();
    let parent_blocks = get_list_item_blocks(document, parent, Direction::Forward, false);
    let last_of_parent = parent_blocks.last().and_then(|&last| document.index_of(last));
    let index = document.index_of(block);
    match (last_of_parent, index) {
        (Some(last), Some(index)) if last > index => merge_list_item_before(writer, block, parent),
        _ => Vec::new(),
    }
}

pub fn remove_list_attributes(writer: &mut Writer<'_>, blocks: &[BlockId]) -> Vec<BlockId> {
    for &block in blocks {
        let Some(keys) = writer.document().get(block).map(|block| {
            block
                .attributes()
                .keys()
                .filter(|key| {
                    key.starts_with("list")
                        || key.as_str() == TODO_LIST_CHECKED
                        || writer.schema().is_list_attribute(key)
                })
                .cloned()
                .collect::<Vec<_>>()
        }) else {
            continue;
        };
        for key in keys {
            writer.remove_attribute(&key, block);
        }
    }
    blocks.to_vec()
}

/// Every block after `last_block` is lowered by the smallest indent seen so far.
pub fn outdent_following_items(writer: &mut Writer<'_>, last_block: BlockId) -> Vec<BlockId> {
    let following: Vec<(BlockId, usize)> = {
        let document = writer.document();
        let start = document.next_sibling(last_block);
        SiblingListBlocks::new(document, start, Direction::Forward)
            .map(|node| (node.block.id(), indent_of(node.block)))
            .collect()
    };

    let mut changed = Vec::new();
    let mut current = usize::MAX;
    for (block, indent) in following {
        if indent == 0 {
            break;
        }
        current = current.min(indent);
        writer.set_attribute(LIST_INDENT, indent - current, block);
        changed.push(block);
    }
    changed
}

/// Document order, duplicates and removed blocks dropped.
pub fn sort_blocks(document: &Document, blocks: impl IntoIterator<Item = BlockId>) -> Vec<BlockId> {
    let ordered: BTreeSet<(usize, BlockId)> = blocks
        .into_iter()
        .filter_map(|block| document.index_of(block).map(|index| (index, block)))
        .collect();
    ordered.into_iter().map(|(_, block)| block).collect()
}

pub fn is_single_list_item(document: &Document, blocks: &[BlockId]) -> bool {
    let mut item_ids = blocks
        .iter()
        .map(|&block| document.get(block).and_then(super::item_id_of));
    let Some(Some(first)) = item_ids.next() else {
        return false;
    };
    item_ids.all(|id| id == Some(first))
}

#[cfg(test)]
#[path = "utils_tests.rs"]
mod utils_tests;
