//! Repair passes that keep the flat list model consistent. Every list touched by
//! a change is fixed as a whole: indents first, then item ids, then the hooks.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace};

use super::strategies::ListProperty;
use super::utils::get_list_item_blocks;
use super::walker::{Direction, SiblingListBlocks};
use super::{
    LIST_INDENT, LIST_ITEM_ID, LIST_TYPE, ListItemIdGenerator, ListType, TODO_LIST_CHECKED,
    indent_of, is_list_block, item_id_of, type_of,
};
use crate::model::{AttributeValue, Block, BlockId, Change, Document, PostFixer, Schema, Writer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListNodeRef {
    pub block: BlockId,
    pub previous_in_list: Option<BlockId>,
}

pub fn list_nodes(document: &Document, head: BlockId) -> Vec<ListNodeRef> {
    let Some(head) = document.get(head) else {
        return Vec::new();
    };
    SiblingListBlocks::from_head(document, head)
        .map(|node| ListNodeRef {
            block: node.block.id(),
            previous_in_list: node.previous_in_list.map(Block::id),
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
struct Gap {
    before: Option<BlockId>,
    after: Option<BlockId>,
}

impl Gap {
    fn before_block(document: &Document, block: BlockId) -> Self {
        Self {
            before: document.previous_sibling(block).map(Block::id),
            after: Some(block),
        }
    }

    fn after_block(document: &Document, block: BlockId) -> Self {
        Self {
            before: Some(block),
            after: document.next_sibling(block).map(Block::id),
        }
    }

    /// Where a removed block used to be, judged by its surviving neighbours.
    fn of_removed(
        document: &Document,
        previous: Option<BlockId>,
        next: Option<BlockId>,
    ) -> Option<Self> {
        if let Some(previous) = previous.filter(|&id| document.contains(id)) {
            return Some(Self::after_block(document, previous));
        }
        if let Some(next) = next.filter(|&id| document.contains(id)) {
            return Some(Self::before_block(document, next));
        }
        document.first().map(|first| Self::before_block(document, first.id()))
    }
}

#[derive(Default)]
struct ListHeads {
    heads: Vec<BlockId>,
    known: HashSet<BlockId>,
    visited: HashSet<BlockId>,
}

impl ListHeads {
    fn add(&mut self, head: BlockId) {
        if self.known.insert(head) {
            self.heads.push(head);
        }
    }

    fn add_for_gap(&mut self, document: &Document, gap: Gap) {
        let before = gap.before.and_then(|id| document.get(id));
        match before {
            Some(before) if is_list_block(before) => {
                let mut head = before;
                for node in SiblingListBlocks::new(document, Some(before), Direction::Backward) {
                    if !self.visited.insert(node.block.id()) {
                        return;
                    }
                    head = node.block;
                }
                trace!(head = %head.id(), "found list head");
                self.add(head.id());
            }
            _ => {
                if let Some(after) = gap.after.and_then(|id| document.get(id)) {
                    if is_list_block(after) {
                        self.add(after.id());
                    }
                }
            }
        }
    }
}

pub fn affected_list_heads(
    document: &Document,
    schema: &Schema,
    changes: &[Change],
) -> Vec<BlockId> {
    let mut heads = ListHeads::default();
    for change in changes {
        match change {
            Change::Insert {
                block, attributes, ..
            } => {
                if !document.contains(*block) {
                    continue;
                }
                heads.add_for_gap(document, Gap::before_block(document, *block));
                if !attributes.contains_key(LIST_ITEM_ID) {
                    heads.add_for_gap(document, Gap::after_block(document, *block));
                }
            }
            Change::Remove { previous, next, .. } => {
                if let Some(gap) = Gap::of_removed(document, *previous, *next) {
                    heads.add_for_gap(document, gap);
                }
            }
            Change::Attribute {
                block,
                key,
                new_value,
                ..
            } if schema.is_list_attribute(key) => {
                if !document.contains(*block) {
                    continue;
                }
                heads.add_for_gap(document, Gap::before_block(document, *block));
                if new_value.is_none() {
                    heads.add_for_gap(document, Gap::after_block(document, *block));
                }
            }
            _ => {}
        }
    }
    heads.heads
}

/// Over-indented runs keep their relative nesting: the offset found for the first
/// block of such a run is applied to the rest of it.
pub fn fix_list_indents(writer: &mut Writer<'_>, nodes: &[ListNodeRef]) -> bool {
    let mut max_indent = 0usize;
    let mut fix_by: Option<usize> = None;
    let mut previous_indent: Option<usize> = None;
    let mut applied = false;

    for node in nodes {
        let Some(indent) = writer.document().get(node.block).map(indent_of) else {
            continue;
        };

        let mut final_indent = indent;
        if indent > max_indent {
            let mut new_indent = match fix_by {
                None => {
                    fix_by = Some(indent - max_indent);
                    max_indent
                }
                Some(offset) => {
                    let offset = offset.min(indent);
                    fix_by = Some(offset);
                    indent - offset
                }
            };
            let reachable = previous_indent.map(|previous| previous + 1).unwrap_or(0);
            new_indent = new_indent.min(reachable);
            if new_indent != indent {
                writer.set_attribute(LIST_INDENT, new_indent, node.block);
                applied = true;
            }
            final_indent = new_indent;
        } else {
            fix_by = None;
            max_indent = indent + 1;
        }
        previous_indent = Some(final_indent);
    }
    applied
}

/// An id already used by an earlier item is replaced, and so is the id of blocks
/// whose type differs from the first block of their item.
pub fn fix_list_item_ids(
    writer: &mut Writer<'_>,
    nodes: &[ListNodeRef],
    seen_ids: &mut HashSet<String>,
    ids: &dyn ListItemIdGenerator,
) -> bool {
    let mut visited = HashSet::new();
    let mut applied = false;

    for node in nodes {
        if visited.contains(&node.block) {
            continue;
        }
        let document = writer.document();
        let Some(block) = document.get(node.block) else {
            continue;
        };
        let Some(original_id) = item_id_of(block) else {
            continue;
        };
        let mut list_type = block.attribute(LIST_TYPE).cloned();
        let mut item_id = original_id.to_string();
        if seen_ids.contains(&item_id) {
            item_id = ids.next_id();
            debug!(old = original_id, new = %item_id, "list item id collision");
        }
        seen_ids.insert(item_id.clone());

        let item_blocks = get_list_item_blocks(document, node.block, Direction::Forward, false);
        for target in item_blocks {
            visited.insert(target);
            let Some(block) = writer.document().get(target) else {
                continue;
            };
            let block_type = block.attribute(LIST_TYPE).cloned();
            let block_id = item_id_of(block).map(str::to_string);
            if block_type != list_type {
                item_id = ids.next_id();
                list_type = block_type;
            }
            if block_id.as_deref() != Some(item_id.as_str()) {
                writer.set_attribute(LIST_ITEM_ID, item_id.as_str(), target);
                applied = true;
            }
        }
    }
    applied
}

pub trait ListPostFixerHook {
    fn name(&self) -> &str;

    fn fix(&self, writer: &mut Writer<'_>, nodes: &[ListNodeRef]) -> bool;
}

pub struct ListPostFixer {
    ids: Rc<dyn ListItemIdGenerator>,
    hooks: Vec<Box<dyn ListPostFixerHook>>,
}

impl ListPostFixer {
    pub fn new(ids: Rc<dyn ListItemIdGenerator>) -> Self {
        Self {
            ids,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Box<dyn ListPostFixerHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn add_hook(&mut self, hook: Box<dyn ListPostFixerHook>) {
        self.hooks.push(hook);
    }

    fn strip_disallowed_attributes(&self, writer: &mut Writer<'_>) -> bool {
        let mut targets = Vec::new();
        for change in writer.changes() {
            let Change::Insert { block, .. } = change else {
                continue;
            };
            let Some(inserted) = writer.document().get(*block) else {
                continue;
            };
            if writer.schema().check_attribute(inserted.name(), LIST_ITEM_ID) {
                continue;
            }
            let keys: Vec<String> = inserted
                .attributes()
                .keys()
                .filter(|key| writer.schema().is_list_attribute(key))
                .cloned()
                .collect();
            if !keys.is_empty() {
                targets.push((*block, keys));
            }
        }

        let applied = !targets.is_empty();
        for (block, keys) in targets {
            debug!(%block, "list attributes not allowed here, removing");
            for key in keys {
                writer.remove_attribute(&key, block);
            }
        }
        applied
    }
}

impl PostFixer for ListPostFixer {
    fn fix(&self, writer: &mut Writer<'_>) -> bool {
        let mut applied = self.strip_disallowed_attributes(writer);

        let heads = affected_list_heads(writer.document(), writer.schema(), writer.changes());
        let mut seen_ids = HashSet::new();
        for head in heads {
            let nodes = list_nodes(writer.document(), head);
            let mut changed = fix_list_indents(writer, &nodes);
            changed |= fix_list_item_ids(writer, &nodes, &mut seen_ids, self.ids.as_ref());

            for hook in &self.hooks {
                let nodes = list_nodes(writer.document(), head);
                if hook.fix(writer, &nodes) {
                    trace!(hook = hook.name(), %head, "post-fixer hook changed the list");
                    changed = true;
                }
            }
            if changed {
                debug!(%head, "list repaired");
            }
            applied |= changed;
        }
        applied
    }
}

// ============================================================================
// Feature hooks
// ============================================================================

/// Keeps `todoListChecked` on to-do items only.
#[derive(Debug, Default)]
pub struct TodoListHook;

impl ListPostFixerHook for TodoListHook {
    fn name(&self) -> &str {
        "todo-list"
    }

    fn fix(&self, writer: &mut Writer<'_>, nodes: &[ListNodeRef]) -> bool {
        let mut applied = false;
        for node in nodes {
            let document = writer.document();
            let Some(block) = document.get(node.block) else {
                continue;
            };
            let checked = block.attribute(TODO_LIST_CHECKED).cloned();

            if type_of(block) != Some(ListType::Todo) {
                if checked.is_some() {
                    writer.remove_attribute(TODO_LIST_CHECKED, node.block);
                    applied = true;
                }
                continue;
            }
            if checked == Some(AttributeValue::Boolean(false)) {
                writer.remove_attribute(TODO_LIST_CHECKED, node.block);
                applied = true;
                continue;
            }

            let Some(previous) = node.previous_in_list.and_then(|id| document.get(id)) else {
                continue;
            };
            if item_id_of(previous) != item_id_of(block) {
                continue;
            }
            let previous_checked = previous.has_attribute(TODO_LIST_CHECKED);
            if checked.is_some() && !previous_checked {
                writer.remove_attribute(TODO_LIST_CHECKED, node.block);
                applied = true;
            } else if checked.is_none() && previous_checked {
                writer.set_attribute(TODO_LIST_CHECKED, true, node.block);
                applied = true;
            }
        }
        applied
    }
}

#[derive(Debug, Clone)]
pub struct ListPropertiesHook {
    properties: Vec<ListProperty>,
}

impl ListPropertiesHook {
    pub fn new(properties: Vec<ListProperty>) -> Self {
        Self { properties }
    }
}

impl ListPostFixerHook for ListPropertiesHook {
    fn name(&self) -> &str {
        "list-properties"
    }

    fn fix(&self, writer: &mut Writer<'_>, nodes: &[ListNodeRef]) -> bool {
        let mut applied = false;

        for node in nodes {
            for property in &self.properties {
                let Some(block) = writer.document().get(node.block) else {
                    continue;
                };
                if property.has_valid_attribute(block) {
                    continue;
                }
                if property.applies_to(block) {
                    writer.set_attribute(property.key(), property.default_value(), node.block);
                } else {
                    writer.remove_attribute(property.key(), node.block);
                }
                applied = true;
            }
        }

        for node in nodes {
            let document = writer.document();
            let (Some(block), Some(previous)) = (
                document.get(node.block),
                node.previous_in_list.and_then(|id| document.get(id)),
            ) else {
                continue;
            };
            if previous.attribute(LIST_TYPE) != block.attribute(LIST_TYPE) {
                continue;
            }
            let updates: Vec<(&'static str, Option<AttributeValue>)> = self
                .properties
                .iter()
                .filter(|property| property.applies_to(block))
                .filter_map(|property| {
                    let key = property.key();
                    let value = previous.attribute(key);
                    (block.attribute(key) != value).then(|| (key, value.cloned()))
                })
                .collect();
            for (key, value) in updates {
                match value {
                    Some(value) => writer.set_attribute(key, value, node.block),
                    None => writer.remove_attribute(key, node.block),
                }
                applied = true;
            }
        }
        applied
    }
}

#[cfg(test)]
#[path = "postfixers_tests.rs"]
mod postfixers_tests;
