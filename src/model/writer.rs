use std::mem;

use tracing::trace;

use super::{
    AttributeValue, Attributes, Block, BlockId, Document, Element, Position, Schema, Selection,
    byte_index, ensure_document_initialized,
};

/// One entry of the change log of a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Insert {
        block: BlockId,
        name: String,
        attributes: Attributes,
    },
    Remove {
        name: String,
        attributes: Attributes,
        /// Neighbours of the removed block at the time it was removed.
        previous: Option<BlockId>,
        next: Option<BlockId>,
    },
    Attribute {
        block: BlockId,
        key: String,
        old_value: Option<AttributeValue>,
        new_value: Option<AttributeValue>,
    },
    Text {
        block: BlockId,
    },
}

impl Change {
    pub fn block(&self) -> Option<BlockId> {
        match self {
            Change::Insert { block, .. }
            | Change::Attribute { block, .. }
            | Change::Text { block } => Some(*block),
            Change::Remove { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct Differ {
    changes: Vec<Change>,
}

impl Differ {
    pub(super) fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub(super) fn take(&mut self) -> Vec<Change> {
        mem::take(&mut self.changes)
    }

    fn record_attribute(
        &mut self,
        block: BlockId,
        key: &str,
        old_value: Option<AttributeValue>,
        new_value: Option<AttributeValue>,
    ) {
        let existing = self.changes.iter().position(|change| {
            matches!(change, Change::Attribute { block: b, key: k, .. } if *b == block && k == key)
        });
        if let Some(index) = existing {
            let collapsed = match &mut self.changes[index] {
                Change::Attribute {
                    old_value: first_old,
                    new_value: latest,
                    ..
                } => {
                    *latest = new_value;
                    *first_old == *latest
                }
                _ => false,
            };
            if collapsed {
                self.changes.remove(index);
            }
            return;
        }
        self.changes.push(Change::Attribute {
            block,
            key: key.to_string(),
            old_value,
            new_value,
        });
    }

    fn record_text(&mut self, block: BlockId) {
        let known = self
            .changes
            .iter()
            .any(|change| matches!(change, Change::Text { block: b } if *b == block));
        if !known {
            self.changes.push(Change::Text { block });
        }
    }

    fn record_remove(&mut self, removed: &Block, previous: Option<BlockId>, next: Option<BlockId>) {
        let id = removed.id();
        self.changes.retain(|change| change.block() != Some(id));
        self.changes.push(Change::Remove {
            name: removed.name().to_string(),
            attributes: removed.attributes().clone(),
            previous,
            next,
        });
    }
}

/// The only way to mutate a [`Document`]. Every call is recorded in the change log.
pub struct Writer<'a> {
    document: &'a mut Document,
    schema: &'a Schema,
    selection: &'a mut Selection,
    differ: &'a mut Differ,
}

impl<'a> Writer<'a> {
    pub(super) fn new(
        document: &'a mut Document,
        schema: &'a Schema,
        selection: &'a mut Selection,
        differ: &'a mut Differ,
    ) -> Self {
        Self {
            document,
            schema,
            selection,
            differ,
        }
    }

    pub fn document(&self) -> &Document {
        self.document
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn selection(&self) -> &Selection {
        self.selection
    }

    /// Changes recorded since the model last handed them out.
    pub fn changes(&self) -> &[Change] {
        &self.differ.changes
    }

    pub fn set_selection(&mut self, selection: Selection) {
        if selection.is_valid(self.document) {
            *self.selection = selection.clamped(self.document);
        }
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttributeValue>, block: BlockId) {
        let value = value.into();
        let Some(target) = self.document.block_mut(block) else {
            return;
        };
        let old_value = target.attributes.insert(key.to_string(), value.clone());
        if old_value.as_ref() == Some(&value) {
            return;
        }
        trace!(%block, key, %value, "set attribute");
        self.differ
            .record_attribute(block, key, old_value, Some(value));
    }

    pub fn remove_attribute(&mut self, key: &str, block: BlockId) {
        let Some(target) = self.document.block_mut(block) else {
            return;
        };
        let Some(old_value) = target.attributes.remove(key) else {
            return;
        };
        trace!(%block, key, "remove attribute");
        self.differ.record_attribute(block, key, Some(old_value), None);
    }

    pub fn set_attributes(&mut self, attributes: &Attributes, block: BlockId) {
        for (key, value) in attributes {
            self.set_attribute(key, value.clone(), block);
        }
    }

    pub fn insert(&mut self, element: Element, index: usize) -> BlockId {
        let name = element.name.clone();
        let attributes = element.attributes.clone();
        let block = self.document.insert_element(index, element);
        self.differ.changes.push(Change::Insert {
            block,
            name,
            attributes,
        });
        block
    }

    pub fn insert_after(&mut self, element: Element, after: BlockId) -> Option<BlockId> {
        let index = self.document.index_of(after)?;
        Some(self.insert(element, index + 1))
    }

    pub fn insert_before(&mut self, element: Element, before: BlockId) -> Option<BlockId> {
        let index = self.document.index_of(before)?;
        Some(self.insert(element, index))
    }

    pub fn remove(&mut self, block: BlockId) -> Option<Block> {
        let previous = self.document.previous_sibling(block).map(Block::id);
        let next = self.document.next_sibling(block).map(Block::id);
        let removed = self.document.remove_block(block)?;
        self.differ.record_remove(&removed, previous, next);

        for position in [&mut self.selection.anchor, &mut self.selection.focus] {
            if position.block != block {
                continue;
            }
            match (previous, next) {
                (_, Some(next)) => *position = Position::new(next, 0),
                (Some(previous), None) => {
                    let len = self.document.get(previous).map(Block::len).unwrap_or(0);
                    *position = Position::new(previous, len);
                }
                (None, None) => {}
            }
        }
        Some(removed)
    }

    /// Renames a block. Like any structural replacement this is recorded as a
    /// removal followed by an insertion.
    pub fn rename(&mut self, block: BlockId, name: &str) {
        let previous = self.document.previous_sibling(block).map(Block::id);
        let next = self.document.next_sibling(block).map(Block::id);
        let Some(target) = self.document.block_mut(block) else {
            return;
        };
        if target.name == name {
            return;
        }
        let old = target.clone();
        target.name = name.to_string();
        let attributes = target.attributes.clone();
        self.differ.record_remove(&old, previous, next);
        self.differ.changes.push(Change::Insert {
            block,
            name: name.to_string(),
            attributes,
        });
    }

    /// Splits `block` at a character offset. The new block keeps the name and all
    /// attributes of the original one.
    pub fn split(&mut self, block: BlockId, offset: usize) -> Option<BlockId> {
        let original = self.document.get(block)?;
        let split_at = byte_index(original.text(), offset);
        let mut element = original.to_element();
        element.text = original.text()[split_at..].to_string();

        if let Some(target) = self.document.block_mut(block) {
            target.text.truncate(split_at);
        }
        self.differ.record_text(block);
        let created = self.insert_after(element, block)?;

        for position in [&mut self.selection.anchor, &mut self.selection.focus] {
            if position.block == block && position.offset >= offset {
                *position = Position::new(created, position.offset - offset);
            }
        }
        Some(created)
    }

    /// Appends the text of `second` to `first` and removes `second`.
    pub fn merge(&mut self, first: BlockId, second: BlockId) -> bool {
        let Some(first_len) = self.document.get(first).map(Block::len) else {
            return false;
        };
        let Some(tail) = self.document.get(second).map(|block| block.text().to_string()) else {
            return false;
        };

        for position in [&mut self.selection.anchor, &mut self.selection.focus] {
            if position.block == second {
                *position = Position::new(first, first_len + position.offset);
            }
        }
        if let Some(target) = self.document.block_mut(first) {
            target.text.push_str(&tail);
        }
        self.differ.record_text(first);
        self.remove(second);
        true
    }

    pub fn insert_text(&mut self, block: BlockId, offset: usize, text: &str) {
        let Some(target) = self.document.block_mut(block) else {
            return;
        };
        let at = byte_index(&target.text, offset);
        target.text.insert_str(at, text);
        self.differ.record_text(block);
    }

    /// Deletes the characters in `start..end` of a block.
    pub fn delete_text(&mut self, block: BlockId, start: usize, end: usize) {
        let Some(target) = self.document.block_mut(block) else {
            return;
        };
        if start >= end {
            return;
        }
        let from = byte_index(&target.text, start);
        let to = byte_index(&target.text, end);
        target.text.replace_range(from..to, "");
        self.differ.record_text(block);
    }

    /// Deletes the content between two positions. When they are in different
    /// blocks, the blocks in between are removed and the last block is merged into
    /// the first one. The selection ends up collapsed at `start`.
    pub fn delete_range(&mut self, start: Position, end: Position) {
        let (Some(start_index), Some(end_index)) = (
            self.document.index_of(start.block),
            self.document.index_of(end.block),
        ) else {
            return;
        };
        let (start, end, start_index, end_index) = if start_index <= end_index {
            (start, end, start_index, end_index)
        } else {
            (end, start, end_index, start_index)
        };

        if start.block == end.block {
            let (from, to) = (start.offset.min(end.offset), start.offset.max(end.offset));
            self.delete_text(start.block, from, to);
            *self.selection = Selection::collapsed(Position::new(start.block, from));
            return;
        }

        let start_len = self.document.get(start.block).map(Block::len).unwrap_or(0);
        self.delete_text(start.block, start.offset, start_len);
        self.delete_text(end.block, 0, end.offset);
        let between: Vec<BlockId> = self.document.blocks()[start_index + 1..end_index]
            .iter()
            .map(Block::id)
            .collect();
        for block in between {
            self.remove(block);
        }
        self.merge(start.block, end.block);
        *self.selection = Selection::collapsed(start);
    }

    pub(super) fn ensure_not_empty(&mut self) {
        if self.document.is_empty() {
            ensure_document_initialized(self.document);
            if let Some(block) = self.document.first() {
                let block = block.id();
                self.differ.changes.push(Change::Insert {
                    block,
                    name: "paragraph".to_string(),
                    attributes: Attributes::new(),
                });
                *self.selection = Selection::at_start(block);
            }
        }
    }

    pub(super) fn normalize_selection(&mut self) {
        if !self.selection.is_valid(self.document) {
            if let Some(first) = self.document.first() {
                *self.selection = Selection::at_start(first.id());
            }
        }
        *self.selection = self.selection.clamped(self.document);
    }
}
