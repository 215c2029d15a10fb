use std::cmp::Ordering;

use super::{BlockId, Document, Schema};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub block: BlockId,
    pub offset: usize,
}

impl Position {
    pub fn new(block: BlockId, offset: usize) -> Self {
        Self { block, offset }
    }

    pub fn is_at_start(&self) -> bool {
        self.offset == 0
    }

    pub fn is_at_end(&self, document: &Document) -> bool {
        document
            .get(self.block)
            .map(|block| self.offset >= block.len())
            .unwrap_or(false)
    }

    pub fn compare(&self, other: &Position, document: &Document) -> Option<Ordering> {
        let left = document.index_of(self.block)?;
        let right = document.index_of(other.block)?;
        Some(left.cmp(&right).then(self.offset.cmp(&other.offset)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            anchor: position,
            focus: position,
        }
    }

    pub fn at_start(block: BlockId) -> Self {
        Self::collapsed(Position::new(block, 0))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_valid(&self, document: &Document) -> bool {
        document.contains(self.anchor.block) && document.contains(self.focus.block)
    }

    pub fn first_position(&self, document: &Document) -> Position {
        match self.anchor.compare(&self.focus, document) {
            Some(Ordering::Greater) => self.focus,
            _ => self.anchor,
        }
    }

    pub fn last_position(&self, document: &Document) -> Position {
        match self.anchor.compare(&self.focus, document) {
            Some(Ordering::Greater) => self.anchor,
            _ => self.focus,
        }
    }

    /// Blocks touched by the selection, in document order.
    ///
    /// A non-collapsed selection ending at the very start of a block does not
    /// select that block.
    pub fn selected_blocks(&self, document: &Document) -> Vec<BlockId> {
        let first = self.first_position(document);
        let last = self.last_position(document);
        let (Some(start), Some(mut end)) =
            (document.index_of(first.block), document.index_of(last.block))
        else {
            return Vec::new();
        };
        if !self.is_collapsed() && end > start && last.offset == 0 {
            end -= 1;
        }
        document.blocks()[start..=end]
            .iter()
            .map(|block| block.id())
            .collect()
    }

    /// The object block (an image, a horizontal line, ...) the selection sits on.
    pub fn selected_block_object(&self, document: &Document, schema: &Schema) -> Option<BlockId> {
        if self.anchor.block != self.focus.block {
            return None;
        }
        let block = document.get(self.anchor.block)?;
        schema.is_object(block.name()).then(|| block.id())
    }

    pub(crate) fn clamped(&self, document: &Document) -> Self {
        let clamp = |position: Position| {
            let len = document
                .get(position.block)
                .map(|block| block.len())
                .unwrap_or(0);
            Position::new(position.block, position.offset.min(len))
        };
        Self {
            anchor: clamp(self.anchor),
            focus: clamp(self.focus),
        }
    }
}
