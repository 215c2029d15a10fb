use std::collections::VecDeque;

use tracing::trace;

use super::{indent_of, is_list_block};
use crate::model::{Block, Document};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    Forward,
    #[default]
    Backward,
}

impl Direction {
    fn step(self, index: usize) -> Option<usize> {
        match self {
            Direction::Forward => index.checked_add(1),
            Direction::Backward => index.checked_sub(1),
        }
    }
}

/// The indent flags are relative to a reference indent that starts at the indent
/// of the start block and can only move down.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalkerOptions {
    pub direction: Direction,
    pub include_self: bool,
    /// Stop as soon as one of these attributes differs from the start block.
    pub same_attributes: Vec<&'static str>,
    pub same_indent: bool,
    pub lower_indent: bool,
    pub higher_indent: bool,
}

impl WalkerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(mut self) -> Self {
        self.direction = Direction::Forward;
        self
    }

    pub fn backward(mut self) -> Self {
        self.direction = Direction::Backward;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn include_self(mut self) -> Self {
        self.include_self = true;
        self
    }

    pub fn same_attributes(mut self, attributes: &[&'static str]) -> Self {
        self.same_attributes = attributes.to_vec();
        self
    }

    pub fn same_indent(mut self) -> Self {
        self.same_indent = true;
        self
    }

    pub fn lower_indent(mut self) -> Self {
        self.lower_indent = true;
        self
    }

    pub fn higher_indent(mut self) -> Self {
        self.higher_indent = true;
        self
    }

    pub fn with_higher_indent(mut self, higher_indent: bool) -> Self {
        self.higher_indent = higher_indent;
        self
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ListNode<'a> {
    pub block: &'a Block,
    pub previous: Option<&'a Block>,
    /// The previous block at the same indent in the same list.
    pub previous_in_list: Option<&'a Block>,
}

/// Iteration ends at the first block that is not a list block.
pub struct SiblingListBlocks<'a> {
    document: &'a Document,
    next_index: Option<usize>,
    direction: Direction,
    previous: Option<&'a Block>,
    /// Blocks left for a deeper indent, by ascending indent.
    parents: Vec<(usize, &'a Block)>,
}

impl<'a> SiblingListBlocks<'a> {
    pub fn new(document: &'a Document, start: Option<&'a Block>, direction: Direction) -> Self {
        let next_index = start.and_then(|block| document.index_of(block.id()));
        Self {
            document,
            next_index,
            direction,
            previous: None,
            parents: Vec::new(),
        }
    }

    pub fn from_head(document: &'a Document, head: &'a Block) -> Self {
        Self::new(document, Some(head), Direction::Forward)
    }

    /// Drops parents at `indent` or deeper and returns the one at exactly `indent`.
    fn pop_parents(&mut self, indent: usize) -> Option<&'a Block> {
        let mut found = None;
        while let Some(&(parent_indent, parent)) = self.parents.last() {
            if parent_indent < indent {
                break;
            }
            if parent_indent == indent {
                found = Some(parent);
            }
            self.parents.pop();
        }
        found
    }
}

impl<'a> Iterator for SiblingListBlocks<'a> {
    type Item = ListNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index.take()?;
        let block = self.document.block_at(index)?;
        if !is_list_block(block) {
            return None;
        }

        let mut previous_in_list = None;
        if let Some(previous) = self.previous {
            let indent = indent_of(block);
            let previous_indent = indent_of(previous);
            if indent > previous_indent {
                self.pop_parents(previous_indent);
                self.parents.push((previous_indent, previous));
            } else if indent < previous_indent {
                previous_in_list = self.pop_parents(indent);
            } else {
                previous_in_list = Some(previous);
            }
        }

        let node = ListNode {
            block,
            previous: self.previous,
            previous_in_list,
        };
        self.previous = Some(block);
        self.next_index = self.direction.step(index);
        Some(node)
    }
}

pub struct ListWalker<'a> {
    start: &'a Block,
    options: WalkerOptions,
    siblings: SiblingListBlocks<'a>,
    reference_indent: usize,
    nested: Vec<&'a Block>,
    ready: VecDeque<&'a Block>,
    finished: bool,
}

impl<'a> ListWalker<'a> {
    pub fn new(document: &'a Document, start: &'a Block, options: WalkerOptions) -> Self {
        let first = if options.include_self {
            Some(start)
        } else {
            match options.direction {
                Direction::Forward => document.next_sibling(start.id()),
                Direction::Backward => document.previous_sibling(start.id()),
            }
        };
        let siblings = SiblingListBlocks::new(document, first, options.direction);
        Self {
            start,
            reference_indent: indent_of(start),
            options,
            siblings,
            nested: Vec::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    pub fn first(
        document: &'a Document,
        start: &'a Block,
        options: WalkerOptions,
    ) -> Option<&'a Block> {
        Self::new(document, start, options).next()
    }

    fn differs_from_start(&self, block: &Block) -> bool {
        self.options
            .same_attributes
            .iter()
            .any(|key| block.attribute(key) != self.start.attribute(key))
    }

    fn flush_nested(&mut self) {
        self.ready.extend(self.nested.drain(..));
    }

    fn finish(&mut self) {
        if !self.nested.is_empty() {
            trace!(
                dropped = self.nested.len(),
                "unconfirmed nested blocks dropped by backward walk"
            );
            self.nested.clear();
        }
        self.finished = true;
    }
}

impl<'a> Iterator for ListWalker<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(block) = self.ready.pop_front() {
                return Some(block);
            }
            if self.finished {
                return None;
            }
            let Some(node) = self.siblings.next() else {
                self.finish();
                continue;
            };
            let block = node.block;
            let indent = indent_of(block);

            if indent < self.reference_indent {
                if !self.options.lower_indent {
                    self.finish();
                    continue;
                }
                self.reference_indent = indent;
            } else if indent > self.reference_indent {
                if !self.options.higher_indent {
                    continue;
                }
                if self.options.direction == Direction::Backward {
                    self.nested.push(block);
                    continue;
                }
            } else {
                if !self.options.same_indent {
                    if self.options.higher_indent {
                        self.flush_nested();
                        self.finished = true;
                    }
                    continue;
                }
                if self.differs_from_start(block) {
                    self.finish();
                    continue;
                }
            }

            self.flush_nested();
            self.ready.push_back(block);
        }
    }
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod walker_tests;
