//! Lists are flat: every list block carries [`LIST_ITEM_ID`], [`LIST_INDENT`] and
//! [`LIST_TYPE`], and nesting only appears in the view.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{AttributeValue, Block};

pub mod commands;
pub mod converters;
pub mod postfixers;
pub mod strategies;
pub mod uid;
pub mod utils;
pub mod walker;

pub use uid::{ListItemIdGenerator, RandomIds, SequentialIds};
pub use walker::{Direction, ListNode, ListWalker, SiblingListBlocks, WalkerOptions};

pub const LIST_ITEM_ID: &str = "listItemId";
pub const LIST_INDENT: &str = "listIndent";
pub const LIST_TYPE: &str = "listType";
pub const LIST_STYLE: &str = "listStyle";
pub const LIST_START: &str = "listStart";
pub const LIST_REVERSED: &str = "listReversed";
pub const TODO_LIST_CHECKED: &str = "todoListChecked";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Bulleted,
    Numbered,
    Todo,
}

impl ListType {
    pub const ALL: [ListType; 3] = [ListType::Bulleted, ListType::Numbered, ListType::Todo];

    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Bulleted => "bulleted",
            ListType::Numbered => "numbered",
            ListType::Todo => "todo",
        }
    }

    pub fn command_name(self) -> &'static str {
        match self {
            ListType::Bulleted => "bulletedList",
            ListType::Numbered => "numberedList",
            ListType::Todo => "todoList",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownListType(pub String);

impl fmt::Display for UnknownListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown list type `{}`", self.0)
    }
}

impl std::error::Error for UnknownListType {}

impl FromStr for ListType {
    type Err = UnknownListType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bulleted" => Ok(ListType::Bulleted),
            "numbered" => Ok(ListType::Numbered),
            "todo" => Ok(ListType::Todo),
            other => Err(UnknownListType(other.to_string())),
        }
    }
}

impl From<ListType> for AttributeValue {
    fn from(value: ListType) -> Self {
        AttributeValue::Text(value.as_str().to_string())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ListBlock<'a> {
    block: &'a Block,
    item_id: &'a str,
}

impl<'a> ListBlock<'a> {
    pub fn block(&self) -> &'a Block {
        self.block
    }

    pub fn item_id(&self) -> &'a str {
        self.item_id
    }

    pub fn indent(&self) -> usize {
        indent_of(self.block)
    }

    /// The raw `listType` value. Unknown types are kept as they are.
    pub fn type_name(&self) -> Option<&'a str> {
        self.block.attribute(LIST_TYPE).and_then(AttributeValue::as_str)
    }

    pub fn list_type(&self) -> Option<ListType> {
        self.type_name().and_then(|name| name.parse().ok())
    }
}

impl Block {
    pub fn as_list_block(&self) -> Option<ListBlock<'_>> {
        let item_id = self.attribute(LIST_ITEM_ID)?.as_str()?;
        Some(ListBlock {
            block: self,
            item_id,
        })
    }
}

pub fn is_list_block(block: &Block) -> bool {
    block.as_list_block().is_some()
}

/// Blocks without a valid indent count as indent 0.
pub fn indent_of(block: &Block) -> usize {
    block
        .attribute(LIST_INDENT)
        .and_then(AttributeValue::as_integer)
        .map(|indent| indent.max(0) as usize)
        .unwrap_or(0)
}

pub fn item_id_of(block: &Block) -> Option<&str> {
    block.attribute(LIST_ITEM_ID).and_then(AttributeValue::as_str)
}

pub fn type_of(block: &Block) -> Option<ListType> {
    block
        .attribute(LIST_TYPE)
        .and_then(AttributeValue::as_str)
        .and_then(|name| name.parse().ok())
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod list_tests;
