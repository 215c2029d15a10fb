//! A list engine for block-structured documents.
//!
//! Lists are kept flat in the model: every list block carries an item id, an
//! indent and a list type. A post-fixer keeps that representation consistent after
//! every change, commands edit it, and the converters turn it into nested
//! `ul`/`ol`/`li` markup and back.

pub mod config;
pub mod editor;
pub mod error;
pub mod list;
pub mod model;
pub mod render;
pub mod theme;
pub mod view;

#[cfg(test)]
mod test_support;

pub use config::ListConfig;
pub use editor::{Editor, EditorBuilder};
pub use error::{ListError, Result};
pub use list::{ListItemIdGenerator, ListType, RandomIds, SequentialIds};
pub use model::{Block, BlockId, Document, Element, Model, Position, Schema, Selection};
