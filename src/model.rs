use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, trace};

mod schema;
mod selection;
mod writer;

pub use schema::{BlockDefinition, Schema};
pub use selection::{Position, Selection};
pub use writer::{Change, Writer};

use writer::Differ;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(value) => f.write_str(value),
            AttributeValue::Integer(value) => write!(f, "{value}"),
            AttributeValue::Boolean(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        AttributeValue::Integer(value as i64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub attributes: Attributes,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            text: String::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Self::new("paragraph").with_text(text)
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    name: String,
    text: String,
    attributes: Attributes,
}

impl Block {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// In characters, the unit of [`Position::offset`].
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn to_element(&self) -> Element {
        Element {
            name: self.name.clone(),
            text: self.text.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Document {
    blocks: Vec<Block>,
    positions: HashMap<BlockId, usize>,
    next_id: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut document = Self::new();
        for element in elements {
            let index = document.blocks.len();
            document.insert_element(index, element);
        }
        document
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.index_of(id).map(|index| &self.blocks[index])
    }

    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn first(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn previous_sibling(&self, id: BlockId) -> Option<&Block> {
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|idx| self.blocks.get(idx))
    }

    pub fn next_sibling(&self, id: BlockId) -> Option<&Block> {
        let index = self.index_of(id)?;
        self.blocks.get(index + 1)
    }

    fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        let index = self.index_of(id)?;
        self.blocks.get_mut(index)
    }

    fn insert_element(&mut self, index: usize, element: Element) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        let index = index.min(self.blocks.len());
        self.blocks.insert(
            index,
            Block {
                id,
                name: element.name,
                text: element.text,
                attributes: element.attributes,
            },
        );
        self.reindex_from(index);
        id
    }

    fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let index = self.positions.remove(&id)?;
        let block = self.blocks.remove(index);
        self.reindex_from(index);
        Some(block)
    }

    fn reindex_from(&mut self, start: usize) {
        for (offset, block) in self.blocks[start..].iter().enumerate() {
            self.positions.insert(block.id, start + offset);
        }
    }
}

/// Returning `true` from `fix` runs all post-fixers again.
pub trait PostFixer {
    fn fix(&self, writer: &mut Writer<'_>) -> bool;
}

pub struct Model {
    document: Document,
    schema: Schema,
    selection: Selection,
    differ: Differ,
    post_fixers: Vec<Box<dyn PostFixer>>,
}

impl Model {
    pub fn new(mut document: Document, schema: Schema) -> Self {
        ensure_document_initialized(&mut document);
        let selection = document
            .first()
            .map(|block| Selection::collapsed(Position::new(block.id(), 0)))
            .unwrap_or_default();
        Self {
            document,
            schema,
            selection,
            differ: Differ::default(),
            post_fixers: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn register_post_fixer(&mut self, post_fixer: Box<dyn PostFixer>) {
        self.post_fixers.push(post_fixer);
    }

    /// Positions pointing outside the document are ignored.
    pub fn set_selection(&mut self, selection: Selection) -> bool {
        if !selection.is_valid(&self.document) {
            return false;
        }
        self.selection = selection.clamped(&self.document);
        true
    }

    pub fn change<R>(&mut self, f: impl FnOnce(&mut Writer<'_>) -> R) -> R {
        let Model {
            document,
            schema,
            selection,
            differ,
            post_fixers,
        } = self;
        let mut writer = Writer::new(document, schema, selection, differ);
        let result = f(&mut writer);

        writer.ensure_not_empty();

        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut applied = false;
            for post_fixer in post_fixers.iter() {
                applied |= post_fixer.fix(&mut writer);
            }
            trace!(pass = passes, applied, "post-fixer pass finished");
            if !applied {
                break;
            }
        }
        if passes > 1 {
            debug!(passes, "post-fixers reached a fixed point");
        }

        writer.normalize_selection();
        result
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.differ.is_empty()
    }

    pub fn take_changes(&mut self) -> Vec<Change> {
        self.differ.take()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(Document::new(), Schema::default())
    }
}

pub(crate) fn ensure_document_initialized(document: &mut Document) {
    if document.is_empty() {
        document.insert_element(0, Element::paragraph(""));
    }
}

pub(crate) fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}
