//! Conversion between the flat list model and nested `ul`/`ol`/`li` views.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use super::postfixers::affected_list_heads;
use super::strategies::{StrategyRegistry, StrategyScope};
use super::utils::{get_all_list_item_blocks, sort_blocks};
use super::walker::{ListWalker, SiblingListBlocks, WalkerOptions};
use super::{
    LIST_INDENT, LIST_ITEM_ID, LIST_TYPE, ListItemIdGenerator, ListType, item_id_of, type_of,
};
use crate::model::{Attributes, Block, BlockId, Change, Document, Element, Schema};
use crate::view::{ViewElement, ViewFragment, ViewNode};

pub const BOGUS_PARAGRAPH_CLASS: &str = "ck-list-bogus-paragraph";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Data,
    /// Bogus paragraphs are kept as a `span`.
    Editing,
}

#[derive(Clone, Copy)]
pub struct ConversionContext<'a> {
    pub schema: &'a Schema,
    pub strategies: &'a StrategyRegistry,
    pub mode: RenderMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrapperLevel {
    /// Items with the same id at the same level share one `li`.
    pub item_id: String,
    pub list: ViewElement,
    pub item: ViewElement,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRendering {
    pub block: BlockId,
    /// Outermost level first.
    pub wrappers: Vec<WrapperLevel>,
    pub content: ViewNode,
}

impl BlockRendering {
    pub fn content_tag(&self) -> Option<&str> {
        self.content.as_element().map(|element| element.name.as_str())
    }
}

pub fn block_wrappers(
    document: &Document,
    block: &Block,
    strategies: &StrategyRegistry,
) -> Vec<WrapperLevel> {
    let mut levels = Vec::new();
    let Some(list_block) = block.as_list_block() else {
        return levels;
    };

    let mut current = block;
    for _ in 0..=list_block.indent() {
        let mut item = ViewElement::new("li");
        for strategy in strategies.for_scope(StrategyScope::Item) {
            let value = current.attribute(strategy.attribute_name());
            strategy.set_attribute_on_downcast(value, &mut item);
        }
        let list_name = match type_of(current) {
            Some(ListType::Numbered) => "ol",
            _ => "ul",
        };
        let mut list = ViewElement::new(list_name);
        for strategy in strategies.for_scope(StrategyScope::List) {
            let value = current.attribute(strategy.attribute_name());
            strategy.set_attribute_on_downcast(value, &mut list);
        }
        levels.push(WrapperLevel {
            item_id: item_id_of(current).unwrap_or_default().to_string(),
            list,
            item,
        });

        match ListWalker::first(document, current, WalkerOptions::new().lower_indent()) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    levels.reverse();
    levels
}

/// A paragraph that is the only block of its item and has nothing but list
/// attributes is rendered without its own element.
pub fn is_bogus_paragraph(document: &Document, block: &Block, ctx: &ConversionContext<'_>) -> bool {
    if block.name() != "paragraph" || block.as_list_block().is_none() {
        return false;
    }
    let only_list_attributes = block
        .attributes()
        .keys()
        .all(|key| ctx.schema.is_list_attribute(key) || ctx.strategies.handles_attribute(key));
    only_list_attributes && get_all_list_item_blocks(document, block.id(), false).len() < 2
}

fn content_tag(name: &str) -> &'static str {
    match name {
        "paragraph" => "p",
        "heading1" => "h1",
        "heading2" => "h2",
        "heading3" => "h3",
        "codeBlock" => "pre",
        "imageBlock" => "figure",
        "horizontalLine" => "hr",
        _ => "div",
    }
}

fn render_content(document: &Document, block: &Block, ctx: &ConversionContext<'_>) -> ViewNode {
    if is_bogus_paragraph(document, block, ctx) {
        return match ctx.mode {
            RenderMode::Data => ViewNode::Text(block.text().to_string()),
            RenderMode::Editing => ViewElement::new("span")
                .with_class(BOGUS_PARAGRAPH_CLASS)
                .with_text(block.text())
                .into(),
        };
    }
    let mut element = ViewElement::new(content_tag(block.name()));
    if block.name() == "imageBlock" {
        element.add_class("image");
    }
    if !block.text().is_empty() {
        element.children.push(ViewNode::Text(block.text().to_string()));
    }
    element.into()
}

pub fn render_block(
    document: &Document,
    block: &Block,
    ctx: &ConversionContext<'_>,
) -> BlockRendering {
    BlockRendering {
        block: block.id(),
        wrappers: block_wrappers(document, block, ctx.strategies),
        content: render_content(document, block, ctx),
    }
}

// ============================================================================
// Assembling
// ============================================================================

enum ArenaNode {
    Element(ViewElement, Vec<usize>),
    Leaf(ViewNode),
}

#[derive(Default)]
struct Arena {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
}

impl Arena {
    fn push(&mut self, node: ArenaNode, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        match parent {
            Some(parent) => {
                if let Some(ArenaNode::Element(_, children)) = self.nodes.get_mut(parent) {
                    children.push(index);
                }
            }
            None => self.roots.push(index),
        }
        index
    }

    fn build(&self, index: usize) -> Option<ViewNode> {
        match self.nodes.get(index)? {
            ArenaNode::Leaf(node) => Some(node.clone()),
            ArenaNode::Element(element, children) => {
                let mut element = element.clone();
                element.children = children.iter().filter_map(|&child| self.build(child)).collect();
                Some(ViewNode::Element(element))
            }
        }
    }
}

struct OpenLevel {
    level: WrapperLevel,
    list: usize,
    item: usize,
}

/// A block reuses the open wrappers of the previous block as long as they are
/// equal. At the first differing level it may still share the list element.
pub fn assemble<'a>(renderings: impl IntoIterator<Item = &'a BlockRendering>) -> ViewFragment {
    let mut arena = Arena::default();
    let mut open: Vec<OpenLevel> = Vec::new();

    for rendering in renderings {
        let wrappers = &rendering.wrappers;
        let mut keep = 0;
        while keep < open.len() && keep < wrappers.len() && open[keep].level == wrappers[keep] {
            keep += 1;
        }
        let shared_list = (keep < open.len()
            && keep < wrappers.len()
            && open[keep].level.list == wrappers[keep].list)
            .then(|| open[keep].list);
        open.truncate(keep);

        for (depth, level) in wrappers.iter().enumerate().skip(keep) {
            let parent = open.last().map(|open| open.item);
            let list = match shared_list {
                Some(list) if depth == keep => list,
                _ => arena.push(ArenaNode::Element(level.list.clone(), Vec::new()), parent),
            };
            let item = arena.push(ArenaNode::Element(level.item.clone(), Vec::new()), Some(list));
            open.push(OpenLevel {
                level: level.clone(),
                list,
                item,
            });
        }

        let skip_leaf = matches!(&rendering.content, ViewNode::Text(text) if text.is_empty());
        if !skip_leaf {
            let parent = open.last().map(|open| open.item);
            arena.push(ArenaNode::Leaf(rendering.content.clone()), parent);
        }
    }

    let children = arena
        .roots
        .iter()
        .filter_map(|&root| arena.build(root))
        .collect();
    ViewFragment::new(children)
}

pub fn downcast(document: &Document, ctx: &ConversionContext<'_>) -> ViewFragment {
    let renderings: Vec<BlockRendering> = document
        .blocks()
        .iter()
        .map(|block| render_block(document, block, ctx))
        .collect();
    assemble(&renderings)
}

// ============================================================================
// Upcasting
// ============================================================================

const INLINE_ELEMENTS: [&str; 12] = [
    "span", "strong", "em", "b", "i", "u", "s", "a", "code", "sub", "sup", "br",
];

struct Upcaster<'a> {
    ids: &'a dyn ListItemIdGenerator,
    strategies: &'a StrategyRegistry,
    output: Vec<Element>,
}

impl Upcaster<'_> {
    fn convert_nodes(&mut self, nodes: &[ViewNode]) {
        let mut inline = String::new();
        for node in nodes {
            match node {
                ViewNode::Text(text) => inline.push_str(text),
                ViewNode::Element(element) if is_inline(element) => {
                    inline.push_str(&element.text_content())
                }
                ViewNode::Element(element) => {
                    self.flush_inline(&mut inline, None);
                    if is_list(element) {
                        self.convert_list(element, 0);
                    } else if let Some(block) = block_element(element) {
                        self.output.push(block);
                    } else {
                        self.convert_nodes(&element.children);
                    }
                }
            }
        }
        self.flush_inline(&mut inline, None);
    }

    fn flush_inline(&mut self, inline: &mut String, attributes: Option<&Attributes>) -> bool {
        let text = inline.trim().to_string();
        inline.clear();
        if text.is_empty() {
            return false;
        }
        self.push_block(Element::paragraph(&text), attributes);
        true
    }

    fn push_block(&mut self, mut element: Element, attributes: Option<&Attributes>) {
        if let Some(attributes) = attributes {
            if !element.has_attribute(LIST_ITEM_ID) {
                for (key, value) in attributes {
                    element.attributes.insert(key.clone(), value.clone());
                }
            }
        }
        self.output.push(element);
    }

    fn convert_list(&mut self, list: &ViewElement, indent: usize) {
        let default_type = if list.is("ol") {
            ListType::Numbered
        } else {
            ListType::Bulleted
        };
        let mut list_attributes = Attributes::new();
        list_attributes.insert(LIST_TYPE.to_string(), default_type.into());
        list_attributes.insert(LIST_INDENT.to_string(), indent.into());
        for strategy in self.strategies.for_scope(StrategyScope::List) {
            if let Some(value) = strategy.get_attribute_on_upcast(list) {
                list_attributes.insert(strategy.attribute_name().to_string(), value);
            }
        }

        let mut has_items = false;
        let mut stray = String::new();
        for node in &list.children {
            match node {
                ViewNode::Element(element) if element.is("li") => {
                    has_items |= self.flush_stray_item(&mut stray, &list_attributes);
                    let attributes = self.item_attributes(&list_attributes, Some(element));
                    trace!(indent, "upcasting list item");
                    self.convert_item(&element.children, indent, &attributes);
                    has_items = true;
                }
                ViewNode::Element(element) if is_list(element) => {
                    has_items |= self.flush_stray_item(&mut stray, &list_attributes);
                    // A list nested directly in a list belongs to an empty item.
                    if !has_items {
                        let attributes = self.item_attributes(&list_attributes, None);
                        self.push_block(Element::paragraph(""), Some(&attributes));
                        has_items = true;
                    }
                    self.convert_list(element, indent + 1);
                }
                ViewNode::Text(text) => stray.push_str(text),
                ViewNode::Element(element) if is_inline(element) => {
                    stray.push_str(&element.text_content())
                }
                ViewNode::Element(_) => {
                    has_items |= self.flush_stray_item(&mut stray, &list_attributes);
                    let attributes = self.item_attributes(&list_attributes, None);
                    self.convert_item(std::slice::from_ref(node), indent, &attributes);
                    has_items = true;
                }
            }
        }
        self.flush_stray_item(&mut stray, &list_attributes);
    }

    fn item_attributes(
        &self,
        list_attributes: &Attributes,
        item: Option<&ViewElement>,
    ) -> Attributes {
        let mut attributes = list_attributes.clone();
        attributes.insert(LIST_ITEM_ID.to_string(), self.ids.next_id().into());
        if let Some(item) = item {
            for strategy in self.strategies.for_scope(StrategyScope::Item) {
                if let Some(value) = strategy.get_attribute_on_upcast(item) {
                    attributes.insert(strategy.attribute_name().to_string(), value);
                }
            }
        }
        attributes
    }

    fn flush_stray_item(&mut self, stray: &mut String, list_attributes: &Attributes) -> bool {
        if stray.trim().is_empty() {
            stray.clear();
            return false;
        }
        let attributes = self.item_attributes(list_attributes, None);
        self.flush_inline(stray, Some(&attributes))
    }

    fn convert_item(&mut self, nodes: &[ViewNode], indent: usize, attributes: &Attributes) {
        let mut own_blocks = 0usize;
        let mut inline = String::new();

        for node in nodes {
            match node {
                ViewNode::Text(text) => inline.push_str(text),
                ViewNode::Element(element) if is_inline(element) => {
                    inline.push_str(&element.text_content())
                }
                ViewNode::Element(element) if is_list(element) => {
                    if self.flush_inline(&mut inline, Some(attributes)) {
                        own_blocks += 1;
                    }
                    // The item must exist before its nested list.
                    if own_blocks == 0 {
                        self.push_block(Element::paragraph(""), Some(attributes));
                        own_blocks += 1;
                    }
                    self.convert_list(element, indent + 1);
                }
                ViewNode::Element(element) => {
                    if self.flush_inline(&mut inline, Some(attributes)) {
                        own_blocks += 1;
                    }
                    let block = block_element(element)
                        .unwrap_or_else(|| Element::paragraph(element.text_content().trim()));
                    self.push_block(block, Some(attributes));
                    own_blocks += 1;
                }
            }
        }
        if self.flush_inline(&mut inline, Some(attributes)) {
            own_blocks += 1;
        }
        if own_blocks == 0 {
            self.push_block(Element::paragraph(""), Some(attributes));
        }
    }
}

fn is_list(element: &ViewElement) -> bool {
    element.is("ul") || element.is("ol")
}

fn is_inline(element: &ViewElement) -> bool {
    INLINE_ELEMENTS.contains(&element.name.as_str()) && !element.has_class(BOGUS_PARAGRAPH_CLASS)
}

fn block_element(element: &ViewElement) -> Option<Element> {
    let name = match element.name.as_str() {
        "p" => "paragraph",
        "span" if element.has_class(BOGUS_PARAGRAPH_CLASS) => "paragraph",
        "h1" => "heading1",
        "h2" => "heading2",
        "h3" => "heading3",
        "pre" => "codeBlock",
        "figure" => "imageBlock",
        "hr" => "horizontalLine",
        _ => return None,
    };
    Some(Element::new(name).with_text(&element.text_content()))
}

/// Every `li` gets a fresh id. Text and lists found directly in a list become items
/// of their own.
pub fn upcast(
    fragment: &ViewFragment,
    ids: &dyn ListItemIdGenerator,
    strategies: &StrategyRegistry,
) -> Vec<Element> {
    let mut upcaster = Upcaster {
        ids,
        strategies,
        output: Vec::new(),
    };
    upcaster.convert_nodes(&fragment.children);
    upcaster.output
}

// ============================================================================
// Editing view
// ============================================================================

/// Rendering cache of a live document. A change to one block can alter the
/// wrappers of its nested items and the content tag of other blocks of its item.
#[derive(Debug, Default)]
pub struct EditingView {
    mode: RenderMode,
    renderings: HashMap<BlockId, BlockRendering>,
}

impl EditingView {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            renderings: HashMap::new(),
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    fn context<'a>(
        &self,
        schema: &'a Schema,
        strategies: &'a StrategyRegistry,
    ) -> ConversionContext<'a> {
        ConversionContext {
            schema,
            strategies,
            mode: self.mode,
        }
    }

    pub fn render_all(
        &mut self,
        document: &Document,
        schema: &Schema,
        strategies: &StrategyRegistry,
    ) {
        let ctx = self.context(schema, strategies);
        self.renderings = document
            .blocks()
            .iter()
            .map(|block| (block.id(), render_block(document, block, &ctx)))
            .collect();
    }

    /// Updates the cache after a change. Returns the blocks that had to be rendered
    /// again although the change did not touch them, in document order.
    pub fn apply_changes(
        &mut self,
        document: &Document,
        schema: &Schema,
        strategies: &StrategyRegistry,
        changes: &[Change],
    ) -> Vec<BlockId> {
        let ctx = self.context(schema, strategies);
        self.renderings.retain(|id, _| document.contains(*id));

        let mut rendered = HashSet::new();
        for block in changes.iter().filter_map(Change::block) {
            let Some(block) = document.get(block) else {
                continue;
            };
            if rendered.insert(block.id()) {
                self.renderings
                    .insert(block.id(), render_block(document, block, &ctx));
            }
        }

        let mut reconverted = Vec::new();
        for head in affected_list_heads(document, schema, changes) {
            let Some(head) = document.get(head) else {
                continue;
            };
            for node in SiblingListBlocks::from_head(document, head) {
                let block = node.block;
                if rendered.contains(&block.id()) {
                    continue;
                }
                let expected = render_block(document, block, &ctx);
                if self.renderings.get(&block.id()) != Some(&expected) {
                    trace!(block = %block.id(), "wrapper mismatch, re-rendering");
                    self.renderings.insert(block.id(), expected);
                    rendered.insert(block.id());
                    reconverted.push(block.id());
                }
            }
        }

        for block in document.blocks() {
            if !self.renderings.contains_key(&block.id()) {
                self.renderings
                    .insert(block.id(), render_block(document, block, &ctx));
            }
        }

        if !reconverted.is_empty() {
            debug!(count = reconverted.len(), "re-converted list blocks");
        }
        sort_blocks(document, reconverted)
    }

    pub fn rendering(&self, block: BlockId) -> Option<&BlockRendering> {
        self.renderings.get(&block)
    }

    pub fn fragment(&self, document: &Document) -> ViewFragment {
        assemble(
            document
                .blocks()
                .iter()
                .filter_map(|block| self.renderings.get(&block.id())),
        )
    }

    pub fn to_markup(&self, document: &Document) -> String {
        self.fragment(document).to_markup()
    }
}

#[cfg(test)]
#[path = "converters_tests.rs"]
mod converters_tests;
