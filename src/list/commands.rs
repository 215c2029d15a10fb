//! User-facing list operations. Each one performs its whole edit inside a single
//! change.

use std::rc::Rc;

use tracing::debug;

use super::utils::{
    IndentOptions, expand_list_blocks_to_complete_items, get_list_item_blocks, get_list_items,
    get_nested_list_blocks, indent_blocks, is_first_block_of_list_item, is_single_list_item,
    merge_list_item_before, outdent_blocks_with_merge, outdent_following_items,
    remove_list_attributes, sort_blocks, split_list_item_before,
};
use super::walker::{Direction, ListWalker, WalkerOptions};
use super::{
    LIST_INDENT, LIST_ITEM_ID, LIST_TYPE, ListItemIdGenerator, ListType, indent_of, is_list_block,
    item_id_of,
};
use crate::model::{
    AttributeValue, Attributes, BlockId, Document, Model, Position, Schema, Selection, Writer,
};

pub const INDENT_LIST: &str = "indentList";
pub const OUTDENT_LIST: &str = "outdentList";
pub const MERGE_LIST_ITEM_BACKWARD: &str = "mergeListItemBackward";
pub const MERGE_LIST_ITEM_FORWARD: &str = "mergeListItemForward";
pub const SPLIT_LIST_ITEM_BEFORE: &str = "splitListItemBefore";
pub const SPLIT_LIST_ITEM_AFTER: &str = "splitListItemAfter";

#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub document: &'a Document,
    pub schema: &'a Schema,
    pub selection: &'a Selection,
}

impl<'a> CommandContext<'a> {
    pub fn from_model(model: &'a Model) -> Self {
        Self {
            document: model.document(),
            schema: model.schema(),
            selection: model.selection(),
        }
    }

    pub fn from_writer(writer: &'a Writer<'_>) -> Self {
        Self {
            document: writer.document(),
            schema: writer.schema(),
            selection: writer.selection(),
        }
    }

    fn selected_block_object(&self) -> Option<BlockId> {
        self.selection
            .selected_block_object(self.document, self.schema)
    }

    fn first_position(&self) -> Position {
        self.selection.first_position(self.document)
    }

    fn last_position(&self) -> Position {
        self.selection.last_position(self.document)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExecuteOptions {
    /// Toggle commands: `Some(true)` always turns the list on, `Some(false)` off.
    pub force_value: Option<bool>,
    pub additional_attributes: Attributes,
    pub merge_content: bool,
}

impl ExecuteOptions {
    pub fn force(value: bool) -> Self {
        Self {
            force_value: Some(value),
            ..Self::default()
        }
    }

    pub fn merging_content() -> Self {
        Self {
            merge_content: true,
            ..Self::default()
        }
    }
}

/// Called inside the command's change with the blocks it changed.
pub type AfterExecuteListener = Box<dyn FnMut(&mut Writer<'_>, &[BlockId])>;

pub trait Command {
    fn name(&self) -> &str;

    fn refresh(&mut self, ctx: CommandContext<'_>);

    fn is_enabled(&self) -> bool;

    fn value(&self) -> bool {
        false
    }

    /// Performs the edit. The caller must have refreshed the command and checked
    /// that it is enabled.
    fn execute(&mut self, writer: &mut Writer<'_>, options: &ExecuteOptions) -> Vec<BlockId>;

    fn on_after_execute(&mut self, listener: AfterExecuteListener);
}

#[derive(Default)]
struct CommandState {
    enabled: bool,
    value: bool,
    listeners: Vec<AfterExecuteListener>,
}

impl CommandState {
    fn finish(
        &mut self,
        name: &str,
        writer: &mut Writer<'_>,
        changed: Vec<BlockId>,
    ) -> Vec<BlockId> {
        let changed = sort_blocks(writer.document(), changed);
        debug!(command = name, changed = changed.len(), "command executed");
        for listener in &mut self.listeners {
            listener(writer, &changed);
        }
        changed
    }
}

fn selected_blocks(ctx: &CommandContext<'_>) -> Vec<BlockId> {
    ctx.selection.selected_blocks(ctx.document)
}

fn selected_list_blocks(ctx: &CommandContext<'_>) -> Vec<BlockId> {
    sort_blocks(ctx.document, selected_blocks(ctx))
        .into_iter()
        .take_while(|&block| {
            ctx.document
                .get(block)
                .map(is_list_block)
                .unwrap_or(false)
        })
        .collect()
}

fn list_type_is(document: &Document, block: BlockId, list_type: ListType) -> bool {
    document
        .get(block)
        .and_then(|block| block.attribute(LIST_TYPE))
        .and_then(AttributeValue::as_str)
        == Some(list_type.as_str())
}

// ============================================================================
// Toggle
// ============================================================================

pub struct ListCommand {
    list_type: ListType,
    ids: Rc<dyn ListItemIdGenerator>,
    state: CommandState,
}

impl ListCommand {
    pub fn new(list_type: ListType, ids: Rc<dyn ListItemIdGenerator>) -> Self {
        Self {
            list_type,
            ids,
            state: CommandState::default(),
        }
    }

    pub fn list_type(&self) -> ListType {
        self.list_type
    }

    fn compute_value(&self, ctx: &CommandContext<'_>) -> bool {
        let blocks = selected_blocks(ctx);
        !blocks.is_empty()
            && blocks
                .iter()
                .all(|&block| list_type_is(ctx.document, block, self.list_type))
    }

    fn allowed_blocks(ctx: &CommandContext<'_>) -> Vec<BlockId> {
        selected_blocks(ctx)
            .into_iter()
            .filter(|&block| {
                ctx.document
                    .get(block)
                    .map(|block| ctx.schema.check_attribute(block.name(), LIST_TYPE))
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl Command for ListCommand {
    fn name(&self) -> &str {
        self.list_type.command_name()
    }

    fn refresh(&mut self, ctx: CommandContext<'_>) {
        self.state.value = self.compute_value(&ctx);
        self.state.enabled = !selected_blocks(&ctx).is_empty()
            && (self.state.value || !Self::allowed_blocks(&ctx).is_empty());
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    fn value(&self) -> bool {
        self.state.value
    }

    fn execute(&mut self, writer: &mut Writer<'_>, options: &ExecuteOptions) -> Vec<BlockId> {
        let ctx = CommandContext::from_writer(writer);
        let blocks = Self::allowed_blocks(&ctx);
        let value = self.compute_value(&ctx);
        let selected_object = ctx.selected_block_object();
        let collapsed = ctx.selection.is_collapsed();
        let Some(&first) = blocks.first() else {
            return Vec::new();
        };
        let turn_off = options.force_value.map(|force| !force).unwrap_or(value);
        let mut changed = Vec::new();

        if turn_off {
            let Some(&last) = blocks.last() else {
                return Vec::new();
            };
            let item_blocks =
                get_list_item_blocks(writer.document(), last, Direction::Forward, false);
            if let Some(&tail) = item_blocks.get(1) {
                changed.extend(split_list_item_before(writer, tail, self.ids.as_ref()));
            }
            changed.extend(remove_list_attributes(writer, &blocks));
            changed.extend(outdent_following_items(writer, last));
        } else if (selected_object.is_some() || collapsed)
            && writer.document().get(first).is_some_and(is_list_block)
        {
            let start = selected_object.unwrap_or(first);
            let list = get_list_items(writer.document(), start);
            for &block in &list {
                writer.set_attributes(&options.additional_attributes, block);
                writer.set_attribute(LIST_TYPE, self.list_type, block);
            }
            changed.extend(list);
        } else {
            for &block in &blocks {
                let is_list = writer
                    .document()
                    .get(block)
                    .map(|block| block.has_attribute(LIST_TYPE));
                match is_list {
                    Some(false) => {
                        writer.set_attributes(&options.additional_attributes, block);
                        writer.set_attribute(LIST_INDENT, 0i64, block);
                        writer.set_attribute(LIST_ITEM_ID, self.ids.next_id(), block);
                        writer.set_attribute(LIST_TYPE, self.list_type, block);
                        changed.push(block);
                    }
                    Some(true) => {
                        let item =
                            expand_list_blocks_to_complete_items(writer.document(), &[block], false);
                        for node in item {
                            if !list_type_is(writer.document(), node, self.list_type) {
                                writer.set_attributes(&options.additional_attributes, node);
                                writer.set_attribute(LIST_TYPE, self.list_type, node);
                                changed.push(node);
                            }
                        }
                    }
                    None => {}
                }
            }
        }

        let name = self.list_type.command_name();
        self.state.finish(name, writer, changed)
    }

    fn on_after_execute(&mut self, listener: AfterExecuteListener) {
        self.state.listeners.push(listener);
    }
}

// ============================================================================
// Indent / outdent
// ============================================================================

pub struct ListIndentCommand {
    direction: Direction,
    ids: Rc<dyn ListItemIdGenerator>,
    state: CommandState,
}

impl ListIndentCommand {
    pub fn indent(ids: Rc<dyn ListItemIdGenerator>) -> Self {
        Self {
            direction: Direction::Forward,
            ids,
            state: CommandState::default(),
        }
    }

    pub fn outdent(ids: Rc<dyn ListItemIdGenerator>) -> Self {
        Self {
            direction: Direction::Backward,
            ids,
            state: CommandState::default(),
        }
    }

    fn check_enabled(&self, ctx: &CommandContext<'_>) -> bool {
        let blocks = selected_list_blocks(ctx);
        let Some(&first) = blocks.first() else {
            return false;
        };
        if self.direction == Direction::Backward {
            return true;
        }
        if is_single_list_item(ctx.document, &blocks)
            && !is_first_block_of_list_item(ctx.document, first)
        {
            return true;
        }

        let expanded = expand_list_blocks_to_complete_items(ctx.document, &blocks, true);
        let Some(first) = expanded.first().and_then(|&block| ctx.document.get(block)) else {
            return false;
        };
        let sibling = ListWalker::first(ctx.document, first, WalkerOptions::new().same_indent());
        sibling.is_some_and(|sibling| sibling.attribute(LIST_TYPE) == first.attribute(LIST_TYPE))
    }
}

impl Command for ListIndentCommand {
    fn name(&self) -> &str {
        match self.direction {
            Direction::Forward => INDENT_LIST,
            Direction::Backward => OUTDENT_LIST,
        }
    }

    fn refresh(&mut self, ctx: CommandContext<'_>) {
        self.state.enabled = self.check_enabled(&ctx);
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    fn execute(&mut self, writer: &mut Writer<'_>, _options: &ExecuteOptions) -> Vec<BlockId> {
        let blocks = selected_list_blocks(&CommandContext::from_writer(writer));
        let Some(&first) = blocks.first() else {
            return Vec::new();
        };
        let mut changed = Vec::new();

        let document = writer.document();
        if is_single_list_item(document, &blocks) && !is_first_block_of_list_item(document, first) {
            if self.direction == Direction::Forward {
                changed.extend(indent_blocks(writer, &blocks, IndentOptions::default()));
            }
            changed.extend(split_list_item_before(writer, first, self.ids.as_ref()));
        } else if self.direction == Direction::Forward {
            changed.extend(indent_blocks(
                writer,
                &blocks,
                IndentOptions {
                    indent_by: 1,
                    expand: true,
                },
            ));
        } else {
            changed.extend(outdent_blocks_with_merge(writer, &blocks));
        }

        // Blocks adopt the type of the list they moved into.
        for &block in &changed {
            let document = writer.document();
            let Some(current) = document.get(block) else {
                continue;
            };
            if !current.has_attribute(LIST_TYPE) {
                continue;
            }
            let previous = ListWalker::first(document, current, WalkerOptions::new().same_indent())
                .and_then(|previous| previous.attribute(LIST_TYPE).cloned());
            if let Some(list_type) = previous {
                writer.set_attribute(LIST_TYPE, list_type, block);
            }
        }

        let name = self.name().to_string();
        self.state.finish(&name, writer, changed)
    }

    fn on_after_execute(&mut self, listener: AfterExecuteListener) {
        self.state.listeners.push(listener);
    }
}

// ============================================================================
// Merge
// ============================================================================

pub struct ListMergeCommand {
    direction: Direction,
    state: CommandState,
}

impl ListMergeCommand {
    pub fn backward() -> Self {
        Self {
            direction: Direction::Backward,
            state: CommandState::default(),
        }
    }

    pub fn forward() -> Self {
        Self {
            direction: Direction::Forward,
            state: CommandState::default(),
        }
    }

    fn check_enabled(&self, ctx: &CommandContext<'_>) -> bool {
        let selected_object = ctx.selected_block_object();
        if ctx.selection.is_collapsed() || selected_object.is_some() {
            let parent = selected_object.unwrap_or(ctx.first_position().block);
            let Some(block) = ctx.document.get(parent) else {
                return false;
            };
            if !is_list_block(block) {
                return false;
            }
            let sibling = match self.direction {
                Direction::Backward => ctx.document.previous_sibling(parent),
                Direction::Forward => ctx.document.next_sibling(parent),
            };
            let Some(sibling) = sibling else {
                return false;
            };
            !is_single_list_item(ctx.document, &[parent, sibling.id()])
        } else {
            let first = ctx.first_position();
            let last = ctx.last_position();
            first.block != last.block
                && ctx
                    .document
                    .get(last.block)
                    .map(is_list_block)
                    .unwrap_or(false)
        }
    }

    /// The second block joins the item of the first one.
    fn subjects(
        &self,
        ctx: &CommandContext<'_>,
        merge_content: bool,
    ) -> Option<(BlockId, BlockId)> {
        let selected_object = ctx.selected_block_object();
        if !(ctx.selection.is_collapsed() || selected_object.is_some()) {
            return Some((ctx.first_position().block, ctx.last_position().block));
        }

        let parent = selected_object.unwrap_or(ctx.first_position().block);
        match self.direction {
            Direction::Backward => {
                let block = ctx.document.get(parent)?;
                let first = if is_first_block_of_list_item(ctx.document, parent) && !merge_content {
                    ListWalker::first(
                        ctx.document,
                        block,
                        WalkerOptions::new().same_indent().lower_indent(),
                    )
                } else {
                    ctx.document.previous_sibling(parent)
                };
                Some((first?.id(), parent))
            }
            Direction::Forward => {
                let next = ctx.document.next_sibling(parent)?;
                Some((parent, next.id()))
            }
        }
    }
}

impl Command for ListMergeCommand {
    fn name(&self) -> &str {
        match self.direction {
            Direction::Backward => MERGE_LIST_ITEM_BACKWARD,
            Direction::Forward => MERGE_LIST_ITEM_FORWARD,
        }
    }

    fn refresh(&mut self, ctx: CommandContext<'_>) {
        self.state.enabled = self.check_enabled(&ctx);
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    fn execute(&mut self, writer: &mut Writer<'_>, options: &ExecuteOptions) -> Vec<BlockId> {
        let ctx = CommandContext::from_writer(writer);
        let Some((first, last)) = self.subjects(&ctx, options.merge_content) else {
            return Vec::new();
        };
        let collapsed = ctx.selection.is_collapsed();
        let (first_position, last_position) = (ctx.first_position(), ctx.last_position());
        let document = writer.document();
        let (Some(first_block), Some(last_block)) = (document.get(first), document.get(last)) else {
            return Vec::new();
        };
        let first_indent = indent_of(first_block) as i64;
        let last_indent = indent_of(last_block) as i64;
        let last_item_id = item_id_of(last_block).map(str::to_string);
        let first_len = first_block.len();
        let mut changed = Vec::new();

        if first_indent != last_indent {
            let mut subtree = vec![last];
            subtree.extend(get_nested_list_blocks(document, last));
            changed.extend(indent_blocks(
                writer,
                &subtree,
                IndentOptions {
                    indent_by: first_indent - last_indent,
                    expand: first_indent < last_indent,
                },
            ));
        }

        if options.merge_content {
            let (start, end) = if collapsed {
                (Position::new(first, first_len), Position::new(last, 0))
            } else {
                (first_position, last_position)
            };
            writer.delete_range(start, end);
            let merged = start.block;
            changed.push(merged);

            let next = writer.document().next_sibling(merged).map(|next| next.id());
            if let Some(next) = next {
                let continues_item = next != last
                    && last_item_id.is_some()
                    && writer.document().get(next).and_then(item_id_of) == last_item_id.as_deref();
                if continues_item {
                    changed.extend(merge_list_item_before(writer, next, merged));
                }
            }
        } else {
            changed.extend(merge_list_item_before(writer, last, first));
        }

        let name = self.name().to_string();
        self.state.finish(&name, writer, changed)
    }

    fn on_after_execute(&mut self, listener: AfterExecuteListener) {
        self.state.listeners.push(listener);
    }
}

// ============================================================================
// Split
// ============================================================================

/// Starts a new item at the selected block (`before`) or at the block after it
/// (`after`).
pub struct ListSplitCommand {
    direction: Direction,
    ids: Rc<dyn ListItemIdGenerator>,
    state: CommandState,
}

impl ListSplitCommand {
    pub fn before(ids: Rc<dyn ListItemIdGenerator>) -> Self {
        Self {
            direction: Direction::Backward,
            ids,
            state: CommandState::default(),
        }
    }

    pub fn after(ids: Rc<dyn ListItemIdGenerator>) -> Self {
        Self {
            direction: Direction::Forward,
            ids,
            state: CommandState::default(),
        }
    }

    fn start_block(&self, ctx: &CommandContext<'_>) -> Option<BlockId> {
        let parent = ctx.first_position().block;
        match self.direction {
            Direction::Backward => Some(parent),
            Direction::Forward => ctx.document.next_sibling(parent).map(|next| next.id()),
        }
    }
}

impl Command for ListSplitCommand {
    fn name(&self) -> &str {
        match self.direction {
            Direction::Backward => SPLIT_LIST_ITEM_BEFORE,
            Direction::Forward => SPLIT_LIST_ITEM_AFTER,
        }
    }

    fn refresh(&mut self, ctx: CommandContext<'_>) {
        self.state.enabled = ctx.selection.is_collapsed()
            && self.start_block(&ctx).is_some_and(|block| {
                ctx.document.get(block).map(is_list_block).unwrap_or(false)
                    && !is_first_block_of_list_item(ctx.document, block)
            });
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    fn execute(&mut self, writer: &mut Writer<'_>, _options: &ExecuteOptions) -> Vec<BlockId> {
        let Some(start) = self.start_block(&CommandContext::from_writer(writer)) else {
            return Vec::new();
        };
        let changed = split_list_item_before(writer, start, self.ids.as_ref());
        let name = self.name().to_string();
        self.state.finish(&name, writer, changed)
    }

    fn on_after_execute(&mut self, listener: AfterExecuteListener) {
        self.state.listeners.push(listener);
    }
}

pub fn list_commands(
    ids: Rc<dyn ListItemIdGenerator>,
    types: &[ListType],
) -> Vec<Box<dyn Command>> {
    let mut commands: Vec<Box<dyn Command>> = types
        .iter()
        .map(|&list_type| Box::new(ListCommand::new(list_type, ids.clone())) as Box<dyn Command>)
        .collect();
    commands.push(Box::new(ListIndentCommand::indent(ids.clone())));
    commands.push(Box::new(ListIndentCommand::outdent(ids.clone())));
    commands.push(Box::new(ListMergeCommand::backward()));
    commands.push(Box::new(ListMergeCommand::forward()));
    commands.push(Box::new(ListSplitCommand::before(ids.clone())));
    commands.push(Box::new(ListSplitCommand::after(ids)));
    commands
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod commands_tests;
