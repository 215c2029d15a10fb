use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::{Feature, ListConfig};
use crate::error::{ListError, Result};
use crate::list::commands::{
    AfterExecuteListener, Command, CommandContext, ExecuteOptions, INDENT_LIST,
    MERGE_LIST_ITEM_BACKWARD, MERGE_LIST_ITEM_FORWARD, OUTDENT_LIST, SPLIT_LIST_ITEM_AFTER,
    SPLIT_LIST_ITEM_BEFORE, list_commands,
};
use crate::list::converters::{ConversionContext, EditingView, RenderMode, downcast, upcast};
use crate::list::postfixers::{ListPostFixer, ListPostFixerHook, ListPropertiesHook, TodoListHook};
use crate::list::strategies::{
    DowncastStrategy, StrategyRegistry, TodoCheckedStrategy, TodoListStrategy,
};
use crate::list::utils::{
    get_all_list_item_blocks, is_first_block_of_list_item, is_last_block_of_list_item,
    is_single_list_item,
};
use crate::list::walker::{Direction, ListWalker, WalkerOptions};
use crate::list::{
    LIST_INDENT, LIST_ITEM_ID, LIST_TYPE, ListItemIdGenerator, ListType, TODO_LIST_CHECKED,
    indent_of, is_list_block,
};
use crate::model::{
    AttributeValue, Block, BlockId, Document, Element, Model, Position, Schema, Selection, Writer,
};
use crate::view::parse_markup;

pub struct EditorBuilder {
    elements: Vec<Element>,
    schema: Schema,
    config: ListConfig,
    ids: Option<Rc<dyn ListItemIdGenerator>>,
    strategies: Vec<Box<dyn DowncastStrategy>>,
    hooks: Vec<Box<dyn ListPostFixerHook>>,
    mode: RenderMode,
}

impl EditorBuilder {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            schema: Schema::default(),
            config: ListConfig::default(),
            ids: None,
            strategies: Vec::new(),
            hooks: Vec::new(),
            mode: RenderMode::Editing,
        }
    }

    pub fn with_config(mut self, config: ListConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Initial content. It goes through the post-fixer like any other change.
    pub fn with_elements(mut self, elements: Vec<Element>) -> Self {
        self.elements = elements;
        self
    }

    pub fn with_id_generator(mut self, ids: Rc<dyn ListItemIdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn DowncastStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_post_fixer_hook(mut self, hook: Box<dyn ListPostFixerHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Result<Editor> {
        let EditorBuilder {
            elements,
            mut schema,
            config,
            ids,
            strategies: extra_strategies,
            hooks: extra_hooks,
            mode,
        } = self;
        let ids = ids.unwrap_or_else(|| config.id_generator());

        let todo = config.has_feature(Feature::TodoList);
        let properties = if config.has_feature(Feature::ListProperties) {
            config.properties.enabled()
        } else {
            Vec::new()
        };

        let mut strategies = StrategyRegistry::new();
        if todo {
            schema.register_list_attribute(TODO_LIST_CHECKED);
            strategies.register(Box::new(TodoListStrategy))?;
            strategies.register(Box::new(TodoCheckedStrategy))?;
        }
        for property in &properties {
            strategies.register(Box::new(*property))?;
        }
        for strategy in extra_strategies {
            strategies.register(strategy)?;
        }

        let mut post_fixer = ListPostFixer::new(ids.clone());
        if todo {
            post_fixer.add_hook(Box::new(TodoListHook));
        }
        if !properties.is_empty() {
            post_fixer.add_hook(Box::new(ListPropertiesHook::new(properties)));
        }
        for hook in extra_hooks {
            post_fixer.add_hook(hook);
        }

        let mut model = Model::new(Document::new(), schema);
        model.register_post_fixer(Box::new(post_fixer));

        let mut types = vec![ListType::Bulleted, ListType::Numbered];
        if todo {
            types.push(ListType::Todo);
        }
        let commands = list_commands(ids.clone(), &types)
            .into_iter()
            .map(|command| (command.name().to_string(), command))
            .collect();

        let mut editor = Editor {
            model,
            config,
            ids,
            strategies,
            commands,
            view: EditingView::new(mode),
            last_reconverted: Vec::new(),
        };
        debug!(
            strategies = editor.strategies.len(),
            commands = editor.commands.len(),
            "editor initialised"
        );
        editor.load_elements(elements);
        Ok(editor)
    }
}

impl Default for EditorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Editor {
    model: Model,
    config: ListConfig,
    ids: Rc<dyn ListItemIdGenerator>,
    strategies: StrategyRegistry,
    commands: BTreeMap<String, Box<dyn Command>>,
    view: EditingView,
    last_reconverted: Vec<BlockId>,
}

impl Editor {
    pub fn builder() -> EditorBuilder {
        EditorBuilder::new()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn document(&self) -> &Document {
        self.model.document()
    }

    pub fn selection(&self) -> &Selection {
        self.model.selection()
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub fn view(&self) -> &EditingView {
        &self.view
    }

    pub fn view_markup(&self) -> String {
        self.view.to_markup(self.model.document())
    }

    /// Blocks the last change re-rendered although it did not touch them.
    pub fn last_reconverted(&self) -> &[BlockId] {
        &self.last_reconverted
    }

    pub fn id_generator(&self) -> Rc<dyn ListItemIdGenerator> {
        self.ids.clone()
    }

    pub fn change<R>(&mut self, f: impl FnOnce(&mut Writer<'_>) -> R) -> R {
        let result = self.model.change(f);
        self.after_change();
        result
    }

    pub fn set_selection(&mut self, selection: Selection) -> bool {
        let moved = self.model.set_selection(selection);
        if moved {
            self.refresh_commands();
        } else {
            warn!(?selection, "ignoring selection outside the document");
        }
        moved
    }

    pub fn select_block(&mut self, index: usize, offset: usize) -> bool {
        let Some(block) = self.model.document().block_at(index).map(Block::id) else {
            return false;
        };
        self.set_selection(Selection::collapsed(Position::new(block, offset)))
    }

    fn after_change(&mut self) {
        let changes = self.model.take_changes();
        if !changes.is_empty() {
            self.last_reconverted = self.view.apply_changes(
                self.model.document(),
                self.model.schema(),
                &self.strategies,
                &changes,
            );
        }
        self.refresh_commands();
    }

    fn refresh_commands(&mut self) {
        let ctx = CommandContext::from_model(&self.model);
        for command in self.commands.values_mut() {
            command.refresh(ctx);
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn command(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.command(name).is_some_and(|command| command.is_enabled())
    }

    pub fn command_value(&self, name: &str) -> bool {
        self.command(name).is_some_and(|command| command.value())
    }

    pub fn on_after_execute(&mut self, name: &str, listener: AfterExecuteListener) -> Result<()> {
        let command = self
            .commands
            .get_mut(name)
            .ok_or_else(|| ListError::UnknownCommand(name.to_string()))?;
        command.on_after_execute(listener);
        Ok(())
    }

    /// Executes a command. A disabled command does nothing and reports no changed
    /// blocks.
    pub fn execute(&mut self, name: &str, options: &ExecuteOptions) -> Result<Vec<BlockId>> {
        let command = self
            .commands
            .get_mut(name)
            .ok_or_else(|| ListError::UnknownCommand(name.to_string()))?;
        command.refresh(CommandContext::from_model(&self.model));
        if !command.is_enabled() {
            debug!(command = name, "command disabled, nothing to do");
            return Ok(Vec::new());
        }
        let changed = self
            .model
            .change(|writer| command.execute(writer, options));
        self.after_change();
        Ok(changed)
    }

    fn execute_default(&mut self, name: &str) -> Result<Vec<BlockId>> {
        self.execute(name, &ExecuteOptions::default())
    }

    // ------------------------------------------------------------------------
    // Key intents
    // ------------------------------------------------------------------------

    pub fn enter(&mut self, soft: bool) -> Result<()> {
        if soft {
            self.insert_text("\n");
            return Ok(());
        }

        let document = self.model.document();
        let selection = *self.model.selection();
        let position = selection.first_position(document);
        if let Some(block) = document.get(position.block) {
            if selection.is_collapsed() && is_list_block(block) && block.is_empty() {
                let first = is_first_block_of_list_item(document, block.id());
                let last = is_last_block_of_list_item(document, block.id());
                let command = match (first, last) {
                    (true, true) => Some(OUTDENT_LIST),
                    (true, false) => Some(SPLIT_LIST_ITEM_AFTER),
                    (false, true) => Some(SPLIT_LIST_ITEM_BEFORE),
                    (false, false) => None,
                };
                if let Some(command) = command {
                    self.execute_default(command)?;
                    return Ok(());
                }
            }
        }

        self.change(|writer| {
            let selection = *writer.selection();
            let document = writer.document();
            let start = selection.first_position(document);
            if !selection.is_collapsed() {
                let end = selection.last_position(document);
                writer.delete_range(start, end);
            }
            writer.split(start.block, start.offset);
        });

        // A block split off a single-block item starts a new item.
        let ctx = CommandContext::from_model(&self.model);
        let current = self.model.selection().last_position(ctx.document).block;
        let item_len = get_all_list_item_blocks(ctx.document, current, false).len();
        let split_enabled = self.commands.get_mut(SPLIT_LIST_ITEM_BEFORE).is_some_and(|split| {
            split.refresh(ctx);
            split.is_enabled()
        });
        if split_enabled && item_len == 2 {
            self.execute_default(SPLIT_LIST_ITEM_BEFORE)?;
        }
        Ok(())
    }

    pub fn delete(&mut self, direction: Direction) -> Result<()> {
        let document = self.model.document();
        let schema = self.model.schema();
        let selection = *self.model.selection();
        if selection.selected_block_object(document, schema).is_none() {
            let first = selection.first_position(document);
            let last = selection.last_position(document);
            if selection.is_collapsed() && direction == Direction::Backward {
                if first.is_at_start() && self.backspace_in_list(first.block)? {
                    return Ok(());
                }
            } else if !selection.is_collapsed() || last.is_at_end(document) {
                if self.is_enabled(MERGE_LIST_ITEM_FORWARD) {
                    let merge_content = self.merges_content(Direction::Forward);
                    self.execute(
                        MERGE_LIST_ITEM_FORWARD,
                        &ExecuteOptions {
                            merge_content,
                            ..ExecuteOptions::default()
                        },
                    )?;
                    return Ok(());
                }
            }
        }
        self.default_delete(direction);
        Ok(())
    }

    /// Returns `false` when the default behaviour should apply.
    fn backspace_in_list(&mut self, block: BlockId) -> Result<bool> {
        let document = self.model.document();
        let Some(current) = document.get(block) else {
            return Ok(false);
        };
        if !is_list_block(current) {
            return Ok(false);
        }
        let previous = ListWalker::first(
            document,
            current,
            WalkerOptions::new()
                .same_attributes(&[LIST_TYPE])
                .same_indent(),
        );
        if previous.is_none() && indent_of(current) == 0 {
            if !is_last_block_of_list_item(document, block) {
                self.execute_default(SPLIT_LIST_ITEM_AFTER)?;
            }
            self.execute_default(OUTDENT_LIST)?;
            return Ok(true);
        }

        if !self.is_enabled(MERGE_LIST_ITEM_BACKWARD) {
            return Ok(false);
        }
        let merge_content = self.merges_content(Direction::Backward);
        self.execute(
            MERGE_LIST_ITEM_BACKWARD,
            &ExecuteOptions {
                merge_content,
                ..ExecuteOptions::default()
            },
        )?;
        Ok(true)
    }

    /// Whether a merge should also join the content of the two blocks, or only make
    /// the second block part of the first block's item.
    fn merges_content(&self, direction: Direction) -> bool {
        let document = self.model.document();
        let schema = self.model.schema();
        let selection = self.model.selection();
        if !selection.is_collapsed() {
            return selection.selected_block_object(document, schema).is_none();
        }
        if direction == Direction::Forward {
            return true;
        }
        let parent = selection.first_position(document).block;
        let Some(previous) = document.previous_sibling(parent) else {
            return false;
        };
        if schema.is_object(previous.name()) {
            return false;
        }
        previous.is_empty() || is_single_list_item(document, &[parent, previous.id()])
    }

    fn default_delete(&mut self, direction: Direction) {
        self.change(|writer| {
            let selection = *writer.selection();
            let document = writer.document();
            let first = selection.first_position(document);
            let last = selection.last_position(document);
            if !selection.is_collapsed() {
                writer.delete_range(first, last);
                return;
            }
            let position = first;
            match direction {
                Direction::Backward if position.offset > 0 => {
                    writer.delete_text(position.block, position.offset - 1, position.offset);
                    writer.set_selection(Selection::collapsed(Position::new(
                        position.block,
                        position.offset - 1,
                    )));
                }
                Direction::Backward => {
                    let Some(previous) = document.previous_sibling(position.block) else {
                        return;
                    };
                    let previous = (previous.id(), writer.schema().is_object(previous.name()));
                    match previous {
                        (object, true) => {
                            writer.remove(object);
                        }
                        (previous, false) => {
                            writer.merge(previous, position.block);
                        }
                    }
                }
                Direction::Forward if !position.is_at_end(document) => {
                    writer.delete_text(position.block, position.offset, position.offset + 1);
                }
                Direction::Forward => {
                    let Some(next) = document.next_sibling(position.block) else {
                        return;
                    };
                    let next = (next.id(), writer.schema().is_object(next.name()));
                    match next {
                        (object, true) => {
                            writer.remove(object);
                        }
                        (next, false) => {
                            writer.merge(position.block, next);
                        }
                    }
                }
            }
        });
    }

    /// Tab indents, Shift+Tab outdents. Returns whether a list command ran.
    pub fn tab(&mut self, shift: bool) -> Result<bool> {
        let name = if shift { OUTDENT_LIST } else { INDENT_LIST };
        if !self.is_enabled(name) {
            return Ok(false);
        }
        self.execute_default(name)?;
        Ok(true)
    }

    pub fn insert_text(&mut self, text: &str) {
        self.change(|writer| {
            let selection = *writer.selection();
            let document = writer.document();
            let start = selection.first_position(document);
            if !selection.is_collapsed() {
                let end = selection.last_position(document);
                writer.delete_range(start, end);
            }
            writer.insert_text(start.block, start.offset, text);
            let offset = start.offset + text.chars().count();
            writer.set_selection(Selection::collapsed(Position::new(start.block, offset)));
        });
    }

    pub fn toggle_checked(&mut self) -> bool {
        let document = self.model.document();
        let block = self.model.selection().first_position(document).block;
        let Some(current) = document.get(block) else {
            return false;
        };
        if crate::list::type_of(current) != Some(ListType::Todo) {
            return false;
        }
        let checked = current.attribute(TODO_LIST_CHECKED) == Some(&AttributeValue::Boolean(true));
        let item = get_all_list_item_blocks(document, block, false);
        self.change(|writer| {
            for block in item {
                if checked {
                    writer.remove_attribute(TODO_LIST_CHECKED, block);
                } else {
                    writer.set_attribute(TODO_LIST_CHECKED, true, block);
                }
            }
        });
        true
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    pub fn paste(&mut self, markup: &str) -> Result<()> {
        let fragment = parse_markup(markup)?;
        let elements = upcast(&fragment, self.ids.as_ref(), &self.strategies);
        self.paste_elements(elements);
        Ok(())
    }

    /// Pasted into a list item, the blocks are re-based onto that item's indent and
    /// take over its list type.
    pub fn paste_elements(&mut self, mut elements: Vec<Element>) {
        if elements.is_empty() {
            return;
        }
        let document = self.model.document();
        let position = self.model.selection().first_position(document);
        if let Some(reference) = document.get(position.block).filter(|block| is_list_block(block)) {
            fix_pasted_indents(&mut elements, reference, self.ids.as_ref());
        }

        self.change(|writer| {
            let selection = *writer.selection();
            let document = writer.document();
            let mut position = selection.first_position(document);
            if !selection.is_collapsed() {
                let end = selection.last_position(document);
                writer.delete_range(position, end);
                position = writer.selection().first_position(writer.document());
            }

            let document = writer.document();
            let Some(target) = document.get(position.block) else {
                return;
            };
            let replace = target.is_empty();
            let at_end = position.is_at_end(document);
            let Some(mut index) = document.index_of(position.block) else {
                return;
            };
            if replace || at_end {
                index += 1;
            } else if position.offset > 0 {
                writer.split(position.block, position.offset);
                index += 1;
            }

            let mut last_inserted = None;
            for element in elements {
                last_inserted = Some(writer.insert(element, index));
                index += 1;
            }
            if replace {
                writer.remove(position.block);
            }
            if let Some(last) = last_inserted {
                let len = writer.document().get(last).map(Block::len).unwrap_or(0);
                writer.set_selection(Selection::collapsed(Position::new(last, len)));
            }
        });
    }

    pub fn set_data(&mut self, markup: &str) -> Result<()> {
        let fragment = parse_markup(markup)?;
        let elements = upcast(&fragment, self.ids.as_ref(), &self.strategies);
        self.load_elements(elements);
        Ok(())
    }

    fn load_elements(&mut self, elements: Vec<Element>) {
        self.model.change(|writer| {
            let existing: Vec<BlockId> = writer.document().blocks().iter().map(Block::id).collect();
            let mut first = None;
            for (index, element) in elements.into_iter().enumerate() {
                let id = writer.insert(element, index);
                first.get_or_insert(id);
            }
            for block in existing {
                writer.remove(block);
            }
            if let Some(first) = first {
                writer.set_selection(Selection::collapsed(Position::new(first, 0)));
            }
        });
        self.model.take_changes();
        self.view.render_all(self.model.document(), self.model.schema(), &self.strategies);
        self.last_reconverted.clear();
        self.refresh_commands();
    }

    /// The document as markup, without editing-only elements.
    pub fn get_data(&self) -> String {
        let ctx = ConversionContext {
            schema: self.model.schema(),
            strategies: &self.strategies,
            mode: RenderMode::Data,
        };
        downcast(self.model.document(), &ctx).to_markup()
    }
}

/// The first pasted block lands on the reference indent and the others keep their
/// nesting relative to it.
pub fn fix_pasted_indents(
    elements: &mut [Element],
    reference: &Block,
    ids: &dyn ListItemIdGenerator,
) {
    let Some(reference_list) = reference.as_list_block() else {
        return;
    };
    let reference_indent = reference_list.indent() as i64;
    let reference_type = reference.attribute(LIST_TYPE).cloned();
    let first_indent = elements
        .first()
        .and_then(|element| element.attribute(LIST_INDENT))
        .and_then(AttributeValue::as_integer)
        .unwrap_or(0);
    let diff = reference_indent - first_indent;

    for element in elements.iter_mut() {
        let is_list = element.has_attribute(LIST_ITEM_ID);
        let indent = if is_list {
            element
                .attribute(LIST_INDENT)
                .and_then(AttributeValue::as_integer)
                .unwrap_or(0)
        } else {
            0
        };
        element
            .attributes
            .insert(LIST_INDENT.to_string(), AttributeValue::Integer((indent + diff).max(0)));
        if !is_list {
            element
                .attributes
                .insert(LIST_ITEM_ID.to_string(), ids.next_id().into());
        }
        if let Some(list_type) = &reference_type {
            element
                .attributes
                .insert(LIST_TYPE.to_string(), list_type.clone());
        }
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
