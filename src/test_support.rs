//! Compact list notation for tests.
//!
//! ```text
//! * bulleted item
//!   continuation block of the item above
//!   # numbered item at indent 1
//! [ ] todo item
//! [x] checked todo item {id=done}
//! plain paragraph
//! <heading1>plain heading
//! * <imageBlock>
//! ```
//!
//! Two spaces per indent level. A line without a marker that is indented is another
//! block of the last item opened one level up. `<name>` picks the block name and is
//! also how empty blocks are written. A trailing `{key=value, ...}` sets attributes,
//! `id` being short for `listItemId`. Items without an explicit id get `i0`, `i1`, ...

use std::rc::Rc;

use crate::config::{Feature, ListConfig};
use crate::editor::Editor;
use crate::list::{
    LIST_INDENT, LIST_ITEM_ID, LIST_TYPE, ListType, SequentialIds, TODO_LIST_CHECKED,
};
use crate::model::{
    AttributeValue, Block, BlockId, Document, Element, Model, Position, Schema, Selection,
};

pub(crate) fn parse(lines: &[&str]) -> Vec<Element> {
    let mut elements = Vec::new();
    // Item id and checked state of the last item opened at each indent.
    let mut open: Vec<Option<(String, bool, ListType)>> = Vec::new();
    let mut next_id = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let trimmed = line.trim_start_matches(' ');
        let depth = (line.len() - trimmed.len()) / 2;
        let (body, extra) = split_suffix(trimmed);

        let marker = [
            ("* ", ListType::Bulleted, false),
            ("# ", ListType::Numbered, false),
            ("[ ] ", ListType::Todo, false),
            ("[x] ", ListType::Todo, true),
        ]
        .into_iter()
        .find_map(|(marker, list_type, checked)| {
            body.strip_prefix(marker)
                .or_else(|| (body == marker.trim_end()).then_some(""))
                .map(|rest| (rest, list_type, checked))
        });

        let mut element;
        match marker {
            Some((rest, list_type, checked)) => {
                element = content(rest);
                let id = explicit_id(&extra).unwrap_or_else(|| format!("i{next_id}"));
                next_id += 1;
                open.resize(depth, None);
                open.push(Some((id.clone(), checked, list_type)));
                element = list_attributes(element, &id, depth, list_type, checked);
            }
            None if depth > 0 => {
                element = content(body);
                let indent = depth - 1;
                if let Some((id, checked, list_type)) = open.get(indent).cloned().flatten() {
                    open.truncate(indent + 1);
                    element = list_attributes(element, &id, indent, list_type, checked);
                }
            }
            None => {
                element = content(body);
                open.clear();
            }
        }

        for (key, value) in extra {
            let key = if key == "id" { LIST_ITEM_ID } else { key };
            element.attributes.insert(key.to_string(), value);
        }
        elements.push(element);
    }
    elements
}

fn explicit_id(extra: &[(&str, AttributeValue)]) -> Option<String> {
    extra
        .iter()
        .find(|(key, _)| *key == "id")
        .map(|(_, value)| value.to_string())
}

fn split_suffix(line: &str) -> (&str, Vec<(&str, AttributeValue)>) {
    let Some((body, suffix)) = line
        .strip_suffix('}')
        .and_then(|line| line.rsplit_once(" {").or_else(|| line.strip_prefix('{').map(|s| ("", s))))
    else {
        return (line, Vec::new());
    };
    let pairs = suffix
        .split(',')
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(key, value)| (key.trim(), parse_value(value.trim())))
        .collect();
    (body, pairs)
}

fn parse_value(value: &str) -> AttributeValue {
    if let Ok(number) = value.parse::<i64>() {
        return AttributeValue::Integer(number);
    }
    match value {
        "true" => AttributeValue::Boolean(true),
        "false" => AttributeValue::Boolean(false),
        _ => AttributeValue::Text(value.to_string()),
    }
}

fn content(body: &str) -> Element {
    if let Some(rest) = body.strip_prefix('<') {
        if let Some((name, text)) = rest.split_once('>') {
            return Element::new(name).with_text(text.strip_prefix(' ').unwrap_or(text));
        }
    }
    Element::paragraph(body)
}

fn list_attributes(
    element: Element,
    id: &str,
    indent: usize,
    list_type: ListType,
    checked: bool,
) -> Element {
    let element = element
        .with_attribute(LIST_ITEM_ID, id)
        .with_attribute(LIST_INDENT, indent)
        .with_attribute(LIST_TYPE, list_type);
    if checked {
        element.with_attribute(TODO_LIST_CHECKED, true)
    } else {
        element
    }
}

pub(crate) fn document(lines: &[&str]) -> Document {
    Document::from_elements(parse(lines))
}

/// A model without any post-fixer, holding exactly what the notation describes.
pub(crate) fn raw_model(lines: &[&str]) -> Model {
    Model::new(document(lines), Schema::default())
}

pub(crate) fn stringify(document: &Document) -> Vec<String> {
    stringify_with(document, &[])
}

pub(crate) fn stringify_with_ids(document: &Document) -> Vec<String> {
    stringify_with(document, &["id"])
}

/// Writes the document back in list notation, appending the given attributes.
pub(crate) fn stringify_with(document: &Document, keys: &[&str]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut previous: Option<&Block> = None;
    for block in document.blocks() {
        let mut line = String::new();
        if let Some(list) = block.as_list_block() {
            let continues = previous
                .and_then(|previous| previous.as_list_block())
                .is_some_and(|previous| previous.item_id() == list.item_id());
            if continues {
                line.push_str(&"  ".repeat(list.indent() + 1));
            } else {
                line.push_str(&"  ".repeat(list.indent()));
                line.push_str(match list.list_type() {
                    Some(ListType::Bulleted) => "* ",
                    Some(ListType::Numbered) => "# ",
                    Some(ListType::Todo)
                        if block.attribute(TODO_LIST_CHECKED)
                            == Some(&AttributeValue::Boolean(true)) =>
                    {
                        "[x] "
                    }
                    Some(ListType::Todo) => "[ ] ",
                    None => "? ",
                });
            }
        }
        if block.name() != "paragraph" || block.is_empty() {
            line.push_str(&format!("<{}>", block.name()));
            if !block.is_empty() {
                line.push(' ');
            }
        }
        line.push_str(block.text());

        let extra: Vec<String> = keys
            .iter()
            .filter_map(|key| {
                let attribute = if *key == "id" { LIST_ITEM_ID } else { *key };
                block
                    .attribute(attribute)
                    .map(|value| format!("{key}={value}"))
            })
            .collect();
        if !extra.is_empty() {
            line.push_str(&format!(" {{{}}}", extra.join(", ")));
        }
        lines.push(line);
        previous = Some(block);
    }
    lines
}

pub(crate) fn block_id(document: &Document, index: usize) -> BlockId {
    document
        .block_at(index)
        .map(Block::id)
        .unwrap_or_else(|| panic!("no block at index {index}"))
}

pub(crate) fn block_ids(document: &Document, indices: &[usize]) -> Vec<BlockId> {
    indices
        .iter()
        .map(|index| block_id(document, *index))
        .collect()
}

pub(crate) fn indices(document: &Document, blocks: &[BlockId]) -> Vec<usize> {
    blocks
        .iter()
        .map(|block| document.index_of(*block).unwrap_or(usize::MAX))
        .collect()
}

/// Editor over the notation, with ids `new0`, `new1`, ... for minted items.
pub(crate) fn editor(lines: &[&str]) -> Editor {
    editor_with(lines, ListConfig::default())
}

pub(crate) fn editor_with(lines: &[&str], config: ListConfig) -> Editor {
    Editor::builder()
        .with_config(config)
        .with_id_generator(Rc::new(SequentialIds::new("new")))
        .with_elements(parse(lines))
        .build()
        .expect("editor builds")
}

pub(crate) fn properties_config() -> ListConfig {
    ListConfig {
        features: vec![Feature::TodoList, Feature::ListProperties],
        ..ListConfig::default()
    }
}

pub(crate) fn select(editor: &mut Editor, index: usize, offset: usize) {
    assert!(editor.select_block(index, offset), "block {index} exists");
}

pub(crate) fn select_range(
    editor: &mut Editor,
    (from_index, from_offset): (usize, usize),
    (to_index, to_offset): (usize, usize),
) {
    let document = editor.document();
    let anchor = Position::new(block_id(document, from_index), from_offset);
    let focus = Position::new(block_id(document, to_index), to_offset);
    assert!(editor.set_selection(Selection::new(anchor, focus)));
}

pub(crate) fn caret(editor: &Editor) -> (usize, usize) {
    let document = editor.document();
    let position = editor.selection().focus;
    (
        document.index_of(position.block).unwrap_or(usize::MAX),
        position.offset,
    )
}
