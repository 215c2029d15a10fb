//! Contributions of list features to the `ul`/`ol`/`li` wrappers.

use std::fmt;

use super::{
    LIST_REVERSED, LIST_START, LIST_STYLE, LIST_TYPE, ListType, TODO_LIST_CHECKED, type_of,
};
use crate::error::{ListError, Result};
use crate::model::{AttributeValue, Block};
use crate::view::ViewElement;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyScope {
    List,
    Item,
}

impl fmt::Display for StrategyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyScope::List => f.write_str("list"),
            StrategyScope::Item => f.write_str("item"),
        }
    }
}

pub trait DowncastStrategy {
    fn attribute_name(&self) -> &str;

    fn scope(&self) -> StrategyScope;

    /// Applies the model value (or its absence) to a freshly created wrapper.
    fn set_attribute_on_downcast(&self, value: Option<&AttributeValue>, element: &mut ViewElement);

    fn get_attribute_on_upcast(&self, _element: &ViewElement) -> Option<AttributeValue> {
        None
    }
}

#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn DowncastStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails when another strategy already renders the same attribute onto the
    /// same wrapper.
    pub fn register(&mut self, strategy: Box<dyn DowncastStrategy>) -> Result<()> {
        let duplicate = self.strategies.iter().any(|existing| {
            existing.attribute_name() == strategy.attribute_name()
                && existing.scope() == strategy.scope()
        });
        if duplicate {
            return Err(ListError::StrategyConflict {
                attribute: strategy.attribute_name().to_string(),
                scope: strategy.scope(),
            });
        }
        self.strategies.push(strategy);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn for_scope(&self, scope: StrategyScope) -> impl Iterator<Item = &dyn DowncastStrategy> {
        self.strategies
            .iter()
            .map(|strategy| strategy.as_ref())
            .filter(move |strategy| strategy.scope() == scope)
    }

    pub fn handles_attribute(&self, key: &str) -> bool {
        self.strategies
            .iter()
            .any(|strategy| strategy.attribute_name() == key)
    }
}

// ============================================================================
// To-do lists
// ============================================================================

#[derive(Debug, Default)]
pub struct TodoListStrategy;

impl DowncastStrategy for TodoListStrategy {
    fn attribute_name(&self) -> &str {
        LIST_TYPE
    }

    fn scope(&self) -> StrategyScope {
        StrategyScope::List
    }

    fn set_attribute_on_downcast(&self, value: Option<&AttributeValue>, element: &mut ViewElement) {
        if value.and_then(AttributeValue::as_str) == Some(ListType::Todo.as_str()) {
            element.add_class("todo-list");
        } else {
            element.remove_class("todo-list");
        }
    }

    fn get_attribute_on_upcast(&self, element: &ViewElement) -> Option<AttributeValue> {
        element
            .has_class("todo-list")
            .then(|| ListType::Todo.into())
    }
}

#[derive(Debug, Default)]
pub struct TodoCheckedStrategy;

impl DowncastStrategy for TodoCheckedStrategy {
    fn attribute_name(&self) -> &str {
        TODO_LIST_CHECKED
    }

    fn scope(&self) -> StrategyScope {
        StrategyScope::Item
    }

    fn set_attribute_on_downcast(&self, value: Option<&AttributeValue>, element: &mut ViewElement) {
        if value.and_then(AttributeValue::as_bool) == Some(true) {
            element.add_class("todo-list__checked");
        } else {
            element.remove_class("todo-list__checked");
        }
    }

    fn get_attribute_on_upcast(&self, element: &ViewElement) -> Option<AttributeValue> {
        element
            .has_class("todo-list__checked")
            .then_some(AttributeValue::Boolean(true))
    }
}

// ============================================================================
// List properties
// ============================================================================

const BULLETED_STYLES: [&str; 3] = ["disc", "circle", "square"];
const NUMBERED_STYLES: [&str; 6] = [
    "decimal",
    "decimal-leading-zero",
    "lower-roman",
    "upper-roman",
    "lower-latin",
    "upper-latin",
];

pub fn list_type_for_style(style: &str) -> Option<ListType> {
    if BULLETED_STYLES.contains(&style) {
        Some(ListType::Bulleted)
    } else if NUMBERED_STYLES.contains(&style) {
        Some(ListType::Numbered)
    } else {
        None
    }
}

pub fn styles_for(list_type: ListType) -> &'static [&'static str] {
    match list_type {
        ListType::Bulleted => &BULLETED_STYLES,
        ListType::Numbered => &NUMBERED_STYLES,
        ListType::Todo => &[],
    }
}

/// A list-wide property stored on every block of the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListProperty {
    Style,
    Start,
    Reversed,
}

impl ListProperty {
    pub fn key(self) -> &'static str {
        match self {
            ListProperty::Style => LIST_STYLE,
            ListProperty::Start => LIST_START,
            ListProperty::Reversed => LIST_REVERSED,
        }
    }

    pub fn default_value(self) -> AttributeValue {
        match self {
            ListProperty::Style => AttributeValue::from("default"),
            ListProperty::Start => AttributeValue::Integer(1),
            ListProperty::Reversed => AttributeValue::Boolean(false),
        }
    }

    pub fn applies_to(self, block: &Block) -> bool {
        match (self, type_of(block)) {
            (ListProperty::Style, Some(ListType::Bulleted | ListType::Numbered)) => true,
            (ListProperty::Start | ListProperty::Reversed, Some(ListType::Numbered)) => true,
            _ => false,
        }
    }

    pub fn has_valid_attribute(self, block: &Block) -> bool {
        let value = block.attribute(self.key());
        if !self.applies_to(block) {
            return value.is_none();
        }
        let Some(value) = value else {
            return false;
        };
        match self {
            ListProperty::Style => match value.as_str() {
                Some("default") => true,
                Some(style) => list_type_for_style(style) == type_of(block),
                None => false,
            },
            ListProperty::Start => value.as_integer().is_some_and(|start| start >= 0),
            ListProperty::Reversed => value.as_bool().is_some(),
        }
    }
}

impl DowncastStrategy for ListProperty {
    fn attribute_name(&self) -> &str {
        self.key()
    }

    fn scope(&self) -> StrategyScope {
        StrategyScope::List
    }

    fn set_attribute_on_downcast(&self, value: Option<&AttributeValue>, element: &mut ViewElement) {
        match self {
            ListProperty::Style => match value.and_then(AttributeValue::as_str) {
                Some(style) if style != "default" => element.set_style("list-style-type", style),
                _ => element.remove_style("list-style-type"),
            },
            ListProperty::Start => match value.and_then(AttributeValue::as_integer) {
                Some(start) if start != 1 => element.set_attribute("start", &start.to_string()),
                _ => element.remove_attribute("start"),
            },
            ListProperty::Reversed => {
                if value.and_then(AttributeValue::as_bool) == Some(true) {
                    element.set_attribute("reversed", "reversed");
                } else {
                    element.remove_attribute("reversed");
                }
            }
        }
    }

    fn get_attribute_on_upcast(&self, element: &ViewElement) -> Option<AttributeValue> {
        match self {
            ListProperty::Style => Some(
                element
                    .style("list-style-type")
                    .unwrap_or("default")
                    .into(),
            ),
            ListProperty::Start => {
                let start = element
                    .attribute("start")
                    .and_then(|value| value.trim().parse::<i64>().ok())
                    .unwrap_or(1);
                Some(AttributeValue::Integer(start))
            }
            ListProperty::Reversed => Some(AttributeValue::Boolean(
                element.attribute("reversed").is_some(),
            )),
        }
    }
}

#[cfg(test)]
#[path = "strategies_tests.rs"]
mod strategies_tests;
