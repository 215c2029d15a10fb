use super::*;
use crate::test_support::document;

struct ItemTypeStrategy;

impl DowncastStrategy for ItemTypeStrategy {
    fn attribute_name(&self) -> &str {
        LIST_TYPE
    }

    fn scope(&self) -> StrategyScope {
        StrategyScope::Item
    }

    fn set_attribute_on_downcast(&self, value: Option<&AttributeValue>, element: &mut ViewElement) {
        if let Some(value) = value.and_then(AttributeValue::as_str) {
            element.set_attribute("data-type", value);
        }
    }
}

#[test]
fn registering_the_same_attribute_twice_for_one_scope_fails() {
    let mut registry = StrategyRegistry::new();
    registry.register(Box::new(TodoListStrategy)).expect("first registration");
    let err = registry
        .register(Box::new(TodoListStrategy))
        .expect_err("duplicate registration");
    assert!(matches!(
        err,
        ListError::StrategyConflict { ref attribute, scope: StrategyScope::List } if attribute == LIST_TYPE
    ));
    assert_eq!(
        err.to_string(),
        "A downcast strategy for `listType` (List scope) is already registered"
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn same_attribute_may_be_rendered_on_both_wrappers() {
    let mut registry = StrategyRegistry::new();
    registry.register(Box::new(TodoListStrategy)).expect("list scope");
    registry.register(Box::new(ItemTypeStrategy)).expect("item scope");
    registry.register(Box::new(TodoCheckedStrategy)).expect("checked");

    let item: Vec<&str> = registry
        .for_scope(StrategyScope::Item)
        .map(|strategy| strategy.attribute_name())
        .collect();
    assert_eq!(item, [LIST_TYPE, TODO_LIST_CHECKED]);
    assert!(registry.handles_attribute(TODO_LIST_CHECKED));
    assert!(!registry.handles_attribute(LIST_STYLE));
}

#[test]
fn todo_list_class_follows_the_list_type() {
    let mut element = ViewElement::new("ul");
    TodoListStrategy.set_attribute_on_downcast(Some(&ListType::Todo.into()), &mut element);
    assert!(element.has_class("todo-list"));
    assert_eq!(
        TodoListStrategy.get_attribute_on_upcast(&element),
        Some(AttributeValue::from("todo"))
    );

    TodoListStrategy.set_attribute_on_downcast(Some(&ListType::Bulleted.into()), &mut element);
    assert!(!element.has_class("todo-list"));
    assert_eq!(TodoListStrategy.get_attribute_on_upcast(&element), None);
}

#[test]
fn checked_class_is_only_set_for_true() {
    let mut element = ViewElement::new("li");
    TodoCheckedStrategy
        .set_attribute_on_downcast(Some(&AttributeValue::Boolean(true)), &mut element);
    assert!(element.has_class("todo-list__checked"));
    TodoCheckedStrategy.set_attribute_on_downcast(None, &mut element);
    assert!(!element.has_class("todo-list__checked"));
}

#[test]
fn list_style_renders_as_css_unless_default() {
    let mut element = ViewElement::new("ol");
    ListProperty::Style.set_attribute_on_downcast(Some(&"lower-roman".into()), &mut element);
    assert_eq!(element.style("list-style-type"), Some("lower-roman"));
    assert_eq!(
        ListProperty::Style.get_attribute_on_upcast(&element),
        Some(AttributeValue::from("lower-roman"))
    );

    ListProperty::Style.set_attribute_on_downcast(Some(&"default".into()), &mut element);
    assert_eq!(element.style("list-style-type"), None);
    assert_eq!(
        ListProperty::Style.get_attribute_on_upcast(&element),
        Some(AttributeValue::from("default"))
    );
}

#[test]
fn start_and_reversed_render_as_attributes() {
    let mut element = ViewElement::new("ol");
    ListProperty::Start.set_attribute_on_downcast(Some(&AttributeValue::Integer(4)), &mut element);
    ListProperty::Reversed
        .set_attribute_on_downcast(Some(&AttributeValue::Boolean(true)), &mut element);
    assert_eq!(element.attribute("start"), Some("4"));
    assert_eq!(element.attribute("reversed"), Some("reversed"));

    ListProperty::Start.set_attribute_on_downcast(Some(&AttributeValue::Integer(1)), &mut element);
    ListProperty::Reversed.set_attribute_on_downcast(None, &mut element);
    assert_eq!(element.attribute("start"), None);
    assert_eq!(element.attribute("reversed"), None);
    assert_eq!(
        ListProperty::Start.get_attribute_on_upcast(&element),
        Some(AttributeValue::Integer(1))
    );
    assert_eq!(
        ListProperty::Reversed.get_attribute_on_upcast(&element),
        Some(AttributeValue::Boolean(false))
    );
}

#[test]
fn styles_map_to_list_types() {
    assert_eq!(list_type_for_style("square"), Some(ListType::Bulleted));
    assert_eq!(list_type_for_style("upper-latin"), Some(ListType::Numbered));
    assert_eq!(list_type_for_style("default"), None);
    assert!(styles_for(ListType::Todo).is_empty());
    assert!(styles_for(ListType::Numbered).contains(&"decimal"));
}

#[test]
fn properties_apply_per_list_type() {
    let doc = document(&[
        "# a {listStyle=decimal, listStart=0, listReversed=true}",
        "* b {listStyle=decimal}",
        "[ ] c {listStart=2}",
        "[ ] d",
        "plain",
    ]);
    let block = |index| doc.block_at(index).expect("block");

    assert!(ListProperty::Start.applies_to(block(0)));
    assert!(!ListProperty::Start.applies_to(block(1)));
    assert!(ListProperty::Style.applies_to(block(1)));
    assert!(!ListProperty::Style.applies_to(block(3)));
    assert!(!ListProperty::Style.applies_to(block(4)));

    assert!(ListProperty::Style.has_valid_attribute(block(0)));
    assert!(ListProperty::Start.has_valid_attribute(block(0)));
    assert!(ListProperty::Reversed.has_valid_attribute(block(0)));
    assert!(!ListProperty::Style.has_valid_attribute(block(1)));
    assert!(!ListProperty::Start.has_valid_attribute(block(2)));
    assert!(ListProperty::Start.has_valid_attribute(block(3)));
}
