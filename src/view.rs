//! Markup is XHTML-like: every element must be closed (`<hr/>`, not `<hr>`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("syntax error at byte {position}: {message}")]
    Syntax { message: String, position: u64 },

    #[error("expected </{expected}> but found </{found}>")]
    MismatchedTag { expected: String, found: String },

    #[error("unexpected end of markup, expected {expected}")]
    UnexpectedEof { expected: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewNode {
    Element(ViewElement),
    Text(String),
}

impl ViewNode {
    pub fn as_element(&self) -> Option<&ViewElement> {
        match self {
            ViewNode::Element(element) => Some(element),
            ViewNode::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            ViewNode::Element(element) => element.text_content(),
            ViewNode::Text(text) => text.clone(),
        }
    }
}

impl From<ViewElement> for ViewNode {
    fn from(element: ViewElement) -> Self {
        ViewNode::Element(element)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: BTreeSet<String>,
    pub styles: BTreeMap<String, String>,
    pub children: Vec<ViewNode>,
}

impl ViewElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_style(mut self, property: &str, value: &str) -> Self {
        self.set_style(property, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<ViewNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(ViewNode::Text(text.to_string()));
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    pub fn remove_attribute(&mut self, key: &str) {
        self.attributes.remove(key);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    pub fn set_style(&mut self, property: &str, value: &str) {
        self.styles.insert(property.to_string(), value.to_string());
    }

    pub fn remove_style(&mut self, property: &str) {
        self.styles.remove(property);
    }

    pub fn shallow_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            classes: self.classes.clone(),
            styles: self.styles.clone(),
            children: Vec::new(),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &ViewElement> {
        self.children.iter().filter_map(ViewNode::as_element)
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(ViewNode::text_content).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewFragment {
    pub children: Vec<ViewNode>,
}

impl ViewFragment {
    pub fn new(children: Vec<ViewNode>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn to_markup(&self) -> String {
        to_markup(&self.children)
    }
}

// ============================================================================
// Reading
// ============================================================================

const ROOT: &str = "markup-root";

pub fn parse_markup(markup: &str) -> Result<ViewFragment, ViewError> {
    let wrapped = format!("<{ROOT}>{markup}</{ROOT}>");
    let mut reader = Reader::from_str(&wrapped);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;
    reader.config_mut().check_end_names = false;

    let mut stack: Vec<ViewElement> = Vec::new();
    let mut root: Option<ViewElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(element_from_start(&start, reader.buffer_position())?);
            }
            Ok(Event::End(end)) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_string();
                let Some(element) = stack.pop() else {
                    return Err(ViewError::MismatchedTag {
                        expected: ROOT.to_string(),
                        found: name,
                    });
                };
                if element.name != name {
                    return Err(ViewError::MismatchedTag {
                        expected: element.name,
                        found: name,
                    });
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(ViewNode::Element(element)),
                    None => root = Some(element),
                }
            }
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&start, reader.buffer_position())?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(ViewNode::Element(element));
                }
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|err| ViewError::Syntax {
                    message: err.to_string(),
                    position: reader.buffer_position(),
                })?;
                push_text(&mut stack, &text);
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data).to_string();
                push_text(&mut stack, &text);
            }
            Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ViewError::Syntax {
                    message: err.to_string(),
                    position: reader.error_position(),
                });
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(ViewError::UnexpectedEof {
            expected: format!("closing tag </{}>", open.name),
        });
    }
    let root = root.ok_or_else(|| ViewError::UnexpectedEof {
        expected: format!("</{ROOT}>"),
    })?;
    Ok(ViewFragment::new(root.children))
}

fn push_text(stack: &mut [ViewElement], text: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(ViewNode::Text(previous)) = parent.children.last_mut() {
        previous.push_str(text);
    } else {
        parent.children.push(ViewNode::Text(text.to_string()));
    }
}

fn element_from_start(start: &BytesStart<'_>, position: u64) -> Result<ViewElement, ViewError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut element = ViewElement::new(&name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| ViewError::Syntax {
            message: err.to_string(),
            position,
        })?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
        let value = attribute
            .unescape_value()
            .map_err(|err| ViewError::Syntax {
                message: format!("invalid attribute value: {err}"),
                position,
            })?
            .into_owned();
        match key.as_str() {
            "class" => {
                for class in value.split_whitespace() {
                    element.add_class(class);
                }
            }
            "style" => {
                for declaration in value.split(';') {
                    if let Some((property, value)) = declaration.split_once(':') {
                        element.set_style(property.trim(), value.trim());
                    }
                }
            }
            _ => element.set_attribute(&key, &value),
        }
    }
    Ok(element)
}

// ============================================================================
// Writing
// ============================================================================

const VOID_ELEMENTS: [&str; 4] = ["br", "hr", "img", "input"];

/// Attributes are sorted by name, then come `class` and `style`.
pub fn to_markup(nodes: &[ViewNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &ViewNode) {
    match node {
        ViewNode::Text(text) => out.push_str(&escape(text.as_str())),
        ViewNode::Element(element) => write_element(out, element),
    }
}

fn write_element(out: &mut String, element: &ViewElement) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
    }
    if !element.classes.is_empty() {
        let classes: Vec<&str> = element.classes.iter().map(String::as_str).collect();
        let _ = write!(out, " class=\"{}\"", escape(classes.join(" ").as_str()));
    }
    if !element.styles.is_empty() {
        let styles: Vec<String> = element
            .styles
            .iter()
            .map(|(property, value)| format!("{property}:{value}"))
            .collect();
        let _ = write!(out, " style=\"{}\"", escape(styles.join(";").as_str()));
    }
    if element.children.is_empty() && VOID_ELEMENTS.contains(&element.name.as_str()) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        write_node(out, child);
    }
    let _ = write!(out, "</{}>", element.name);
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod view_tests;
