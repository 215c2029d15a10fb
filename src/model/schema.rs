use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockDefinition {
    /// Whether blocks of this kind may become list items.
    pub allows_list_attributes: bool,
    /// Objects are selected as a whole rather than edited as text.
    pub is_object: bool,
}

impl BlockDefinition {
    pub const fn text_block() -> Self {
        Self {
            allows_list_attributes: true,
            is_object: false,
        }
    }

    pub const fn object(allows_list_attributes: bool) -> Self {
        Self {
            allows_list_attributes,
            is_object: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Schema {
    definitions: HashMap<String, BlockDefinition>,
    extra_list_attributes: HashSet<String>,
}

impl Schema {
    pub fn empty() -> Self {
        Self {
            definitions: HashMap::new(),
            extra_list_attributes: HashSet::new(),
        }
    }

    pub fn register(&mut self, name: &str, definition: BlockDefinition) {
        self.definitions.insert(name.to_string(), definition);
    }

    /// Marks an attribute that does not start with `list` as belonging to list items.
    pub fn register_list_attribute(&mut self, key: &str) {
        self.extra_list_attributes.insert(key.to_string());
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn is_object(&self, name: &str) -> bool {
        self.definitions
            .get(name)
            .map(|definition| definition.is_object)
            .unwrap_or(false)
    }

    pub fn is_list_attribute(&self, key: &str) -> bool {
        key.starts_with("list") || self.extra_list_attributes.contains(key)
    }

    pub fn check_attribute(&self, block_name: &str, key: &str) -> bool {
        let Some(definition) = self.definitions.get(block_name) else {
            return false;
        };
        if self.is_list_attribute(key) {
            definition.allows_list_attributes
        } else {
            true
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        let mut schema = Self::empty();
        for name in ["paragraph", "heading1", "heading2", "heading3", "codeBlock"] {
            schema.register(name, BlockDefinition::text_block());
        }
        schema.register("imageBlock", BlockDefinition::object(true));
        schema.register("horizontalLine", BlockDefinition::object(false));
        schema
    }
}
