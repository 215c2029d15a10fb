//! List engine configuration, read from TOML.
//!
//! ```toml
//! features = ["todo-list", "list-properties"]
//! id-generator = "sequential"
//! id-prefix = "item-"
//!
//! [properties]
//! styles = true
//! start-index = true
//! reversed = false
//! ```

use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::{ListError, Result};
use crate::list::strategies::ListProperty;
use crate::list::{ListItemIdGenerator, RandomIds, SequentialIds};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    TodoList,
    ListProperties,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdGeneratorKind {
    #[default]
    Random,
    Sequential,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PropertiesConfig {
    pub styles: bool,
    pub start_index: bool,
    pub reversed: bool,
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        Self {
            styles: true,
            start_index: true,
            reversed: true,
        }
    }
}

impl PropertiesConfig {
    pub fn enabled(&self) -> Vec<ListProperty> {
        let mut properties = Vec::new();
        if self.styles {
            properties.push(ListProperty::Style);
        }
        if self.start_index {
            properties.push(ListProperty::Start);
        }
        if self.reversed {
            properties.push(ListProperty::Reversed);
        }
        properties
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ListConfig {
    pub features: Vec<Feature>,
    pub properties: PropertiesConfig,
    pub id_generator: IdGeneratorKind,
    pub id_prefix: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            features: vec![Feature::TodoList],
            properties: PropertiesConfig::default(),
            id_generator: IdGeneratorKind::default(),
            id_prefix: "e".to_string(),
        }
    }
}

impl ListConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| ListError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn id_generator(&self) -> Rc<dyn ListItemIdGenerator> {
        match self.id_generator {
            IdGeneratorKind::Random => Rc::new(RandomIds::new(&self.id_prefix)),
            IdGeneratorKind::Sequential => Rc::new(SequentialIds::new(&self.id_prefix)),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
