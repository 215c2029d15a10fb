use std::cell::Cell;

use uuid::Uuid;

pub trait ListItemIdGenerator {
    fn next_id(&self) -> String;
}

/// Deterministic ids: `prefix` followed by a counter starting at 0.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: Cell<u64>,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            counter: Cell::new(0),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("id")
    }
}

impl ListItemIdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let value = self.counter.get();
        self.counter.set(value + 1);
        format!("{}{}", self.prefix, value)
    }
}

/// Random ids, safe to mix with ids coming from other documents.
#[derive(Debug, Default)]
pub struct RandomIds {
    prefix: String,
}

impl RandomIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl ListItemIdGenerator for RandomIds {
    fn next_id(&self) -> String {
        format!("{}{}", self.prefix, Uuid::new_v4().simple())
    }
}
