use std::collections::HashMap;

use crate::Universities;

/// Raw affiliation string -> canonical entity name.
#[derive(Debug, Clone, Default)]
pub struct NameMapping {
    names: HashMap<String, String>,
}

impl NameMapping {
    /// First entity to claim a raw string keeps it.
    pub fn from_universities(universities: &Universities) -> Self {
        let mut names = HashMap::new();
        for (canonical, entity) in universities {
            for raw in &entity.init_names {
                names
                    .entry(raw.clone())
                    .or_insert_with(|| canonical.clone());
            }
        }
        Self { names }
    }

    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.names.get(raw).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
