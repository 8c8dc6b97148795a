//! Region-label memory.
//!
//! Remembers which area description produced each segmented entity, so a
//! later request that names that entity can re-segment the same region
//! without refitting its support.

use std::collections::HashMap;

use crate::world::EntityId;

#[derive(Debug, Clone, Default)]
pub struct AreaDescriptionMemory {
    descriptions: HashMap<EntityId, String>,
}

impl AreaDescriptionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Description remembered for an entity id given as a raw request string.
    pub fn lookup(&self, id: &str) -> Option<&str> {
        self.descriptions
            .get(&EntityId::from(id))
            .map(String::as_str)
    }

    /// Overwrites any earlier description for `id`.
    pub fn remember(&mut self, id: EntityId, description: &str) {
        self.descriptions.insert(id, description.to_string());
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_overwrites() {
        let mut memory = AreaDescriptionMemory::new();
        memory.remember(EntityId::from("obj-0000"), "on_top_of table");
        memory.remember(EntityId::from("obj-0000"), "shelf cabinet");

        assert_eq!(memory.lookup("obj-0000"), Some("shelf cabinet"));
        assert_eq!(memory.lookup("obj-0001"), None);
        assert_eq!(memory.len(), 1);
    }
}
