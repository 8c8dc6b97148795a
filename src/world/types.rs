//! Core ID types for world-model entities.

/// Stable identifier of an entity in the world model.
///
/// Ids are opaque strings chosen by whoever created the entity; ids for new
/// observations come from an [`EntityIdGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Sequential id source for newly observed entities.
///
/// Ids already present in the world are skipped so a fresh id never
/// collides with an existing entity.
#[derive(Debug, Clone)]
pub struct EntityIdGenerator {
    prefix: String,
    next: u64,
}

impl EntityIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    /// Next id for which `taken` returns false.
    pub fn next_id(&mut self, taken: impl Fn(&EntityId) -> bool) -> EntityId {
        loop {
            let candidate = EntityId(format!("{}-{:04}", self.prefix, self.next));
            self.next += 1;
            if !taken(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for EntityIdGenerator {
    fn default() -> Self {
        Self::new("obj")
    }
}
