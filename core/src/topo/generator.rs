use super::EntityId;
use uuid::Uuid;

/// A deterministic ID generator that produces a sequence of EntityIds
/// based on a seed namespace and a counter.
///
/// Two documents opened with the same seed mint the same ids in the same
/// order, which keeps regeneration reproducible.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    namespace: Uuid,
    counter: u64,
}

impl IdGenerator {
    /// Create a new generator from a string seed.
    /// This seed should be unique to the context (e.g. a document name).
    pub fn new(seed: &str) -> Self {
        let namespace = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
        Self {
            namespace,
            counter: 0,
        }
    }

    /// Generate the next deterministic ID in the sequence.
    pub fn next_id(&mut self) -> EntityId {
        let count_bytes = self.counter.to_be_bytes();
        self.counter += 1;
        EntityId::from_uuid(Uuid::new_v5(&self.namespace, &count_bytes))
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter
    }
}
