//! Active card index
//!
//! Maps each lineage to the one card currently holding its pieces. A lineage
//! starts at a sub-batch's first card or at a fork-created card and follows
//! advancement from department to department.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCardIndex {
    by_lineage: HashMap<Uuid, Uuid>,
}

impl ActiveCardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, lineage_id: Uuid) -> Option<Uuid> {
        self.by_lineage.get(&lineage_id).copied()
    }

    /// Point the lineage at `card_id`, returning the card it replaced
    pub fn activate(&mut self, lineage_id: Uuid, card_id: Uuid) -> Option<Uuid> {
        self.by_lineage.insert(lineage_id, card_id)
    }

    pub fn deactivate(&mut self, lineage_id: Uuid) -> Option<Uuid> {
        self.by_lineage.remove(&lineage_id)
    }

    pub fn is_active(&self, card_id: Uuid) -> bool {
        self.by_lineage.values().any(|id| *id == card_id)
    }

    pub fn len(&self) -> usize {
        self.by_lineage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lineage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_card_per_lineage() {
        let mut index = ActiveCardIndex::new();
        let lineage = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert_eq!(index.activate(lineage, first), None);
        assert_eq!(index.activate(lineage, second), Some(first));
        assert_eq!(index.current(lineage), Some(second));
        assert!(!index.is_active(first));
        assert_eq!(index.len(), 1);

        assert_eq!(index.deactivate(lineage), Some(second));
        assert!(index.is_empty());
    }
}
