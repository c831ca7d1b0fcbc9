//! Planned workflow routes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered department plan for one sub-batch.
///
/// The route is only a plan: where pieces actually are is answered by the
/// production cards, never by a pointer into the route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowRoute {
    pub id: Uuid,
    pub sub_batch_id: Uuid,
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
}

/// One department in a route
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowStep {
    pub step_index: i32,
    pub department_id: Uuid,
}

impl WorkflowRoute {
    pub fn new(sub_batch_id: Uuid, department_ids: &[Uuid]) -> Self {
        let steps = department_ids
            .iter()
            .enumerate()
            .map(|(i, department_id)| WorkflowStep {
                step_index: i as i32,
                department_id: *department_id,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            sub_batch_id,
            steps,
            created_at: Utc::now(),
        }
    }

    pub fn first_department(&self) -> Option<Uuid> {
        self.steps.first().map(|s| s.department_id)
    }

    /// Department planned after `department_id`.
    ///
    /// When a department appears more than once the first occurrence wins.
    pub fn next_department(&self, department_id: Uuid) -> Option<Uuid> {
        let position = self
            .steps
            .iter()
            .position(|s| s.department_id == department_id)?;
        self.steps.get(position + 1).map(|s| s.department_id)
    }

    pub fn contains(&self, department_id: Uuid) -> bool {
        self.steps.iter().any(|s| s.department_id == department_id)
    }
}
