use chrono::{DateTime, Utc};

use leadflow_domain::call::CallResult;
use leadflow_domain::id::{ProjectId, StatusId};

use crate::domain::types::Order;

/// Tenant-scoped order selection produced from a trigger.
///
/// Repositories translate it to SQL; [`OrderFilter::matches`] is the in-memory
/// reference used by tests and mocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
    pub project_id: ProjectId,
    pub status_id: Option<StatusId>,
    pub status_updated_since: Option<DateTime<Utc>>,
    pub status_updated_until: Option<DateTime<Utc>>,
    pub created_since: Option<DateTime<Utc>>,
    /// Non-empty: `last_call_result` must be one of these.
    pub last_call_results: Vec<CallResult>,
}

impl OrderFilter {
    pub fn project(project_id: ProjectId) -> Self {
        Self {
            project_id,
            status_id: None,
            status_updated_since: None,
            status_updated_until: None,
            created_since: None,
            last_call_results: Vec::new(),
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        if order.project_id != self.project_id {
            return false;
        }
        if self.status_id.is_some_and(|id| order.status_id != id) {
            return false;
        }
        if self
            .status_updated_since
            .is_some_and(|since| order.status_updated_at < since)
        {
            return false;
        }
        if self
            .status_updated_until
            .is_some_and(|until| order.status_updated_at > until)
        {
            return false;
        }
        if self.created_since.is_some_and(|since| order.created_at < since) {
            return false;
        }
        if !self.last_call_results.is_empty() {
            match order.last_call_result {
                Some(result) if self.last_call_results.contains(&result) => {}
                _ => return false,
            }
        }
        true
    }
}
