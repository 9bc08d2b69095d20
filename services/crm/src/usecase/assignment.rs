use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use leadflow_core::clock::Clock;
use leadflow_domain::id::{ProjectId, UserId};

use crate::config::AssignmentConfig;
use crate::domain::repository::{OperatorRepository, OrderRepository, WorkingHoursResolver};
use crate::domain::types::{HistoryAction, HistoryEntry, Order};
use crate::error::CrmServiceError;

/// Counters of one assignment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentTickReport {
    pub candidates: usize,
    pub assigned: usize,
    pub no_operators: usize,
    pub outside_working_hours: usize,
    /// Orders that got an operator from another writer first.
    pub lost_races: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignOutcome {
    Assigned(UserId),
    NoOperators,
    OutsideWorkingHours,
    LostRace,
}

/// Eligible operators of one project with their open-work load. Loads are
/// bumped in memory as the pass assigns orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorPool {
    loads: BTreeMap<UserId, u64>,
}

impl OperatorPool {
    pub fn new(operators: impl IntoIterator<Item = UserId>, loads: &HashMap<UserId, u64>) -> Self {
        Self {
            loads: operators
                .into_iter()
                .map(|id| (id, loads.get(&id).copied().unwrap_or(0)))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    /// Least-loaded operator; ties go to the lowest id.
    pub fn pick(&self) -> Option<UserId> {
        self.loads
            .iter()
            .min_by_key(|&(id, load)| (*load, *id))
            .map(|(id, _)| *id)
    }

    pub fn add_load(&mut self, operator: UserId) {
        if let Some(load) = self.loads.get_mut(&operator) {
            *load += 1;
        }
    }

    pub fn load(&self, operator: UserId) -> Option<u64> {
        self.loads.get(&operator).copied()
    }
}

// ── AutoAssignOrders ─────────────────────────────────────────────────────────

pub struct AutoAssignUseCase<O, P, W, C>
where
    O: OrderRepository,
    P: OperatorRepository,
    W: WorkingHoursResolver,
    C: Clock,
{
    pub orders: O,
    pub operators: P,
    pub working_hours: W,
    pub clock: C,
    pub config: AssignmentConfig,
}

impl<O, P, W, C> AutoAssignUseCase<O, P, W, C>
where
    O: OrderRepository,
    P: OperatorRepository,
    W: WorkingHoursResolver,
    C: Clock,
{
    pub async fn execute(&self, deadline: Instant) -> Result<AssignmentTickReport, CrmServiceError> {
        let now = self.clock.now();
        let orders = self
            .orders
            .list_unassigned_since(now - self.config.window)
            .await?;
        let mut report = AssignmentTickReport {
            candidates: orders.len(),
            ..Default::default()
        };
        let mut pools: HashMap<ProjectId, OperatorPool> = HashMap::new();

        for order in &orders {
            if Instant::now() >= deadline {
                warn!("tick budget exhausted; remaining orders wait for the next pass");
                break;
            }
            match self.assign(order, now, &mut pools).await {
                Ok(AssignOutcome::Assigned(operator_id)) => {
                    report.assigned += 1;
                    info!(
                        order_id = %order.id,
                        project_id = %order.project_id,
                        operator_id = %operator_id,
                        "order auto-assigned"
                    );
                }
                Ok(AssignOutcome::NoOperators) => report.no_operators += 1,
                Ok(AssignOutcome::OutsideWorkingHours) => report.outside_working_hours += 1,
                Ok(AssignOutcome::LostRace) => report.lost_races += 1,
                Err(e) => {
                    report.errors += 1;
                    error!(order_id = %order.id, error = %e.detail(), "auto-assignment failed");
                }
            }
        }

        info!(
            candidates = report.candidates,
            assigned = report.assigned,
            "assignment pass finished"
        );
        Ok(report)
    }

    async fn assign(
        &self,
        order: &Order,
        now: DateTime<Utc>,
        pools: &mut HashMap<ProjectId, OperatorPool>,
    ) -> Result<AssignOutcome, CrmServiceError> {
        let pool = match pools.entry(order.project_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let operators: Vec<UserId> = self
                    .operators
                    .list_assignable(order.project_id)
                    .await?
                    .into_iter()
                    .map(|op| op.user_id)
                    .collect();
                let loads = self
                    .orders
                    .count_open_by_operator(order.project_id, &operators)
                    .await?;
                entry.insert(OperatorPool::new(operators, &loads))
            }
        };
        if pool.is_empty() {
            debug!(project_id = %order.project_id, "no operators available for auto-assignment");
            return Ok(AssignOutcome::NoOperators);
        }

        if let Some(city) = order.city.as_deref().filter(|c| !c.trim().is_empty()) {
            if self.working_hours.is_working_hours(city, now) == Some(false) {
                debug!(order_id = %order.id, city, "outside working hours; retry next pass");
                return Ok(AssignOutcome::OutsideWorkingHours);
            }
        }

        let Some(operator_id) = pool.pick() else {
            return Ok(AssignOutcome::NoOperators);
        };
        let history = HistoryEntry::new(order.id, HistoryAction::AutoAssigned, now)
            .field("operator_id", None, Some(operator_id.to_string()))
            .comment("Assigned automatically");
        if !self
            .orders
            .assign_if_unassigned(order.id, operator_id, &history)
            .await?
        {
            return Ok(AssignOutcome::LostRace);
        }
        pool.add_load(operator_id);
        Ok(AssignOutcome::Assigned(operator_id))
    }
}
