//! Fixed-interval background jobs.
//!
//! Each job runs on its own ticker with no mutual exclusion between jobs. A
//! tick that overruns its period delays the next one instead of stacking; a
//! failed or panicking tick is logged and the loop carries on.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, error, info, info_span};

use crate::error::CrmServiceError;
use crate::state::AppState;
use crate::usecase::assignment::AutoAssignUseCase;
use crate::usecase::automation::ProcessAutomationUseCase;
use crate::usecase::automation::executor::ActionExecutor;
use crate::usecase::shipping::ProgressShippedOrdersUseCase;
use crate::usecase::sms_dispatch::DispatchSmsUseCase;

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Start every background job. Handles are returned so the caller can abort
/// them on shutdown.
pub fn spawn_jobs(state: &AppState) -> Vec<JoinHandle<()>> {
    let config = state.config.scheduler();
    let budget = config.tick_budget;
    vec![
        spawn_job("automation", config.automation_interval, budget, {
            let state = state.clone();
            move |deadline| run_automation(state.clone(), deadline)
        }),
        spawn_job("assignment", config.assignment_interval, budget, {
            let state = state.clone();
            move |deadline| run_assignment(state.clone(), deadline)
        }),
        spawn_job("shipping", config.shipping_interval, budget, {
            let state = state.clone();
            move |deadline| run_shipping(state.clone(), deadline)
        }),
        spawn_job("sms_dispatch", config.sms_dispatch_interval, budget, {
            let state = state.clone();
            move |deadline| run_sms_dispatch(state.clone(), deadline)
        }),
    ]
}

fn spawn_job<F, Fut>(
    job: &'static str,
    period: Duration,
    budget: Duration,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut(Instant) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), CrmServiceError>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(job, interval_secs = period.as_secs(), "background job started");

        loop {
            ticker.tick().await;
            let deadline = Instant::now() + budget;
            let span = info_span!("job_tick", job);
            // A panicking tick ends its own task, not the job loop.
            match tokio::spawn(tick(deadline).instrument(span)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(job, error = %e.detail(), "job tick failed"),
                Err(e) => error!(job, error = %e, "job tick panicked"),
            }
        }
    })
}

async fn run_automation(state: AppState, deadline: Instant) -> Result<(), CrmServiceError> {
    let usecase = ProcessAutomationUseCase {
        rules: state.rule_repo(),
        orders: state.order_repo(),
        executions: state.execution_repo(),
        executor: ActionExecutor {
            statuses: state.status_repo(),
            templates: state.template_repo(),
        },
        clock: state.clock(),
        config: state.config.engine(),
    };
    usecase.execute(deadline).await?;
    Ok(())
}

async fn run_assignment(state: AppState, deadline: Instant) -> Result<(), CrmServiceError> {
    let usecase = AutoAssignUseCase {
        orders: state.order_repo(),
        operators: state.operator_repo(),
        working_hours: state.working_hours(),
        clock: state.clock(),
        config: state.config.assignment(),
    };
    usecase.execute(deadline).await?;
    Ok(())
}

async fn run_shipping(state: AppState, deadline: Instant) -> Result<(), CrmServiceError> {
    let usecase = ProgressShippedOrdersUseCase {
        orders: state.order_repo(),
        statuses: state.status_repo(),
        clock: state.clock(),
        config: state.config.shipping(),
    };
    usecase.execute(deadline).await?;
    Ok(())
}

async fn run_sms_dispatch(state: AppState, deadline: Instant) -> Result<(), CrmServiceError> {
    let usecase = DispatchSmsUseCase {
        outbox: state.sms_outbox_repo(),
        gateway: state.sms_gateway(),
        clock: state.clock(),
        batch_size: state.config.scheduler().sms_batch_size,
    };
    usecase.execute(deadline).await?;
    Ok(())
}
