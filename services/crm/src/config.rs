use std::time::Duration;

use serde::Deserialize;

use leadflow_core::config::Config;

/// CRM service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3114). Env var: `CRM_PORT`.
    #[serde(default = "default_crm_port")]
    pub crm_port: u16,

    #[serde(default = "default_automation_interval_secs")]
    pub automation_interval_secs: u64,
    #[serde(default = "default_assignment_interval_secs")]
    pub assignment_interval_secs: u64,
    #[serde(default = "default_shipping_interval_secs")]
    pub shipping_interval_secs: u64,
    #[serde(default = "default_sms_dispatch_interval_secs")]
    pub sms_dispatch_interval_secs: u64,
    /// Wall-clock budget of one job tick.
    #[serde(default = "default_tick_budget_secs")]
    pub tick_budget_secs: u64,
    #[serde(default = "default_rule_timeout_secs")]
    pub rule_timeout_secs: u64,
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,
    /// Age after which a `running` execution counts as abandoned.
    #[serde(default = "default_stale_execution_secs")]
    pub stale_execution_secs: u64,

    /// Look-back of `status_change` and `order_created` triggers.
    #[serde(default = "default_recency_window_minutes")]
    pub recency_window_minutes: u32,

    #[serde(default = "default_assignment_window_hours")]
    pub assignment_window_hours: u32,
    #[serde(default = "default_work_day_start_hour")]
    pub work_day_start_hour: u32,
    #[serde(default = "default_work_day_end_hour")]
    pub work_day_end_hour: u32,

    #[serde(default = "default_delivered_after_days")]
    pub delivered_after_days: u32,
    #[serde(default = "default_shipping_lookback_days")]
    pub shipping_lookback_days: u32,

    #[serde(default = "default_sms_batch_size")]
    pub sms_batch_size: u64,
}

fn default_crm_port() -> u16 {
    3114
}

fn default_automation_interval_secs() -> u64 {
    60
}

fn default_assignment_interval_secs() -> u64 {
    120
}

fn default_shipping_interval_secs() -> u64 {
    1800
}

fn default_sms_dispatch_interval_secs() -> u64 {
    30
}

fn default_tick_budget_secs() -> u64 {
    300
}

fn default_rule_timeout_secs() -> u64 {
    120
}

fn default_execution_timeout_secs() -> u64 {
    30
}

fn default_stale_execution_secs() -> u64 {
    300
}

fn default_recency_window_minutes() -> u32 {
    5
}

fn default_assignment_window_hours() -> u32 {
    24
}

fn default_work_day_start_hour() -> u32 {
    9
}

fn default_work_day_end_hour() -> u32 {
    21
}

fn default_delivered_after_days() -> u32 {
    3
}

fn default_shipping_lookback_days() -> u32 {
    30
}

fn default_sms_batch_size() -> u64 {
    100
}

impl Config for CrmConfig {}

impl CrmConfig {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            recency_window: chrono::Duration::minutes(i64::from(self.recency_window_minutes)),
            rule_timeout: Duration::from_secs(self.rule_timeout_secs),
            execution_timeout: Duration::from_secs(self.execution_timeout_secs),
            // Never shorter than a live execution can legitimately run.
            stale_execution_after: Duration::from_secs(
                self.stale_execution_secs
                    .max(self.execution_timeout_secs.saturating_mul(2)),
            ),
        }
    }

    pub fn assignment(&self) -> AssignmentConfig {
        AssignmentConfig {
            window: chrono::Duration::hours(i64::from(self.assignment_window_hours)),
        }
    }

    pub fn working_hours(&self) -> WorkingHours {
        WorkingHours {
            start_hour: self.work_day_start_hour,
            end_hour: self.work_day_end_hour,
        }
    }

    pub fn shipping(&self) -> ShippingConfig {
        ShippingConfig {
            delivered_after: chrono::Duration::days(i64::from(self.delivered_after_days)),
            lookback: chrono::Duration::days(i64::from(self.shipping_lookback_days)),
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            automation_interval: Duration::from_secs(self.automation_interval_secs),
            assignment_interval: Duration::from_secs(self.assignment_interval_secs),
            shipping_interval: Duration::from_secs(self.shipping_interval_secs),
            sms_dispatch_interval: Duration::from_secs(self.sms_dispatch_interval_secs),
            tick_budget: Duration::from_secs(self.tick_budget_secs),
            sms_batch_size: self.sms_batch_size,
        }
    }
}

/// Automation engine settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub recency_window: chrono::Duration,
    pub rule_timeout: Duration,
    pub execution_timeout: Duration,
    pub stale_execution_after: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recency_window: chrono::Duration::minutes(i64::from(default_recency_window_minutes())),
            rule_timeout: Duration::from_secs(default_rule_timeout_secs()),
            execution_timeout: Duration::from_secs(default_execution_timeout_secs()),
            stale_execution_after: Duration::from_secs(default_stale_execution_secs()),
        }
    }
}

/// Auto-assignment balancer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentConfig {
    /// Only orders created within this window are assigned.
    pub window: chrono::Duration,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            window: chrono::Duration::hours(i64::from(default_assignment_window_hours())),
        }
    }
}

/// Local business hours, `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl WorkingHours {
    pub fn contains(&self, hour: u32) -> bool {
        (self.start_hour..self.end_hour).contains(&hour)
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: default_work_day_start_hour(),
            end_hour: default_work_day_end_hour(),
        }
    }
}

/// Shipping progression settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShippingConfig {
    /// Minimum time since shipping before an order counts as delivered.
    pub delivered_after: chrono::Duration,
    /// Orders shipped earlier than this are no longer tracked.
    pub lookback: chrono::Duration,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            delivered_after: chrono::Duration::days(i64::from(default_delivered_after_days())),
            lookback: chrono::Duration::days(i64::from(default_shipping_lookback_days())),
        }
    }
}

/// Background job intervals and budgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub automation_interval: Duration,
    pub assignment_interval: Duration,
    pub shipping_interval: Duration,
    pub sms_dispatch_interval: Duration,
    pub tick_budget: Duration,
    pub sms_batch_size: u64,
}
