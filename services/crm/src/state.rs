use sea_orm::DatabaseConnection;

use leadflow_core::clock::SystemClock;

use crate::config::CrmConfig;
use crate::infra::db::{
    DbExecutionRepository, DbOperatorRepository, DbOrderRepository, DbRuleRepository,
    DbSmsOutboxRepository, DbStatusRepository, DbTemplateRepository,
};
use crate::infra::sms::LogSmsGateway;
use crate::infra::timezone::CityTimezones;

/// Shared application state passed to every handler via axum `State` and to
/// the background jobs.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: CrmConfig,
}

impl AppState {
    pub fn order_repo(&self) -> DbOrderRepository {
        DbOrderRepository {
            db: self.db.clone(),
        }
    }

    pub fn status_repo(&self) -> DbStatusRepository {
        DbStatusRepository {
            db: self.db.clone(),
        }
    }

    pub fn rule_repo(&self) -> DbRuleRepository {
        DbRuleRepository {
            db: self.db.clone(),
        }
    }

    pub fn execution_repo(&self) -> DbExecutionRepository {
        DbExecutionRepository {
            db: self.db.clone(),
        }
    }

    pub fn operator_repo(&self) -> DbOperatorRepository {
        DbOperatorRepository {
            db: self.db.clone(),
        }
    }

    pub fn template_repo(&self) -> DbTemplateRepository {
        DbTemplateRepository {
            db: self.db.clone(),
        }
    }

    pub fn sms_outbox_repo(&self) -> DbSmsOutboxRepository {
        DbSmsOutboxRepository {
            db: self.db.clone(),
        }
    }

    pub fn sms_gateway(&self) -> LogSmsGateway {
        LogSmsGateway
    }

    pub fn working_hours(&self) -> CityTimezones {
        CityTimezones::new(self.config.working_hours())
    }

    pub fn clock(&self) -> SystemClock {
        SystemClock
    }
}
