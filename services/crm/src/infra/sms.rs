use tracing::info;
use uuid::Uuid;

use crate::domain::repository::SmsGateway;
use crate::domain::types::{SmsDelivery, SmsMessage};
use crate::error::SmsSendError;

pub const LOG_PROVIDER: &str = "log";

/// Gateway that only writes the message to the log. Used until a real
/// provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSmsGateway;

impl SmsGateway for LogSmsGateway {
    async fn send(&self, message: &SmsMessage) -> Result<SmsDelivery, SmsSendError> {
        if message.phone_number.trim().is_empty() {
            return Err(SmsSendError("empty phone number".to_owned()));
        }
        let external_id = Uuid::now_v7().to_string();
        info!(
            sms_id = message.id,
            project_id = %message.project_id,
            phone = %message.phone_number,
            external_id = %external_id,
            "sms handed to log gateway"
        );
        Ok(SmsDelivery {
            provider: LOG_PROVIDER.to_owned(),
            external_id: Some(external_id),
        })
    }
}
