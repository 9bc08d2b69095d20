pub mod assignment;
pub mod automation;
pub mod orders;
pub mod rules;
pub mod shipping;
pub mod sms_dispatch;
