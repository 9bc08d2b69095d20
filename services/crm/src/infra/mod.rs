pub mod db;
pub mod sms;
pub mod timezone;
