// Alert transport implementations
pub mod email;

pub use email::{resolve_credentials, SmtpAlertTransport};
