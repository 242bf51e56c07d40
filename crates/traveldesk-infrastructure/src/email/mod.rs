//! Outgoing mail transports

pub mod mailgun;
pub mod smtp;
pub mod log_transport;

pub use mailgun::MailgunTransport;
pub use smtp::SmtpTransport;
pub use log_transport::LogTransport;
