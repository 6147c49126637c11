//! Appender implementations

pub mod console;
pub mod notification;
pub mod rotating_file;

pub use console::{ConsoleAppender, ConsoleTarget};
pub use notification::{
    Notification, NotificationAppender, NotificationStats, NotificationTransport, SmtpSettings,
    SmtpTransport,
};
pub use rotating_file::{Compression, Retention, RotatingFileAppender, RotationPolicy, RotationStrategy};

pub use crate::core::Appender;
