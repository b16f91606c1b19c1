//! Outbound notifications: one report per cycle plus operational notices.

pub mod error;
pub mod format;
pub mod notice;
pub mod telegram;

use async_trait::async_trait;
use reposter_core::CycleReport;

pub use error::ReportError;
pub use format::{escape_html, format_notice, format_report, group_thousands};
pub use notice::{Notice, NoticeKind};
pub use telegram::TelegramReporter;

/// Delivery channel for cycle reports and notices. Failures are returned to
/// the caller, which logs them and carries on.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, report: &CycleReport) -> Result<(), ReportError>;

    async fn notify(&self, notice: &Notice) -> Result<(), ReportError>;
}
