//! Cycle orchestration: the per-cycle state machine, the credit monitor,
//! the archive bundle, and the scheduler loop that ties them together.

pub mod archive;
pub mod credit;
pub mod error;
pub mod orchestrator;
pub mod scheduler;
pub mod stages;
pub mod status;

pub use archive::{ArchiveBundle, Archiver};
pub use credit::{CreditMonitor, CreditSource, HttpCreditSource, ManualCreditSource};
pub use error::{ArchiveError, CreditError, WiringError};
pub use orchestrator::{CycleState, Orchestrator};
pub use scheduler::{build_bundle, Scheduler, SchedulerWaker, TickOutcome};
pub use stages::{MediaAcquirer, Stages};
pub use status::{LastCycle, StatusBoard, StatusSnapshot};
