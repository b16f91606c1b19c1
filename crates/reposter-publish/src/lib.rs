//! Publisher: Graph API container protocol with cancellable status polling.

pub mod clock;
pub mod error;
pub mod graph;
pub mod poll;
pub mod publisher;
pub mod status;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::PublishError;
pub use graph::GraphClient;
pub use poll::{PollState, PollTracker};
pub use publisher::{GraphPublisher, Publisher};
pub use status::ContainerStatus;
