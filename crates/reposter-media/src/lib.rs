//! Asset Acquirer and hosting collaborator.

pub mod acquirer;
pub mod error;
pub mod hosting;
pub mod retention;

pub use acquirer::AssetAcquirer;
pub use error::AcquisitionError;
pub use hosting::{hosting_from_settings, HostingService, StaticUrlHosting, UploadHosting};
pub use retention::{is_managed_name, is_partial_name, managed_file_name, RetentionManifest};
