#![forbid(unsafe_code)]

pub mod auth_flow;
pub mod pacing;
pub mod sample_data;
pub mod upload;

pub use veriq_core::Clock;

pub use auth_flow::{AuthFlowService, CommandOutcome};
pub use pacing::Pacing;
pub use sample_data::sample_upload;
pub use upload::{UploadError, UploadSource};
