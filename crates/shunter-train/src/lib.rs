//! Shunter Train - multi-version release scheduling
//!
//! This crate drives the release train: concurrent release creation with
//! CI verification, dependency-settlement confirmation, sequential
//! per-version post-release workflows, and package-index sync checks. The
//! single-repository workflow is also used on its own outside train mode.

pub mod artifacts;
pub mod ci;
pub mod error;
pub mod notify;
pub mod scheduler;
pub mod workflow;

pub use artifacts::{HttpPackageIndex, PackageIndex, SyncConfig};
pub use ci::{CiApi, CiConfig, CiPollConfig, CircleCi};
pub use error::{Result, TrainError};
pub use notify::{ChatNotifier, Notifier, SocialNotifier};
pub use scheduler::{TrainConfig, TrainScheduler};
pub use workflow::ReleaseWorkflow;
