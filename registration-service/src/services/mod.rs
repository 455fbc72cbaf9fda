//! Services layer for the registration service.
//!
//! Holds the business logic (registration intake, approval/denial handling)
//! and the external collaborators it drives (directory, notifier).

mod approval;
mod directory;
pub mod error;
mod notifier;
mod registration;

pub use approval::{ApprovalOutcome, ApprovalService};
pub use directory::{Directory, DirectoryUser, HttpDirectory, MockDirectory};
pub use error::ServiceError;
pub use notifier::{EmailNotifier, MockNotifier, Notifier, SentMessage};
pub use registration::{RegistrationReceipt, RegistrationService};
