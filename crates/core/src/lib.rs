//! Shared building blocks for the frontdesk support agent: layered configuration,
//! transport-facing errors, and the business records the support tools read.

pub mod config;
pub mod domain;
pub mod errors;
pub mod fixtures;

pub use domain::client::{Client, ClientId};
pub use domain::course::{Course, CourseId};
pub use domain::enquiry::{Enquiry, EnquiryId, EnquiryStatus};
pub use domain::order::{Order, OrderId, OrderStatus, PaymentStatus};
pub use errors::InterfaceError;
pub use fixtures::SupportCatalog;
