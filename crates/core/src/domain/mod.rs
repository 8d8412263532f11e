pub mod client;
pub mod course;
pub mod enquiry;
pub mod order;
