pub mod controller;
pub mod role_number;
pub mod router;
pub mod service;

pub use service::ApprovalService;
