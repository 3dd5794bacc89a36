//! Turn store boundary and session lifecycle service.

pub mod repository;
pub mod service;

pub use repository::TurnRepository;
pub use service::SessionService;
