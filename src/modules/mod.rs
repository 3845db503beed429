pub mod api;
pub mod error;
pub mod form;
pub mod modal;
pub mod serialize;
pub mod session;
pub mod stats;
pub mod types;
