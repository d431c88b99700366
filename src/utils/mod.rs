pub mod error;
pub mod logger;
pub mod threads;
pub mod validation;
