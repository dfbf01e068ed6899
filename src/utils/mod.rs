pub mod chart;
pub mod error;
pub mod logger;
pub mod validation;
