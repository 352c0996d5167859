pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod excel;
pub mod history;
pub mod marking;
pub mod report;
pub mod utils;

pub use error::ProcessError;
