pub mod branch;
pub mod cli;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod stats;
