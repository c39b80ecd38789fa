//! Database queries for centers-web

pub mod audit;
pub mod centers;
pub mod participants;
pub mod reports;
