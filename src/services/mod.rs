//! Domain services sitting between handlers and external systems.

pub mod calendar;
pub mod generation;
pub mod llm;
pub mod records;
pub mod stripe;
