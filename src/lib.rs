pub mod builder;
pub mod cache;
pub mod completeness;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod generator;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod planner;
pub mod queue;
pub mod repair;
pub mod scaffold;
pub mod server;
pub mod util;
pub mod worker;
