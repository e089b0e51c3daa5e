pub mod connectors;
pub mod executions;
