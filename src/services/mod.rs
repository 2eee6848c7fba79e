pub mod aggregator;
pub mod claude;
pub mod generator;
pub mod lifecycle;
#[cfg(test)]
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod scheduler;
pub mod store;
pub mod template;
