pub mod aggregator;
pub mod scheduler;

pub use aggregator::Aggregator;
pub use scheduler::WindowScheduler;
