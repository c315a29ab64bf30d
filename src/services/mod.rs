pub mod job_engine;
pub mod order_allocator;
pub mod settlement_aggregator;
