pub mod decoder;
pub mod indexer;
pub mod metrics;
pub mod models;
pub mod storage;
pub mod subgraph;
pub mod utils;
