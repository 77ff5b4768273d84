//! Query-time retrieval and batch ingestion on top of the embedding and vector crates.

pub mod engine;
pub mod ingest;

pub use engine::{EngineStatus, RetrievalEngine};
pub use ingest::{IngestReport, Ingestor};
