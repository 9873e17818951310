//! tally-extract: extraction adapter (prompt, backend call, response decoding)
//! and the end-to-end analysis pipeline.

pub mod adapter;
pub mod analyzer;
pub mod backend;
pub mod decode;
pub mod prompt;
pub mod service;

pub use adapter::ExtractionAdapter;
pub use analyzer::{Analyzer, FormatPolicy};
pub use backend::{BackendConfig, ExtractionBackend, Provider, build_backend};
pub use decode::{decode_candidate, find_json_object};
pub use service::{AnalysisResponse, AnalyzeRequest, handle_analyze_request};
