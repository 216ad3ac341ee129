//! `dod_doc_orchestrator`: a multi-agent orchestration engine that generates
//! the interdependent package of DoD acquisition documents (market research
//! through award) for a program, respecting the dependency order between
//! document types and scoring each document for hallucination risk, vagueness,
//! citation coverage, regulatory compliance, and completeness.

pub mod agent;
pub mod citation;
pub mod config;
pub mod context_pool;
pub mod document;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod llm;
pub mod metadata_store;
pub mod orchestrator;
pub mod quality;
pub mod retriever;
pub mod task;
