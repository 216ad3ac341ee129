//! Crate-wide error taxonomy (§7 of the design).
//!
//! Each variant corresponds to one row of the error-handling table: recovery
//! policy lives with the caller (orchestrator / agent), this enum only names
//! the failure and carries enough context to render it.

use thiserror::Error;

use crate::document::DocumentType;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OrchestratorError {
    /// Bad dependency graph: cycle, unknown type, duplicate entry. Fatal at
    /// load time — the job never starts.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Retrieval failed; callers treat this as empty context and continue.
    #[error("retrieval failed for query `{query}`: {reason}")]
    Retrieval { query: String, reason: String },

    /// Language-model call failed. `retryable` distinguishes transient
    /// failures (retry with backoff) from terminal ones (auth, bad request).
    #[error("model call failed ({}): {reason}", if *.retryable { "transient" } else { "terminal" })]
    Model { retryable: bool, reason: String },

    /// One agent's execution failed; isolated to its document, the job
    /// continues.
    #[error("agent for {doc_type:?} failed: {reason}")]
    Agent {
        doc_type: DocumentType,
        reason: String,
    },

    /// A governing timeout (per-LLM-call, per-agent, per-batch) elapsed.
    #[error("timeout after {elapsed_secs}s during {stage}")]
    Timeout { stage: String, elapsed_secs: u64 },

    /// Failed to persist a generated document. The document is still
    /// returned to the caller with `persisted=false`.
    #[error("metadata store error: {0}")]
    MetadataStore(String),

    /// Whole-job cancellation requested by the external caller.
    #[error("job cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("dependency graph has a cycle among: {0:?}")]
    Cycle(Vec<DocumentType>),

    #[error("dependency spec references unknown document type `{0}`")]
    UnknownType(String),

    #[error("duplicate dependency entry for `{0:?}`")]
    DuplicateEntry(DocumentType),

    #[error("unrecognized config key `{0}`")]
    UnrecognizedKey(String),

    #[error("invalid config value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("missing required project field `{0}`")]
    MissingProjectField(String),

    #[error("failed to parse dependency spec: {0}")]
    Malformed(String),
}
