//! Mentora course marketplace client
//!
//! Typed adapters for the pieces of the marketplace that live outside the
//! application: the course and assignment contracts on an Ethereum-compatible
//! chain, IPFS media storage, and the assignment review agent.
//!
//! ## Module Structure
//!
//! - `chain/`: JSON-RPC transport, ABI codec, contract handle
//! - `mentora`: course contract client
//! - `assignments`: assignment manager contract client
//! - `storage/`: validated uploads and retrieval (REST gateway or IPFS node)
//! - `agent/`: review agent chat channel
//! - `review`: assignment generation and grading over chat completions
//! - `config`: TOML / environment configuration and network presets
//! - `context`: the configured clients bundled together

/// Error types
pub mod error;

/// Chain access (transport, ABI, contracts)
pub mod chain;

/// Records shared by the contract clients
pub mod models;

pub mod assignments;
pub mod mentora;

/// Content-addressed media storage
pub mod storage;

/// Review agent channel
pub mod agent;

pub mod review;

pub mod config;
pub mod context;

pub use agent::{extract_github_url, AgentMessage, AgentSession, MessageKind, Submission};
pub use assignments::AssignmentManagerClient;
pub use chain::{Address, EthTransport, JsonRpcTransport, PendingTransaction, TransactionReceipt};
pub use config::{ClientConfig, NetworkPreset, StorageBackend};
pub use context::{CourseDraft, MentoraContext, ModuleDraft, PublishStage, PublishedCourse};
pub use error::{ClientError, Result};
pub use mentora::MentoraClient;
pub use models::{
    Assignment, Checkpoint, Course, CourseInfo, CourseManifest, CourseStats, CourseUpdate,
    Difficulty, NewAssignment, NewCourse,
};
pub use review::{AssignmentReviewer, GeneratedAssignment, ReviewerConfig, SolutionEvaluation};
pub use storage::{
    ContentHint, ContentId, ContentStore, FileUpload, RetrievedContent, StorageClient,
};
