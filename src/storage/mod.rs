//! Content-addressed storage for course media
//!
//! `StorageClient` applies the image/video rules and hands the bytes to a
//! `ContentStore` backend: the REST upload server (`GatewayStore`) or an IPFS
//! node directly (`IpfsNodeStore`).

pub mod client;
pub mod content_id;
pub mod gateway;
pub mod ipfs_node;
pub mod media;
pub mod traits;

pub use client::{ContentHint, RetrievedContent, StorageClient};
pub use content_id::ContentId;
pub use gateway::GatewayStore;
pub use ipfs_node::IpfsNodeStore;
pub use media::{FileUpload, MediaPolicy, UploadKind};
pub use traits::{ContentStore, ProgressFn, UPLOAD_CHUNK_SIZE};
