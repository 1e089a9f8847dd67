pub mod policy;
pub mod storage;

pub use policy::{MediaPolicy, PolicyViolation, UploadCategory};
pub use storage::{BlobStore, DeleteOutcome, StoredBlob};
