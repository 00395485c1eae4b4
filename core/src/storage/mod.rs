pub mod fs_store;
pub mod job;

pub use fs_store::FsJobStore;
pub use job::{ArtifactKind, InvalidJobId, JobId};
