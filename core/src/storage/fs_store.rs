use crate::prelude::{ArtifactStore, StoreError, StoreResult, StoredArtifact};
use crate::storage::job::{ArtifactKind, JobId};
use crate::telemetry::log::LogManager;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Flat directory-per-job store: `<root>/<job_id>/<artifact file>`.
///
/// Jobs are never updated or removed once complete.
pub struct FsJobStore {
    root: PathBuf,
    logger: LogManager,
}

impl FsJobStore {
    /// Opens the store, creating the root directory when needed.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(io_error(&root))?;
        Ok(Self {
            root,
            logger: LogManager::new("store"),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job: &JobId) -> PathBuf {
        self.root.join(job.to_string())
    }

    async fn copy_all(
        &self,
        job_dir: &Path,
        artifacts: &[(ArtifactKind, &Path)],
    ) -> StoreResult<()> {
        for (kind, source) in artifacts {
            let target = job_dir.join(kind.file_name());
            fs::copy(source, &target).await.map_err(io_error(source))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FsJobStore {
    async fn put(&self, job: &JobId, artifacts: &[(ArtifactKind, &Path)]) -> StoreResult<()> {
        let job_dir = self.job_dir(job);
        match fs::create_dir(&job_dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::JobExists(*job));
            }
            Err(err) => return Err(io_error(&job_dir)(err)),
        }

        if let Err(err) = self.copy_all(&job_dir, artifacts).await {
            if let Err(cleanup) = fs::remove_dir_all(&job_dir).await {
                self.logger.warn(&format!(
                    "could not remove partial job {}: {}",
                    job_dir.display(),
                    cleanup
                ));
            }
            return Err(err);
        }

        self.logger
            .record(&format!("stored {} artifacts for job {}", artifacts.len(), job));
        Ok(())
    }

    async fn get(&self, job: &JobId, kind: ArtifactKind) -> StoreResult<Option<StoredArtifact>> {
        let path = self.job_dir(job).join(kind.file_name());
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path)(err)),
        };
        let len = file.metadata().await.map_err(io_error(&path))?.len();
        Ok(Some(StoredArtifact { file, len }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn sources(dir: &Path) -> (PathBuf, PathBuf) {
        let track = dir.join("track.json");
        let video = dir.join("video.mp4");
        std::fs::write(&track, br#"{"0": []}"#).unwrap();
        std::fs::write(&video, b"\x00\x00\x00\x18ftypmp42").unwrap();
        (track, video)
    }

    async fn read_all(artifact: StoredArtifact) -> Vec<u8> {
        let mut file = artifact.file;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(bytes.len() as u64, artifact.len);
        bytes
    }

    #[test]
    fn open_creates_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("output");
        let store = FsJobStore::open(&root).unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn put_then_get_returns_identical_bytes() {
        let temp = TempDir::new().unwrap();
        let (track, video) = sources(temp.path());
        let store = FsJobStore::open(temp.path().join("out")).unwrap();
        let job = JobId::generate();

        store
            .put(
                &job,
                &[
                    (ArtifactKind::TrackDocument, track.as_path()),
                    (ArtifactKind::DebugVideo, video.as_path()),
                ],
            )
            .await
            .unwrap();

        let dir = store.job_dir(&job);
        assert!(dir.join("bbox_tracking.json").is_file());
        assert!(dir.join("debug_video.mp4").is_file());

        let first = read_all(store.get(&job, ArtifactKind::DebugVideo).await.unwrap().unwrap()).await;
        let second = read_all(store.get(&job, ArtifactKind::DebugVideo).await.unwrap().unwrap()).await;
        assert_eq!(first, std::fs::read(&video).unwrap());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn get_unknown_job_is_none() {
        let temp = TempDir::new().unwrap();
        let store = FsJobStore::open(temp.path()).unwrap();
        assert!(store
            .get(&JobId::generate(), ArtifactKind::DebugVideo)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn failed_copy_leaves_no_job_directory() {
        let temp = TempDir::new().unwrap();
        let (track, _) = sources(temp.path());
        let missing = temp.path().join("missing.mp4");
        let store = FsJobStore::open(temp.path().join("out")).unwrap();
        let job = JobId::generate();

        let err = store
            .put(
                &job,
                &[
                    (ArtifactKind::TrackDocument, track.as_path()),
                    (ArtifactKind::DebugVideo, missing.as_path()),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!store.job_dir(&job).exists());
    }

    #[tokio::test]
    async fn existing_job_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let (track, _) = sources(temp.path());
        let store = FsJobStore::open(temp.path().join("out")).unwrap();
        let job = JobId::generate();
        store
            .put(&job, &[(ArtifactKind::TrackDocument, track.as_path())])
            .await
            .unwrap();
        assert!(matches!(
            store
                .put(&job, &[(ArtifactKind::TrackDocument, track.as_path())])
                .await,
            Err(StoreError::JobExists(_))
        ));
    }
}
