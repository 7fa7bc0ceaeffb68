//! src/services/video_store.rs
//!
//! VideoStore — filesystem-backed storage for the video clip library. This
//! file intentionally keeps no metadata store of any kind; the directory
//! listing itself is the source of truth, and every allocation re-reads it.

use bytes::Bytes;
use std::{
    cmp::Ordering,
    collections::BTreeSet,
    io,
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::debug;
use uuid::Uuid;

const VIDEO_PREFIX: &str = "video (";
const VIDEO_SUFFIX: &str = ").mp4";
const MAX_FILE_NAME_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid file name `{0}`")]
    InvalidFileName(String),
    #[error("video `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// VideoStore provides the file operations behind the HTTP surface:
/// - Save uploaded bytes under the next free sequential name
/// - Open a stored video for streaming out
/// - Remove a video by name
///
/// The struct is an explicit handle around the video directory so handlers
/// and tests can be pointed at any directory instead of a module-level
/// constant.
#[derive(Clone)]
pub struct VideoStore {
    /// Directory on disk holding all uploaded videos.
    pub base_path: PathBuf,

    /// Serializes name allocation and the rename into the final path.
    alloc_lock: Arc<Mutex<()>>,
}

impl VideoStore {
    /// Create a new VideoStore rooted at `base_path`. The directory is not
    /// created here; the caller bootstraps it on startup.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            alloc_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Basic name validation so caller-supplied names cannot resolve outside
    /// the video directory.
    ///
    /// Rejects empty and overlong names, path separators, `..`, and control
    /// bytes. Names are joined directly onto `base_path`, so this runs before
    /// every open and remove.
    fn ensure_name_safe(&self, name: &str) -> StoreResult<()> {
        if name.is_empty() || name.len() > MAX_FILE_NAME_LEN {
            return Err(StoreError::InvalidFileName(name.to_string()));
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(StoreError::InvalidFileName(name.to_string()));
        }
        if name.bytes().any(|b| b.is_ascii_control()) {
            return Err(StoreError::InvalidFileName(name.to_string()));
        }
        Ok(())
    }

    /// Full path of a video inside the directory.
    fn video_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Extract N from a name of the form `video (N).mp4`.
    ///
    /// Only exact matches count; anything else returns None and is ignored
    /// by the allocator.
    fn parse_video_number(name: &str) -> Option<u64> {
        let digits = name.strip_prefix(VIDEO_PREFIX)?.strip_suffix(VIDEO_SUFFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Collect the set of sequence numbers currently present on disk.
    async fn used_numbers(&self) -> StoreResult<BTreeSet<u64>> {
        let mut used = BTreeSet::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(n) = Self::parse_video_number(name) {
                used.insert(n);
            }
        }
        Ok(used)
    }

    /// Next free name: `video (N).mp4` with the smallest positive N not in
    /// use. Gaps left by deletions are filled before the sequence grows.
    ///
    /// Reads the directory fresh on every call.
    pub async fn next_available_name(&self) -> StoreResult<String> {
        let used = self.used_numbers().await?;
        let mut next: u64 = 1;
        for n in used {
            match n.cmp(&next) {
                Ordering::Less => continue,
                Ordering::Equal => next += 1,
                Ordering::Greater => break,
            }
        }
        Ok(format!("{}{}{}", VIDEO_PREFIX, next, VIDEO_SUFFIX))
    }

    /// Save uploaded bytes under the next free sequential name and return
    /// that name.
    ///
    /// Bytes land in a `.tmp-*` file first (flushed and fsynced), then the
    /// allocation lock is taken and the temp file is renamed onto the
    /// allocated name. Allocation and rename form one critical section so
    /// two concurrent uploads cannot claim the same number. The temp file is
    /// removed on every error path.
    pub async fn save(&self, data: Bytes) -> StoreResult<String> {
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = file.write_all(&data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        drop(file);

        let _guard = self.alloc_lock.lock().await;
        let name = match self.next_available_name().await {
            Ok(name) => name,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err);
            }
        };
        let final_path = self.video_path(&name);
        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        debug!("stored {} ({} bytes)", name, data.len());
        Ok(name)
    }

    /// Open a stored video for reading.
    ///
    /// Returns the file handle ready for streaming out plus its length in
    /// bytes. A missing file maps to NotFound.
    pub async fn open(&self, name: &str) -> StoreResult<(File, u64)> {
        self.ensure_name_safe(name)?;
        let path = self.video_path(name);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Remove a stored video by name.
    ///
    /// A missing file surfaces as the raw I/O error, not NotFound; removal
    /// failures are reported to callers without distinguishing the cause.
    pub async fn remove(&self, name: &str) -> StoreResult<()> {
        self.ensure_name_safe(name)?;
        let path = self.video_path(name);
        fs::remove_file(&path).await?;
        debug!("removed {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_at(path: &std::path::Path) -> VideoStore {
        VideoStore::new(path)
    }

    async fn touch(store: &VideoStore, name: &str) {
        fs::write(store.base_path.join(name), b"x").await.unwrap();
    }

    #[tokio::test]
    async fn empty_directory_allocates_one() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        assert_eq!(store.next_available_name().await.unwrap(), "video (1).mp4");
    }

    #[tokio::test]
    async fn allocator_fills_gaps_first() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        touch(&store, "video (1).mp4").await;
        touch(&store, "video (2).mp4").await;
        touch(&store, "video (4).mp4").await;

        assert_eq!(store.next_available_name().await.unwrap(), "video (3).mp4");
    }

    #[tokio::test]
    async fn allocator_extends_past_contiguous_run() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        touch(&store, "video (1).mp4").await;
        touch(&store, "video (2).mp4").await;
        touch(&store, "video (3).mp4").await;

        assert_eq!(store.next_available_name().await.unwrap(), "video (4).mp4");
    }

    #[tokio::test]
    async fn non_matching_names_do_not_influence_numbering() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        touch(&store, "video (1).mp4").await;
        touch(&store, "clip.mp4").await;
        touch(&store, "video (two).mp4").await;
        touch(&store, "video (2).mp4.bak").await;
        touch(&store, "video ().mp4").await;

        assert_eq!(store.next_available_name().await.unwrap(), "video (2).mp4");
    }

    #[tokio::test]
    async fn save_writes_bytes_under_allocated_name() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        let name = store.save(Bytes::from_static(b"first clip")).await.unwrap();
        assert_eq!(name, "video (1).mp4");
        let on_disk = fs::read(store.base_path.join(&name)).await.unwrap();
        assert_eq!(on_disk, b"first clip");

        let second = store.save(Bytes::from_static(b"second")).await.unwrap();
        assert_eq!(second, "video (2).mp4");
    }

    #[tokio::test]
    async fn save_reuses_number_freed_by_remove() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        store.save(Bytes::from_static(b"a")).await.unwrap();
        store.save(Bytes::from_static(b"b")).await.unwrap();
        store.save(Bytes::from_static(b"c")).await.unwrap();

        store.remove("video (2).mp4").await.unwrap();
        let name = store.save(Bytes::from_static(b"d")).await.unwrap();
        assert_eq!(name, "video (2).mp4");
    }

    #[tokio::test]
    async fn save_leaves_no_temp_files_behind() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        store.save(Bytes::from_static(b"payload")).await.unwrap();

        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name();
            assert!(!name.to_string_lossy().starts_with(".tmp-"));
        }
    }

    #[tokio::test]
    async fn concurrent_saves_get_distinct_names() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        let (a, b) = tokio::join!(
            store.save(Bytes::from_static(b"left")),
            store.save(Bytes::from_static(b"right")),
        );
        let a = a.unwrap();
        let b = b.unwrap();
        assert_ne!(a, b);
        assert!(fs::try_exists(store.base_path.join(&a)).await.unwrap());
        assert!(fs::try_exists(store.base_path.join(&b)).await.unwrap());
    }

    #[tokio::test]
    async fn open_returns_contents_and_length() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        let name = store.save(Bytes::from_static(b"streamable")).await.unwrap();

        let (_file, len) = store.open(&name).await.unwrap();
        assert_eq!(len, b"streamable".len() as u64);
    }

    #[tokio::test]
    async fn open_missing_video_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        let result = store.open("video (9).mp4").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn remove_missing_video_surfaces_io_error() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        let result = store.remove("video (9).mp4").await;
        match result {
            Err(StoreError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Io error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        for name in ["../escape.mp4", "/etc/passwd", "a/b.mp4", "a\\b.mp4", "", "nul\0.mp4"] {
            let result = store.remove(name).await;
            assert!(
                matches!(result, Err(StoreError::InvalidFileName(_))),
                "name {:?} was not rejected",
                name
            );
        }
    }
}
