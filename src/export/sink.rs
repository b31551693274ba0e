//! Download sinks: where a finished artifact is handed off.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use crate::export::Artifact;
use crate::Result;

/// The "file save" action at the end of an export.
pub trait DownloadSink: Send + Sync {
    /// Persist `artifact` and return where it ended up.
    fn save(&self, artifact: &Artifact) -> Result<PathBuf>;
}

/// Writes artifacts into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Only a single plain file name is accepted; anything that would resolve
/// outside the sink directory is refused.
fn plain_file_name(name: &str) -> io::Result<&Path> {
    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(path),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Refusing to save artifact under name {:?}", name),
        )),
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, artifact: &Artifact) -> Result<PathBuf> {
        let name = plain_file_name(&artifact.file_name)?;
        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(name);
        std::fs::write(&target, &artifact.bytes)?;
        Ok(target)
    }
}

/// Keeps artifacts in memory. Useful for embedding and for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<Artifact> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DownloadSink for MemorySink {
    fn save(&self, artifact: &Artifact) -> Result<PathBuf> {
        self.saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(artifact.clone());
        Ok(PathBuf::from(&artifact.file_name))
    }
}
