use anyhow::{Context, Result};
use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use shared::domain::{Conversation, DirectoryInfo, FileIdentifier};

const CONVERSATION_EXTENSION: &str = ".json";
const ROOT_DIRECTORY_NAME: &str = "root";

/// Failure classes callers branch on. Wrapped in `anyhow::Error`; use
/// [`StorageError::classify`] to recover it.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("path must be under workspace directory: {0}")]
    InvalidPath(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

impl StorageError {
    pub fn classify(err: &anyhow::Error) -> Option<&StorageError> {
        err.chain().find_map(|cause| cause.downcast_ref::<StorageError>())
    }
}

/// Directory of conversation files on local disk.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: PathBuf,
}

impl WorkspaceStore {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .context("failed to resolve current directory")?
                .join(root)
        };
        let root = normalize(&absolute).ok_or_else(|| {
            StorageError::InvalidPath(absolute.display().to_string())
        })?;

        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("failed to create workspace '{}'", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn health_check(&self) -> Result<()> {
        let metadata = fs::metadata(&self.root)
            .await
            .with_context(|| format!("workspace '{}' is unreachable", self.root.display()))?;
        if !metadata.is_dir() {
            anyhow::bail!("workspace '{}' is not a directory", self.root.display());
        }
        Ok(())
    }

    /// Every `.json` entry of `directory`, pre-sorted by numeric stem.
    pub async fn list_files(&self, directory: &str) -> Result<Vec<FileIdentifier>> {
        let dir = self.resolve(directory)?;
        if !is_dir(&dir).await {
            return Err(StorageError::NotFound(format!("Directory not found: {directory}")).into());
        }

        let mut files = Vec::new();
        for name in json_entries(&dir).await? {
            files.push(FileIdentifier::new(join_display(directory, &name)));
        }
        files.sort_by_key(|file| numeric_stem(file));
        Ok(files)
    }

    pub async fn read_file(&self, path: &FileIdentifier) -> Result<Conversation> {
        let resolved = self.resolve(path.as_str())?;
        let raw = match fs::read(&resolved).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("File not found: {path}")).into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read '{path}'"));
            }
        };
        serde_json::from_slice(&raw).with_context(|| format!("failed to parse '{path}'"))
    }

    pub async fn write_file(&self, path: &FileIdentifier, conversation: &Conversation) -> Result<()> {
        let resolved = self.resolve(path.as_str())?;
        write_atomic(&resolved, conversation).await
    }

    pub async fn delete_file(&self, path: &FileIdentifier) -> Result<()> {
        let resolved = self.resolve(path.as_str())?;
        match fs::remove_file(&resolved).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("File not found: {path}")).into())
            }
            Err(err) => Err(err).with_context(|| format!("failed to delete '{path}'")),
        }
    }

    /// Writes `content` to a freshly named file in `directory`. The reference
    /// file does not influence naming; placement is the caller's concern.
    pub async fn create_file(
        &self,
        directory: &str,
        content: &Conversation,
        _reference: Option<&FileIdentifier>,
    ) -> Result<FileIdentifier> {
        let dir = self.resolve(directory)?;
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create directory '{directory}'"))?;

        let name = format!("{}{CONVERSATION_EXTENSION}", Uuid::new_v4().simple());
        let path = FileIdentifier::new(join_display(directory, &name));
        write_atomic(&dir.join(&name), content).await?;
        Ok(path)
    }

    /// Renames `files`, in order, to `1.json`, `2.json`, ... inside
    /// `directory` and returns the new paths in that order.
    pub async fn renumber(
        &self,
        directory: &str,
        files: &[FileIdentifier],
    ) -> Result<Vec<FileIdentifier>> {
        let dir = self.resolve(directory)?;
        if !is_dir(&dir).await {
            return Err(StorageError::NotFound("Directory not found".to_string()).into());
        }

        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            let resolved = self.resolve(file.as_str())?;
            if !fs::try_exists(&resolved).await.unwrap_or(false) {
                return Err(StorageError::NotFound(format!("File not found: {file}")).into());
            }
            sources.push(resolved);
        }

        for index in 1..=files.len() {
            let target = dir.join(format!("{index}{CONVERSATION_EXTENSION}"));
            let occupied = fs::try_exists(&target).await.unwrap_or(false);
            if occupied && !sources.contains(&target) {
                return Err(StorageError::AlreadyExists(target.display().to_string()).into());
            }
        }

        // Renames done so far, undone in reverse if a later one fails.
        let mut moves: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(sources.len() * 2);
        let mut staged = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let temp = dir.join(format!(
                "temp_{index}_{}{CONVERSATION_EXTENSION}",
                Uuid::new_v4().simple()
            ));
            if let Err(err) = fs::rename(source, &temp).await {
                undo_renames(&moves).await;
                return Err(err).with_context(|| format!("failed to stage '{}'", source.display()));
            }
            moves.push((source.clone(), temp.clone()));
            staged.push(temp);
        }

        let mut renamed = Vec::with_capacity(staged.len());
        for (index, temp) in staged.iter().enumerate() {
            let name = format!("{}{CONVERSATION_EXTENSION}", index + 1);
            let target = dir.join(&name);
            if let Err(err) = fs::rename(temp, &target).await {
                undo_renames(&moves).await;
                return Err(err)
                    .with_context(|| format!("failed to rename '{}' to '{name}'", temp.display()));
            }
            moves.push((temp.clone(), target));
            renamed.push(FileIdentifier::new(join_display(directory, &name)));
        }
        Ok(renamed)
    }

    /// The workspace root followed by every nested directory, depth first.
    pub async fn list_directories(&self) -> Result<Vec<DirectoryInfo>> {
        let root_count = json_entries(&self.root).await?.len();
        let mut directories = vec![DirectoryInfo {
            name: ROOT_DIRECTORY_NAME.to_string(),
            path: self.root.display().to_string(),
            has_files: root_count > 0,
            file_count: root_count,
        }];

        let mut pending = subdirectories(&self.root).await?;
        pending.reverse();
        while let Some(dir) = pending.pop() {
            let count = json_entries(&dir).await?.len();
            let relative = dir
                .strip_prefix(&self.root)
                .unwrap_or(dir.as_path())
                .components()
                .map(|part| part.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            directories.push(DirectoryInfo {
                name: relative,
                path: dir.display().to_string(),
                has_files: count > 0,
                file_count: count,
            });

            let mut children = subdirectories(&dir).await?;
            children.reverse();
            pending.extend(children);
        }
        Ok(directories)
    }

    pub async fn create_directory(&self, path: &str) -> Result<PathBuf> {
        let dir = self.resolve(path)?;
        if fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(StorageError::AlreadyExists("Directory already exists".to_string()).into());
        }
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create directory '{path}'"))?;
        Ok(dir)
    }

    pub async fn delete_directory(&self, path: &str) -> Result<()> {
        let dir = self.resolve(path)?;
        if dir == self.root {
            return Err(StorageError::InvalidPath("cannot delete workspace root".to_string()).into());
        }
        if !is_dir(&dir).await {
            return Err(StorageError::NotFound(format!("Directory not found: {path}")).into());
        }
        fs::remove_dir_all(&dir)
            .await
            .with_context(|| format!("failed to delete directory '{path}'"))
    }

    /// Resolves a request path (absolute, or relative to the workspace root)
    /// and refuses anything outside the workspace.
    fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(StorageError::InvalidPath("path is empty".to_string()).into());
        }
        let candidate = Path::new(raw);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        match normalize(&joined) {
            Some(path) if path.starts_with(&self.root) => Ok(path),
            _ => Err(StorageError::InvalidPath(raw.to_string()).into()),
        }
    }
}

fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

fn join_display(directory: &str, name: &str) -> String {
    let trimmed = directory.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return name.to_string();
    }
    format!("{trimmed}/{name}")
}

fn numeric_stem(file: &FileIdentifier) -> u64 {
    file.sort_key().parse::<u64>().unwrap_or(u64::MAX)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

async fn json_entries(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list '{}'", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(CONVERSATION_EXTENSION) && !entry.file_type().await?.is_dir() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

async fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list '{}'", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

async fn undo_renames(moves: &[(PathBuf, PathBuf)]) {
    for (from, to) in moves.iter().rev() {
        if let Err(err) = fs::rename(to, from).await {
            warn!(
                from = %to.display(),
                to = %from.display(),
                error = %err,
                "failed to roll back rename"
            );
        }
    }
}

async fn write_atomic(path: &Path, conversation: &Conversation) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
    if !is_dir(parent).await {
        return Err(StorageError::NotFound(format!(
            "Directory not found: {}",
            parent.display()
        ))
        .into());
    }

    let bytes = serde_json::to_vec_pretty(conversation).context("failed to encode conversation")?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("failed to write '{}'", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
