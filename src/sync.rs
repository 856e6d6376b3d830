//! One-level mirror of a local directory into the remote backup root.
//!
//! Every existence check is a name + parent query against the store, so
//! re-running over an unchanged tree creates nothing. A file whose name
//! already exists under its remote folder is treated as backed up regardless
//! of content.

use crate::store::{NodeQuery, RemoteNode, RemoteStore};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_directory: bool,
}

pub struct SyncEngine<S: RemoteStore> {
    store: S,
    backup_root_name: String,
    backup_root: Option<RemoteNode>,
}

impl<S: RemoteStore> SyncEngine<S> {
    pub fn new(store: S, backup_root_name: &str) -> Self {
        Self {
            store,
            backup_root_name: backup_root_name.to_string(),
            backup_root: None,
        }
    }

    /// Finds or creates the top-level backup folder. Resolved once per engine;
    /// later calls return the cached node without touching the store. When
    /// several folders share the name, the first one listed wins.
    pub fn resolve_backup_root(&mut self) -> Result<RemoteNode> {
        if let Some(root) = &self.backup_root {
            return Ok(root.clone());
        }

        let name = self.backup_root_name.clone();
        let existing = self
            .store
            .list_nodes(&NodeQuery::folder(&name, None))
            .with_context(|| format!("failed to look up backup folder '{name}'"))?;

        let root = match existing.into_iter().next() {
            Some(node) => {
                debug!(name = %name, id = %node.id, "backup root found");
                node
            }
            None => {
                let node = self
                    .store
                    .create_folder(&name, None)
                    .with_context(|| format!("error creating the main backup folder '{name}'"))?;
                info!(name = %name, id = %node.id, "backup root created");
                println!("Folder: {name} is created on {}.", self.store.name());
                node
            }
        };

        self.backup_root = Some(root.clone());
        Ok(root)
    }

    /// Returns the folder `name` under `parent_id`, creating it if absent.
    /// The result does not say which of the two happened.
    pub fn ensure_remote_folder(&self, name: &str, parent_id: &str) -> Result<RemoteNode> {
        let existing = self
            .store
            .list_nodes(&NodeQuery::folder(name, Some(parent_id)))?;
        if let Some(node) = existing.into_iter().next() {
            debug!(name, parent_id, id = %node.id, "folder already present");
            return Ok(node);
        }

        let node = self.store.create_folder(name, Some(parent_id))?;
        info!(name, parent_id, id = %node.id, "folder created");
        println!("Folder: {name} is created on {}.", self.store.name());
        Ok(node)
    }

    /// Uploads `local_path` as `name` under `parent_id` unless a file of that
    /// name is already there. Never fails the run: an unreadable local file or
    /// a remote error is reported and yields `false`.
    pub fn ensure_remote_file(&self, local_path: &Path, name: &str, parent_id: &str) -> bool {
        let opened = fs::File::open(local_path).and_then(|f| {
            let size = f.metadata()?.len();
            Ok((f, size))
        });
        let (file, size) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                warn!(name, path = %local_path.display(), error = %e, "local file unavailable");
                println!("Error uploading the file '{name}': not found ({e})");
                return false;
            }
        };

        let existing = match self.store.list_nodes(&NodeQuery::file(name, parent_id)) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(name, parent_id, error = %e, "file lookup failed");
                println!("Error uploading the file '{name}': {e:#}");
                return false;
            }
        };
        if !existing.is_empty() {
            debug!(name, parent_id, "file already backed up");
            return false;
        }

        match self.store.create_file(name, parent_id, Box::new(file), size) {
            Ok(node) => {
                info!(name, parent_id, id = %node.id, "file uploaded");
                println!("------ File: {name} was backed up successfully!");
                true
            }
            Err(e) => {
                warn!(name, parent_id, error = %e, "upload failed");
                println!("Error uploading the file '{name}': {e:#}");
                false
            }
        }
    }

    /// Mirrors each immediate subdirectory of `local_root` and its immediate
    /// files, returning how many files were newly uploaded. Local listing
    /// errors abort the walk; remote errors only skip the affected item.
    pub fn sync_tree(&mut self, local_root: &Path) -> Result<usize> {
        let root = self.resolve_backup_root()?;
        let mut created = 0usize;

        for dir in list_dir(local_root)?.into_iter().filter(|e| e.is_directory) {
            let files: Vec<LocalEntry> = list_dir(&dir.path)?
                .into_iter()
                .filter(|e| !e.is_directory)
                .collect();

            if files.is_empty() {
                info!(name = %dir.name, "skipping empty folder");
                println!("Folder {} is empty. Skipping...", dir.name);
                continue;
            }

            let folder = match self.ensure_remote_folder(&dir.name, &root.id) {
                Ok(f) => f,
                Err(e) => {
                    warn!(name = %dir.name, error = %e, "folder ensure failed");
                    println!("Error creating the folder '{}': {e:#}", dir.name);
                    continue;
                }
            };

            for file in &files {
                if self.ensure_remote_file(&file.path, &file.name, &folder.id) {
                    created += 1;
                }
            }
        }

        Ok(created)
    }
}

/// Lists the immediate entries of `dir`, sorted by name. Symlinks are
/// followed when classifying; entries that are neither a directory nor a
/// regular file are dropped.
pub fn list_dir(dir: &Path) -> Result<Vec<LocalEntry>> {
    let read = fs::read_dir(dir).with_context(|| format!("cannot list '{}'", dir.display()))?;

    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.with_context(|| format!("cannot list '{}'", dir.display()))?;
        let path = entry.path();
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !meta.is_dir() && !meta.is_file() {
            continue;
        }
        entries.push(LocalEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_directory: meta.is_dir(),
            path,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
