//! Capabilities the pipeline drives. Each call either succeeds or fails; the failure
//! text only ends up in the diagnostic line of the aborting step.

use std::path::{Path, PathBuf};

pub type OpResult<T> = anyhow::Result<T>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub name: String,
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
    pub home: PathBuf,
}

/// Arguments of the database initialization binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    /// OS user the binary runs as.
    pub user: String,
    pub binary: PathBuf,
    pub node_name: String,
    pub data_dir: PathBuf,
    pub password: String,
    /// Requests DCF (consensus) mode.
    pub consensus: bool,
}

/// Source of the install package archive.
pub trait PackageFetcher {
    /// Returns the local path of the archive, downloading it first if needed.
    fn acquire(&self) -> OpResult<PathBuf>;

    fn describe(&self) -> String;
}

pub trait FilesystemOps {
    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> OpResult<()>;

    /// Expands `archive` into `dest`.
    fn unpack(&self, archive: &Path, dest: &Path) -> OpResult<()>;

    /// Appends `text` to `path`, creating the file if needed.
    fn append(&self, path: &Path, text: &str) -> OpResult<()>;

    fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> OpResult<()>;
}

/// OS user and group database.
pub trait PrincipalManager {
    fn group(&self, name: &str) -> OpResult<Option<GroupEntry>>;

    fn user(&self, name: &str) -> OpResult<Option<UserEntry>>;

    fn add_group(&self, name: &str) -> OpResult<()>;

    /// Creates `name` with `group` as its primary group.
    fn add_user(&self, name: &str, group: &str) -> OpResult<()>;
}

pub trait DatabaseInitializer {
    fn initialize(&self, request: &InitRequest) -> OpResult<()>;
}
