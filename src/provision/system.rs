//! Collaborators backed by the host: std::fs plus the usual shell utilities.

use super::ops::{
    DatabaseInitializer, FilesystemOps, GroupEntry, InitRequest, OpResult, PrincipalManager,
    UserEntry,
};
use anyhow::{Context, anyhow, bail};
use log::debug;
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// `getent` exit status for "key not found".
const GETENT_NOT_FOUND: i32 = 2;

fn run<I, S>(program: &str, args: I) -> OpResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to run '{}'", program))?;
    if !status.success() {
        bail!("'{}' exited with {}", program, status);
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct LocalFilesystem;

impl FilesystemOps for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> OpResult<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("mkdir '{}' failed", path.display()))
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> OpResult<()> {
        debug!("tar -x -f {} -C {}", archive.display(), dest.display());
        run(
            "tar",
            [
                OsStr::new("-x"),
                OsStr::new("-f"),
                archive.as_os_str(),
                OsStr::new("-C"),
                dest.as_os_str(),
            ],
        )
        .with_context(|| {
            format!(
                "decompress '{}' to '{}' failed",
                archive.display(),
                dest.display()
            )
        })
    }

    fn append(&self, path: &Path, text: &str) -> OpResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("failed to append to '{}'", path.display()))
    }

    fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> OpResult<()> {
        let owner = format!("{}:{}", user, group);
        run(
            "chown",
            [OsStr::new("-R"), OsStr::new(&owner), path.as_os_str()],
        )
        .with_context(|| format!("change owner of '{}' to {} failed", path.display(), owner))
    }
}

/// User and group database queried with `getent`, mutated with `groupadd`/`useradd`.
#[derive(Debug, Clone, Default)]
pub struct SystemPrincipals;

impl SystemPrincipals {
    fn getent(database: &str, key: &str) -> OpResult<Option<String>> {
        let output = Command::new("getent")
            .args([database, key])
            .output()
            .context("failed to run 'getent'")?;
        if output.status.code() == Some(GETENT_NOT_FOUND) {
            return Ok(None);
        }
        if !output.status.success() {
            bail!("'getent {} {}' exited with {}", database, key, output.status);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }
}

impl PrincipalManager for SystemPrincipals {
    fn group(&self, name: &str) -> OpResult<Option<GroupEntry>> {
        Self::getent("group", name)?
            .map(|line| parse_group_line(&line))
            .transpose()
    }

    fn user(&self, name: &str) -> OpResult<Option<UserEntry>> {
        Self::getent("passwd", name)?
            .map(|line| parse_passwd_line(&line))
            .transpose()
    }

    fn add_group(&self, name: &str) -> OpResult<()> {
        run("groupadd", [name]).with_context(|| format!("add group '{}' failed", name))
    }

    fn add_user(&self, name: &str, group: &str) -> OpResult<()> {
        run("useradd", ["-m", "-g", group, name])
            .with_context(|| format!("add user '{}' failed", name))
    }
}

/// `name:passwd:gid:members`
pub fn parse_group_line(line: &str) -> OpResult<GroupEntry> {
    let fields = line.split(':').collect::<Vec<_>>();
    if fields.len() < 3 {
        bail!("malformed group entry '{}'", line);
    }
    Ok(GroupEntry {
        name: fields[0].to_string(),
        gid: fields[2]
            .parse()
            .map_err(|_| anyhow!("bad gid in group entry '{}'", line))?,
    })
}

/// `name:passwd:uid:gid:gecos:home:shell`
pub fn parse_passwd_line(line: &str) -> OpResult<UserEntry> {
    let fields = line.split(':').collect::<Vec<_>>();
    if fields.len() < 7 {
        bail!("malformed passwd entry '{}'", line);
    }
    Ok(UserEntry {
        name: fields[0].to_string(),
        uid: fields[2]
            .parse()
            .map_err(|_| anyhow!("bad uid in passwd entry '{}'", line))?,
        gid: fields[3]
            .parse()
            .map_err(|_| anyhow!("bad gid in passwd entry '{}'", line))?,
        home: PathBuf::from(fields[5]),
    })
}

/// Runs `gs_initdb` as the database user through `su -`.
#[derive(Debug, Clone, Default)]
pub struct GsInitdb;

impl GsInitdb {
    /// Shell command passed to `su -c`; the second value has the password masked.
    pub fn command_line(request: &InitRequest) -> (String, String) {
        let render = |password: &str| {
            let mut parts = vec![shell_quote(&request.binary.display().to_string())];
            if request.consensus {
                parts.push("-c".to_string());
            }
            parts.push(shell_quote(&format!("--nodename={}", request.node_name)));
            parts.push("-w".to_string());
            parts.push(password.to_string());
            parts.push("-D".to_string());
            parts.push(shell_quote(&request.data_dir.display().to_string()));
            parts.join(" ")
        };
        (render(shell_quote(&request.password).as_str()), render("******"))
    }
}

impl DatabaseInitializer for GsInitdb {
    fn initialize(&self, request: &InitRequest) -> OpResult<()> {
        let (command, masked) = Self::command_line(request);
        debug!("su - {} -c \"{}\"", request.user, masked);
        run("su", ["-", request.user.as_str(), "-c", command.as_str()]).context("init db failed")
    }
}

fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@,+".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
