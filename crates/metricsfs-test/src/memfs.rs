//! In-memory filesystem.
//!
//! A complete [`FileSystem`] used as the wrapped delegate in tests and
//! demos. Paths are `/`-separated and normalized against the working
//! directory; every optional capability is implemented. Clones share the
//! same tree, so a test can keep a handle to the delegate after wrapping it.

use std::collections::BTreeMap;
use std::io::{self, SeekFrom};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use metricsfs_core::{Capabilities, File, FileInfo, FileSystem, OpenFlags};

/// Symlink hops followed before giving up.
const MAX_SYMLINK_HOPS: usize = 8;

#[derive(Debug, Clone)]
enum Node {
    File {
        data: Vec<u8>,
        mode: u32,
        modified: SystemTime,
    },
    Dir {
        mode: u32,
        modified: SystemTime,
    },
    Symlink {
        target: String,
        modified: SystemTime,
    },
}

impl Node {
    fn dir(mode: u32) -> Self {
        Self::Dir {
            mode,
            modified: SystemTime::now(),
        }
    }

    fn info(&self, path: &str) -> FileInfo {
        let name = base_name(path).to_string();
        match self {
            Self::File {
                data,
                mode,
                modified,
            } => FileInfo {
                name,
                size: data.len() as u64,
                mode: *mode,
                modified: *modified,
                is_dir: false,
            },
            Self::Dir { mode, modified } => FileInfo {
                name,
                size: 0,
                mode: *mode,
                modified: *modified,
                is_dir: true,
            },
            Self::Symlink { target, modified } => FileInfo {
                name,
                size: target.len() as u64,
                mode: 0o777,
                modified: *modified,
                is_dir: false,
            },
        }
    }

    fn set_modified(&mut self, at: SystemTime) {
        match self {
            Self::File { modified, .. }
            | Self::Dir { modified, .. }
            | Self::Symlink { modified, .. } => *modified = at,
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: BTreeMap<String, Node>,
    cwd: String,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::dir(0o755));
        Self {
            nodes,
            cwd: "/".to_string(),
        }
    }

    fn abs(&self, path: &str) -> String {
        normalize(&self.cwd, path)
    }

    /// Follows symlinks until a non-link node or a missing path.
    fn resolve(&self, path: &str) -> io::Result<String> {
        let mut current = self.abs(path);
        for _ in 0..MAX_SYMLINK_HOPS {
            match self.nodes.get(&current) {
                Some(Node::Symlink { target, .. }) => {
                    current = normalize(parent(&current), target);
                }
                _ => return Ok(current),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("too many levels of symbolic links: {path}"),
        ))
    }

    fn get(&self, path: &str) -> io::Result<&Node> {
        self.nodes.get(path).ok_or_else(|| not_found(path))
    }

    fn get_mut(&mut self, path: &str) -> io::Result<&mut Node> {
        self.nodes.get_mut(path).ok_or_else(|| not_found(path))
    }

    fn require_parent_dir(&self, path: &str) -> io::Result<()> {
        match self.nodes.get(parent(path)) {
            Some(Node::Dir { .. }) => Ok(()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("parent is not a directory: {path}"),
            )),
            None => Err(not_found(parent(path))),
        }
    }

    fn file_data_mut(&mut self, path: &str) -> io::Result<&mut Vec<u8>> {
        match self.get_mut(path)? {
            Node::File { data, modified, .. } => {
                *modified = SystemTime::now();
                Ok(data)
            }
            _ => Err(is_a_directory(path)),
        }
    }

    /// Keys of `path` and everything below it.
    fn subtree(&self, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        self.nodes
            .keys()
            .filter(|k| k.as_str() == path || k.starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn children(&self, path: &str) -> Vec<FileInfo> {
        self.nodes
            .iter()
            .filter(|(k, _)| k.as_str() != "/" && parent(k) == path)
            .map(|(k, node)| node.info(k))
            .collect()
    }
}

/// In-memory filesystem.
#[derive(Debug, Clone)]
pub struct MemFs {
    tree: Arc<RwLock<Tree>>,
    capabilities: Capabilities,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    /// Creates an empty filesystem containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::new())),
            capabilities: Capabilities::ALL,
        }
    }

    /// Restricts the optional capabilities this filesystem advertises.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Writes `data` to `path`, creating parent directories.
    pub fn write_file(&self, path: &str, data: impl Into<Vec<u8>>) -> io::Result<()> {
        let path = self.tree.read().abs(path);
        self.mkdir_all(parent(&path), 0o755)?;
        let mut tree = self.tree.write();
        if let Some(Node::Dir { .. }) = tree.nodes.get(&path) {
            return Err(is_a_directory(&path));
        }
        tree.nodes.insert(
            path,
            Node::File {
                data: data.into(),
                mode: 0o644,
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    /// Contents of the file at `path`.
    pub fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        let tree = self.tree.read();
        let path = tree.resolve(path)?;
        match tree.get(&path)? {
            Node::File { data, .. } => Ok(data.clone()),
            _ => Err(is_a_directory(&path)),
        }
    }

    /// Returns true if anything exists at `path`.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        let tree = self.tree.read();
        let path = tree.abs(path);
        tree.nodes.contains_key(&path)
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn open(&self, path: &str) -> io::Result<MemFile> {
        self.open_file(path, OpenFlags::READ_ONLY, 0)
    }

    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> io::Result<MemFile> {
        let access = flags.bits() & 0o3;
        let readable = access != OpenFlags::WRITE_ONLY.bits();
        let writable = access != OpenFlags::READ_ONLY.bits();

        let mut tree = self.tree.write();
        let path = tree.resolve(path)?;
        match tree.nodes.get_mut(&path) {
            Some(_) if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUSIVE) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("file exists: {path}"),
                ));
            }
            Some(Node::Dir { .. }) if writable => return Err(is_a_directory(&path)),
            Some(Node::File { data, modified, .. })
                if writable && flags.contains(OpenFlags::TRUNCATE) =>
            {
                data.clear();
                *modified = SystemTime::now();
            }
            Some(_) => {}
            None if flags.contains(OpenFlags::CREATE) => {
                tree.require_parent_dir(&path)?;
                tree.nodes.insert(
                    path.clone(),
                    Node::File {
                        data: Vec::new(),
                        mode: perm,
                        modified: SystemTime::now(),
                    },
                );
            }
            None => return Err(not_found(&path)),
        }
        drop(tree);

        tracing::trace!(path = %path, flags = flags.bits(), "memfs open");
        Ok(MemFile {
            tree: Arc::clone(&self.tree),
            path,
            pos: 0,
            readable,
            writable,
            append: flags.contains(OpenFlags::APPEND),
            dir_cursor: 0,
        })
    }

    fn create(&self, path: &str) -> io::Result<MemFile> {
        self.open_file(
            path,
            OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            0o666,
        )
    }

    fn mkdir(&self, path: &str, perm: u32) -> io::Result<()> {
        let mut tree = self.tree.write();
        let path = tree.abs(path);
        if tree.nodes.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {path}"),
            ));
        }
        tree.require_parent_dir(&path)?;
        tree.nodes.insert(path, Node::dir(perm));
        Ok(())
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> io::Result<()> {
        let mut tree = self.tree.write();
        let path = tree.abs(path);
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            match tree.nodes.get(&current) {
                Some(Node::Dir { .. }) => {}
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("not a directory: {current}"),
                    ));
                }
                None => {
                    tree.nodes.insert(current.clone(), Node::dir(perm));
                }
            }
        }
        Ok(())
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        let mut tree = self.tree.write();
        let path = tree.abs(path);
        if let Node::Dir { .. } = tree.get(&path)? {
            if !tree.children(&path).is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("directory not empty: {path}"),
                ));
            }
        }
        if path == "/" {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove root",
            ));
        }
        tree.nodes.remove(&path);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> io::Result<()> {
        let mut tree = self.tree.write();
        let path = tree.abs(path);
        for key in tree.subtree(&path) {
            if key != "/" {
                tree.nodes.remove(&key);
            }
        }
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let mut tree = self.tree.write();
        let from = tree.abs(from);
        let to = tree.abs(to);
        tree.get(&from)?;
        tree.require_parent_dir(&to)?;
        if from == to {
            return Ok(());
        }
        if to.starts_with(&format!("{from}/")) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot move {from} below itself"),
            ));
        }
        for key in tree.subtree(&from) {
            if let Some(node) = tree.nodes.remove(&key) {
                let moved = format!("{to}{}", &key[from.len()..]);
                tree.nodes.insert(moved, node);
            }
        }
        Ok(())
    }

    fn stat(&self, path: &str) -> io::Result<FileInfo> {
        let tree = self.tree.read();
        let path = tree.resolve(path)?;
        Ok(tree.get(&path)?.info(&path))
    }

    fn lstat(&self, path: &str) -> io::Result<FileInfo> {
        let tree = self.tree.read();
        let path = tree.abs(path);
        Ok(tree.get(&path)?.info(&path))
    }

    fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
        let mut tree = self.tree.write();
        let path = tree.resolve(path)?;
        match tree.get_mut(&path)? {
            Node::File { mode: m, .. } | Node::Dir { mode: m, .. } => *m = mode & 0o7777,
            Node::Symlink { .. } => {}
        }
        Ok(())
    }

    fn chown(&self, path: &str, _uid: u32, _gid: u32) -> io::Result<()> {
        let tree = self.tree.read();
        let path = tree.resolve(path)?;
        tree.get(&path).map(|_| ())
    }

    fn chtimes(&self, path: &str, _atime: SystemTime, mtime: SystemTime) -> io::Result<()> {
        let mut tree = self.tree.write();
        let path = tree.resolve(path)?;
        tree.get_mut(&path)?.set_modified(mtime);
        Ok(())
    }

    fn readlink(&self, path: &str) -> io::Result<String> {
        let tree = self.tree.read();
        let path = tree.abs(path);
        match tree.get(&path)? {
            Node::Symlink { target, .. } => Ok(target.clone()),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {path}"),
            )),
        }
    }

    fn symlink(&self, original: &str, link: &str) -> io::Result<()> {
        let mut tree = self.tree.write();
        let link = tree.abs(link);
        if tree.nodes.contains_key(&link) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {link}"),
            ));
        }
        tree.require_parent_dir(&link)?;
        tree.nodes.insert(
            link,
            Node::Symlink {
                target: original.to_string(),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn chdir(&self, dir: &str) -> io::Result<()> {
        let mut tree = self.tree.write();
        let dir = tree.resolve(dir)?;
        match tree.get(&dir)? {
            Node::Dir { .. } => {
                tree.cwd = dir;
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {dir}"),
            )),
        }
    }

    fn getwd(&self) -> io::Result<String> {
        Ok(self.tree.read().cwd.clone())
    }

    fn temp_dir(&self) -> String {
        "/tmp".to_string()
    }

    fn truncate(&self, path: &str, size: u64) -> io::Result<()> {
        let mut tree = self.tree.write();
        let path = tree.resolve(path)?;
        let data = tree.file_data_mut(&path)?;
        data.resize(to_usize(size)?, 0);
        Ok(())
    }

    fn separator(&self) -> char {
        '/'
    }

    fn list_separator(&self) -> char {
        ':'
    }
}

/// Handle into a [`MemFs`].
#[derive(Debug)]
pub struct MemFile {
    tree: Arc<RwLock<Tree>>,
    path: String,
    pos: u64,
    readable: bool,
    writable: bool,
    append: bool,
    dir_cursor: usize,
}

impl MemFile {
    fn check_readable(&self) -> io::Result<()> {
        if self.readable {
            Ok(())
        } else {
            Err(bad_mode(&self.path, "writing"))
        }
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(bad_mode(&self.path, "reading"))
        }
    }

    fn read_from(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.check_readable()?;
        let tree = self.tree.read();
        match tree.get(&self.path)? {
            Node::File { data, .. } => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
                let n = buf.len().min(data.len() - start);
                buf[..n].copy_from_slice(&data[start..start + n]);
                Ok(n)
            }
            _ => Err(is_a_directory(&self.path)),
        }
    }

    fn write_to(&self, buf: &[u8], offset: Option<u64>) -> io::Result<(usize, u64)> {
        self.check_writable()?;
        let mut tree = self.tree.write();
        let data = tree.file_data_mut(&self.path)?;
        let start = match offset {
            Some(offset) => to_usize(offset)?,
            None => data.len(),
        };
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok((buf.len(), end as u64))
    }

    fn len(&self) -> io::Result<u64> {
        let tree = self.tree.read();
        match tree.get(&self.path)? {
            Node::File { data, .. } => Ok(data.len() as u64),
            _ => Ok(0),
        }
    }
}

impl File for MemFile {
    fn name(&self) -> &str {
        &self.path
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_from(buf, self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.read_from(buf, offset)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let offset = if self.append { None } else { Some(self.pos) };
        let (n, end) = self.write_to(buf, offset)?;
        self.pos = end;
        Ok(n)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        if self.append {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "write_at on a handle opened for append",
            ));
        }
        self.write_to(buf, Some(offset)).map(|(n, _)| n)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => self.len()?.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file")
        })?;
        self.pos = target;
        Ok(target)
    }

    fn stat(&self) -> io::Result<FileInfo> {
        let tree = self.tree.read();
        Ok(tree.get(&self.path)?.info(&self.path))
    }

    fn sync(&mut self) -> io::Result<()> {
        self.tree.read().get(&self.path).map(|_| ())
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.check_writable()?;
        let mut tree = self.tree.write();
        tree.file_data_mut(&self.path)?.resize(to_usize(size)?, 0);
        Ok(())
    }

    fn readdir(&mut self, limit: Option<usize>) -> io::Result<Vec<FileInfo>> {
        let tree = self.tree.read();
        match tree.get(&self.path)? {
            Node::Dir { .. } => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", self.path),
                ));
            }
        }
        let entries: Vec<_> = tree
            .children(&self.path)
            .into_iter()
            .skip(self.dir_cursor)
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        self.dir_cursor += entries.len();
        Ok(entries)
    }

    fn close(self) -> io::Result<()> {
        tracing::trace!(path = %self.path, "memfs close");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Paths
// ═══════════════════════════════════════════════════════════════════════════════

/// Joins `path` onto `base` and removes `.`, `..` and empty segments.
fn normalize(base: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{base}/{path}")
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

fn base_name(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    path.rsplit('/').next().unwrap_or(path)
}

fn to_usize(size: u64) -> io::Result<usize> {
    usize::try_from(size).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "size too large"))
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {path}"),
    )
}

fn is_a_directory(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::IsADirectory,
        format!("is a directory: {path}"),
    )
}

fn bad_mode(path: &str, opened_for: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("{path} is open for {opened_for} only"),
    )
}
