use std::ffi::{CStr, CString, OsString};
use std::fs::File;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};

/// access mode for [`open_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// extra flags for [`open_file`]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub create: bool,
    pub truncate: bool,
    pub directory: bool,
}

impl OpenFlags {
    pub const NONE: OpenFlags = OpenFlags {
        create: false,
        truncate: false,
        directory: false,
    };

    pub const CREATE_TRUNCATE: OpenFlags = OpenFlags {
        create: true,
        truncate: true,
        directory: false,
    };

    pub const DIRECTORY: OpenFlags = OpenFlags {
        create: false,
        truncate: false,
        directory: true,
    };
}

/// kind of filesystem object reported by [`stat_path`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

impl FileKind {
    fn from_mode(mode: libc::mode_t) -> FileKind {
        match mode & libc::S_IFMT {
            libc::S_IFREG => FileKind::Regular,
            libc::S_IFDIR => FileKind::Directory,
            libc::S_IFLNK => FileKind::Symlink,
            _ => FileKind::Other,
        }
    }
}

/// size and kind of a filesystem object
#[derive(Debug, Clone, Copy)]
pub struct FileInfo {
    pub size: u64,
    pub kind: FileKind,
}

/// an open directory descriptor
///
/// every operation in this module resolves its path relative to an
/// optional `Dir`; `None` means the current working directory. keeping
/// operations descriptor-relative makes recursive traversal and cleanup
/// immune to concurrent renames of ancestor directories.
pub struct Dir {
    fd: OwnedFd,
    path: PathBuf,
}

impl Dir {
    /// open a directory, optionally relative to another directory handle
    pub fn open(path: &Path, base: Option<&Dir>) -> Result<Dir> {
        let file = open_file(path, OpenMode::ReadOnly, OpenFlags::DIRECTORY, base)?;
        Ok(Dir {
            fd: OwnedFd::from(file),
            path: path.to_path_buf(),
        })
    }

    fn raw(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

fn base_fd(base: Option<&Dir>) -> RawFd {
    base.map_or(libc::AT_FDCWD, Dir::raw)
}

fn cstring_path(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| Error::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains a NUL byte"),
    })
}

/// retry a syscall until it stops failing with EINTR
fn retry_eintr(mut call: impl FnMut() -> libc::c_int) -> std::io::Result<libc::c_int> {
    loop {
        let rc = call();
        if rc >= 0 {
            return Ok(rc);
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}

/// open a file relative to an optional directory handle
///
/// creation uses mode 0777, masked by the process umask. the descriptor
/// is close-on-exec.
pub fn open_file(
    path: &Path,
    mode: OpenMode,
    flags: OpenFlags,
    base: Option<&Dir>,
) -> Result<File> {
    let c_path = cstring_path(path)?;
    let mut oflag = match mode {
        OpenMode::ReadOnly => libc::O_RDONLY,
        OpenMode::WriteOnly => libc::O_WRONLY,
        OpenMode::ReadWrite => libc::O_RDWR,
    };
    if flags.create {
        oflag |= libc::O_CREAT;
    }
    if flags.truncate {
        oflag |= libc::O_TRUNC;
    }
    if flags.directory {
        oflag |= libc::O_DIRECTORY;
    }
    oflag |= libc::O_CLOEXEC;

    let fd = retry_eintr(|| unsafe {
        libc::openat(base_fd(base), c_path.as_ptr(), oflag, 0o777 as libc::c_uint)
    })
    .with_path(path)?;
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// stat a path relative to an optional directory handle
pub fn stat_path(path: &Path, base: Option<&Dir>, follow_symlinks: bool) -> Result<FileInfo> {
    let c_path = cstring_path(path)?;
    let flags = if follow_symlinks {
        0
    } else {
        libc::AT_SYMLINK_NOFOLLOW
    };
    let mut st = std::mem::MaybeUninit::<libc::stat>::zeroed();
    retry_eintr(|| unsafe { libc::fstatat(base_fd(base), c_path.as_ptr(), st.as_mut_ptr(), flags) })
        .with_path(path)?;
    let st = unsafe { st.assume_init() };
    Ok(FileInfo {
        size: st.st_size as u64,
        kind: FileKind::from_mode(st.st_mode),
    })
}

/// whether a path names any filesystem object (symlinks are not followed)
pub fn path_exists(path: &Path, base: Option<&Dir>) -> bool {
    stat_path(path, base, false).is_ok()
}

/// read the literal target of a symlink
pub fn read_link(path: &Path, base: Option<&Dir>) -> Result<String> {
    let c_path = cstring_path(path)?;
    let mut buf = vec![0u8; 256];
    loop {
        let len = unsafe {
            libc::readlinkat(
                base_fd(base),
                c_path.as_ptr(),
                buf.as_mut_ptr() as *mut libc::c_char,
                buf.len(),
            )
        };
        if len < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(Error::Io {
                path: path.to_path_buf(),
                source: err,
            });
        }
        let len = len as usize;
        if len == buf.len() {
            // target may have been truncated
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        buf.truncate(len);
        return Ok(OsString::from_vec(buf).to_string_lossy().into_owned());
    }
}

/// rename a path, with each side resolved against its own optional base
pub fn rename(
    from: &Path,
    from_base: Option<&Dir>,
    to: &Path,
    to_base: Option<&Dir>,
) -> Result<()> {
    let c_from = cstring_path(from)?;
    let c_to = cstring_path(to)?;
    retry_eintr(|| unsafe {
        libc::renameat(
            base_fd(from_base),
            c_from.as_ptr(),
            base_fd(to_base),
            c_to.as_ptr(),
        )
    })
    .with_path(to)?;
    Ok(())
}

/// create a directory and all missing ancestors; existing ones are fine
pub fn make_directories(path: &Path, base: Option<&Dir>) -> Result<()> {
    let mut prefix = PathBuf::new();
    for component in path.components() {
        prefix.push(component);
        if matches!(component, Component::RootDir) {
            continue;
        }
        let c_path = cstring_path(&prefix)?;
        let rc = retry_eintr(|| unsafe {
            libc::mkdirat(base_fd(base), c_path.as_ptr(), 0o777 as libc::mode_t)
        });
        match rc {
            Ok(_) => {}
            Err(err) if err.raw_os_error() == Some(libc::EEXIST) => {}
            Err(source) => {
                return Err(Error::Io {
                    path: prefix,
                    source,
                })
            }
        }
    }
    Ok(())
}

/// create a symlink at `path` pointing at `target`
///
/// any pre-existing object at `path` is removed first, so repeated
/// installs over the same destination succeed.
pub fn make_symlink(path: &Path, target: &str, base: Option<&Dir>) -> Result<()> {
    if path_exists(path, base) {
        remove_path(path, base)?;
    }
    let c_path = cstring_path(path)?;
    let c_target = CString::new(target).map_err(|_| Error::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "symlink target contains a NUL byte",
        ),
    })?;
    retry_eintr(|| unsafe { libc::symlinkat(c_target.as_ptr(), base_fd(base), c_path.as_ptr()) })
        .with_path(path)?;
    Ok(())
}

/// remove a file, symlink, or directory tree
pub fn remove_path(path: &Path, base: Option<&Dir>) -> Result<()> {
    if stat_path(path, base, false)?.kind == FileKind::Directory {
        return remove_dir_recursive(path, base);
    }
    unlink_at(path, base, false)
}

fn unlink_at(path: &Path, base: Option<&Dir>, directory: bool) -> Result<()> {
    let c_path = cstring_path(path)?;
    let flags = if directory { libc::AT_REMOVEDIR } else { 0 };
    retry_eintr(|| unsafe { libc::unlinkat(base_fd(base), c_path.as_ptr(), flags) })
        .with_path(path)?;
    Ok(())
}

/// remove a directory and everything below it, descriptor-relative
pub fn remove_dir_recursive(path: &Path, base: Option<&Dir>) -> Result<()> {
    let dir = Dir::open(path, base)?;
    let mut stream = DirStream::new(&dir)?;
    while let Some(entry) = stream.next_entry() {
        let entry_path = Path::new(&entry.name);
        match entry.kind(&dir)? {
            FileKind::Directory => remove_dir_recursive(entry_path, Some(&dir))?,
            _ => unlink_at(entry_path, Some(&dir), false)?,
        }
    }
    drop(stream);
    drop(dir);
    unlink_at(path, base, true)
}

/// one directory entry yielded by [`DirStream`]
pub(crate) struct DirEntry {
    pub(crate) name: OsString,
    d_type: u8,
}

impl DirEntry {
    /// resolve the entry kind, falling back to lstat when d_type is unknown
    pub(crate) fn kind(&self, parent: &Dir) -> Result<FileKind> {
        Ok(match self.d_type {
            libc::DT_REG => FileKind::Regular,
            libc::DT_DIR => FileKind::Directory,
            libc::DT_LNK => FileKind::Symlink,
            libc::DT_UNKNOWN => stat_path(Path::new(&self.name), Some(parent), false)?.kind,
            _ => FileKind::Other,
        })
    }
}

/// readdir-style iteration over an open directory handle
///
/// reads through a duplicate of the handle's descriptor, so the handle
/// itself stays usable as a base for relative operations on the entries.
pub(crate) struct DirStream {
    stream: *mut libc::DIR,
}

impl DirStream {
    pub(crate) fn new(dir: &Dir) -> Result<DirStream> {
        let dup = dir.fd.try_clone().map_err(|source| Error::Io {
            path: dir.path.clone(),
            source,
        })?;
        let raw = dup.into_raw_fd();
        let stream = unsafe { libc::fdopendir(raw) };
        if stream.is_null() {
            let source = std::io::Error::last_os_error();
            unsafe { libc::close(raw) };
            return Err(Error::Io {
                path: dir.path.clone(),
                source,
            });
        }
        // the duplicated descriptor shares its read offset with the original
        unsafe { libc::rewinddir(stream) };
        Ok(DirStream { stream })
    }

    /// next entry, skipping `.` and `..`; None at end of directory
    pub(crate) fn next_entry(&mut self) -> Option<DirEntry> {
        loop {
            let entry = unsafe { libc::readdir(self.stream) };
            if entry.is_null() {
                return None;
            }
            let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) };
            let bytes = name.to_bytes();
            if bytes == b"." || bytes == b".." {
                continue;
            }
            let d_type = unsafe { (*entry).d_type };
            return Some(DirEntry {
                name: OsString::from_vec(bytes.to_vec()),
                d_type,
            });
        }
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        unsafe {
            libc::closedir(self.stream);
        }
    }
}
