// archive.rs — Release archive extraction.
//
// A release archive is a gzip-compressed tarball (one or more gzip members)
// whose first entry is the release's root directory. The tar stream is read
// straight out of the decoder and every entry is extracted below a
// destination directory: directories are created when missing, regular
// files are (over)written with mode 0755. Other entry kinds are skipped.
//
// A root entry of `./` makes the destination itself the root.

use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use flate2::read::MultiGzDecoder;
use tar::Archive;

use crate::error::{ArchiveError, InstallError};

/// Permission bits given to every extracted file.
pub const RELEASE_FILE_MODE: u32 = 0o755;

/// Extract a release archive into `dest` and return the path of its root
/// directory (`dest` itself for a `./`-rooted archive).
pub fn unpack_release(reader: impl Read, dest: &Path) -> Result<PathBuf, InstallError> {
    tracing::debug!(dest = %dest.display(), "extracting release archive");

    let stream = GzipStream::new(reader);
    let gzip_failed = stream.failed.clone();
    let read_error = |source: io::Error| -> InstallError {
        if gzip_failed.get() {
            InstallError::Decompress(source)
        } else {
            ArchiveError::Read(source).into()
        }
    };

    let mut archive = Archive::new(stream);
    let entries = archive.entries().map_err(read_error)?;

    let mut root: Option<PathBuf> = None;
    for entry in entries {
        let mut entry = entry.map_err(read_error)?;
        let name = entry.path().map_err(ArchiveError::Read)?.into_owned();
        let relative = checked_relative(&name)?;
        let kind = entry.header().entry_type();

        if root.is_none() {
            if !kind.is_dir() {
                return Err(ArchiveError::NotAFolder.into());
            }
            root = Some(if relative.as_os_str().is_empty() {
                dest.to_path_buf()
            } else {
                dest.join(&relative)
            });
        }

        let target = dest.join(&relative);
        if kind.is_dir() {
            if relative.as_os_str().is_empty() {
                set_release_mode(dest).map_err(|source| InstallError::IoError {
                    path: dest.to_path_buf(),
                    source,
                })?;
            } else {
                create_dir(&target)?;
            }
        } else if kind.is_file() && !relative.as_os_str().is_empty() {
            write_file(&mut entry, &target).map_err(|err| match err {
                InstallError::IoError { source, .. } if gzip_failed.get() => {
                    InstallError::Decompress(source)
                }
                other => other,
            })?;
        } else {
            tracing::debug!(
                entry = %name.display(),
                kind = ?kind,
                "skipping unsupported archive entry"
            );
        }
    }

    root.ok_or_else(|| ArchiveError::Empty.into())
}

/// Gzip decoder that remembers whether it ever failed, so read errors
/// surfacing through the tar reader can be told apart from bad tar data.
struct GzipStream<R> {
    inner: MultiGzDecoder<R>,
    failed: Rc<Cell<bool>>,
}

impl<R: Read> GzipStream<R> {
    fn new(reader: R) -> Self {
        Self {
            inner: MultiGzDecoder::new(reader),
            failed: Rc::new(Cell::new(false)),
        }
    }
}

impl<R: Read> Read for GzipStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|_| self.failed.set(true))
    }
}

/// Normalize an entry path, refusing anything that leaves the destination.
///
/// `.` components are dropped, so `./` normalizes to an empty path.
fn checked_relative(name: &Path) -> Result<PathBuf, ArchiveError> {
    let mut relative = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::UnsafePath {
                    path: name.display().to_string(),
                })
            }
        }
    }
    Ok(relative)
}

fn create_dir(path: &Path) -> Result<(), InstallError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| InstallError::IoError {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(content: &mut impl Read, path: &Path) -> Result<(), InstallError> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }

    let io_error = |source: io::Error| InstallError::IoError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).map_err(io_error)?;
    io::copy(content, &mut file).map_err(io_error)?;
    set_release_mode(path).map_err(io_error)
}

#[cfg(unix)]
fn set_release_mode(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(RELEASE_FILE_MODE))
}

#[cfg(not(unix))]
fn set_release_mode(_path: &Path) -> io::Result<()> {
    Ok(())
}
