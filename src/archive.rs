use std::{
    fs::{self, File},
    io::{self, BufReader, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;
use zip::{result::ZipError, write::FileOptions, CompressionMethod, ZipWriter};

use crate::{config::Visibility, resolve::Resolved};

const COPY_BUFFER: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub files: usize,
    pub skipped: usize,
}

/// A ZIP of one subtree, owned by the request that asked for it.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    start: PathBuf,
    prefix: String,
    visibility: Visibility,
}

impl ArchiveJob {
    /// Members are stored under the basename of the archived directory,
    /// or of `root` when the whole tree is archived.
    pub fn new(root: &Path, target: &Resolved, visibility: Visibility) -> Self {
        let prefix = if target.relative.is_root() {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            target.relative.basename().to_string()
        };
        Self {
            start: target.absolute.clone(),
            prefix,
            visibility,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Writes the archive into an anonymous temp file and rewinds it.
    /// Trades disk for memory so large trees never sit in RAM, while the
    /// final length is still known up front.
    pub fn spool(&self) -> Result<(File, u64, ArchiveStats), ArchiveError> {
        let (mut file, stats) = self.write_to(tempfile::tempfile()?)?;
        let len = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;
        Ok((file, len, stats))
    }

    /// Walks the subtree depth-first and deflates every visible file into
    /// `out`. Files that vanish or cannot be read are skipped; only failures
    /// writing to `out` abort the job.
    pub fn write_to<W: Write + Seek>(&self, out: W) -> Result<(W, ArchiveStats), ArchiveError> {
        let mut zip = ZipWriter::new(out);
        let mut stats = ArchiveStats::default();
        let mut buffer = vec![0; COPY_BUFFER];

        let walker = WalkDir::new(&self.start)
            .sort_by_file_name()
            .into_iter()
            // Pruning here keeps hidden directories from being descended into.
            .filter_entry(|e| e.depth() == 0 || self.visibility.admits(e.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path while archiving: {}", e);
                    continue;
                }
            };
            // A regular file or a link to one. The walk start itself is never a member.
            if entry.depth() == 0 || !entry.path().is_file() {
                continue;
            }

            let name = self.member_name(entry.path());
            let file = match File::open(entry.path()) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Skipping {} in archive: {}", entry.path().display(), e);
                    stats.skipped += 1;
                    continue;
                }
            };
            let large = fs::metadata(entry.path())
                .map(|m| m.len() >= u32::MAX as u64)
                .unwrap_or(false);
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(large);

            zip.start_file(name, options)?;
            if copy_member(BufReader::new(file), &mut zip, &mut buffer)? {
                stats.files += 1;
            } else {
                warn!("Read failed mid-copy, entry truncated: {}", entry.path().display());
                stats.skipped += 1;
            }
        }

        Ok((zip.finish()?, stats))
    }

    fn member_name(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.start).unwrap_or(path);
        let mut parts: Vec<String> = Vec::new();
        if !self.prefix.is_empty() {
            parts.push(self.prefix.clone());
        }
        parts.extend(rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()));
        parts.join("/")
    }
}

/// Copies `src` into `dst`. Returns `Ok(false)` when reading failed part way,
/// and an error only when writing did.
fn copy_member<R: Read, W: Write>(mut src: R, dst: &mut W, buffer: &mut [u8]) -> io::Result<bool> {
    loop {
        let read = match src.read(buffer) {
            Ok(0) => return Ok(true),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return Ok(false),
        };
        dst.write_all(&buffer[..read])?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::PathResolver;
    use std::io::Cursor;

    fn names(bytes: Vec<u8>) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn build(root: &Path, rel: &str, show_hidden: bool) -> (Vec<String>, ArchiveStats) {
        let resolved = PathResolver::new(root).resolve(rel).unwrap();
        let job = ArchiveJob::new(root, &resolved, Visibility::new(show_hidden));
        let (cursor, stats) = job.write_to(Cursor::new(Vec::new())).unwrap();
        (names(cursor.into_inner()), stats)
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("project/src")).unwrap();
        fs::create_dir_all(root.join("project/.git/objects")).unwrap();
        fs::write(root.join("project/a.txt"), "alpha").unwrap();
        fs::write(root.join("project/.secret"), "hush").unwrap();
        fs::write(root.join("project/src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("project/.git/objects/ab"), "blob").unwrap();
        dir
    }

    #[test]
    fn hidden_members_are_left_out() {
        let dir = fixture();
        let root = fs::canonicalize(dir.path()).unwrap();

        let (names, stats) = build(&root, "project", false);
        assert_eq!(names, ["project/a.txt", "project/src/main.rs"]);
        assert_eq!(stats, ArchiveStats { files: 2, skipped: 0 });
    }

    #[test]
    fn hidden_members_are_kept_when_shown() {
        let dir = fixture();
        let root = fs::canonicalize(dir.path()).unwrap();

        let (mut names, _) = build(&root, "project", true);
        names.sort();
        assert_eq!(
            names,
            [
                "project/.git/objects/ab",
                "project/.secret",
                "project/a.txt",
                "project/src/main.rs"
            ]
        );
    }

    #[test]
    fn whole_root_uses_root_basename() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join(".secret"), "s").unwrap();

        let base = root.file_name().unwrap().to_string_lossy().into_owned();
        let (names, _) = build(&root, "", false);
        assert_eq!(names, [format!("{}/a.txt", base)]);
    }

    #[test]
    fn missing_start_gives_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();

        let (names, stats) = build(&root, "does/not/exist", false);
        assert!(names.is_empty());
        assert_eq!(stats, ArchiveStats::default());
    }

    #[test]
    fn members_round_trip_their_content() {
        let dir = fixture();
        let root = fs::canonicalize(dir.path()).unwrap();
        let resolved = PathResolver::new(&root).resolve("project/src").unwrap();
        let job = ArchiveJob::new(&root, &resolved, Visibility::new(false));
        assert_eq!(job.prefix(), "src");

        let (mut file, len, stats) = job.spool().unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(len, file.metadata().unwrap().len());

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut member = archive.by_name("src/main.rs").unwrap();
        let mut content = String::new();
        member.read_to_string(&mut content).unwrap();
        assert_eq!(content, "fn main() {}");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_files_are_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir(root.join("box")).unwrap();
        fs::write(root.join("box/ok.txt"), "ok").unwrap();
        let locked = root.join("box/locked.txt");
        fs::write(&locked, "no").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read anything; only assert the skip when the lock holds.
        let locked_out = File::open(&locked).is_err();
        let (names, stats) = build(&root, "box", false);
        if locked_out {
            assert_eq!(names, ["box/ok.txt"]);
            assert_eq!(stats.skipped, 1);
        } else {
            assert_eq!(names.len(), 2);
        }
    }
}
