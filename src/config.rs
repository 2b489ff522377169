use std::{
    ffi::OsStr,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

/// Names starting with this character are hidden.
pub const HIDDEN_MARKER: char = '.';

/// Whether hidden entries are shown. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    show_hidden: bool,
}

impl Visibility {
    pub fn new(show_hidden: bool) -> Self {
        Self { show_hidden }
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    /// Returns true if an entry with this name may be listed or archived.
    pub fn admits(&self, name: &OsStr) -> bool {
        self.show_hidden || !name.to_string_lossy().starts_with(HIDDEN_MARKER)
    }
}

/// Process-wide serving configuration, built once in `main` and shared
/// read-only with every handler.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    root: PathBuf,
    visibility: Visibility,
}

impl ServeConfig {
    /// Canonicalizes `root` and checks that it is a directory.
    pub fn new(root: impl AsRef<Path>, show_hidden: bool) -> io::Result<Self> {
        let root = std::fs::canonicalize(root.as_ref())?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a directory", root.display()),
            ));
        }
        Ok(Self {
            root,
            visibility: Visibility::new(show_hidden),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }
}

/// Asks whether hidden files should be shown. Anything but `y`/`yes` means no,
/// including EOF.
pub fn prompt_show_hidden<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<bool> {
    write!(output, "Show hidden files (files starting with .)? [y/N]: ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
