use std::{fs, io, path::Path};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};

/// Extensions previewed as UTF-8 text. Files without an extension are text too.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "py", "js", "html", "css", "json", "xml", "md", "yml", "yaml", "sh", "bash", "conf",
    "cfg", "ini", "log", "sql", "csv", "env", "java", "c", "cpp", "h", "hpp", "go", "rb", "php",
    "rs", "kt", "toml", "gitignore",
];

/// Extensions embedded inline as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedKind {
    Pdf,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    Text,
    Image { mime: String },
    Unsupported { kind: UnsupportedKind },
}

/// What the preview page shows for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Text(String),
    Image { mime: String, base64: String },
    /// A text candidate whose bytes are not valid UTF-8.
    Undecodable,
    Unsupported(UnsupportedKind),
}

pub fn classify(file_name: &str) -> RenderMode {
    let ext = match Path::new(file_name).extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => return RenderMode::Text,
    };

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        RenderMode::Text
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        let mime = mime_guess::from_ext(&ext).first_or_octet_stream().to_string();
        RenderMode::Image { mime }
    } else if ext == "pdf" {
        RenderMode::Unsupported {
            kind: UnsupportedKind::Pdf,
        }
    } else {
        RenderMode::Unsupported {
            kind: UnsupportedKind::Binary,
        }
    }
}

/// Reads what `mode` needs from `path`. Unsupported files are never opened.
pub fn load_preview(path: &Path, mode: RenderMode) -> io::Result<Preview> {
    Ok(match mode {
        RenderMode::Text => match String::from_utf8(fs::read(path)?) {
            Ok(text) => Preview::Text(text),
            Err(_) => Preview::Undecodable,
        },
        RenderMode::Image { mime } => Preview::Image {
            mime,
            base64: BASE64_STANDARD.encode(fs::read(path)?),
        },
        RenderMode::Unsupported { kind } => Preview::Unsupported(kind),
    })
}
