//! HTML documents for the three page kinds. Everything here is a pure
//! function of its arguments.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::{
    classify::{Preview, UnsupportedKind},
    listing::Entry,
    resolve::RelPath,
};

const STYLE: &str = "\
*{margin:0;padding:0;box-sizing:border-box}\
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Helvetica,Arial,sans-serif;background:#0d1117;color:#c9d1d9;padding:24px}\
a{color:#58a6ff;text-decoration:none}a:hover{text-decoration:underline}\
.container{max-width:1400px;margin:0 auto}\
.header,.table-box,.content{background:#161b22;border:1px solid #30363d;border-radius:8px;margin-bottom:24px}\
.header{padding:20px 24px}.content{padding:20px;overflow:auto}\
.breadcrumb{font-size:15px;margin-bottom:16px;color:#8b949e}\
.btn-zip{display:inline-block;padding:8px 16px;background:#238636;color:#fff;border-radius:6px}\
table{width:100%;border-collapse:collapse}\
th{background:#0d1117;color:#8b949e;text-align:left;padding:12px 20px;border-bottom:1px solid #30363d}\
td{padding:12px 20px;border-bottom:1px solid #21262d}\
.icon{width:40px;text-align:center}.file-size,.file-actions{text-align:right;color:#8b949e;white-space:nowrap}\
.btn-dl{margin-left:12px;padding:5px 12px;background:rgba(110,118,129,0.15);color:#c9d1d9;border-radius:4px}\
.actions a{margin-right:16px}\
.code{font-family:monospace;white-space:pre-wrap;word-wrap:break-word;line-height:1.6}\
img{max-width:100%;height:auto;display:block}";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Human-readable size with binary steps and one decimal, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} PB", value)
}

/// Percent-encodes each segment, keeping `/` separators literal.
pub fn encode_path(rel: &RelPath) -> String {
    rel.segments()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn browse_url(rel: &RelPath) -> String {
    if rel.is_root() {
        "/".to_string()
    } else {
        format!("/browse/{}", encode_path(rel))
    }
}

pub fn view_url(rel: &RelPath) -> String {
    format!("/view/{}", encode_path(rel))
}

pub fn download_url(rel: &RelPath) -> String {
    format!("/download/{}", encode_path(rel))
}

pub fn download_all_url(rel: &RelPath) -> String {
    if rel.is_root() {
        "/download-all".to_string()
    } else {
        format!("/download-all/{}", encode_path(rel))
    }
}

fn page(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width,initial-scale=1";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                div class="container" { (body) }
            }
        }
    }
}

/// Cumulative `(segment, browse url)` pairs from the root down to `rel`.
fn crumbs(rel: &RelPath) -> Vec<(String, String)> {
    let mut current = RelPath::root();
    rel.segments()
        .map(|segment| {
            current = current.join(segment);
            (segment.to_string(), browse_url(&current))
        })
        .collect()
}

pub fn directory_page(rel: &RelPath, entries: &[Entry]) -> Markup {
    let title = if rel.is_root() { "Root" } else { rel.as_str() };

    page(
        title,
        html! {
            div class="header" {
                div class="breadcrumb" {
                    @if rel.is_root() {
                        "Home"
                    } @else {
                        a href="/" { "Home" }
                        @for (name, url) in crumbs(rel) {
                            " / "
                            a href=(url) { (name) }
                        }
                    }
                }
                @if !entries.is_empty() {
                    a class="btn-zip" href=(download_all_url(rel)) { "Download ZIP" }
                }
            }
            div class="table-box" {
                table {
                    thead {
                        tr {
                            th class="icon" {}
                            th class="file-name" { "File Name" }
                            th class="file-size" { "File Size" }
                            th class="file-actions" { "Last Modified" }
                        }
                    }
                    tbody {
                        @if let Some(parent) = rel.parent() {
                            tr {
                                td colspan="4" {
                                    a class="parent-link" href=(browse_url(&parent)) { ".." }
                                }
                            }
                        }
                        @for entry in entries {
                            (entry_row(rel, entry))
                        }
                    }
                }
            }
        },
    )
}

fn entry_row(dir: &RelPath, entry: &Entry) -> Markup {
    let rel = dir.join(&entry.name);
    let modified = entry.modified.format(TIME_FORMAT).to_string();

    html! {
        tr {
            @if entry.is_dir {
                td class="icon" { "📁" }
                td class="file-name" { a href=(browse_url(&rel)) { (entry.name) } }
                td class="file-size" { "—" }
                td class="file-actions" { span class="date" { (modified) } }
            } @else {
                td class="icon" { "📄" }
                td class="file-name" { a href=(view_url(&rel)) { (entry.name) } }
                td class="file-size" { (format_size(entry.size)) }
                td class="file-actions" {
                    span class="date" { (modified) }
                    a class="btn-dl" href=(download_url(&rel)) { "Download" }
                }
            }
        }
    }
}

pub fn file_page(rel: &RelPath, preview: &Preview) -> Markup {
    let filename = rel.basename();
    let back = browse_url(&rel.parent().unwrap_or_default());

    page(
        filename,
        html! {
            div class="header" {
                h2 { (filename) }
                div class="actions" {
                    a href=(back) { "Back" }
                    a href=(download_url(rel)) { "Download" }
                }
            }
            div class="content" {
                @match preview {
                    Preview::Text(text) => pre class="code" { (text) },
                    Preview::Image { mime, base64 } => {
                        img alt=(filename) src=(format!("data:{};base64,{}", mime, base64));
                    },
                    Preview::Undecodable => p { "Cannot display file" },
                    Preview::Unsupported(UnsupportedKind::Pdf) => p { "PDF - Please download" },
                    Preview::Unsupported(UnsupportedKind::Binary) => p { "Binary file - Please download" },
                }
            }
        },
    )
}

pub fn error_page(message: &str) -> Markup {
    page(
        "Error",
        html! {
            div class="header" {
                h2 { "Error: " (message) }
                br;
                a href="/" { "Go back" }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn entry(name: &str, is_dir: bool, size: u64) -> Entry {
        Entry {
            name: name.to_string(),
            is_dir,
            size,
            modified: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
        }
    }

    fn rel(s: &str) -> RelPath {
        s.split('/')
            .filter(|s| !s.is_empty())
            .fold(RelPath::root(), |acc, seg| acc.join(seg))
    }

    #[test]
    fn sizes_use_binary_steps() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500.0 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(1024u64.pow(5)), "1.0 PB");
        assert_eq!(format_size(3 * 1024u64.pow(5)), "3.0 PB");
    }

    #[test]
    fn urls_encode_segments_not_separators() {
        let r = rel("my docs/a&b.txt");
        assert_eq!(view_url(&r), "/view/my%20docs/a%26b.txt");
        assert_eq!(browse_url(&RelPath::root()), "/");
        assert_eq!(download_all_url(&RelPath::root()), "/download-all");
    }

    #[test]
    fn listing_rows_and_breadcrumbs() {
        let html = directory_page(
            &rel("docs/2024"),
            &[entry("drafts", true, 0), entry("plan.txt", false, 1536)],
        )
        .into_string();

        assert!(html.contains(r#"<a href="/">Home</a> / <a href="/browse/docs">docs</a> / <a href="/browse/docs/2024">2024</a>"#));
        assert!(html.contains(r#"<a class="parent-link" href="/browse/docs">..</a>"#));
        assert!(html.contains(r#"<a href="/browse/docs/2024/drafts">drafts</a>"#));
        assert!(html.contains(r#"<td class="file-size">—</td>"#));
        assert!(html.contains(r#"<a href="/view/docs/2024/plan.txt">plan.txt</a>"#));
        assert!(html.contains(r#"<td class="file-size">1.5 KB</td>"#));
        assert!(html.contains(r#"href="/download/docs/2024/plan.txt""#));
        assert!(html.contains("2024-03-09 14:05"));
        assert!(html.contains(r#"href="/download-all/docs/2024""#));
    }

    #[test]
    fn root_listing_has_no_parent_link() {
        let html = directory_page(&RelPath::root(), &[entry("a.txt", false, 1)]).into_string();
        assert!(html.contains(r#"<div class="breadcrumb">Home</div>"#));
        assert!(!html.contains("parent-link"));
        assert!(html.contains("<title>Root</title>"));
    }

    #[test]
    fn empty_directory_offers_no_zip() {
        let html = directory_page(&rel("empty"), &[]).into_string();
        assert!(!html.contains("Download ZIP"));

        let html = directory_page(&rel("full"), &[entry("x", false, 1)]).into_string();
        assert!(html.contains("Download ZIP"));
    }

    #[test]
    fn text_preview_is_escaped() {
        let preview = Preview::Text("if a < b && c > d {}".to_string());
        let html = file_page(&rel("src/cmp.rs"), &preview).into_string();

        assert!(html.contains(r#"<pre class="code">if a &lt; b &amp;&amp; c &gt; d {}</pre>"#));
        assert!(html.contains("<title>cmp.rs</title>"));
        assert!(html.contains(r#"<a href="/browse/src">Back</a>"#));
        assert!(html.contains(r#"<a href="/download/src/cmp.rs">Download</a>"#));
    }

    #[test]
    fn other_previews() {
        let r = rel("x");
        let html = file_page(&r, &Preview::Unsupported(UnsupportedKind::Binary)).into_string();
        assert!(html.contains("Binary file - Please download"));
        let html = file_page(&r, &Preview::Unsupported(UnsupportedKind::Pdf)).into_string();
        assert!(html.contains("PDF - Please download"));
        let html = file_page(&r, &Preview::Undecodable).into_string();
        assert!(html.contains("Cannot display file"));

        let image = Preview::Image {
            mime: "image/png".to_string(),
            base64: "cG5nIQ==".to_string(),
        };
        let html = file_page(&r, &image).into_string();
        assert!(html.contains(r#"src="data:image/png;base64,cG5nIQ==""#));
        assert!(html.contains(r#"<a href="/">Back</a>"#));
    }

    #[test]
    fn error_page_links_home() {
        let html = error_page("Access Denied").into_string();
        assert!(html.contains("Error: Access Denied"));
        assert!(html.contains(r#"<a href="/">Go back</a>"#));
    }
}
