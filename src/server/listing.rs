//! Directory listing page
//!
//! The page only carries subdirectory links. File entries are fetched by the
//! embedded script from `/api/list_directory`, filtered against the media
//! extension table and rendered lazily as thumbnails, video or audio players.

use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::media::EXTENSIONS_JSON;

const PAGE_TEMPLATE: &str = include_str!("../../assets/gallery.html");
const PAGE_STYLE: &str = include_str!("../../assets/gallery.css");
const PAGE_SCRIPT: &str = include_str!("../../assets/gallery.js");

/// Characters left as-is in link targets (same set Python's `quote` keeps)
const LINK_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// One subdirectory link on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirLink {
    pub name: String,
    pub is_symlink: bool,
}

impl DirLink {
    pub fn parent() -> Self {
        Self { name: "..".to_string(), is_symlink: false }
    }

    /// Percent-encoded href with trailing slash
    pub fn href(&self) -> String {
        format!("{}/", utf8_percent_encode(&self.name, LINK_ENCODE_SET))
    }

    /// `name/`, or `name@` for symlinks
    pub fn label(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else {
            format!("{}/", self.name)
        }
    }
}

/// Visible subdirectories of `dir`, sorted case-insensitively. Dot-names are hidden.
pub fn subdirectories(dir: &Path) -> std::io::Result<Vec<DirLink>> {
    let mut links = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        // is_dir follows symlinks, file_type doesn't
        if !entry.path().is_dir() {
            continue;
        }
        links.push(DirLink {
            name,
            is_symlink: entry.file_type()?.is_symlink(),
        });
    }
    links.sort_by_key(|l| l.name.to_lowercase());
    Ok(links)
}

/// Render the page for `display_path` (the decoded request path)
pub fn render_page(display_path: &str, dirs: &[DirLink]) -> String {
    let title = escape_html(display_path);
    let items: String = std::iter::once(DirLink::parent())
        .chain(dirs.iter().cloned())
        .map(|d| format!("<li class=\"dir\"><a href=\"{}\">{}</a></li>\n", d.href(), escape_html(&d.label())))
        .collect();

    fill_template(
        PAGE_TEMPLATE,
        &[
            ("style", PAGE_STYLE),
            ("media_extensions", EXTENSIONS_JSON.as_str()),
            ("script", PAGE_SCRIPT),
            ("title", title.as_str()),
            ("dirs", items.as_str()),
        ],
    )
}

/// Substitute `{{name}}` placeholders in one pass. Inserted text is never rescanned.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let known = after.find("}}").and_then(|end| {
            values
                .iter()
                .find(|(key, _)| *key == &after[..end])
                .map(|(_, value)| (end, *value))
        });
        match known {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape `&`, `<` and `>` for text content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
        assert_eq!(escape_html("plain \"quoted\""), "plain \"quoted\"");
    }

    #[test]
    fn test_dir_link_encoding() {
        let link = DirLink { name: "my photos #1".to_string(), is_symlink: false };
        assert_eq!(link.href(), "my%20photos%20%231/");
        assert_eq!(link.label(), "my photos #1/");

        let link = DirLink { name: "linked".to_string(), is_symlink: true };
        assert_eq!(link.label(), "linked@");
        assert_eq!(link.href(), "linked/");
    }

    /// Test: Only directories, sorted ignoring case
    /// Validates: Files are left to the client script
    #[test]
    fn test_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["beta", "Alpha", "gamma"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("aaa.png"), b"").unwrap();

        let names: Vec<String> = subdirectories(dir.path()).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["Alpha", "beta", "gamma"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_dir_marked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let links = subdirectories(dir.path()).unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().any(|d| d.name == "link" && d.is_symlink));
        assert!(links.iter().any(|d| d.name == "real" && !d.is_symlink));
    }

    /// Test: Rendered page content
    /// Validates: Escaped title, parent link first, extension table embedded
    #[test]
    fn test_render_page() {
        let dirs = vec![DirLink { name: "sub".to_string(), is_symlink: false }];
        let html = render_page("/a<b>/", &dirs);

        assert!(html.contains("<title>Directory listing for /a&lt;b&gt;/</title>"));
        let parent = html.find("href=\"../\"").unwrap();
        let sub = html.find("href=\"sub/\"").unwrap();
        assert!(parent < sub);
        assert!(html.contains("\"tiff\":\"IMAGE\""));
        assert!(html.contains("apiUrl(\"list_directory\""));
        assert!(html.contains("\"/api/\" + method"));
        assert!(!html.contains("{{"));
    }

    /// Test: Placeholder text inside the request path
    /// Validates: Title is inserted verbatim, the link list appears once
    #[test]
    fn test_render_page_placeholder_in_path() {
        let dirs = vec![DirLink { name: "sub".to_string(), is_symlink: false }];
        let html = render_page("/{{dirs}}/", &dirs);

        assert!(html.contains("<title>Directory listing for /{{dirs}}/</title>"));
        assert_eq!(html.matches("href=\"sub/\"").count(), 1);
    }

    #[test]
    fn test_fill_template() {
        let filled = fill_template("{{a}}-{{b}}-{{c}}-{{", &[("a", "{{b}}"), ("b", "2")]);
        assert_eq!(filled, "{{b}}-2-{{c}}-{{");
    }

    #[test]
    fn test_hidden_dirs_skipped() {
        let dir = tempfile::tempdir().unwrap();
        for name in [".git", ".cache", "photos"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }

        let names: Vec<String> = subdirectories(dir.path()).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["photos"]);
    }
}
