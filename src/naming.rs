//! Naming conventions for sizes, pages, and bundles.
//!
//! Every size is addressed by a `WxH` label (`300x250`, `728x90`). The label is
//! the default size id, the per-size stylesheet name, the bundle directory name,
//! and part of the zip filename. Keeping the formatting here means the renderer
//! and the packager can never disagree about a path.
//!
//! ## Paths
//!
//! - `banner/<banner-id>/<size-id>.html`: rendered page inside the build output
//! - `styles/sizes/<WxH>.css`: per-size stylesheet
//! - `<banner-id>/<WxH>/`: bundle directory inside the package output
//! - `<banner-id>/<banner-id>-<WxH>.zip`: bundle archive

/// Result of parsing a `WxH` size label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedSize {
    pub width: u32,
    pub height: u32,
}

/// Format a size label: `(300, 250)` → `"300x250"`.
pub fn size_label(width: u32, height: u32) -> String {
    format!("{width}x{height}")
}

/// Parse a size label.
///
/// - `"300x250"` → Some(300, 250)
/// - `"728X90"` → Some(728, 90)  (case-insensitive separator)
/// - `"300x"`, `"x250"`, `"leaderboard"` → None
/// - `"0x250"` → None  (zero dimensions are not sizes)
pub fn parse_size_label(label: &str) -> Option<ParsedSize> {
    let (w, h) = label.split_once(['x', 'X'])?;
    let width = w.trim().parse::<u32>().ok()?;
    let height = h.trim().parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(ParsedSize { width, height })
}

/// Relative path of a rendered page inside the build output.
pub fn page_path(banner_id: &str, size_id: &str) -> String {
    format!("banner/{banner_id}/{size_id}.html")
}

/// Relative path of a per-size stylesheet inside the build output.
pub fn size_stylesheet_path(width: u32, height: u32) -> String {
    format!("styles/sizes/{}.css", size_label(width, height))
}

/// Zip filename for one bundle.
pub fn bundle_zip_name(banner_id: &str, width: u32, height: u32) -> String {
    format!("{banner_id}-{}.zip", size_label(width, height))
}

/// Container element id for a banner page. Only `[a-z0-9-]` survive.
pub fn container_id(banner_id: &str, size_id: &str) -> String {
    let raw = format!("banner-{banner_id}-{size_id}");
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}
