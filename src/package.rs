//! Bundle packaging for ad-network upload.
//!
//! Final stage of the pipeline. Every (banner, size) page in the cleaned build
//! output becomes a self-contained directory and a zip:
//!
//! ```text
//! packaged-banners/
//! └── summer-sale/
//!     ├── 300x250/
//!     │   ├── index.html          # Page with bundle-relative references
//!     │   ├── styles.css          # banner-base.css + sizes/300x250.css
//!     │   ├── animation.js        # The banner runtime
//!     │   ├── images/logo.png     # Only assets the page references
//!     │   └── banner-info.json    # Manifest
//!     └── summer-sale-300x250.zip
//! ```
//!
//! ## Referenced Assets
//!
//! A bundle carries exactly the images its page uses, found in `<img src>`,
//! `srcset`, inline `style="…url(…)"` and `url(…)` inside `<style>` blocks.
//! Only paths under `/images/` are bundled. Declared assets the page never
//! references stay out. A referenced asset that cannot be found is a warning;
//! the bundle ships without it.
//!
//! Progress is reported as [`PackageEvent`]s over an optional channel so the
//! CLI can print while packaging runs.

use crate::load::Project;
use crate::naming;
use crate::render::{BASE_CSS_PATH, RUNTIME_JS_PATH};
use crate::types::{Banner, BannerSize};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::LazyLock;
use thiserror::Error;
use zip::CompressionMethod;
use zip::write::FileOptions;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Build output not found: {0} (run `build` first)")]
    MissingOutput(PathBuf),
    #[error("Refusing to clear package directory {0}: it contains the project")]
    UnsafeOutput(PathBuf),
}

pub const MANIFEST_FILE: &str = "banner-info.json";
const IMAGE_PREFIX: &str = "/images/";

/// Progress events for CLI output.
#[derive(Debug, Clone)]
pub enum PackageEvent {
    BannerStarted {
        banner_id: String,
        name: String,
        sizes: usize,
    },
    /// The rendered page for a size does not exist; the size was skipped.
    PageMissing {
        banner_id: String,
        size_id: String,
        path: String,
    },
    BundleWritten(BundleSummary),
}

/// One finished bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSummary {
    pub banner_id: String,
    pub label: String,
    pub dir: PathBuf,
    pub files: Vec<String>,
    pub total_bytes: u64,
    pub zip: Option<PathBuf>,
    pub zip_bytes: Option<u64>,
    pub missing_assets: Vec<String>,
    pub over_budget: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PackageReport {
    pub bundles: Vec<BundleSummary>,
    pub skipped: usize,
}

/// Contents of `banner-info.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub campaign: String,
    pub banner_id: String,
    pub size: String,
    pub size_id: String,
    pub width: u32,
    pub height: u32,
    pub clickthrough: String,
    pub files: Vec<String>,
    pub total_bytes: u64,
    /// Hex SHA-256 of every file above, for upload verification.
    pub sha256: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_assets: Vec<String>,
}

fn send(events: &Option<Sender<PackageEvent>>, event: PackageEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Package every page under `dist` into `package_dir`, which is cleared first.
pub fn package(
    project: &Project,
    dist: &Path,
    package_dir: &Path,
    events: Option<Sender<PackageEvent>>,
) -> Result<PackageReport, PackageError> {
    if !dist.is_dir() {
        return Err(PackageError::MissingOutput(dist.to_path_buf()));
    }
    if package_dir.exists() {
        if project.root.canonicalize()?.starts_with(package_dir.canonicalize()?) {
            return Err(PackageError::UnsafeOutput(package_dir.to_path_buf()));
        }
        fs::remove_dir_all(package_dir)?;
    }
    fs::create_dir_all(package_dir)?;

    let mut report = PackageReport::default();
    for banner in &project.data.banners {
        send(
            &events,
            PackageEvent::BannerStarted {
                banner_id: banner.id.clone(),
                name: banner.name.clone(),
                sizes: banner.sizes.len(),
            },
        );
        for size in &banner.sizes {
            let page_rel = naming::page_path(&banner.id, &size.id());
            let page = dist.join(&page_rel);
            if !page.is_file() {
                tracing::warn!(page = %page_rel, "rendered page missing, skipping size");
                send(
                    &events,
                    PackageEvent::PageMissing {
                        banner_id: banner.id.clone(),
                        size_id: size.id(),
                        path: page_rel,
                    },
                );
                report.skipped += 1;
                continue;
            }
            let summary = package_size(project, banner, size, dist, &page, package_dir)?;
            send(&events, PackageEvent::BundleWritten(summary.clone()));
            report.bundles.push(summary);
        }
    }
    Ok(report)
}

fn package_size(
    project: &Project,
    banner: &Banner,
    size: &BannerSize,
    dist: &Path,
    page: &Path,
    package_dir: &Path,
) -> Result<BundleSummary, PackageError> {
    let label = size.label();
    let banner_dir = package_dir.join(&banner.id);
    let bundle_dir = banner_dir.join(&label);
    fs::create_dir_all(&bundle_dir)?;

    let html = fs::read_to_string(page)?;
    let mut files = Vec::new();

    fs::write(bundle_dir.join("index.html"), rewrite_references(&html))?;
    files.push("index.html".to_string());

    let mut css = read_shared(dist, BASE_CSS_PATH)?;
    let size_css = read_shared(dist, &naming::size_stylesheet_path(size.width, size.height))?;
    if !css.is_empty() && !size_css.is_empty() {
        css.push('\n');
    }
    css.push_str(&size_css);
    fs::write(bundle_dir.join("styles.css"), css)?;
    files.push("styles.css".to_string());

    fs::write(
        bundle_dir.join("animation.js"),
        read_shared(dist, RUNTIME_JS_PATH)?,
    )?;
    files.push("animation.js".to_string());

    let public = project.public_dir();
    let mut missing_assets = Vec::new();
    for asset in referenced_assets(&html) {
        let rel = asset.trim_start_matches('/');
        let source = [dist.join(rel), public.join(rel)]
            .into_iter()
            .find(|p| p.is_file());
        let Some(source) = source else {
            tracing::warn!(banner = %banner.id, size = %label, asset = %asset, "referenced asset not found");
            missing_assets.push(asset);
            continue;
        };
        let dest = bundle_dir.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &dest)?;
        files.push(rel.to_string());
    }

    let mut total_bytes = 0;
    let mut sha256 = BTreeMap::new();
    for file in &files {
        let bytes = fs::read(bundle_dir.join(file))?;
        total_bytes += bytes.len() as u64;
        sha256.insert(file.clone(), format!("{:x}", Sha256::digest(&bytes)));
    }

    let manifest = BundleManifest {
        campaign: banner.name.clone(),
        banner_id: banner.id.clone(),
        size: label.clone(),
        size_id: size.id(),
        width: size.width,
        height: size.height,
        clickthrough: banner.clickthrough.clone(),
        files: files.clone(),
        total_bytes,
        sha256,
        missing_assets: missing_assets.clone(),
    };
    fs::write(
        bundle_dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest)?,
    )?;
    files.push(MANIFEST_FILE.to_string());

    let config = &project.config.package;
    let (zip, zip_bytes, over_budget) = if config.zip {
        let zip_path = banner_dir.join(naming::bundle_zip_name(&banner.id, size.width, size.height));
        let bytes = write_zip(&bundle_dir, &files, &zip_path)?;
        let over = bytes > config.max_bundle_kb.saturating_mul(1024);
        if over {
            tracing::warn!(
                zip = %zip_path.display(),
                kb = bytes / 1024,
                limit_kb = config.max_bundle_kb,
                "bundle exceeds size limit"
            );
        }
        (Some(zip_path), Some(bytes), over)
    } else {
        (None, None, false)
    };

    Ok(BundleSummary {
        banner_id: banner.id.clone(),
        label,
        dir: bundle_dir,
        files,
        total_bytes,
        zip,
        zip_bytes,
        missing_assets,
        over_budget,
    })
}

/// Read a shared build file. A missing one is a warning and an empty file.
fn read_shared(dist: &Path, rel: &str) -> Result<String, PackageError> {
    let path = dist.join(rel);
    if !path.is_file() {
        tracing::warn!(file = %rel, "shared build file missing");
        return Ok(String::new());
    }
    Ok(fs::read_to_string(path)?)
}

/// Zip `files` (relative to `dir`) into `zip_path`. Returns the archive size.
fn write_zip(dir: &Path, files: &[String], zip_path: &Path) -> Result<u64, PackageError> {
    let file = fs::File::create(zip_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    for name in files {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&fs::read(dir.join(name))?)?;
    }
    zip.finish()?;
    Ok(fs::metadata(zip_path)?.len())
}

// ============================================================================
// Reference extraction and rewriting
// ============================================================================

static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).expect("valid pattern"));
static SRCSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\ssrcset\s*=\s*["']([^"']+)["']"#).expect("valid pattern"));
static STYLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sstyle\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid pattern"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").expect("valid pattern"));
static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).expect("valid pattern"));
static SIZE_STYLESHEET_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[ \t]*<link\b[^>]*href\s*=\s*["']/styles/sizes/[^"']*["'][^>]*>\n?"#).expect("valid pattern")
});
static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(["'(\s,])/images/"#).expect("valid pattern"));

/// Image paths under `/images/` the page uses, sorted and deduplicated.
/// Query strings and fragments are dropped. References that climb out of
/// `/images/` are skipped with a warning.
pub fn referenced_assets(html: &str) -> BTreeSet<String> {
    let mut refs: Vec<String> = Vec::new();

    refs.extend(IMG_SRC.captures_iter(html).map(|c| c[1].to_string()));
    for caps in SRCSET.captures_iter(html) {
        refs.extend(
            caps[1]
                .split(',')
                .filter_map(|candidate| candidate.split_whitespace().next())
                .map(str::to_string),
        );
    }
    for caps in STYLE_ATTR.captures_iter(html) {
        let decl = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or(String::new(), |m| {
                m.as_str().replace("&quot;", "\"").replace("&#39;", "'")
            });
        refs.extend(CSS_URL.captures_iter(&decl).map(|c| c[1].to_string()));
    }
    for caps in STYLE_BLOCK.captures_iter(html) {
        refs.extend(CSS_URL.captures_iter(&caps[1]).map(|c| c[1].to_string()));
    }

    refs.into_iter()
        .map(|r| {
            r.split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string()
        })
        .filter(|r| r.starts_with(IMAGE_PREFIX) && r.len() > IMAGE_PREFIX.len())
        .filter(|r| {
            let contained = stays_inside_images(r);
            if !contained {
                tracing::warn!(reference = %r, "skipping asset reference outside /images/");
            }
            contained
        })
        .collect()
}

fn stays_inside_images(reference: &str) -> bool {
    !reference.contains('\\')
        && reference[IMAGE_PREFIX.len()..]
            .split('/')
            .all(|segment| segment != ".." && segment != ".")
}

/// Rewrite absolute build references to bundle-relative ones and drop the
/// per-size stylesheet link (its rules are in `styles.css`).
pub fn rewrite_references(html: &str) -> String {
    let html = SIZE_STYLESHEET_LINK
        .replace_all(html, "")
        .replace(&format!("\"/{BASE_CSS_PATH}\""), "\"styles.css\"")
        .replace(&format!("\"/{RUNTIME_JS_PATH}\""), "\"animation.js\"");
    IMAGE_REF.replace_all(&html, "${1}images/").into_owned()
}
