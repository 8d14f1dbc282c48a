//! Shared test utilities for the banner-forge test suite.
//!
//! Provides the fixture project, lookup helpers and small builders for
//! banner data.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let project = load(tmp.path()).unwrap();
//!
//! let banner = find_banner(&project, "summer-sale");
//! assert_eq!(banner.sizes.len(), 3);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::load::Project;
use crate::types::{Banner, BannerContent, BannerData, BannerSize};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/project/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/project");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `banners` as a data file at `root/filename`.
pub fn write_data(root: &Path, filename: &str, banners: &[Banner]) {
    let data = BannerData {
        banners: banners.to_vec(),
    };
    let json = serde_json::to_string_pretty(&data).unwrap();
    std::fs::write(root.join(filename), json).unwrap();
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a banner by id. Panics if not found.
pub fn find_banner<'a>(project: &'a Project, id: &str) -> &'a Banner {
    project
        .data
        .banners
        .iter()
        .find(|b| b.id == id)
        .unwrap_or_else(|| panic!("banner '{id}' not found. Available: {:?}", banner_ids(project)))
}

/// Banner ids in data-file order.
pub fn banner_ids(project: &Project) -> Vec<&str> {
    project.data.banners.iter().map(|b| b.id.as_str()).collect()
}

// =========================================================================
// Builders
// =========================================================================

/// A banner with a headline and CTA, no eyebrow, subhead, assets or
/// explicit animation. Clickthrough is `https://example.com/{id}`.
pub fn minimal_banner(id: &str, sizes: &[(u32, u32)]) -> Banner {
    Banner {
        id: id.to_string(),
        name: format!("Banner {id}"),
        sizes: sizes.iter().map(|&(w, h)| BannerSize::new(w, h)).collect(),
        content: BannerContent {
            eyebrow: String::new(),
            headline: "Big news".to_string(),
            subhead: String::new(),
            cta: "Learn more".to_string(),
        },
        assets: Default::default(),
        clickthrough: format!("https://example.com/{id}"),
        animation: None,
    }
}
