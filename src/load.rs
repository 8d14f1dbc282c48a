//! Project loading and validation.
//!
//! First stage of every command. Reads `config.toml` (optional) and the banner
//! data file from the project root and checks the structural invariants every
//! later stage relies on.
//!
//! ## Project Layout
//!
//! ```text
//! project/
//! ├── config.toml          # Optional, see `config`
//! ├── banners.json         # Banner data (name set by `data_file`)
//! └── public/              # Copied into the build output
//!     └── images/
//!         ├── logo.png
//!         └── bg.jpg
//! ```
//!
//! ## Validation
//!
//! Loading fails on:
//! - a missing or malformed data file
//! - duplicate banner ids, or an empty id
//! - banner or size ids with characters outside `[A-Za-z0-9_-]` (ids become
//!   directory and file names in the build and package output)
//! - a banner without sizes
//! - zero width or height
//! - two sizes of one banner with the same dimensions, or the same id
//!
//! Problems that still produce a usable build (unknown animation targets,
//! missing image files, loops that restart mid-sequence) are reported by
//! [`lint`] as warnings instead.

use crate::animation::timeline::{content_end, resolve_timeline};
use crate::config::{self, ProjectConfig};
use crate::render::is_known_element;
use crate::types::{Banner, BannerData};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Banner data not found: {0}")]
    MissingDataFile(PathBuf),
    #[error("Invalid banner data in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Banner with empty id (name: '{0}')")]
    EmptyId(String),
    #[error("Duplicate banner id: {0}")]
    DuplicateBanner(String),
    #[error("Banner '{0}' declares no sizes")]
    NoSizes(String),
    #[error("Banner '{0}' has a size with zero width or height")]
    ZeroSize(String),
    #[error("Banner '{banner}' declares size {label} more than once")]
    DuplicateSize { banner: String, label: String },
    #[error("Banner '{banner}' declares size id '{id}' more than once")]
    DuplicateSizeId { banner: String, id: String },
    #[error("Invalid id '{id}' in banner '{banner}': use only letters, digits, '-' and '_'")]
    UnsafeId { banner: String, id: String },
}

/// A loaded, validated project.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub data: BannerData,
}

impl Project {
    pub fn public_dir(&self) -> PathBuf {
        self.root.join(&self.config.public_dir)
    }

    pub fn data_path(&self) -> PathBuf {
        self.root.join(&self.config.data_file)
    }

    /// Total number of (banner, size) pages.
    pub fn page_count(&self) -> usize {
        self.data.banners.iter().map(|b| b.sizes.len()).sum()
    }
}

pub fn load(root: &Path) -> Result<Project, LoadError> {
    let config = config::load_config(root)?;
    let data_path = root.join(&config.data_file);
    if !data_path.is_file() {
        return Err(LoadError::MissingDataFile(data_path));
    }
    let content = fs::read_to_string(&data_path)?;
    let data = parse_data(&content).map_err(|source| LoadError::Json {
        path: data_path.clone(),
        source,
    })?;
    validate(&data)?;
    tracing::debug!(banners = data.banners.len(), path = %data_path.display(), "banner data loaded");

    Ok(Project {
        root: root.to_path_buf(),
        config,
        data,
    })
}

pub fn parse_data(content: &str) -> Result<BannerData, serde_json::Error> {
    serde_json::from_str(content)
}

/// Check the structural invariants of the banner data.
pub fn validate(data: &BannerData) -> Result<(), LoadError> {
    let mut ids = HashSet::new();
    for banner in &data.banners {
        if banner.id.trim().is_empty() {
            return Err(LoadError::EmptyId(banner.name.clone()));
        }
        if !is_safe_id(&banner.id) {
            return Err(LoadError::UnsafeId {
                banner: banner.id.clone(),
                id: banner.id.clone(),
            });
        }
        if !ids.insert(banner.id.as_str()) {
            return Err(LoadError::DuplicateBanner(banner.id.clone()));
        }
        validate_sizes(banner)?;
    }
    Ok(())
}

/// Ids are used verbatim as path segments.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn validate_sizes(banner: &Banner) -> Result<(), LoadError> {
    if banner.sizes.is_empty() {
        return Err(LoadError::NoSizes(banner.id.clone()));
    }
    let mut dims = HashSet::new();
    let mut size_ids = HashSet::new();
    for size in &banner.sizes {
        if size.width == 0 || size.height == 0 {
            return Err(LoadError::ZeroSize(banner.id.clone()));
        }
        if !dims.insert((size.width, size.height)) {
            return Err(LoadError::DuplicateSize {
                banner: banner.id.clone(),
                label: size.label(),
            });
        }
        if !is_safe_id(&size.id()) {
            return Err(LoadError::UnsafeId {
                banner: banner.id.clone(),
                id: size.id(),
            });
        }
        if !size_ids.insert(size.id()) {
            return Err(LoadError::DuplicateSizeId {
                banner: banner.id.clone(),
                id: size.id(),
            });
        }
    }
    Ok(())
}

/// A non-fatal problem found by [`lint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An explicit timeline step targets a class the page never renders.
    UnknownElement { banner: String, element: String },
    /// An asset path does not exist under the public directory.
    MissingAsset { banner: String, key: String, path: String },
    /// A looping timeline restarts before its last step has finished.
    TimelineCutOff {
        banner: String,
        size: String,
        duration: u32,
        end: u32,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnknownElement { banner, element } => {
                write!(f, "{banner}: animation step targets unknown element '.{element}'")
            }
            Warning::MissingAsset { banner, key, path } => {
                write!(f, "{banner}: asset '{key}' not found at {path}")
            }
            Warning::TimelineCutOff {
                banner,
                size,
                duration,
                end,
            } => write!(
                f,
                "{banner} {size}: loop restarts at {duration}ms, before the last step ends at {end}ms"
            ),
        }
    }
}

/// Report problems the build tolerates. Used by `check`; `build` does not
/// consult it, so an unknown animation target only shows up as a skipped
/// step in the browser.
pub fn lint(project: &Project) -> Vec<Warning> {
    let public = project.public_dir();
    let mut warnings = Vec::new();

    for banner in &project.data.banners {
        if let Some(anim) = &banner.animation {
            let mut seen = HashSet::new();
            for step in &anim.timeline {
                if !is_known_element(&step.element) && seen.insert(step.element.as_str()) {
                    warnings.push(Warning::UnknownElement {
                        banner: banner.id.clone(),
                        element: step.element.clone(),
                    });
                }
            }
            for size in &banner.sizes {
                let resolved = resolve_timeline(banner, size, &project.config.animation);
                let end = content_end(&resolved);
                if resolved.looping && resolved.duration < end {
                    warnings.push(Warning::TimelineCutOff {
                        banner: banner.id.clone(),
                        size: size.id(),
                        duration: resolved.duration,
                        end,
                    });
                }
            }
        }

        let mut reported = HashSet::new();
        for size in &banner.sizes {
            for (key, path) in banner.assets_for(size) {
                let on_disk = public.join(path.trim_start_matches('/'));
                if !on_disk.is_file() && reported.insert(path.clone()) {
                    warnings.push(Warning::MissingAsset {
                        banner: banner.id.clone(),
                        key,
                        path,
                    });
                }
            }
        }
    }
    warnings
}
