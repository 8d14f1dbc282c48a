//! # Banner Forge
//!
//! Build pipeline for HTML5 display-ad banners. A single JSON data file
//! describes every creative: its copy, its pixel sizes, its image assets and,
//! optionally, an explicit reveal timeline. From that file Banner Forge
//! produces one self-contained page per (banner, size), cleans the markup for
//! ad-network review, and packages each page as an uploadable bundle.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! ```text
//! 1. Load      banners.json + config.toml  →  Project       (validated data)
//! 2. Render    Project                     →  dist/         (pages, CSS, runtime)
//! 3. Clean     dist/                       →  dist/         (scoping stripped, styles merged)
//! 4. Package   dist/                       →  packaged-banners/<banner>/<WxH>/ + .zip
//! ```
//!
//! Every stage reads only the output of the previous one. `build` runs the
//! first three; `package` reads an existing build, so a build can be inspected
//! in the browser before anything is zipped.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`load`] | Stage 1: reads config and banner data, validates invariants, lints |
//! | [`render`] | Stage 2: Maud templates for banner pages, size CSS, the preview index |
//! | [`clean`] | Stage 3: strips scoping attributes, merges `<style>` blocks, formats HTML |
//! | [`package`] | Stage 4: per-size bundles with relative paths, manifest and zip |
//! | [`animation`] | Reveal model shared with the browser runtime: gating, line splitting, timelines |
//! | [`serve`] | Watch, rebuild and serve the build output during development |
//! | [`config`] | `config.toml` loading, validation and stock defaults |
//! | [`types`] | The banner data model (`Banner`, `BannerSize`, `AnimationTimeline`) |
//! | [`naming`] | Size labels, page paths, bundle names, container ids |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Page Per Size
//!
//! Ad networks review and serve each size as its own creative, so every size
//! renders to a standalone HTML document with its own clickTag and `ad.size`
//! metadata. Sizes share one base stylesheet and one runtime script; layout
//! differences live in a small per-size stylesheet.
//!
//! ## The Runtime Waits Before It Animates
//!
//! Text is split into visual lines in the browser, after web fonts have
//! settled, because line breaks depend on the font actually used. The reveal
//! only starts once the DOM is parsed, fonts have loaded or failed, and every
//! image has loaded or errored. The [`animation`] module models the same rules
//! in Rust so the reveal plan can be tested without a browser.
//!
//! ## Deterministic Cleanup
//!
//! The cleanup stage is a pure function of the rendered HTML, so running it
//! twice changes nothing and two builds of the same data are byte-identical.

pub mod animation;
pub mod clean;
pub mod config;
pub mod load;
pub mod naming;
pub mod output;
pub mod package;
pub mod render;
pub mod serve;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Load(#[from] load::LoadError),
    #[error(transparent)]
    Render(#[from] render::RenderError),
    #[error(transparent)]
    Clean(#[from] clean::CleanError),
}

/// Result of [`build`].
#[derive(Debug)]
pub struct BuildSummary {
    pub project: load::Project,
    pub render: render::RenderReport,
    /// `None` when cleanup was skipped.
    pub clean: Option<clean::CleanReport>,
}

/// Load, render and (optionally) clean a project into `output`.
pub fn build(root: &Path, output: &Path, clean: bool) -> Result<BuildSummary, BuildError> {
    let project = load::load(root)?;
    let render = render::render(&project, output)?;
    let clean = if clean {
        Some(clean::clean_dir(output, &project.config.clean)?)
    } else {
        None
    };
    tracing::info!(pages = render.pages.len(), output = %output.display(), "build finished");
    Ok(BuildSummary {
        project,
        render,
        clean,
    })
}
