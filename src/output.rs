//! CLI output formatting for every command.
//!
//! # Banner-First Display
//!
//! Output is organised by banner, not by file. Each banner leads with its
//! name and id, followed by one indented line per size. File paths appear as
//! secondary context after an arrow, so the output reads as an inventory of
//! creatives while still pointing at what was written.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Banners
//! 001 Summer Sale (summer-sale)
//!     300x250 default reveal
//!     728x90 default reveal
//! 002 Coffee Club (coffee-club)
//!     300x250 timeline, 4 steps
//!     mobile-banner (320x50) timeline, 4 steps
//!
//! Warnings
//!     coffee-club: animation step targets unknown element '.mascot'
//! ```
//!
//! ## Build
//!
//! ```text
//! summer-sale
//!     300x250 → banner/summer-sale/300x250.html (default reveal, 7 steps)
//! Stylesheets: 4, public files: 4
//! Cleaned 5 pages (20 scope attributes, 3 selectors, 0 empty values, 10 style blocks merged)
//! ```
//!
//! ## Package
//!
//! ```text
//! Summer Sale (3 sizes)
//!     300x250 → summer-sale/300x250 (4 files, 12.4 KB, zip 6.1 KB)
//!         missing: /images/missing-bg.jpg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::clean::CleanReport;
use crate::load::{Project, Warning};
use crate::package::{PackageEvent, PackageReport};
use crate::render::{PageConfig, RenderReport};
use crate::serve::ServeEvent;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `300x250` when the size has no custom id, `mobile-banner (320x50)` otherwise.
fn size_line(id: &str, label: &str) -> String {
    if id == label {
        label.to_string()
    } else {
        format!("{} ({})", id, label)
    }
}

/// Human-readable byte count: `512 B`, `12.4 KB`.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

// ============================================================================
// Check
// ============================================================================

/// Format the project inventory and any lint warnings.
pub fn format_check_output(project: &Project, warnings: &[Warning]) -> Vec<String> {
    let mut lines = vec!["Banners".to_string()];

    for (i, banner) in project.data.banners.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            banner.name,
            banner.id
        ));
        for size in &banner.sizes {
            let page = PageConfig::resolve(banner, size, &project.config);
            let plan = if page.split_lines {
                "default reveal".to_string()
            } else {
                format!("timeline, {}", plural(page.timeline.timeline.len(), "step", "steps"))
            };
            lines.push(format!(
                "{}{} {}",
                indent(1),
                size_line(&size.id(), &size.label()),
                plan
            ));
        }
    }

    if !warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for warning in warnings {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }
    lines
}

pub fn print_check_output(project: &Project, warnings: &[Warning]) {
    for line in format_check_output(project, warnings) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format the render report, grouped by banner in render order.
pub fn format_render_output(report: &RenderReport) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<&str> = None;

    for page in &report.pages {
        if current != Some(page.banner_id.as_str()) {
            lines.push(page.banner_id.clone());
            current = Some(page.banner_id.as_str());
        }
        let kind = if page.explicit_timeline { "timeline" } else { "default reveal" };
        lines.push(format!(
            "{}{} → {} ({}, {})",
            indent(1),
            size_line(&page.size_id, &page.label),
            page.path,
            kind,
            plural(page.steps, "step", "steps")
        ));
    }
    lines.push(format!(
        "Stylesheets: {}, public files: {}",
        report.stylesheets.len(),
        report.files_copied
    ));
    lines
}

pub fn print_render_output(report: &RenderReport) {
    for line in format_render_output(report) {
        println!("{}", line);
    }
}

/// Format the cleanup totals, listing rewritten pages.
pub fn format_clean_output(report: &CleanReport) -> Vec<String> {
    let t = &report.totals;
    let mut lines = vec![format!(
        "Cleaned {} ({} scope attributes, {} selectors, {} empty values, {} style blocks merged)",
        plural(report.changed.len(), "page", "pages"),
        t.scope_attributes,
        t.scope_selectors,
        t.empty_values,
        t.style_blocks
    )];
    for path in &report.changed {
        lines.push(format!("{}{}", indent(1), path.display()));
    }
    if report.unchanged > 0 {
        lines.push(format!(
            "{}{} already clean",
            indent(1),
            plural(report.unchanged, "page", "pages")
        ));
    }
    lines
}

pub fn print_clean_output(report: &CleanReport) {
    for line in format_clean_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Package
// ============================================================================

/// Format one packaging progress event. `package_dir` is stripped from
/// bundle paths when possible.
pub fn format_package_event(event: &PackageEvent, package_dir: &Path) -> Vec<String> {
    match event {
        PackageEvent::BannerStarted { name, sizes, .. } => {
            vec![format!("{} ({})", name, plural(*sizes, "size", "sizes"))]
        }
        PackageEvent::PageMissing { size_id, path, .. } => {
            vec![format!("{}{} skipped: {} not found", indent(1), size_id, path)]
        }
        PackageEvent::BundleWritten(bundle) => {
            let dir = bundle.dir.strip_prefix(package_dir).unwrap_or(&bundle.dir);
            let zip = match bundle.zip_bytes {
                Some(bytes) => format!(", zip {}", format_bytes(bytes)),
                None => String::new(),
            };
            let mut lines = vec![format!(
                "{}{} → {} ({}, {}{})",
                indent(1),
                bundle.label,
                dir.display(),
                plural(bundle.files.len(), "file", "files"),
                format_bytes(bundle.total_bytes),
                zip
            )];
            for missing in &bundle.missing_assets {
                lines.push(format!("{}missing: {}", indent(2), missing));
            }
            if bundle.over_budget {
                lines.push(format!("{}over size budget", indent(2)));
            }
            lines
        }
    }
}

pub fn format_package_summary(report: &PackageReport, max_bundle_kb: u64) -> Vec<String> {
    let over = report.bundles.iter().filter(|b| b.over_budget).count();
    let missing: usize = report.bundles.iter().map(|b| b.missing_assets.len()).sum();
    let mut lines = vec![format!("Packaged {}", plural(report.bundles.len(), "bundle", "bundles"))];
    if report.skipped > 0 {
        lines.push(format!("{}{} skipped", indent(1), plural(report.skipped, "size", "sizes")));
    }
    if missing > 0 {
        lines.push(format!("{}{} missing", indent(1), plural(missing, "asset", "assets")));
    }
    if over > 0 {
        lines.push(format!(
            "{}{} over {} KB",
            indent(1),
            plural(over, "bundle", "bundles"),
            max_bundle_kb
        ));
    }
    lines
}

pub fn print_package_summary(report: &PackageReport, max_bundle_kb: u64) {
    for line in format_package_summary(report, max_bundle_kb) {
        println!("{}", line);
    }
}

// ============================================================================
// Serve
// ============================================================================

pub fn format_serve_event(event: &ServeEvent) -> Vec<String> {
    match event {
        ServeEvent::Listening { url } => vec![format!("==> Serving {}", url)],
        ServeEvent::Watching { root } => vec![format!("==> Watching {}", root.display())],
        ServeEvent::Changed { path } => vec![format!("Changed: {}", path.display())],
        ServeEvent::BuildStarted => vec!["==> Building".to_string()],
        ServeEvent::Built(summary) => {
            let mut line = format!(
                "Built {}",
                plural(summary.render.pages.len(), "page", "pages")
            );
            if let Some(clean) = &summary.clean {
                line.push_str(&format!(", cleaned {}", clean.changed.len()));
            }
            vec![line]
        }
        ServeEvent::BuildFailed(e) => vec![format!("Build failed: {}", e)],
    }
}
