//! Banner page rendering.
//!
//! Second stage of the build. Takes a loaded [`Project`] and writes one
//! standalone HTML page per (banner, size), plus the shared stylesheet, the
//! per-size stylesheets, the animation runtime and a preview index.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                      # Preview index (not cleaned or packaged)
//! ├── styles/
//! │   ├── banner-base.css             # Shared: reset, effect keyframes
//! │   └── sizes/
//! │       ├── 300x250.css             # Geometry and type sizes for one size
//! │       └── 728x90.css
//! ├── scripts/
//! │   └── banner-animation.js         # Browser runtime
//! ├── images/…                        # Copied from public/
//! └── banner/
//!     └── summer-sale/
//!         ├── 300x250.html
//!         └── leaderboard.html        # Size with an explicit id
//! ```
//!
//! ## Component Styles
//!
//! Each component (frame, copy, cta) carries a small `<style>` block scoped
//! with a `data-bf-cid-<component>` attribute, the same way component
//! frameworks scope styles in preview builds. The cleaner strips the scoping
//! and merges the blocks before packaging.
//!
//! ## Page Config
//!
//! Every page embeds the resolved [`PageConfig`] as JSON and calls
//! `initBanner(containerId, config)`. Pages with an explicit timeline carry it
//! verbatim; pages on the default reveal plan set `splitLines` so the runtime
//! re-plans from measured line counts, with the build-time estimate included
//! for reference.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.

use crate::animation::{SizeLayout, resolve_timeline};
use crate::config::ProjectConfig;
use crate::load::Project;
use crate::naming;
use crate::types::{AnimationTimeline, Banner, BannerSize};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Refusing to clear output directory {0}: it contains the project")]
    UnsafeOutput(PathBuf),
}

const BASE_CSS: &str = include_str!("../static/banner-base.css");
const RUNTIME_JS: &str = include_str!("../static/banner-animation.js");

pub const BASE_CSS_PATH: &str = "styles/banner-base.css";
pub const RUNTIME_JS_PATH: &str = "scripts/banner-animation.js";

/// Classes every page renders (when the matching content or asset exists).
pub const ELEMENT_CLASSES: [&str; 8] = [
    "banner",
    "background",
    "copy",
    "eyebrow",
    "headline",
    "subhead",
    "logo",
    "cta-button",
];

/// Asset keys the page template places. Other keys are ignored.
pub const RENDERED_ASSETS: [&str; 2] = ["background", "logo"];

/// Whether `class` can exist in a rendered page, counting the
/// `headline-line-N` / `subhead-line-N` spans the runtime creates.
pub fn is_known_element(class: &str) -> bool {
    if ELEMENT_CLASSES.contains(&class) {
        return true;
    }
    ["headline-line-", "subhead-line-"].iter().any(|prefix| {
        class
            .strip_prefix(prefix)
            .and_then(|n| n.parse::<usize>().ok())
            .is_some_and(|n| n >= 1)
    })
}

const FRAME_CSS: &str = ".banner[data-bf-cid-frame] {\n    outline: 1px solid rgba(0, 0, 0, 0.35);\n    outline-offset: -1px;\n}";
const COPY_CSS: &str = ".copy[data-bf-cid-copy] .headline[data-bf-cid-copy] {\n    text-shadow: 0 1px 2px rgba(0, 0, 0, 0.35);\n}";
const CTA_CSS: &str = ".cta-button[data-bf-cid-cta]:hover {\n    filter: brightness(1.08);\n}";

/// Font gating settings passed to the runtime.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontGate {
    pub families: Vec<String>,
    pub timeout_ms: u32,
}

/// Everything `initBanner` needs for one page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    pub width: u32,
    pub height: u32,
    pub clickthrough: String,
    /// Re-plan the default reveal from measured lines in the browser.
    pub split_lines: bool,
    pub timeline: AnimationTimeline,
    pub fonts: FontGate,
    pub settle_ms: u32,
    pub play_delay_ms: u32,
    pub loop_pause_ms: u32,
    #[serde(rename = "loop")]
    pub looping: bool,
}

impl PageConfig {
    pub fn resolve(banner: &Banner, size: &BannerSize, config: &ProjectConfig) -> Self {
        let anim = &config.animation;
        Self {
            width: size.width,
            height: size.height,
            clickthrough: banner.clickthrough.clone(),
            split_lines: banner.animation.is_none(),
            timeline: resolve_timeline(banner, size, anim),
            fonts: FontGate {
                families: config.fonts.families.clone(),
                timeout_ms: config.fonts.timeout_ms,
            },
            settle_ms: anim.settle_ms,
            play_delay_ms: anim.play_delay_ms,
            loop_pause_ms: anim.loop_pause_ms,
            looping: anim.looping,
        }
    }
}

/// One written page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub banner_id: String,
    pub size_id: String,
    pub label: String,
    /// Relative to the output directory.
    pub path: String,
    pub steps: usize,
    pub explicit_timeline: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    pub pages: Vec<RenderedPage>,
    pub stylesheets: Vec<String>,
    pub files_copied: usize,
}

/// Render the whole project into `output_dir`, replacing whatever was there.
pub fn render(project: &Project, output_dir: &Path) -> Result<RenderReport, RenderError> {
    prepare_output(project, output_dir)?;

    let mut report = RenderReport {
        files_copied: copy_public(&project.public_dir(), output_dir)?,
        ..RenderReport::default()
    };

    write_file(output_dir, BASE_CSS_PATH, BASE_CSS)?;
    write_file(output_dir, RUNTIME_JS_PATH, RUNTIME_JS)?;

    for banner in &project.data.banners {
        for size in &banner.sizes {
            let stylesheet = naming::size_stylesheet_path(size.width, size.height);
            if !report.stylesheets.contains(&stylesheet) {
                let layout = SizeLayout::for_size(size.width, size.height);
                write_file(output_dir, &stylesheet, &size_css(&layout))?;
                report.stylesheets.push(stylesheet);
            }

            let page_config = PageConfig::resolve(banner, size, &project.config);
            let markup = render_page(banner, size, &page_config, &project.config)?;
            let path = naming::page_path(&banner.id, &size.id());
            write_file(output_dir, &path, &markup.into_string())?;
            tracing::debug!(page = %path, steps = page_config.timeline.timeline.len(), "rendered");

            report.pages.push(RenderedPage {
                banner_id: banner.id.clone(),
                size_id: size.id(),
                label: size.label(),
                path,
                steps: page_config.timeline.timeline.len(),
                explicit_timeline: !page_config.split_lines,
            });
        }
    }

    let index = render_index(&project.data.banners);
    write_file(output_dir, "index.html", &index.into_string())?;

    Ok(report)
}

fn prepare_output(project: &Project, output_dir: &Path) -> Result<(), RenderError> {
    if output_dir.exists() {
        let out = output_dir.canonicalize()?;
        let root = project.root.canonicalize()?;
        if root.starts_with(&out) {
            return Err(RenderError::UnsafeOutput(output_dir.to_path_buf()));
        }
        fs::remove_dir_all(output_dir)?;
    }
    fs::create_dir_all(output_dir)?;
    Ok(())
}

fn write_file(output_dir: &Path, rel: &str, content: &str) -> std::io::Result<()> {
    let path = output_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Copy the public directory into the output, skipping hidden files.
/// Returns the number of files copied. A missing public directory is fine.
fn copy_public(public_dir: &Path, output_dir: &Path) -> Result<usize, RenderError> {
    if !public_dir.is_dir() {
        tracing::debug!(dir = %public_dir.display(), "no public directory");
        return Ok(0);
    }
    let mut copied = 0;
    let walker = WalkDir::new(public_dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(public_dir)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let dst = output_dir.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst)?;
        } else {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dst)?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ============================================================================
// Stylesheets
// ============================================================================

/// Geometry and type sizes for one size. Strips put the copy on the left and
/// the CTA on the right; other sizes stack copy above a bottom CTA.
pub fn size_css(layout: &SizeLayout) -> String {
    let label = naming::size_label(layout.width, layout.height);
    let pad = layout.padding_px;
    let (cta_rule, logo_rule) = if layout.strip {
        (
            format!("    right: {pad:.0}px;\n    top: 50%;\n    transform: translateY(-50%);"),
            format!(
                "    right: {:.0}px;\n    top: {pad:.0}px;\n    height: {:.0}px;",
                layout.width as f32 * 0.2 + pad,
                layout.height as f32 - 2.0 * pad
            ),
        )
    } else {
        (
            format!("    left: {pad:.0}px;\n    bottom: {pad:.0}px;"),
            format!(
                "    right: {pad:.0}px;\n    bottom: {pad:.0}px;\n    height: {:.0}px;",
                (layout.height as f32 * 0.12).max(16.0)
            ),
        )
    };
    let copy_position = if layout.strip {
        format!("    left: {pad:.0}px;\n    top: 50%;\n    transform: translateY(-50%);")
    } else {
        format!("    left: {pad:.0}px;\n    top: {pad:.0}px;")
    };

    format!(
        "/* {label} */\n\
.banner-{label} {{\n    width: {w}px;\n    height: {h}px;\n}}\n\n\
.banner-{label} .copy {{\n{copy_position}\n    width: {copy:.0}px;\n}}\n\n\
.banner-{label} .eyebrow {{\n    font-size: {eyebrow:.1}px;\n}}\n\n\
.banner-{label} .headline {{\n    font-size: {headline:.1}px;\n}}\n\n\
.banner-{label} .subhead {{\n    font-size: {subhead:.1}px;\n}}\n\n\
.banner-{label} .cta-button {{\n{cta_rule}\n    font-size: {cta:.1}px;\n}}\n\n\
.banner-{label} .logo {{\n{logo_rule}\n}}\n",
        w = layout.width,
        h = layout.height,
        copy = layout.copy_width_px,
        eyebrow = layout.eyebrow_px,
        headline = layout.headline_px,
        subhead = layout.subhead_px,
        cta = layout.cta_px,
    )
}

// ============================================================================
// Pages
// ============================================================================

/// JSON safe to place inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Render one banner page.
pub fn render_page(
    banner: &Banner,
    size: &BannerSize,
    page_config: &PageConfig,
    config: &ProjectConfig,
) -> Result<Markup, RenderError> {
    let label = size.label();
    let container_id = naming::container_id(&banner.id, &size.id());
    let config_id = format!("{container_id}-config");
    let assets = banner.assets_for(size);
    let content = &banner.content;

    let click_tag = format!("var clickTag = {};", script_json(&banner.clickthrough)?);
    let config_json = script_json(page_config)?;
    let init = format!(
        "initBanner({}, JSON.parse(document.getElementById({}).textContent));",
        script_json(&container_id)?,
        script_json(&config_id)?
    );

    Ok(html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="ad.size" content={ "width=" (size.width) ",height=" (size.height) };
                meta name="viewport" content={ "width=" (size.width) ", height=" (size.height) };
                title { (banner.name) " – " (label) }
                @if let Some(fonts) = config.fonts.stylesheet.as_deref().filter(|s| !s.is_empty()) {
                    link rel="stylesheet" href=(fonts);
                }
                link rel="stylesheet" href={ "/" (BASE_CSS_PATH) };
                link rel="stylesheet" href={ "/" (naming::size_stylesheet_path(size.width, size.height)) };
                style data-bf-cid-frame { (PreEscaped(FRAME_CSS)) }
                style data-bf-cid-copy { (PreEscaped(COPY_CSS)) }
                style data-bf-cid-cta { (PreEscaped(CTA_CSS)) }
                script { (PreEscaped(click_tag)) }
            }
            body {
                div id=(container_id) class={ "banner banner-" (label) } data-bf-cid-frame {
                    @if let Some(bg) = assets.get("background") {
                        img.background src=(bg) alt="" data-bf-cid-frame;
                    }
                    div.copy data-bf-cid-copy {
                        @if !content.eyebrow.trim().is_empty() {
                            p.eyebrow data-bf-cid-copy { (content.eyebrow) }
                        }
                        h1.headline data-bf-cid-copy { (content.headline) }
                        @if !content.subhead.trim().is_empty() {
                            p.subhead data-bf-cid-copy { (content.subhead) }
                        }
                    }
                    @if let Some(logo) = assets.get("logo") {
                        img.logo src=(logo) alt=(banner.name) data-bf-cid-frame;
                    }
                    @if !content.cta.trim().is_empty() {
                        button.cta-button type="button" data-bf-cid-cta { (content.cta) }
                    }
                }
                script src={ "/" (RUNTIME_JS_PATH) } {}
                script type="application/json" id=(config_id) { (PreEscaped(config_json)) }
                script { (PreEscaped(init)) }
            }
        }
    })
}

/// Preview index: every banner at every size, side by side.
fn render_index(banners: &[Banner]) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Banner preview" }
                style {
                    (PreEscaped("body{font-family:system-ui,sans-serif;margin:2rem;background:#f4f4f4}section{margin-bottom:3rem}.sizes{display:flex;flex-wrap:wrap;gap:1.5rem;align-items:flex-start}figure{margin:0}figcaption{font-size:.8rem;color:#555;margin-top:.4rem}iframe{border:0;background:#fff;display:block}"))
                }
            }
            body {
                h1 { "Banner preview" }
                @for banner in banners {
                    section {
                        h2 { (banner.name) }
                        div.sizes {
                            @for size in &banner.sizes {
                                figure {
                                    iframe src={ "/" (naming::page_path(&banner.id, &size.id())) }
                                        width=(size.width) height=(size.height)
                                        title={ (banner.name) " " (size.label()) } {}
                                    figcaption {
                                        a href={ "/" (naming::page_path(&banner.id, &size.id())) } { (size.id()) }
                                        @if size.id() != size.label() {
                                            " (" (size.label()) ")"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn page_for(banner: &Banner, size: &BannerSize) -> String {
        let config = ProjectConfig::default();
        let page_config = PageConfig::resolve(banner, size, &config);
        render_page(banner, size, &page_config, &config)
            .unwrap()
            .into_string()
    }

    #[test]
    fn every_size_produces_exactly_one_page() {
        let tmp = setup_fixtures();
        let project = load::load(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();
        let report = render(&project, out.path()).unwrap();

        assert_eq!(report.pages.len(), project.page_count());
        for banner in &project.data.banners {
            let dir = out.path().join("banner").join(&banner.id);
            let html_files = fs::read_dir(&dir)
                .unwrap()
                .filter(|e| {
                    e.as_ref()
                        .unwrap()
                        .path()
                        .extension()
                        .is_some_and(|x| x == "html")
                })
                .count();
            assert_eq!(html_files, banner.sizes.len(), "pages for {}", banner.id);
        }
        assert!(out.path().join("banner/coffee-club/mobile-banner.html").is_file());
    }

    #[test]
    fn shared_assets_and_public_files_written() {
        let tmp = setup_fixtures();
        let project = load::load(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();
        let report = render(&project, out.path()).unwrap();

        assert!(out.path().join(BASE_CSS_PATH).is_file());
        assert!(out.path().join(RUNTIME_JS_PATH).is_file());
        assert!(out.path().join("styles/sizes/300x250.css").is_file());
        assert!(out.path().join("images/logo.png").is_file());
        assert!(out.path().join("index.html").is_file());
        // 300x250 is shared by both banners
        assert_eq!(
            report
                .stylesheets
                .iter()
                .filter(|s| s.ends_with("300x250.css"))
                .count(),
            1
        );
        assert!(report.files_copied >= 1);
    }

    #[test]
    fn render_replaces_stale_output() {
        let tmp = setup_fixtures();
        let project = load::load(tmp.path()).unwrap();
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("stale.html"), "old").unwrap();
        render(&project, out.path()).unwrap();
        assert!(!out.path().join("stale.html").exists());
    }

    #[test]
    fn refuses_to_clear_project_root() {
        let tmp = setup_fixtures();
        let project = load::load(tmp.path()).unwrap();
        let err = render(&project, tmp.path()).unwrap_err();
        assert!(matches!(err, RenderError::UnsafeOutput(_)));
        assert!(tmp.path().join("banners.json").is_file());
    }

    #[test]
    fn page_embeds_ad_metadata_and_init_call() {
        let banner = minimal_banner("spring", &[(300, 250)]);
        let html = page_for(&banner, &banner.sizes[0]);

        assert!(html.contains(r#"<meta name="ad.size" content="width=300,height=250">"#));
        assert!(html.contains(r#"var clickTag = "https://example.com/spring";"#));
        assert!(html.contains(r#"id="banner-spring-300x250""#));
        assert!(html.contains("initBanner(\"banner-spring-300x250\""));
        assert!(html.contains(r#""splitLines":true"#));
        assert!(html.contains("/styles/sizes/300x250.css"));
    }

    #[test]
    fn page_carries_scoping_attributes() {
        let banner = minimal_banner("spring", &[(300, 250)]);
        let html = page_for(&banner, &banner.sizes[0]);
        assert!(html.contains("<style data-bf-cid-frame>"));
        assert!(html.contains("data-bf-cid-cta"));
        assert!(html.contains(".banner[data-bf-cid-frame]"));
    }

    #[test]
    fn only_logo_and_background_are_placed() {
        let mut banner = minimal_banner("spring", &[(300, 250)]);
        banner.assets.insert("logo".into(), "/images/logo.png".into());
        banner.assets.insert("badge".into(), "/images/badge.png".into());
        let html = page_for(&banner, &banner.sizes[0]);
        assert!(html.contains(r#"src="/images/logo.png""#));
        assert!(!html.contains("badge.png"));
    }

    #[test]
    fn explicit_timeline_embedded_verbatim() {
        let tmp = setup_fixtures();
        let project = load::load(tmp.path()).unwrap();
        let banner = find_banner(&project, "coffee-club");
        let size = &banner.sizes[0];
        let page_config = PageConfig::resolve(banner, size, &project.config);
        assert!(!page_config.split_lines);
        assert_eq!(
            Some(&page_config.timeline),
            banner.animation.as_ref()
        );
    }

    #[test]
    fn script_json_cannot_close_the_script_element() {
        let mut banner = minimal_banner("spring", &[(300, 250)]);
        banner.clickthrough = "https://example.com/</script><script>alert(1)".into();
        let html = page_for(&banner, &banner.sizes[0]);
        assert!(!html.contains("</script><script>alert"));
    }

    #[test]
    fn copy_is_escaped() {
        let mut banner = minimal_banner("spring", &[(300, 250)]);
        banner.content.headline = "<b>Big</b> & bold".into();
        let html = page_for(&banner, &banner.sizes[0]);
        assert!(html.contains("&lt;b&gt;Big&lt;/b&gt; &amp; bold"));
    }

    #[test]
    fn empty_eyebrow_and_subhead_not_rendered() {
        let banner = minimal_banner("spring", &[(300, 250)]);
        let html = page_for(&banner, &banner.sizes[0]);
        assert!(!html.contains(r#"class="eyebrow""#));
        assert!(!html.contains(r#"class="subhead""#));
        assert!(html.contains(r#"class="headline""#));
    }

    #[test]
    fn strip_css_puts_cta_on_the_right() {
        let css = size_css(&SizeLayout::for_size(728, 90));
        assert!(css.contains(".banner-728x90 {\n    width: 728px;\n    height: 90px;\n}"));
        let cta = css.split(".banner-728x90 .cta-button").nth(1).unwrap();
        assert!(cta.contains("right:"));
    }

    #[test]
    fn known_elements() {
        assert!(is_known_element("headline"));
        assert!(is_known_element("cta-button"));
        assert!(is_known_element("headline-line-3"));
        assert!(is_known_element("subhead-line-1"));
        assert!(!is_known_element("headline-line-0"));
        assert!(!is_known_element("headline-line-x"));
        assert!(!is_known_element("mascot"));
    }
}
