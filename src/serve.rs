//! Development loop: watch, rebuild, serve.
//!
//! `serve` builds once, starts a static HTTP server over the build output, and
//! rebuilds whenever the banner data, `config.toml` or anything under the
//! public directory changes.
//!
//! Rebuilds are debounced: a burst of saves produces one build, started once
//! the project has been quiet for `debounce_ms`. A change that arrives while a
//! build is running queues exactly one follow-up build, which starts as soon
//! as the running one finishes. Build failures are reported and the loop keeps
//! running.

use crate::{BuildError, BuildSummary, build};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("Could not start server on port {port}: {message}")]
    Bind { port: u16, message: String },
}

// ============================================================================
// Debouncing
// ============================================================================

/// Decides when to build. Time is passed in so the policy is testable.
#[derive(Debug, Clone)]
pub struct BuildDebouncer {
    debounce: Duration,
    due: Option<Instant>,
    building: bool,
    queued: bool,
}

impl BuildDebouncer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            due: None,
            building: false,
            queued: false,
        }
    }

    /// Record a relevant change. Outside a build this (re)starts the quiet
    /// period; during a build it queues one follow-up.
    pub fn on_change(&mut self, now: Instant) {
        if self.building {
            self.queued = true;
        } else {
            self.due = Some(now + self.debounce);
        }
    }

    /// Whether a build should start now. Returning `true` marks the build as
    /// running until [`build_finished`](Self::build_finished).
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if !self.building && now >= due => {
                self.due = None;
                self.building = true;
                true
            }
            _ => false,
        }
    }

    pub fn build_finished(&mut self, now: Instant) {
        self.building = false;
        if self.queued {
            self.queued = false;
            self.due = Some(now);
        }
    }

    pub fn is_building(&self) -> bool {
        self.building
    }

    /// How long the caller may sleep before the next [`poll`](Self::poll)
    /// could return `true`.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        if self.building {
            return None;
        }
        self.due.map(|due| due.saturating_duration_since(now))
    }
}

// ============================================================================
// Change filtering
// ============================================================================

/// Decides which filesystem events should trigger a rebuild.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    data_file: PathBuf,
    public_dir: PathBuf,
    ignored: Vec<PathBuf>,
}

impl WatchFilter {
    /// `data_file` and `public_dir` are relative to `root`. Paths under
    /// `ignored` (the build and package output, relative to the working
    /// directory) never trigger.
    pub fn new(root: &Path, data_file: &str, public_dir: &str, ignored: &[PathBuf]) -> Self {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let ignored = ignored
            .iter()
            .map(|p| {
                let abs = std::path::absolute(p).unwrap_or_else(|_| p.clone());
                abs.canonicalize().unwrap_or(abs)
            })
            .collect();
        Self {
            data_file: PathBuf::from(data_file),
            public_dir: PathBuf::from(public_dir),
            root,
            ignored,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        if self.ignored.iter().any(|i| path.starts_with(i)) {
            return false;
        }
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        let hidden = rel
            .components()
            .any(|c| matches!(c, Component::Normal(n) if n.to_string_lossy().starts_with('.')));
        if hidden {
            return false;
        }
        rel == self.data_file || rel == Path::new("config.toml") || rel.starts_with(&self.public_dir)
    }
}

// ============================================================================
// Static server
// ============================================================================

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "zip" => "application/zip",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Map a request URL to a file under `root`. Returns `None` for anything
/// that would escape it.
pub fn resolve_request_path(root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or("/");
    let decoded = urlencoding::decode(path).ok()?;
    if decoded.contains('\\') || decoded.contains('\0') {
        return None;
    }
    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => resolved.push(s),
        }
    }
    if decoded.ends_with('/') || resolved.is_dir() {
        resolved.push("index.html");
    }
    Some(resolved)
}

fn respond(root: &Path, request: Request) -> std::io::Result<()> {
    let Some(path) = resolve_request_path(root, request.url()) else {
        tracing::warn!(url = %request.url(), "rejected request outside the build output");
        return request.respond(Response::from_string("Forbidden").with_status_code(403));
    };
    if !path.is_file() {
        tracing::debug!(url = %request.url(), "not found");
        return request.respond(Response::from_string("Not Found").with_status_code(404));
    }
    let mut response = Response::from_file(File::open(&path)?);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], content_type(&path).as_bytes()) {
        response = response.with_header(header);
    }
    if let Ok(header) = Header::from_bytes(&b"Cache-Control"[..], &b"no-store"[..]) {
        response = response.with_header(header);
    }
    request.respond(response)
}

/// A static file server running on its own thread.
pub struct StaticServer {
    server: Arc<Server>,
    addr: SocketAddr,
    handle: Option<JoinHandle<()>>,
}

impl StaticServer {
    /// Serve `root` on `127.0.0.1:port`. Port 0 picks a free port.
    pub fn start(root: &Path, port: u16) -> Result<Self, ServeError> {
        let server = Server::http(("127.0.0.1", port)).map_err(|e| ServeError::Bind {
            port,
            message: e.to_string(),
        })?;
        let addr = server
            .server_addr()
            .to_ip()
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], port)));
        let server = Arc::new(server);
        let worker = Arc::clone(&server);
        let root = root.to_path_buf();
        let handle = thread::spawn(move || {
            for request in worker.incoming_requests() {
                if let Err(e) = respond(&root, request) {
                    tracing::debug!(error = %e, "response failed");
                }
            }
        });
        Ok(Self {
            server,
            addr,
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

// ============================================================================
// Loop
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub root: PathBuf,
    pub output: PathBuf,
    /// Ignored by the watcher alongside `output`.
    pub package_dir: PathBuf,
    pub port: u16,
    pub debounce: Duration,
    pub clean: bool,
}

/// Progress reported by [`serve`].
#[derive(Debug)]
pub enum ServeEvent {
    Listening { url: String },
    Watching { root: PathBuf },
    Changed { path: PathBuf },
    BuildStarted,
    Built(BuildSummary),
    BuildFailed(BuildError),
}

fn run_build(opts: &ServeOptions, on_event: &mut impl FnMut(ServeEvent)) {
    on_event(ServeEvent::BuildStarted);
    match build(&opts.root, &opts.output, opts.clean) {
        Ok(summary) => on_event(ServeEvent::Built(summary)),
        Err(e) => {
            tracing::debug!(error = %e, "build failed");
            on_event(ServeEvent::BuildFailed(e));
        }
    }
}

fn handle_watch_event(
    filter: &WatchFilter,
    res: notify::Result<notify::Event>,
    debouncer: &mut BuildDebouncer,
    on_event: &mut impl FnMut(ServeEvent),
) {
    match res {
        Ok(event) => {
            if let Some(path) = event.paths.iter().find(|p| filter.is_relevant(p)) {
                debouncer.on_change(Instant::now());
                on_event(ServeEvent::Changed { path: path.clone() });
            }
        }
        Err(e) => tracing::warn!(error = %e, "watch error"),
    }
}

/// Build, serve and rebuild on change. Returns only when the watcher stops.
pub fn serve(opts: &ServeOptions, mut on_event: impl FnMut(ServeEvent)) -> Result<(), ServeError> {
    run_build(opts, &mut on_event);
    std::fs::create_dir_all(&opts.output)?;

    let server = StaticServer::start(&opts.output, opts.port)?;
    on_event(ServeEvent::Listening { url: server.url() });

    let config = crate::config::load_config(&opts.root).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config unreadable, watching default paths");
        crate::config::ProjectConfig::default()
    });
    let filter = WatchFilter::new(
        &opts.root,
        &config.data_file,
        &config.public_dir,
        &[opts.output.clone(), opts.package_dir.clone()],
    );

    let (tx, rx) = mpsc::channel();
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;
    watcher.watch(filter.root(), RecursiveMode::Recursive)?;
    on_event(ServeEvent::Watching {
        root: filter.root().to_path_buf(),
    });

    let mut debouncer = BuildDebouncer::new(opts.debounce);
    loop {
        let timeout = debouncer
            .next_wakeup(Instant::now())
            .unwrap_or(Duration::from_secs(3600));
        match rx.recv_timeout(timeout) {
            Ok(res) => handle_watch_event(&filter, res, &mut debouncer, &mut on_event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        while debouncer.poll(Instant::now()) {
            run_build(opts, &mut on_event);
            // Changes that landed while building queue one follow-up
            while let Ok(res) = rx.try_recv() {
                handle_watch_event(&filter, res, &mut debouncer, &mut on_event);
            }
            debouncer.build_finished(Instant::now());
        }
    }

    drop(server);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tempfile::TempDir;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn burst_of_changes_builds_once_after_quiet_period() {
        let t0 = Instant::now();
        let mut d = BuildDebouncer::new(DEBOUNCE);
        d.on_change(t0);
        d.on_change(t0 + ms(100));
        d.on_change(t0 + ms(250));
        assert!(!d.poll(t0 + ms(400)));
        assert_eq!(d.next_wakeup(t0 + ms(400)), Some(ms(150)));
        assert!(d.poll(t0 + ms(550)));
        assert!(d.is_building());
        assert!(!d.poll(t0 + ms(600)));
        d.build_finished(t0 + ms(700));
        assert!(!d.poll(t0 + ms(5000)));
    }

    #[test]
    fn changes_during_build_queue_exactly_one_follow_up() {
        let t0 = Instant::now();
        let mut d = BuildDebouncer::new(DEBOUNCE);
        d.on_change(t0);
        assert!(d.poll(t0 + ms(300)));

        d.on_change(t0 + ms(350));
        d.on_change(t0 + ms(400));
        d.on_change(t0 + ms(450));
        assert_eq!(d.next_wakeup(t0 + ms(450)), None);
        d.build_finished(t0 + ms(500));

        // follow-up starts immediately, and only once
        assert!(d.poll(t0 + ms(500)));
        d.build_finished(t0 + ms(600));
        assert!(!d.poll(t0 + ms(10_000)));
    }

    #[test]
    fn idle_debouncer_never_builds() {
        let mut d = BuildDebouncer::new(DEBOUNCE);
        assert!(!d.poll(Instant::now() + ms(10_000)));
        assert_eq!(d.next_wakeup(Instant::now()), None);
    }

    #[test]
    fn filter_accepts_sources_and_ignores_outputs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("dist")).unwrap();
        let filter = WatchFilter::new(&root, "banners.json", "public", &[root.join("dist")]);

        assert!(filter.is_relevant(&root.join("banners.json")));
        assert!(filter.is_relevant(&root.join("config.toml")));
        assert!(filter.is_relevant(&root.join("public/images/logo.png")));
        assert!(!filter.is_relevant(&root.join("dist/index.html")));
        assert!(!filter.is_relevant(&root.join("public/.DS_Store")));
        assert!(!filter.is_relevant(&root.join(".git/index")));
        assert!(!filter.is_relevant(&root.join("notes.md")));
        assert!(!filter.is_relevant(Path::new("/elsewhere/banners.json")));
    }

    #[test]
    fn request_paths_resolve_inside_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("banner/spring")).unwrap();

        assert_eq!(resolve_request_path(root, "/"), Some(root.join("index.html")));
        assert_eq!(
            resolve_request_path(root, "/banner/spring/300x250.html?x=1"),
            Some(root.join("banner/spring/300x250.html"))
        );
        assert_eq!(
            resolve_request_path(root, "/banner/spring"),
            Some(root.join("banner/spring/index.html"))
        );
        assert_eq!(
            resolve_request_path(root, "/images/my%20logo.png"),
            Some(root.join("images/my logo.png"))
        );
        assert_eq!(resolve_request_path(root, "/../secret"), None);
        assert_eq!(resolve_request_path(root, "/images/%2e%2e/%2e%2e/secret"), None);
        assert_eq!(resolve_request_path(root, "/%2e%2e%5csecret"), None);
        assert_eq!(resolve_request_path(root, "/index.html%00.png"), None);
        assert_eq!(resolve_request_path(root, "/bad%ff"), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.JS")), "application/javascript");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("a")), "application/octet-stream");
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn server_serves_files_with_content_types() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("index.html"), "<h1>preview</h1>").unwrap();
        std::fs::create_dir_all(tmp.path().join("styles")).unwrap();
        std::fs::write(tmp.path().join("styles/banner-base.css"), "body{}").unwrap();

        let server = StaticServer::start(tmp.path(), 0).unwrap();
        let index = get(server.addr(), "/");
        assert!(index.starts_with("HTTP/1.1 200"), "{index}");
        assert!(index.to_ascii_lowercase().contains("content-type: text/html"));
        assert!(index.contains("<h1>preview</h1>"));

        let css = get(server.addr(), "/styles/banner-base.css");
        assert!(css.to_ascii_lowercase().contains("content-type: text/css"));

        assert!(get(server.addr(), "/missing.html").starts_with("HTTP/1.1 404"));
        assert!(get(server.addr(), "/../Cargo.toml").starts_with("HTTP/1.1 403"));
    }
}
