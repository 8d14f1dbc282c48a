use banner_forge::{build, clean, config, load, output, package, serve};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "banner-forge")]
#[command(about = "Build, clean and package HTML5 ad banners")]
#[command(long_about = "\
Build, clean and package HTML5 ad banners

One JSON file describes every creative. Each banner renders to one page per
size; pages are cleaned for ad-network review and packaged as zip bundles.

Project structure:

  project/
  ├── config.toml          # Optional, see 'banner-forge gen-config'
  ├── banners.json         # Banner data
  └── public/              # Copied verbatim into the build output
      └── images/
          ├── logo.png     # Referenced as \"/images/logo.png\"
          └── bg.jpg

Output:

  dist/banner/<id>/<size-id>.html            One page per size
  dist/index.html                            Preview of every page
  packaged-banners/<id>/<WxH>/index.html     Upload-ready bundle
  packaged-banners/<id>/<id>-<WxH>.zip

Set RUST_LOG=debug for detailed logs.")]
#[command(version)]
struct Cli {
    /// Project directory (contains config.toml and the banner data)
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Build output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for packaged bundles
    #[arg(long, default_value = "packaged-banners", global = true)]
    package_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every banner page, then clean the output
    Build {
        /// Skip the cleanup stage
        #[arg(long)]
        no_clean: bool,
    },
    /// Clean an existing build in place
    Clean,
    /// Package an existing build into per-size bundles
    Package,
    /// Build, serve the output and rebuild on change
    Serve {
        /// Port to listen on (defaults to serve.port from config.toml)
        #[arg(long)]
        port: Option<u16>,
        /// Skip the cleanup stage on every build
        #[arg(long)]
        no_clean: bool,
    },
    /// Validate the banner data and report warnings without building
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build { no_clean } => {
            println!("==> Building {} → {}", cli.project.display(), cli.output.display());
            let summary = build(&cli.project, &cli.output, !no_clean)?;
            output::print_render_output(&summary.render);
            if let Some(report) = &summary.clean {
                output::print_clean_output(report);
            }
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Clean => {
            let project_config = config::load_config(&cli.project)?;
            println!("==> Cleaning {}", cli.output.display());
            let report = clean::clean_dir(&cli.output, &project_config.clean)?;
            output::print_clean_output(&report);
        }
        Command::Package => {
            let project = load::load(&cli.project)?;
            println!("==> Packaging {} → {}", cli.output.display(), cli.package_dir.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let package_dir = cli.package_dir.clone();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_package_event(&event, &package_dir) {
                        println!("{}", line);
                    }
                }
            });
            let result = package::package(&project, &cli.output, &cli.package_dir, Some(tx));
            printer.join().ok();
            let report = result?;
            output::print_package_summary(&report, project.config.package.max_bundle_kb);
        }
        Command::Serve { port, no_clean } => {
            let project_config = config::load_config(&cli.project)?;
            let opts = serve::ServeOptions {
                root: cli.project.clone(),
                output: cli.output.clone(),
                package_dir: cli.package_dir.clone(),
                port: port.unwrap_or(project_config.serve.port),
                debounce: Duration::from_millis(project_config.serve.debounce_ms),
                clean: !no_clean,
            };
            serve::serve(&opts, |event| {
                for line in output::format_serve_event(&event) {
                    println!("{}", line);
                }
            })?;
        }
        Command::Check => {
            println!("==> Checking {}", cli.project.display());
            let project = load::load(&cli.project)?;
            let warnings = load::lint(&project);
            output::print_check_output(&project, &warnings);
            if warnings.is_empty() {
                println!("==> Banner data is valid");
            } else {
                println!("==> Banner data is valid ({} warnings)", warnings.len());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
