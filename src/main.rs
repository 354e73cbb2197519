use clap::{Parser, Subcommand};
use picset::config::{self, Overrides};
use picset::imaging::RustBackend;
use picset::{output, process};
use std::path::PathBuf;

/// Flags that override `config.toml` for a single run.
#[derive(clap::Args, Clone, Default)]
struct BuildArgs {
    /// Base width in px; the md tier targets this width
    #[arg(long)]
    base_width: Option<f64>,

    /// Class added to every <picture> (per-image config wins)
    #[arg(long)]
    class_name: Option<String>,

    /// Emit data-srcset/data-src for a lazy loader
    #[arg(long)]
    lazyload: bool,

    /// Skip WebP renditions; emit JPEG sources only
    #[arg(long)]
    no_webp: bool,

    /// JSON object mapping basename to alt text
    #[arg(long, value_name = "JSON")]
    alt_text: Option<PathBuf>,
}

fn version_string() -> &'static str {
    let on_tag = env!("PICSET_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("PICSET_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "picset")]
#[command(about = "Responsive image renditions and <picture> fragments")]
#[command(long_about = "\
Responsive image renditions and <picture> fragments

Every image in the source directory is resized to a fixed set of widths
derived from one base width, encoded as JPEG (and WebP), and given a
ready-to-include <picture> fragment.

Source structure:

  src/
  ├── config.toml              # Base width, breakpoints, alt text (optional)
  ├── Sunset Beach.jpg
  └── harbor.png

Output:

  build/
  ├── manifest.json            # Resolved plan, for other build steps
  └── sunset-beach/
      ├── index.html           # <picture> fragment
      ├── sunset-beach-400w.jpg
      ├── sunset-beach-400w.webp
      └── ...

Widths for base width B: xs = B/3, sm = 2·xs, md = B, lg = 4·xs, xl = 5·xs,
plus 2x variants. Every image needs alt text, from config [alt] or --alt-text.

Run 'picset gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory of source images
    #[arg(long, default_value = "src", global = true)]
    source: PathBuf,

    /// Output directory (deleted and recreated by build)
    #[arg(long, default_value = "build", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (deleted after build)
    #[arg(long, default_value = ".picset-temp", global = true)]
    temp_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: plan → resize → encode → relocate → render
    Build(BuildArgs),
    /// Resolve config and print the size plan without writing anything
    Plan(BuildArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let paths = process::BuildPaths::new(&cli.source, &cli.output, &cli.temp_dir);

    match cli.command {
        Command::Plan(args) => {
            let config = load_build_config(&cli.source, args)?;
            println!("==> Planning {}", cli.source.display());
            let ctx = process::plan_build(&RustBackend::new(), paths, config)?;
            output::print_plan(&ctx);
        }
        Command::Build(args) => {
            let config = load_build_config(&cli.source, args)?;
            init_thread_pool(&config.processing);

            println!("==> Stage 1: Planning {}", cli.source.display());
            let ctx = process::plan_build(&RustBackend::new(), paths, config)?;

            println!("==> Stage 2: Building renditions → {}", cli.output.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    let diagnostic = output::is_diagnostic(&event);
                    for line in output::format_build_event(&event) {
                        if diagnostic {
                            eprintln!("{}", line);
                        } else {
                            println!("{}", line);
                        }
                    }
                }
            });
            let result = process::build(&ctx, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let report = result?;

            output::print_build_summary(&report, &cli.output);
            if !report.fragments.is_success() {
                return Err(format!(
                    "{} of {} fragments failed",
                    report.fragments.failed.len(),
                    report.images
                )
                .into());
            }
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `<source>/config.toml` over stock defaults, then command-line overrides.
fn load_build_config(
    source: &std::path::Path,
    args: BuildArgs,
) -> Result<config::BuildConfig, config::ConfigError> {
    let alt = match &args.alt_text {
        Some(path) => config::load_alt_table(path)?,
        None => Default::default(),
    };
    config::load_config(source)?.with_overrides(Overrides {
        base_width: args.base_width,
        class_name: args.class_name,
        lazyload: args.lazyload,
        no_webp: args.no_webp,
        alt,
    })
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
