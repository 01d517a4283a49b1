use clap::{Parser, Subcommand, ValueEnum};
use mediapick::config::{self, PickerConfig};
use mediapick::imaging::{RustBackend, SourceRef, probe_dimensions, probe_file_size};
use mediapick::output;
use mediapick::picker::{FilesystemPicker, MimeFilter, PickRequest};
use mediapick::session::PickSession;
use std::path::PathBuf;

fn version_string() -> &'static str {
    if env!("MEDIAPICK_RELEASE_TAG") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("MEDIAPICK_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "mediapick")]
#[command(about = "Normalize picked photos and videos into uniform JSON records")]
#[command(long_about = "\
Normalize picked photos and videos into uniform JSON records

Files and directories given to 'pick' stand in for a native picker
selection. Each image is delivered as follows:

  compressed (default)   re-encoded at JPEG quality 60, downsampled by the
                         legacy bucket policy (longest side 1664 / 4990 / 10240)
  --original             passed through, unless above 10 MP, then resized
                         to 10 MP at quality 95
  --max-width/--max-height
                         both set: delivered images larger than the box are
                         shrunk to fit at quality 90

Videos are never re-encoded. The result is printed as a JSON array; a
selection with nothing usable prints [].

Set RUST_LOG=debug to see every delivery decision.
Run 'mediapick gen-config' to generate a documented mediapick.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./mediapick.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum MimeArg {
    All,
    Image,
    Video,
}

impl From<MimeArg> for MimeFilter {
    fn from(arg: MimeArg) -> Self {
        match arg {
            MimeArg::All => MimeFilter::All,
            MimeArg::Image => MimeFilter::Image,
            MimeArg::Video => MimeFilter::Video,
        }
    }
}

#[derive(clap::Args)]
struct PickArgs {
    /// Deliver originals instead of compressed copies
    #[arg(long)]
    original: bool,

    /// Maximum delivered width (0 = unlimited; needs --max-height too)
    #[arg(long, default_value_t = 0)]
    max_width: u32,

    /// Maximum delivered height (0 = unlimited; needs --max-width too)
    #[arg(long, default_value_t = 0)]
    max_height: u32,

    /// Media kinds to select
    #[arg(long, value_enum, default_value_t = MimeArg::All)]
    mime_type: MimeArg,

    /// Maximum number of assets to select
    #[arg(long, default_value_t = 9)]
    max_select: u32,

    /// Skip files larger than this many bytes (0 = 1 GiB)
    #[arg(long, default_value_t = 0)]
    max_size: u64,

    /// Directory for generated JPEGs (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print per-asset progress to stderr
    #[arg(long, short)]
    verbose: bool,

    /// Files or directories to select from
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Select media from the filesystem and print the JSON result
    Pick(PickArgs),
    /// Show what the delivery policy sees for each image
    Probe {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Print a stock mediapick.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Pick(args) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(dir) = &args.output_dir {
                config.output.dir = dir.to_string_lossy().into_owned();
            }
            init_thread_pool(&config.processing);

            let request = PickRequest {
                mime_type: args.mime_type.into(),
                max_select_num: args.max_select.max(1),
                max_size: args.max_size,
                max_width: args.max_width,
                max_height: args.max_height,
                ..PickRequest::default()
            };

            let backend =
                RustBackend::new().with_bounded_max_alloc(config.decode.bounded_max_alloc);
            let picker = FilesystemPicker::new(args.paths).original(args.original);
            let mut session =
                PickSession::new(backend, config.delivery_settings()).with_picker(picker);

            let printer = if args.verbose {
                let (tx, rx) = std::sync::mpsc::channel();
                session = session.with_events(tx);
                Some(std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_process_event(&event) {
                            eprintln!("{}", line);
                        }
                    }
                }))
            } else {
                None
            };

            let result = session.pick_blocking(request);
            drop(session);
            if let Some(printer) = printer {
                printer.join().ok();
            }

            match result {
                Ok(json) => println!("{}", json),
                Err(e) => return Err(format!("{}: {}", e.code(), e).into()),
            }
        }
        Command::Probe { paths } => {
            let backend = RustBackend::new();
            for raw in paths {
                let source = SourceRef::parse(&raw);
                let dims = probe_dimensions(&backend, &source);
                let size = probe_file_size(&backend, &source);
                output::print_probe(&raw, dims, size);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load an explicit config file, or `./mediapick.toml` when present.
fn load_config(path: Option<&std::path::Path>) -> Result<PickerConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(&std::env::current_dir()?),
    }
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
