use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use linfuzz::{Corpus, Driver, ExploreMode, FuzzConfig};
use linfuzz_runtime::CpuDevice;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "linfuzz", about = "Differential fuzzer for kernel optimization actions")]
struct Cli {
    /// JSON-lines corpus, one AST per line. The built-in corpus is used when omitted.
    corpus: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Test every action at every depth instead of one random action.
    #[arg(long)]
    beam: bool,

    #[arg(long)]
    depth: Option<usize>,

    /// Skip ASTs whose work size exceeds this.
    #[arg(long)]
    max_size: Option<usize>,

    /// Only consider the first N corpus entries.
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Only test the AST at this corpus index.
    #[arg(long)]
    nth: Option<usize>,

    #[arg(long)]
    rtol: Option<f64>,

    #[arg(long)]
    atol: Option<f64>,

    /// Guard elements appended to the output buffer.
    #[arg(long)]
    red_zone: Option<usize>,

    /// Do not fail variants that write into the guard region.
    #[arg(long, default_value_t = false)]
    no_red_zone_check: bool,

    /// Enable image buffer support on the device.
    #[arg(long, default_value_t = false)]
    images: bool,

    /// Run the device in interpreted mode (no guard region).
    #[arg(long, default_value_t = false)]
    interpreted: bool,
}

impl Cli {
    /// Layer command line flags over `config`.
    fn apply(&self, mut config: FuzzConfig) -> FuzzConfig {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.beam {
            config.mode = ExploreMode::Exhaustive;
        }
        if self.depth.is_some() {
            config.depth = self.depth;
        }
        if let Some(max_size) = self.max_size {
            config.max_size = max_size;
        }
        if self.limit.is_some() {
            config.limit = self.limit;
        }
        if self.nth.is_some() {
            config.nth = self.nth;
        }
        if let Some(rtol) = self.rtol {
            config.rtol = rtol;
        }
        if let Some(atol) = self.atol {
            config.atol = atol;
        }
        if let Some(red_zone) = self.red_zone {
            config.red_zone = red_zone;
        }
        if self.no_red_zone_check {
            config.check_red_zone = false;
        }
        config
    }
}

fn main() -> Result<ExitCode, linfuzz::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = cli.apply(FuzzConfig::from_env()?);
    let corpus = match &cli.corpus {
        Some(path) => Corpus::load(path)?,
        None => Corpus::builtin(),
    };
    tracing::info!(asts = corpus.len(), seed = config.seed, mode = ?config.mode, depth = config.max_depth(), "starting");

    let device = CpuDevice::builder().images(cli.images).compiled(!cli.interpreted).build();
    let report = Driver::new(&device, config).run(corpus.asts());
    println!("{report}");

    Ok(if report.passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
