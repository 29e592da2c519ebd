use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use graph_contract::MergeStrategy;
use std::io::Write;
use std::path::PathBuf;

mod command;

#[derive(Parser)]
#[command(name = "graphctl")]
#[command(about = "Validate, inspect, render and merge graph transfer files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings and errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a transfer file loads
    Validate(FileArgs),

    /// Print a JSON summary of a transfer file
    Inspect(FileArgs),

    /// Render a transfer file as a Mermaid flowchart
    Render(RenderArgs),

    /// Extract the neighbourhood of one node
    Subgraph(SubgraphArgs),

    /// Merge several transfer files into one
    Merge(MergeArgs),
}

#[derive(Args)]
struct FileArgs {
    /// Transfer file (JSON)
    file: PathBuf,
}

#[derive(Args)]
struct RenderArgs {
    /// Transfer file (JSON)
    file: PathBuf,

    /// Layout direction: TD, TB, BT, LR or RL
    #[arg(long, short = 'd', default_value = "TD")]
    direction: String,

    /// Colour for a label, as LABEL=COLOR (repeatable)
    #[arg(long = "color", value_name = "LABEL=COLOR")]
    colors: Vec<String>,

    /// Property used as the node caption
    #[arg(long, default_value = "name")]
    name_property: String,
}

#[derive(Args)]
struct SubgraphArgs {
    /// Transfer file (JSON)
    file: PathBuf,

    /// Root node id
    #[arg(long)]
    node: String,

    /// Hops to follow from the root
    #[arg(long, default_value_t = 1)]
    depth: usize,

    /// Only admit neighbours with this label (repeatable)
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Write the result here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct MergeArgs {
    /// Transfer files, imported in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Conflict policy on id collision
    #[arg(long, value_enum, default_value_t = StrategyArg::Skip)]
    strategy: StrategyArg,

    /// Write the result here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Skip,
    Overwrite,
    Merge,
}

impl StrategyArg {
    const fn as_domain(self) -> MergeStrategy {
        match self {
            Self::Skip => MergeStrategy::Skip,
            Self::Overwrite => MergeStrategy::Overwrite,
            Self::Merge => MergeStrategy::Merge,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let output = match cli.command {
        Commands::Validate(args) => command::validate(&args.file)?,
        Commands::Inspect(args) => command::inspect(&args.file)?,
        Commands::Render(args) => {
            command::render(&args.file, &args.direction, &args.colors, &args.name_property)?
        }
        Commands::Subgraph(args) => command::subgraph(
            &args.file,
            &args.node,
            args.depth,
            &args.labels,
            args.out.as_deref(),
        )?,
        Commands::Merge(args) => {
            command::merge(&args.files, args.strategy.as_domain(), args.out.as_deref())?
        }
    };

    if !output.is_empty() {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{output}")?;
    }
    Ok(())
}
