use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan",
    version,
    about = "weave - assemble small protein structures from secondary structure elements joined by searched loops.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Grow a seed (or query) structure with searched fragments, then close it with loops.
    Build(BuildArgs),
    /// Connect the chains of a complete seed structure with loops.
    Loop(LoopArgs),
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory receiving `output_<k>.pdb` files.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Seed structure whose chains start the assembly.
    #[arg(long, value_name = "PDB")]
    pub seed: Option<PathBuf>,

    /// Query structure searched against but not part of the output.
    #[arg(long, value_name = "PDB")]
    pub query: Option<PathBuf>,

    /// Structure that searched fragments and loops must avoid.
    #[arg(long, value_name = "PDB")]
    pub exclusion: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: AssemblyOverrides,
}

/// Arguments for the `loop` subcommand.
#[derive(Args, Debug)]
pub struct LoopArgs {
    /// Seed structure whose chains are connected.
    #[arg(long, required = true, value_name = "PDB")]
    pub seed: PathBuf,

    /// Directory receiving `output_<k>.pdb` files.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Structure that loops must avoid.
    #[arg(long, value_name = "PDB")]
    pub exclusion: Option<PathBuf>,

    /// Fixed chain order, e.g. `2,1,0,3`. Every satisfied order is tried when omitted.
    #[arg(long, value_name = "I,J,...")]
    pub order: Option<String>,

    /// Residues trimmed from the N terminus of each chain for clash tests.
    #[arg(long, value_name = "N,N,...")]
    pub n_trim: Option<String>,

    /// Residues trimmed from the C terminus of each chain for clash tests.
    #[arg(long, value_name = "N,N,...")]
    pub c_trim: Option<String>,

    /// Residues of one chain kept in clash tests, counted after trimming.
    /// Can be used multiple times. Example: -k 1=0,4,5
    #[arg(short = 'k', long = "key-residues", value_name = "CHAIN=I,J,...")]
    pub key_residues: Vec<String>,

    #[command(flatten)]
    pub overrides: AssemblyOverrides,
}

/// Options shared by every assembling subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct AssemblyOverrides {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the number of fragment growth iterations.
    #[arg(short = 'n', long, value_name = "INT")]
    pub iterations: Option<usize>,

    /// Override the C-to-N terminus distance below which two fragments may be joined.
    #[arg(long, value_name = "FLOAT")]
    pub max_nc_dist: Option<f64>,

    /// Override the shortest loop length requested per junction.
    #[arg(long, value_name = "INT")]
    pub min_loop_length: Option<usize>,

    /// Override the longest loop length requested per junction.
    #[arg(long, value_name = "INT")]
    pub max_loop_length: Option<usize>,

    /// Reject fragment sets and assemblies that are not compact enough.
    #[arg(long)]
    pub screen_compactness: bool,

    /// Explore every search hit and seed group instead of only the first.
    #[arg(long)]
    pub explore_all: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S loops.top=100
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_arguments_parse() {
        let cli = Cli::try_parse_from([
            "weave", "-vv", "build", "-o", "out", "--seed", "seed.pdb", "-n", "2",
            "--explore-all", "-S", "loops.top=50", "-S", "screening.clash-distance=3.0",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.seed, Some(PathBuf::from("seed.pdb")));
        assert!(args.query.is_none());
        assert_eq!(args.overrides.iterations, Some(2));
        assert!(args.overrides.explore_all);
        assert_eq!(args.overrides.set_values.len(), 2);
    }

    #[test]
    fn loop_requires_a_seed() {
        assert!(Cli::try_parse_from(["weave", "loop", "-o", "out"]).is_err());
        let cli = Cli::try_parse_from([
            "weave", "loop", "--seed", "s.pdb", "-o", "out", "--order", "2,1,0",
            "--n-trim", "16,0", "-k", "1=0,4",
        ])
        .unwrap();
        let Commands::Loop(args) = cli.command else {
            panic!("expected loop");
        };
        assert_eq!(args.order.as_deref(), Some("2,1,0"));
        assert_eq!(args.n_trim.as_deref(), Some("16,0"));
        assert_eq!(args.key_residues, vec!["1=0,4".to_string()]);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["weave", "-q", "-v", "loop", "--seed", "s", "-o", "o"]).is_err());
    }
}
