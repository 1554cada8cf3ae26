use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Compiler for nested, variable-aware stylesheets.
#[derive(Parser, Debug)]
#[command(name = "csslike", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a stylesheet once.
    Build(BuildArgs),

    /// Recompile a stylesheet whenever it changes on disk.
    Watch(WatchArgs),

    /// Print the token stream of a stylesheet as JSON.
    Tokens(TokensArgs),
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Source stylesheet.
    pub input: PathBuf,

    /// Write CSS here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Minify the output.
    #[arg(long)]
    pub minify: bool,

    /// JSON file with compile options.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub compile: CompileArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub compile: CompileArgs,

    /// Quiet period in milliseconds before a burst of changes triggers a
    /// rebuild.
    #[arg(long, default_value_t = 100)]
    pub debounce_ms: u64,
}

#[derive(Args, Debug)]
pub struct TokensArgs {
    /// Source stylesheet.
    pub input: PathBuf,
}
