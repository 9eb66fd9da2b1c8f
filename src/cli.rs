use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// demotime - step through scripted live-coding demos
#[derive(Parser)]
#[command(name = "demotime")]
#[command(about = "Run scripted demos forwards and backwards from the command line")]
#[command(version)]
pub struct Cli {
    /// Workspace root holding the demo folder
    #[arg(short, long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Engine configuration file (defaults to <workspace>/.demo/demotime.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Dry-run mode: describe every step instead of running it.
    ///
    /// Scripts and terminal commands are printed, not executed. The cursor
    /// still moves so a rehearsal leaves the same state behind.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the next demo
    Next {
        /// Demo file to run from (e.g. .demo/intro.json)
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Run the previous demo
    Previous,
    /// Run the demo with the given id
    Run {
        id: String,
    },
    /// Run a demo by file and position
    Start {
        #[arg(short, long)]
        file: String,
        /// Zero-based position of the demo in the file
        #[arg(short, long, default_value_t = 0)]
        index: usize,
    },
    /// Forget the cursor and every stored state and script value
    Reset,
    /// Show the cursor and what runs next
    Status,
    /// List demo files and their demos
    List,
    /// Interactive presenter loop
    Present,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
