use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(about = "An optimising compiler back end for three-address code")]
pub struct Options {
    #[clap(subcommand)]
    pub operation: Operation,
    /// Log more details; may be repeated
    #[clap(short, long, parse(from_occurrences), global = true)]
    pub verbose: usize,
    /// Do not log anything
    #[clap(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Operation {
    /// Check a program for errors
    Check { file: PathBuf },
    /// Optimise a program and print the result
    Optimise { file: PathBuf },
    /// Compile a program to assembly
    Compile {
        file: PathBuf,
        /// Write the assembly to this file instead of standard output
        #[clap(short, long)]
        output: Option<PathBuf>,
        #[clap(flatten)]
        backend: BackendOptions,
    },
    /// Run a program and print its output
    Run {
        file: PathBuf,
        #[clap(flatten)]
        backend: BackendOptions,
    },
}

#[derive(Debug, Args)]
pub struct BackendOptions {
    #[clap(short, long)]
    /// Do not optimise the program first
    no_optimise: bool,
}

impl BackendOptions {
    pub fn optimise(&self) -> bool {
        !self.no_optimise
    }
}
