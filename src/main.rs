use std::path::PathBuf;

use clap::Parser;

use minijava::compile::compile_all;
use minijava::infra::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Compiles MiniJava sources to LLVM IR")]
struct Args {
    /// MiniJava source files, each compiled to a sibling `.ll` file
    #[arg(required = true)]
    srcs: Vec<PathBuf>,

    /// Print progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print field and method offsets of every class
    #[arg(long)]
    offsets: bool,

    /// Write all `.ll` files into this directory instead
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    compile_all(&args.srcs, args.out_dir.as_deref(), args.verbose, args.offsets)
}
