use std::{fs, io, path::Path};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use tacc::{
    codegen,
    commandline::{BackendOptions, Operation, Options},
    error::Diagnostic,
    il::{self, TacProgram},
};

fn main() -> Result<()> {
    let options = Options::parse();
    stderrlog::new()
        .module(module_path!())
        .module("tacc")
        .quiet(options.quiet)
        .verbosity(options.verbose + 1)
        .init()?;

    match options.operation {
        Operation::Check { file } => {
            let program = read_program(&file)?;
            il::validate_program(&program)
                .with_context(|| format!("{} is not well-formed", file.display()))?;
            println!("{} is well-formed", file.display());
        }
        Operation::Optimise { file } => {
            let program = optimise(read_program(&file)?)?;
            print!("{}", program);
        }
        Operation::Compile {
            file,
            output,
            backend,
        } => {
            let program = prepare(&file, &backend)?;
            match output {
                Some(output) => {
                    let assembly = codegen::generate(&program)?;
                    fs::write(&output, assembly.to_string())
                        .with_context(|| format!("failed to write {}", output.display()))?;
                    info!("wrote {}", output.display());
                }
                None => codegen::emit(&program, io::stdout().lock())?,
            }
        }
        Operation::Run { file, backend } => {
            let program = prepare(&file, &backend)?;
            for value in il::interpret(&program)? {
                println!("{}", value);
            }
        }
    }
    Ok(())
}

fn read_program(path: &Path) -> Result<TacProgram> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    il::parse_program(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn prepare(path: &Path, backend: &BackendOptions) -> Result<TacProgram> {
    let program = read_program(path)?;
    if backend.optimise() {
        optimise(program)
    } else {
        il::validate_program(&program)?;
        Ok(program)
    }
}

fn optimise(program: TacProgram) -> Result<TacProgram> {
    let optimised = il::optimise_program(program)?;
    report(&optimised.diagnostics);
    Ok(optimised.code)
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        warn!("{}", diagnostic.describe());
    }
}
