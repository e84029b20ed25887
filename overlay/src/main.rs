use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use pgm_overlay::args::Args;

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let program = std::env::args_os()
        .next()
        .map(|arg0| arg0.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("pgm-overlay"));

    let plan = match args.plan(&program) {
        Ok(plan) => plan,
        Err(err) => Args::command()
            .error(ErrorKind::WrongNumberOfValues, err)
            .exit(),
    };

    match pgm_overlay::run(&plan) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
