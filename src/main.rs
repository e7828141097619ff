use clap::Parser as ClapParser;
use colored::Colorize;
use std::process::ExitCode;

use m_interpreter::errors::StaticError;
use m_interpreter::{frontend, RunOutcome};

/**
 * Interpreter for the M matrix language.
 */
#[derive(ClapParser, Debug)]
#[command(name = "m-interpreter", about = "Parse, check and run an M source file")]
struct Cli {
    /** Path to the .m source file to run. */
    source_file: String,
}

const STATIC_ERROR_EXIT: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match frontend::read_source(&cli.source_file) {
        Ok(source) => source,
        Err(_) => {
            println!("Cannot open {} file", cli.source_file);
            return ExitCode::SUCCESS;
        }
    };

    match m_interpreter::run_source_on_worker(&source) {
        RunOutcome::ParseError(message) => {
            eprintln!("{}", message.red());
            ExitCode::from(STATIC_ERROR_EXIT)
        }
        RunOutcome::StaticErrors(errors) => {
            report_static_errors(&errors);
            ExitCode::from(STATIC_ERROR_EXIT)
        }
        RunOutcome::Ran(code) => exit_code_to_exit_code(code),
        RunOutcome::RuntimeError(err) => {
            eprintln!("{}", err.display_line().red());
            ExitCode::FAILURE
        }
    }
}

fn report_static_errors(errors: &[StaticError]) {
    for err in errors {
        eprintln!("{}", err.display_line().red());
    }
}

fn exit_code_to_exit_code(code: i32) -> ExitCode {
    ExitCode::from((code & 0xFF) as u8)
}
