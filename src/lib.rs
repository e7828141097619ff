/**
 * M: a small imperative matrix language. This crate exposes the three pipeline
 * stages as a library — parse (`frontend`), check (`semantics`), evaluate
 * (`evaluator`) — so both the CLI binary and integration tests drive the same
 * entry point.
 */

pub mod ast;
pub mod errors;
pub mod evaluator;
pub mod frontend;
pub mod memory;
pub mod semantics;
pub mod symbol_table;
pub mod tensor;
pub mod value;

use ast::Stmt;
use errors::{RuntimeError, StaticError};

/**
 * The outcome of running a whole program end to end.
 */
#[derive(Debug)]
pub enum RunOutcome {
    /** Parsing failed; the source was never checked or run. */
    ParseError(String),
    /** Parsing succeeded but the checker found one or more problems. */
    StaticErrors(Vec<StaticError>),
    /** Checking passed and the program ran to completion with this exit code. */
    Ran(i32),
    /** Checking passed but the program raised a runtime error. */
    RuntimeError(RuntimeError),
}

/**
 * Parses `source`, type/shape-checks it, and returns the AST alongside any
 * static errors found. Parsing failures are reported as a single opaque
 * message, since a malformed parse never reaches the checker.
 */
pub fn check_source(source: &str) -> Result<(Vec<Stmt>, Vec<StaticError>), String> {
    let stmts = frontend::parse_program(source).map_err(|e| e.to_string())?;
    let errors = semantics::Checker::check_program(&stmts);
    Ok((stmts, errors))
}

/**
 * Runs `source` end to end: parse, check, and (only if the checker reports
 * no errors) evaluate. This is the single entry point both `main` and the
 * integration tests use.
 */
pub fn run_source(source: &str) -> RunOutcome {
    let (stmts, errors) = match check_source(source) {
        Ok(pair) => pair,
        Err(message) => return RunOutcome::ParseError(message),
    };

    if !errors.is_empty() {
        return RunOutcome::StaticErrors(errors);
    }

    match evaluator::Evaluator::run(&stmts) {
        Ok(code) => RunOutcome::Ran(code),
        Err(err) => RunOutcome::RuntimeError(err),
    }
}

/**
 * Deeply recursive programs (long chains of nested blocks/expressions) can
 * outgrow a default thread's stack before they outgrow any language-level
 * limit, since the checker and evaluator both recurse with the AST. Runs
 * `run_source` on a worker thread with an enlarged stack, mirroring the
 * reference implementation's raised interpreter recursion limit.
 */
pub fn run_source_on_worker(source: &str) -> RunOutcome {
    const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

    std::thread::scope(|scope| {
        std::thread::Builder::new()
            .stack_size(WORKER_STACK_SIZE)
            .spawn_scoped(scope, || run_source(source))
            .expect("failed to spawn worker thread")
            .join()
            .expect("worker thread panicked")
    })
}
