//! One interpreter session: scan → parse → resolve → interpret.
//!
//! A [`Lox`] keeps its interpreter (and therefore its globals) between calls
//! to [`Lox::run`], which is what a REPL needs; a script driver calls `run`
//! once.

use std::io::{self, Write};

use log::{debug, info};

use crate::error::LoxError;
use crate::interpreter::{ExecMode, Interpreter};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner;

/// What happened during one [`Lox::run`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunResult {
    /// Scan, parse and resolve diagnostics.  Non‑empty means nothing ran.
    pub static_errors: Vec<LoxError>,

    /// The fault that aborted evaluation, if any.
    pub runtime_error: Option<LoxError>,

    /// REPL mode only: display form of each bare top‑level expression
    /// statement that was evaluated, in order.
    pub values: Vec<String>,
}

impl RunResult {
    pub fn had_static_error(&self) -> bool {
        !self.static_errors.is_empty()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.runtime_error.is_some()
    }

    /// All diagnostics in report order.
    pub fn errors(&self) -> impl Iterator<Item = &LoxError> {
        self.static_errors.iter().chain(self.runtime_error.iter())
    }
}

pub struct Lox<W: Write = io::Stdout> {
    interpreter: Interpreter<W>,

    /// First expression id for the next compilation unit.
    next_id: usize,
}

impl Lox<io::Stdout> {
    pub fn stdout(mode: ExecMode) -> Self {
        Self {
            interpreter: Interpreter::stdout(mode),
            next_id: 0,
        }
    }
}

impl<W: Write> Lox<W> {
    pub fn new(out: W, mode: ExecMode) -> Self {
        Self {
            interpreter: Interpreter::new(out, mode),
            next_id: 0,
        }
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }

    /// Run one compilation unit.
    pub fn run(&mut self, source: &str) -> RunResult {
        info!("Running {} byte(s) of source", source.len());

        let mut result = RunResult::default();

        let (tokens, scan_errors) = scanner::scan(source);
        result.static_errors.extend(scan_errors);

        let mut parser = Parser::new(&tokens).with_first_id(self.next_id);
        let parsed = parser.parse();
        self.next_id = parser.next_id();

        let statements = match parsed {
            Ok(statements) => statements,
            Err(errors) => {
                result.static_errors.extend(errors);
                return result;
            }
        };

        // Scan errors still block evaluation, but resolving gives the user
        // the remaining diagnostics in one go.
        match Resolver::new().resolve(&statements) {
            Ok(locals) if result.static_errors.is_empty() => self.interpreter.resolve(locals),
            Ok(_) => return result,
            Err(errors) => {
                result.static_errors.extend(errors);
                return result;
            }
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            debug!("Runtime fault: {}", e);
            result.runtime_error = Some(e);
        }

        result.values = self
            .interpreter
            .take_echoed()
            .iter()
            .map(|v| v.to_string())
            .collect();

        result
    }
}
