//! holly-drv - Command-line driver.
//!
//! The pipeline is short: read the script as raw bytes, compile it
//! (lexer and parser run fused, emitting bytecode directly), then hand
//! the function arena and constant pool to the VM with standard output
//! as the `log` sink.
//!
//! Interface: `holly <script>`, one positional argument, no flags.
//! Exit code 0 on a clean run; any sticky error (lexical, parse or
//! runtime) is reported on standard error and exits nonzero.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use holly_util::Handler;
use holly_vm::Vm;

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The script to run.
    pub input: PathBuf,
}

impl Config {
    /// Builds a configuration from command-line arguments (program name
    /// already stripped): exactly one positional path.
    pub fn from_args<I>(args: I) -> Result<Config>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut args = args.into_iter();
        let Some(input) = args.next() else {
            bail!("usage: holly <script>");
        };
        if args.next().is_some() {
            bail!("usage: holly <script>");
        }
        Ok(Config {
            input: PathBuf::from(input),
        })
    }
}

/// One interpreter invocation: configuration plus the diagnostic
/// handler every phase reports into.
pub struct Session {
    pub config: Config,
    pub handler: Handler,
}

impl Session {
    /// Creates a session for `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handler: Handler::new(),
        }
    }

    /// Reads, compiles and runs the configured script.
    pub fn run(&mut self) -> Result<()> {
        let source = std::fs::read(&self.config.input)
            .with_context(|| format!("could not read '{}'", self.config.input.display()))?;

        let mut unit = holly_par::compile(&source, &self.handler);
        if !self.handler.has_errors() {
            let stdout = std::io::stdout();
            let mut vm = Vm::new(&mut unit.arena, &unit.pool, &self.handler, stdout.lock());
            vm.run(unit.global);
        }

        if let Some(diag) = self.handler.first_error() {
            if diag.span.is_dummy() {
                bail!("{}", diag.message);
            }
            bail!("{}: {}", diag.span, diag.message);
        }
        Ok(())
    }
}

/// Entry point shared with `main.rs`.
pub fn run() -> Result<()> {
    let mut args = std::env::args_os();
    args.next(); // program name
    let config = Config::from_args(args)?;
    Session::new(config).run()
}
