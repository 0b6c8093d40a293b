#![forbid(unsafe_code)]

use std::io::IsTerminal;
use std::process::exit;

use clap::{ArgAction, ArgGroup, Parser};
use tracing::error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;
mod parse;

use crate::commands::Subcommand;

/// Run TIS-80 ROMs from the command line
#[derive(Parser)]
#[clap(name = "tis80", version, author, about, group = ArgGroup::new("format"))]
struct Opt {
    /// Increase the level of verbosity. Can be used multiple times.
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Force colored output. Default is to check if stdout is a terminal
    #[clap(short = 'c', long, global = true, group = "format")]
    color: bool,

    /// Force non-colored output
    #[clap(short = 'C', long, global = true, group = "format")]
    no_color: bool,

    /// Log as JSON lines on stderr
    #[clap(short, long, global = true, group = "format")]
    json: bool,

    #[clap(subcommand)]
    command: Subcommand,
}

impl Opt {
    /// Per-crate levels for a `-v` count. `RUST_LOG` wins when set.
    const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "tis80_emulator=debug,tis80_cli=debug,info",
            2 => "tis80_emulator=trace,tis80_cli=trace,info",
            3 => "tis80_emulator=trace,tis80_cli=trace,debug",
            4..=u8::MAX => "trace",
        }
    }

    fn colors(&self, is_terminal: bool) -> bool {
        match (self.color, self.no_color) {
            (true, _) => true,
            (_, true) => false,
            _ => is_terminal,
        }
    }

    /// Install the global subscriber. Logs go to stderr so that reports on stdout stay clean.
    fn init_tracing(&self, colors: bool) {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.log_filter()))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::Registry::default().with(filter);

        if self.json {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr);
            registry.with(layer).init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .without_time()
                .with_ansi(colors)
                .with_target(false)
                .with_writer(std::io::stderr);
            registry.with(layer).init();
        }
    }
}

fn main() {
    let opt = Opt::parse();
    let colors = opt.colors(std::io::stdout().is_terminal());
    opt.init_tracing(colors);

    if let Err(e) = opt.command.exec(colors) {
        error!("{:#}", e);
        exit(1);
    }
}
