use std::process::exit;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use tis80_emulator::constants as C;
use tis80_emulator::{Computer, FileDrive, Status};
use tracing::{info, warn};

use super::heading;
use crate::parse::MemoryRange;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Directory where ROMs are looked up. Defaults to the current directory
    #[clap(long, value_hint = ValueHint::DirPath)]
    rom_dir: Option<Utf8PathBuf>,

    /// Name of the kernel ROM
    #[clap(long, default_value = C::KERNEL_IMAGE)]
    kernel: String,

    /// Stop after this many instructions
    #[clap(long)]
    max_steps: Option<usize>,

    /// Dump a memory range after the run, as `start..end` or `start+length`.
    /// Can be used multiple times.
    #[clap(long, action = ArgAction::Append)]
    dump: Vec<MemoryRange>,

    /// Do not print the screen after the run
    #[clap(long)]
    no_screen: bool,
}

impl RunOpt {
    pub fn exec(self, colors: bool) -> anyhow::Result<()> {
        let drive = match self.rom_dir {
            Some(root) => FileDrive::new(root),
            None => FileDrive::from_env()?,
        };
        info!(root = %drive.root(), kernel = %self.kernel, "Booting");

        let mut computer = match Computer::boot_with(drive, &self.kernel) {
            Ok(computer) => computer,
            Err(e) => {
                let report = miette::Report::new(e);
                eprintln!("{report:?}");
                exit(1);
            }
        };

        info!("Running program");
        if let Some(steps) = self.max_steps {
            let done = computer.run_for(steps)?;
            if !computer.is_halted() {
                warn!(steps = done, "Step budget exhausted before the program halted");
            }
        } else {
            computer.run()?;
        }

        let status = computer.status();
        info!(registers = %status.registers, "End of program");

        print!("{}", report(&status, &self.dump, !self.no_screen, colors));
        Ok(())
    }
}

/// Render the final state of the computer
fn report(status: &Status, dumps: &[MemoryRange], screen: bool, colors: bool) -> String {
    let mut out = String::new();
    out.push_str(&heading("Registers", colors));
    out.push('\n');
    out.push_str(&status.registers.to_string());
    out.push('\n');

    if screen {
        out.push('\n');
        out.push_str(&heading("Screen", colors));
        out.push('\n');
        for row in status.screen_rows() {
            out.push_str(&row);
            out.push('\n');
        }
    }

    for MemoryRange(range) in dumps {
        out.push('\n');
        let title = format!("Memory {:#06x}..{:#06x}", range.start, range.end);
        out.push_str(&heading(&title, colors));
        out.push('\n');
        let dump = status.hexdump(range.clone()).to_string();
        if !dump.is_empty() {
            out.push_str(&dump);
            out.push('\n');
        }
    }

    out
}
