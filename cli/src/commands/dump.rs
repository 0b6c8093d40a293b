use std::process::exit;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use tis80_emulator::loader::LoadReport;
use tis80_emulator::{Computer, FileDrive};
use tracing::info;

use super::heading;
use crate::parse::MemoryRange;

#[derive(Parser, Debug)]
pub struct DumpOpt {
    /// Name of the ROM to load
    #[clap(value_hint = ValueHint::FilePath)]
    rom: String,

    /// Directory where ROMs are looked up. Defaults to the current directory
    #[clap(long, value_hint = ValueHint::DirPath)]
    rom_dir: Option<Utf8PathBuf>,

    /// Memory range to dump, as `start..end` or `start+length`. Can be used multiple times.
    /// Defaults to the code section of the ROM
    #[clap(short, long, action = ArgAction::Append)]
    range: Vec<MemoryRange>,
}

impl DumpOpt {
    pub fn exec(self, colors: bool) -> anyhow::Result<()> {
        let drive = match self.rom_dir {
            Some(root) => FileDrive::new(root),
            None => FileDrive::from_env()?,
        };

        let mut computer = Computer::new(drive);
        let report = match computer.load(&self.rom) {
            Ok(report) => report,
            Err(e) => {
                let report = miette::Report::new(e);
                eprintln!("{report:?}");
                exit(1);
            }
        };
        info!(
            rom = %self.rom,
            bytes = report.bytes_written,
            code_start = report.code_start,
            "ROM loaded"
        );

        let ranges = if self.range.is_empty() {
            vec![default_range(&report)]
        } else {
            self.range
        };

        let status = computer.status();
        for (index, MemoryRange(range)) in ranges.into_iter().enumerate() {
            if index > 0 {
                println!();
            }
            let title = format!("Memory {:#06x}..{:#06x}", range.start, range.end);
            println!("{}", heading(&title, colors));
            let dump = status.hexdump(range).to_string();
            if !dump.is_empty() {
                println!("{dump}");
            }
        }

        Ok(())
    }
}

fn default_range(report: &LoadReport) -> MemoryRange {
    let start = usize::from(report.code_start);
    MemoryRange(start..start + report.code_bytes)
}
