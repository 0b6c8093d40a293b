mod completion;
mod dump;
mod run;

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Boot the computer from a kernel ROM and run it
    Run(self::run::RunOpt),

    /// Load a ROM and dump the memory it writes
    Dump(self::dump::DumpOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self, colors: bool) -> anyhow::Result<()> {
        match self {
            Self::Run(opt) => opt.exec(colors),
            Self::Dump(opt) => opt.exec(colors),
            Self::Completion(opt) => opt.exec(),
        }
    }
}

/// A section heading, bold when colors are enabled
pub(crate) fn heading(title: &str, colors: bool) -> String {
    if colors {
        let style = anstyle::Style::new().bold();
        format!("{style}{title}{style:#}")
    } else {
        title.to_owned()
    }
}
