use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cfml-inspect")]
#[command(about = "Inspect tags, scripts and diagnostics of CFML sources")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Print every tag of one file.
    Tags(FileArgs),
    /// Parse the script tags of one file.
    Script(FileArgs),
    /// Summarise every .cfm/.cfc file under a directory.
    Scan(ScanArgs),
}

#[derive(Debug, Args)]
pub(crate) struct FileArgs {
    #[arg(long = "file")]
    pub(crate) file: String,
    #[arg(long = "prefs")]
    pub(crate) prefs: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct ScanArgs {
    #[arg(long = "dir")]
    pub(crate) dir: String,
    #[arg(long = "prefs")]
    pub(crate) prefs: Option<String>,
}
