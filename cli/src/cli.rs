use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Translate Turtle documents into N-Triples or N3P.
#[derive(Parser, Debug)]
#[command(name = "ttlcore", version, about, long_about = None)]
pub struct Args {
    /// Base IRI used to resolve relative references.
    ///
    /// Defaults to a `file://` IRI derived from the first input path, or
    /// `urn:x-default-base:` when reading from stdin with no base given.
    #[arg(short = 'b', long = "base")]
    pub base: Option<String>,

    /// Output file. Omitted or `-` means stdout.
    #[arg(short = 'o', long = "output", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Output format.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Nt)]
    pub format: Format,

    /// Input files. `-` or no files at all reads from stdin.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub files: Vec<String>,
}

/// Output format selection for [`Args::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// N-Triples, one line per triple.
    Nt,
    /// N3P, decimals as Prolog floats.
    N3p,
    /// N3P, decimals as Prolog `rdiv` rationals.
    #[value(name = "n3p-rdiv")]
    N3pRdiv,
}
