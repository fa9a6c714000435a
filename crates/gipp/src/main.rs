// SPDX-FileCopyrightText: 2025 xfnw
//
// SPDX-License-Identifier: MPL-2.0

use argh::{FromArgs, from_env};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// select lines holding ip addresses that match any pattern
///
/// patterns use an extended cidr notation: a positive mask is a prefix
/// length, a negative mask is a suffix length, and both may be given.
#[derive(Debug, FromArgs)]
#[argh(help_triggers("-h", "--help"))]
#[argh(example = "{command_name} -e 192.168.100.0/24 hosts.txt")]
#[argh(example = "{command_name} -e 0.0.0.1/-8 -e ::abcd:01ff:fe00:0/-64/24 < hosts.txt")]
#[argh(note = "set GIPP_LOG (e.g. GIPP_LOG=debug) to see what gipp is doing")]
struct Opt {
    /// pattern to match, may be repeated
    #[argh(option, short = 'e')]
    pattern: Vec<String>,
    /// files to read (stdin by default)
    #[argh(positional)]
    files: Vec<PathBuf>,
}

#[derive(Debug, foxerror::FoxError)]
enum Error {
    /// no patterns specified
    NoPatterns,
    /// could not open input
    Open(String, io::Error),
    /// io error
    #[err(from)]
    Io(io::Error),
    /// bad pattern
    #[err(from)]
    Pattern(gipp::Error),
}

fn open_inputs(files: &[PathBuf]) -> Result<Vec<Box<dyn BufRead>>, Error> {
    if files.is_empty() {
        return Ok(vec![Box::new(io::stdin().lock()) as Box<dyn BufRead>]);
    }
    files
        .iter()
        .map(|name| match File::open(name) {
            Ok(f) => Ok(Box::new(BufReader::new(f)) as Box<dyn BufRead>),
            Err(e) => Err(Error::Open(name.display().to_string(), e)),
        })
        .collect()
}

fn run(opt: &Opt) -> Result<(), Error> {
    if opt.pattern.is_empty() {
        return Err(Error::NoPatterns);
    }
    let patterns = gipp::compile_patterns(opt.pattern.as_slice())?;
    let inputs = open_inputs(&opt.files)?;

    let mut out = BufWriter::new(io::stdout().lock());
    let mut written = 0;
    for input in inputs {
        written += gipp::filter_lines(input, &mut out, &patterns)?;
    }
    out.flush()?;

    debug!(written, "done");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GIPP_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let opt: Opt = from_env();
    match run(&opt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gipp: {e}");
            ExitCode::FAILURE
        }
    }
}
