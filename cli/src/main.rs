mod cli;

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;

use cli::{Args, Format};
use ttlcore::{parse, N3pEmitter, NTriplesEmitter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    run(Args::parse())
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) if path != Path::new("-") => {
            Box::new(BufWriter::new(File::create(path).with_context(|| {
                format!("creating output file {}", path.display())
            })?))
        }
        _ => Box::new(BufWriter::new(io::stdout())),
    };

    let inputs: Vec<String> = if args.files.is_empty() {
        vec!["-".to_string()]
    } else {
        args.files.clone()
    };

    let mut had_error = false;
    for input_path in &inputs {
        let content = read_input(input_path)?;
        let base = resolve_base(&args.base, input_path)?;
        tracing::debug!(input = %input_path, %base, "parsing document");

        let result = drive_parse(&content, &base, args.format, &mut out);
        if let Err(e) = result {
            tracing::warn!(input = %input_path, error = %e, "parse failed");
            eprintln!("{input_path}: {e}");
            had_error = true;
        }
    }

    out.flush().context("flushing output")?;

    if had_error {
        bail!("one or more input documents failed to parse");
    }
    Ok(())
}

fn drive_parse(content: &str, base: &str, format: Format, out: &mut Box<dyn Write>) -> anyhow::Result<()> {
    match format {
        Format::Nt => {
            let mut emitter = NTriplesEmitter::new(&mut *out);
            parse(content, base, &mut emitter)?;
        }
        Format::N3p => {
            let mut emitter = N3pEmitter::new(&mut *out);
            parse(content, base, &mut emitter)?;
        }
        Format::N3pRdiv => {
            let mut emitter = N3pEmitter::with_rdiv(&mut *out);
            parse(content, base, &mut emitter)?;
        }
    }
    Ok(())
}

fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
    }
}

fn resolve_base(explicit: &Option<String>, input_path: &str) -> anyhow::Result<String> {
    if let Some(base) = explicit {
        return Ok(base.clone());
    }
    if input_path == "-" {
        return Ok("urn:x-default-base:".to_string());
    }
    let absolute = std::fs::canonicalize(input_path)
        .with_context(|| format!("resolving base IRI for {input_path}"))?;
    Ok(format!("file://{}", absolute.display()))
}
