use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use krnspec::{critical, diagnostic, trace, Manifest};

struct CliOptions {
    manifest: PathBuf,
    keep_going: bool,
    dry_run: bool,
    tokens: Vec<String>,
}

fn parse_args() -> Result<CliOptions> {
    let mut args = std::env::args().skip(1);
    let mut manifest = None;
    let mut keep_going = false;
    let mut dry_run = false;
    let mut tokens = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--manifest" {
            let value = args
                .next()
                .ok_or_else(|| anyhow!("--manifest requires a value"))?;
            manifest = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--manifest=") {
            manifest = Some(PathBuf::from(value));
        } else if arg == "--keep-going" {
            keep_going = true;
        } else if arg == "--dry-run" {
            dry_run = true;
        } else if arg.starts_with("--") {
            return Err(anyhow!("unknown argument: {}", arg));
        } else {
            tokens.push(arg);
        }
    }
    let manifest = manifest.ok_or_else(|| {
        anyhow!("usage: krngen --manifest <file> [--keep-going] [--dry-run] [token...]")
    })?;
    Ok(CliOptions {
        manifest,
        keep_going,
        dry_run,
        tokens,
    })
}

fn run(options: &CliOptions) -> Result<usize> {
    let manifest = Manifest::load(&options.manifest)?;
    trace!(
        "{} ({}) from {}",
        manifest.function_group(),
        manifest.op(),
        manifest.root().display()
    );
    let selected = manifest.select(&options.tokens)?;
    let total = selected.len();
    let mut failures = 0usize;
    for (idx, selection) in selected.iter().enumerate() {
        let result = manifest.render(selection).and_then(|artifact| {
            println!(
                "[{}/{}] -- generating {} -> {}",
                idx + 1,
                total,
                artifact.label,
                artifact.output.display()
            );
            for diag in &artifact.rendered.diagnostics {
                diagnostic!("{}: {}", artifact.label, diag);
            }
            if options.dry_run {
                trace!("dry run, {} not written", artifact.output.display());
                Ok(())
            } else {
                artifact.write()
            }
        });
        if let Err(err) = result {
            critical!("{}: {:#}", selection.label(), err);
            failures += 1;
            if !options.keep_going {
                break;
            }
        }
    }
    Ok(failures)
}

fn main() -> ExitCode {
    let outcome = parse_args().and_then(|options| run(&options));
    match outcome {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            critical!("{failures} artifact(s) failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            critical!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
