use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use labelcodec::zpl;
use owo_colors::OwoColorize;
use rayon::prelude::*;

/// Re-encodes the ZPL GRF graphics in one or more print-stream files,
/// applying the barcode-bar widening pass, and writes the result back out
/// with a `.optimised` suffix next to the input.
#[derive(Parser)]
struct Args {
    files: Vec<PathBuf>,

    /// Skip the barcode-bar widening pass.
    #[arg(long)]
    no_barcode_optimise: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let failures: usize = args
        .files
        .par_iter()
        .map(|file| match process_file(file, !args.no_barcode_optimise) {
            Ok(output_path) => {
                println!(
                    "{} \"{}\" -> \"{}\"",
                    "Success".green().bold(),
                    file.to_string_lossy(),
                    output_path.to_string_lossy()
                );
                0
            }
            Err(e) => {
                println!(
                    "{} \"{}\": {}",
                    " Failed".red().bold(),
                    file.to_string_lossy(),
                    e
                );
                1
            }
        })
        .sum();

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn process_file(file: &PathBuf, barcode_optimise: bool) -> io::Result<PathBuf> {
    let contents = fs::read_to_string(file)?;

    let rewritten = zpl::replace_records(&contents, |mut record| {
        if barcode_optimise {
            record.bitmap = labelcodec::optimise_barcodes(
                &record.bitmap,
                labelcodec::BarcodeOptions::default(),
            );
        }
        record
    })
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let output_path = {
        let mut tmp = file.clone();
        let stem = tmp
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        tmp.set_file_name(format!("{stem}.optimised.zpl"));
        tmp
    };

    let mut out = fs::File::create(&output_path)?;
    out.write_all(rewritten.as_bytes())?;

    Ok(output_path)
}
