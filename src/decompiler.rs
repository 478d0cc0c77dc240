//! Invocation of an external decompiler over a streamed copy of the binary.

use std::env;
use std::io::Write as _;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use tempfile::NamedTempFile;

use crate::source::BinarySource;

const DEFAULT_DECOMPILER: &str = "retdec-decompiler";

/// Copy the binary to a temporary path, run the decompiler on it and print
/// the recovered source with line numbers. Both temp files are unlinked
/// when their guards drop.
pub fn decompile(source: &mut BinarySource) -> anyhow::Result<()> {
    let mut input = NamedTempFile::new().context("can't create decompiler input file")?;
    let output = NamedTempFile::new().context("can't create decompiler output file")?;

    let mut buffer = [0u8; 8192];
    let mut offset = 0;
    loop {
        let read = source.read(offset, &mut buffer)?;
        if read == 0 {
            break;
        }
        input.write_all(&buffer[..read])?;
        offset += read as u64;
    }
    input.flush()?;

    let decompiler =
        env::var("BASEER_DECOMPILER").unwrap_or_else(|_| DEFAULT_DECOMPILER.to_owned());
    log::info!("running `{decompiler}`, this can take a while");

    let status = Command::new(&decompiler)
        .arg("-o")
        .arg(output.path())
        .arg(input.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("can't run `{decompiler}`"))?;
    if !status.success() {
        bail!("`{decompiler}` failed with {status}");
    }

    let code = std::fs::read_to_string(output.path())
        .context("can't read the decompiler's output")?;
    print_with_line_numbers(&code);
    Ok(())
}

fn print_with_line_numbers(code: &str) {
    for (index, line) in code.lines().enumerate() {
        println!("{:4} |  {line}", index + 1);
    }
}
