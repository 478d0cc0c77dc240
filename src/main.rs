mod breakpoints;
mod cli;
mod debugger;
mod decompiler;
mod disasm;
mod elf;
mod listing;
mod magic;
mod metadata;
mod render;
mod shell;
mod source;
mod tracee;

use std::{env, path::Path, process};

use anyhow::bail;

use crate::{
    disasm::CapstoneDisassembler,
    elf::ElfImage,
    magic::FileKind,
    source::BinarySource,
};

fn main() -> anyhow::Result<()> {
    configure_terminal_colorization();

    #[allow(clippy::redundant_closure)]
    cli::handle_arguments().map(|code| process::exit(code))
}

/// Run the selected tool against `path`.
fn run_tool(path: &Path, opts: &cli::Opts) -> anyhow::Result<i32> {
    if !(opts.metadata || opts.disassemble || opts.decompile || opts.debug) {
        bail!("pick a tool: -m (metadata), -a (disassemble), -c (decompile) or -d (debug)");
    }

    // the decompiler streams the file through; everything else wants the
    // whole image in memory
    if opts.decompile {
        let mut source = BinarySource::open_streaming(path)?;
        decompiler::decompile(&mut source)?;
        return Ok(cli::EXIT_SUCCESS);
    }

    let source = BinarySource::open(path)?;
    let bytes = source.bytes().expect("memory-backed source");

    let kind = FileKind::detect(bytes);
    if kind != FileKind::Elf {
        bail!(
            "`{}` is not an ELF file (detected: {})",
            path.display(),
            kind.name()
        );
    }

    if opts.metadata {
        let image = ElfImage::parse(bytes)?;
        metadata::print_report(&image);
    }
    if opts.disassemble {
        let image = ElfImage::parse(bytes)?;
        listing::print_disassembly(bytes, &image, &CapstoneDisassembler)?;
    }
    if opts.debug {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tracee".to_owned());
        debugger::repl::run(bytes, &name, &opts.args)?;
    }

    Ok(cli::EXIT_SUCCESS)
}

fn configure_terminal_colorization() {
    // ! This should be detected by `colored`, but currently is not.
    // See https://github.com/mackwic/colored/issues/108

    if let Ok("dumb") = env::var("TERM").as_deref() {
        colored::control::set_override(false)
    }
}
