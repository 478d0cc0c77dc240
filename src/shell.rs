//! The `-i` interactive shell: open a binary once, then run the metadata,
//! disassembly, decompiler and debugger tools against it.

use std::path::PathBuf;

use colored::Colorize as _;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Editor, Helper, Highlighter, Hinter, Validator};

use crate::{
    debugger, decompiler,
    disasm::CapstoneDisassembler,
    elf::ElfImage,
    listing,
    magic::FileKind,
    metadata, render,
    source::BinarySource,
};

const COMMANDS: &[&str] = &[
    "open",
    "args",
    "stored-args",
    "metadata",
    "disassembler",
    "decompiler",
    "debugger",
    "close",
    "help",
    "quit",
    "exit",
];

#[derive(Helper, Highlighter, Hinter, Validator)]
struct ShellHelper {
    files: FilenameCompleter,
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        // after `open ` fall through to path completion
        if prefix.starts_with("open ") {
            return self.files.complete(line, pos, ctx);
        }
        let matches = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, matches))
    }
}

struct OpenFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

/// Run the shell until `quit`/`exit` or end of input.
pub fn run() -> anyhow::Result<()> {
    let mut editor: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
    editor.set_helper(Some(ShellHelper {
        files: FilenameCompleter::new(),
    }));

    println!("\nWelcome to Baseer CLI. Type 'help' for commands.");
    let prompt = format!("Baseer-{}-> ", "CLI".red().bold());

    let mut open: Option<OpenFile> = None;
    let mut stored_args: Vec<String> = Vec::new();

    loop {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        let (verb, rest) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "quit" | "exit" => break,
            "help" => print_help(),
            "open" => {
                if rest.is_empty() {
                    render::error("usage: open <file>");
                    continue;
                }
                if open.is_some() {
                    render::error("there is a file already open; use 'close' first");
                    continue;
                }
                let path = PathBuf::from(rest);
                match BinarySource::open(&path) {
                    Ok(source) => {
                        let bytes = source.bytes().expect("memory-backed source").to_vec();
                        println!("Opening file: {}", path.display());
                        open = Some(OpenFile { path, bytes });
                    }
                    Err(err) => render::error(&format!("failed to open file: {err:#}")),
                }
            }
            "close" => {
                if open.take().is_some() {
                    println!("Closed.");
                } else {
                    render::error("no file is currently open");
                }
            }
            "args" => {
                stored_args = rest.split_whitespace().map(str::to_owned).collect();
                if stored_args.is_empty() {
                    render::error("no arguments entered");
                } else {
                    for (index, arg) in stored_args.iter().enumerate() {
                        println!("  [{index}] {arg}");
                    }
                }
            }
            "stored-args" => {
                if stored_args.is_empty() {
                    render::error("no arguments stored");
                } else {
                    println!("Stored arguments:");
                    for (index, arg) in stored_args.iter().enumerate() {
                        println!("  [{index}] {arg}");
                    }
                }
            }
            "metadata" | "disassembler" | "debugger" | "decompiler" => {
                let Some(file) = &open else {
                    render::error("no file opened; use 'open <file>' first");
                    continue;
                };
                let result = run_tool(verb, file, &stored_args);
                if let Err(err) = result {
                    render::error(&format!("{err:#}"));
                }
            }
            other => render::error(&format!("unknown command: {other}")),
        }
    }

    Ok(())
}

fn run_tool(verb: &str, file: &OpenFile, stored_args: &[String]) -> anyhow::Result<()> {
    if verb == "decompiler" {
        let mut source = BinarySource::open_streaming(&file.path)?;
        return decompiler::decompile(&mut source);
    }

    if FileKind::detect(&file.bytes) != FileKind::Elf {
        anyhow::bail!(
            "`{}` is not an ELF file (detected: {})",
            file.path.display(),
            FileKind::detect(&file.bytes).name()
        );
    }

    match verb {
        "metadata" => {
            let image = ElfImage::parse(&file.bytes)?;
            metadata::print_report(&image);
            Ok(())
        }
        "disassembler" => {
            let image = ElfImage::parse(&file.bytes)?;
            listing::print_disassembly(&file.bytes, &image, &CapstoneDisassembler)
        }
        "debugger" => {
            let name = file
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "tracee".to_owned());
            debugger::repl::run(&file.bytes, &name, stored_args)
        }
        _ => unreachable!("checked by the caller"),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  open <file>        - Open a file with baseer");
    println!("  args <a1 a2 ...>   - Add extra arguments to send to tool(s)");
    println!("  stored-args        - Print stored arguments");
    println!("  metadata           - Print metadata of the file");
    println!("  disassembler       - Disassemble the file");
    println!("  decompiler         - Decompile the file");
    println!("  debugger           - Debug the file");
    println!("  close              - Close current file");
    println!("  quit/exit          - Exit the program");
}
