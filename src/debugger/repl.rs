//! Prompt loop for a debug session.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use colored::Colorize as _;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Editor, Helper, Highlighter, Hinter, Validator};
use signal_hook::consts::signal;

use crate::disasm::CapstoneDisassembler;
use crate::render;

use super::command::{self, CommandError, Reaction};
use super::Debugger;

const VERBS: &[&str] = &[
    "bp", "dp", "lp", "si", "so", "c", "x", "set", "i", "vmmap", "h", "q",
];

#[derive(Helper, Highlighter, Hinter, Validator)]
struct PromptHelper;

impl Completer for PromptHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let prefix = &line[..pos];
        if prefix.contains(' ') {
            // arguments are addresses, symbols or ids; nothing to offer
            return Ok((pos, Vec::new()));
        }
        let matches = VERBS
            .iter()
            .filter(|verb| verb.starts_with(prefix))
            .map(|verb| verb.to_string())
            .collect();
        Ok((0, matches))
    }
}

/// Launch the tracee from the in-memory blob and drive the command loop
/// until the user quits or input ends.
pub fn run(image_bytes: &[u8], name: &str, args: &[String]) -> anyhow::Result<()> {
    // an interrupt while the tracee runs must stop the session, not kill it
    let interrupted = Arc::new(AtomicBool::new(false));
    let sig_id = signal_hook::flag::register(signal::SIGINT, interrupted)?;

    let (mut debugger, event) =
        Debugger::launch(image_bytes, name, args, Box::new(CapstoneDisassembler))?;
    render::info(&format!(
        "debugging `{name}` ({}), entry at 0x{:x}, base 0x{:x}",
        debugger.image().class,
        debugger.entry_va(),
        debugger.load_base(),
    ));
    render::print_stop_event(&event);

    let mut editor: Editor<PromptHelper, DefaultHistory> = Editor::new()?;
    editor.set_helper(Some(PromptHelper));

    let prompt = format!("Baseer-{}-> ", "DBG".blue().bold());
    loop {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                debugger.quit();
                break;
            }
            Err(err) => return Err(err.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        let parsed = match command::parse(&line) {
            Ok(parsed) => parsed,
            Err(CommandError::Empty) => continue,
            Err(err) => {
                render::error(&err.to_string());
                render::print_help();
                continue;
            }
        };

        match command::apply(&mut debugger, &parsed) {
            Ok(Reaction::Stay) => {}
            Ok(Reaction::Exit) => break,
            Ok(Reaction::AwaitStop) => match debugger.await_stop() {
                Ok(event) => render::print_stop_event(&event),
                Err(err) => render::error(&err.to_string()),
            },
            Err(err) => render::error(&err.to_string()),
        }
    }

    signal_hook::low_level::unregister(sig_id);
    Ok(())
}
