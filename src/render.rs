//! Terminal rendering of the debugger's structured events.
//!
//! The core emits plain data (`StopContext`, breakpoint lists, symbol
//! lists); everything ANSI lives here.

use colored::Colorize as _;

use crate::{
    breakpoints::Breakpoint,
    debugger::{StopContext, StopEvent, SymbolEntry},
    disasm::{Bitness, Instruction},
};

/// `verb, description, example` rows of the prompt help, kept free of
/// escape codes so the renderer decides the look.
pub const HELP: &[(&str, &str, &str)] = &[
    ("bp", "set breakpoint", "bp 0x12354 or bp func_name"),
    ("dp", "delete breakpoint", "dp breakpoint_id"),
    ("lp", "list all breakpoints", "lp"),
    ("si", "take one step execution (step into)", "si"),
    ("so", "take one step execution (step over)", "so"),
    ("c", "continue execution", "c"),
    ("x", "examine value in memory", "x 0x1234 10"),
    ("set", "change memory or register value", "set $eax=0x20 or set 0x1234=0x20"),
    ("i", "display functions name and address", "i"),
    ("vmmap", "display maps memory", "vmmap"),
    ("h", "display help commands", "h"),
    ("q", "quit the debugger", "q"),
];

pub fn error(message: &str) {
    println!("{} {message}", "[x]".red());
}

pub fn info(message: &str) {
    println!("{} {message}", "[*]".blue());
}

pub fn print_help() {
    println!();
    print!("{}", format_help());
}

fn format_help() -> String {
    let mut lines = Vec::new();
    for (verb, description, example) in HELP {
        // pad before coloring; escape codes would throw the width off
        lines.push(format!(
            "{}: {description} {{ex: {example}}}",
            format!("{verb:<6}").blue()
        ));
    }
    lines.join("\n") + "\n"
}

pub fn print_stop_event(event: &StopEvent) {
    match event {
        StopEvent::Stopped(ctx) => print_stop_context(ctx),
        StopEvent::Signalled(sig, ctx) => {
            error(&format!("the process stopped on signal {sig}"));
            print_stop_context(ctx);
        }
        StopEvent::Exited(code) => {
            info(&format!("the process has exited with code {code}"));
        }
        StopEvent::Killed(sig) => {
            error(&format!("the process was killed by signal {sig}"));
        }
    }
}

pub fn print_stop_context(ctx: &StopContext) {
    print!("{}", format_stop_context(ctx));
}

fn format_stop_context(ctx: &StopContext) -> String {
    let mut lines = Vec::new();

    lines.push("------------- regs ----------------".yellow().to_string());
    for (name, value) in &ctx.registers {
        lines.push(format!(
            "    {}=> {}",
            format!("{name:<4}").cyan(),
            format_word(*value, ctx.bitness).blue()
        ));
    }

    let flags: Vec<String> = ctx
        .flags
        .iter()
        .map(|(name, set)| {
            if *set {
                name.green().to_string()
            } else {
                name.red().to_string()
            }
        })
        .collect();
    lines.push(format!("FLAGS: {}", flags.join(" ")));

    lines.push("------------- disass ----------------".yellow().to_string());
    for insn in &ctx.instructions {
        let location = if insn.address == ctx.pc {
            format!("    --> 0x{:x}: ", insn.address).green()
        } else {
            format!("        0x{:x}: ", insn.address).magenta()
        };
        lines.push(format!("{location}{}", format_instruction(insn)));
    }

    lines.push("------------- stack ----------------".yellow().to_string());
    for (addr, value) in &ctx.stack {
        lines.push(format!(
            "    {} => {}",
            format!("0x{addr:x}").yellow(),
            format_word(*value, ctx.bitness).blue()
        ));
    }

    lines.join("\n") + "\n"
}

/// Mnemonic-classed coloring of one instruction line.
fn format_instruction(insn: &Instruction) -> String {
    let mnemonic = insn.mnemonic.as_str();
    let colored = if insn.is_return {
        mnemonic.red()
    } else if mnemonic == "call" || mnemonic.starts_with('j') {
        mnemonic.yellow()
    } else if mnemonic == "push" || mnemonic == "pop" {
        mnemonic.green()
    } else {
        mnemonic.cyan()
    };

    if insn.operands.is_empty() {
        colored.to_string()
    } else {
        format!("{colored} {}", insn.operands)
    }
}

/// Memory words from `examine`, two per line like a hexdump.
pub fn print_words(words: &[(u64, u64)], bitness: Bitness) {
    for (index, (addr, value)) in words.iter().enumerate() {
        if index % 2 == 0 {
            print!("{} : ", format!("0x{addr:x}").yellow());
            print!(" {}", format_word(*value, bitness));
        } else {
            println!(" {}", format_word(*value, bitness));
        }
    }
    if words.len() % 2 == 1 {
        println!();
    }
}

pub fn print_breakpoints<'s>(breakpoints: impl Iterator<Item = &'s Breakpoint>) {
    let mut any = false;
    for bp in breakpoints {
        any = true;
        info(&format!("break point id: {} at : 0x{:x}", bp.id, bp.address));
    }
    if !any {
        info("there are no break points");
    }
}

pub fn print_symbols(symbols: &[SymbolEntry]) {
    if symbols.is_empty() {
        info("no function symbols");
        return;
    }
    for sym in symbols {
        println!("function {} 0x{:x}", sym.name.cyan(), sym.address);
    }
}

fn format_word(value: u64, bitness: Bitness) -> String {
    match bitness {
        Bitness::Bits32 => format!("0x{value:08x}"),
        Bitness::Bits64 => format!("0x{value:016x}"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn words_are_sized_by_bitness() {
        assert_eq!(format_word(0x41, Bitness::Bits32), "0x00000041");
        assert_eq!(format_word(0x41, Bitness::Bits64), "0x0000000000000041");
    }

    #[test]
    fn help_covers_every_verb() {
        let verbs: Vec<_> = HELP.iter().map(|(verb, _, _)| *verb).collect();
        assert_eq!(
            verbs,
            ["bp", "dp", "lp", "si", "so", "c", "x", "set", "i", "vmmap", "h", "q"]
        );
    }

    #[test]
    fn help_rendering_is_stable() {
        colored::control::set_override(false);
        insta::assert_snapshot!(format_help(), @r###"
bp    : set breakpoint {ex: bp 0x12354 or bp func_name}
dp    : delete breakpoint {ex: dp breakpoint_id}
lp    : list all breakpoints {ex: lp}
si    : take one step execution (step into) {ex: si}
so    : take one step execution (step over) {ex: so}
c     : continue execution {ex: c}
x     : examine value in memory {ex: x 0x1234 10}
set   : change memory or register value {ex: set $eax=0x20 or set 0x1234=0x20}
i     : display functions name and address {ex: i}
vmmap : display maps memory {ex: vmmap}
h     : display help commands {ex: h}
q     : quit the debugger {ex: q}
"###);
    }

    #[test]
    fn stop_context_rendering_is_stable() {
        colored::control::set_override(false);
        let ctx = StopContext {
            bitness: Bitness::Bits64,
            pc: 0x401000,
            registers: vec![("rax", 0x41), ("rip", 0x401000)],
            flags: vec![("ZF", true), ("CF", false)],
            instructions: vec![
                Instruction {
                    address: 0x401000,
                    mnemonic: "push".into(),
                    operands: "rbp".into(),
                    length: 1,
                    is_return: false,
                },
                Instruction {
                    address: 0x401001,
                    mnemonic: "ret".into(),
                    operands: String::new(),
                    length: 1,
                    is_return: true,
                },
            ],
            stack: vec![(0x7ffd0000, 0xdeadbeef), (0x7ffd0008, 0)],
        };

        insta::assert_snapshot!(format_stop_context(&ctx), @r###"
------------- regs ----------------
    rax => 0x0000000000000041
    rip => 0x0000000000401000
FLAGS: ZF CF
------------- disass ----------------
    --> 0x401000: push rbp
        0x401001: ret
------------- stack ----------------
    0x7ffd0000 => 0x00000000deadbeef
    0x7ffd0008 => 0x0000000000000000
"###);
    }
}
