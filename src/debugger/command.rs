//! Decoding of debugger prompt lines into typed commands, and their
//! application to the core.

use thiserror::Error;

use crate::render;

use super::{DebugError, Debugger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakTarget {
    Address(u64),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetTarget {
    Register { name: String, value: u64 },
    Memory { addr: u64, value: u64 },
}

/// Where `x` starts reading: a literal address or a register's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamineTarget {
    Address(u64),
    Register(String),
}

/// One parsed prompt line. Argument shapes are checked at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Break(BreakTarget),
    DeleteBreak(u32),
    ListBreaks,
    StepInto,
    StepOver,
    Continue,
    Examine { target: ExamineTarget, count: u64 },
    Set(SetTarget),
    ListSymbols,
    Maps,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("wrong command `{0}`")]
    UnknownVerb(String),
    #[error("`{verb}` needs {what}")]
    MissingArgument { verb: &'static str, what: &'static str },
    #[error("malformed argument `{0}`")]
    BadArgument(String),
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut tokens = line.split_whitespace();
    let verb = tokens.next().ok_or(CommandError::Empty)?;

    let command = match verb {
        "bp" => {
            let arg = tokens.next().ok_or(CommandError::MissingArgument {
                verb: "bp",
                what: "an address or symbol name",
            })?;
            Command::Break(parse_break_target(arg)?)
        }
        "dp" => {
            let arg = tokens.next().ok_or(CommandError::MissingArgument {
                verb: "dp",
                what: "a breakpoint id",
            })?;
            let id = arg
                .parse::<u32>()
                .map_err(|_| CommandError::BadArgument(arg.into()))?;
            Command::DeleteBreak(id)
        }
        "lp" => Command::ListBreaks,
        "si" => Command::StepInto,
        "so" => Command::StepOver,
        "c" => Command::Continue,
        "x" => {
            let arg = tokens.next().ok_or(CommandError::MissingArgument {
                verb: "x",
                what: "an address",
            })?;
            let target = if let Some(register) = arg.strip_prefix('$') {
                ExamineTarget::Register(register.to_ascii_lowercase())
            } else {
                ExamineTarget::Address(
                    parse_hex(arg).ok_or_else(|| CommandError::BadArgument(arg.into()))?,
                )
            };
            let count = match tokens.next() {
                Some(raw) => raw
                    .parse::<u64>()
                    .map_err(|_| CommandError::BadArgument(raw.into()))?,
                None => 1,
            };
            Command::Examine { target, count }
        }
        "set" => {
            let arg = tokens.next().ok_or(CommandError::MissingArgument {
                verb: "set",
                what: "`$reg=value` or `0xaddr=value`",
            })?;
            Command::Set(parse_set_target(arg)?)
        }
        "i" => Command::ListSymbols,
        "vmmap" => Command::Maps,
        "h" => Command::Help,
        "q" => Command::Quit,
        other => return Err(CommandError::UnknownVerb(other.into())),
    };
    Ok(command)
}

fn parse_break_target(arg: &str) -> Result<BreakTarget, CommandError> {
    let first = arg.chars().next().unwrap_or('\0');
    if first.is_ascii_alphabetic() || first == '_' {
        Ok(BreakTarget::Symbol(arg.to_owned()))
    } else {
        parse_hex(arg)
            .map(BreakTarget::Address)
            .ok_or_else(|| CommandError::BadArgument(arg.into()))
    }
}

fn parse_set_target(arg: &str) -> Result<SetTarget, CommandError> {
    let (lhs, rhs) = arg
        .split_once('=')
        .ok_or_else(|| CommandError::BadArgument(arg.into()))?;
    let value = parse_value(rhs).ok_or_else(|| CommandError::BadArgument(rhs.into()))?;

    if let Some(register) = lhs.strip_prefix('$') {
        if register.is_empty() {
            return Err(CommandError::BadArgument(arg.into()));
        }
        Ok(SetTarget::Register {
            name: register.to_ascii_lowercase(),
            value,
        })
    } else if lhs.starts_with("0x") || lhs.starts_with("0X") {
        let addr = parse_hex(lhs).ok_or_else(|| CommandError::BadArgument(lhs.into()))?;
        Ok(SetTarget::Memory { addr, value })
    } else {
        Err(CommandError::BadArgument(arg.into()))
    }
}

/// Hex address, `0x` prefix optional.
fn parse_hex(raw: &str) -> Option<u64> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u64::from_str_radix(digits, 16).ok()
}

/// `0x`-prefixed hex or decimal.
fn parse_value(raw: &str) -> Option<u64> {
    if raw.starts_with("0x") || raw.starts_with("0X") {
        parse_hex(raw)
    } else {
        raw.parse::<u64>().ok()
    }
}

/// What the prompt loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Prompt for the next command.
    Stay,
    /// A resume was issued; wait for the tracee to stop first.
    AwaitStop,
    /// Tear the session down.
    Exit,
}

/// Apply a decoded command to the core and print its report.
pub fn apply(debugger: &mut Debugger, command: &Command) -> Result<Reaction, DebugError> {
    match command {
        Command::Break(target) => {
            let (id, addr) = debugger.set_breakpoint(target)?;
            render::info(&format!("breakpoint {id} set at {addr:#x}"));
            Ok(Reaction::Stay)
        }
        Command::DeleteBreak(id) => {
            let bp = debugger.delete_breakpoint(*id)?;
            render::info(&format!("deleted breakpoint at {:#x}", bp.address));
            Ok(Reaction::Stay)
        }
        Command::ListBreaks => {
            render::print_breakpoints(debugger.breakpoints());
            Ok(Reaction::Stay)
        }
        Command::StepInto => {
            debugger.single_step()?;
            Ok(Reaction::AwaitStop)
        }
        Command::StepOver => {
            let event = debugger.step_over()?;
            render::print_stop_event(&event);
            Ok(Reaction::Stay)
        }
        Command::Continue => {
            debugger.cont()?;
            Ok(Reaction::AwaitStop)
        }
        Command::Examine { target, count } => {
            let addr = match target {
                ExamineTarget::Address(addr) => *addr,
                ExamineTarget::Register(name) => debugger.register(name)?,
            };
            let words = debugger.examine(addr, *count)?;
            render::print_words(&words, debugger.bitness());
            Ok(Reaction::Stay)
        }
        Command::Set(SetTarget::Register { name, value }) => {
            debugger.set_register(name, *value)?;
            Ok(Reaction::Stay)
        }
        Command::Set(SetTarget::Memory { addr, value }) => {
            debugger.set_memory(*addr, *value)?;
            Ok(Reaction::Stay)
        }
        Command::ListSymbols => {
            render::print_symbols(debugger.symbols());
            Ok(Reaction::Stay)
        }
        Command::Maps => {
            println!("{}", debugger.maps()?);
            Ok(Reaction::Stay)
        }
        Command::Help => {
            render::print_help();
            Ok(Reaction::Stay)
        }
        Command::Quit => {
            debugger.quit();
            Ok(Reaction::Exit)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bp_hex("bp 0x401120", Command::Break(BreakTarget::Address(0x401120)))]
    #[case::bp_bare_hex("bp 401120", Command::Break(BreakTarget::Address(0x401120)))]
    #[case::bp_symbol("bp main", Command::Break(BreakTarget::Symbol("main".into())))]
    #[case::bp_underscore("bp _start", Command::Break(BreakTarget::Symbol("_start".into())))]
    #[case::dp("dp 3", Command::DeleteBreak(3))]
    #[case::lp("lp", Command::ListBreaks)]
    #[case::si("si", Command::StepInto)]
    #[case::so("so", Command::StepOver)]
    #[case::cont("c", Command::Continue)]
    #[case::x_default_count(
        "x 0x1234",
        Command::Examine { target: ExamineTarget::Address(0x1234), count: 1 }
    )]
    #[case::x_count(
        "x 0x1234 10",
        Command::Examine { target: ExamineTarget::Address(0x1234), count: 10 }
    )]
    #[case::x_register(
        "x $rip 1",
        Command::Examine { target: ExamineTarget::Register("rip".into()), count: 1 }
    )]
    #[case::set_register(
        "set $rax=0x41",
        Command::Set(SetTarget::Register { name: "rax".into(), value: 0x41 })
    )]
    #[case::set_register_folded(
        "set $RAX=65",
        Command::Set(SetTarget::Register { name: "rax".into(), value: 65 })
    )]
    #[case::set_memory(
        "set 0x1234=0x20",
        Command::Set(SetTarget::Memory { addr: 0x1234, value: 0x20 })
    )]
    #[case::symbols("i", Command::ListSymbols)]
    #[case::maps("vmmap", Command::Maps)]
    #[case::help("h", Command::Help)]
    #[case::quit("q", Command::Quit)]
    fn parses_valid_lines(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(parse(line), Ok(expected));
    }

    #[rstest]
    #[case::unknown_verb("frobnicate", CommandError::UnknownVerb("frobnicate".into()))]
    #[case::bp_without_target(
        "bp",
        CommandError::MissingArgument { verb: "bp", what: "an address or symbol name" }
    )]
    #[case::dp_non_numeric("dp one", CommandError::BadArgument("one".into()))]
    #[case::dp_hex_id("dp 0x1", CommandError::BadArgument("0x1".into()))]
    #[case::x_bad_address("x zzz", CommandError::BadArgument("zzz".into()))]
    #[case::x_bad_count("x 0x10 many", CommandError::BadArgument("many".into()))]
    #[case::set_without_assignment("set rax", CommandError::BadArgument("rax".into()))]
    #[case::set_decimal_address("set 1234=1", CommandError::BadArgument("1234=1".into()))]
    #[case::set_bare_dollar("set $=1", CommandError::BadArgument("$=1".into()))]
    #[case::empty("   ", CommandError::Empty)]
    fn rejects_malformed_lines(#[case] line: &str, #[case] expected: CommandError) {
        assert_eq!(parse(line), Err(expected));
    }

    #[test]
    fn values_accept_hex_and_decimal() {
        assert_eq!(parse_value("0x41"), Some(0x41));
        assert_eq!(parse_value("65"), Some(65));
        assert_eq!(parse_value("0xZZ"), None);
    }
}
