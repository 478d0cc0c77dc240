//! The interactive debugger's state machine.
//!
//! Owns the parsed image, the breakpoint store, the symbol index and the
//! tracee; implements entry-point trapping, breakpoint hit resolution,
//! continue/single-step/step-over and the introspection operations the
//! command dispatcher exposes.

pub mod command;
pub mod repl;

use nix::sys::signal::Signal;
use thiserror::Error;

use crate::{
    breakpoints::{Breakpoint, BreakpointStore, DuplicateAddress},
    disasm::{Bitness, Disassemble, DisasmError, Instruction},
    elf::{types::FileType, ElfError, ElfImage},
    tracee::{parse_load_base, StopReason, Tracee, REGISTER_NAMES},
};

pub use command::BreakTarget;

/// EFLAGS bits shown in the stop context.
pub const FLAG_BITS: &[(&str, u32)] = &[
    ("CF", 0),
    ("PF", 2),
    ("AF", 4),
    ("ZF", 6),
    ("SF", 7),
    ("DF", 10),
    ("OF", 11),
];

/// Bytes of code fetched ahead of the instruction pointer for display and
/// step-over decoding.
const CODE_WINDOW: usize = 160;

/// Replace the low byte of `orig` with the x86 trap opcode, keeping the rest
/// of the word so longer instructions at the address stay intact.
fn trap_word(orig: u64) -> u64 {
    (orig & !0xff) | 0xcc
}

#[derive(Debug, Error)]
pub enum DebugError {
    #[error(transparent)]
    Parse(#[from] ElfError),
    #[error(transparent)]
    Trace(#[from] crate::tracee::TraceError),
    #[error(transparent)]
    Disasm(#[from] DisasmError),
    #[error(transparent)]
    Duplicate(#[from] DuplicateAddress),
    #[error("undefined symbol `{0}`")]
    UnknownSymbol(String),
    #[error("breakpoint with id {0} not found")]
    UnknownBreakpoint(u32),
    #[error("can't decode the instruction at {0:#x}")]
    Undecodable(u64),
    #[error("the tracee has exited; only `q` and read-only commands are valid")]
    Detached,
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}

/// A name resolved to its runtime address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub address: u64,
}

/// Snapshot of the stopped tracee, assembled by the core and colorized by
/// the renderer.
pub struct StopContext {
    pub bitness: Bitness,
    pub pc: u64,
    /// `(display name, value)` in context order.
    pub registers: Vec<(&'static str, u64)>,
    /// `(flag name, set)` for the EFLAGS bits of interest.
    pub flags: Vec<(&'static str, bool)>,
    /// Disassembly window starting at `pc`, cut at the first return.
    pub instructions: Vec<Instruction>,
    /// `(address, word)` pairs from the stack pointer upwards.
    pub stack: Vec<(u64, u64)>,
}

/// What a resume ended in.
pub enum StopEvent {
    Stopped(StopContext),
    Signalled(Signal, StopContext),
    Exited(i32),
    Killed(Signal),
}

pub struct Debugger {
    image: ElfImage,
    store: BreakpointStore,
    symbols: Vec<SymbolEntry>,
    tracee: Tracee,
    disasm: Box<dyn Disassemble>,
    bitness: Bitness,
    load_base: u64,
    entry_va: u64,
    maps_text: String,
    /// True when the last resume was a single-step; a trap right after one
    /// must not be treated as a breakpoint hit.
    last_was_step: bool,
    detached: bool,
}

impl Debugger {
    /// Parse `image_bytes`, spawn the tracee and run it to the entry point.
    pub fn launch(
        image_bytes: &[u8],
        name: &str,
        args: &[String],
        disasm: Box<dyn Disassemble>,
    ) -> Result<(Self, StopEvent), DebugError> {
        let image = ElfImage::parse(image_bytes)?;
        let bitness = Bitness::from(image.class);

        let tracee = Tracee::spawn(image_bytes, name, args, bitness)?;
        let maps_text = tracee.read_maps()?;
        let load_base =
            parse_load_base(&maps_text).ok_or(DebugError::Internal("maps view has no base"))?;
        log::debug!("load base {load_base:#x}");

        let mut entry_va = if image.file_type == FileType::Executable {
            image.entry
        } else {
            load_base.wrapping_add(image.entry)
        };
        if bitness == Bitness::Bits32 {
            entry_va &= 0xffff_ffff;
        }

        let symbols = build_symbol_index(&image, load_base);
        log::debug!("indexed {} function symbols", symbols.len());

        let mut debugger = Debugger {
            image,
            store: BreakpointStore::new(),
            symbols,
            tracee,
            disasm,
            bitness,
            load_base,
            entry_va,
            maps_text,
            last_was_step: false,
            detached: false,
        };
        let event = debugger.run_to_entry()?;
        Ok((debugger, event))
    }

    /// Plant a one-shot trap at the entry point, continue into it, restore
    /// the original word and rewind the instruction pointer.
    fn run_to_entry(&mut self) -> Result<StopEvent, DebugError> {
        let entry = self.entry_va;
        let orig = self.tracee.read_word(entry)?;
        self.tracee.write_word(entry, trap_word(orig))?;
        self.tracee.cont()?;

        match self.tracee.wait()? {
            StopReason::Trap => {
                let mut regs = self.tracee.read_registers()?;
                self.tracee.write_word(entry, orig)?;
                regs.set_instruction_pointer(entry);
                self.tracee.write_registers(&regs)?;
                Ok(StopEvent::Stopped(self.stop_context()?))
            }
            StopReason::Exited(code) => {
                self.detached = true;
                Ok(StopEvent::Exited(code))
            }
            StopReason::Killed(sig) => {
                self.detached = true;
                Ok(StopEvent::Killed(sig))
            }
            StopReason::Signalled(sig) => Ok(StopEvent::Signalled(sig, self.stop_context()?)),
        }
    }

    pub fn bitness(&self) -> Bitness {
        self.bitness
    }

    pub fn load_base(&self) -> u64 {
        self.load_base
    }

    pub fn entry_va(&self) -> u64 {
        self.entry_va
    }

    pub fn image(&self) -> &ElfImage {
        &self.image
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.store.iter()
    }

    pub fn symbols(&self) -> &[SymbolEntry] {
        &self.symbols
    }

    fn ensure_attached(&self) -> Result<(), DebugError> {
        if self.detached {
            Err(DebugError::Detached)
        } else {
            Ok(())
        }
    }

    /// Register a breakpoint at an address or symbol and plant its trap.
    pub fn set_breakpoint(&mut self, target: &BreakTarget) -> Result<(u32, u64), DebugError> {
        self.ensure_attached()?;
        let addr = match target {
            BreakTarget::Address(addr) => *addr,
            BreakTarget::Symbol(name) => self
                .image
                .resolve_symbol(name, self.load_base)
                .ok_or_else(|| DebugError::UnknownSymbol(name.clone()))?,
        };

        // check before reading: an armed breakpoint's address holds the trap
        // byte, not the original word
        if self.store.find_by_address(addr).is_some() {
            return Err(DuplicateAddress(addr).into());
        }

        let orig = self.tracee.read_word(addr)?;
        self.tracee.write_word(addr, trap_word(orig))?;
        let id = self
            .store
            .insert(addr, orig)
            .map_err(DebugError::Duplicate)?;
        log::debug!("breakpoint {id} armed at {addr:#x}");
        Ok((id, addr))
    }

    /// Remove a breakpoint and restore the original word if it is planted.
    pub fn delete_breakpoint(&mut self, id: u32) -> Result<Breakpoint, DebugError> {
        self.ensure_attached()?;
        let bp = self
            .store
            .remove(id)
            .ok_or(DebugError::UnknownBreakpoint(id))?;
        if bp.armed {
            self.tracee.write_word(bp.address, bp.original_word)?;
        }
        Ok(bp)
    }

    /// Re-arm every breakpoint except one at the current instruction pointer
    /// (which would trap immediately), then resume.
    pub fn cont(&mut self) -> Result<(), DebugError> {
        self.ensure_attached()?;
        let pc = self.tracee.read_registers()?.instruction_pointer();
        self.arm_all_except(pc)?;
        self.tracee.cont()?;
        self.last_was_step = false;
        Ok(())
    }

    /// Execute one instruction. Breakpoints are not re-armed for the step.
    pub fn single_step(&mut self) -> Result<(), DebugError> {
        self.ensure_attached()?;
        self.tracee.single_step()?;
        self.last_was_step = true;
        Ok(())
    }

    /// Run to the instruction following the current one, skipping over a
    /// call body via a scratch breakpoint that never enters the store.
    pub fn step_over(&mut self) -> Result<StopEvent, DebugError> {
        self.ensure_attached()?;
        let regs = self.tracee.read_registers()?;
        let pc = regs.instruction_pointer();

        let code = self.read_code_window(pc);
        let target = step_over_target(self.disasm.as_ref(), &code, pc, self.bitness)?
            .ok_or(DebugError::Undecodable(pc))?;

        let orig = self.tracee.read_word(target)?;
        self.tracee.write_word(target, trap_word(orig))?;
        self.tracee.cont()?;
        self.last_was_step = false;

        match self.tracee.wait()? {
            StopReason::Trap => {
                self.tracee.write_word(target, orig)?;
                let mut regs = self.tracee.read_registers()?;
                regs.set_instruction_pointer(target);
                self.tracee.write_registers(&regs)?;
                Ok(StopEvent::Stopped(self.stop_context()?))
            }
            StopReason::Exited(code) => {
                self.detached = true;
                Ok(StopEvent::Exited(code))
            }
            StopReason::Killed(sig) => {
                self.detached = true;
                Ok(StopEvent::Killed(sig))
            }
            StopReason::Signalled(sig) => {
                self.tracee.write_word(target, orig)?;
                Ok(StopEvent::Signalled(sig, self.stop_context()?))
            }
        }
    }

    /// Block until the resumed tracee stops, then resolve the stop.
    pub fn await_stop(&mut self) -> Result<StopEvent, DebugError> {
        let reason = self.tracee.wait()?;
        self.handle_stop(reason)
    }

    /// Resolve a wait result per the breakpoint protocol: on a trap at a
    /// user breakpoint, restore the original word and rewind the
    /// instruction pointer to the breakpoint address.
    fn handle_stop(&mut self, reason: StopReason) -> Result<StopEvent, DebugError> {
        match reason {
            StopReason::Trap => {
                let mut regs = self.tracee.read_registers()?;
                let pc = regs.instruction_pointer();

                // x86 delivers the trap with the pc one past the int3 byte
                let hit = if self.last_was_step {
                    None
                } else {
                    self.store
                        .find_by_address(pc.wrapping_sub(1))
                        .map(|bp| (bp.address, bp.original_word))
                };

                if let Some((addr, orig)) = hit {
                    self.tracee.write_word(addr, orig)?;
                    regs.set_instruction_pointer(addr);
                    self.tracee.write_registers(&regs)?;
                }
                self.disarm_all()?;
                Ok(StopEvent::Stopped(self.stop_context()?))
            }
            StopReason::Exited(code) => {
                self.detached = true;
                Ok(StopEvent::Exited(code))
            }
            StopReason::Killed(sig) => {
                self.detached = true;
                Ok(StopEvent::Killed(sig))
            }
            StopReason::Signalled(sig) => Ok(StopEvent::Signalled(sig, self.stop_context()?)),
        }
    }

    /// Current value of a register, by case-folded name.
    pub fn register(&self, name: &str) -> Result<u64, DebugError> {
        self.ensure_attached()?;
        let regs = self.tracee.read_registers()?;
        regs.get(name).ok_or_else(|| {
            DebugError::Trace(crate::tracee::TraceError::UnknownRegister(name.into()))
        })
    }

    /// Read `count` machine words starting at `addr`.
    pub fn examine(&self, addr: u64, count: u64) -> Result<Vec<(u64, u64)>, DebugError> {
        self.ensure_attached()?;
        let word = self.tracee.word_size();
        let mut out = Vec::new();
        for index in 0..count {
            let at = addr.wrapping_add(index * word);
            out.push((at, self.tracee.read_word(at)?));
        }
        Ok(out)
    }

    pub fn set_register(&mut self, name: &str, value: u64) -> Result<(), DebugError> {
        self.ensure_attached()?;
        let mut regs = self.tracee.read_registers()?;
        regs.set(name, value)?;
        self.tracee.write_registers(&regs)?;
        Ok(())
    }

    pub fn set_memory(&mut self, addr: u64, value: u64) -> Result<(), DebugError> {
        self.ensure_attached()?;
        self.tracee.write_word(addr, value)?;
        Ok(())
    }

    /// The memory-map view: re-read while the tracee lives, the last known
    /// text after it is gone.
    pub fn maps(&mut self) -> Result<&str, DebugError> {
        if !self.detached {
            self.maps_text = self.tracee.read_maps()?;
        }
        Ok(&self.maps_text)
    }

    /// Kill the tracee and detach.
    pub fn quit(&mut self) {
        self.tracee.kill();
        self.detached = true;
    }

    /// Snapshot registers, flags, a disassembly window and the top of the
    /// stack for display.
    pub fn stop_context(&self) -> Result<StopContext, DebugError> {
        let regs = self.tracee.read_registers()?;
        let pc = regs.instruction_pointer();

        let code = self.read_code_window(pc);
        let mut instructions = self.disasm.disassemble(&code, pc, self.bitness)?;
        // mirror the interactive context window: stop at the first return or
        // 0x20 bytes past the pc, whichever comes first
        if let Some(cut) = instructions
            .iter()
            .position(|insn| insn.is_return || insn.address >= pc + 0x20)
        {
            instructions.truncate(cut + 1);
        }

        let word = self.tracee.word_size();
        let sp = regs.stack_pointer();
        let mut stack = Vec::with_capacity(10);
        for index in 0..10 {
            let at = sp.wrapping_add(index * word);
            match self.tracee.read_word(at) {
                Ok(value) => stack.push((at, value)),
                Err(_) => break,
            }
        }

        let registers = REGISTER_NAMES
            .iter()
            .map(|(name64, name32)| {
                let display = match self.bitness {
                    Bitness::Bits32 => *name32,
                    Bitness::Bits64 => *name64,
                };
                (display, regs.get(name64).unwrap_or(0))
            })
            .collect();

        let flags = FLAG_BITS
            .iter()
            .map(|(name, bit)| (*name, (regs.flags() >> bit) & 1 == 1))
            .collect();

        Ok(StopContext {
            bitness: self.bitness,
            pc,
            registers,
            flags,
            instructions,
            stack,
        })
    }

    /// Code bytes ahead of `pc`, clamped at the first unmapped word.
    fn read_code_window(&self, pc: u64) -> Vec<u8> {
        let word = self.tracee.word_size();
        let mut out = Vec::with_capacity(CODE_WINDOW);
        let mut addr = pc;
        while out.len() < CODE_WINDOW {
            match self.tracee.read_word(addr) {
                Ok(value) => {
                    out.extend_from_slice(&value.to_le_bytes()[..word as usize]);
                    addr = addr.wrapping_add(word);
                }
                Err(_) => break,
            }
        }
        out
    }

    fn disarm_all(&mut self) -> Result<(), DebugError> {
        for bp in self.store.iter_mut() {
            if bp.armed {
                self.tracee.write_word(bp.address, bp.original_word)?;
                bp.armed = false;
            }
        }
        Ok(())
    }

    fn arm_all_except(&mut self, pc: u64) -> Result<(), DebugError> {
        for bp in self.store.iter_mut() {
            if bp.address == pc {
                // a trap under the current pc would fire before any progress
                if bp.armed {
                    self.tracee.write_word(bp.address, bp.original_word)?;
                    bp.armed = false;
                }
                continue;
            }
            self.tracee.write_word(bp.address, trap_word(bp.original_word))?;
            bp.armed = true;
        }
        Ok(())
    }
}

/// Resolve every defined function symbol against the observed load base.
fn build_symbol_index(image: &ElfImage, load_base: u64) -> Vec<SymbolEntry> {
    image
        .function_symbols()
        .map(|sym| SymbolEntry {
            name: sym.name.clone(),
            address: image.runtime_address(sym.value, load_base),
        })
        .collect()
}

/// Address just past the instruction at `pc`, where the step-over scratch
/// breakpoint goes.
fn step_over_target(
    disasm: &dyn Disassemble,
    code: &[u8],
    pc: u64,
    bitness: Bitness,
) -> Result<Option<u64>, DisasmError> {
    let instructions = disasm.disassemble(code, pc, bitness)?;
    Ok(instructions
        .first()
        .map(|insn| pc + insn.length as u64))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::elf::fixtures::sample_elf64;

    /// Canned decoder that reports fixed-length instructions.
    struct FakeDisassembler {
        lengths: Vec<usize>,
    }

    impl Disassemble for FakeDisassembler {
        fn disassemble(
            &self,
            _bytes: &[u8],
            start_addr: u64,
            _bitness: Bitness,
        ) -> Result<Vec<Instruction>, DisasmError> {
            let mut addr = start_addr;
            Ok(self
                .lengths
                .iter()
                .map(|&length| {
                    let insn = Instruction {
                        address: addr,
                        mnemonic: "fake".into(),
                        operands: String::new(),
                        length,
                        is_return: false,
                    };
                    addr += length as u64;
                    insn
                })
                .collect())
        }
    }

    #[rstest]
    #[case::five_byte_call(vec![5], 0x40115a, Some(0x40115f))]
    #[case::one_byte(vec![1, 3], 0x1000, Some(0x1001))]
    #[case::nothing_decoded(vec![], 0x1000, None)]
    fn scratch_breakpoint_lands_after_the_first_instruction(
        #[case] lengths: Vec<usize>,
        #[case] pc: u64,
        #[case] expected: Option<u64>,
    ) {
        let disasm = FakeDisassembler { lengths };
        let target = step_over_target(&disasm, &[], pc, Bitness::Bits64).unwrap();
        assert_eq!(target, expected);
    }

    #[rstest]
    #[case::preserves_upper_bytes(0x1122_3344_5566_7788, 0x1122_3344_5566_77cc)]
    #[case::idempotent(0x1122_3344_5566_77cc, 0x1122_3344_5566_77cc)]
    #[case::zero(0, 0xcc)]
    fn trap_word_replaces_only_the_low_byte(#[case] orig: u64, #[case] trapped: u64) {
        assert_eq!(trap_word(orig), trapped);
    }

    #[test]
    fn symbol_index_is_absolute_for_fixed_images() {
        let image = ElfImage::parse(&sample_elf64()).unwrap();
        let index = build_symbol_index(&image, 0x7f00_0000_0000);
        assert_eq!(
            index,
            vec![SymbolEntry {
                name: "main".into(),
                address: 0x401010
            }]
        );
    }

    #[test]
    fn symbol_index_adds_the_base_for_pie_images() {
        let mut bytes = sample_elf64();
        bytes[16] = 3; // ET_DYN
        let image = ElfImage::parse(&bytes).unwrap();
        let index = build_symbol_index(&image, 0x5555_0000);
        assert_eq!(index[0].address, 0x5555_0000 + 0x401010);
    }
}
