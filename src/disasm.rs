//! Thin adapter around the capstone x86 decoder.

use capstone::arch::x86::{ArchMode, ArchSyntax};
use capstone::prelude::*;
use thiserror::Error;

use crate::elf::types::Class;

/// Decode width for the x86 decoder and the tracee's word size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bitness {
    Bits32,
    Bits64,
}

impl Bitness {
    /// Natural machine word in bytes.
    pub fn word_size(self) -> u64 {
        match self {
            Bitness::Bits32 => 4,
            Bitness::Bits64 => 8,
        }
    }
}

impl From<Class> for Bitness {
    fn from(class: Class) -> Self {
        match class {
            Class::Elf32 => Bitness::Bits32,
            Class::Elf64 => Bitness::Bits64,
        }
    }
}

/// One decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Absolute address of the instruction.
    pub address: u64,
    pub mnemonic: String,
    pub operands: String,
    /// Encoded length in bytes.
    pub length: usize,
    pub is_return: bool,
}

#[derive(Debug, Error)]
pub enum DisasmError {
    #[error("disassembler setup failed: {0}")]
    Backend(capstone::Error),
}

/// Decoding capability, separated out so the debugger's step-over logic can
/// be exercised with a canned decoder.
pub trait Disassemble {
    /// Decode `bytes` as they would appear at `start_addr`.
    ///
    /// The sequence ends when the buffer is exhausted or when decoding fails;
    /// a trailing undecodable suffix is not an error. Never mutates `bytes`.
    fn disassemble(
        &self,
        bytes: &[u8],
        start_addr: u64,
        bitness: Bitness,
    ) -> Result<Vec<Instruction>, DisasmError>;
}

#[derive(Debug, Default)]
pub struct CapstoneDisassembler;

impl Disassemble for CapstoneDisassembler {
    fn disassemble(
        &self,
        bytes: &[u8],
        start_addr: u64,
        bitness: Bitness,
    ) -> Result<Vec<Instruction>, DisasmError> {
        let mode = match bitness {
            Bitness::Bits32 => ArchMode::Mode32,
            Bitness::Bits64 => ArchMode::Mode64,
        };
        let cs = Capstone::new()
            .x86()
            .mode(mode)
            .syntax(ArchSyntax::Intel)
            .build()
            .map_err(DisasmError::Backend)?;

        // capstone stops at the first undecodable byte, which is exactly the
        // termination contract we want
        let decoded = cs
            .disasm_all(bytes, start_addr)
            .map_err(DisasmError::Backend)?;

        Ok(decoded
            .iter()
            .map(|insn| {
                let mnemonic = insn.mnemonic().unwrap_or_default().to_owned();
                let is_return = is_return_mnemonic(&mnemonic);
                Instruction {
                    address: insn.address(),
                    operands: insn.op_str().unwrap_or_default().to_owned(),
                    length: insn.bytes().len(),
                    mnemonic,
                    is_return,
                }
            })
            .collect())
    }
}

fn is_return_mnemonic(mnemonic: &str) -> bool {
    matches!(mnemonic, "ret" | "retn" | "retf" | "iret" | "iretd" | "iretq")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decodes_simple_sequence() {
        // nop; ret
        let bytes = [0x90, 0xc3];
        let insns = CapstoneDisassembler
            .disassemble(&bytes, 0x401000, Bitness::Bits64)
            .unwrap();

        assert_eq!(insns.len(), 2);
        assert_eq!(insns[0].address, 0x401000);
        assert_eq!(insns[0].mnemonic, "nop");
        assert_eq!(insns[0].length, 1);
        assert!(!insns[0].is_return);
        assert_eq!(insns[1].mnemonic, "ret");
        assert!(insns[1].is_return);
    }

    #[test]
    fn decode_failure_terminates_the_sequence() {
        // nop followed by a lone 0x0f prefix that can't decode
        let bytes = [0x90, 0x0f];
        let insns = CapstoneDisassembler
            .disassemble(&bytes, 0, Bitness::Bits64)
            .unwrap();

        assert_eq!(insns.len(), 1);
        assert_eq!(insns[0].mnemonic, "nop");
    }

    #[test]
    fn call_length_covers_the_rel32_form() {
        // call rel32 is 5 bytes
        let bytes = [0xe8, 0x10, 0x00, 0x00, 0x00];
        let insns = CapstoneDisassembler
            .disassemble(&bytes, 0x40115a, Bitness::Bits64)
            .unwrap();

        assert_eq!(insns[0].mnemonic, "call");
        assert_eq!(insns[0].length, 5);
    }
}
