//! The `-a` report: Intel-syntax disassembly of every executable section,
//! with function labels taken from the symbol tables.

use std::collections::HashMap;

use anyhow::bail;
use colored::Colorize as _;

use crate::{
    disasm::{Bitness, Disassemble},
    elf::ElfImage,
};

pub fn print_disassembly(
    data: &[u8],
    image: &ElfImage,
    disasm: &dyn Disassemble,
) -> anyhow::Result<()> {
    if !image.machine.is_x86() {
        bail!(
            "disassembly is only supported for x86/x86-64 images (machine is {})",
            image.machine
        );
    }
    let bitness = Bitness::from(image.class);

    // label function entry points in the listing
    let labels: HashMap<u64, &str> = image
        .function_symbols()
        .map(|sym| (sym.value, sym.name.as_str()))
        .collect();

    let mut found_code = false;
    for section in &image.section_headers {
        if !section.flags.executable() {
            continue;
        }
        let Some(range) = section.file_range() else {
            continue;
        };
        let Some(bytes) = data.get(range) else {
            continue;
        };
        found_code = true;

        println!(
            "{}",
            format!(
                "=== {} (0x{:x}, {} bytes) ===",
                section.name, section.addr, section.size
            )
            .blue()
        );

        for insn in disasm.disassemble(bytes, section.addr, bitness)? {
            if let Some(label) = labels.get(&insn.address) {
                println!("{}", format!("<{label}>:").green());
            }
            println!(
                "\t{} {} {}",
                format!("0x{:x}:", insn.address).magenta(),
                insn.mnemonic.cyan(),
                insn.operands
            );
        }
        println!();
    }

    if !found_code {
        bail!("no executable sections found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disasm::CapstoneDisassembler;
    use crate::elf::fixtures::sample_elf64;

    #[test]
    fn listing_accepts_the_canonical_image() {
        let data = sample_elf64();
        let image = ElfImage::parse(&data).unwrap();
        print_disassembly(&data, &image, &CapstoneDisassembler).unwrap();
    }

    #[test]
    fn listing_rejects_foreign_machines() {
        let mut data = sample_elf64();
        data[18..20].copy_from_slice(&40u16.to_le_bytes()); // EM_ARM
        let image = ElfImage::parse(&data).unwrap();
        assert!(print_disassembly(&data, &image, &CapstoneDisassembler).is_err());
    }
}
