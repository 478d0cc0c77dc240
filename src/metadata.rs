//! The `-m` report: ELF header, section table, program table and symbol
//! tables, with the legend tables explaining the short names.

use colored::{ColoredString, Colorize as _};

use crate::elf::{types::SegmentKind, ElfImage};

pub fn print_report(image: &ElfImage) {
    println!("{}", "=== ELF File Metadata ===".blue());
    print_header(image);
    if !image.section_headers.is_empty() {
        print_sections(image);
    }
    if !image.program_headers.is_empty() {
        print_segments(image);
    }
    print_symbols(image);
    print_section_legend();
    print_segment_legend();
    println!("{}", "=========================".blue());
}

fn field(name: &str) -> ColoredString {
    format!("{name}: ").green()
}

fn print_header(image: &ElfImage) {
    println!("{}{}", field("Endianness"), image.encoding);
    println!("{}{}", field("Class"), image.class);
    println!("{}0x{:x}", field("Entry point"), image.entry);
    println!(
        "{}{} (offset: 0x{:x})",
        field("Program headers"),
        image.program_headers.len(),
        image.phoff
    );
    println!(
        "{}{} (offset: 0x{:x})",
        field("Section headers"),
        image.section_headers.len(),
        image.shoff
    );
    println!(
        "{}{}",
        field("Section header string table index"),
        image.shstrndx
    );
    println!("{}{}", field("File Type"), image.file_type);
    println!("{}{}", field("Machine"), image.machine);
    if image.is_pie() {
        println!("{}yes", field("Position independent"));
    }
}

fn print_sections(image: &ElfImage) {
    println!("{}", "\n=== Section Headers ===".blue());
    println!(
        "{}",
        format!(
            "{:<20} {:<14} {:<6} {:<10} {:<10} {:<10} {:<5} {:<5} {:<10} {:<10}",
            "Name", "Type", "Flags", "Addr", "Offset", "Size", "Link", "Info", "Align", "EntSize"
        )
        .green()
    );

    for (index, section) in image.section_headers.iter().enumerate() {
        let row = format!(
            "{:<20} {:<14} {:<6} 0x{:08x} 0x{:08x} 0x{:08x} {:<5} {:<5} 0x{:08x} 0x{:08x}",
            section.name,
            section.kind.to_string(),
            section.flags.to_string(),
            section.addr,
            section.offset,
            section.size,
            section.link,
            section.info,
            section.addralign,
            section.entsize,
        );
        if index % 2 == 0 {
            println!("{}", row.cyan());
        } else {
            println!("{row}");
        }
    }
}

fn print_segments(image: &ElfImage) {
    println!("{}", "\n=== Program Headers ===".blue());
    for (index, segment) in image.program_headers.iter().enumerate() {
        println!("{}{}", field(&format!("[{index}] Type")), segment.kind);
        println!("    {}{}", field("Flags"), segment.flags);
        println!("    {}0x{:x}", field("Offset"), segment.offset);
        println!("    {}0x{:x}", field("Virtual Address"), segment.vaddr);
        println!("    {}0x{:x}", field("Physical Address"), segment.paddr);
        println!("    {}0x{:x}", field("File Size"), segment.filesz);
        println!("    {}0x{:x}", field("Memory Size"), segment.memsz);
        println!("    {}0x{:x}", field("Alignment"), segment.align);

        if segment.kind == SegmentKind::Interp {
            if let Some(interp) = &image.interp {
                println!("    {}{interp}", "Interpreter: ".yellow());
            }
        }
        if segment.kind == SegmentKind::Dynamic {
            println!("    {}", "Dynamically linked".yellow());
        }
        println!();
    }
}

fn print_symbols(image: &ElfImage) {
    for table in &image.symbol_tables {
        println!(
            "{}",
            format!("\n=== Symbols ({}) ===", table.section_name).blue()
        );
        println!(
            "{}",
            format!(
                "{:<18} {:<10} {:<8} {:<8} {:<5} Name",
                "Value", "Size", "Type", "Bind", "Ndx"
            )
            .green()
        );
        for sym in &table.symbols {
            println!(
                "0x{:016x} {:<10} {:<8} {:<8} {:<5} {}",
                sym.value,
                sym.size,
                sym.kind.to_string(),
                sym.binding.to_string(),
                sym.section_index,
                sym.name,
            );
        }
    }
}

struct LegendEntry {
    name: &'static str,
    desc: &'static str,
}

fn print_legend(title: &str, width: usize, entries: &[LegendEntry]) {
    println!("{}", format!("=== {title} ===").yellow());
    for entry in entries {
        println!("| {:<width$} | {}", entry.name, entry.desc);
    }
    println!();
}

fn print_section_legend() {
    const TYPES: &[LegendEntry] = &[
        LegendEntry { name: "NULL", desc: "SHT_NULL: Unused section" },
        LegendEntry { name: "PROGBITS", desc: "SHT_PROGBITS: Program-defined data" },
        LegendEntry { name: "SYMTAB", desc: "SHT_SYMTAB: Symbol table" },
        LegendEntry { name: "STRTAB", desc: "SHT_STRTAB: String table" },
        LegendEntry { name: "RELA", desc: "SHT_RELA: Relocation with addends" },
        LegendEntry { name: "HASH", desc: "SHT_HASH: Symbol hash table" },
        LegendEntry { name: "DYNAMIC", desc: "SHT_DYNAMIC: Dynamic linking info" },
        LegendEntry { name: "NOTE", desc: "SHT_NOTE: Auxiliary information" },
        LegendEntry { name: "NOBITS", desc: "SHT_NOBITS: Occupies no file space" },
        LegendEntry { name: "REL", desc: "SHT_REL: Relocation without addends" },
        LegendEntry { name: "DYNSYM", desc: "SHT_DYNSYM: Dynamic symbol table" },
        LegendEntry { name: "INIT_ARRAY", desc: "SHT_INIT_ARRAY: Constructors array" },
        LegendEntry { name: "FINI_ARRAY", desc: "SHT_FINI_ARRAY: Destructors array" },
    ];
    const FLAGS: &[LegendEntry] = &[
        LegendEntry { name: "W", desc: "SHF_WRITE: Writable" },
        LegendEntry { name: "A", desc: "SHF_ALLOC: Occupies memory" },
        LegendEntry { name: "X", desc: "SHF_EXECINSTR: Executable code" },
        LegendEntry { name: "M", desc: "SHF_MERGE: Might be merged" },
        LegendEntry { name: "S", desc: "SHF_STRINGS: Contains strings" },
        LegendEntry { name: "I", desc: "SHF_INFO_LINK: sh_info has special meaning" },
        LegendEntry { name: "L", desc: "SHF_LINK_ORDER: Link order" },
        LegendEntry { name: "G", desc: "SHF_GROUP: Section group" },
        LegendEntry { name: "T", desc: "SHF_TLS: Thread-Local Storage" },
    ];
    println!();
    print_legend("Section Header Types Legend", 12, TYPES);
    print_legend("Section Header Flags Legend", 4, FLAGS);
}

fn print_segment_legend() {
    const TYPES: &[LegendEntry] = &[
        LegendEntry { name: "NULL", desc: "PT_NULL: Unused entry" },
        LegendEntry { name: "LOAD", desc: "PT_LOAD: Loadable segment" },
        LegendEntry { name: "DYNAMIC", desc: "PT_DYNAMIC: Dynamic linking info" },
        LegendEntry { name: "INTERP", desc: "PT_INTERP: Interpreter path" },
        LegendEntry { name: "NOTE", desc: "PT_NOTE: Auxiliary information" },
        LegendEntry { name: "PHDR", desc: "PT_PHDR: Program header table itself" },
        LegendEntry { name: "TLS", desc: "PT_TLS: Thread-Local Storage template" },
        LegendEntry { name: "GNU_STACK", desc: "PT_GNU_STACK: Stack flags" },
        LegendEntry { name: "GNU_RELRO", desc: "PT_GNU_RELRO: Read-only after relocation" },
    ];
    const FLAGS: &[LegendEntry] = &[
        LegendEntry { name: "R", desc: "PF_R: Readable" },
        LegendEntry { name: "W", desc: "PF_W: Writable" },
        LegendEntry { name: "X", desc: "PF_X: Executable" },
    ];
    print_legend("Program Header Types Legend", 10, TYPES);
    print_legend("Program Header Flags Legend", 4, FLAGS);
}
