//! Typed views of the raw ELF header fields.

use std::fmt;

/// Word width of the image, from `e_ident[EI_CLASS]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    Elf32,
    Elf64,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::Elf32 => f.write_str("32-bit"),
            Class::Elf64 => f.write_str("64-bit"),
        }
    }
}

/// Byte order of the image's multi-byte fields, from `e_ident[EI_DATA]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Little,
    Big,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Little => f.write_str("Little Endian"),
            Encoding::Big => f.write_str("Big Endian"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    None,
    Relocatable,
    Executable,
    SharedObject,
    Core,
    OsSpecific(u16),
    ProcessorSpecific(u16),
    Unknown(u16),
}

impl FileType {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => FileType::None,
            1 => FileType::Relocatable,
            2 => FileType::Executable,
            3 => FileType::SharedObject,
            4 => FileType::Core,
            0xfe00..=0xfeff => FileType::OsSpecific(raw),
            0xff00..=0xffff => FileType::ProcessorSpecific(raw),
            other => FileType::Unknown(other),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::None => "No file type",
            FileType::Relocatable => "Relocatable file",
            FileType::Executable => "Executable file",
            FileType::SharedObject => "Shared object file",
            FileType::Core => "Core file",
            FileType::OsSpecific(_) => "OS-specific file type",
            FileType::ProcessorSpecific(_) => "Processor-specific file type",
            FileType::Unknown(_) => "Unknown file type",
        };
        f.write_str(name)
    }
}

/// `e_machine` architecture tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Machine(pub u16);

impl Machine {
    pub const I386: Machine = Machine(3);
    pub const X86_64: Machine = Machine(62);

    pub fn is_x86(self) -> bool {
        self == Machine::I386 || self == Machine::X86_64
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "No machine",
            2 => "SUN SPARC",
            3 => "Intel 80386",
            4 => "Motorola 68000",
            8 => "MIPS R3000",
            20 => "PowerPC",
            21 => "PowerPC 64-bit",
            22 => "IBM S/390",
            40 => "ARM",
            42 => "Hitachi SH",
            43 => "SPARC v9 (64-bit)",
            50 => "Intel Itanium (IA-64)",
            62 => "AMD x86-64",
            83 => "Atmel AVR 8-bit",
            94 => "Tensilica Xtensa",
            183 => "ARM AArch64",
            189 => "Xilinx MicroBlaze",
            243 => "RISC-V",
            247 => "Linux BPF VM",
            258 => "LoongArch",
            _ => "Unknown/Unsupported machine",
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Null,
    Load,
    Dynamic,
    Interp,
    Note,
    Shlib,
    Phdr,
    Tls,
    GnuEhFrame,
    GnuStack,
    GnuRelro,
    GnuProperty,
    OsSpecific(u32),
    ProcessorSpecific(u32),
    Unknown(u32),
}

impl SegmentKind {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => SegmentKind::Null,
            1 => SegmentKind::Load,
            2 => SegmentKind::Dynamic,
            3 => SegmentKind::Interp,
            4 => SegmentKind::Note,
            5 => SegmentKind::Shlib,
            6 => SegmentKind::Phdr,
            7 => SegmentKind::Tls,
            0x6474_e550 => SegmentKind::GnuEhFrame,
            0x6474_e551 => SegmentKind::GnuStack,
            0x6474_e552 => SegmentKind::GnuRelro,
            0x6474_e553 => SegmentKind::GnuProperty,
            0x6000_0000..=0x6fff_ffff => SegmentKind::OsSpecific(raw),
            0x7000_0000..=0x7fff_ffff => SegmentKind::ProcessorSpecific(raw),
            other => SegmentKind::Unknown(other),
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::Null => f.write_str("NULL"),
            SegmentKind::Load => f.write_str("LOAD"),
            SegmentKind::Dynamic => f.write_str("DYNAMIC"),
            SegmentKind::Interp => f.write_str("INTERP"),
            SegmentKind::Note => f.write_str("NOTE"),
            SegmentKind::Shlib => f.write_str("SHLIB"),
            SegmentKind::Phdr => f.write_str("PHDR"),
            SegmentKind::Tls => f.write_str("TLS"),
            SegmentKind::GnuEhFrame => f.write_str("GNU_EH_FRAME"),
            SegmentKind::GnuStack => f.write_str("GNU_STACK"),
            SegmentKind::GnuRelro => f.write_str("GNU_RELRO"),
            SegmentKind::GnuProperty => f.write_str("GNU_PROPERTY"),
            SegmentKind::OsSpecific(raw) => write!(f, "OS-specific (0x{raw:x})"),
            SegmentKind::ProcessorSpecific(raw) => write!(f, "Processor-specific (0x{raw:x})"),
            SegmentKind::Unknown(raw) => write!(f, "0x{raw:x}"),
        }
    }
}

/// Segment permission bits (`p_flags`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentFlags(pub u32);

impl SegmentFlags {
    pub fn readable(self) -> bool {
        self.0 & 0x4 != 0
    }

    pub fn writable(self) -> bool {
        self.0 & 0x2 != 0
    }

    pub fn executable(self) -> bool {
        self.0 & 0x1 != 0
    }
}

impl fmt::Display for SegmentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.readable() {
            f.write_str("R ")?;
        }
        if self.writable() {
            f.write_str("W ")?;
        }
        if self.executable() {
            f.write_str("X ")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionKind {
    Null,
    Progbits,
    Symtab,
    Strtab,
    Rela,
    Hash,
    Dynamic,
    Note,
    Nobits,
    Rel,
    Shlib,
    Dynsym,
    InitArray,
    FiniArray,
    PreinitArray,
    Group,
    SymtabShndx,
    GnuHash,
    GnuVerdef,
    GnuVerneed,
    GnuVersym,
    OsSpecific(u32),
    ProcessorSpecific(u32),
    Unknown(u32),
}

impl SectionKind {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => SectionKind::Null,
            1 => SectionKind::Progbits,
            2 => SectionKind::Symtab,
            3 => SectionKind::Strtab,
            4 => SectionKind::Rela,
            5 => SectionKind::Hash,
            6 => SectionKind::Dynamic,
            7 => SectionKind::Note,
            8 => SectionKind::Nobits,
            9 => SectionKind::Rel,
            10 => SectionKind::Shlib,
            11 => SectionKind::Dynsym,
            14 => SectionKind::InitArray,
            15 => SectionKind::FiniArray,
            16 => SectionKind::PreinitArray,
            17 => SectionKind::Group,
            18 => SectionKind::SymtabShndx,
            0x6fff_fff6 => SectionKind::GnuHash,
            0x6fff_fffd => SectionKind::GnuVerdef,
            0x6fff_fffe => SectionKind::GnuVerneed,
            0x6fff_ffff => SectionKind::GnuVersym,
            0x6000_0000..=0x6fff_ffff => SectionKind::OsSpecific(raw),
            0x7000_0000..=0x7fff_ffff => SectionKind::ProcessorSpecific(raw),
            other => SectionKind::Unknown(other),
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Null => f.write_str("NULL"),
            SectionKind::Progbits => f.write_str("PROGBITS"),
            SectionKind::Symtab => f.write_str("SYMTAB"),
            SectionKind::Strtab => f.write_str("STRTAB"),
            SectionKind::Rela => f.write_str("RELA"),
            SectionKind::Hash => f.write_str("HASH"),
            SectionKind::Dynamic => f.write_str("DYNAMIC"),
            SectionKind::Note => f.write_str("NOTE"),
            SectionKind::Nobits => f.write_str("NOBITS"),
            SectionKind::Rel => f.write_str("REL"),
            SectionKind::Shlib => f.write_str("SHLIB"),
            SectionKind::Dynsym => f.write_str("DYNSYM"),
            SectionKind::InitArray => f.write_str("INIT_ARRAY"),
            SectionKind::FiniArray => f.write_str("FINI_ARRAY"),
            SectionKind::PreinitArray => f.write_str("PREINIT_ARRAY"),
            SectionKind::Group => f.write_str("GROUP"),
            SectionKind::SymtabShndx => f.write_str("SYMTAB_SHNDX"),
            SectionKind::GnuHash => f.write_str("GNU_HASH"),
            SectionKind::GnuVerdef => f.write_str("GNU_verdef"),
            SectionKind::GnuVerneed => f.write_str("GNU_verneed"),
            SectionKind::GnuVersym => f.write_str("GNU_versym"),
            SectionKind::OsSpecific(_) => f.write_str("OS-specific"),
            SectionKind::ProcessorSpecific(_) => f.write_str("Processor-specific"),
            SectionKind::Unknown(_) => f.write_str("UNKNOWN"),
        }
    }
}

/// Section attribute bits (`sh_flags`), rendered as the usual letter soup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionFlags(pub u64);

impl SectionFlags {
    pub fn executable(self) -> bool {
        self.0 & 0x4 != 0
    }
}

impl fmt::Display for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LETTERS: &[(u64, char)] = &[
            (0x1, 'W'),
            (0x2, 'A'),
            (0x4, 'X'),
            (0x10, 'M'),
            (0x20, 'S'),
            (0x40, 'I'),
            (0x80, 'L'),
            (0x100, 'O'),
            (0x200, 'G'),
            (0x400, 'T'),
        ];
        for (bit, letter) in LETTERS {
            if self.0 & bit != 0 {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
    Other(u8),
}

impl SymbolBinding {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => SymbolBinding::Local,
            1 => SymbolBinding::Global,
            2 => SymbolBinding::Weak,
            other => SymbolBinding::Other(other),
        }
    }
}

impl fmt::Display for SymbolBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolBinding::Local => f.write_str("LOCAL"),
            SymbolBinding::Global => f.write_str("GLOBAL"),
            SymbolBinding::Weak => f.write_str("WEAK"),
            SymbolBinding::Other(raw) => write!(f, "{raw}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    NoType,
    Object,
    Func,
    Section,
    File,
    Common,
    Tls,
    Other(u8),
}

impl SymbolKind {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => SymbolKind::NoType,
            1 => SymbolKind::Object,
            2 => SymbolKind::Func,
            3 => SymbolKind::Section,
            4 => SymbolKind::File,
            5 => SymbolKind::Common,
            6 => SymbolKind::Tls,
            other => SymbolKind::Other(other),
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::NoType => f.write_str("NOTYPE"),
            SymbolKind::Object => f.write_str("OBJECT"),
            SymbolKind::Func => f.write_str("FUNC"),
            SymbolKind::Section => f.write_str("SECTION"),
            SymbolKind::File => f.write_str("FILE"),
            SymbolKind::Common => f.write_str("COMMON"),
            SymbolKind::Tls => f.write_str("TLS"),
            SymbolKind::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Section index a symbol is defined against. 0 is `SHN_UNDEF`.
pub const SHN_UNDEF: u16 = 0;
