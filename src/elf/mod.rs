//! Decoder for ELF32/ELF64 images.
//!
//! Turns raw bytes into an [`ElfImage`]: file header, program headers,
//! section headers and every `SYMTAB`/`DYNSYM` symbol table together with its
//! linked string table. The decoder is pure; it never returns a partially
//! parsed image.

use std::ops::Range;

use thiserror::Error;

pub mod types;

use types::{
    Class, Encoding, FileType, Machine, SectionFlags, SectionKind, SegmentFlags, SegmentKind,
    SymbolBinding, SymbolKind, SHN_UNDEF,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElfError {
    #[error("file is truncated (wanted {wanted} bytes at offset {offset:#x})")]
    Truncated { offset: u64, wanted: usize },
    #[error("not an ELF file (bad magic)")]
    BadMagic,
    #[error("unsupported ELF class {0:#x}")]
    UnsupportedClass(u8),
    #[error("unsupported data encoding {0:#x}")]
    UnsupportedEncoding(u8),
    #[error("string table index {index} is out of range or not a string table")]
    BadStringTable { index: usize },
    #[error("symbol name offset {offset:#x} lies past the end of its string table")]
    BadSymbolName { offset: u64 },
    #[error("program header {index} has filesz > memsz")]
    BadProgramHeader { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramHeader {
    pub kind: SegmentKind,
    pub flags: SegmentFlags,
    pub offset: u64,
    pub vaddr: u64,
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
    pub align: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: String,
    pub kind: SectionKind,
    pub flags: SectionFlags,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}

impl SectionHeader {
    /// Byte range this section occupies in the file, for sections that have
    /// file contents.
    pub fn file_range(&self) -> Option<Range<usize>> {
        if self.kind == SectionKind::Nobits {
            return None;
        }
        let start = usize::try_from(self.offset).ok()?;
        let size = usize::try_from(self.size).ok()?;
        Some(start..start.checked_add(size)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: u64,
    pub size: u64,
    pub binding: SymbolBinding,
    pub kind: SymbolKind,
    pub section_index: u16,
}

impl Symbol {
    pub fn is_defined_function(&self) -> bool {
        self.kind == SymbolKind::Func && self.section_index != SHN_UNDEF && !self.name.is_empty()
    }
}

/// One decoded `SYMTAB` or `DYNSYM` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    pub section_name: String,
    pub symbols: Vec<Symbol>,
}

/// Decoded view of a parsed ELF binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfImage {
    pub class: Class,
    pub encoding: Encoding,
    pub file_type: FileType,
    pub machine: Machine,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub shstrndx: u16,
    pub program_headers: Vec<ProgramHeader>,
    pub section_headers: Vec<SectionHeader>,
    pub symbol_tables: Vec<SymbolTable>,
    pub interp: Option<String>,
}

impl ElfImage {
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        let ident = data.get(..16).ok_or(ElfError::Truncated {
            offset: 0,
            wanted: 16,
        })?;
        if &ident[..4] != b"\x7fELF" {
            return Err(ElfError::BadMagic);
        }
        let class = match ident[4] {
            1 => Class::Elf32,
            2 => Class::Elf64,
            other => return Err(ElfError::UnsupportedClass(other)),
        };
        let encoding = match ident[5] {
            1 => Encoding::Little,
            2 => Encoding::Big,
            other => return Err(ElfError::UnsupportedEncoding(other)),
        };

        let r = Reader { data, encoding };
        let mut at = 16;
        let file_type = FileType::from_raw(r.u16(&mut at)?);
        let machine = Machine(r.u16(&mut at)?);
        let _version = r.u32(&mut at)?;
        let entry = r.addr(&mut at, class)?;
        let phoff = r.addr(&mut at, class)?;
        let shoff = r.addr(&mut at, class)?;
        let _flags = r.u32(&mut at)?;
        let _ehsize = r.u16(&mut at)?;
        let phentsize = r.u16(&mut at)?;
        let phnum = r.u16(&mut at)?;
        let shentsize = r.u16(&mut at)?;
        let shnum = r.u16(&mut at)?;
        let shstrndx = r.u16(&mut at)?;

        let program_headers = parse_program_headers(&r, class, phoff, phentsize, phnum)?;
        let interp = find_interp(data, &program_headers);

        let raw_sections = parse_section_headers(&r, class, shoff, shentsize, shnum)?;
        let section_headers = name_sections(data, raw_sections, shstrndx)?;
        let symbol_tables = parse_symbol_tables(&r, data, class, &section_headers)?;

        Ok(ElfImage {
            class,
            encoding,
            file_type,
            machine,
            entry,
            phoff,
            shoff,
            shstrndx,
            program_headers,
            section_headers,
            symbol_tables,
            interp,
        })
    }

    /// A PIE image keeps relative addresses until the loader places it.
    pub fn is_pie(&self) -> bool {
        self.file_type == FileType::SharedObject
    }

    /// All defined, named, function-typed symbols across every symbol table.
    pub fn function_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbol_tables
            .iter()
            .flat_map(|table| table.symbols.iter())
            .filter(|sym| sym.is_defined_function())
    }

    /// Resolve a function symbol to an absolute address.
    ///
    /// Fully linked images carry absolute symbol values; PIE images need the
    /// observed load base added.
    pub fn resolve_symbol(&self, name: &str, base: u64) -> Option<u64> {
        let sym = self.function_symbols().find(|sym| sym.name == name)?;
        Some(self.runtime_address(sym.value, base))
    }

    pub fn runtime_address(&self, value: u64, base: u64) -> u64 {
        if self.is_pie() {
            base.wrapping_add(value)
        } else {
            value
        }
    }
}

struct Reader<'a> {
    data: &'a [u8],
    encoding: Encoding,
}

impl<'a> Reader<'a> {
    fn bytes(&self, at: &mut u64, len: usize) -> Result<&'a [u8], ElfError> {
        let offset = *at;
        let start = usize::try_from(offset).map_err(|_| ElfError::Truncated {
            offset,
            wanted: len,
        })?;
        let slice = start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or(ElfError::Truncated {
                offset,
                wanted: len,
            })?;
        *at += len as u64;
        Ok(slice)
    }

    fn u16(&self, at: &mut u64) -> Result<u16, ElfError> {
        let b = self.bytes(at, 2)?;
        Ok(match self.encoding {
            Encoding::Little => u16::from_le_bytes([b[0], b[1]]),
            Encoding::Big => u16::from_be_bytes([b[0], b[1]]),
        })
    }

    fn u32(&self, at: &mut u64) -> Result<u32, ElfError> {
        let b = self.bytes(at, 4)?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(match self.encoding {
            Encoding::Little => u32::from_le_bytes(b),
            Encoding::Big => u32::from_be_bytes(b),
        })
    }

    fn u64(&self, at: &mut u64) -> Result<u64, ElfError> {
        let b = self.bytes(at, 8)?;
        let b = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
        Ok(match self.encoding {
            Encoding::Little => u64::from_le_bytes(b),
            Encoding::Big => u64::from_be_bytes(b),
        })
    }

    fn u8(&self, at: &mut u64) -> Result<u8, ElfError> {
        Ok(self.bytes(at, 1)?[0])
    }

    /// Class-sized address or offset field.
    fn addr(&self, at: &mut u64, class: Class) -> Result<u64, ElfError> {
        match class {
            Class::Elf32 => self.u32(at).map(u64::from),
            Class::Elf64 => self.u64(at),
        }
    }
}

fn parse_program_headers(
    r: &Reader<'_>,
    class: Class,
    phoff: u64,
    phentsize: u16,
    phnum: u16,
) -> Result<Vec<ProgramHeader>, ElfError> {
    let mut headers = Vec::with_capacity(phnum.into());
    for index in 0..u64::from(phnum) {
        let mut at = phoff.wrapping_add(index * u64::from(phentsize));
        let header = match class {
            Class::Elf32 => {
                let kind = SegmentKind::from_raw(r.u32(&mut at)?);
                let offset = u64::from(r.u32(&mut at)?);
                let vaddr = u64::from(r.u32(&mut at)?);
                let paddr = u64::from(r.u32(&mut at)?);
                let filesz = u64::from(r.u32(&mut at)?);
                let memsz = u64::from(r.u32(&mut at)?);
                let flags = SegmentFlags(r.u32(&mut at)?);
                let align = u64::from(r.u32(&mut at)?);
                ProgramHeader {
                    kind,
                    flags,
                    offset,
                    vaddr,
                    paddr,
                    filesz,
                    memsz,
                    align,
                }
            }
            Class::Elf64 => {
                let kind = SegmentKind::from_raw(r.u32(&mut at)?);
                let flags = SegmentFlags(r.u32(&mut at)?);
                let offset = r.u64(&mut at)?;
                let vaddr = r.u64(&mut at)?;
                let paddr = r.u64(&mut at)?;
                let filesz = r.u64(&mut at)?;
                let memsz = r.u64(&mut at)?;
                let align = r.u64(&mut at)?;
                ProgramHeader {
                    kind,
                    flags,
                    offset,
                    vaddr,
                    paddr,
                    filesz,
                    memsz,
                    align,
                }
            }
        };
        if header.filesz > header.memsz {
            return Err(ElfError::BadProgramHeader {
                index: index as usize,
            });
        }
        headers.push(header);
    }
    Ok(headers)
}

struct RawSection {
    name_offset: u32,
    header: SectionHeader,
}

fn parse_section_headers(
    r: &Reader<'_>,
    class: Class,
    shoff: u64,
    shentsize: u16,
    shnum: u16,
) -> Result<Vec<RawSection>, ElfError> {
    let mut sections = Vec::with_capacity(shnum.into());
    for index in 0..u64::from(shnum) {
        let mut at = shoff.wrapping_add(index * u64::from(shentsize));
        let name_offset = r.u32(&mut at)?;
        let kind = SectionKind::from_raw(r.u32(&mut at)?);
        let flags = SectionFlags(r.addr(&mut at, class)?);
        let addr = r.addr(&mut at, class)?;
        let offset = r.addr(&mut at, class)?;
        let size = r.addr(&mut at, class)?;
        let link = r.u32(&mut at)?;
        let info = r.u32(&mut at)?;
        let addralign = r.addr(&mut at, class)?;
        let entsize = r.addr(&mut at, class)?;
        sections.push(RawSection {
            name_offset,
            header: SectionHeader {
                name: String::new(),
                kind,
                flags,
                addr,
                offset,
                size,
                link,
                info,
                addralign,
                entsize,
            },
        });
    }
    Ok(sections)
}

fn name_sections(
    data: &[u8],
    raw: Vec<RawSection>,
    shstrndx: u16,
) -> Result<Vec<SectionHeader>, ElfError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let index = usize::from(shstrndx);
    let shstrtab = raw
        .get(index)
        .filter(|s| s.header.kind == SectionKind::Strtab)
        .ok_or(ElfError::BadStringTable { index })?;
    let table = string_table(data, &shstrtab.header).ok_or(ElfError::BadStringTable { index })?;

    raw.into_iter()
        .map(|mut section| {
            section.header.name = read_cstr(table, u64::from(section.name_offset))
                .ok_or(ElfError::BadSymbolName {
                    offset: u64::from(section.name_offset),
                })?
                .to_owned();
            Ok(section.header)
        })
        .collect()
}

fn parse_symbol_tables(
    r: &Reader<'_>,
    data: &[u8],
    class: Class,
    sections: &[SectionHeader],
) -> Result<Vec<SymbolTable>, ElfError> {
    let mut tables = Vec::new();
    for section in sections {
        if !matches!(section.kind, SectionKind::Symtab | SectionKind::Dynsym) {
            continue;
        }

        let link = section.link as usize;
        let strtab_header = sections
            .get(link)
            .filter(|s| s.kind == SectionKind::Strtab)
            .ok_or(ElfError::BadStringTable { index: link })?;
        let strtab =
            string_table(data, strtab_header).ok_or(ElfError::BadStringTable { index: link })?;

        let entsize = match class {
            Class::Elf32 => 16,
            Class::Elf64 => 24,
        };
        let count = if section.entsize != 0 {
            section.size / section.entsize
        } else {
            section.size / entsize
        };

        let mut symbols = Vec::new();
        for index in 0..count {
            let mut at = section.offset.wrapping_add(index * entsize);
            let symbol = match class {
                Class::Elf32 => {
                    let name_offset = r.u32(&mut at)?;
                    let value = u64::from(r.u32(&mut at)?);
                    let size = u64::from(r.u32(&mut at)?);
                    let info = r.u8(&mut at)?;
                    let _other = r.u8(&mut at)?;
                    let section_index = r.u16(&mut at)?;
                    build_symbol(strtab, name_offset, value, size, info, section_index)?
                }
                Class::Elf64 => {
                    let name_offset = r.u32(&mut at)?;
                    let info = r.u8(&mut at)?;
                    let _other = r.u8(&mut at)?;
                    let section_index = r.u16(&mut at)?;
                    let value = r.u64(&mut at)?;
                    let size = r.u64(&mut at)?;
                    build_symbol(strtab, name_offset, value, size, info, section_index)?
                }
            };
            symbols.push(symbol);
        }

        tables.push(SymbolTable {
            section_name: section.name.clone(),
            symbols,
        });
    }
    Ok(tables)
}

fn build_symbol(
    strtab: &[u8],
    name_offset: u32,
    value: u64,
    size: u64,
    info: u8,
    section_index: u16,
) -> Result<Symbol, ElfError> {
    let name = read_cstr(strtab, u64::from(name_offset))
        .ok_or(ElfError::BadSymbolName {
            offset: u64::from(name_offset),
        })?
        .to_owned();
    Ok(Symbol {
        name,
        value,
        size,
        binding: SymbolBinding::from_raw(info >> 4),
        kind: SymbolKind::from_raw(info & 0xf),
        section_index,
    })
}

fn string_table<'d>(data: &'d [u8], header: &SectionHeader) -> Option<&'d [u8]> {
    let range = header.file_range()?;
    data.get(range)
}

/// NUL-terminated string at `offset` inside `table`.
fn read_cstr(table: &[u8], offset: u64) -> Option<&str> {
    let start = usize::try_from(offset).ok()?;
    let rest = table.get(start..)?;
    let end = rest.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&rest[..end]).ok()
}

fn find_interp(data: &[u8], headers: &[ProgramHeader]) -> Option<String> {
    let header = headers.iter().find(|h| h.kind == SegmentKind::Interp)?;
    let start = usize::try_from(header.offset).ok()?;
    let end = start.checked_add(usize::try_from(header.filesz).ok()?)?;
    let bytes = data.get(start..end)?;
    let nul = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..nul]).ok().map(str::to_owned)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Hand-assembled 64-bit little-endian executable with one executable
    /// `PT_LOAD` segment, a `.text` section and a symbol table that defines
    /// `main`.
    pub(crate) fn sample_elf64() -> Vec<u8> {
        let mut out = vec![0u8; 0x240];

        // e_ident
        out[..4].copy_from_slice(b"\x7fELF");
        out[4] = 2; // ELFCLASS64
        out[5] = 1; // ELFDATA2LSB
        out[6] = 1; // EV_CURRENT

        let w16 = |out: &mut Vec<u8>, at: usize, v: u16| {
            out[at..at + 2].copy_from_slice(&v.to_le_bytes())
        };
        let w32 = |out: &mut Vec<u8>, at: usize, v: u32| {
            out[at..at + 4].copy_from_slice(&v.to_le_bytes())
        };
        let w64 = |out: &mut Vec<u8>, at: usize, v: u64| {
            out[at..at + 8].copy_from_slice(&v.to_le_bytes())
        };

        // ELF header
        w16(&mut out, 16, 2); // e_type = ET_EXEC
        w16(&mut out, 18, 62); // e_machine = EM_X86_64
        w32(&mut out, 20, 1); // e_version
        w64(&mut out, 24, 0x401000); // e_entry
        w64(&mut out, 32, 0x40); // e_phoff
        w64(&mut out, 40, 0x78); // e_shoff
        w16(&mut out, 52, 64); // e_ehsize
        w16(&mut out, 54, 56); // e_phentsize
        w16(&mut out, 56, 1); // e_phnum
        w16(&mut out, 58, 64); // e_shentsize
        w16(&mut out, 60, 5); // e_shnum
        w16(&mut out, 62, 4); // e_shstrndx

        // program header 0: PT_LOAD R+X covering .text
        let ph = 0x40;
        w32(&mut out, ph, 1); // p_type = PT_LOAD
        w32(&mut out, ph + 4, 0x5); // p_flags = R|X
        w64(&mut out, ph + 8, 0x1b0); // p_offset
        w64(&mut out, ph + 16, 0x401000); // p_vaddr
        w64(&mut out, ph + 24, 0x401000); // p_paddr
        w64(&mut out, ph + 32, 0x20); // p_filesz
        w64(&mut out, ph + 40, 0x20); // p_memsz
        w64(&mut out, ph + 48, 0x1000); // p_align

        // section headers at 0x78; entries are 64 bytes
        let shdr = |i: usize,
                        name: u32,
                        kind: u32,
                        flags: u64,
                        addr: u64,
                        offset: u64,
                        size: u64,
                        link: u32,
                        entsize: u64,
                        out: &mut Vec<u8>| {
            let at = 0x78 + i * 64;
            w32(out, at, name);
            w32(out, at + 4, kind);
            w64(out, at + 8, flags);
            w64(out, at + 16, addr);
            w64(out, at + 24, offset);
            w64(out, at + 32, size);
            w32(out, at + 40, link);
            w32(out, at + 44, 0);
            w64(out, at + 48, 8);
            w64(out, at + 56, entsize);
        };

        // [1] .text PROGBITS A|X
        shdr(1, 1, 1, 0x6, 0x401000, 0x1b0, 0x20, 0, 0, &mut out);
        // [2] .symtab SYMTAB, link -> [3]
        shdr(2, 7, 2, 0, 0, 0x1d0, 48, 3, 24, &mut out);
        // [3] .strtab STRTAB
        shdr(3, 15, 3, 0, 0, 0x200, 6, 0, 0, &mut out);
        // [4] .shstrtab STRTAB
        shdr(4, 23, 3, 0, 0, 0x210, 33, 0, 0, &mut out);

        // .text contents: nops
        for b in &mut out[0x1b0..0x1d0] {
            *b = 0x90;
        }

        // .symtab: null symbol + `main` (GLOBAL FUNC, section 1)
        let sym = 0x1d0 + 24;
        w32(&mut out, sym, 1); // st_name -> "main"
        out[sym + 4] = 0x12; // GLOBAL | FUNC
        w16(&mut out, sym + 6, 1); // st_shndx = .text
        w64(&mut out, sym + 8, 0x401010); // st_value
        w64(&mut out, sym + 16, 0x10); // st_size

        // .strtab
        out[0x200..0x200 + 6].copy_from_slice(b"\0main\0");

        // .shstrtab
        let names = b"\0.text\0.symtab\0.strtab\0.shstrtab\0";
        out[0x210..0x210 + names.len()].copy_from_slice(names);

        out.truncate(0x210 + names.len());
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::fixtures::sample_elf64;
    use super::*;

    #[test]
    fn parses_canonical_image() {
        let image = ElfImage::parse(&sample_elf64()).unwrap();

        assert_eq!(image.class, Class::Elf64);
        assert_eq!(image.encoding, Encoding::Little);
        assert_eq!(image.file_type, FileType::Executable);
        assert_eq!(image.machine, Machine::X86_64);
        assert_eq!(image.entry, 0x401000);
        assert!(!image.is_pie());

        // exactly one executable PT_LOAD whose filesz matches the section
        // sizes summed inside its address range
        let loads: Vec<_> = image
            .program_headers
            .iter()
            .filter(|ph| ph.kind == SegmentKind::Load && ph.flags.executable())
            .collect();
        assert_eq!(loads.len(), 1);
        let load = loads[0];
        let section_sum: u64 = image
            .section_headers
            .iter()
            .filter(|sh| sh.addr >= load.vaddr && sh.addr < load.vaddr + load.memsz)
            .map(|sh| sh.size)
            .sum();
        assert_eq!(load.filesz, section_sum);
    }

    #[test]
    fn decodes_symbols_with_linked_string_table() {
        let image = ElfImage::parse(&sample_elf64()).unwrap();

        assert_eq!(image.symbol_tables.len(), 1);
        let table = &image.symbol_tables[0];
        assert_eq!(table.section_name, ".symtab");

        let main = table.symbols.iter().find(|s| s.name == "main").unwrap();
        assert_eq!(main.value, 0x401010);
        assert_eq!(main.kind, SymbolKind::Func);
        assert_eq!(main.binding, SymbolBinding::Global);
        assert!(main.is_defined_function());
    }

    #[test]
    fn resolves_symbols_against_load_base() {
        let mut bytes = sample_elf64();
        let image = ElfImage::parse(&bytes).unwrap();

        // fully linked: absolute value, the base is ignored
        assert_eq!(image.resolve_symbol("main", 0x5555_0000), Some(0x401010));
        assert_eq!(image.resolve_symbol("missing", 0), None);

        // same image re-typed as ET_DYN resolves base-relative
        bytes[16] = 3;
        let pie = ElfImage::parse(&bytes).unwrap();
        assert!(pie.is_pie());
        assert_eq!(
            pie.resolve_symbol("main", 0x5555_0000),
            Some(0x5555_0000 + 0x401010)
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_elf64();
        bytes[0] = 0x7e;
        assert_eq!(ElfImage::parse(&bytes), Err(ElfError::BadMagic));
    }

    #[test]
    fn rejects_truncated_file() {
        let bytes = sample_elf64();
        assert!(matches!(
            ElfImage::parse(&bytes[..40]),
            Err(ElfError::Truncated { .. })
        ));
        assert!(matches!(
            ElfImage::parse(&bytes[..10]),
            Err(ElfError::Truncated { .. })
        ));
    }

    #[test]
    fn rejects_unknown_class() {
        let mut bytes = sample_elf64();
        bytes[4] = 9;
        assert_eq!(ElfImage::parse(&bytes), Err(ElfError::UnsupportedClass(9)));
    }

    #[test]
    fn rejects_out_of_range_shstrndx() {
        let mut bytes = sample_elf64();
        bytes[62..64].copy_from_slice(&100u16.to_le_bytes());
        assert_eq!(
            ElfImage::parse(&bytes),
            Err(ElfError::BadStringTable { index: 100 })
        );
    }

    #[test]
    fn rejects_symbol_name_past_string_table() {
        let mut bytes = sample_elf64();
        // first real symbol's st_name
        let sym_name_at = 0x1d0 + 24;
        bytes[sym_name_at..sym_name_at + 4].copy_from_slice(&0x1000u32.to_le_bytes());
        assert_eq!(
            ElfImage::parse(&bytes),
            Err(ElfError::BadSymbolName { offset: 0x1000 })
        );
    }

    #[test]
    fn rejects_filesz_larger_than_memsz() {
        let mut bytes = sample_elf64();
        // p_memsz of program header 0
        bytes[0x40 + 40..0x40 + 48].copy_from_slice(&0x8u64.to_le_bytes());
        assert_eq!(
            ElfImage::parse(&bytes),
            Err(ElfError::BadProgramHeader { index: 0 })
        );
    }

    #[test]
    fn decodes_big_endian_fields_per_encoding() {
        // minimal big-endian header with no tables
        let mut bytes = vec![0u8; 64];
        bytes[..4].copy_from_slice(b"\x7fELF");
        bytes[4] = 2; // ELFCLASS64
        bytes[5] = 2; // ELFDATA2MSB
        bytes[16..18].copy_from_slice(&2u16.to_be_bytes()); // ET_EXEC
        bytes[18..20].copy_from_slice(&21u16.to_be_bytes()); // EM_PPC64
        bytes[24..32].copy_from_slice(&0x1000_0000u64.to_be_bytes()); // e_entry

        let image = ElfImage::parse(&bytes).unwrap();
        assert_eq!(image.encoding, Encoding::Big);
        assert_eq!(image.file_type, FileType::Executable);
        assert_eq!(image.machine, Machine(21));
        assert_eq!(image.entry, 0x1000_0000);
        assert!(image.section_headers.is_empty());
    }
}
