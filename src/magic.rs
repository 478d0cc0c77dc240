/// File kinds recognized from their leading magic bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Elf,
    Pdf,
    Png,
    Unknown,
}

impl FileKind {
    pub fn detect(bytes: &[u8]) -> Self {
        const MAGICS: &[(FileKind, &[u8])] = &[
            (FileKind::Elf, b"\x7fELF"),
            (FileKind::Pdf, b"%PDF"),
            (FileKind::Png, b"\x89PNG\r\n\x1a\n"),
        ];

        for (kind, magic) in MAGICS {
            if bytes.len() >= magic.len() && &bytes[..magic.len()] == *magic {
                return *kind;
            }
        }
        FileKind::Unknown
    }

    pub fn name(self) -> &'static str {
        match self {
            FileKind::Elf => "ELF",
            FileKind::Pdf => "PDF",
            FileKind::Png => "PNG",
            FileKind::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::elf(b"\x7fELF\x02\x01\x01\x00".as_slice(), FileKind::Elf)]
    #[case::pdf(b"%PDF-1.7".as_slice(), FileKind::Pdf)]
    #[case::png(b"\x89PNG\r\n\x1a\n\x00".as_slice(), FileKind::Png)]
    #[case::text(b"#!/bin/sh".as_slice(), FileKind::Unknown)]
    #[case::short(b"\x7fEL".as_slice(), FileKind::Unknown)]
    fn detects_magic(#[case] bytes: &[u8], #[case] expected: FileKind) {
        assert_eq!(FileKind::detect(bytes), expected);
    }
}
