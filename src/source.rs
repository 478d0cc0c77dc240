use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

use anyhow::{bail, Context};

/// Largest file we are willing to load or stream.
pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// Uniform random-access reader over a binary.
///
/// Tools that need the whole image at once (metadata, disassembly, debugging)
/// use the `Memory` backend; tools that copy the file through in chunks (the
/// external decompiler) use the `Stream` backend.
pub enum BinarySource {
    Memory { bytes: Vec<u8> },
    Stream { file: File, size: u64 },
}

impl BinarySource {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        BinarySource::Memory { bytes }
    }

    /// Load the file at `path` fully into memory.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let size = probe_size(path)?;
        let mut bytes = Vec::with_capacity(size as usize);
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut bytes))
            .with_context(|| format!("can't read `{}`", path.display()))?;
        Ok(BinarySource::from_bytes(bytes))
    }

    /// Open the file at `path` for positioned reads without loading it.
    pub fn open_streaming(path: &Path) -> anyhow::Result<Self> {
        let size = probe_size(path)?;
        let file =
            File::open(path).with_context(|| format!("can't open `{}`", path.display()))?;
        Ok(BinarySource::Stream { file, size })
    }

    pub fn len(&self) -> u64 {
        match self {
            BinarySource::Memory { bytes } => bytes.len() as u64,
            BinarySource::Stream { size, .. } => *size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` with bytes starting at `offset`.
    ///
    /// Returns the number of bytes read. Reads past the end of the source are
    /// clamped and yield 0 without an error.
    pub fn read(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.len();
        if offset >= len {
            return Ok(0);
        }
        let avail = usize::try_from(len - offset).unwrap_or(usize::MAX);
        let want = buf.len().min(avail);

        match self {
            BinarySource::Memory { bytes } => {
                let start = offset as usize;
                buf[..want].copy_from_slice(&bytes[start..start + want]);
                Ok(want)
            }
            BinarySource::Stream { file, .. } => {
                file.seek(SeekFrom::Start(offset))?;
                let mut done = 0;
                while done < want {
                    match file.read(&mut buf[done..want])? {
                        0 => break,
                        n => done += n,
                    }
                }
                Ok(done)
            }
        }
    }

    /// Contiguous view of the whole source, available for the memory backend.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            BinarySource::Memory { bytes } => Some(bytes),
            BinarySource::Stream { .. } => None,
        }
    }
}

fn probe_size(path: &Path) -> anyhow::Result<u64> {
    let info = std::fs::metadata(path)
        .with_context(|| format!("can't find `{}`; are you sure you got the right path?", path.display()))?;
    if info.len() == 0 {
        bail!("`{}` is empty", path.display());
    }
    if info.len() > MAX_FILE_SIZE {
        bail!(
            "`{}` is larger than the {} MiB limit",
            path.display(),
            MAX_FILE_SIZE / 1024 / 1024
        );
    }
    Ok(info.len())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn read_within_bounds() {
        let mut source = BinarySource::from_bytes(vec![1, 2, 3, 4, 5]);
        let mut buf = [0; 3];
        assert_eq!(source.read(1, &mut buf).unwrap(), 3);
        assert_eq!(buf, [2, 3, 4]);
    }

    #[test]
    fn read_clamps_at_end() {
        let mut source = BinarySource::from_bytes(vec![1, 2, 3]);
        let mut buf = [0; 8];
        assert_eq!(source.read(2, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);
    }

    #[test]
    fn read_past_end_yields_zero_bytes() {
        let mut source = BinarySource::from_bytes(vec![1, 2, 3]);
        let mut buf = [0; 4];
        assert_eq!(source.read(3, &mut buf).unwrap(), 0);
        assert_eq!(source.read(100, &mut buf).unwrap(), 0);
    }

    #[test]
    fn memory_backend_exposes_contiguous_view() {
        let source = BinarySource::from_bytes(vec![7, 8]);
        assert_eq!(source.bytes(), Some(&[7, 8][..]));
        assert_eq!(source.len(), 2);
        assert!(!source.is_empty());
    }
}
