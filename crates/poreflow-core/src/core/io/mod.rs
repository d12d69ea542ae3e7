//! Provides binary persistence for pore networks and permeability results.
//!
//! Both formats share the little-endian primitives in [`binary`] and the [`traits::RecordFile`]
//! interface. The result format is versioned; [`migration`] describes how older revisions map
//! onto the current record.

pub mod binary;
pub mod migration;
pub mod network_file;
pub mod result_file;
pub mod traits;

use binary::MAGIC_LEN;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// The kind of record a file holds, judged from its magic token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Network,
    Result,
    Unknown,
}

/// Peeks at the leading bytes of `path`, tolerating one control byte before the magic.
pub fn detect_kind<P: AsRef<Path>>(path: P) -> io::Result<FileKind> {
    let mut buf = [0u8; MAGIC_LEN + 1];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(kind_of(&buf[..filled]))
}

fn kind_of(bytes: &[u8]) -> FileKind {
    let starts_with = |magic: &[u8; MAGIC_LEN]| {
        bytes.starts_with(magic)
            || (bytes.first().is_some_and(u8::is_ascii_control) && bytes[1..].starts_with(magic))
    };
    if starts_with(network_file::NETWORK_MAGIC) {
        FileKind::Network
    } else if starts_with(result_file::RESULT_MAGIC) {
        FileKind::Result
    } else {
        FileKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_detected_from_magic() {
        assert_eq!(kind_of(b"PORENET1\x01"), FileKind::Network);
        assert_eq!(kind_of(b"\x0bPERMRSLT"), FileKind::Result);
        assert_eq!(kind_of(b"PERM"), FileKind::Unknown);
        assert_eq!(kind_of(b""), FileKind::Unknown);
    }

    #[test]
    fn detect_kind_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.bin");
        std::fs::write(&path, b"PORENET1rest").unwrap();
        assert_eq!(detect_kind(&path).unwrap(), FileKind::Network);
    }
}
