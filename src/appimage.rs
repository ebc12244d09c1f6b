// AppImage header inspection
//
// An AppImage is an ELF runtime followed by a filesystem image. The runtime
// marks itself with "AI" plus a type byte in the spare bytes of e_ident, and
// the filesystem starts right after the ELF section header table.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::archive::ArchiveError;

pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
pub const APPIMAGE_MAGIC: [u8; 2] = *b"AI";
pub const SQUASHFS_MAGIC: [u8; 4] = *b"hsqs";
pub const DWARFS_MAGIC: [u8; 6] = *b"DWARFS";

const ELF_CLASS_32: u8 = 1;
const ELF_CLASS_64: u8 = 2;
const ELF_DATA_BIG_ENDIAN: u8 = 2;

/// Filesystem image embedded after the runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadFormat {
    SquashFs,
    DwarFs,
    Unknown,
}

impl PayloadFormat {
    pub fn name(&self) -> &'static str {
        match self {
            PayloadFormat::SquashFs => "SquashFS",
            PayloadFormat::DwarFs => "DwarFS",
            PayloadFormat::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the ELF header tells us about an AppImage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppImageInfo {
    /// AppImage type from e_ident[10]; `None` when the "AI" magic is absent
    pub kind: Option<u8>,
    /// Byte offset of the embedded filesystem
    pub payload_offset: u64,
    pub format: PayloadFormat,
}

/// Inspect the AppImage at `path`.
pub fn inspect(path: &Path) -> Result<AppImageInfo, ArchiveError> {
    let mut reader = BufReader::new(File::open(path)?);
    let info = inspect_reader(&mut reader)?
        .ok_or_else(|| ArchiveError::NotElf(path.to_path_buf()))?;

    if info.kind.is_none() {
        log::warn!(
            "{} lacks the AppImage magic, treating it as type 2",
            path.display()
        );
    }
    log::debug!(
        "{}: type {}, {} payload at offset {}",
        path.display(),
        info.kind.map_or_else(|| "?".to_string(), |k| k.to_string()),
        info.format,
        info.payload_offset
    );
    Ok(info)
}

/// Inspect an ELF image from any seekable reader.
///
/// Returns `Ok(None)` when the data is not ELF at all.
pub fn inspect_reader<R: Read + Seek>(reader: &mut R) -> io::Result<Option<AppImageInfo>> {
    let mut ident = [0u8; 16];
    match reader.read_exact(&mut ident) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    if ident[..4] != ELF_MAGIC {
        return Ok(None);
    }

    let kind = (ident[8..10] == APPIMAGE_MAGIC).then_some(ident[10]);
    let big_endian = ident[5] == ELF_DATA_BIG_ENDIAN;

    let (shoff, shentsize, shnum) = match ident[4] {
        ELF_CLASS_64 => {
            reader.seek(SeekFrom::Start(40))?;
            let shoff = read_u64(reader, big_endian)?;
            reader.seek(SeekFrom::Start(58))?;
            (shoff, read_u16(reader, big_endian)?, read_u16(reader, big_endian)?)
        }
        ELF_CLASS_32 => {
            reader.seek(SeekFrom::Start(32))?;
            let shoff = u64::from(read_u32(reader, big_endian)?);
            reader.seek(SeekFrom::Start(46))?;
            (shoff, read_u16(reader, big_endian)?, read_u16(reader, big_endian)?)
        }
        class => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown ELF class {}", class),
            ))
        }
    };

    let payload_offset = shoff + u64::from(shnum) * u64::from(shentsize);
    let format = detect_format(reader, payload_offset)?;

    Ok(Some(AppImageInfo {
        kind,
        payload_offset,
        format,
    }))
}

fn detect_format<R: Read + Seek>(reader: &mut R, offset: u64) -> io::Result<PayloadFormat> {
    if offset == 0 {
        return Ok(PayloadFormat::Unknown);
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut magic = Vec::with_capacity(8);
    reader.take(8).read_to_end(&mut magic)?;

    if magic.starts_with(&SQUASHFS_MAGIC) {
        Ok(PayloadFormat::SquashFs)
    } else if magic.starts_with(&DWARFS_MAGIC) {
        Ok(PayloadFormat::DwarFs)
    } else {
        log::debug!("unrecognized payload magic {:02x?} at offset {}", magic, offset);
        Ok(PayloadFormat::Unknown)
    }
}

fn read_u16<R: Read>(reader: &mut R, big_endian: bool) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(if big_endian {
        u16::from_be_bytes(buf)
    } else {
        u16::from_le_bytes(buf)
    })
}

fn read_u32<R: Read>(reader: &mut R, big_endian: bool) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(if big_endian {
        u32::from_be_bytes(buf)
    } else {
        u32::from_le_bytes(buf)
    })
}

fn read_u64<R: Read>(reader: &mut R, big_endian: bool) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(if big_endian {
        u64::from_be_bytes(buf)
    } else {
        u64::from_le_bytes(buf)
    })
}
