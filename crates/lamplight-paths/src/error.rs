use std::fmt;
use std::io;

/// Errors that can occur when loading map data.
#[derive(Debug)]
pub enum LoadError {
    /// The underlying reader failed or ended early.
    Io(io::Error),
    /// The collision bundle does not start with the expected magic bytes.
    BadMagic([u8; 4]),
    /// The collision bundle uses a format version this crate cannot read.
    UnsupportedVersion(u16),
    /// A region's payload length disagrees with its declared level count.
    RegionSize {
        region: (i32, i32),
        expected: usize,
        found: usize,
    },
    /// A line of the transport table could not be parsed.
    Transport { line: usize, reason: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "map data: {e}"),
            Self::BadMagic(m) => write!(f, "collision map: bad magic {m:02x?}"),
            Self::UnsupportedVersion(v) => {
                write!(f, "collision map: unsupported format version {v}")
            }
            Self::RegionSize {
                region,
                expected,
                found,
            } => write!(
                f,
                "collision map: region ({}, {}) has {found} bytes, expected {expected}",
                region.0, region.1
            ),
            Self::Transport { line, reason } => {
                write!(f, "transport table line {line}: {reason}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
