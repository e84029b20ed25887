use core::fmt;
use std::io;

use thiserror::Error;

use crate::layout::BadAddressingError;

/// The failures of decoding or encoding a PGM stream.
///
/// Every failure is terminal for the call that reported it, nothing is retried or partially
/// recovered. Whether that is fatal for the program is left to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The header is malformed.
    #[error("malformed PGM data: {0}")]
    Format(#[from] FormatError),
    /// The maximum sample value requires more than 8 bits per sample.
    #[error("unsupported sample depth, maxval {0} exceeds 255")]
    UnsupportedSampleDepth(u64),
    /// The stream ended before the expected content.
    #[error("PGM stream ends within the {0}")]
    Truncated(Section),
    /// The sample buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes of samples")]
    OutOfMemory { bytes: u64 },
    /// The image dimensions exceed the configured decoding limits.
    #[error("image of {width}x{height} exceeds the configured limits")]
    LimitExceeded { width: u32, height: u32 },
    /// A patch description does not fit its buffer.
    #[error(transparent)]
    Addressing(#[from] BadAddressingError),
    /// A decoder was used again after it had already reported an error.
    ///
    /// The stream position is unknown after a failure, so nothing more is parsed from it.
    #[error("the decoder cannot continue after an earlier error")]
    Unusable,
    /// Reading or writing the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

/// The reasons for a malformed header or sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("bad magic number `{}`", magic_text(.0))]
    BadMagic([u8; 2]),
    #[error("expected a decimal number in the header, found byte {0:#04x}")]
    NotANumber(u8),
    #[error("invalid dimensions {width}x{height}")]
    BadDimensions { width: u64, height: u64 },
    #[error("expected a single whitespace after maxval, found byte {0:#04x}")]
    MissingSeparator(u8),
    #[error("sample value {0} does not fit into 8 bits")]
    SampleOutOfRange(u64),
}

/// The part of the stream in which input ended early.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Magic,
    Header,
    Separator,
    Samples,
}

fn magic_text(magic: &[u8; 2]) -> String {
    magic.escape_ascii().to_string()
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Section::Magic => "magic number",
            Section::Header => "header",
            Section::Separator => "header separator",
            Section::Samples => "sample data",
        })
    }
}

impl Error {
    /// Classify an error of a read that was required to complete.
    pub(crate) fn from_read(err: io::Error, section: Section) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated(section)
        } else {
            Error::Io(err)
        }
    }
}

#[test]
fn messages() {
    let magic = Error::from(FormatError::BadMagic(*b"P6"));
    assert_eq!(magic.to_string(), "malformed PGM data: bad magic number `P6`");

    let depth = Error::UnsupportedSampleDepth(65535);
    assert_eq!(
        depth.to_string(),
        "unsupported sample depth, maxval 65535 exceeds 255"
    );

    let truncated = Error::Truncated(Section::Samples);
    assert_eq!(truncated.to_string(), "PGM stream ends within the sample data");
}
