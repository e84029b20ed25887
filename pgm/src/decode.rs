//! Reading PGM streams into packed sample buffers.
//!
//! The header is parsed byte by byte from a [`BufRead`], which allows looking at the next byte
//! without consuming it. Sample data is then read in one go for binary files or token by token for
//! ASCII files.
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use log::debug;

use crate::buffer::PixelBuffer;
use crate::error::{Error, FormatError, Section};
use crate::limits::Limits;

/// The two sample encodings of the format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Whitespace separated decimal numbers, magic `P2`.
    Ascii,
    /// One raw byte per sample, magic `P5`.
    Binary,
}

/// The header fields preceding the sample data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    pub encoding: Encoding,
    pub width: u32,
    pub height: u32,
    /// The maximum sample value. Only 8-bit depths are supported.
    pub maxval: u8,
}

/// A decoder for a single image from a buffered stream.
///
/// ```
/// use image_pgm::Decoder;
///
/// let file = b"P2\n# a comment\n3 1\n255\n0 128 255\n";
/// let mut decoder = Decoder::new(&file[..]);
///
/// let header = decoder.read_header()?;
/// assert_eq!((header.width, header.height), (3, 1));
///
/// let image = decoder.decode()?;
/// assert_eq!(image.as_slice(), &[0, 128, 255]);
/// # Ok::<_, image_pgm::Error>(())
/// ```
pub struct Decoder<R> {
    reader: R,
    limits: Limits,
    state: State,
}

#[derive(Clone, Copy, Debug)]
enum State {
    Start,
    Header(Header),
    Failed,
}

impl Encoding {
    /// The two bytes that select this encoding at the start of a file.
    pub const fn magic(self) -> [u8; 2] {
        match self {
            Encoding::Ascii => *b"P2",
            Encoding::Binary => *b"P5",
        }
    }

    fn from_magic(magic: [u8; 2]) -> Option<Self> {
        match &magic {
            b"P2" => Some(Encoding::Ascii),
            b"P5" => Some(Encoding::Binary),
            _ => None,
        }
    }
}

impl Decoder<BufReader<File>> {
    /// Open a file for decoding.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!("opening {}", path.display());
        let file = File::open(path).map_err(Error::Io)?;
        Ok(Decoder::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Decoder {
            reader,
            limits: Limits::none(),
            state: State::Start,
        }
    }

    /// Configure the limits checked before allocating samples.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Parse the header, up to and including the separator before the sample data.
    ///
    /// This can be used to inspect an image before committing to decode it. Calling it more than
    /// once returns the same header without reading further. Once it has failed, every further
    /// call fails with [`Error::Unusable`].
    pub fn read_header(&mut self) -> Result<Header, Error> {
        match self.state {
            State::Header(header) => return Ok(header),
            State::Failed => return Err(Error::Unusable),
            State::Start => {}
        }

        let header = self.parse_header();
        self.state = match &header {
            Ok(header) => State::Header(*header),
            Err(_) => State::Failed,
        };
        header
    }

    fn parse_header(&mut self) -> Result<Header, Error> {
        let encoding = self.read_magic()?;
        let width = self.header_number()?;
        let height = self.header_number()?;

        let dimension = 1..=u64::from(PixelBuffer::MAX_DIMENSION);
        if !dimension.contains(&width) || !dimension.contains(&height) {
            return Err(FormatError::BadDimensions { width, height }.into());
        }

        let maxval = self.header_number()?;
        let maxval = u8::try_from(maxval).map_err(|_| Error::UnsupportedSampleDepth(maxval))?;

        match self.next_byte()? {
            None => return Err(Error::Truncated(Section::Separator)),
            Some(byte) if is_whitespace(byte) => {}
            Some(byte) => return Err(FormatError::MissingSeparator(byte).into()),
        }

        // Both fit, checked against the maximum dimension above.
        let header = Header {
            encoding,
            width: width as u32,
            height: height as u32,
            maxval,
        };

        debug!(
            "PGM header: {:?} {}x{} maxval {}",
            header.encoding, header.width, header.height, header.maxval
        );

        Ok(header)
    }

    /// Decode the image.
    ///
    /// The sample buffer is reserved up front but only filled as samples arrive, so a header
    /// promising more data than the stream holds costs no more than the data actually read.
    pub fn decode(mut self) -> Result<PixelBuffer, Error> {
        let header = self.read_header()?;
        self.limits.check(header.width, header.height)?;

        let (mut samples, len) = PixelBuffer::reserve(header.width, header.height)?;
        match header.encoding {
            Encoding::Binary => self.read_binary(&mut samples, len)?,
            Encoding::Ascii => self.read_ascii(&mut samples, len)?,
        }

        Ok(PixelBuffer::from_filled(header.width, header.height, samples))
    }

    fn read_magic(&mut self) -> Result<Encoding, Error> {
        let mut magic = [0u8; 2];
        for byte in &mut magic {
            *byte = self.next_byte()?.ok_or(Error::Truncated(Section::Magic))?;
        }

        Encoding::from_magic(magic).ok_or_else(|| FormatError::BadMagic(magic).into())
    }

    /// Skip whitespace and comments, then parse one decimal header field.
    fn header_number(&mut self) -> Result<u64, Error> {
        loop {
            match self.peek()? {
                None => return Err(Error::Truncated(Section::Header)),
                Some(b'#') => self.skip_comment()?,
                Some(byte) if is_whitespace(byte) => self.reader.consume(1),
                Some(byte) => {
                    return self
                        .decimal()?
                        .ok_or_else(|| FormatError::NotANumber(byte).into())
                }
            }
        }
    }

    /// Discard a comment, up to and including the line end.
    fn skip_comment(&mut self) -> Result<(), Error> {
        while let Some(byte) = self.next_byte()? {
            if byte == b'\n' {
                break;
            }
        }

        Ok(())
    }

    /// Consume a run of decimal digits, `None` if there is not at least one.
    ///
    /// The value saturates, it is only ever compared against much smaller bounds.
    fn decimal(&mut self) -> Result<Option<u64>, Error> {
        let mut value = None;
        while let Some(byte @ b'0'..=b'9') = self.peek()? {
            self.reader.consume(1);
            let digit = u64::from(byte - b'0');
            value = Some(value.unwrap_or(0u64).saturating_mul(10).saturating_add(digit));
        }

        Ok(value)
    }

    fn read_binary(&mut self, samples: &mut Vec<u8>, len: usize) -> Result<(), Error> {
        (&mut self.reader)
            .take(len as u64)
            .read_to_end(samples)
            .map_err(|err| Error::from_read(err, Section::Samples))?;

        if samples.len() < len {
            return Err(Error::Truncated(Section::Samples));
        }

        Ok(())
    }

    fn read_ascii(&mut self, samples: &mut Vec<u8>, len: usize) -> Result<(), Error> {
        for _ in 0..len {
            while let Some(byte) = self.peek()? {
                if !is_whitespace(byte) {
                    break;
                }
                self.reader.consume(1);
            }

            let value = self.decimal()?.ok_or(Error::Truncated(Section::Samples))?;
            let sample = u8::try_from(value).map_err(|_| FormatError::SampleOutOfRange(value))?;
            samples.push(sample);
        }

        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>, Error> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, Error> {
        let byte = self.peek()?;
        if byte.is_some() {
            self.reader.consume(1);
        }
        Ok(byte)
    }
}

/// Decode one image from a buffered stream.
pub fn decode(reader: impl BufRead) -> Result<PixelBuffer, Error> {
    Decoder::new(reader).decode()
}

/// Decode the image stored in a file.
pub fn read_file(path: impl AsRef<Path>) -> Result<PixelBuffer, Error> {
    Decoder::open(path)?.decode()
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

#[test]
fn header_only() {
    let mut decoder = Decoder::new(&b"P5 640\t480\r\n255\n"[..]);
    let header = decoder.read_header().expect("Valid header");
    assert_eq!(
        header,
        Header {
            encoding: Encoding::Binary,
            width: 640,
            height: 480,
            maxval: 255,
        }
    );
    assert_eq!(decoder.read_header().expect("Cached header"), header);
}

#[test]
fn header_fields_are_numbers() {
    let err = decode(&b"P5\n2x 2 255\n"[..]).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::NotANumber(b'x'))));

    let err = decode(&b"P5\n-2 2 255\n"[..]).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::NotANumber(b'-'))));
}

#[test]
fn separator_must_be_whitespace() {
    let err = decode(&b"P5\n1 1 255#\x00"[..]).unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::MissingSeparator(b'#'))
    ));

    let err = decode(&b"P5\n1 1 255"[..]).unwrap_err();
    assert!(matches!(err, Error::Truncated(Section::Separator)));
}

#[test]
fn failed_header_is_not_parsed_again() {
    // Parsing stops right after the bad maxval, the rest would read as a valid 1x1 header.
    let mut decoder = Decoder::new(&b"P5 3 4 999P5 1 1 255\n\x00"[..]);
    assert!(matches!(
        decoder.read_header(),
        Err(Error::UnsupportedSampleDepth(999))
    ));
    assert!(matches!(decoder.read_header(), Err(Error::Unusable)));
    assert!(matches!(decoder.decode(), Err(Error::Unusable)));
}

#[test]
fn missing_body_of_large_image() {
    // Far more samples promised than present, and no limits configured.
    let err = decode(&b"P5\n16384 16384 255\n"[..]).unwrap_err();
    assert!(matches!(err, Error::Truncated(Section::Samples)));

    let err = decode(&b"P5\n16384 16384 255\n\x01\x02\x03"[..]).unwrap_err();
    assert!(matches!(err, Error::Truncated(Section::Samples)));

    let err = decode(&b"P2\n16384 16384 255\n1 2 3\n"[..]).unwrap_err();
    assert!(matches!(err, Error::Truncated(Section::Samples)));
}

#[test]
fn limits_before_allocation() {
    let decoder = Decoder::new(&b"P5\n100000 100000 255\n"[..])
        .with_limits(Limits::none().with_max_pixels(1 << 20));
    assert!(matches!(
        decoder.decode(),
        Err(Error::LimitExceeded {
            width: 100000,
            height: 100000
        })
    ));
}
