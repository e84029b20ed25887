//! Writing sample patches as PGM streams.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::decode::Encoding;
use crate::error::Error;
use crate::layout::{AddressingDescriptor, PatchRef};

/// Lines of ASCII sample data are wrapped before exceeding this many characters.
const MAX_ASCII_LINE: usize = 70;

/// An encoder writing one image to a stream.
///
/// The samples are always written in row-major order, left to right and top to bottom, whatever
/// the physical layout of the patch. The source is only ever read.
///
/// ```
/// use image_pgm::{Encoder, PixelBuffer};
///
/// let image = PixelBuffer::from_samples(2, 2, vec![10, 20, 30, 40]).unwrap();
/// let file = Encoder::new(Vec::new()).encode(&image.overlay())?;
/// assert_eq!(file, b"P5\n2 2 255\n\x0a\x14\x1e\x28");
/// # Ok::<_, image_pgm::Error>(())
/// ```
pub struct Encoder<W> {
    writer: W,
    encoding: Encoding,
}

impl<W: Write> Encoder<W> {
    /// Create an encoder for binary sample data.
    pub fn new(writer: W) -> Self {
        Encoder {
            writer,
            encoding: Encoding::Binary,
        }
    }

    /// Choose the sample encoding.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Write the patch and flush the stream, returning the writer.
    ///
    /// Any failure to write is reported as [`Error::Io`]. The output written up to that point is
    /// incomplete and should be discarded.
    pub fn encode(mut self, patch: &PatchRef<'_>) -> Result<W, Error> {
        debug!(
            "encoding {}x{} patch as {:?}, {:?}",
            patch.width(),
            patch.height(),
            self.encoding,
            patch.addressing()
        );

        self.write_header(patch.width(), patch.height())?;

        let mut scratch = Vec::new();
        for y in 0..patch.height() {
            let row = match patch.contiguous_row(y) {
                Some(row) => row,
                None => {
                    patch.gather_row(y, &mut scratch);
                    &scratch[..]
                }
            };

            match self.encoding {
                Encoding::Binary => self.writer.write_all(row).map_err(Error::Io)?,
                Encoding::Ascii => self.write_ascii_row(row)?,
            }
        }

        self.writer.flush().map_err(Error::Io)?;
        Ok(self.writer)
    }

    fn write_header(&mut self, width: u32, height: u32) -> Result<(), Error> {
        let [p, kind] = self.encoding.magic();
        write!(
            self.writer,
            "{}{}\n{} {} 255\n",
            p as char, kind as char, width, height
        )
        .map_err(Error::Io)
    }

    fn write_ascii_row(&mut self, row: &[u8]) -> Result<(), Error> {
        let mut column = 0;
        for &sample in row {
            let len = decimal_len(sample);
            if column > 0 {
                if column + 1 + len > MAX_ASCII_LINE {
                    self.writer.write_all(b"\n").map_err(Error::Io)?;
                    column = 0;
                } else {
                    self.writer.write_all(b" ").map_err(Error::Io)?;
                    column += 1;
                }
            }

            write!(self.writer, "{sample}").map_err(Error::Io)?;
            column += len;
        }

        self.writer.write_all(b"\n").map_err(Error::Io)
    }
}

/// Write the samples of a buffer addressed by `addressing` as a binary PGM stream.
///
/// The addressing is validated against the buffer before anything is written: if any sample of
/// the `width` by `height` grid would lie outside of `data` this fails with
/// [`Error::Addressing`].
pub fn encode(
    writer: impl Write,
    width: u32,
    height: u32,
    addressing: AddressingDescriptor,
    data: &[u8],
) -> Result<(), Error> {
    let patch = PatchRef::with_addressing(width, height, addressing, data)?;
    Encoder::new(writer).encode(&patch)?;
    Ok(())
}

/// Create a file and write the patch into it, as binary PGM.
pub fn write_file(path: impl AsRef<Path>, patch: &PatchRef<'_>) -> Result<(), Error> {
    let path = path.as_ref();
    debug!("creating {}", path.display());
    let file = File::create(path).map_err(Error::Io)?;
    Encoder::new(BufWriter::new(file)).encode(patch)?;
    Ok(())
}

fn decimal_len(sample: u8) -> usize {
    match sample {
        0..=9 => 1,
        10..=99 => 2,
        _ => 3,
    }
}

#[test]
fn ascii_lines_are_wrapped() {
    let image = crate::PixelBuffer::from_samples(30, 1, vec![200; 30]).unwrap();
    let file = Encoder::new(Vec::new())
        .with_encoding(Encoding::Ascii)
        .encode(&image.overlay())
        .unwrap();

    let text = String::from_utf8(file).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("P2"));
    assert_eq!(lines.next(), Some("30 1 255"));
    // 17 samples of "200" with separators take 67 characters.
    let first = lines.next().unwrap();
    assert_eq!(first.len(), 67);
    assert_eq!(lines.next().unwrap().split(' ').count(), 13);
    assert_eq!(lines.next(), None);
}

#[test]
fn write_failure_is_reported() {
    #[derive(Debug)]
    struct Full;

    impl Write for Full {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::WriteZero.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let image = crate::PixelBuffer::from_samples(1, 1, vec![0]).unwrap();
    let err = Encoder::new(Full).encode(&image.overlay()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
