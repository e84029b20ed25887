//! Resource limits for decoding.
//!
//! [`Limits`] are checked once the header is known and before any sample buffer is allocated, so
//! that untrusted input can't request arbitrary amounts of memory.
use crate::error::Error;

/// Caps on the dimensions of decoded images.
///
/// All fields are optional; `None` means no limit for that dimension.
///
/// ```
/// use image_pgm::Limits;
///
/// let limits = Limits::none()
///     .with_max_pixels(16_000_000)
///     .with_max_width(8192);
/// assert!(limits.check(4096, 4096).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    /// Maximum image width in samples.
    pub max_width: Option<u32>,
    /// Maximum image height in samples.
    pub max_height: Option<u32>,
    /// Maximum total samples (width × height).
    pub max_pixels: Option<u64>,
}

impl Limits {
    /// No limits (all fields `None`).
    pub fn none() -> Self {
        Self::default()
    }

    /// Set maximum image width.
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Set maximum image height.
    pub fn with_max_height(mut self, height: u32) -> Self {
        self.max_height = Some(height);
        self
    }

    /// Set maximum total samples.
    pub fn with_max_pixels(mut self, pixels: u64) -> Self {
        self.max_pixels = Some(pixels);
        self
    }

    /// Whether any limits are set.
    pub fn has_any(&self) -> bool {
        self.max_width.is_some() || self.max_height.is_some() || self.max_pixels.is_some()
    }

    /// Check image dimensions against these limits.
    pub fn check(&self, width: u32, height: u32) -> Result<(), Error> {
        let pixels = u64::from(width) * u64::from(height);
        let exceeded = self.max_width.is_some_and(|max| width > max)
            || self.max_height.is_some_and(|max| height > max)
            || self.max_pixels.is_some_and(|max| pixels > max);

        if exceeded {
            Err(Error::LimitExceeded { width, height })
        } else {
            Ok(())
        }
    }
}

#[test]
fn unlimited() {
    let limits = Limits::none();
    assert!(!limits.has_any());
    assert!(limits.check(u32::MAX, u32::MAX).is_ok());
}

#[test]
fn each_limit_applies() {
    let width = Limits::none().with_max_width(10);
    assert!(width.check(10, 1000).is_ok());
    assert!(width.check(11, 1).is_err());

    let height = Limits::none().with_max_height(10);
    assert!(height.check(1000, 10).is_ok());
    assert!(height.check(1, 11).is_err());

    let pixels = Limits::none().with_max_pixels(100);
    assert!(pixels.has_any());
    assert!(pixels.check(10, 10).is_ok());
    assert!(pixels.check(10, 11).is_err());
}
