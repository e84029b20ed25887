//! Strided and scaled addressing of 8-bit samples.
//!
//! This is the most general source of sample data the codec reads from. An
//! [`AddressingDescriptor`] maps the logical coordinates of a pixel grid onto byte offsets of a
//! physical buffer that need not have been allocated by this crate. An imaging runtime may hand out
//! a patch of its own memory with padded rows, sub-sampled axes or columns stored before rows.
//!
//! In comparison to a [`PixelBuffer`](crate::PixelBuffer), the reference types do not rely on
//! owning the data. A [`PatchLayout`] validates a description against a width and height once, and
//! a [`PatchRef`] then pairs it with a byte slice that is long enough to hold every addressed
//! sample. All reads through a `PatchRef` are in bounds by construction.
use bytemuck::{Pod, Zeroable};
use core::fmt;
use core::ops::Range;

/// The denominator of the fixed-point `scale` fields.
///
/// A scale of exactly this value maps logical samples 1:1 onto physical ones.
pub const SCALE_UNITY: u32 = 1024;

/// Describes how a logical 2D grid of samples maps onto a 1D physical buffer.
///
/// The descriptor is independent of any buffer contents and of the grid's dimensions. The layout
/// matches the patch addressing record of the runtime ABI so it can be exchanged as raw bytes, see
/// [`Self::from_bytes`] and [`Self::as_bytes`].
///
/// The physical offset of the logical coordinate `(x, y)` is
///
/// ```text
/// offset(x, y) = (stride_y * y * scale_y) / SCALE_UNITY + (stride_x * x * scale_x) / SCALE_UNITY
/// ```
///
/// and this is the only rule by which samples are located.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct AddressingDescriptor {
    /// The number of bytes to go one sample along the width.
    pub stride_x: i32,
    /// The number of bytes to go one sample along the height.
    pub stride_y: i32,
    /// Horizontal logical to physical ratio, relative to [`SCALE_UNITY`].
    pub scale_x: u32,
    /// Vertical logical to physical ratio, relative to [`SCALE_UNITY`].
    pub scale_y: u32,
    /// The minimum valid horizontal increment when iterating.
    pub step_x: u32,
    /// The minimum valid vertical increment when iterating.
    pub step_y: u32,
}

/// A validated mapping of a `width` by `height` grid through an [`AddressingDescriptor`].
///
/// The invariant is that every coordinate within the grid has a non-negative offset that fits into
/// memory, and that all of them lie below [`Self::byte_len`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatchLayout {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) addressing: AddressingDescriptor,
    /// The number of bytes spanned from the base, as proof of calculation basically.
    pub(crate) total: usize,
}

/// A read-only reference to a patch of samples in memory not necessarily owned by this crate.
///
/// This is what the encoder reads from. The underlying bytes are only borrowed and never written.
#[derive(Clone, Copy)]
pub struct PatchRef<'data> {
    pub(crate) layout: PatchLayout,
    pub(crate) data: &'data [u8],
}

/// A mutable reference to a patch of samples, for filling memory under a foreign layout.
///
/// Validated exactly like a [`PatchRef`], so all writes are in bounds by construction. Where the
/// addressing maps several logical samples onto one byte, the last one written wins.
pub struct PatchMut<'data> {
    layout: PatchLayout,
    data: &'data mut [u8],
}

/// Error that occurs when an addressing description can not be used for a patch.
#[derive(Debug)]
pub struct BadAddressingError {
    kind: BadAddressingKind,
}

#[derive(Debug)]
enum BadAddressingKind {
    EmptyPatch,
    ZeroScale,
    ZeroStep,
    NegativeOffset,
    OutOfMemory,
    BufferTooSmall { required: usize, available: usize },
}

impl AddressingDescriptor {
    /// The dense, row-major addressing of an unpadded buffer `width` samples wide.
    ///
    /// Returns `None` only if the width does not fit the signed row stride.
    pub fn unit(width: u32) -> Option<Self> {
        let stride_y = i32::try_from(width).ok()?;
        Some(Self::row_major(stride_y))
    }

    pub(crate) const fn row_major(stride_y: i32) -> Self {
        AddressingDescriptor {
            stride_x: 1,
            stride_y,
            scale_x: SCALE_UNITY,
            scale_y: SCALE_UNITY,
            step_x: 1,
            step_y: 1,
        }
    }

    /// Read a descriptor from its raw representation, as exchanged with a runtime.
    ///
    /// The slice must have exactly the size of the descriptor; it need not be aligned.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }

    /// View the raw representation of this descriptor.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Calculate the physical offset of a logical coordinate.
    ///
    /// Returns `None` if the calculation overflows. The result may be negative for negative
    /// strides, such an offset is never accessible from the base of a patch.
    pub fn offset(&self, x: u32, y: u32) -> Option<i64> {
        let row = Self::axis_offset(self.stride_y, y, self.scale_y)?;
        let col = Self::axis_offset(self.stride_x, x, self.scale_x)?;
        row.checked_add(col)
    }

    /// Whether consecutive samples of one row are consecutive bytes.
    pub fn has_contiguous_rows(&self) -> bool {
        self.stride_x == 1 && self.scale_x == SCALE_UNITY
    }

    fn axis_offset(stride: i32, coord: u32, scale: u32) -> Option<i64> {
        let scaled = i64::from(stride)
            .checked_mul(i64::from(coord))?
            .checked_mul(i64::from(scale))?;
        Some(scaled / i64::from(SCALE_UNITY))
    }
}

impl PatchLayout {
    /// Try to validate an addressing description for a grid of the given size.
    ///
    /// This fails if the grid is empty, if a scale or step is zero, or if any sample of the grid
    /// would lie before the base or outside the addressable memory.
    pub fn new(
        width: u32,
        height: u32,
        addressing: AddressingDescriptor,
    ) -> Result<Self, BadAddressingError> {
        if width == 0 || height == 0 {
            return Err(BadAddressingKind::EmptyPatch.into());
        }

        if addressing.scale_x == 0 || addressing.scale_y == 0 {
            return Err(BadAddressingKind::ZeroScale.into());
        }

        if addressing.step_x == 0 || addressing.step_y == 0 {
            return Err(BadAddressingKind::ZeroStep.into());
        }

        // The offset is monotone along each axis, for either sign of the stride. Hence its extrema
        // over the whole grid are attained at the corners.
        let (max_x, max_y) = (width - 1, height - 1);
        let mut lowest = 0i64;
        let mut highest = 0i64;
        for (x, y) in [(max_x, 0), (0, max_y), (max_x, max_y)] {
            let offset = addressing
                .offset(x, y)
                .ok_or(BadAddressingKind::OutOfMemory)?;
            lowest = lowest.min(offset);
            highest = highest.max(offset);
        }

        if lowest < 0 {
            return Err(BadAddressingKind::NegativeOffset.into());
        }

        let total = usize::try_from(highest)
            .ok()
            .and_then(|end| end.checked_add(1))
            .ok_or(BadAddressingKind::OutOfMemory)?;

        Ok(PatchLayout {
            width,
            height,
            addressing,
            total,
        })
    }

    /// The layout of a packed, row-major buffer.
    ///
    /// The caller guarantees that the width fits the row stride and that `width * height` is
    /// addressable, which [`PixelBuffer`](crate::PixelBuffer) ensures for its own samples.
    pub(crate) fn dense(width: u32, height: u32, total: usize) -> Self {
        PatchLayout {
            width,
            height,
            addressing: AddressingDescriptor::row_major(width as i32),
            total,
        }
    }

    /// Get the width of the grid.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Get the height of the grid.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Get the addressing description of this layout.
    pub const fn addressing(&self) -> AddressingDescriptor {
        self.addressing
    }

    /// The number of bytes a buffer needs so that all samples are in bounds.
    pub const fn byte_len(&self) -> usize {
        self.total
    }

    /// The physical offset of a coordinate, or `None` if it is outside the grid.
    pub fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(self.index(x, y))
        } else {
            None
        }
    }

    /// The offset of a coordinate that is known to be within the grid.
    fn index(&self, x: u32, y: u32) -> usize {
        let AddressingDescriptor {
            stride_x,
            stride_y,
            scale_x,
            scale_y,
            ..
        } = self.addressing;
        let unity = i64::from(SCALE_UNITY);
        // Can't overflow or be negative, the corners bounding all of these were validated.
        let row = i64::from(stride_y) * i64::from(y) * i64::from(scale_y) / unity;
        let col = i64::from(stride_x) * i64::from(x) * i64::from(scale_x) / unity;
        (row + col) as usize
    }

    fn contiguous_row(&self, y: u32) -> Option<Range<usize>> {
        if self.addressing.has_contiguous_rows() {
            let start = self.index(0, y);
            Some(start..start + self.width as usize)
        } else {
            None
        }
    }
}

impl<'data> PatchRef<'data> {
    /// View bytes under a validated patch layout.
    ///
    /// Fails if the content is too short to contain every sample of the layout. Any bytes beyond
    /// [`PatchLayout::byte_len`] are ignored.
    pub fn new(layout: PatchLayout, content: &'data [u8]) -> Result<Self, BadAddressingError> {
        let data = content
            .get(..layout.total)
            .ok_or(BadAddressingKind::BufferTooSmall {
                required: layout.total,
                available: content.len(),
            })?;
        Ok(PatchRef { layout, data })
    }

    /// Validate a raw addressing description against a buffer in one go.
    pub fn with_addressing(
        width: u32,
        height: u32,
        addressing: AddressingDescriptor,
        content: &'data [u8],
    ) -> Result<Self, BadAddressingError> {
        let layout = PatchLayout::new(width, height, addressing)?;
        Self::new(layout, content)
    }

    pub fn layout(&self) -> PatchLayout {
        self.layout
    }

    pub fn width(&self) -> u32 {
        self.layout.width
    }

    pub fn height(&self) -> u32 {
        self.layout.height
    }

    pub fn addressing(&self) -> AddressingDescriptor {
        self.layout.addressing
    }

    /// Get the sample at a logical coordinate, if it is within the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        let index = self.layout.offset(x, y)?;
        Some(self.data[index])
    }

    /// Borrow a row directly if its samples are consecutive bytes.
    pub fn contiguous_row(&self, y: u32) -> Option<&'data [u8]> {
        if y >= self.layout.height {
            return None;
        }

        let range = self.layout.contiguous_row(y)?;
        Some(&self.data[range])
    }

    /// Copy one row of samples, in logical order, into a buffer.
    ///
    /// # Panics
    ///
    /// If the row is not within the grid.
    pub fn gather_row(&self, y: u32, into: &mut Vec<u8>) {
        assert!(y < self.layout.height, "Row {y} is out of bounds");
        into.clear();
        into.extend((0..self.layout.width).map(|x| self.data[self.layout.index(x, y)]));
    }
}

impl<'data> PatchMut<'data> {
    /// Pair bytes with a validated patch layout for writing.
    ///
    /// Fails under the same conditions as [`PatchRef::new`].
    pub fn new(layout: PatchLayout, content: &'data mut [u8]) -> Result<Self, BadAddressingError> {
        let available = content.len();
        let data = content
            .get_mut(..layout.total)
            .ok_or(BadAddressingKind::BufferTooSmall {
                required: layout.total,
                available,
            })?;
        Ok(PatchMut { layout, data })
    }

    pub fn layout(&self) -> PatchLayout {
        self.layout
    }

    /// Write one row of samples, given in logical order.
    ///
    /// # Panics
    ///
    /// If the row is not within the grid or `row` is not exactly as wide as the grid.
    pub fn scatter_row(&mut self, y: u32, row: &[u8]) {
        assert!(y < self.layout.height, "Row {y} is out of bounds");
        assert_eq!(row.len(), self.layout.width as usize, "Row width mismatch");

        if let Some(range) = self.layout.contiguous_row(y) {
            self.data[range].copy_from_slice(row);
            return;
        }

        for (x, &sample) in (0..self.layout.width).zip(row) {
            self.data[self.layout.index(x, y)] = sample;
        }
    }
}

impl fmt::Debug for PatchRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PatchRef")
            .field("layout", &self.layout)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl From<BadAddressingKind> for BadAddressingError {
    fn from(kind: BadAddressingKind) -> Self {
        BadAddressingError { kind }
    }
}

impl fmt::Display for BadAddressingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            BadAddressingKind::EmptyPatch => write!(f, "patch has no samples"),
            BadAddressingKind::ZeroScale => write!(f, "patch addressing has a zero scale"),
            BadAddressingKind::ZeroStep => write!(f, "patch addressing has a zero step"),
            BadAddressingKind::NegativeOffset => {
                write!(f, "patch addressing reaches before its base")
            }
            BadAddressingKind::OutOfMemory => {
                write!(f, "patch addressing exceeds the addressable memory")
            }
            BadAddressingKind::BufferTooSmall {
                required,
                available,
            } => write!(
                f,
                "patch requires {required} bytes but the buffer has only {available}"
            ),
        }
    }
}

impl std::error::Error for BadAddressingError {}

#[test]
fn unit_offsets() {
    let unit = AddressingDescriptor::unit(3).expect("Small width");
    assert_eq!(unit.offset(0, 0), Some(0));
    assert_eq!(unit.offset(2, 0), Some(2));
    assert_eq!(unit.offset(0, 1), Some(3));
    assert_eq!(unit.offset(2, 3), Some(11));
    assert!(unit.has_contiguous_rows());

    let layout = PatchLayout::new(3, 4, unit).expect("Valid layout");
    assert_eq!(layout.byte_len(), 12);
    assert_eq!(layout.offset(3, 0), None);
}

#[test]
fn scaled_offsets() {
    // Half resolution horizontally: two logical samples share one physical one.
    let half = AddressingDescriptor {
        scale_x: SCALE_UNITY / 2,
        ..AddressingDescriptor::row_major(2)
    };
    assert_eq!(half.offset(0, 0), Some(0));
    assert_eq!(half.offset(1, 0), Some(0));
    assert_eq!(half.offset(2, 0), Some(1));
    assert_eq!(half.offset(3, 1), Some(3));
    assert!(!half.has_contiguous_rows());
}

#[test]
fn validation() {
    let unit = AddressingDescriptor::row_major(4);
    assert!(PatchLayout::new(0, 4, unit).is_err());
    assert!(PatchLayout::new(4, 0, unit).is_err());

    let zero_scale = AddressingDescriptor { scale_y: 0, ..unit };
    assert!(PatchLayout::new(4, 4, zero_scale).is_err());
    let zero_step = AddressingDescriptor { step_x: 0, ..unit };
    assert!(PatchLayout::new(4, 4, zero_step).is_err());

    let upwards = AddressingDescriptor {
        stride_y: -4,
        ..unit
    };
    assert!(PatchLayout::new(4, 1, upwards).is_ok());
    assert!(PatchLayout::new(4, 2, upwards).is_err());

    let huge = AddressingDescriptor {
        stride_y: i32::MAX,
        scale_y: u32::MAX,
        ..unit
    };
    assert!(PatchLayout::new(4, u32::MAX, huge).is_err());
}

#[test]
fn column_major_rows() {
    // A 2x3 grid stored column by column.
    let columns = AddressingDescriptor {
        stride_x: 3,
        stride_y: 1,
        ..AddressingDescriptor::row_major(0)
    };
    let data = [0u8, 2, 4, 1, 3, 5];
    let patch = PatchRef::with_addressing(2, 3, columns, &data).expect("Valid patch");
    assert!(patch.contiguous_row(0).is_none());

    let mut row = Vec::new();
    patch.gather_row(1, &mut row);
    assert_eq!(row, [2, 3]);
    assert_eq!(patch.get(1, 2), Some(5));
    assert_eq!(patch.get(2, 0), None);
}

#[test]
fn raw_descriptor_bytes() {
    let unit = AddressingDescriptor::row_major(640);
    let bytes = unit.as_bytes().to_vec();
    assert_eq!(bytes.len(), 24);
    assert_eq!(AddressingDescriptor::from_bytes(&bytes), Some(unit));
    assert_eq!(AddressingDescriptor::from_bytes(&bytes[1..]), None);
}

#[test]
fn scattered_rows() {
    let padded = AddressingDescriptor::row_major(4);
    let layout = PatchLayout::new(3, 2, padded).expect("Valid layout");
    assert_eq!(layout.byte_len(), 7);

    assert!(PatchMut::new(layout, &mut [0u8; 6]).is_err());

    let mut data = [0xEEu8; 8];
    let mut patch = PatchMut::new(layout, &mut data).expect("Large enough");
    patch.scatter_row(0, &[1, 2, 3]);
    patch.scatter_row(1, &[4, 5, 6]);
    assert_eq!(data, [1, 2, 3, 0xEE, 4, 5, 6, 0xEE]);

    let columns = AddressingDescriptor {
        stride_x: 2,
        stride_y: 1,
        ..AddressingDescriptor::row_major(0)
    };
    let mut data = [0u8; 6];
    let layout = PatchLayout::new(3, 2, columns).expect("Valid layout");
    let mut patch = PatchMut::new(layout, &mut data).expect("Exact size");
    patch.scatter_row(0, &[1, 2, 3]);
    patch.scatter_row(1, &[4, 5, 6]);
    assert_eq!(data, [1, 4, 2, 5, 3, 6]);
}
