//! Geometry of the device independent bitmap used as the bitmap copy intermediate.

pub const BI_RGB: u32 = 0;
pub const BI_BITFIELDS: u32 = 3;

/// Size of `BITMAPINFOHEADER`.
pub const BITMAPINFOHEADER_SIZE: usize = 40;

/// Size of one `RGBQUAD` color table entry (or one bit field mask).
pub const RGBQUAD_SIZE: usize = 4;

/// Header and pixel buffer layout for a bitmap of a given size and color depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DibLayout {
    pub width: i32,
    pub height: i32,
    pub bit_count: u16,
    pub compression: u32,
    /// Number of color table entries (or bit field masks) following the header.
    pub color_table_len: usize,
    /// Bytes per pixel row, padded to a 4 byte boundary.
    pub stride: usize,
}

impl DibLayout {
    /// Layout for a bitmap with the given dimensions and bits per pixel.
    ///
    /// Returns `None` for empty bitmaps and unsupported color depths.
    #[must_use]
    pub fn for_bitmap(width: i32, height: i32, bit_count: u16) -> Option<Self> {
        if width <= 0 || height == 0 {
            return None;
        }

        let (color_table_len, compression) = match bit_count {
            1 => (2, BI_RGB),
            4 => (16, BI_RGB),
            8 => (256, BI_RGB),
            16 | 32 => (3, BI_BITFIELDS),
            24 => (0, BI_RGB),
            _ => return None,
        };

        let row_bits = usize::try_from(width).ok()?.checked_mul(usize::from(bit_count))?;
        let stride = row_bits.div_ceil(32) * 4;

        Some(Self {
            width,
            height,
            bit_count,
            compression,
            color_table_len,
            stride,
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.height.unsigned_abs() as usize
    }

    #[must_use]
    pub fn header_size(&self) -> usize {
        BITMAPINFOHEADER_SIZE + RGBQUAD_SIZE * self.color_table_len
    }

    #[must_use]
    pub fn image_size(&self) -> usize {
        self.stride * self.rows()
    }

    #[must_use]
    pub fn total_size(&self) -> usize {
        self.header_size() + self.image_size()
    }
}

/// Color table length implied by a DIB header, used when turning the intermediate back into a
/// device dependent bitmap.
#[must_use]
pub fn color_table_len_from_header(planes: u16, bit_count: u16, clr_used: u32) -> usize {
    if clr_used != 0 {
        return clr_used as usize;
    }

    match u32::from(planes) * u32::from(bit_count) {
        1 => 2,
        0 | 2..=4 => 16,
        5..=8 => 256,
        9..=16 => 3,
        17..=24 => 0,
        _ => 3,
    }
}
