//! Win32 implementation of the clipboard primitives.
//!
//! Flat formats are copied as movable global memory. Palettes, bitmaps and both metafile
//! flavors are GDI objects and get their own duplication and release paths.

use std::{ffi::c_void, mem::size_of, ptr};

use recaps_core::clipboard::{
    BITMAPINFOHEADER_SIZE, CF_UNICODETEXT, ClipboardError, ClipboardSystem, DibLayout, Duplicate,
    color_table_len_from_header, decode_unicode_text,
};
use windows::{
    Win32::{
        Foundation::{ERROR_SUCCESS, GetLastError, HANDLE, HGLOBAL},
        Graphics::Gdi::{
            BITMAP, BITMAPINFO, BITMAPINFOHEADER, CopyEnhMetaFileW, CopyMetaFileW,
            CreateDIBitmap, CreatePalette, DIB_RGB_COLORS, DeleteEnhMetaFile, DeleteMetaFile,
            DeleteObject, GetDC, GetDIBits, GetEnhMetaFileBits, GetMetaFileBitsEx, GetObjectW,
            GetPaletteEntries, HBITMAP, HDC, HENHMETAFILE, HGDIOBJ, HMETAFILE, HPALETTE,
            LOGPALETTE, PALETTEENTRY, ReleaseDC,
        },
        System::{
            DataExchange::{
                CloseClipboard, EmptyClipboard, EnumClipboardFormats, GetClipboardData,
                IsClipboardFormatAvailable, OpenClipboard, SetClipboardData,
            },
            Memory::{
                GMEM_MOVEABLE, GlobalAlloc, GlobalFlags, GlobalFree, GlobalLock, GlobalSize,
                GlobalUnlock,
            },
        },
    },
    core::PCWSTR,
};

use crate::utils::helpers;

/// `GlobalFlags` bit set for a block whose memory was discarded.
const GMEM_DISCARDED: u32 = 0x4000;

/// `CreateDIBitmap` flag: initialize the bitmap from the supplied bits.
const CBM_INIT: u32 = 4;

/// Layout of `METAFILEPICT`.
#[repr(C)]
#[derive(Clone, Copy)]
struct MetafilePict {
    mm: i32,
    x_ext: i32,
    y_ext: i32,
    hmf: HMETAFILE,
}

fn os_error(what: &str) -> ClipboardError {
    ClipboardError::Os(format!("{what}: {}", helpers::last_error()))
}

/// The process clipboard. Opened without an owner window.
#[derive(Debug, Default)]
pub struct Win32Clipboard;

/// Global memory block freed on drop unless ownership was handed over.
struct GlobalMem {
    handle: HGLOBAL,
    owned: bool,
}

impl GlobalMem {
    fn alloc(bytes: usize) -> Result<Self, ClipboardError> {
        let handle = unsafe { GlobalAlloc(GMEM_MOVEABLE, bytes) }
            .map_err(|e| ClipboardError::Os(format!("GlobalAlloc: {e}")))?;
        Ok(Self {
            handle,
            owned: true,
        })
    }

    fn into_handle(mut self) -> HANDLE {
        self.owned = false;
        HANDLE(self.handle.0)
    }
}

impl Drop for GlobalMem {
    fn drop(&mut self) {
        if self.owned && !self.handle.0.is_null() {
            unsafe {
                let _ = GlobalFree(self.handle);
            }
        }
    }
}

/// Pointer into a locked global block, unlocked on drop.
struct GlobalLockGuard {
    handle: HGLOBAL,
    ptr: *mut c_void,
}

impl GlobalLockGuard {
    fn lock(handle: HGLOBAL) -> Result<Self, ClipboardError> {
        let ptr = unsafe { GlobalLock(handle) };
        if ptr.is_null() {
            return Err(os_error("GlobalLock"));
        }
        Ok(Self { handle, ptr })
    }
}

impl Drop for GlobalLockGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = GlobalUnlock(self.handle);
        }
    }
}

/// Screen device context, released on drop.
struct ScreenDc(HDC);

impl ScreenDc {
    fn get() -> Result<Self, ClipboardError> {
        let hdc = unsafe { GetDC(None) };
        if hdc.0.is_null() {
            return Err(os_error("GetDC"));
        }
        Ok(Self(hdc))
    }
}

impl Drop for ScreenDc {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseDC(None, self.0);
        }
    }
}

/// Bits per pixel of the DIB intermediate for a device bitmap of the given depth.
fn dib_bit_count(planes: u16, bits_pixel: u16) -> u16 {
    match planes.saturating_mul(bits_pixel) {
        0 | 1 => 1,
        2..=4 => 4,
        5..=8 => 8,
        9..=16 => 16,
        17..=24 => 24,
        _ => 32,
    }
}

impl ClipboardSystem for Win32Clipboard {
    type Handle = HANDLE;

    fn open(&mut self) -> Result<(), ClipboardError> {
        unsafe { OpenClipboard(None) }.map_err(|_| ClipboardError::Unavailable)
    }

    fn close(&mut self) {
        unsafe {
            let _ = CloseClipboard();
        }
    }

    fn formats(&mut self) -> Result<Vec<u32>, ClipboardError> {
        let mut formats = Vec::new();
        let mut format = 0u32;

        loop {
            format = unsafe { EnumClipboardFormats(format) };
            if format == 0 {
                break;
            }
            formats.push(format);
        }

        if unsafe { GetLastError() } != ERROR_SUCCESS {
            return Err(os_error("EnumClipboardFormats"));
        }
        Ok(formats)
    }

    fn data(&mut self, format: u32) -> Result<HANDLE, ClipboardError> {
        match unsafe { GetClipboardData(format) } {
            Ok(h) if !h.0.is_null() => Ok(h),
            _ => Err(ClipboardError::Exhausted {
                format,
                what: "read",
            }),
        }
    }

    fn duplicate_flat(&mut self, source: HANDLE) -> Result<Duplicate<HANDLE>, ClipboardError> {
        let src = HGLOBAL(source.0);

        let discarded = unsafe { GlobalFlags(src) } & GMEM_DISCARDED != 0;
        let size = if discarded {
            0
        } else {
            unsafe { GlobalSize(src) }
        };

        let copy = GlobalMem::alloc(size)?;
        if size > 0 {
            let from = GlobalLockGuard::lock(src)?;
            let to = GlobalLockGuard::lock(copy.handle)?;
            unsafe {
                ptr::copy_nonoverlapping(from.ptr.cast::<u8>(), to.ptr.cast::<u8>(), size);
            }
        }

        Ok(Duplicate {
            handle: copy.into_handle(),
            size,
        })
    }

    fn duplicate_palette(&mut self, source: HANDLE) -> Result<Duplicate<HANDLE>, ClipboardError> {
        let mut count = 0u16;
        let got = unsafe {
            GetObjectW(
                HGDIOBJ(source.0),
                size_of::<u16>() as i32,
                Some((&raw mut count).cast::<c_void>()),
            )
        };
        if got == 0 {
            return Err(os_error("GetObjectW(palette)"));
        }

        let mut entries = vec![PALETTEENTRY::default(); usize::from(count)];
        let filled = unsafe { GetPaletteEntries(HPALETTE(source.0), 0, Some(&mut entries[..])) };
        if filled != u32::from(count) {
            return Err(os_error("GetPaletteEntries"));
        }

        // LOGPALETTE is a 4 byte header followed by the entries, each 4 bytes wide.
        let mut block = Vec::with_capacity(1 + entries.len());
        // palVersion in the low word, palNumEntries in the high word.
        block.push(0x0300 | (u32::from(count) << 16));
        block.extend(
            entries
                .iter()
                .map(|e| u32::from_le_bytes([e.peRed, e.peGreen, e.peBlue, e.peFlags])),
        );

        let palette = unsafe { CreatePalette(block.as_ptr().cast::<LOGPALETTE>()) };
        if palette.0.is_null() {
            return Err(os_error("CreatePalette"));
        }

        Ok(Duplicate {
            handle: HANDLE(palette.0),
            size: block.len() * size_of::<u32>(),
        })
    }

    fn duplicate_bitmap(&mut self, source: HANDLE) -> Result<Duplicate<HANDLE>, ClipboardError> {
        let mut bm = BITMAP::default();
        let got = unsafe {
            GetObjectW(
                HGDIOBJ(source.0),
                size_of::<BITMAP>() as i32,
                Some((&raw mut bm).cast::<c_void>()),
            )
        };
        if got == 0 {
            return Err(os_error("GetObjectW(bitmap)"));
        }

        let bit_count = dib_bit_count(bm.bmPlanes, bm.bmBitsPixel);
        let layout = DibLayout::for_bitmap(bm.bmWidth, bm.bmHeight, bit_count).ok_or_else(|| {
            ClipboardError::Os(format!(
                "unsupported bitmap {}x{} at {bit_count} bpp",
                bm.bmWidth, bm.bmHeight
            ))
        })?;

        // u32 storage keeps the header and the color table aligned.
        let mut dib = vec![0u32; layout.total_size().div_ceil(size_of::<u32>())];
        let header = BITMAPINFOHEADER {
            biSize: BITMAPINFOHEADER_SIZE as u32,
            biWidth: layout.width,
            biHeight: layout.height,
            biPlanes: 1,
            biBitCount: layout.bit_count,
            biCompression: layout.compression,
            biSizeImage: layout.image_size() as u32,
            ..Default::default()
        };

        let info = dib.as_mut_ptr().cast::<BITMAPINFO>();
        unsafe {
            ptr::write(info.cast::<BITMAPINFOHEADER>(), header);
        }
        let bits = unsafe { dib.as_mut_ptr().cast::<u8>().add(layout.header_size()) };

        let dc = ScreenDc::get()?;
        let rows = unsafe {
            GetDIBits(
                dc.0,
                HBITMAP(source.0),
                0,
                layout.rows() as u32,
                Some(bits.cast::<c_void>()),
                info,
                DIB_RGB_COLORS,
            )
        };
        if rows == 0 {
            return Err(os_error("GetDIBits"));
        }

        let filled = unsafe { ptr::read(info.cast::<BITMAPINFOHEADER>()) };
        let table_len =
            color_table_len_from_header(filled.biPlanes, filled.biBitCount, filled.biClrUsed);
        if table_len > layout.color_table_len {
            return Err(ClipboardError::Os(format!(
                "bitmap header declares {table_len} colors, {} reserved",
                layout.color_table_len
            )));
        }

        let copy = unsafe {
            CreateDIBitmap(
                dc.0,
                Some(&raw const filled),
                CBM_INIT,
                Some(bits.cast_const().cast::<c_void>()),
                Some(info.cast_const()),
                DIB_RGB_COLORS,
            )
        };
        if copy.0.is_null() {
            return Err(os_error("CreateDIBitmap"));
        }

        Ok(Duplicate {
            handle: HANDLE(copy.0),
            size: layout.total_size(),
        })
    }

    fn duplicate_metafile_picture(
        &mut self,
        source: HANDLE,
    ) -> Result<Duplicate<HANDLE>, ClipboardError> {
        let picture = {
            let locked = GlobalLockGuard::lock(HGLOBAL(source.0))?;
            unsafe { ptr::read_unaligned(locked.ptr.cast::<MetafilePict>()) }
        };

        let metafile = unsafe { CopyMetaFileW(picture.hmf, PCWSTR::null()) };
        if metafile.0.is_null() {
            return Err(os_error("CopyMetaFileW"));
        }

        let block = match GlobalMem::alloc(size_of::<MetafilePict>()) {
            Ok(block) => block,
            Err(e) => {
                unsafe {
                    let _ = DeleteMetaFile(metafile);
                }
                return Err(e);
            }
        };

        match GlobalLockGuard::lock(block.handle) {
            Ok(locked) => unsafe {
                ptr::write_unaligned(
                    locked.ptr.cast::<MetafilePict>(),
                    MetafilePict {
                        hmf: metafile,
                        ..picture
                    },
                );
            },
            Err(e) => {
                unsafe {
                    let _ = DeleteMetaFile(metafile);
                }
                return Err(e);
            }
        }

        let bits = unsafe { GetMetaFileBitsEx(metafile, 0, None) } as usize;
        Ok(Duplicate {
            handle: block.into_handle(),
            size: size_of::<MetafilePict>() + bits,
        })
    }

    fn duplicate_enhanced_metafile(
        &mut self,
        source: HANDLE,
    ) -> Result<Duplicate<HANDLE>, ClipboardError> {
        let copy = unsafe { CopyEnhMetaFileW(HENHMETAFILE(source.0), PCWSTR::null()) };
        if copy.0.is_null() {
            return Err(os_error("CopyEnhMetaFileW"));
        }

        let size = unsafe { GetEnhMetaFileBits(copy, 0, None) } as usize;
        Ok(Duplicate {
            handle: HANDLE(copy.0),
            size,
        })
    }

    fn free_global(&mut self, handle: HANDLE) {
        unsafe {
            let _ = GlobalFree(HGLOBAL(handle.0));
        }
    }

    fn free_gdi_object(&mut self, handle: HANDLE) {
        unsafe {
            let _ = DeleteObject(HGDIOBJ(handle.0));
        }
    }

    fn free_metafile_picture(&mut self, handle: HANDLE) {
        let hglobal = HGLOBAL(handle.0);
        if let Ok(locked) = GlobalLockGuard::lock(hglobal) {
            let picture = unsafe { ptr::read_unaligned(locked.ptr.cast::<MetafilePict>()) };
            unsafe {
                let _ = DeleteMetaFile(picture.hmf);
            }
        }
        self.free_global(handle);
    }

    fn free_enhanced_metafile(&mut self, handle: HANDLE) {
        unsafe {
            let _ = DeleteEnhMetaFile(Some(HENHMETAFILE(handle.0)));
        }
    }

    fn empty(&mut self) -> Result<(), ClipboardError> {
        unsafe { EmptyClipboard() }.map_err(|e| ClipboardError::Os(format!("EmptyClipboard: {e}")))
    }

    fn install(&mut self, format: u32, handle: HANDLE) -> Result<(), ClipboardError> {
        match unsafe { SetClipboardData(format, Some(handle)) } {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!(msg = "set_clipboard_data_failed", format, error = ?e);
                Err(ClipboardError::Exhausted {
                    format,
                    what: "install",
                })
            }
        }
    }

    fn read_unicode_text(&mut self) -> Result<Option<String>, ClipboardError> {
        if unsafe { IsClipboardFormatAvailable(CF_UNICODETEXT) }.is_err() {
            return Ok(None);
        }

        let Ok(handle) = (unsafe { GetClipboardData(CF_UNICODETEXT) }) else {
            return Ok(None);
        };

        let hglobal = HGLOBAL(handle.0);
        let max_units = unsafe { GlobalSize(hglobal) } / size_of::<u16>();
        if max_units == 0 {
            return Ok(Some(String::new()));
        }

        let locked = GlobalLockGuard::lock(hglobal)?;
        let units = unsafe { std::slice::from_raw_parts(locked.ptr.cast::<u16>(), max_units) };

        decode_unicode_text(units).map(Some)
    }

    fn write_unicode_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let units = helpers::to_wide(text);
        let bytes = units.len() * size_of::<u16>();

        let mem = GlobalMem::alloc(bytes)?;
        {
            let locked = GlobalLockGuard::lock(mem.handle)?;
            unsafe {
                ptr::copy_nonoverlapping(units.as_ptr(), locked.ptr.cast::<u16>(), units.len());
            }
        }

        match unsafe { SetClipboardData(CF_UNICODETEXT, Some(HANDLE(mem.handle.0))) } {
            Ok(_) => {
                let _ = mem.into_handle();
                Ok(())
            }
            Err(e) => Err(ClipboardError::Os(format!("SetClipboardData: {e}"))),
        }
    }
}
