//! Format aware clipboard snapshot and restore.
//!
//! The engine is written against [`ClipboardSystem`], a thin trait over the OS clipboard
//! primitives. Which duplication and release primitive applies to a format is decided here, by
//! [`FormatKind`], and never by the size of the payload.

mod dib;
mod format;
mod snapshot;

use thiserror::Error;

pub use dib::{
    BI_BITFIELDS, BI_RGB, BITMAPINFOHEADER_SIZE, DibLayout, RGBQUAD_SIZE,
    color_table_len_from_header,
};
pub use format::{
    CF_BITMAP, CF_DSPBITMAP, CF_DSPENHMETAFILE, CF_DSPMETAFILEPICT, CF_ENHMETAFILE,
    CF_METAFILEPICT, CF_OWNERDISPLAY, CF_PALETTE, CF_UNICODETEXT, FormatKind,
};
pub use snapshot::{
    ClipboardFormatEntry, ClipboardSession, ClipboardSnapshot, capture, get_clipboard_text,
    release_format_data, release_snapshot, restore, set_clipboard_text,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    #[error("clipboard is held by another process")]
    Unavailable,
    #[error("failed to {what} clipboard format {format}")]
    Exhausted { format: u32, what: &'static str },
    #[error("{failed} clipboard format(s) could not be restored")]
    RestoreIncomplete { failed: usize },
    #[error("clipboard text is not valid UTF-16")]
    UndecodableText,
    #[error("clipboard operation failed: {0}")]
    Os(String),
}

/// Decodes a `CF_UNICODETEXT` payload up to its first NUL.
///
/// Unpaired surrogates are rejected instead of being replaced, so that text the layouts cannot
/// reproduce is reported as such.
pub fn decode_unicode_text(units: &[u16]) -> Result<String, ClipboardError> {
    let len = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16(&units[..len]).map_err(|_| ClipboardError::UndecodableText)
}

/// An owned copy produced by one of the duplication primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate<H> {
    pub handle: H,
    /// Size of the copied payload in bytes.
    pub size: usize,
}

/// OS clipboard primitives.
///
/// Every method except [`open`](Self::open) assumes the clipboard is currently open by this
/// process. Handles returned by [`data`](Self::data) belong to the clipboard and must never be
/// released; handles returned by the `duplicate_*` methods belong to the caller until they are
/// passed to [`install`](Self::install) successfully.
pub trait ClipboardSystem {
    type Handle: Copy + std::fmt::Debug;

    fn open(&mut self) -> Result<(), ClipboardError>;
    fn close(&mut self);

    /// Formats present on the clipboard, in enumeration order.
    fn formats(&mut self) -> Result<Vec<u32>, ClipboardError>;
    fn data(&mut self, format: u32) -> Result<Self::Handle, ClipboardError>;

    /// Copies a flat memory block, sized exactly to the source's reported size. A discarded
    /// source yields an empty block of size zero.
    fn duplicate_flat(&mut self, source: Self::Handle)
    -> Result<Duplicate<Self::Handle>, ClipboardError>;
    fn duplicate_palette(
        &mut self,
        source: Self::Handle,
    ) -> Result<Duplicate<Self::Handle>, ClipboardError>;
    /// Copies a device dependent bitmap through a self describing DIB intermediate.
    fn duplicate_bitmap(
        &mut self,
        source: Self::Handle,
    ) -> Result<Duplicate<Self::Handle>, ClipboardError>;
    fn duplicate_metafile_picture(
        &mut self,
        source: Self::Handle,
    ) -> Result<Duplicate<Self::Handle>, ClipboardError>;
    fn duplicate_enhanced_metafile(
        &mut self,
        source: Self::Handle,
    ) -> Result<Duplicate<Self::Handle>, ClipboardError>;

    fn free_global(&mut self, handle: Self::Handle);
    fn free_gdi_object(&mut self, handle: Self::Handle);
    /// Frees the metafile referenced by a metafile picture block, then the block itself.
    fn free_metafile_picture(&mut self, handle: Self::Handle);
    fn free_enhanced_metafile(&mut self, handle: Self::Handle);

    fn empty(&mut self) -> Result<(), ClipboardError>;
    /// Hands `handle` to the clipboard. On success the OS owns it.
    fn install(&mut self, format: u32, handle: Self::Handle) -> Result<(), ClipboardError>;

    fn read_unicode_text(&mut self) -> Result<Option<String>, ClipboardError>;
    /// Places `text` as `CF_UNICODETEXT` without emptying the clipboard first.
    fn write_unicode_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}
