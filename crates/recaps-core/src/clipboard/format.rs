pub const CF_BITMAP: u32 = 2;
pub const CF_METAFILEPICT: u32 = 3;
pub const CF_PALETTE: u32 = 9;
pub const CF_UNICODETEXT: u32 = 13;
pub const CF_ENHMETAFILE: u32 = 14;
pub const CF_OWNERDISPLAY: u32 = 0x0080;
pub const CF_DSPBITMAP: u32 = 0x0082;
pub const CF_DSPMETAFILEPICT: u32 = 0x0083;
pub const CF_DSPENHMETAFILE: u32 = 0x008E;

/// Duplication and release strategy of a clipboard format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// A global memory block copied byte for byte.
    Flat,
    Palette,
    Bitmap,
    MetafilePicture,
    EnhancedMetafile,
    /// Rendered by the clipboard owner on demand; nothing to copy.
    OwnerDisplay,
}

impl FormatKind {
    #[must_use]
    pub const fn of(format: u32) -> Self {
        match format {
            CF_PALETTE => Self::Palette,
            CF_BITMAP | CF_DSPBITMAP => Self::Bitmap,
            CF_METAFILEPICT | CF_DSPMETAFILEPICT => Self::MetafilePicture,
            CF_ENHMETAFILE | CF_DSPENHMETAFILE => Self::EnhancedMetafile,
            CF_OWNERDISPLAY => Self::OwnerDisplay,
            _ => Self::Flat,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Palette => "palette",
            Self::Bitmap => "bitmap",
            Self::MetafilePicture => "metafile_picture",
            Self::EnhancedMetafile => "enhanced_metafile",
            Self::OwnerDisplay => "owner_display",
        }
    }
}
