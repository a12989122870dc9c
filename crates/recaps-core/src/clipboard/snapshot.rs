use std::ops::{Deref, DerefMut};

use super::{ClipboardError, ClipboardSystem, Duplicate, FormatKind};

/// RAII guard that keeps the clipboard open and closes it on drop.
///
/// The clipboard is a global resource shared by all processes. Opening fails while another
/// process holds it; callers abort the whole operation in that case.
pub struct ClipboardSession<'a, S: ClipboardSystem> {
    system: &'a mut S,
}

impl<'a, S: ClipboardSystem> ClipboardSession<'a, S> {
    pub fn open(system: &'a mut S) -> Result<Self, ClipboardError> {
        system.open()?;
        Ok(Self { system })
    }

    fn already_open(system: &'a mut S) -> Self {
        Self { system }
    }
}

impl<S: ClipboardSystem> Deref for ClipboardSession<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.system
    }
}

impl<S: ClipboardSystem> DerefMut for ClipboardSession<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.system
    }
}

impl<S: ClipboardSystem> Drop for ClipboardSession<'_, S> {
    fn drop(&mut self) {
        self.system.close();
    }
}

/// One captured clipboard format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipboardFormatEntry<H> {
    pub format: u32,
    pub kind: FormatKind,
    /// `None` for owner display placeholders.
    pub handle: Option<H>,
    pub size: usize,
}

/// Every format that was on the clipboard at capture time, in enumeration order.
///
/// The snapshot owns its handles. It must be consumed by [`restore`] or [`release_snapshot`];
/// dropping it leaks the copies.
#[must_use = "a snapshot owns OS handles and must be restored or released"]
#[derive(Debug)]
pub struct ClipboardSnapshot<H> {
    entries: Vec<ClipboardFormatEntry<H>>,
}

impl<H: Copy> ClipboardSnapshot<H> {
    pub fn entries(&self) -> &[ClipboardFormatEntry<H>] {
        &self.entries
    }

    pub fn formats(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.format)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Captures a deep copy of every format currently on the clipboard.
///
/// Either all formats are captured or none: the first failure releases every copy made so far.
pub fn capture<S: ClipboardSystem>(
    system: &mut S,
) -> Result<ClipboardSnapshot<S::Handle>, ClipboardError> {
    let mut session = ClipboardSession::open(system)?;
    let formats = session.formats()?;

    let mut entries = Vec::with_capacity(formats.len());
    for format in formats {
        match capture_format(&mut *session, format) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(
                    msg = "clipboard_capture_aborted",
                    format,
                    captured = entries.len(),
                    error = %e
                );
                release_entries(&mut *session, entries);
                return Err(e);
            }
        }
    }

    tracing::debug!(msg = "clipboard_captured", formats = entries.len());
    Ok(ClipboardSnapshot { entries })
}

fn capture_format<S: ClipboardSystem>(
    system: &mut S,
    format: u32,
) -> Result<ClipboardFormatEntry<S::Handle>, ClipboardError> {
    let kind = FormatKind::of(format);

    let duplicate = match kind {
        // Owner display data lives in the owner's process and cannot be copied.
        FormatKind::OwnerDisplay => None,
        FormatKind::Flat => Some(system.data(format).and_then(|h| system.duplicate_flat(h))?),
        FormatKind::Palette => {
            Some(system.data(format).and_then(|h| system.duplicate_palette(h))?)
        }
        FormatKind::Bitmap => Some(system.data(format).and_then(|h| system.duplicate_bitmap(h))?),
        FormatKind::MetafilePicture => Some(
            system
                .data(format)
                .and_then(|h| system.duplicate_metafile_picture(h))?,
        ),
        FormatKind::EnhancedMetafile => Some(
            system
                .data(format)
                .and_then(|h| system.duplicate_enhanced_metafile(h))?,
        ),
    };

    let (handle, size) = match duplicate {
        Some(Duplicate { handle, size }) => (Some(handle), size),
        None => (None, 0),
    };

    Ok(ClipboardFormatEntry {
        format,
        kind,
        handle,
        size,
    })
}

/// Empties the clipboard and installs every captured entry in original order.
///
/// Ownership of every installed handle passes to the OS. An entry the OS refuses is released
/// here and counted in [`ClipboardError::RestoreIncomplete`]; the remaining entries are still
/// installed.
pub fn restore<S: ClipboardSystem>(
    system: &mut S,
    snapshot: ClipboardSnapshot<S::Handle>,
) -> Result<(), ClipboardError> {
    let ClipboardSnapshot { entries } = snapshot;

    if let Err(e) = system.open() {
        release_entries(system, entries);
        return Err(e);
    }
    let mut session = ClipboardSession::already_open(system);

    if let Err(e) = session.empty() {
        release_entries(&mut *session, entries);
        return Err(e);
    }

    let mut failed = 0usize;
    for entry in entries {
        let Some(handle) = entry.handle else {
            continue;
        };

        if let Err(e) = session.install(entry.format, handle) {
            tracing::warn!(
                msg = "clipboard_restore_format_failed",
                format = entry.format,
                kind = entry.kind.as_str(),
                error = %e
            );
            release_format_data(&mut *session, entry.format, handle);
            failed += 1;
        }
    }

    if failed == 0 {
        Ok(())
    } else {
        Err(ClipboardError::RestoreIncomplete { failed })
    }
}

/// Frees one captured handle with the destructor matching its format.
pub fn release_format_data<S: ClipboardSystem>(system: &mut S, format: u32, handle: S::Handle) {
    match FormatKind::of(format) {
        FormatKind::Flat => system.free_global(handle),
        FormatKind::Palette | FormatKind::Bitmap => system.free_gdi_object(handle),
        FormatKind::MetafilePicture => system.free_metafile_picture(handle),
        FormatKind::EnhancedMetafile => system.free_enhanced_metafile(handle),
        FormatKind::OwnerDisplay => {}
    }
}

/// Releases a snapshot that will not be restored.
pub fn release_snapshot<S: ClipboardSystem>(system: &mut S, snapshot: ClipboardSnapshot<S::Handle>) {
    release_entries(system, snapshot.entries);
}

fn release_entries<S: ClipboardSystem>(system: &mut S, entries: Vec<ClipboardFormatEntry<S::Handle>>) {
    for entry in entries {
        if let Some(handle) = entry.handle {
            release_format_data(system, entry.format, handle);
        }
    }
}

/// Reads `CF_UNICODETEXT`. `Ok(None)` when the clipboard holds no text.
pub fn get_clipboard_text<S: ClipboardSystem>(
    system: &mut S,
) -> Result<Option<String>, ClipboardError> {
    let mut session = ClipboardSession::open(system)?;
    session.read_unicode_text()
}

/// Replaces the clipboard content with `text`.
pub fn set_clipboard_text<S: ClipboardSystem>(
    system: &mut S,
    text: &str,
) -> Result<(), ClipboardError> {
    let mut session = ClipboardSession::open(system)?;
    session.empty()?;
    session.write_unicode_text(text)
}
