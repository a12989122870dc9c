use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    clipboard::{CF_UNICODETEXT, ClipboardError, ClipboardSystem, Duplicate},
    layout::{KeyOutput, KeyStateVector, KeyStroke, KeyboardLayouts, LayoutId, ShiftState},
    workflow::KeyInjector,
};

pub const EN: LayoutId = LayoutId(0x0409_0409);
pub const HE: LayoutId = LayoutId(0x040D_040D);
pub const RU: LayoutId = LayoutId(0x0419_0419);

const VK_SPACE: u8 = 0x20;
const VK_DECIMAL: u8 = 0x6E;
const VK_DIVIDE: u8 = 0x6F;
const VK_OEM_1: u8 = 0xBA;
const VK_OEM_COMMA: u8 = 0xBC;
const VK_OEM_PERIOD: u8 = 0xBE;
const VK_OEM_2: u8 = 0xBF;
const VK_OEM_7: u8 = 0xDE;

#[derive(Debug, Clone)]
struct FakeKey {
    vk: u8,
    shift: ShiftState,
    output: KeyOutput,
}

#[derive(Debug, Clone)]
pub struct FakeLayout {
    id: LayoutId,
    keys: Vec<FakeKey>,
}

impl FakeLayout {
    fn new(id: LayoutId) -> Self {
        Self {
            id,
            keys: Vec::new(),
        }
    }

    fn key(mut self, vk: u8, shift: ShiftState, ch: char) -> Self {
        let mut buf = [0u16; 2];
        let units = ch.encode_utf16(&mut buf).to_vec();
        self.keys.push(FakeKey {
            vk,
            shift,
            output: KeyOutput::Text(units),
        });
        self
    }

    fn raw(mut self, vk: u8, shift: ShiftState, output: KeyOutput) -> Self {
        self.keys.push(FakeKey { vk, shift, output });
        self
    }

    fn latin_letters(mut self) -> Self {
        for (i, ch) in ('a'..='z').enumerate() {
            let vk = 0x41 + i as u8;
            self = self
                .key(vk, ShiftState::NONE, ch)
                .key(vk, ShiftState::SHIFT, ch.to_ascii_uppercase());
        }
        self
    }
}

/// English (US): Latin letters, the bottom row punctuation and the numpad `.` and `/`.
pub fn english() -> FakeLayout {
    FakeLayout::new(EN)
        .key(VK_DECIMAL, ShiftState::NONE, '.')
        .key(VK_DIVIDE, ShiftState::NONE, '/')
        .latin_letters()
        .key(VK_SPACE, ShiftState::NONE, ' ')
        .key(VK_OEM_1, ShiftState::NONE, ';')
        .key(VK_OEM_7, ShiftState::NONE, '\'')
        .key(VK_OEM_COMMA, ShiftState::NONE, ',')
        .key(VK_OEM_PERIOD, ShiftState::NONE, '.')
        .key(VK_OEM_2, ShiftState::NONE, '/')
        .key(0x31, ShiftState::SHIFT, '!')
}

/// Hebrew (Israel): Hebrew letters unshifted, Latin capitals shifted.
pub fn hebrew() -> FakeLayout {
    let unshifted = [
        (b'Q', '/'),
        (b'W', '\''),
        (b'E', 'ק'),
        (b'R', 'ר'),
        (b'T', 'א'),
        (b'Y', 'ט'),
        (b'U', 'ו'),
        (b'I', 'ן'),
        (b'O', 'ם'),
        (b'P', 'פ'),
        (b'A', 'ש'),
        (b'S', 'ד'),
        (b'D', 'ג'),
        (b'F', 'כ'),
        (b'G', 'ע'),
        (b'H', 'י'),
        (b'J', 'ח'),
        (b'K', 'ל'),
        (b'L', 'ך'),
        (b'Z', 'ז'),
        (b'X', 'ס'),
        (b'C', 'ב'),
        (b'V', 'ה'),
        (b'B', 'נ'),
        (b'N', 'מ'),
        (b'M', 'צ'),
    ];

    let mut layout = FakeLayout::new(HE)
        .key(VK_DECIMAL, ShiftState::NONE, '.')
        .key(VK_DIVIDE, ShiftState::NONE, '/');
    for (vk, ch) in unshifted {
        layout = layout.key(vk, ShiftState::NONE, ch);
    }
    for (i, ch) in ('A'..='Z').enumerate() {
        layout = layout.key(0x41 + i as u8, ShiftState::SHIFT, ch);
    }
    layout
        .key(VK_SPACE, ShiftState::NONE, ' ')
        .key(VK_OEM_1, ShiftState::NONE, 'ף')
        .key(VK_OEM_7, ShiftState::NONE, ',')
        .key(VK_OEM_COMMA, ShiftState::NONE, 'ת')
        .key(VK_OEM_PERIOD, ShiftState::NONE, 'ץ')
        .key(VK_OEM_2, ShiftState::NONE, '.')
        .key(0x31, ShiftState::SHIFT, '!')
}

/// Russian, used only where three installed layouts are needed.
pub fn russian() -> FakeLayout {
    FakeLayout::new(RU)
        .key(b'F', ShiftState::NONE, 'а')
        .key(b'D', ShiftState::NONE, 'в')
        .key(VK_SPACE, ShiftState::NONE, ' ')
        .key(0x31, ShiftState::SHIFT, '!')
        .raw(b'Q', ShiftState::NONE, KeyOutput::Text(vec![0x0439, 0x0439]))
}

#[derive(Debug, Clone, Default)]
pub struct FakeLayouts {
    layouts: Vec<FakeLayout>,
}

impl FakeLayouts {
    pub fn new(layouts: Vec<FakeLayout>) -> Self {
        Self { layouts }
    }

    pub fn en_he() -> Self {
        Self::new(vec![english(), hebrew()])
    }

    fn layout(&self, id: LayoutId) -> Option<&FakeLayout> {
        self.layouts.iter().find(|l| l.id == id)
    }
}

impl KeyboardLayouts for FakeLayouts {
    fn installed(&self) -> Vec<LayoutId> {
        self.layouts.iter().map(|l| l.id).collect()
    }

    fn scan_char(&self, ch: u16, layout: LayoutId) -> Option<KeyStroke> {
        self.layout(layout)?
            .keys
            .iter()
            .find(|k| matches!(&k.output, KeyOutput::Text(units) if units.as_slice() == [ch]))
            .map(|k| KeyStroke {
                vk: k.vk,
                shift: k.shift,
            })
    }

    fn translate(&self, vk: u8, keys: &KeyStateVector, layout: LayoutId) -> KeyOutput {
        let shift = keys.shift_state();
        self.layout(layout)
            .and_then(|l| l.keys.iter().find(|k| k.vk == vk && k.shift == shift))
            .map_or(KeyOutput::Nothing, |k| k.output.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeObject {
    Global(Vec<u8>),
    Discarded,
    Palette(Vec<u32>),
    Bitmap { width: i32, height: i32, pixels: Vec<u8> },
    Metafile(Vec<u8>),
    MetafilePicture { mm: i32, metafile: u64 },
    EnhancedMetafile(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeHandle(pub u64);

/// In memory stand-in for the OS clipboard plus a single focused text field.
#[derive(Debug, Default)]
pub struct FakeOs {
    objects: HashMap<u64, FakeObject>,
    next_id: u64,
    /// Formats on the clipboard, owned by the OS.
    formats: Vec<(u32, u64)>,
    pub is_open: bool,
    pub opens: usize,
    /// Clipboard open attempts fail while set.
    pub busy: bool,
    /// Fails the duplication whose 1 based ordinal matches.
    pub fail_duplicate_at: Option<usize>,
    duplicate_calls: usize,
    pub fail_install_format: Option<u32>,
    pub wrong_destructor_calls: usize,
    pub calls_while_closed: usize,

    pub field: String,
    pub selected: Option<(usize, usize)>,
    /// The focused window ignores copy chords while set.
    pub unresponsive: bool,
    /// The focused window copies these UTF-16 units instead of its selection.
    pub copied_units: Option<Vec<u16>>,
    pub reject_paste: bool,
    pub chords: Vec<&'static str>,
}

impl FakeOs {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    fn alloc(&mut self, object: FakeObject) -> u64 {
        self.next_id += 1;
        self.objects.insert(self.next_id, object);
        self.next_id
    }

    /// Puts a format on the clipboard as a foreign application would.
    pub fn put(&mut self, format: u32, object: FakeObject) {
        let id = self.alloc(object);
        self.formats.push((format, id));
    }

    pub fn put_text(&mut self, text: &str) {
        self.put(CF_UNICODETEXT, FakeObject::Global(utf16_bytes(text)));
    }

    pub fn put_metafile_picture(&mut self, format: u32, mm: i32, bits: &[u8]) {
        let metafile = self.alloc(FakeObject::Metafile(bits.to_vec()));
        self.put(format, FakeObject::MetafilePicture { mm, metafile });
    }

    /// Resolves the metafile bits behind a metafile picture block.
    pub fn metafile_bits(&self, object: &FakeObject) -> Option<Vec<u8>> {
        match object {
            FakeObject::MetafilePicture { metafile, .. } => match self.objects.get(metafile) {
                Some(FakeObject::Metafile(bits)) => Some(bits.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Replaces the clipboard content with `text`, as a foreign copy does.
    fn foreign_copy(&mut self, text: &str) {
        self.clear();
        self.put_text(text);
    }

    fn clear(&mut self) {
        for (_, id) in std::mem::take(&mut self.formats) {
            self.destroy_tree(id);
        }
    }

    fn destroy_tree(&mut self, id: u64) {
        if let Some(FakeObject::MetafilePicture { metafile, .. }) = self.objects.remove(&id) {
            self.objects.remove(&metafile);
        }
    }

    pub fn clipboard(&self) -> Vec<(u32, FakeObject)> {
        self.formats
            .iter()
            .map(|&(f, id)| (f, self.objects[&id].clone()))
            .collect()
    }

    pub fn clipboard_text(&self) -> Option<String> {
        self.formats
            .iter()
            .find(|&&(f, _)| f == CF_UNICODETEXT)
            .and_then(|(_, id)| match &self.objects[id] {
                FakeObject::Global(bytes) => Some(from_utf16_bytes(bytes)),
                _ => None,
            })
    }

    fn text_units(&self) -> Option<Vec<u16>> {
        self.formats
            .iter()
            .find(|&&(f, _)| f == CF_UNICODETEXT)
            .and_then(|(_, id)| match &self.objects[id] {
                FakeObject::Global(bytes) => Some(
                    bytes
                        .chunks_exact(2)
                        .map(|c| u16::from_le_bytes([c[0], c[1]]))
                        .collect(),
                ),
                _ => None,
            })
    }

    /// Objects alive that the clipboard does not own.
    pub fn leaked(&self) -> usize {
        let mut owned = Vec::new();
        for &(_, id) in &self.formats {
            owned.push(id);
            if let Some(FakeObject::MetafilePicture { metafile, .. }) = self.objects.get(&id) {
                owned.push(*metafile);
            }
        }
        self.objects.keys().filter(|id| !owned.contains(id)).count()
    }

    pub fn set_field(&mut self, text: &str) {
        self.field = text.to_owned();
        self.selected = None;
    }

    fn selection(&self) -> Option<&str> {
        self.selected.map(|(start, end)| &self.field[start..end])
    }

    fn check_open(&mut self) -> Result<(), ClipboardError> {
        if self.is_open {
            Ok(())
        } else {
            self.calls_while_closed += 1;
            Err(ClipboardError::Os("clipboard is not open".into()))
        }
    }

    fn next_duplicate(&mut self, format_hint: &'static str) -> Result<(), ClipboardError> {
        self.duplicate_calls += 1;
        if self.fail_duplicate_at == Some(self.duplicate_calls) {
            return Err(ClipboardError::Exhausted {
                format: 0,
                what: format_hint,
            });
        }
        Ok(())
    }

    fn object(&self, handle: FakeHandle) -> Result<FakeObject, ClipboardError> {
        self.objects
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| ClipboardError::Os(format!("stale handle {}", handle.0)))
    }
}

pub fn utf16_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

pub fn from_utf16_bytes(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect::<Vec<_>>();
    String::from_utf16_lossy(&units)
}

pub struct FakeClipboard(pub Rc<RefCell<FakeOs>>);

impl ClipboardSystem for FakeClipboard {
    type Handle = FakeHandle;

    fn open(&mut self) -> Result<(), ClipboardError> {
        let mut os = self.0.borrow_mut();
        if os.busy {
            return Err(ClipboardError::Unavailable);
        }
        os.is_open = true;
        os.opens += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.0.borrow_mut().is_open = false;
    }

    fn formats(&mut self) -> Result<Vec<u32>, ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        Ok(os.formats.iter().map(|&(f, _)| f).collect())
    }

    fn data(&mut self, format: u32) -> Result<FakeHandle, ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.formats
            .iter()
            .find(|&&(f, _)| f == format)
            .map(|&(_, id)| FakeHandle(id))
            .ok_or_else(|| ClipboardError::Os(format!("format {format} not present")))
    }

    fn duplicate_flat(&mut self, source: FakeHandle) -> Result<Duplicate<FakeHandle>, ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.next_duplicate("copy")?;
        let bytes = match os.object(source)? {
            FakeObject::Global(bytes) => bytes,
            FakeObject::Discarded => Vec::new(),
            other => return Err(ClipboardError::Os(format!("not a memory block: {other:?}"))),
        };
        let size = bytes.len();
        let handle = FakeHandle(os.alloc(FakeObject::Global(bytes)));
        Ok(Duplicate { handle, size })
    }

    fn duplicate_palette(
        &mut self,
        source: FakeHandle,
    ) -> Result<Duplicate<FakeHandle>, ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.next_duplicate("copy palette")?;
        let FakeObject::Palette(entries) = os.object(source)? else {
            return Err(ClipboardError::Os("not a palette".into()));
        };
        let size = 4 + entries.len() * 4;
        let handle = FakeHandle(os.alloc(FakeObject::Palette(entries)));
        Ok(Duplicate { handle, size })
    }

    fn duplicate_bitmap(
        &mut self,
        source: FakeHandle,
    ) -> Result<Duplicate<FakeHandle>, ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.next_duplicate("copy bitmap")?;
        let FakeObject::Bitmap {
            width,
            height,
            pixels,
        } = os.object(source)?
        else {
            return Err(ClipboardError::Os("not a bitmap".into()));
        };
        let size = pixels.len();
        let handle = FakeHandle(os.alloc(FakeObject::Bitmap {
            width,
            height,
            pixels,
        }));
        Ok(Duplicate { handle, size })
    }

    fn duplicate_metafile_picture(
        &mut self,
        source: FakeHandle,
    ) -> Result<Duplicate<FakeHandle>, ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.next_duplicate("copy metafile picture")?;
        let FakeObject::MetafilePicture { mm, metafile } = os.object(source)? else {
            return Err(ClipboardError::Os("not a metafile picture".into()));
        };
        let FakeObject::Metafile(bits) = os.object(FakeHandle(metafile))? else {
            return Err(ClipboardError::Os("dangling metafile".into()));
        };
        let size = 16 + bits.len();
        let copy = os.alloc(FakeObject::Metafile(bits));
        let handle = FakeHandle(os.alloc(FakeObject::MetafilePicture { mm, metafile: copy }));
        Ok(Duplicate { handle, size })
    }

    fn duplicate_enhanced_metafile(
        &mut self,
        source: FakeHandle,
    ) -> Result<Duplicate<FakeHandle>, ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.next_duplicate("copy enhanced metafile")?;
        let FakeObject::EnhancedMetafile(bits) = os.object(source)? else {
            return Err(ClipboardError::Os("not an enhanced metafile".into()));
        };
        let size = bits.len();
        let handle = FakeHandle(os.alloc(FakeObject::EnhancedMetafile(bits)));
        Ok(Duplicate { handle, size })
    }

    fn free_global(&mut self, handle: FakeHandle) {
        let mut os = self.0.borrow_mut();
        match os.objects.remove(&handle.0) {
            Some(FakeObject::Global(_)) => {}
            _ => os.wrong_destructor_calls += 1,
        }
    }

    fn free_gdi_object(&mut self, handle: FakeHandle) {
        let mut os = self.0.borrow_mut();
        match os.objects.remove(&handle.0) {
            Some(FakeObject::Palette(_) | FakeObject::Bitmap { .. }) => {}
            _ => os.wrong_destructor_calls += 1,
        }
    }

    fn free_metafile_picture(&mut self, handle: FakeHandle) {
        let mut os = self.0.borrow_mut();
        match os.objects.remove(&handle.0) {
            Some(FakeObject::MetafilePicture { metafile, .. }) => {
                if !matches!(os.objects.remove(&metafile), Some(FakeObject::Metafile(_))) {
                    os.wrong_destructor_calls += 1;
                }
            }
            _ => os.wrong_destructor_calls += 1,
        }
    }

    fn free_enhanced_metafile(&mut self, handle: FakeHandle) {
        let mut os = self.0.borrow_mut();
        match os.objects.remove(&handle.0) {
            Some(FakeObject::EnhancedMetafile(_)) => {}
            _ => os.wrong_destructor_calls += 1,
        }
    }

    fn empty(&mut self) -> Result<(), ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.clear();
        Ok(())
    }

    fn install(&mut self, format: u32, handle: FakeHandle) -> Result<(), ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        if os.fail_install_format == Some(format) {
            return Err(ClipboardError::Os(format!("format {format} refused")));
        }
        os.formats.push((format, handle.0));
        Ok(())
    }

    fn read_unicode_text(&mut self) -> Result<Option<String>, ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.text_units()
            .map(|units| crate::clipboard::decode_unicode_text(&units))
            .transpose()
    }

    fn write_unicode_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut os = self.0.borrow_mut();
        os.check_open()?;
        os.put_text(text);
        Ok(())
    }
}

/// Drives the focused field of [`FakeOs`] the way a foreign text control reacts to chords.
pub struct FakeKeys(pub Rc<RefCell<FakeOs>>);

impl KeyInjector for FakeKeys {
    fn copy(&mut self) -> bool {
        let mut os = self.0.borrow_mut();
        os.chords.push("copy");
        if os.unresponsive {
            return true;
        }
        if let Some(units) = os.copied_units.clone() {
            let bytes = units.iter().flat_map(|u| u.to_le_bytes()).collect();
            os.clear();
            os.put(CF_UNICODETEXT, FakeObject::Global(bytes));
            return true;
        }
        if let Some(text) = os
            .selection()
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
        {
            os.foreign_copy(&text);
        }
        true
    }

    fn paste(&mut self) -> bool {
        let mut os = self.0.borrow_mut();
        os.chords.push("paste");
        if os.reject_paste {
            return false;
        }
        let Some(text) = os.clipboard_text() else {
            return true;
        };
        let (start, end) = os.selected.unwrap_or((os.field.len(), os.field.len()));
        os.field.replace_range(start..end, &text);
        let caret = start + text.len();
        os.selected = Some((caret, caret));
        true
    }

    fn select_all(&mut self) -> bool {
        let mut os = self.0.borrow_mut();
        os.chords.push("select_all");
        let len = os.field.len();
        os.selected = Some((0, len));
        true
    }
}
