//! Keyboard layout primitives shared by the conversion engine and the platform layer.
//!
//! A layout is identified by the raw value of the OS layout handle. The low word of that value
//! is the language identifier, which is what the override table keys on.

/// Language id of English (United States).
pub const LANG_EN_US: u16 = 0x0409;

/// Language id of Hebrew (Israel).
pub const LANG_HE_IL: u16 = 0x040D;

pub const VK_SHIFT: u8 = 0x10;
pub const VK_CONTROL: u8 = 0x11;
pub const VK_MENU: u8 = 0x12;

/// Opaque identifier of an installed input layout.
///
/// Equality is by handle value. Ordering between layouts only exists through their position in
/// the installed layout list, so no `Ord` impl is provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayoutId(pub isize);

impl LayoutId {
    /// Language identifier stored in the low word of the layout handle.
    #[must_use]
    pub const fn language_id(self) -> u16 {
        (self.0 as usize & 0xFFFF) as u16
    }
}

/// Modifier bits as packed in the high byte of the OS character scan result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftState(pub u8);

impl ShiftState {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(1);
    pub const CTRL: Self = Self(2);
    pub const ALT: Self = Self(4);

    #[must_use]
    pub const fn shift(self) -> bool {
        self.0 & Self::SHIFT.0 != 0
    }

    #[must_use]
    pub const fn ctrl(self) -> bool {
        self.0 & Self::CTRL.0 != 0
    }

    #[must_use]
    pub const fn alt(self) -> bool {
        self.0 & Self::ALT.0 != 0
    }
}

/// A (virtual key, shift state) pair that produces a character under some layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub vk: u8,
    pub shift: ShiftState,
}

impl KeyStroke {
    /// Decodes the packed 16 bit scan result: low byte is the virtual key, high byte the
    /// shift state. The all-ones value means "not producible".
    #[must_use]
    pub fn from_scan_result(raw: i16) -> Option<Self> {
        if raw == -1 {
            return None;
        }
        let [vk, shift] = raw.to_le_bytes();
        Some(Self {
            vk,
            shift: ShiftState(shift),
        })
    }
}

/// 256 entry key state array in the format the OS translation primitive expects.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyStateVector(pub [u8; 256]);

impl KeyStateVector {
    const DOWN: u8 = 0x80;

    /// Builds a key state with only the modifiers named by `shift` held down.
    #[must_use]
    pub fn from_shift_state(shift: ShiftState) -> Self {
        let mut keys = [0u8; 256];
        if shift.shift() {
            keys[usize::from(VK_SHIFT)] = Self::DOWN;
        }
        if shift.ctrl() {
            keys[usize::from(VK_CONTROL)] = Self::DOWN;
        }
        if shift.alt() {
            keys[usize::from(VK_MENU)] = Self::DOWN;
        }
        Self(keys)
    }

    #[must_use]
    pub fn is_down(&self, vk: u8) -> bool {
        self.0[usize::from(vk)] & Self::DOWN != 0
    }

    /// Shift state reflected by the modifier entries of this vector.
    #[must_use]
    pub fn shift_state(&self) -> ShiftState {
        let mut bits = 0;
        if self.is_down(VK_SHIFT) {
            bits |= ShiftState::SHIFT.0;
        }
        if self.is_down(VK_CONTROL) {
            bits |= ShiftState::CTRL.0;
        }
        if self.is_down(VK_MENU) {
            bits |= ShiftState::ALT.0;
        }
        ShiftState(bits)
    }
}

impl std::fmt::Debug for KeyStateVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KeyStateVector")
            .field(&self.shift_state())
            .finish()
    }
}

/// Result of translating a key stroke under a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutput {
    Nothing,
    DeadKey,
    /// UTF-16 code units produced by the stroke.
    Text(Vec<u16>),
}

/// Read only view of the layouts installed in the OS.
pub trait KeyboardLayouts {
    /// Installed layouts in OS order.
    fn installed(&self) -> Vec<LayoutId>;

    /// Resolves `ch` to the key stroke that produces it under `layout`.
    fn scan_char(&self, ch: u16, layout: LayoutId) -> Option<KeyStroke>;

    /// Translates a key stroke under `layout`.
    fn translate(&self, vk: u8, keys: &KeyStateVector, layout: LayoutId) -> KeyOutput;
}

impl<L: KeyboardLayouts + ?Sized> KeyboardLayouts for &L {
    fn installed(&self) -> Vec<LayoutId> {
        (**self).installed()
    }

    fn scan_char(&self, ch: u16, layout: LayoutId) -> Option<KeyStroke> {
        (**self).scan_char(ch, layout)
    }

    fn translate(&self, vk: u8, keys: &KeyStateVector, layout: LayoutId) -> KeyOutput {
        (**self).translate(vk, keys, layout)
    }
}
