//! Character level conversion between two input layouts.
//!
//! A character is resolved to the key stroke that produces it under the source layout and the
//! same stroke is replayed under the target layout. A small override table takes precedence for
//! punctuation whose key is ambiguous between specific layout pairs.

use thiserror::Error;

use crate::layout::{KeyOutput, KeyStateVector, KeyboardLayouts, LANG_EN_US, LANG_HE_IL, LayoutId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("character {ch:?} at position {position} has no mapping between the layouts")]
    NoMapping { ch: char, position: usize },
}

/// Substitutions for one ordered (source language, target language) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRule {
    pub source_lang: u16,
    pub target_lang: u16,
    pub pairs: Vec<(char, char)>,
}

/// Pluggable table of per layout pair substitutions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

impl OverrideTable {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The Hebrew (Israel) / English (US) substitutions, both directions.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.insert(OverrideRule {
            source_lang: LANG_HE_IL,
            target_lang: LANG_EN_US,
            pairs: vec![('.', '/'), ('/', 'q'), ('\'', 'w'), (',', '\'')],
        });
        table.insert(OverrideRule {
            source_lang: LANG_EN_US,
            target_lang: LANG_HE_IL,
            pairs: vec![('/', '.'), ('q', '/'), ('w', '\''), ('\'', ',')],
        });
        table
    }

    /// Adds a rule. A later rule for the same language pair replaces the earlier one.
    pub fn insert(&mut self, rule: OverrideRule) {
        self.rules
            .retain(|r| !(r.source_lang == rule.source_lang && r.target_lang == rule.target_lang));
        self.rules.push(rule);
    }

    #[must_use]
    pub fn lookup(&self, ch: char, source: LayoutId, target: LayoutId) -> Option<char> {
        let (src, dst) = (source.language_id(), target.language_id());
        self.rules
            .iter()
            .find(|r| r.source_lang == src && r.target_lang == dst)?
            .pairs
            .iter()
            .find_map(|&(from, to)| (from == ch).then_some(to))
    }
}

/// Character and string conversion over a set of installed layouts.
pub struct LayoutConverter<'a, L: KeyboardLayouts> {
    layouts: &'a L,
    overrides: &'a OverrideTable,
}

impl<'a, L: KeyboardLayouts> LayoutConverter<'a, L> {
    pub fn new(layouts: &'a L, overrides: &'a OverrideTable) -> Self {
        Self { layouts, overrides }
    }

    /// Converts one character from `source` to `target`.
    ///
    /// Returns `None` when the source layout cannot produce `ch`, or when the replayed stroke
    /// yields anything other than exactly one UTF-16 unit under the target layout.
    #[must_use]
    pub fn convert_char(&self, ch: char, source: LayoutId, target: LayoutId) -> Option<char> {
        if let Some(mapped) = self.overrides.lookup(ch, source, target) {
            return Some(mapped);
        }

        let unit = bmp_unit(ch)?;
        let stroke = self.layouts.scan_char(unit, source)?;
        let keys = KeyStateVector::from_shift_state(stroke.shift);

        match self.layouts.translate(stroke.vk, &keys, target) {
            KeyOutput::Text(units) => match units.as_slice() {
                [single] => char::from_u32(u32::from(*single)),
                _ => None,
            },
            KeyOutput::Nothing | KeyOutput::DeadKey => None,
        }
    }

    /// Converts a whole string. Fails without producing any output if a single character has
    /// no mapping.
    pub fn convert_string(
        &self,
        text: &str,
        source: LayoutId,
        target: LayoutId,
    ) -> Result<String, ConvertError> {
        text.chars()
            .enumerate()
            .map(|(position, ch)| {
                self.convert_char(ch, source, target)
                    .ok_or(ConvertError::NoMapping { ch, position })
            })
            .collect()
    }

    /// Finds the installed layouts able to type every character of `text`.
    ///
    /// Returns the first such layout and the number of layouts that matched. Only a count of
    /// exactly one identifies the source layout unambiguously.
    #[must_use]
    pub fn detect_layout(&self, text: &str) -> (Option<LayoutId>, usize) {
        let matching = self
            .layouts
            .installed()
            .into_iter()
            .filter(|&layout| self.can_produce(text, layout))
            .collect::<Vec<_>>();

        (matching.first().copied(), matching.len())
    }

    fn can_produce(&self, text: &str, layout: LayoutId) -> bool {
        text.chars().all(|ch| {
            bmp_unit(ch).is_some_and(|unit| self.layouts.scan_char(unit, layout).is_some())
        })
    }
}

fn bmp_unit(ch: char) -> Option<u16> {
    u16::try_from(u32::from(ch)).ok()
}
