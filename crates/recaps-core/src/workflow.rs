//! Clipboard driven rewrite of the text selected in a foreign window.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    thread,
    time::Duration,
};

use crate::{
    clipboard::{self, ClipboardError, ClipboardSystem},
    convert::{LayoutConverter, OverrideTable},
    layout::{KeyboardLayouts, LayoutId},
};

/// Key chords injected into the focused window.
///
/// Each method returns `false` when the OS rejected the synthesized input.
pub trait KeyInjector {
    fn copy(&mut self) -> bool;
    fn paste(&mut self) -> bool;
    fn select_all(&mut self) -> bool;
}

/// Bounds of the waits performed while the foreign window copies and pastes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteTiming {
    pub copy_poll_tries: u32,
    pub copy_poll_interval: Duration,
    pub paste_settle: Duration,
}

impl Default for RewriteTiming {
    fn default() -> Self {
        Self {
            copy_poll_tries: 10,
            copy_poll_interval: Duration::from_millis(30),
            paste_settle: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Skipped(SkipReason),
    Failed(Failure),
}

impl ActionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionOutcome::Applied => "applied",
            ActionOutcome::Skipped(reason) => reason.as_str(),
            ActionOutcome::Failed(failure) => failure.as_str(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The foreign window never replaced the sentinel.
    NoSelection,
    /// At least one character has no counterpart in the target layout.
    Unmappable,
    EmptySelection,
    /// The copied text contains unpaired surrogates.
    UndecodableText,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoSelection => "no_selection",
            SkipReason::Unmappable => "unmappable",
            SkipReason::EmptySelection => "empty_selection",
            SkipReason::UndecodableText => "undecodable_text",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    Clipboard,
    Input,
}

impl Failure {
    pub fn as_str(self) -> &'static str {
        match self {
            Failure::Clipboard => "clipboard_error",
            Failure::Input => "input_error",
        }
    }
}

static SENTINEL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Clipboard marker that cannot be mistaken for text copied by a foreign window, nor for the
/// marker of an earlier operation.
fn next_sentinel() -> String {
    let seq = SENTINEL_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("__RECAPS_{}_{seq}__", std::process::id())
}

/// Rewrites the selection of the focused window as if it had been typed under `target`.
///
/// The clipboard content present before the call is restored on every path, including the ones
/// that fail halfway.
#[allow(clippy::too_many_arguments)]
pub fn convert_selected_text<C, K, L>(
    clipboard: &mut C,
    keys: &mut K,
    layouts: &L,
    overrides: &OverrideTable,
    source: LayoutId,
    target: LayoutId,
    timing: RewriteTiming,
) -> ActionOutcome
where
    C: ClipboardSystem,
    K: KeyInjector,
    L: KeyboardLayouts,
{
    let snapshot = match clipboard::capture(clipboard) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(msg = "clipboard_snapshot_failed", error = %e);
            return ActionOutcome::Failed(Failure::Clipboard);
        }
    };

    let converter = LayoutConverter::new(layouts, overrides);
    let outcome = rewrite_selection(clipboard, keys, &converter, source, target, timing);

    if let Err(e) = clipboard::restore(clipboard, snapshot) {
        tracing::warn!(msg = "clipboard_restore_failed", error = %e);
    }

    tracing::debug!(msg = "convert_selected_text", outcome = outcome.as_str());
    outcome
}

fn rewrite_selection<C, K, L>(
    clipboard: &mut C,
    keys: &mut K,
    converter: &LayoutConverter<'_, L>,
    source: LayoutId,
    target: LayoutId,
    timing: RewriteTiming,
) -> ActionOutcome
where
    C: ClipboardSystem,
    K: KeyInjector,
    L: KeyboardLayouts,
{
    let sentinel = next_sentinel();
    if let Err(e) = clipboard::set_clipboard_text(clipboard, &sentinel) {
        tracing::warn!(msg = "sentinel_write_failed", error = %e);
        return ActionOutcome::Failed(Failure::Clipboard);
    }

    if !keys.copy() {
        return ActionOutcome::Failed(Failure::Input);
    }

    let copied = match wait_for_copy(clipboard, &sentinel, timing) {
        Ok(text) => text,
        Err(reason) => return ActionOutcome::Skipped(reason),
    };

    if copied.is_empty() {
        return ActionOutcome::Skipped(SkipReason::EmptySelection);
    }

    let source = match converter.detect_layout(&copied) {
        (Some(detected), 1) => {
            tracing::trace!(msg = "source_layout_detected", layout = detected.0);
            detected
        }
        _ => source,
    };

    let converted = match converter.convert_string(&copied, source, target) {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(msg = "selection_unmappable", error = %e);
            return ActionOutcome::Skipped(SkipReason::Unmappable);
        }
    };

    if let Err(e) = clipboard::set_clipboard_text(clipboard, &converted) {
        tracing::warn!(msg = "converted_write_failed", error = %e);
        return ActionOutcome::Failed(Failure::Clipboard);
    }

    if !keys.paste() {
        return ActionOutcome::Failed(Failure::Input);
    }

    thread::sleep(timing.paste_settle);
    ActionOutcome::Applied
}

/// Polls the clipboard until its text differs from `sentinel`.
///
/// A clipboard that is momentarily held by the foreign window, or holds no text yet, counts as
/// "not copied yet". The sentinel always decodes, so undecodable text means the copy happened.
fn wait_for_copy<C: ClipboardSystem>(
    clipboard: &mut C,
    sentinel: &str,
    timing: RewriteTiming,
) -> Result<String, SkipReason> {
    for attempt in 0..timing.copy_poll_tries {
        match clipboard::get_clipboard_text(clipboard) {
            Ok(Some(text)) if text != sentinel => return Ok(text),
            Ok(_) => {}
            Err(ClipboardError::Unavailable) => {
                tracing::trace!(msg = "clipboard_busy", attempt);
            }
            Err(ClipboardError::UndecodableText) => {
                tracing::debug!(msg = "copied_text_undecodable", attempt);
                return Err(SkipReason::UndecodableText);
            }
            Err(e) => {
                tracing::debug!(msg = "clipboard_poll_failed", attempt, error = %e);
            }
        }

        if attempt + 1 < timing.copy_poll_tries {
            thread::sleep(timing.copy_poll_interval);
        }
    }

    Err(SkipReason::NoSelection)
}
