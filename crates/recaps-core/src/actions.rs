//! What each hotkey action does to the focused window and the layout roles.

use std::fmt::Display;

use crate::{
    clipboard::ClipboardSystem,
    convert::OverrideTable,
    layout::{KeyboardLayouts, LayoutId},
    registry::LayoutRegistry,
    workflow::{self, ActionOutcome, KeyInjector, RewriteTiming},
};

/// The window that had keyboard focus when the action fired.
pub trait FocusedWindow {
    type Error: Display;

    /// Layout currently active in the window's thread.
    fn layout(&self) -> LayoutId;

    /// Asks the window to activate `target`. `attempts` bounds the layout hotkey presses used for
    /// windows that ignore direct requests.
    fn request_layout(&mut self, target: LayoutId, attempts: usize) -> Result<(), Self::Error>;
}

/// Requests the layout at `idx`. A refused request is logged; the caller carries on.
fn request<W: FocusedWindow>(
    registry: &LayoutRegistry,
    window: &mut W,
    idx: usize,
) -> Option<LayoutId> {
    let entry = registry.entry(idx)?;

    match window.request_layout(entry.id, registry.len()) {
        Ok(()) => tracing::debug!(msg = "layout_switch_requested", layout = %entry.name),
        Err(e) => {
            tracing::warn!(msg = "layout_switch_failed", layout = %entry.name, error = %e);
        }
    }
    Some(entry.id)
}

/// Toggles the focused window between `main` and `paired`.
pub fn toggle_layout<W: FocusedWindow>(registry: &LayoutRegistry, window: &mut W) {
    let target = registry.toggle_target(Some(window.layout()));
    request(registry, window, target);
}

/// Advances `paired` and activates it in the focused window, even when there was no other
/// layout to advance to.
///
/// Returns `true` when the roles changed and need persisting.
pub fn switch_pair<W: FocusedWindow>(
    registry: &mut LayoutRegistry,
    window: Option<&mut W>,
) -> bool {
    let changed = registry.cycle_pair();

    if let Some(window) = window {
        let paired = registry.paired();
        request(registry, window, paired);
    }
    changed
}

/// Switches the focused window to the other layout of the pair and retypes its selection as if
/// typed under that layout.
///
/// The conversion runs against the target even if the window refused the switch request.
#[allow(clippy::too_many_arguments)]
pub fn convert_in_window<W, C, K, L>(
    registry: &LayoutRegistry,
    window: &mut W,
    clipboard: &mut C,
    keys: &mut K,
    layouts: &L,
    overrides: &OverrideTable,
    timing: RewriteTiming,
) -> Option<ActionOutcome>
where
    W: FocusedWindow,
    C: ClipboardSystem,
    K: KeyInjector,
    L: KeyboardLayouts,
{
    let source = window.layout();
    let target_idx = registry.toggle_target(Some(source));
    let target = request(registry, window, target_idx)?;

    Some(workflow::convert_selected_text(
        clipboard, keys, layouts, overrides, source, target, timing,
    ))
}
