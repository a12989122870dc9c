//! Runs the hotkey actions and the tray menu selections on the UI thread.

use recaps_core::{
    actions,
    convert::OverrideTable,
    hook::InputActionEvent,
    registry::{LayoutEntry, LayoutRegistry},
    workflow::{ActionOutcome, KeyInjector},
};

use super::{
    clipboard::Win32Clipboard,
    input::Win32Keys,
    layouts::{self, Win32Layouts, Win32Window},
};
use crate::config::{self, Config};

pub struct Controller {
    registry: LayoutRegistry,
    config: Config,
    overrides: OverrideTable,
    layouts: Win32Layouts,
    clipboard: Win32Clipboard,
    keys: Win32Keys,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        let mut registry = LayoutRegistry::from_installed(layouts::layout_entries());
        registry.apply_persisted(config.main.as_deref(), config.paired.as_deref());

        tracing::info!(
            msg = "layouts_loaded",
            count = registry.len(),
            main = registry.main(),
            paired = registry.paired()
        );

        Self {
            registry,
            config,
            overrides: OverrideTable::builtin(),
            layouts: Win32Layouts,
            clipboard: Win32Clipboard,
            keys: Win32Keys,
        }
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    /// Re-reads the installed layouts, keeping the current roles by name.
    pub fn reload_layouts(&mut self) {
        let entries = layouts::layout_entries();
        if entries_match(self.registry.entries(), &entries) {
            return;
        }

        let names = self
            .registry
            .persisted_names()
            .map(|(m, p)| (m.to_owned(), p.to_owned()));

        let mut registry = LayoutRegistry::from_installed(entries);
        if let Some((main, paired)) = names {
            registry.apply_persisted(Some(&main), Some(&paired));
        }

        tracing::info!(msg = "layouts_reloaded", count = registry.len());
        self.registry = registry;
    }

    pub fn handle_action(&mut self, action: InputActionEvent) {
        tracing::debug!(msg = "action", action = action.as_str());

        if self.registry.is_empty() {
            tracing::warn!(msg = "no_layouts_installed", action = action.as_str());
            return;
        }

        match action {
            InputActionEvent::SwitchLayout => self.toggle_focused_layout(),
            InputActionEvent::SwitchPair => self.cycle_pair(),
            InputActionEvent::ConvertAllText => {
                if !self.keys.select_all() {
                    tracing::warn!(msg = "select_all_rejected");
                    return;
                }
                self.convert_selection();
            }
            InputActionEvent::ConvertSelectedText => self.convert_selection(),
        }
    }

    pub fn select_main(&mut self, idx: usize) {
        if self.registry.select_main(idx) {
            self.persist_roles();
        }
    }

    pub fn select_paired(&mut self, idx: usize) {
        if self.registry.select_paired(idx) {
            self.persist_roles();
        }
    }

    /// Persists the roles if they differ from the stored names.
    pub fn shutdown(&mut self) {
        self.persist_roles();
    }

    fn toggle_focused_layout(&mut self) {
        let Some(mut window) = Win32Window::focused() else {
            tracing::debug!(msg = "no_focused_window");
            return;
        };
        actions::toggle_layout(&self.registry, &mut window);
    }

    fn cycle_pair(&mut self) {
        let mut window = Win32Window::focused();
        if actions::switch_pair(&mut self.registry, window.as_mut()) {
            self.persist_roles();
        }
    }

    fn convert_selection(&mut self) {
        let Some(mut window) = Win32Window::focused() else {
            tracing::debug!(msg = "no_focused_window");
            return;
        };

        let outcome = actions::convert_in_window(
            &self.registry,
            &mut window,
            &mut self.clipboard,
            &mut self.keys,
            &self.layouts,
            &self.overrides,
            self.config.rewrite_timing(),
        );

        match outcome {
            Some(outcome @ ActionOutcome::Failed(_)) => {
                tracing::warn!(msg = "convert_failed", outcome = outcome.as_str());
            }
            Some(outcome) => tracing::info!(msg = "convert_done", outcome = outcome.as_str()),
            None => {}
        }
    }

    fn persist_roles(&mut self) {
        if !self.config.remember_roles(&self.registry) {
            return;
        }

        if let Err(e) = config::save(&self.config) {
            tracing::warn!(msg = "config_save_failed", error = %e);
        }
    }
}

fn entries_match(current: &[LayoutEntry], fresh: &[LayoutEntry]) -> bool {
    current.len() == fresh.len() && current.iter().zip(fresh).all(|(a, b)| a.id == b.id)
}
