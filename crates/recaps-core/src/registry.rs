use crate::layout::{LANG_EN_US, LayoutId};

/// Upper bound on the number of layouts kept in the registry.
pub const MAX_LAYOUTS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub id: LayoutId,
    pub name: String,
}

/// Installed layouts plus the `main` and `paired` roles.
///
/// Both role indices are always in range while the registry is non empty, and they differ
/// whenever at least two layouts are installed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutRegistry {
    entries: Vec<LayoutEntry>,
    main: usize,
    paired: usize,
}

impl LayoutRegistry {
    /// Builds the registry from the OS layout list and picks default roles.
    ///
    /// The first English (US) layout becomes `main`. Without one, `main` is the first layout.
    pub fn from_installed(mut entries: Vec<LayoutEntry>) -> Self {
        if entries.len() > MAX_LAYOUTS {
            tracing::warn!(
                msg = "layout_list_truncated",
                installed = entries.len(),
                kept = MAX_LAYOUTS
            );
            entries.truncate(MAX_LAYOUTS);
        }

        let main = entries
            .iter()
            .position(|e| e.id.language_id() == LANG_EN_US)
            .unwrap_or(0);

        let mut registry = Self {
            entries,
            main,
            paired: 0,
        };
        registry.paired = registry.first_other_than_main();
        registry
    }

    /// Applies persisted role names. A name that no longer matches an installed layout leaves
    /// the role at its current value.
    pub fn apply_persisted(&mut self, main: Option<&str>, paired: Option<&str>) {
        if let Some(idx) = main.and_then(|name| self.index_of(name)) {
            self.main = idx;
        }
        if let Some(idx) = paired.and_then(|name| self.index_of(name)) {
            self.paired = idx;
        }
        if self.main == self.paired && self.entries.len() >= 2 {
            self.paired = usize::from(self.main == 0);
        }
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    #[must_use]
    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn main(&self) -> usize {
        self.main
    }

    #[must_use]
    pub fn paired(&self) -> usize {
        self.paired
    }

    #[must_use]
    pub fn entry(&self, idx: usize) -> Option<&LayoutEntry> {
        self.entries.get(idx)
    }

    #[must_use]
    pub fn position_of(&self, id: LayoutId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Display names of the two roles, in the form persisted by the configuration store.
    #[must_use]
    pub fn persisted_names(&self) -> Option<(&str, &str)> {
        let main = self.entries.get(self.main)?;
        let paired = self.entries.get(self.paired)?;
        Some((main.name.as_str(), paired.name.as_str()))
    }

    /// Makes `idx` the main layout. If it was the paired layout, the old main becomes paired.
    pub fn select_main(&mut self, idx: usize) -> bool {
        if idx >= self.entries.len() || idx == self.main {
            return false;
        }
        if idx == self.paired {
            self.paired = self.main;
        }
        self.main = idx;
        true
    }

    pub fn select_paired(&mut self, idx: usize) -> bool {
        if idx >= self.entries.len() || idx == self.main || idx == self.paired {
            return false;
        }
        self.paired = idx;
        true
    }

    /// Advances `paired` to the next layout, skipping `main`.
    pub fn cycle_pair(&mut self) -> bool {
        let count = self.entries.len();
        if count < 2 {
            return false;
        }
        let mut next = (self.paired + 1) % count;
        if next == self.main {
            next = (next + 1) % count;
        }
        let changed = next != self.paired;
        self.paired = next;
        changed
    }

    /// Index to activate when the focused window currently uses layout `current`.
    #[must_use]
    pub fn toggle_target(&self, current: Option<LayoutId>) -> usize {
        match current.and_then(|id| self.position_of(id)) {
            Some(idx) if idx == self.main => self.paired,
            _ => self.main,
        }
    }

    /// Menu model for the tray collaborator.
    #[must_use]
    pub fn menu(&self) -> RegistryMenu {
        let main_name = self
            .entries
            .get(self.main)
            .map(|e| e.name.as_str())
            .unwrap_or_default();

        let main_items = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, e)| MenuChoice {
                index,
                label: e.name.clone(),
                checked: index == self.main,
            })
            .collect();

        let pair_items = self
            .entries
            .iter()
            .enumerate()
            .filter(|&(index, _)| index != self.main)
            .map(|(index, e)| MenuChoice {
                index,
                label: format!("{main_name} \u{21C4} {}", e.name),
                checked: index == self.paired,
            })
            .collect();

        RegistryMenu {
            main_items,
            pair_items,
        }
    }

    fn first_other_than_main(&self) -> usize {
        if self.entries.len() < 2 {
            return 0;
        }
        if self.main == 0 { 1 } else { 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuChoice {
    pub index: usize,
    pub label: String,
    pub checked: bool,
}

/// Exclusive choice groups rendered by the tray menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryMenu {
    pub main_items: Vec<MenuChoice>,
    pub pair_items: Vec<MenuChoice>,
}
