use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rustc_hash::FxHashMap;

use crate::action::TreeAction;

/// Preset the binding table starts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeymapProfile {
    /// Arrows plus `hjkl`.
    #[default]
    Default,
    /// `hjkl` plus `g`/`G`, no arrows.
    Vim,
    Arrows,
}

/// A key with its modifiers. Shift is ignored on character keys, the
/// character already carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub const fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    fn normalized(self) -> Self {
        match self.code {
            KeyCode::Char(_) => Self {
                code: self.code,
                modifiers: self.modifiers.difference(KeyModifiers::SHIFT),
            },
            _ => self,
        }
    }
}

impl From<KeyEvent> for KeyBinding {
    fn from(event: KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
        .normalized()
    }
}

/// Key → action table for [`crate::TreeView::handle_key`].
#[derive(Clone, Debug)]
pub struct TreeKeyBindings {
    profile: KeymapProfile,
    table: FxHashMap<KeyBinding, TreeAction>,
}

impl Default for TreeKeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeKeyBindings {
    pub fn new() -> Self {
        Self::with_profile(KeymapProfile::Default)
    }

    pub fn with_profile(profile: KeymapProfile) -> Self {
        let mut bindings = Self {
            profile,
            table: FxHashMap::default(),
        };
        bindings.load_profile();
        bindings
    }

    pub const fn profile(&self) -> KeymapProfile {
        self.profile
    }

    /// Switches presets, dropping custom bindings.
    pub fn set_profile(&mut self, profile: KeymapProfile) {
        self.profile = profile;
        self.load_profile();
    }

    /// Binds `key`, replacing what it did before.
    pub fn bind(&mut self, key: KeyBinding, action: TreeAction) -> Option<TreeAction> {
        self.table.insert(key.normalized(), action)
    }

    pub fn unbind(&mut self, key: KeyBinding) -> Option<TreeAction> {
        self.table.remove(&key.normalized())
    }

    pub fn resolve<C>(&self, key: KeyEvent) -> Option<TreeAction<C>> {
        self.table
            .get(&KeyBinding::from(key))
            .and_then(|action| action.builtin())
    }

    /// Tries `custom` first, then the table.
    pub fn resolve_with<C, F>(&self, key: KeyEvent, custom: F) -> Option<TreeAction<C>>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        custom(key).map(TreeAction::Custom).or_else(|| self.resolve(key))
    }

    fn load_profile(&mut self) {
        use KeyCode::{Char, Down, End, Enter, Esc, Home, Left, PageDown, PageUp, Right, Up};

        self.table.clear();
        let arrows = [
            (Up, TreeAction::SelectPrev),
            (Down, TreeAction::SelectNext),
            (Left, TreeAction::SelectParent),
            (Right, TreeAction::SelectChild),
        ];
        let letters = [
            (Char('k'), TreeAction::SelectPrev),
            (Char('j'), TreeAction::SelectNext),
            (Char('h'), TreeAction::SelectParent),
            (Char('l'), TreeAction::SelectChild),
        ];
        let vim_jumps = [
            (Char('g'), TreeAction::ScrollHome),
            (Char('G'), TreeAction::ScrollEnd),
        ];
        let common = [
            (Enter, TreeAction::ToggleNode),
            (Char(' '), TreeAction::ToggleNode),
            (Char('-'), TreeAction::CollapseAll),
            (Esc, TreeAction::ClearSelection),
            (Home, TreeAction::ScrollHome),
            (End, TreeAction::ScrollEnd),
            (PageUp, TreeAction::PageUp),
            (PageDown, TreeAction::PageDown),
        ];

        let nav = match self.profile {
            KeymapProfile::Default => [&arrows[..], &letters[..]],
            KeymapProfile::Vim => [&letters[..], &vim_jumps[..]],
            KeymapProfile::Arrows => [&arrows[..], &[][..]],
        };
        for (code, action) in nav.into_iter().flatten().chain(&common) {
            self.table.insert(KeyBinding::plain(*code), *action);
        }
        self.table.insert(KeyBinding::ctrl(Home), TreeAction::ScrollHome);
        self.table.insert(KeyBinding::ctrl(End), TreeAction::ScrollEnd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn default_profile_maps_arrows_and_letters() {
        let bindings = TreeKeyBindings::new();
        assert_eq!(bindings.resolve::<()>(key(KeyCode::Up)), Some(TreeAction::SelectPrev));
        assert_eq!(bindings.resolve::<()>(key(KeyCode::Char('l'))), Some(TreeAction::SelectChild));
        assert_eq!(bindings.resolve::<()>(key(KeyCode::Enter)), Some(TreeAction::ToggleNode));
        assert_eq!(bindings.resolve::<()>(key(KeyCode::PageDown)), Some(TreeAction::PageDown));
        assert_eq!(bindings.resolve::<()>(key(KeyCode::Char('g'))), None);
    }

    #[test]
    fn profiles_select_navigation_keys() {
        let arrows = TreeKeyBindings::with_profile(KeymapProfile::Arrows);
        assert_eq!(arrows.resolve::<()>(key(KeyCode::Char('j'))), None);
        assert_eq!(arrows.resolve::<()>(key(KeyCode::Down)), Some(TreeAction::SelectNext));

        let mut vim = TreeKeyBindings::with_profile(KeymapProfile::Vim);
        assert_eq!(vim.resolve::<()>(key(KeyCode::Down)), None);
        let shifted_g = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(vim.resolve::<()>(shifted_g), Some(TreeAction::ScrollEnd));

        vim.set_profile(KeymapProfile::Arrows);
        assert_eq!(vim.resolve::<()>(key(KeyCode::Char('G'))), None);
    }

    #[test]
    fn ctrl_home_scrolls_but_ctrl_letters_are_unbound() {
        let bindings = TreeKeyBindings::new();
        let ctrl_home = KeyEvent::new(KeyCode::Home, KeyModifiers::CONTROL);
        assert_eq!(bindings.resolve::<()>(ctrl_home), Some(TreeAction::ScrollHome));
        let ctrl_j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL);
        assert_eq!(bindings.resolve::<()>(ctrl_j), None);
    }

    #[test]
    fn rebinding_replaces_previous_action() {
        let mut bindings = TreeKeyBindings::new();
        let w = KeyBinding::plain(KeyCode::Char('w'));
        assert_eq!(bindings.bind(w, TreeAction::SelectPrev), None);
        assert_eq!(
            bindings.bind(KeyBinding::plain(KeyCode::Up), TreeAction::PageUp),
            Some(TreeAction::SelectPrev)
        );
        assert_eq!(bindings.resolve::<()>(key(KeyCode::Char('w'))), Some(TreeAction::SelectPrev));
        assert_eq!(bindings.resolve::<()>(key(KeyCode::Up)), Some(TreeAction::PageUp));
        assert_eq!(bindings.unbind(w), Some(TreeAction::SelectPrev));
        assert_eq!(bindings.resolve::<()>(key(KeyCode::Char('w'))), None);
    }

    #[test]
    fn custom_mapping_wins() {
        let bindings = TreeKeyBindings::new();
        let action = bindings.resolve_with(key(KeyCode::Up), |_| Some(7_u8));
        assert_eq!(action, Some(TreeAction::Custom(7)));
        let action = bindings.resolve_with(key(KeyCode::Up), |_| None::<u8>);
        assert_eq!(action, Some(TreeAction::SelectPrev));
    }
}
