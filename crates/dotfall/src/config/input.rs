//! User-defined keybindings for controlling the animation.

use color_eyre::eyre::{bail, eyre, Result};
use termwiz::input::{KeyCode, KeyEvent, Modifiers};

/// A keybinding as it's written in the config file.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct KeybindingConfigRaw {
    /// The modifier keys, like `CTRL`, `SHIFT`, etc.
    pub mods: Option<String>,
    /// The actual key, like a 'x' or `Escape`.
    pub key: String,
}

/// Everything a user can do with a key press.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum KeybindingAction {
    /// Start the animation if it's stopped, otherwise stop it.
    Toggle,
    /// Start, or restart, the animation.
    Start,
    /// Stop the animation.
    Stop,
    /// Exit dotfall.
    Quit,
}

/// All the keybindings as they're written in the config file.
pub type KeybindingsRaw = std::collections::HashMap<KeybindingAction, KeybindingConfigRaw>;

/// The keybindings converted to native `termwiz::input::KeyEvent`s.
pub type KeybindingsAsEvents = std::collections::HashMap<KeybindingAction, KeyEvent>;

impl KeybindingConfigRaw {
    /// `termwiz::input::KeyEvent` doesn't have a `impl From<String>` but it does derive
    /// `serde::Deserialize`, so we use `toml` as a stepping stone. It saves manually mapping
    /// every keycode.
    pub fn to_key_event(&self) -> Result<KeyEvent> {
        let key = if self.key.chars().count() == 1 {
            format!("{{ Char = \"{}\" }}", self.key)
        } else {
            format!("\"{}\"", self.key)
        };

        let config = format!(
            "
                modifiers = {{ bits = 0 }}
                key = {key}
            ",
        );

        let mut key_event = toml::from_str::<KeyEvent>(&config)
            .map_err(|error| eyre!("Invalid key in {self:?}: {}", error.message()))?;

        if let Some(modifiers) = self.mods.clone() {
            key_event.modifiers = modifiers
                .try_into()
                .map_err(|error| eyre!("Couldn't parse keybinding modifier: {error:?}"))?;
        }

        Ok(key_event)
    }
}

/// Convert all the raw keybindings. A binding in `overrides` replaces the same action's binding
/// in `defaults`, and also takes its key away from any other default action. A key can only
/// ever trigger one action.
pub fn merge_keybindings(
    defaults: &KeybindingsRaw,
    overrides: &KeybindingsRaw,
) -> Result<KeybindingsAsEvents> {
    let mut keybindings = KeybindingsAsEvents::new();
    for (action, binding) in overrides {
        let key_event = binding.to_key_event()?;
        if let Some(clashing) = action_bound_to(&keybindings, &key_event) {
            bail!("{action:?} and {clashing:?} are both bound to {key_event:?}");
        }
        tracing::trace!("User keybinding for '{action:?}': {key_event:?}");
        keybindings.insert(*action, key_event);
    }

    for (action, binding) in defaults {
        if keybindings.contains_key(action) {
            continue;
        }
        let key_event = binding.to_key_event()?;
        if let Some(claimed_by) = action_bound_to(&keybindings, &key_event) {
            tracing::debug!("Default keybinding for '{action:?}' dropped, {claimed_by:?} uses it");
            continue;
        }
        tracing::trace!("Default keybinding for '{action:?}': {key_event:?}");
        keybindings.insert(*action, key_event);
    }

    Ok(keybindings)
}

/// The action already using a key, if any.
fn action_bound_to(
    keybindings: &KeybindingsAsEvents,
    key_event: &KeyEvent,
) -> Option<KeybindingAction> {
    keybindings
        .iter()
        .find_map(|(action, binding)| (binding == key_event).then_some(*action))
}

/// Find the action, if any, bound to a key press. Ctrl-C always quits, whatever the config says.
#[must_use]
pub fn action_for(
    keybindings: &KeybindingsAsEvents,
    key_event: &KeyEvent,
) -> Option<KeybindingAction> {
    let is_ctrl_c = key_event.key == KeyCode::Char('c') && key_event.modifiers == Modifiers::CTRL;
    if is_ctrl_c {
        return Some(KeybindingAction::Quit);
    }

    action_bound_to(keybindings, key_event)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    fn run(config: &str) -> KeyEvent {
        let parsed: KeybindingConfigRaw = toml::from_str(config).unwrap();
        parsed.to_key_event().unwrap()
    }

    fn raw(key: &str) -> KeybindingConfigRaw {
        KeybindingConfigRaw {
            mods: None,
            key: key.into(),
        }
    }

    #[test]
    fn keybinding_x() {
        let config = r#"
            key = "x"
        "#;
        let expected = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char('x'),
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn keybinding_space() {
        let config = r#"
            key = " "
        "#;
        let expected = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char(' '),
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn keybinding_escape() {
        let config = r#"
            key = "Escape"
        "#;
        let expected = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Escape,
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn keybinding_ctrl_shift_x() {
        let config = r#"
            mods = "CTRL|SHIFT"
            key = "x"
        "#;
        let expected = KeyEvent {
            modifiers: Modifiers::CTRL | Modifiers::SHIFT,
            key: KeyCode::Char('x'),
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn unknown_key_is_an_error() {
        assert!(raw("NotAKey").to_key_event().is_err());
    }

    #[test]
    fn user_bindings_replace_defaults() {
        let defaults = KeybindingsRaw::from([
            (KeybindingAction::Start, raw("s")),
            (KeybindingAction::Stop, raw("x")),
        ]);
        let overrides = KeybindingsRaw::from([(KeybindingAction::Start, raw("g"))]);

        let keybindings = merge_keybindings(&defaults, &overrides).unwrap();
        assert_eq!(keybindings.len(), 2);
        assert_eq!(
            keybindings.get(&KeybindingAction::Start).unwrap().key,
            KeyCode::Char('g')
        );
    }

    #[test]
    fn user_binding_takes_a_key_away_from_a_default() {
        let defaults = KeybindingsRaw::from([
            (KeybindingAction::Toggle, raw(" ")),
            (KeybindingAction::Start, raw("s")),
            (KeybindingAction::Stop, raw("x")),
            (KeybindingAction::Quit, raw("q")),
        ]);
        let overrides = KeybindingsRaw::from([(KeybindingAction::Toggle, raw("s"))]);
        let s = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char('s'),
        };

        // Hash map ordering is random per map, so check it many times over.
        for _ in 0..50 {
            let keybindings = merge_keybindings(&defaults, &overrides).unwrap();
            assert_eq!(action_for(&keybindings, &s), Some(KeybindingAction::Toggle));
            assert!(!keybindings.contains_key(&KeybindingAction::Start));
            assert_eq!(keybindings.len(), 3);
        }
    }

    #[test]
    fn two_user_actions_on_one_key_is_an_error() {
        let overrides = KeybindingsRaw::from([
            (KeybindingAction::Start, raw("g")),
            (KeybindingAction::Stop, raw("g")),
        ]);
        assert!(merge_keybindings(&KeybindingsRaw::new(), &overrides).is_err());
    }

    #[test]
    fn finding_actions() {
        let defaults = KeybindingsRaw::from([(KeybindingAction::Stop, raw("x"))]);
        let keybindings = merge_keybindings(&defaults, &KeybindingsRaw::new()).unwrap();

        let x = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char('x'),
        };
        let y = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char('y'),
        };
        let ctrl_c = KeyEvent {
            modifiers: Modifiers::CTRL,
            key: KeyCode::Char('c'),
        };

        assert_eq!(action_for(&keybindings, &x), Some(KeybindingAction::Stop));
        assert_eq!(action_for(&keybindings, &y), None);
        assert_eq!(
            action_for(&keybindings, &ctrl_c),
            Some(KeybindingAction::Quit)
        );
    }
}
