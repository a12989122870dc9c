use crate::hook::{
    HOTKEY_VK, HookVerdict, InputActionEvent, KeyEvent, ModifierState, classify,
};

fn hotkey_down() -> KeyEvent {
    KeyEvent {
        vk: HOTKEY_VK,
        key_down: true,
        injected: false,
    }
}

fn handled(action: InputActionEvent, compensate_keyup: bool) -> HookVerdict {
    HookVerdict::Handled {
        action,
        compensate_keyup,
    }
}

#[test]
fn bare_hotkey_switches_layout() {
    assert_eq!(
        classify(hotkey_down(), ModifierState::default()),
        handled(InputActionEvent::SwitchLayout, false)
    );
}

#[test]
fn alt_hotkey_switches_pair_and_compensates() {
    let mods = ModifierState {
        alt: true,
        ..Default::default()
    };
    assert_eq!(
        classify(hotkey_down(), mods),
        handled(InputActionEvent::SwitchPair, true)
    );
}

#[test]
fn ctrl_hotkey_converts_all_text() {
    for (left_ctrl, right_ctrl) in [(true, false), (false, true)] {
        let mods = ModifierState {
            ctrl: true,
            left_ctrl,
            right_ctrl,
            ..Default::default()
        };
        assert_eq!(
            classify(hotkey_down(), mods),
            handled(InputActionEvent::ConvertAllText, false)
        );
    }
}

#[test]
fn both_ctrl_converts_selection_only() {
    let mods = ModifierState {
        ctrl: true,
        left_ctrl: true,
        right_ctrl: true,
        ..Default::default()
    };
    assert_eq!(
        classify(hotkey_down(), mods),
        handled(InputActionEvent::ConvertSelectedText, false)
    );
}

#[test]
fn shift_hotkey_passes_through() {
    let mods = ModifierState {
        shift: true,
        ..Default::default()
    };
    assert_eq!(classify(hotkey_down(), mods), HookVerdict::PassThrough);
}

#[test]
fn alt_wins_over_ctrl() {
    let mods = ModifierState {
        alt: true,
        ctrl: true,
        left_ctrl: true,
        right_ctrl: true,
        shift: true,
    };
    assert_eq!(
        classify(hotkey_down(), mods).action(),
        Some(InputActionEvent::SwitchPair)
    );
}

#[test]
fn injected_hotkey_never_produces_an_action() {
    let event = KeyEvent {
        injected: true,
        ..hotkey_down()
    };
    let all = [
        ModifierState::default(),
        ModifierState {
            alt: true,
            ..Default::default()
        },
        ModifierState {
            ctrl: true,
            left_ctrl: true,
            ..Default::default()
        },
        ModifierState {
            ctrl: true,
            left_ctrl: true,
            right_ctrl: true,
            ..Default::default()
        },
    ];
    for mods in all {
        assert!(!classify(event, mods).is_handled());
    }
}

#[test]
fn key_up_and_other_keys_pass_through() {
    let up = KeyEvent {
        key_down: false,
        ..hotkey_down()
    };
    let other = KeyEvent {
        vk: 0x41,
        ..hotkey_down()
    };
    assert_eq!(classify(up, ModifierState::default()), HookVerdict::PassThrough);
    assert_eq!(classify(other, ModifierState::default()), HookVerdict::PassThrough);
}

#[test]
fn raw_encoding_is_stable() {
    let all = [
        InputActionEvent::SwitchLayout,
        InputActionEvent::SwitchPair,
        InputActionEvent::ConvertAllText,
        InputActionEvent::ConvertSelectedText,
    ];
    for action in all {
        assert_eq!(InputActionEvent::from_raw(action.as_raw()), Some(action));
    }
    assert_eq!(InputActionEvent::SwitchLayout.as_raw(), 1);
    assert_eq!(InputActionEvent::from_raw(0), None);
    assert_eq!(InputActionEvent::from_raw(5), None);
}
