// SPDX-License-Identifier: GPL-3.0-only

//! Key bindings
//!
//! | Key | Message |
//! |---|---|
//! | Volume up, `+`, `=`, Up | zoom in |
//! | Volume down, `-`, Down | zoom out |
//! | Space, `p`, Enter | take picture |
//! | `t` | toggle torch |
//! | `h` | toggle help |
//! | `q`, Ctrl+C | quit |
//!
//! Volume keys only arrive from terminals that speak the keyboard
//! enhancement protocol; the other bindings work everywhere.

use super::Message;
use crate::zoom::ZoomKey;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MediaKeyCode};

/// Message for a key event, if the key is bound
pub fn map_key(key: &KeyEvent) -> Option<Message> {
    let zoom = match key.code {
        KeyCode::Media(MediaKeyCode::RaiseVolume)
        | KeyCode::Char('+')
        | KeyCode::Char('=')
        | KeyCode::Up => Some(ZoomKey::In),
        KeyCode::Media(MediaKeyCode::LowerVolume) | KeyCode::Char('-') | KeyCode::Down => {
            Some(ZoomKey::Out)
        }
        _ => None,
    };

    // Held zoom keys repeat; everything else fires on press only
    if let Some(direction) = zoom {
        return matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat)
            .then_some(Message::Zoom(direction));
    }
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Message::Quit),
        KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Enter => Some(Message::TakePicture),
        KeyCode::Char('t') => Some(Message::ToggleTorch),
        KeyCode::Char('h') => Some(Message::ToggleHelp),
        KeyCode::Char('q') => Some(Message::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        key(code, KeyEventKind::Press)
    }

    #[test]
    fn test_volume_keys_zoom() {
        assert_eq!(
            map_key(&press(KeyCode::Media(MediaKeyCode::RaiseVolume))),
            Some(Message::Zoom(ZoomKey::In))
        );
        assert_eq!(
            map_key(&press(KeyCode::Media(MediaKeyCode::LowerVolume))),
            Some(Message::Zoom(ZoomKey::Out))
        );
        assert_eq!(map_key(&press(KeyCode::Char('+'))), Some(Message::Zoom(ZoomKey::In)));
        assert_eq!(map_key(&press(KeyCode::Down)), Some(Message::Zoom(ZoomKey::Out)));
    }

    #[test]
    fn test_repeat_only_for_zoom() {
        assert_eq!(
            map_key(&key(KeyCode::Up, KeyEventKind::Repeat)),
            Some(Message::Zoom(ZoomKey::In))
        );
        assert_eq!(map_key(&key(KeyCode::Char(' '), KeyEventKind::Repeat)), None);
        assert_eq!(map_key(&key(KeyCode::Up, KeyEventKind::Release)), None);
    }

    #[test]
    fn test_actions() {
        assert_eq!(map_key(&press(KeyCode::Char(' '))), Some(Message::TakePicture));
        assert_eq!(map_key(&press(KeyCode::Char('t'))), Some(Message::ToggleTorch));
        assert_eq!(map_key(&press(KeyCode::Char('q'))), Some(Message::Quit));
        assert_eq!(map_key(&press(KeyCode::Char('x'))), None);

        let ctrl_c = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..press(KeyCode::Char('c'))
        };
        assert_eq!(map_key(&ctrl_c), Some(Message::Quit));
        assert_eq!(map_key(&press(KeyCode::Char('c'))), None);
    }
}
