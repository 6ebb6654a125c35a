//! Keyboard: scancode set 1 dari port 0x60
//!
//! Decoding karakter (termasuk shift/caps) diserahkan ke `pc_keyboard`.
//! Modifier Alt/Ctrl dan prefix 0xE0 dilacak sendiri dari byte mentah
//! karena kombinasi Alt+F1..F3 dan Ctrl+L adalah perintah kernel, bukan
//! input.

use lazy_static::lazy_static;
use pc_keyboard::{layouts::Us104Key, DecodedKey, HandleControl, Keyboard, ScancodeSet1};
use spin::Mutex;

pub const IRQ:       u8  = 1;
pub const DATA_PORT: u16 = 0x60;

// Scancode set 1 (make code; release = make | 0x80)
const EXTENDED:  u8 = 0xE0;
const RELEASE:   u8 = 0x80;
const CTRL:      u8 = 0x1D;
const ALT:       u8 = 0x38;
const BACKSPACE: u8 = 0x0E;
const KEY_L:     u8 = 0x26;
const F1:        u8 = 0x3B;
const F3:        u8 = 0x3D;

/// Hasil satu scancode yang perlu ditindaklanjuti kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Alt+F1..F3
    Switch(usize),
    /// Ctrl+L
    Clear,
    Backspace,
    /// Karakter printable atau '\n'
    Char(u8),
}

pub struct KeyDecoder {
    keyboard: Keyboard<Us104Key, ScancodeSet1>,
    extended: bool,
    alt:      bool,
    ctrl:     bool,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self {
            keyboard: Keyboard::new(ScancodeSet1::new(), Us104Key, HandleControl::Ignore),
            extended: false,
            alt:      false,
            ctrl:     false,
        }
    }

    pub fn feed(&mut self, scancode: u8) -> Option<KeyAction> {
        // Decoder tetap melihat semua byte supaya state shift konsisten
        let decoded = match self.keyboard.add_byte(scancode) {
            Ok(Some(event)) => self.keyboard.process_keyevent(event),
            _ => None,
        };

        if scancode == EXTENDED {
            self.extended = true;
            return None;
        }
        let extended = core::mem::replace(&mut self.extended, false);
        let pressed  = scancode & RELEASE == 0;
        let code     = scancode & !RELEASE;

        // Kiri dan kanan (E0 1D / E0 38) diperlakukan sama
        match code {
            CTRL => { self.ctrl = pressed; return None; }
            ALT  => { self.alt = pressed; return None; }
            _ => {}
        }
        if !pressed || extended {
            return None;
        }

        if self.alt {
            return match code {
                F1..=F3 => Some(KeyAction::Switch((code - F1) as usize)),
                _ => None,
            };
        }
        if self.ctrl {
            return (code == KEY_L).then_some(KeyAction::Clear);
        }
        if code == BACKSPACE {
            return Some(KeyAction::Backspace);
        }

        match decoded {
            Some(DecodedKey::Unicode(c)) if c == '\n' || c == ' ' || c.is_ascii_graphic() => {
                Some(KeyAction::Char(c as u8))
            }
            _ => None,
        }
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref DECODER: Mutex<KeyDecoder> = Mutex::new(KeyDecoder::new());
}

/// Dipanggil handler IRQ 1 untuk setiap byte dari port data
pub fn decode(scancode: u8) -> Option<KeyAction> {
    DECODER.lock().feed(scancode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(d: &mut KeyDecoder, bytes: &[u8]) -> std::vec::Vec<KeyAction> {
        bytes.iter().filter_map(|&b| d.feed(b)).collect()
    }

    #[test]
    fn letters_respect_shift() {
        let mut d = KeyDecoder::new();
        // a, shift+a, enter
        let out = feed_all(&mut d, &[0x1E, 0x9E, 0x2A, 0x1E, 0x9E, 0xAA, 0x1C, 0x9C]);
        assert_eq!(out, [KeyAction::Char(b'a'), KeyAction::Char(b'A'), KeyAction::Char(b'\n')]);
    }

    #[test]
    fn alt_function_keys_switch_terminal() {
        let mut d = KeyDecoder::new();
        let out = feed_all(&mut d, &[0x38, 0x3B, 0xBB, 0x3D, 0xBD, 0xB8, 0x3C]);
        assert_eq!(out, [KeyAction::Switch(0), KeyAction::Switch(2)]);
    }

    #[test]
    fn right_alt_counts_as_alt() {
        let mut d = KeyDecoder::new();
        let out = feed_all(&mut d, &[0xE0, 0x38, 0x3C, 0xBC, 0xE0, 0xB8]);
        assert_eq!(out, [KeyAction::Switch(1)]);
    }

    #[test]
    fn ctrl_l_clears_and_other_ctrl_keys_are_ignored() {
        let mut d = KeyDecoder::new();
        let out = feed_all(&mut d, &[0x1D, 0x26, 0xA6, 0x1E, 0x9E, 0x9D, 0x26]);
        assert_eq!(out, [KeyAction::Clear, KeyAction::Char(b'l')]);
    }

    #[test]
    fn backspace_and_extended_keys() {
        let mut d = KeyDecoder::new();
        // backspace, panah atas (E0 48) diabaikan
        let out = feed_all(&mut d, &[0x0E, 0x8E, 0xE0, 0x48, 0xE0, 0xC8]);
        assert_eq!(out, [KeyAction::Backspace]);
    }
}
