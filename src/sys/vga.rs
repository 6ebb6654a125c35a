//! VGA: kursor hardware dan layar panic
//!
//! Isi layar ditulis oleh `console` lewat `Machine::video_page`. Modul
//! ini hanya untuk hal yang butuh port CRTC atau harus jalan tanpa
//! lock kernel (panic).

use crate::config::VIDEO_PHYS;
use crate::sys::console::{COLS, ROWS};
use crate::sys::mem::phys_to_virt;
use core::fmt::{self, Write};
use core::panic::PanicInfo;
use x86_64::instructions::port::Port;
use x86_64::PhysAddr;

const CRTC_INDEX: u16 = 0x3D4;
const CRTC_DATA:  u16 = 0x3D5;

const CURSOR_HIGH: u8 = 0x0E;
const CURSOR_LOW:  u8 = 0x0F;

/// Putih di atas merah
const PANIC_ATTRIB: u8 = 0x4F;

pub fn set_cursor(x: usize, y: usize) {
    let pos = (y * COLS + x) as u16;
    let mut index = Port::<u8>::new(CRTC_INDEX);
    let mut data  = Port::<u8>::new(CRTC_DATA);
    unsafe {
        index.write(CURSOR_LOW);
        data.write((pos & 0xFF) as u8);
        index.write(CURSOR_HIGH);
        data.write((pos >> 8) as u8);
    }
}

/// Writer langsung ke 0xB8000, tanpa scroll: baris terakhir ditimpa
struct PanicScreen {
    col: usize,
    row: usize,
}

impl PanicScreen {
    fn cell(&mut self, offset: usize) -> *mut u8 {
        let base = phys_to_virt(PhysAddr::new(VIDEO_PHYS)).as_mut_ptr::<u8>();
        unsafe { base.add(offset * 2) }
    }

    fn put(&mut self, byte: u8) {
        if byte == b'\n' || self.col == COLS {
            self.col = 0;
            self.row = (self.row + 1).min(ROWS - 1);
            if byte == b'\n' {
                return;
            }
        }
        let cell = self.cell(self.row * COLS + self.col);
        unsafe {
            cell.write_volatile(byte);
            cell.add(1).write_volatile(PANIC_ATTRIB);
        }
        self.col += 1;
    }

    fn clear(&mut self) {
        for offset in 0..COLS * ROWS {
            let cell = self.cell(offset);
            unsafe {
                cell.write_volatile(b' ');
                cell.add(1).write_volatile(PANIC_ATTRIB);
            }
        }
    }
}

impl Write for PanicScreen {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.put(if byte.is_ascii() { byte } else { b'?' });
        }
        Ok(())
    }
}

/// Tulis diagnosa panic ke layar. Sebelum paging siap (offset 0)
/// layar tidak disentuh, hanya serial.
pub fn paint_panic(info: &PanicInfo) {
    if crate::sys::mem::phys_mem_offset() == 0 {
        return;
    }
    let mut screen = PanicScreen { col: 0, row: 0 };
    screen.clear();
    let _ = writeln!(screen, "KERNEL PANIC");
    if let Some(loc) = info.location() {
        let _ = writeln!(screen, "at {}:{}", loc.file(), loc.line());
    }
    let _ = writeln!(screen, "{}", info.message());
    let _ = write!(screen, "\nSystem halted.");
    set_cursor(COLS - 1, ROWS - 1);
}
