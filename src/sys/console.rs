//! Console: tiga terminal virtual
//!
//! Tiap terminal punya buffer input 128 byte, posisi kursor, proses
//! aktif, dan halaman video tempat ia merender. Terminal foreground
//! merender ke layar (0xB8000), dua lainnya ke storage offscreen.
//! Rendering bekerja pada slice halaman 4KB, jadi bisa dites tanpa VGA.

use crate::config::{NUM_TERMINALS, PAGE_SIZE, TERMINAL_BUFFER_SIZE, TERMINAL_STORAGE_PHYS, VIDEO_PHYS};
use crate::sys::kernel::Kernel;
use crate::sys::keyboard::KeyAction;
use crate::sys::machine::Machine;

pub const COLS:   usize = 80;
pub const ROWS:   usize = 25;
pub const ATTRIB: u8    = 0x07;

pub struct Terminal {
    buffer:         [u8; TERMINAL_BUFFER_SIZE],
    pending:        usize,
    cursor_x:       usize,
    cursor_y:       usize,
    /// Proses yang sedang memegang terminal ini
    pub active_pid: Option<usize>,
    /// Halaman fisik tempat terminal merender sekarang
    pub video:      u64,
    /// Halaman offscreen milik terminal ini
    pub storage:    u64,
}

impl Terminal {
    pub const fn new(storage: u64) -> Self {
        Self {
            buffer:     [0; TERMINAL_BUFFER_SIZE],
            pending:    0,
            cursor_x:   0,
            cursor_y:   0,
            active_pid: None,
            video:      storage,
            storage,
        }
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_y)
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn putc(&mut self, page: &mut [u8], c: u8) {
        match c {
            b'\n' | b'\r' => self.newline(page),
            _ => {
                let at = (self.cursor_y * COLS + self.cursor_x) * 2;
                page[at]     = c;
                page[at + 1] = ATTRIB;
                self.cursor_x += 1;
                if self.cursor_x == COLS {
                    self.newline(page);
                }
            }
        }
    }

    pub fn write(&mut self, page: &mut [u8], bytes: &[u8]) {
        for &c in bytes {
            self.putc(page, c);
        }
    }

    fn newline(&mut self, page: &mut [u8]) {
        self.cursor_x = 0;
        self.cursor_y += 1;
        if self.cursor_y == ROWS {
            scroll(page);
            self.cursor_y = ROWS - 1;
        }
    }

    /// Hapus karakter sebelum kursor, mundur ke baris sebelumnya kalau perlu
    pub fn erase(&mut self, page: &mut [u8]) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = COLS - 1;
        } else {
            return;
        }
        let at = (self.cursor_y * COLS + self.cursor_x) * 2;
        page[at]     = b' ';
        page[at + 1] = ATTRIB;
    }

    pub fn clear(&mut self, page: &mut [u8]) {
        blank(page);
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    // -----------------------------------------------------------------------
    // Input buffer
    // -----------------------------------------------------------------------

    /// Tambah karakter ke buffer. Karakter biasa diterima selama masih ada
    /// ruang untuk newline penutup; newline boleh mengisi slot terakhir.
    pub fn push_input(&mut self, c: u8) -> bool {
        let limit = if c == b'\n' { TERMINAL_BUFFER_SIZE } else { TERMINAL_BUFFER_SIZE - 1 };
        if self.pending >= limit {
            return false;
        }
        self.buffer[self.pending] = c;
        self.pending += 1;
        true
    }

    /// Buang karakter terakhir (backspace). Newline yang sudah masuk tidak
    /// bisa dihapus.
    pub fn pop_input(&mut self) -> bool {
        if self.pending == 0 || self.buffer[self.pending - 1] == b'\n' {
            return false;
        }
        self.pending -= 1;
        true
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Read siap kalau `count` byte sudah ada atau ada newline di buffer
    pub fn input_ready(&self, count: usize) -> bool {
        let count = count.min(TERMINAL_BUFFER_SIZE);
        self.pending >= count || self.buffer[..self.pending].contains(&b'\n')
    }

    /// Ambil byte dari depan buffer sampai newline pertama (ikut disalin)
    /// atau sampai `out` penuh, lalu geser sisanya ke kiri.
    pub fn take_input(&mut self, out: &mut [u8]) -> usize {
        let limit = out.len().min(self.pending);
        let n = match self.buffer[..limit].iter().position(|&c| c == b'\n') {
            Some(nl) => nl + 1,
            None     => limit,
        };
        out[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.copy_within(n..self.pending, 0);
        self.pending -= n;
        n
    }
}

/// Geser semua baris naik satu, kosongkan baris terakhir
pub fn scroll(page: &mut [u8]) {
    let row = COLS * 2;
    page.copy_within(row..ROWS * row, 0);
    for cell in page[(ROWS - 1) * row..ROWS * row].chunks_exact_mut(2) {
        cell[0] = b' ';
        cell[1] = ATTRIB;
    }
}

pub fn blank(page: &mut [u8]) {
    for cell in page[..ROWS * COLS * 2].chunks_exact_mut(2) {
        cell[0] = b' ';
        cell[1] = ATTRIB;
    }
}

// ---------------------------------------------------------------------------
// Terminals
// ---------------------------------------------------------------------------

pub struct Terminals {
    terms:      [Terminal; NUM_TERMINALS],
    foreground: usize,
}

impl Terminals {
    pub const fn new() -> Self {
        Self {
            terms: [
                Terminal::new(TERMINAL_STORAGE_PHYS[0]),
                Terminal::new(TERMINAL_STORAGE_PHYS[1]),
                Terminal::new(TERMINAL_STORAGE_PHYS[2]),
            ],
            foreground: 0,
        }
    }

    /// Reset ke kondisi boot: terminal 0 di layar, sisanya offscreen
    pub fn init(&mut self) {
        *self = Self::new();
        self.terms[0].video = VIDEO_PHYS;
    }

    pub fn foreground(&self) -> usize {
        self.foreground
    }

    pub fn get(&self, id: usize) -> &Terminal {
        &self.terms[id]
    }

    pub fn get_mut(&mut self, id: usize) -> &mut Terminal {
        &mut self.terms[id]
    }

    pub fn active_pid(&self, id: usize) -> Option<usize> {
        self.terms[id].active_pid
    }

    pub fn set_active(&mut self, id: usize, pid: usize) {
        self.terms[id].active_pid = Some(pid);
    }

    /// Pindahkan foreground ke `target`; mengembalikan terminal lama
    pub fn set_foreground(&mut self, target: usize) -> usize {
        let old = self.foreground;
        self.terms[old].video    = self.terms[old].storage;
        self.terms[target].video = VIDEO_PHYS;
        self.foreground = target;
        old
    }
}

// ---------------------------------------------------------------------------
// Multiplexer: operasi terminal yang butuh hardware/proses
// ---------------------------------------------------------------------------

/// Ukuran potongan saat menyalin halaman video
const COPY_CHUNK: usize = 512;

impl<M: Machine> Kernel<M> {
    /// Tulis ke terminal `id` di halaman video miliknya (bisa offscreen)
    pub fn terminal_write(&mut self, id: usize, bytes: &[u8]) {
        let term = self.terminals.get_mut(id);
        term.write(self.machine.video_page(term.video), bytes);
        self.sync_cursor(id);
    }

    pub fn terminal_clear(&mut self, id: usize) {
        let term = self.terminals.get_mut(id);
        term.clear(self.machine.video_page(term.video));
        self.sync_cursor(id);
    }

    fn sync_cursor(&mut self, id: usize) {
        if id == self.terminals.foreground() {
            let (x, y) = self.terminals.get(id).cursor();
            self.machine.move_cursor(x, y);
        }
    }

    /// Input keyboard selalu ke terminal foreground, echo hanya di layar
    pub fn key_action(&mut self, action: KeyAction) {
        let fg = self.terminals.foreground();
        match action {
            KeyAction::Switch(target) => self.switch_terminal(target),
            KeyAction::Clear => self.terminal_clear(fg),
            KeyAction::Backspace => {
                let term = self.terminals.get_mut(fg);
                if term.pop_input() {
                    term.erase(self.machine.video_page(term.video));
                    self.sync_cursor(fg);
                }
            }
            KeyAction::Char(c) => {
                let term = self.terminals.get_mut(fg);
                if term.push_input(c) {
                    term.putc(self.machine.video_page(term.video), c);
                    self.sync_cursor(fg);
                }
            }
        }
    }

    fn copy_video(&mut self, from: u64, to: u64) {
        let mut chunk = [0u8; COPY_CHUNK];
        for off in (0..PAGE_SIZE).step_by(COPY_CHUNK) {
            chunk.copy_from_slice(&self.machine.video_page(from)[off..off + COPY_CHUNK]);
            self.machine.video_page(to)[off..off + COPY_CHUNK].copy_from_slice(&chunk);
        }
    }

    /// Pindahkan layar + keyboard ke terminal `target`. Terminal yang
    /// belum punya proses mendapat shell baru.
    pub fn switch_terminal(&mut self, target: usize) {
        let old = self.terminals.foreground();
        if target >= NUM_TERMINALS || target == old {
            return;
        }
        let old_storage = self.terminals.get(old).storage;
        let new_storage = self.terminals.get(target).storage;

        self.copy_video(VIDEO_PHYS, old_storage);
        self.copy_video(new_storage, VIDEO_PHYS);
        self.terminals.set_foreground(target);

        // Alias vidmap mengikuti halaman video yang berpindah
        self.paging.retarget_video_aliases(old_storage, new_storage);
        let cur = self.procs.current_pid();
        if cur != 0 {
            self.install(cur);
        }
        self.sync_cursor(target);
        klog!("terminal: {} -> {}", old, target);

        if self.terminals.active_pid(target).is_none() {
            if let Err(e) = self.spawn_shell(target) {
                kwarn!("terminal {}: no shell started: {}", target, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_SIZE;

    fn page() -> [u8; PAGE_SIZE] {
        let mut p = [0u8; PAGE_SIZE];
        blank(&mut p);
        p
    }

    fn row(page: &[u8], y: usize) -> std::vec::Vec<u8> {
        (0..COLS).map(|x| page[(y * COLS + x) * 2]).collect()
    }

    #[test]
    fn write_lands_at_cursor() {
        let mut t = Terminal::new(0);
        let mut p = page();
        t.write(&mut p, b"ab\ncd");
        assert_eq!(&row(&p, 0)[..3], b"ab ");
        assert_eq!(&row(&p, 1)[..2], b"cd");
        assert_eq!(t.cursor(), (2, 1));
    }

    #[test]
    fn wraps_and_scrolls() {
        let mut t = Terminal::new(0);
        let mut p = page();
        t.write(&mut p, b"first\n");
        for _ in 0..ROWS - 1 {
            t.write(&mut p, b"\n");
        }
        // baris "first" sudah tergeser keluar
        assert!(row(&p, 0).iter().all(|&c| c == b' '));
        assert_eq!(t.cursor(), (0, ROWS - 1));

        let long = [b'z'; COLS + 3];
        t.write(&mut p, &long);
        assert_eq!(t.cursor(), (3, ROWS - 1));
        assert!(row(&p, ROWS - 2).iter().all(|&c| c == b'z'));
    }

    #[test]
    fn erase_wraps_to_previous_line() {
        let mut t = Terminal::new(0);
        let mut p = page();
        t.write(&mut p, &[b'q'; COLS]);
        assert_eq!(t.cursor(), (0, 1));
        t.erase(&mut p);
        assert_eq!(t.cursor(), (COLS - 1, 0));
        assert_eq!(p[(COLS - 1) * 2], b' ');
    }

    #[test]
    fn input_fill_rule_reserves_newline_slot() {
        let mut t = Terminal::new(0);
        for _ in 0..TERMINAL_BUFFER_SIZE - 1 {
            assert!(t.push_input(b'a'));
        }
        assert!(!t.push_input(b'a'));
        assert!(t.push_input(b'\n'));
        assert!(!t.push_input(b'\n'));
        assert_eq!(t.pending(), TERMINAL_BUFFER_SIZE);
    }

    #[test]
    fn take_input_stops_after_newline() {
        let mut t = Terminal::new(0);
        for &c in b"ls\ncat x\n" {
            t.push_input(c);
        }
        assert!(t.input_ready(100));
        let mut out = [0u8; 128];
        assert_eq!(t.take_input(&mut out), 3);
        assert_eq!(&out[..3], b"ls\n");
        assert_eq!(t.take_input(&mut out[..2]), 2);
        assert_eq!(&out[..2], b"ca");
        assert_eq!(t.take_input(&mut out), 4);
        assert_eq!(&out[..4], b"t x\n");
        assert_eq!(t.pending(), 0);
        assert!(!t.input_ready(1));
    }

    #[test]
    fn backspace_cannot_eat_newline() {
        let mut t = Terminal::new(0);
        t.push_input(b'a');
        t.push_input(b'\n');
        assert!(!t.pop_input());
        t.push_input(b'b');
        assert!(t.pop_input());
        assert_eq!(t.pending(), 2);
    }

    #[test]
    fn foreground_swaps_video_pages() {
        let mut terms = Terminals::new();
        terms.init();
        assert_eq!(terms.get(0).video, VIDEO_PHYS);
        assert_eq!(terms.set_foreground(2), 0);
        assert_eq!(terms.get(0).video, TERMINAL_STORAGE_PHYS[0]);
        assert_eq!(terms.get(2).video, VIDEO_PHYS);
        assert_eq!(terms.foreground(), 2);
    }
}
