//! Process: PCB dan tabel proses
//!
//! Kapasitas tetap `MAX_PROCESSES`. PID = index slot + 1; PID 0 tidak
//! pernah dipakai. Slot bebas/terpakai hanya ditentukan bitmap `active`.

use crate::config::{MAX_PROCESSES, TERMINAL_BUFFER_SIZE};
use crate::sys::fs::FileTable;

// ---------------------------------------------------------------------------
// Konteks tersimpan
// ---------------------------------------------------------------------------

/// Konteks kernel yang bisa dilanjutkan: RSP, RBP, dan alamat resume.
/// Register callee-saved lain sudah di-push ke stack sebelum RSP disimpan.
/// Layout dipakai langsung oleh assembly di `arch::switch`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelContext {
    pub rsp: u64,
    pub rbp: u64,
    pub rip: u64,
}

impl KernelContext {
    pub const EMPTY: Self = Self { rsp: 0, rbp: 0, rip: 0 };
}

/// Keadaan proses dari sudut pandang scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedState {
    /// Sedang jalan, atau menunggu child di dalam `execute`
    Running,
    /// Belum pernah jalan; dimulai lewat iretq ke ring 3
    Fresh { entry: u64, user_sp: u64 },
    /// Disimpan scheduler di tengah kernel mode (`sched_context`)
    Suspended,
}

impl SchedState {
    /// Konteks harus dilanjutkan di privilege level 3
    pub fn is_user_mode(&self) -> bool {
        matches!(self, SchedState::Fresh { .. })
    }
}

/// Slot pemilik stack kernel yang memuat `sp`. Stack per slot berukuran
/// `stack_size` (power of two) dan berurutan mulai dari `base`.
pub fn stack_owner(base: u64, stack_size: u64, sp: u64) -> Option<usize> {
    if sp <= base {
        return None;
    }
    // sp == puncak stack masih milik slot di bawahnya
    let stack_base = (sp - 1) & !(stack_size - 1);
    let pid = ((stack_base - base) / stack_size) as usize + 1;
    (pid <= MAX_PROCESSES).then_some(pid)
}

// ---------------------------------------------------------------------------
// Argumen command line
// ---------------------------------------------------------------------------

/// Ekor command line saat `execute`, disimpan dengan terminator NUL
#[derive(Debug, Clone, Copy)]
pub struct Args {
    bytes: [u8; TERMINAL_BUFFER_SIZE],
    len:   usize,
}

impl Args {
    pub const EMPTY: Self = Self { bytes: [0; TERMINAL_BUFFER_SIZE], len: 0 };

    /// Simpan `args` + NUL; dipotong supaya muat di buffer
    pub fn capture(args: &[u8]) -> Self {
        let mut out = Self::EMPTY;
        let n = args.len().min(TERMINAL_BUFFER_SIZE - 1);
        out.bytes[..n].copy_from_slice(&args[..n]);
        out.bytes[n] = 0;
        out.len = n + 1;
        out
    }

    /// Byte yang disalin `getargs`, termasuk NUL
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Tidak ada argumen selain terminator
    pub fn is_empty(&self) -> bool {
        self.len <= 1
    }
}

// ---------------------------------------------------------------------------
// PCB
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Pcb {
    pub pid:            usize,
    /// 0 untuk root shell terminal
    pub parent_id:      usize,
    pub terminal:       usize,
    pub state:          SchedState,
    /// Konteks yang disimpan scheduler
    pub sched_context:  KernelContext,
    /// Titik resume `execute` milik parent, dipakai saat halt
    pub parent_context: KernelContext,
    pub files:          FileTable,
    pub args:           Args,
    /// Tick RTC hardware tersisa sebelum `read` RTC selesai
    pub rtc_countdown:  u32,
}

impl Pcb {
    pub const EMPTY: Self = Self {
        pid:            0,
        parent_id:      0,
        terminal:       0,
        state:          SchedState::Running,
        sched_context:  KernelContext::EMPTY,
        parent_context: KernelContext::EMPTY,
        files:          FileTable::EMPTY,
        args:           Args::EMPTY,
        rtc_countdown:  0,
    };

    pub fn new(pid: usize, parent_id: usize, terminal: usize, args: Args) -> Self {
        Self {
            pid,
            parent_id,
            terminal,
            files: FileTable::with_stdio(),
            args,
            ..Self::EMPTY
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessTable
// ---------------------------------------------------------------------------

pub struct ProcessTable {
    pcbs:    [Pcb; MAX_PROCESSES],
    active:  [bool; MAX_PROCESSES],
    current: usize,
}

impl ProcessTable {
    pub const fn new() -> Self {
        Self {
            pcbs:    [Pcb::EMPTY; MAX_PROCESSES],
            active:  [false; MAX_PROCESSES],
            current: 0,
        }
    }

    fn slot(pid: usize) -> usize {
        match pid {
            1..=MAX_PROCESSES => pid - 1,
            _ => panic!("invalid pid {}", pid),
        }
    }

    pub fn get(&self, pid: usize) -> &Pcb {
        &self.pcbs[Self::slot(pid)]
    }

    pub fn get_mut(&mut self, pid: usize) -> &mut Pcb {
        &mut self.pcbs[Self::slot(pid)]
    }

    /// PID proses yang sedang jalan (0 sebelum proses pertama)
    pub fn current_pid(&self) -> usize {
        self.current
    }

    pub fn set_current(&mut self, pid: usize) {
        self.current = pid;
    }

    pub fn current(&self) -> &Pcb {
        self.get(self.current)
    }

    pub fn current_mut(&mut self) -> &mut Pcb {
        self.get_mut(self.current)
    }

    /// Slot bebas terendah
    pub fn free_slot(&self) -> Option<usize> {
        self.active.iter().position(|&a| !a).map(|i| i + 1)
    }

    pub fn is_active(&self, pid: usize) -> bool {
        self.active[Self::slot(pid)]
    }

    pub fn activate(&mut self, pid: usize) {
        self.active[Self::slot(pid)] = true;
    }

    pub fn deactivate(&mut self, pid: usize) {
        self.active[Self::slot(pid)] = false;
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// Tick RTC hardware: kurangi countdown semua proses aktif
    pub fn rtc_tick(&mut self) {
        for (pcb, _) in self.pcbs.iter_mut().zip(self.active).filter(|(_, a)| *a) {
            pcb.rtc_countdown = pcb.rtc_countdown.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_reused_lowest_first() {
        let mut t = ProcessTable::new();
        assert_eq!(t.free_slot(), Some(1));
        for pid in 1..=MAX_PROCESSES {
            t.activate(pid);
        }
        assert_eq!(t.free_slot(), None);
        t.deactivate(3);
        assert_eq!(t.free_slot(), Some(3));
        assert_eq!(t.active_count(), MAX_PROCESSES - 1);
    }

    #[test]
    #[should_panic]
    fn pid_zero_is_fatal() {
        ProcessTable::new().get(0);
    }

    #[test]
    fn args_keep_terminator() {
        let a = Args::capture(b"frame0.txt");
        assert_eq!(a.as_bytes(), b"frame0.txt\0");
        assert!(!a.is_empty());
        assert!(Args::capture(b"").is_empty());
        assert_eq!(Args::capture(&[b'x'; 200]).as_bytes().len(), TERMINAL_BUFFER_SIZE);
    }

    #[test]
    fn stack_owner_masks_stack_pointer() {
        let base = 0x20_0000;
        let size = 0x8000;
        assert_eq!(stack_owner(base, size, base + 0x10), Some(1));
        assert_eq!(stack_owner(base, size, base + size), Some(1));
        assert_eq!(stack_owner(base, size, base + size + 8), Some(2));
        assert_eq!(stack_owner(base, size, base + 6 * size), Some(6));
        assert_eq!(stack_owner(base, size, base + 6 * size + 8), None);
        assert_eq!(stack_owner(base, size, base), None);
    }

    #[test]
    fn fresh_processes_resume_in_user_mode() {
        assert!(SchedState::Fresh { entry: 1, user_sp: 2 }.is_user_mode());
        assert!(!SchedState::Suspended.is_user_mode());
    }

    #[test]
    fn rtc_tick_skips_inactive() {
        let mut t = ProcessTable::new();
        t.activate(1);
        t.get_mut(1).rtc_countdown = 2;
        t.get_mut(2).rtc_countdown = 2;
        t.rtc_tick();
        t.rtc_tick();
        t.rtc_tick();
        assert_eq!(t.get(1).rtc_countdown, 0);
        assert_eq!(t.get(2).rtc_countdown, 2);
    }
}
