//! Kernel: satu-satunya container state global
//!
//! Tabel proses, page directory, terminal, scheduler, dan filesystem
//! hidup di sini. Semua mutasi lewat `&mut Kernel`, dan di bare metal
//! `&mut` itu hanya didapat lewat `arch::with_kernel` (interrupt mati).

use crate::config::{TERMINAL_STORAGE_PHYS, VIDEO_PHYS};
use crate::sys::console::{self, Terminals};
use crate::sys::fs::RoFs;
use crate::sys::machine::Machine;
use crate::sys::mem::paging::Paging;
use crate::sys::proc::process::ProcessTable;
use crate::sys::proc::sched::Scheduler;

pub struct Kernel<M> {
    pub machine:   M,
    pub fs:        RoFs,
    pub procs:     ProcessTable,
    pub paging:    Paging,
    pub terminals: Terminals,
    pub sched:     Scheduler,
}

impl<M: Machine> Kernel<M> {
    pub const fn new(machine: M) -> Self {
        Self {
            machine,
            fs:        RoFs::empty(),
            procs:     ProcessTable::new(),
            paging:    Paging::new(),
            terminals: Terminals::new(),
            sched:     Scheduler::new(),
        }
    }

    /// Pasang image filesystem, bangun directory, kosongkan semua layar
    pub fn init(&mut self, image: &'static [u8]) {
        self.fs = match RoFs::new(image) {
            Ok(fs) => fs,
            Err(e) => panic!("filesystem image rejected: {}", e),
        };
        self.procs = ProcessTable::new();
        self.sched = Scheduler::new();

        self.paging.init();
        self.install(0);

        self.terminals.init();
        for phys in core::iter::once(VIDEO_PHYS).chain(TERMINAL_STORAGE_PHYS) {
            console::blank(self.machine.video_page(phys));
        }
        self.machine.move_cursor(0, 0);

        klog!("Kernel: fs {} entries, {} inodes, {} data blocks",
            self.fs.dir_count(), self.fs.inode_count(), self.fs.data_count());
    }

    /// Load directory slot `pid` ke CPU. Wajib setiap ganti proses.
    pub fn install(&mut self, pid: usize) {
        self.machine.install_directory(
            pid,
            self.paging.directory(pid),
            self.paging.video_table(pid),
        );
    }

    /// IRQ 8: satu tick hardware untuk countdown RTC semua proses
    pub fn rtc_interrupt(&mut self) {
        self.procs.rtc_tick();
    }
}
