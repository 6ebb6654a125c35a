//! Machine: batas antara logika kernel dan hardware
//!
//! `Kernel` tidak pernah menyentuh CR3, TSS, PIC, atau memori fisik
//! secara langsung; semuanya lewat trait ini. Di bare metal
//! implementasinya `arch::machine::X86Machine`.

use crate::sys::mem::paging::{PageDirectory, PageTable};

pub trait Machine {
    /// Load address space slot `pid` (ganti CR3, flush TLB)
    fn install_directory(&mut self, pid: usize, dir: &PageDirectory, video: &PageTable);

    /// Arahkan stack ring-0 (TSS) ke puncak stack kernel `pid`
    fn set_kernel_stack(&mut self, pid: usize);

    fn end_of_interrupt(&mut self, irq: u8);

    /// Pindahkan kursor hardware (hanya untuk terminal foreground)
    fn move_cursor(&mut self, x: usize, y: usize);

    /// Satu halaman teks 4KB di alamat fisik `phys`
    fn video_page(&mut self, phys: u64) -> &mut [u8];

    /// Region fisik 4MB milik slot `pid`
    fn user_region(&mut self, pid: usize) -> &mut [u8];
}
