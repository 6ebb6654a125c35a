//! arch: x86_64 hardware abstraction layer
//!
//! Berisi semua komponen yang berhubungan langsung dengan arsitektur x86_64:
//!   - GDT + TSS (stack ring-0 per proses)
//!   - IDT, stub interrupt, dan handler trap
//!   - CPU utilities
//!   - PIC (Programmable Interrupt Controller)
//!   - switch: primitive context switch (naked functions)
//!   - machine: implementasi `Machine` di atas page table x86_64

pub mod cpu;
pub mod gdt;
pub mod idt;
pub mod machine;
pub mod pic;
pub mod switch;

use crate::sys::kernel::Kernel;
use machine::X86Machine;
use spin::Mutex;
use x86_64::instructions::interrupts;

/// State kernel global. Diinisialisasi const, diisi di `Kernel::init`.
static KERNEL: Mutex<Kernel<X86Machine>> = Mutex::new(Kernel::new(X86Machine::new()));

/// Jalankan `f` dengan akses eksklusif ke kernel. Interrupt dimatikan
/// selama `f` dan dikembalikan ke keadaan sebelumnya setelahnya.
/// Jangan memanggil primitive context switch dari dalam `f`.
pub fn with_kernel<R>(f: impl FnOnce(&mut Kernel<X86Machine>) -> R) -> R {
    interrupts::without_interrupts(|| f(&mut KERNEL.lock()))
}
