//! sys: subsistem kernel Trios
//!
//! Struktur:
//!   arch/   : x86_64: gdt, idt, cpu, pic, context switch, machine
//!   proc/   : process management: pcb, execute/halt, scheduler
//!   mem/    : model page directory per proses
//!   fs/     : filesystem read-only + tabel file descriptor
//!   clk/    : PIT dan RTC
//!   debug/  : log ke serial
//!   syscall/: dispatcher syscall

pub mod clk;
pub mod console;
pub mod debug;
pub mod error;
pub mod fs;
pub mod kernel;
pub mod keyboard;
pub mod machine;
pub mod mem;
pub mod proc;
pub mod syscall;
#[cfg(target_os = "none")]
pub mod vga;

#[cfg(target_os = "none")]
pub mod arch;

pub use error::{Error, Result};
pub use kernel::Kernel;
pub use machine::Machine;
