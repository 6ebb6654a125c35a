//! Trios: kernel tiga terminal untuk x86_64
//!
//! Library crate: semua logika kernel tinggal di sini supaya bisa
//! dites di host. Bagian yang benar-benar menyentuh hardware
//! (IDT, GDT, port I/O, context switch) hanya dikompilasi untuk
//! `target_os = "none"`.

#![cfg_attr(not(test), no_std)]

// ---------------------------------------------------------------------------
// Logging macros
// ---------------------------------------------------------------------------

/// Log status normal, contoh: `[ OK ] PIC ready`
#[macro_export]
macro_rules! klog {
    ($($arg:tt)*) => {
        $crate::sys::debug::log($crate::sys::debug::Level::Ok, format_args!($($arg)*))
    };
}

/// Log peringatan (operasi gagal tapi kernel tetap jalan)
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {
        $crate::sys::debug::log($crate::sys::debug::Level::Warn, format_args!($($arg)*))
    };
}

/// Log error fatal, dipakai panic handler
#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {
        $crate::sys::debug::log($crate::sys::debug::Level::Fail, format_args!($($arg)*))
    };
}

pub mod config;
pub mod sys;

// ---------------------------------------------------------------------------
// Boot
// ---------------------------------------------------------------------------

/// Inisialisasi semua subsistem. Urutan penting: serial dulu supaya
/// klog! sudah bisa dipakai, paging sebelum Kernel::init, dan IRQ
/// baru di-unmask setelah state kernel siap.
#[cfg(target_os = "none")]
pub fn init(boot_info: &'static bootloader::BootInfo) {
    sys::debug::serial::init();
    klog!("Trios booting");

    sys::arch::cpu::init();
    sys::arch::gdt::init();
    sys::arch::idt::init();
    sys::arch::pic::init();
    sys::mem::init(boot_info);
    sys::arch::machine::init();

    sys::arch::with_kernel(|k| k.init(sys::fs::image()));

    sys::clk::init();
    sys::arch::pic::enable_irq(sys::keyboard::IRQ);
    klog!("Kernel ready");
}

/// Halt CPU selamanya (dipakai setelah panic)
pub fn hlt_loop() -> ! {
    loop {
        #[cfg(target_os = "none")]
        x86_64::instructions::hlt();
        #[cfg(not(target_os = "none"))]
        core::hint::spin_loop();
    }
}
