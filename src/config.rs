//! Konfigurasi compile-time: kapasitas, layout memori, dan timing.
//!
//! Semua array kernel (PCB, page directory, terminal) berukuran tetap
//! dan diindeks dengan konstanta di sini.

// ---------------------------------------------------------------------------
// Kapasitas
// ---------------------------------------------------------------------------

pub const MAX_PROCESSES:        usize = 6;
pub const NUM_TERMINALS:        usize = 3;
pub const MAX_OPEN_FILES:       usize = 8;
pub const TERMINAL_BUFFER_SIZE: usize = 128;
pub const FILENAME_LEN:         usize = 32;

// ---------------------------------------------------------------------------
// Layout memori
// ---------------------------------------------------------------------------

pub const PAGE_SIZE:       usize = 4096;
pub const LARGE_PAGE_SIZE: usize = 4 << 20;
pub const DIR_ENTRIES:     usize = 1024;
pub const TABLE_ENTRIES:   usize = 1024;

/// Directory entry 0: tabel low memory (kode kernel + video)
pub const LOW_DIR_INDEX:    usize = 0;
/// Directory entry 1: region kernel 4MB
pub const KERNEL_DIR_INDEX: usize = 1;
/// Directory entry 32: region user 4MB di 128MB
pub const USER_DIR_INDEX:   usize = 32;
/// Directory entry 64: alias video memory (vidmap) di 256MB
pub const VIDMAP_DIR_INDEX: usize = 64;

pub const USER_VIRT_BASE:       u64   = (USER_DIR_INDEX * LARGE_PAGE_SIZE) as u64;
pub const USER_PHYS_BASE:       u64   = 0x0080_0000;
pub const PROGRAM_IMAGE_OFFSET: usize = 0x48000;
pub const PROGRAM_IMAGE_VIRT:   u64   = USER_VIRT_BASE + PROGRAM_IMAGE_OFFSET as u64;
/// Stack user awal, 16-byte aligned di akhir region 4MB
pub const USER_STACK_TOP:       u64   = USER_VIRT_BASE + LARGE_PAGE_SIZE as u64 - 16;
pub const VIDMAP_VIRT:          u64   = (VIDMAP_DIR_INDEX * LARGE_PAGE_SIZE) as u64;

pub const VIDEO_PHYS:            u64 = 0xB8000;
pub const TERMINAL_STORAGE_PHYS: [u64; NUM_TERMINALS] = [0xB9000, 0xBA000, 0xBB000];

/// Stack kernel per proses (harus power of two, dipakai untuk masking RSP)
pub const KERNEL_STACK_SIZE: usize = 32 * 1024;

/// Program yang dijalankan sebagai root shell di tiap terminal
pub const SHELL: &[u8] = b"shell";

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

pub const PIT_HZ:         u32 = 100;
pub const RTC_BASE_HZ:    u32 = 1024;
pub const RTC_DEFAULT_HZ: u32 = 2;
