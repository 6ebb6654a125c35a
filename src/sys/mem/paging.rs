//! Paging: model page directory per proses
//!
//! Setiap slot proses punya satu directory 1024 entry (tiap entry 4MB)
//! dan satu page table privat untuk alias video (vidmap). Directory 0
//! milik kernel saat boot. Semua array statis, tidak ada alokasi.
//!
//! Model ini hardware-independent; `Machine::install_directory`
//! yang menerjemahkannya ke page table x86_64 sungguhan.

use crate::config::{
    DIR_ENTRIES, KERNEL_DIR_INDEX, LARGE_PAGE_SIZE, LOW_DIR_INDEX, MAX_PROCESSES,
    PAGE_SIZE, TABLE_ENTRIES, TERMINAL_STORAGE_PHYS, USER_DIR_INDEX, USER_PHYS_BASE,
    VIDEO_PHYS, VIDMAP_DIR_INDEX,
};

/// Satu entry page directory (4MB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirEntry {
    NotPresent,
    /// Tabel low memory bersama (kode kernel + window video)
    LowTable,
    /// Large page kernel 4MB, supervisor
    KernelPage,
    /// Large page user 4MB ke memori fisik privat proses
    UserPage { phys: u64 },
    /// Page table alias video milik slot ini
    VideoTable,
}

/// Satu entry page table (4KB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEntry {
    NotPresent,
    Page { phys: u64, user: bool },
}

pub struct PageDirectory {
    entries: [DirEntry; DIR_ENTRIES],
}

impl PageDirectory {
    pub const EMPTY: Self = Self { entries: [DirEntry::NotPresent; DIR_ENTRIES] };

    pub fn entry(&self, index: usize) -> DirEntry {
        self.entries[index]
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }
}

pub struct PageTable {
    entries: [PageEntry; TABLE_ENTRIES],
}

impl PageTable {
    pub const EMPTY: Self = Self { entries: [PageEntry::NotPresent; TABLE_ENTRIES] };

    pub fn entry(&self, index: usize) -> PageEntry {
        self.entries[index]
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    fn clear(&mut self) {
        self.entries = [PageEntry::NotPresent; TABLE_ENTRIES];
    }
}

/// Alamat fisik region user 4MB milik slot `pid`
pub const fn user_phys(pid: usize) -> u64 {
    USER_PHYS_BASE + ((pid - 1) * LARGE_PAGE_SIZE) as u64
}

// ---------------------------------------------------------------------------
// Paging: semua directory dan tabel, diindeks dengan pid (0 = kernel)
// ---------------------------------------------------------------------------

pub struct Paging {
    low_table:    PageTable,
    directories:  [PageDirectory; MAX_PROCESSES + 1],
    video_tables: [PageTable; MAX_PROCESSES + 1],
}

impl Paging {
    pub const fn new() -> Self {
        Self {
            low_table:    PageTable::EMPTY,
            directories:  [PageDirectory::EMPTY; MAX_PROCESSES + 1],
            video_tables: [PageTable::EMPTY; MAX_PROCESSES + 1],
        }
    }

    /// Reset semua directory lalu bangun mapping bersama + region user
    pub fn init(&mut self) {
        self.low_table.clear();
        let video_pages = core::iter::once(VIDEO_PHYS).chain(TERMINAL_STORAGE_PHYS);
        for phys in video_pages {
            self.low_table.entries[phys as usize / PAGE_SIZE] = PageEntry::Page { phys, user: false };
        }

        for (pid, dir) in self.directories.iter_mut().enumerate() {
            dir.entries = [DirEntry::NotPresent; DIR_ENTRIES];
            dir.entries[LOW_DIR_INDEX]    = DirEntry::LowTable;
            dir.entries[KERNEL_DIR_INDEX] = DirEntry::KernelPage;
            if pid > 0 {
                dir.entries[USER_DIR_INDEX] = DirEntry::UserPage { phys: user_phys(pid) };
            }
        }
        for table in self.video_tables.iter_mut() {
            table.clear();
        }
    }

    pub fn low_table(&self) -> &PageTable {
        &self.low_table
    }

    pub fn directory(&self, pid: usize) -> &PageDirectory {
        &self.directories[pid]
    }

    pub fn video_table(&self, pid: usize) -> &PageTable {
        &self.video_tables[pid]
    }

    /// Pasang alias video untuk slot `pid` ke halaman fisik `phys`
    pub fn map_video_alias(&mut self, pid: usize, phys: u64) {
        self.directories[pid].entries[VIDMAP_DIR_INDEX] = DirEntry::VideoTable;
        self.video_tables[pid].entries[0] = PageEntry::Page { phys, user: true };
    }

    pub fn clear_video_alias(&mut self, pid: usize) {
        self.directories[pid].entries[VIDMAP_DIR_INDEX] = DirEntry::NotPresent;
        self.video_tables[pid].clear();
    }

    /// Halaman fisik yang sedang dialias slot `pid`, kalau ada
    pub fn video_alias(&self, pid: usize) -> Option<u64> {
        if self.directories[pid].entries[VIDMAP_DIR_INDEX] != DirEntry::VideoTable {
            return None;
        }
        match self.video_tables[pid].entries[0] {
            PageEntry::Page { phys, .. } => Some(phys),
            PageEntry::NotPresent => None,
        }
    }

    /// Setelah ganti terminal: alias yang menunjuk ke layar pindah ke
    /// storage terminal lama, alias ke storage terminal baru pindah ke layar.
    pub fn retarget_video_aliases(&mut self, old_storage: u64, new_storage: u64) {
        for table in self.video_tables.iter_mut() {
            if let PageEntry::Page { phys, user } = table.entries[0] {
                let phys = if phys == VIDEO_PHYS {
                    old_storage
                } else if phys == new_storage {
                    VIDEO_PHYS
                } else {
                    phys
                };
                table.entries[0] = PageEntry::Page { phys, user };
            }
        }
    }
}
