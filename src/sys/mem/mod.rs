//! mem: memori kernel
//!
//! `paging` berisi model directory per proses. Di bare metal modul ini
//! juga menyimpan offset physical-memory dari bootloader.

pub mod paging;

#[cfg(target_os = "none")]
mod phys {
    use crate::config::{MAX_PROCESSES, USER_PHYS_BASE};
    use crate::config::LARGE_PAGE_SIZE;
    use bootloader::bootinfo::MemoryRegionType;
    use bootloader::BootInfo;
    use core::sync::atomic::{AtomicU64, Ordering};
    use x86_64::registers::control::Cr3;
    use x86_64::structures::paging::{OffsetPageTable, PageTable, Translate};
    use x86_64::{PhysAddr, VirtAddr};

    static PHYS_MEM_OFFSET: AtomicU64 = AtomicU64::new(0);

    pub fn init(boot_info: &'static BootInfo) {
        PHYS_MEM_OFFSET.store(boot_info.physical_memory_offset, Ordering::SeqCst);

        // Region user semua slot harus RAM bebas
        let start = USER_PHYS_BASE;
        let end   = USER_PHYS_BASE + (MAX_PROCESSES * LARGE_PAGE_SIZE) as u64;
        let mut covered = 0;
        for region in boot_info.memory_map.iter() {
            let r_start = region.range.start_addr();
            let r_end   = region.range.end_addr();
            if r_end <= start || r_start >= end {
                continue;
            }
            if region.region_type != MemoryRegionType::Usable {
                panic!("user memory {:#X}..{:#X} overlaps {:?} region", start, end, region.region_type);
            }
            covered += r_end.min(end) - r_start.max(start);
        }
        if covered < end - start {
            panic!("need RAM up to {:#X} for user processes", end);
        }
        klog!("Memory: phys offset {:#X}", boot_info.physical_memory_offset);
    }

    pub fn phys_mem_offset() -> u64 {
        PHYS_MEM_OFFSET.load(Ordering::SeqCst)
    }

    pub fn phys_to_virt(addr: PhysAddr) -> VirtAddr {
        VirtAddr::new(addr.as_u64() + phys_mem_offset())
    }

    /// Page table aktif dari CR3
    pub unsafe fn active_page_table() -> &'static mut PageTable {
        let (frame, _) = Cr3::read();
        let virt = phys_to_virt(frame.start_address());
        &mut *virt.as_mut_ptr()
    }

    /// Terjemahkan alamat virtual kernel ke fisik lewat tabel boot
    pub fn virt_to_phys(addr: VirtAddr) -> Option<PhysAddr> {
        let mapper = unsafe {
            OffsetPageTable::new(active_page_table(), VirtAddr::new(phys_mem_offset()))
        };
        mapper.translate_addr(addr)
    }
}

#[cfg(target_os = "none")]
pub use phys::{active_page_table, init, phys_mem_offset, phys_to_virt, virt_to_phys};
