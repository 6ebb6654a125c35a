//! X86Machine: implementasi `Machine` untuk x86_64
//!
//! Model directory logis (entry 4MB) diterjemahkan ke page table 4-level:
//!   - entry 0/1 (low memory + kernel) tetap memakai mapping bootloader,
//!     disalin sekali saat `init`
//!   - entry 32 (region user 128MB) → dua huge page 2MB di PD[64], PD[65]
//!   - entry 64 (vidmap 256MB)      → PD[128] menunjuk page table video slot
//!
//! Tiap slot punya PML4, PDPT, PD, dan PT video sendiri (statis).
//! Memori fisik diakses lewat window physical-memory bootloader.

use super::{gdt, pic, switch};
use crate::config::{LARGE_PAGE_SIZE, MAX_PROCESSES, PAGE_SIZE, USER_DIR_INDEX, VIDMAP_DIR_INDEX};
use crate::sys::machine::Machine;
use crate::sys::mem::paging::{user_phys, DirEntry, PageDirectory, PageEntry, PageTable as VideoTable};
use crate::sys::mem::{active_page_table, phys_to_virt, virt_to_phys};
use crate::sys::vga;
use core::ptr::addr_of_mut;
use x86_64::registers::control::{Cr3, Cr3Flags};
use x86_64::structures::paging::page_table::PageTableEntry;
use x86_64::structures::paging::{PageTable, PageTableFlags, PhysFrame};
use x86_64::{PhysAddr, VirtAddr};

const SLOTS: usize = MAX_PROCESSES + 1;

/// Huge page 2MB per entry PD
const PD_SPAN: usize = LARGE_PAGE_SIZE / 2;

#[repr(C, align(4096))]
struct SlotTables {
    pml4:  PageTable,
    pdpt:  PageTable,
    pd:    PageTable,
    video: PageTable,
}

static mut SLOT_TABLES: [SlotTables; SLOTS] = [const {
    SlotTables {
        pml4:  PageTable::new(),
        pdpt:  PageTable::new(),
        pd:    PageTable::new(),
        video: PageTable::new(),
    }
}; SLOTS];

/// Alamat fisik tabel milik satu slot
#[derive(Debug, Clone, Copy)]
struct SlotFrames {
    pml4:  u64,
    pdpt:  u64,
    pd:    u64,
    video: u64,
}

impl SlotFrames {
    const EMPTY: Self = Self { pml4: 0, pdpt: 0, pd: 0, video: 0 };
}

pub struct X86Machine {
    frames: [SlotFrames; SLOTS],
}

impl X86Machine {
    pub const fn new() -> Self {
        Self { frames: [SlotFrames::EMPTY; SLOTS] }
    }

    /// Salin mapping bootloader ke tabel setiap slot
    fn build_tables(&mut self) {
        let user_table = PageTableFlags::PRESENT | PageTableFlags::WRITABLE | PageTableFlags::USER_ACCESSIBLE;

        let boot_pml4 = unsafe { active_page_table() };
        let boot_pdpt = unsafe { next_level(&boot_pml4[0]) };
        let boot_pd   = boot_pdpt.and_then(|pdpt| unsafe { next_level(&pdpt[0]) });

        for slot in 0..SLOTS {
            let tables = unsafe { &mut (*addr_of_mut!(SLOT_TABLES))[slot] };
            let frames = SlotFrames {
                pml4:  table_phys(&tables.pml4),
                pdpt:  table_phys(&tables.pdpt),
                pd:    table_phys(&tables.pd),
                video: table_phys(&tables.video),
            };

            copy_table(&mut tables.pml4, Some(&*boot_pml4));
            copy_table(&mut tables.pdpt, boot_pdpt);
            copy_table(&mut tables.pd, boot_pd);
            tables.video.zero();

            tables.pml4[0].set_addr(PhysAddr::new(frames.pdpt), user_table);
            tables.pdpt[0].set_addr(PhysAddr::new(frames.pd), user_table);

            self.frames[slot] = frames;
        }
    }
}

/// Tabel level berikutnya dari entry, kalau ada
unsafe fn next_level(entry: &PageTableEntry) -> Option<&'static PageTable> {
    let flags = entry.flags();
    if !flags.contains(PageTableFlags::PRESENT) {
        return None;
    }
    if flags.contains(PageTableFlags::HUGE_PAGE) {
        panic!("boot page table maps the low 1GB with a huge page");
    }
    Some(&*phys_to_virt(entry.addr()).as_ptr::<PageTable>())
}

fn copy_table(dst: &mut PageTable, src: Option<&PageTable>) {
    match src {
        Some(src) => {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d = s.clone();
            }
        }
        None => dst.zero(),
    }
}

fn table_phys(table: &PageTable) -> u64 {
    let virt = VirtAddr::from_ptr(table as *const PageTable);
    match virt_to_phys(virt) {
        Some(phys) => phys.as_u64(),
        None => panic!("page table at {:?} is not mapped", virt),
    }
}

/// Dipanggil sekali sebelum `Kernel::init`
pub fn init() {
    super::with_kernel(|k| k.machine.build_tables());
    klog!("Paging: {} address-space slots ready", SLOTS);
}

impl Machine for X86Machine {
    fn install_directory(&mut self, pid: usize, dir: &PageDirectory, video: &VideoTable) {
        let frames = self.frames[pid];
        let tables = unsafe { &mut (*addr_of_mut!(SLOT_TABLES))[pid] };
        let user_flags = PageTableFlags::PRESENT | PageTableFlags::WRITABLE | PageTableFlags::USER_ACCESSIBLE;
        let kernel_flags = PageTableFlags::PRESENT | PageTableFlags::WRITABLE;

        let first = USER_DIR_INDEX * 2;
        match dir.entry(USER_DIR_INDEX) {
            DirEntry::UserPage { phys } => {
                let huge = user_flags | PageTableFlags::HUGE_PAGE;
                tables.pd[first].set_addr(PhysAddr::new(phys), huge);
                tables.pd[first + 1].set_addr(PhysAddr::new(phys + PD_SPAN as u64), huge);
            }
            _ => {
                tables.pd[first].set_unused();
                tables.pd[first + 1].set_unused();
            }
        }

        let vidmap = VIDMAP_DIR_INDEX * 2;
        match dir.entry(VIDMAP_DIR_INDEX) {
            DirEntry::VideoTable => {
                for (hw, entry) in tables.video.iter_mut().zip(video.entries()) {
                    match *entry {
                        PageEntry::Page { phys, user } => {
                            let flags = if user { user_flags } else { kernel_flags };
                            hw.set_addr(PhysAddr::new(phys), flags);
                        }
                        PageEntry::NotPresent => hw.set_unused(),
                    }
                }
                tables.pd[vidmap].set_addr(PhysAddr::new(frames.video), user_flags);
            }
            _ => tables.pd[vidmap].set_unused(),
        }

        let frame = PhysFrame::containing_address(PhysAddr::new(frames.pml4));
        unsafe { Cr3::write(frame, Cr3Flags::empty()) };
    }

    fn set_kernel_stack(&mut self, pid: usize) {
        gdt::set_kernel_stack(switch::stack_top(pid));
    }

    fn end_of_interrupt(&mut self, irq: u8) {
        pic::end_of_interrupt(irq);
    }

    fn move_cursor(&mut self, x: usize, y: usize) {
        vga::set_cursor(x, y);
    }

    fn video_page(&mut self, phys: u64) -> &mut [u8] {
        let virt = phys_to_virt(PhysAddr::new(phys));
        unsafe { core::slice::from_raw_parts_mut(virt.as_mut_ptr(), PAGE_SIZE) }
    }

    fn user_region(&mut self, pid: usize) -> &mut [u8] {
        let virt = phys_to_virt(PhysAddr::new(user_phys(pid)));
        unsafe { core::slice::from_raw_parts_mut(virt.as_mut_ptr(), LARGE_PAGE_SIZE) }
    }
}
