//! GDT: Global Descriptor Table
//!
//! Segmen kernel dan userspace, plus TSS. `privilege_stack_table[0]`
//! diubah setiap ganti proses supaya trap dari ring 3 mendarat di stack
//! kernel milik proses itu.

use core::ptr::{addr_of, addr_of_mut};
use lazy_static::lazy_static;
use x86_64::instructions::segmentation::{Segment, CS, DS, ES, SS};
use x86_64::instructions::tables::load_tss;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};
use x86_64::structures::tss::TaskStateSegment;
use x86_64::VirtAddr;

/// Ukuran stack IST untuk double fault (16 KB)
const IST_STACK_SIZE: usize = 16 * 1024;

pub const DOUBLE_FAULT_IST: u16 = 0;

static mut TSS: TaskStateSegment = TaskStateSegment::new();

/// Selector segmen yang dipakai oleh kernel dan userspace
pub struct SegmentSelectors {
    pub tss:    SegmentSelector,
    pub k_code: SegmentSelector,
    pub k_data: SegmentSelector,
    pub u_code: SegmentSelector,
    pub u_data: SegmentSelector,
}

lazy_static! {
    pub static ref GDT: (GlobalDescriptorTable, SegmentSelectors) = {
        let mut gdt = GlobalDescriptorTable::new();

        let tss    = gdt.add_entry(Descriptor::tss_segment(unsafe { &*addr_of!(TSS) }));
        let k_code = gdt.add_entry(Descriptor::kernel_code_segment());
        let k_data = gdt.add_entry(Descriptor::kernel_data_segment());
        let u_data = gdt.add_entry(Descriptor::user_data_segment());
        let u_code = gdt.add_entry(Descriptor::user_code_segment());

        (gdt, SegmentSelectors { tss, k_code, k_data, u_code, u_data })
    };
}

/// Inisialisasi TSS + GDT dan load ke prosesor
pub fn init() {
    unsafe {
        static mut DF_STACK: [u8; IST_STACK_SIZE] = [0; IST_STACK_SIZE];
        let top = VirtAddr::from_ptr(addr_of!(DF_STACK)) + IST_STACK_SIZE as u64;
        (*addr_of_mut!(TSS)).interrupt_stack_table[DOUBLE_FAULT_IST as usize] = top;
    }

    GDT.0.load();
    unsafe {
        CS::set_reg(GDT.1.k_code);
        DS::set_reg(GDT.1.k_data);
        ES::set_reg(GDT.1.k_data);
        SS::set_reg(GDT.1.k_data);
        load_tss(GDT.1.tss);
    }
    klog!("GDT: loaded");
}

/// Stack ring-0 untuk trap berikutnya dari userspace
pub fn set_kernel_stack(top: VirtAddr) {
    unsafe {
        (*addr_of_mut!(TSS)).privilege_stack_table[0] = top;
    }
}

/// Selector (CS, SS) untuk iretq ke ring 3
pub fn user_selectors() -> (u64, u64) {
    (GDT.1.u_code.0 as u64, GDT.1.u_data.0 as u64)
}
