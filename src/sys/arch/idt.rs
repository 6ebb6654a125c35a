//! IDT: Interrupt Descriptor Table
//!
//! Semua entry menunjuk ke stub naked di modul ini, bukan ke
//! `extern "x86-interrupt"`, karena handler timer dan syscall bisa
//! berpindah stack di tengah jalan (lihat `switch`).
//!
//! Vektor:
//!   0-19  exception CPU → fatal
//!   32    IRQ 0  timer (scheduler)
//!   33    IRQ 1  keyboard
//!   40    IRQ 8  RTC
//!   0x80  syscall (DPL 3)

use super::gdt::DOUBLE_FAULT_IST;
use super::pic::{self, irq_vector};
use super::{switch, with_kernel};
use crate::sys::clk::{rtc, TIMER_IRQ};
use crate::sys::keyboard;
use crate::sys::proc::sched::Switch;
use crate::sys::syscall::{SyscallOutcome, Wait};
use lazy_static::lazy_static;
use x86_64::instructions::interrupts;
use x86_64::instructions::port::Port;
use x86_64::registers::control::Cr2;
use x86_64::structures::idt::InterruptDescriptorTable;
use x86_64::{PrivilegeLevel, VirtAddr};

pub const SYSCALL_VECTOR: usize = 0x80;

// ---------------------------------------------------------------------------
// Stub
// ---------------------------------------------------------------------------

/// Stub IRQ: simpan register caller-saved, panggil handler Rust, iretq.
/// 9 push + frame iretq (5 qword) → stack 16-byte aligned saat `call`.
macro_rules! irq_stub {
    ($name:ident, $handler:path) => {
        #[unsafe(naked)]
        unsafe extern "sysv64" fn $name() {
            core::arch::naked_asm!(
                "push rax",
                "push rcx",
                "push rdx",
                "push rsi",
                "push rdi",
                "push r8",
                "push r9",
                "push r10",
                "push r11",
                "call {handler}",
                "pop r11",
                "pop r10",
                "pop r9",
                "pop r8",
                "pop rdi",
                "pop rsi",
                "pop rdx",
                "pop rcx",
                "pop rax",
                "iretq",
                handler = sym $handler,
            );
        }
    };
}

/// Stub exception: tidak pernah kembali.
/// rdi = vektor, rsi = frame dari CPU, rdx = 1 kalau CPU push error code
macro_rules! exception_stub {
    ($name:ident, $vector:expr, $has_error:expr) => {
        #[unsafe(naked)]
        unsafe extern "sysv64" fn $name() {
            core::arch::naked_asm!(
                "mov rsi, rsp",
                "mov edi, {vector}",
                "mov edx, {has_error}",
                "and rsp, -16",
                "call {fatal}",
                "ud2",
                vector    = const $vector,
                has_error = const $has_error,
                fatal     = sym exception_fatal,
            );
        }
    };
}

irq_stub!(timer_stub, timer_interrupt);
irq_stub!(keyboard_stub, keyboard_interrupt);
irq_stub!(rtc_stub, rtc_interrupt);

exception_stub!(divide_error_stub,        0,  0);
exception_stub!(debug_stub,               1,  0);
exception_stub!(nmi_stub,                 2,  0);
exception_stub!(breakpoint_stub,          3,  0);
exception_stub!(overflow_stub,            4,  0);
exception_stub!(bound_range_stub,         5,  0);
exception_stub!(invalid_opcode_stub,      6,  0);
exception_stub!(device_na_stub,           7,  0);
exception_stub!(double_fault_stub,        8,  1);
exception_stub!(invalid_tss_stub,         10, 1);
exception_stub!(segment_np_stub,          11, 1);
exception_stub!(stack_fault_stub,         12, 1);
exception_stub!(gp_fault_stub,            13, 1);
exception_stub!(page_fault_stub,          14, 1);
exception_stub!(x87_fp_stub,              16, 0);
exception_stub!(alignment_check_stub,     17, 1);
exception_stub!(machine_check_stub,       18, 0);
exception_stub!(simd_fp_stub,             19, 0);

/// Entry `int 0x80`. Konvensi user: rax = nomor, rdi/rsi/rdx = argumen,
/// hasil di rax. Semua register lain dikembalikan utuh.
#[unsafe(naked)]
unsafe extern "sysv64" fn syscall_stub() {
    core::arch::naked_asm!(
        "push rax",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        // (n, a1, a2, a3) → (rdi, rsi, rdx, rcx)
        "mov rcx, rdx",
        "mov rdx, rsi",
        "mov rsi, rdi",
        "mov rdi, rax",
        "call {dispatch}",
        "mov [rsp + 64], rax",   // timpa rax tersimpan
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rax",
        "iretq",
        dispatch = sym syscall_dispatch,
    );
}

fn addr(stub: unsafe extern "sysv64" fn()) -> VirtAddr {
    VirtAddr::new(stub as usize as u64)
}

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        unsafe {
            idt.divide_error.set_handler_addr(addr(divide_error_stub));
            idt.debug.set_handler_addr(addr(debug_stub));
            idt.non_maskable_interrupt.set_handler_addr(addr(nmi_stub));
            idt.breakpoint.set_handler_addr(addr(breakpoint_stub));
            idt.overflow.set_handler_addr(addr(overflow_stub));
            idt.bound_range_exceeded.set_handler_addr(addr(bound_range_stub));
            idt.invalid_opcode.set_handler_addr(addr(invalid_opcode_stub));
            idt.device_not_available.set_handler_addr(addr(device_na_stub));
            idt.double_fault
                .set_handler_addr(addr(double_fault_stub))
                .set_stack_index(DOUBLE_FAULT_IST);
            idt.invalid_tss.set_handler_addr(addr(invalid_tss_stub));
            idt.segment_not_present.set_handler_addr(addr(segment_np_stub));
            idt.stack_segment_fault.set_handler_addr(addr(stack_fault_stub));
            idt.general_protection_fault.set_handler_addr(addr(gp_fault_stub));
            idt.page_fault.set_handler_addr(addr(page_fault_stub));
            idt.x87_floating_point.set_handler_addr(addr(x87_fp_stub));
            idt.alignment_check.set_handler_addr(addr(alignment_check_stub));
            idt.machine_check.set_handler_addr(addr(machine_check_stub));
            idt.simd_floating_point.set_handler_addr(addr(simd_fp_stub));

            idt[irq_vector(TIMER_IRQ) as usize].set_handler_addr(addr(timer_stub));
            idt[irq_vector(keyboard::IRQ) as usize].set_handler_addr(addr(keyboard_stub));
            idt[irq_vector(rtc::IRQ) as usize].set_handler_addr(addr(rtc_stub));

            idt[SYSCALL_VECTOR]
                .set_handler_addr(addr(syscall_stub))
                .set_privilege_level(PrivilegeLevel::Ring3);
        }
        idt
    };
}

pub fn init() {
    IDT.load();
    klog!("IDT: loaded");
}

// ---------------------------------------------------------------------------
// Exception
// ---------------------------------------------------------------------------

const EXCEPTION_NAMES: [&str; 20] = [
    "divide error",
    "debug",
    "non-maskable interrupt",
    "breakpoint",
    "overflow",
    "bound range exceeded",
    "invalid opcode",
    "device not available",
    "double fault",
    "coprocessor segment overrun",
    "invalid TSS",
    "segment not present",
    "stack-segment fault",
    "general protection fault",
    "page fault",
    "reserved",
    "x87 floating point",
    "alignment check",
    "machine check",
    "SIMD floating point",
];

extern "sysv64" fn exception_fatal(vector: u64, frame: *const u64, has_error: u64) -> ! {
    let (error, rip) = unsafe {
        if has_error != 0 {
            (Some(*frame), *frame.add(1))
        } else {
            (None, *frame)
        }
    };
    let name = EXCEPTION_NAMES.get(vector as usize).copied().unwrap_or("unknown");

    if vector == 14 {
        panic!("EXCEPTION: {} at {:#X}, addr {:?}, error {:#X}",
            name, rip, Cr2::read(), error.unwrap_or(0));
    }
    match error {
        Some(code) => panic!("EXCEPTION: {} at {:#X}, error {:#X}", name, rip, code),
        None       => panic!("EXCEPTION: {} at {:#X}", name, rip),
    }
}

// ---------------------------------------------------------------------------
// IRQ handler
// ---------------------------------------------------------------------------

extern "sysv64" fn timer_interrupt() {
    match with_kernel(|k| k.schedule()) {
        None => {}
        Some(Switch::Kernel { save, next }) => unsafe {
            switch::switch_kernel(save, next);
        },
        Some(Switch::User { save, launch }) => unsafe {
            // EOI sudah dikirim `schedule`; kembali ke sini nanti lewat
            // switch_kernel dari proses lain
            switch::enter_user(save, launch);
        },
    }
    // EOI untuk tick yang memindahkan CPU kembali ke proses ini
    pic::end_of_interrupt(TIMER_IRQ);
}

extern "sysv64" fn keyboard_interrupt() {
    let scancode = unsafe { Port::<u8>::new(keyboard::DATA_PORT).read() };
    if let Some(action) = keyboard::decode(scancode) {
        with_kernel(|k| k.key_action(action));
    }
    pic::end_of_interrupt(keyboard::IRQ);
}

extern "sysv64" fn rtc_interrupt() {
    with_kernel(|k| k.rtc_interrupt());
    rtc::acknowledge();
    pic::end_of_interrupt(rtc::IRQ);
}

// ---------------------------------------------------------------------------
// Syscall
// ---------------------------------------------------------------------------

extern "sysv64" fn syscall_dispatch(n: u64, a1: u64, a2: u64, a3: u64) -> u64 {
    loop {
        let outcome = with_kernel(|k| {
            debug_assert_eq!(switch::current_stack_owner(), Some(k.procs.current_pid()));
            k.syscall(n, a1, a2, a3)
        });
        match outcome {
            SyscallOutcome::Done(value) => return value as u64,
            SyscallOutcome::Wait(wait) => {
                wait_until(&wait);
                if let Wait::RtcTick { .. } = wait {
                    return 0;
                }
            }
            SyscallOutcome::Execute { save, launch } => {
                // Kembali ke sini saat child halt; nilai = status
                return unsafe { switch::enter_user(save, launch) };
            }
            SyscallOutcome::Restart(launch) => unsafe { switch::jump_to_user(launch) },
            SyscallOutcome::Resume(cont) => unsafe { switch::resume(cont) },
        }
    }
}

/// Tidur dengan interrupt aktif sampai `wait` terpenuhi. Timer tetap
/// bisa memindahkan CPU ke terminal lain selama menunggu.
fn wait_until(wait: &Wait) {
    while !with_kernel(|k| k.wait_ready(wait)) {
        interrupts::enable_and_hlt();
        interrupts::disable();
    }
}
