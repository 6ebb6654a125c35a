//! Switch: primitive context switch
//!
//! Semua fungsi di sini naked supaya kontrol stack 100% manual.
//! Konteks tersimpan (`KernelContext`) hanya RSP, RBP, dan alamat
//! resume; rbx dan r12-r15 di-push ke stack sebelum RSP disimpan,
//! dan di-pop lagi di label resume. Layout KernelContext:
//!   rsp = 0, rbp = 8, rip = 16
//!
//! Jangan dipanggil dari dalam `with_kernel`: lock kernel harus sudah
//! dilepas sebelum stack berganti.

use super::gdt;
use crate::config::{KERNEL_STACK_SIZE, MAX_PROCESSES};
use crate::sys::proc::exec::{Continuation, Launch};
use crate::sys::proc::process::{self, KernelContext};
use core::ptr::addr_of;
use x86_64::VirtAddr;

// ---------------------------------------------------------------------------
// Stack kernel per proses
// ---------------------------------------------------------------------------

const _: () = assert!(core::mem::size_of::<KernelContext>() == 24);

#[repr(C, align(32768))]
struct KernelStack([u8; KERNEL_STACK_SIZE]);

static mut KERNEL_STACKS: [KernelStack; MAX_PROCESSES] =
    [const { KernelStack([0; KERNEL_STACK_SIZE]) }; MAX_PROCESSES];

fn stacks_base() -> u64 {
    unsafe { addr_of!(KERNEL_STACKS) as u64 }
}

/// Puncak stack kernel proses `pid` (dipasang ke TSS.RSP0)
pub fn stack_top(pid: usize) -> VirtAddr {
    VirtAddr::new(stacks_base() + (pid * KERNEL_STACK_SIZE) as u64)
}

/// Proses pemilik stack yang sedang dipakai CPU
pub fn current_stack_owner() -> Option<usize> {
    let rsp: u64;
    unsafe {
        core::arch::asm!("mov {}, rsp", out(reg) rsp, options(nomem, nostack, preserves_flags));
    }
    process::stack_owner(stacks_base(), KERNEL_STACK_SIZE as u64, rsp)
}

// ---------------------------------------------------------------------------
// Raw primitives
// ---------------------------------------------------------------------------

/// Simpan konteks ke `save`, lalu iretq ke ring 3.
/// Argumen (System V AMD64 ABI):
///   rdi = save, rsi = entry, rdx = user_sp, rcx = CS, r8 = SS
/// "Return" hanya saat seseorang melanjutkan `save`; rax = nilai kiriman.
#[unsafe(naked)]
unsafe extern "sysv64" fn enter_user_raw(
    save:    *mut KernelContext,
    entry:   u64,
    user_sp: u64,
    u_code:  u64,
    u_data:  u64,
) -> u64 {
    core::arch::naked_asm!(
        "push rbx",
        "push rbp",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov [rdi + 8], rbp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 16], rax",
        // Data segment userspace
        "mov ds, r8w",
        "mov es, r8w",
        // Build iretq frame
        "push r8",        // SS
        "push rdx",       // RSP userspace
        "push 0x202",     // RFLAGS (IF=1)
        "push rcx",       // CS
        "push rsi",       // RIP = entry
        "xor eax, eax",
        "xor ebx, ebx",
        "xor ecx, ecx",
        "xor edx, edx",
        "xor esi, esi",
        "xor edi, edi",
        "xor ebp, ebp",
        "xor r8d, r8d",
        "xor r9d, r9d",
        "xor r10d, r10d",
        "xor r11d, r11d",
        "xor r12d, r12d",
        "xor r13d, r13d",
        "xor r14d, r14d",
        "xor r15d, r15d",
        "iretq",
        "2:",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbp",
        "pop rbx",
        "ret",
    );
}

/// Simpan konteks ke `save`, lanjutkan `next` dengan rax = 0.
#[unsafe(naked)]
pub unsafe extern "sysv64" fn switch_kernel(save: *mut KernelContext, next: *const KernelContext) {
    core::arch::naked_asm!(
        "push rbx",
        "push rbp",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov [rdi + 8], rbp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 16], rax",
        "mov rcx, [rsi + 16]",
        "mov rbp, [rsi + 8]",
        "mov rsp, [rsi]",
        "xor eax, eax",
        "jmp rcx",
        "2:",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbp",
        "pop rbx",
        "ret",
    );
}

/// Lanjutkan `ctx` dengan rax = `value`. Stack pemanggil ditinggalkan.
#[unsafe(naked)]
unsafe extern "sysv64" fn resume_raw(ctx: *const KernelContext, value: u64) -> ! {
    core::arch::naked_asm!(
        "mov rax, rsi",
        "mov rcx, [rdi + 16]",
        "mov rbp, [rdi + 8]",
        "mov rsp, [rdi]",
        "jmp rcx",
    );
}

/// iretq ke ring 3 tanpa menyimpan apa pun
#[unsafe(naked)]
unsafe extern "sysv64" fn jump_to_userspace(
    entry:     u64,  // rdi
    stack_top: u64,  // rsi
    u_code:    u64,  // rdx
    u_data:    u64,  // rcx
) -> ! {
    core::arch::naked_asm!(
        "mov ds, cx",
        "mov es, cx",
        "push rcx",       // SS
        "push rsi",       // RSP userspace
        "push 0x202",     // RFLAGS
        "push rdx",       // CS
        "push rdi",       // RIP = entry
        "xor eax, eax",
        "xor ebx, ebx",
        "xor ecx, ecx",
        "xor edx, edx",
        "xor esi, esi",
        "xor edi, edi",
        "xor ebp, ebp",
        "xor r8d, r8d",
        "xor r9d, r9d",
        "xor r10d, r10d",
        "xor r11d, r11d",
        "xor r12d, r12d",
        "xor r13d, r13d",
        "xor r14d, r14d",
        "xor r15d, r15d",
        "iretq",
    );
}

// ---------------------------------------------------------------------------
// Wrapper
// ---------------------------------------------------------------------------

/// Masuk ring 3 di `launch`, simpan titik resume ke `save`. Return value
/// adalah nilai yang dikirim oleh `resume` (status halt) atau 0 dari
/// `switch_kernel`.
pub unsafe fn enter_user(save: *mut KernelContext, launch: Launch) -> u64 {
    let (cs, ss) = gdt::user_selectors();
    enter_user_raw(save, launch.entry, launch.user_sp, cs, ss)
}

/// Trampoline halt: lompat ke konteks parent, `execute` parent
/// "return" dengan status
pub unsafe fn resume(cont: Continuation) -> ! {
    resume_raw(&cont.context, cont.status)
}

pub unsafe fn jump_to_user(launch: Launch) -> ! {
    let (cs, ss) = gdt::user_selectors();
    jump_to_userspace(launch.entry, launch.user_sp, cs, ss)
}
