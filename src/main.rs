#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod kernel {
    use bootloader::{entry_point, BootInfo};
    use core::panic::PanicInfo;
    use trios::sys::{arch, vga};
    use trios::{hlt_loop, kerror, klog};

    entry_point!(kernel_main);

    fn kernel_main(boot_info: &'static BootInfo) -> ! {
        trios::init(boot_info);

        // Root shell di terminal 0; interrupt baru aktif lewat iretq ini
        let launch = match arch::with_kernel(|k| k.start_root_shell()) {
            Ok(launch) => launch,
            Err(e) => panic!("cannot start root shell: {}", e),
        };
        klog!("Entering userspace at {:#X}", launch.entry);
        unsafe { arch::switch::jump_to_user(launch) }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        x86_64::instructions::interrupts::disable();
        if let Some(loc) = info.location() {
            kerror!("PANIC at {}:{}:{}: {}", loc.file(), loc.line(), loc.column(), info.message());
        } else {
            kerror!("PANIC: {}", info.message());
        }
        vga::paint_panic(info);
        hlt_loop();
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("trios is a bare-metal kernel; build it for an x86_64 `target_os = \"none\"` target");
}
