//! Clock: PIT (IRQ 0) untuk scheduler dan RTC (IRQ 8) untuk
//! frekuensi virtual per proses.

pub mod rtc;

#[cfg(target_os = "none")]
use x86_64::instructions::port::Port;

pub const TIMER_IRQ: u8 = 0;

/// Frekuensi dasar PIT (Hz)
const PIT_BASE_HZ: u32 = 1193182;

/// Divisor channel 0 untuk frekuensi `hz`
pub const fn pit_divisor(hz: u32) -> u16 {
    (PIT_BASE_HZ / hz) as u16
}

#[cfg(target_os = "none")]
pub fn init() {
    use crate::config::PIT_HZ;
    use crate::sys::arch::pic;

    // PIT channel 0, mode 3 (square wave), ~100 Hz
    let divisor = pit_divisor(PIT_HZ);
    unsafe {
        let mut cmd: Port<u8> = Port::new(0x43);
        let mut ch0: Port<u8> = Port::new(0x40);
        cmd.write(0x36); // channel 0, lobyte/hibyte, mode 3
        ch0.write((divisor & 0xFF) as u8);
        ch0.write((divisor >> 8) as u8);
    }
    pic::enable_irq(TIMER_IRQ);
    klog!("PIT: {} Hz", PIT_HZ);

    rtc::init();
    pic::enable_irq(rtc::IRQ);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisor_for_100hz() {
        assert_eq!(pit_divisor(100), 11931);
    }
}
