//! RTC: periodic interrupt 1024 Hz, divirtualisasi per proses
//!
//! Hardware selalu jalan di 1024 Hz. Tiap descriptor RTC menyimpan
//! frekuensi virtual; `read` memasang countdown 1024/rate di PCB pemanggil
//! dan setiap interrupt RTC mengurangi countdown semua proses.

use crate::config::RTC_BASE_HZ;
use crate::sys::{Error, Result};

pub const IRQ: u8 = 8;

pub const MIN_RATE: u32 = 2;
pub const MAX_RATE: u32 = 1024;

/// Validasi buffer `write`: tepat 4 byte, power of two di [2, 1024]
pub fn rate_from_bytes(bytes: &[u8]) -> Result<u32> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| Error::InvalidArgument)?;
    let rate = u32::from_le_bytes(raw);
    if rate.is_power_of_two() && (MIN_RATE..=MAX_RATE).contains(&rate) {
        Ok(rate)
    } else {
        Err(Error::InvalidArgument)
    }
}

/// Jumlah tick hardware untuk satu tick virtual
pub fn countdown(rate: u32) -> u32 {
    RTC_BASE_HZ / rate
}

#[cfg(target_os = "none")]
mod hw {
    use bit_field::BitField;
    use x86_64::instructions::port::Port;

    const INDEX: u16 = 0x70;
    const DATA:  u16 = 0x71;

    /// Bit 7 di index port mematikan NMI selama akses
    const NMI_DISABLE: u8 = 0x80;
    const REG_A: u8 = 0x0A;
    const REG_B: u8 = 0x0B;
    const REG_C: u8 = 0x0C;

    /// Rate 6 → 32768 >> 5 = 1024 Hz
    const RATE_1024HZ: u8 = 6;

    fn read(reg: u8) -> u8 {
        unsafe {
            let mut index: Port<u8> = Port::new(INDEX);
            let mut data:  Port<u8> = Port::new(DATA);
            index.write(reg | NMI_DISABLE);
            data.read()
        }
    }

    fn write(reg: u8, value: u8) {
        unsafe {
            let mut index: Port<u8> = Port::new(INDEX);
            let mut data:  Port<u8> = Port::new(DATA);
            index.write(reg | NMI_DISABLE);
            data.write(value);
        }
    }

    pub fn init() {
        let mut b = read(REG_B);
        b.set_bit(6, true); // periodic interrupt enable
        write(REG_B, b);

        let mut a = read(REG_A);
        a.set_bits(0..4, RATE_1024HZ);
        write(REG_A, a);
        klog!("RTC: periodic {} Hz", crate::config::RTC_BASE_HZ);
    }

    /// Baca register C supaya RTC mengirim interrupt berikutnya
    pub fn acknowledge() {
        read(REG_C);
    }
}

#[cfg(target_os = "none")]
pub use hw::{acknowledge, init};
