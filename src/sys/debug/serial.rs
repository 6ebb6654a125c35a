//! Serial: COM1 (UART 16550) untuk log kernel

use core::fmt::{self, Write};
use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;
use x86_64::instructions::interrupts;

const COM1: u16 = 0x3F8;

lazy_static! {
    static ref SERIAL: Mutex<SerialPort> = {
        let mut port = unsafe { SerialPort::new(COM1) };
        port.init();
        Mutex::new(port)
    };
}

pub fn init() {
    lazy_static::initialize(&SERIAL);
}

/// Tulis ke COM1 dengan interrupt mati, supaya IRQ yang ikut log
/// tidak deadlock di lock port
pub fn print(args: fmt::Arguments) {
    interrupts::without_interrupts(|| {
        SERIAL.lock().write_fmt(args).ok();
    });
}
