//! PIC: Programmable Interrupt Controller (Intel 8259)
//!
//! Mengelola dua PIC yang dirangkai (master + slave) untuk
//! menangani 16 IRQ hardware eksternal. Semua line dimulai termask;
//! driver meng-unmask line miliknya lewat `enable_irq`.

use pic8259::ChainedPics;
use spin::Mutex;
use x86_64::instructions::interrupts;
use x86_64::instructions::port::Port;

/// Offset IRQ di IDT (IRQ 0-7 → vektor 32-39, IRQ 8-15 → vektor 40-47)
pub const PIC_MASTER_OFFSET: u8 = 32;
pub const PIC_SLAVE_OFFSET:  u8 = PIC_MASTER_OFFSET + 8;

const MASTER_DATA: u16 = 0x21;
const SLAVE_DATA:  u16 = 0xA1;

/// Line master tempat slave dirangkai
const CASCADE_IRQ: u8 = 2;

/// Instance PIC global
pub static PICS: Mutex<ChainedPics> = Mutex::new(unsafe {
    ChainedPics::new(PIC_MASTER_OFFSET, PIC_SLAVE_OFFSET)
});

/// Mask [master, slave]; bit 1 = line dimatikan
static MASKS: Mutex<[u8; 2]> = Mutex::new([0xFF, 0xFF]);

fn write_masks(masks: &[u8; 2]) {
    unsafe {
        Port::<u8>::new(MASTER_DATA).write(masks[0]);
        Port::<u8>::new(SLAVE_DATA).write(masks[1]);
    }
}

/// Inisialisasi PIC dengan semua line termask
pub fn init() {
    unsafe {
        PICS.lock().initialize();
    }
    write_masks(&MASKS.lock());
    klog!("PIC: remapped to {}/{}", PIC_MASTER_OFFSET, PIC_SLAVE_OFFSET);
}

pub fn enable_irq(irq: u8) {
    interrupts::without_interrupts(|| {
        let mut masks = MASKS.lock();
        if irq < 8 {
            masks[0] &= !(1 << irq);
        } else {
            masks[1] &= !(1 << (irq - 8));
            masks[0] &= !(1 << CASCADE_IRQ);
        }
        write_masks(&masks);
    });
}

pub fn end_of_interrupt(irq: u8) {
    unsafe {
        PICS.lock().notify_end_of_interrupt(irq_vector(irq));
    }
}

/// Konversi nomor IRQ ke vektor IDT
pub fn irq_vector(irq: u8) -> u8 {
    PIC_MASTER_OFFSET + irq
}
