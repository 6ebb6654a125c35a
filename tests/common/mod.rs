#![allow(dead_code)]

use std::collections::HashMap;

use trios::config::{LARGE_PAGE_SIZE, MAX_PROCESSES, PAGE_SIZE};
use trios::sys::fs::rofs::{BLOCK_SIZE, DENTRY_SIZE, DENTRY_START, ELF_MAGIC};
use trios::sys::mem::paging::{DirEntry, PageDirectory, PageTable};
use trios::sys::syscall::SyscallOutcome;
use trios::sys::{Kernel, Machine};

pub const SHELL_ENTRY: u32 = 0x0804_8040;
pub const HELLO_ENTRY: u32 = 0x0804_8100;
pub const FRAME0: &[u8] = b"fish frame zero\n";

/// Tepat 32 karakter, tanpa NUL di dentry
pub const LONG_NAME: &str = "verylargetextwithverylongname.tx";

/// Buffer user di tengah window 128MB..132MB
pub const BUF: u64 = 0x0810_0000;
pub const BUF2: u64 = 0x0820_0000;

/// Hardware palsu: semua memori di Vec, semua efek dicatat
pub struct SimMachine {
    pages:         HashMap<u64, Vec<u8>>,
    regions:       Vec<Vec<u8>>,
    pub installs:  Vec<usize>,
    pub user_page: Vec<Option<u64>>,
    pub eois:      Vec<u8>,
    pub stacks:    Vec<usize>,
    pub cursor:    (usize, usize),
}

impl SimMachine {
    pub fn new() -> Self {
        Self {
            pages:     HashMap::new(),
            regions:   vec![Vec::new(); MAX_PROCESSES + 1],
            installs:  Vec::new(),
            user_page: Vec::new(),
            eois:      Vec::new(),
            stacks:    Vec::new(),
            cursor:    (0, 0),
        }
    }

    /// Pid yang directory-nya terakhir dipasang
    pub fn installed(&self) -> usize {
        *self.installs.last().expect("nothing installed")
    }

    pub fn kernel_stack(&self) -> usize {
        *self.stacks.last().expect("no kernel stack set")
    }

    pub fn page(&mut self, phys: u64) -> &[u8] {
        self.video_page(phys)
    }
}

impl Machine for SimMachine {
    fn install_directory(&mut self, pid: usize, dir: &PageDirectory, _video: &PageTable) {
        self.installs.push(pid);
        let user = match dir.entry(32) {
            DirEntry::UserPage { phys } => Some(phys),
            _ => None,
        };
        self.user_page.push(user);
    }

    fn set_kernel_stack(&mut self, pid: usize) {
        self.stacks.push(pid);
    }

    fn end_of_interrupt(&mut self, irq: u8) {
        self.eois.push(irq);
    }

    fn move_cursor(&mut self, x: usize, y: usize) {
        self.cursor = (x, y);
    }

    fn video_page(&mut self, phys: u64) -> &mut [u8] {
        self.pages.entry(phys).or_insert_with(|| vec![0; PAGE_SIZE])
    }

    fn user_region(&mut self, pid: usize) -> &mut [u8] {
        let region = &mut self.regions[pid];
        if region.is_empty() {
            region.resize(LARGE_PAGE_SIZE, 0);
        }
        region
    }
}

// ---------------------------------------------------------------------------
// Image filesystem
// ---------------------------------------------------------------------------

fn program(entry: u32, size: usize) -> Vec<u8> {
    let mut bytes = vec![0x90u8; size];
    bytes[..4].copy_from_slice(&ELF_MAGIC);
    bytes[4..24].fill(0);
    bytes[24..28].copy_from_slice(&entry.to_le_bytes());
    bytes
}

/// Image berisi: ".", "rtc", "shell", "hello", "ls", "frame0.txt",
/// "bad" (file biasa tanpa magic ELF), dan `LONG_NAME`
pub fn image() -> &'static [u8] {
    let files: Vec<(&str, u32, Vec<u8>)> = vec![
        (".", 1, Vec::new()),
        ("rtc", 0, Vec::new()),
        ("shell", 2, program(SHELL_ENTRY, 300)),
        ("hello", 2, program(HELLO_ENTRY, 5000)),
        ("ls", 2, program(SHELL_ENTRY, 64)),
        ("frame0.txt", 2, FRAME0.to_vec()),
        ("bad", 2, b"#!/bin/sh\necho nope\n".to_vec()),
        (LONG_NAME, 2, b"long".to_vec()),
    ];

    let regular: Vec<usize> = (0..files.len()).filter(|&i| files[i].1 == 2).collect();
    let inode_count = regular.len();
    let blocks_for = |len: usize| (len + BLOCK_SIZE - 1) / BLOCK_SIZE;
    let data_count: usize = regular.iter().map(|&i| blocks_for(files[i].2.len())).sum();

    let mut img = vec![0u8; (1 + inode_count + data_count) * BLOCK_SIZE];
    img[0..4].copy_from_slice(&(files.len() as u32).to_le_bytes());
    img[4..8].copy_from_slice(&(inode_count as u32).to_le_bytes());
    img[8..12].copy_from_slice(&(data_count as u32).to_le_bytes());

    let mut next_block = 0usize;
    for (i, (name, kind, data)) in files.iter().enumerate() {
        let inode = regular.iter().position(|&r| r == i).unwrap_or(0);
        let off = DENTRY_START + i * DENTRY_SIZE;
        img[off..off + name.len()].copy_from_slice(name.as_bytes());
        img[off + 32..off + 36].copy_from_slice(&kind.to_le_bytes());
        img[off + 36..off + 40].copy_from_slice(&(inode as u32).to_le_bytes());

        if *kind != 2 {
            continue;
        }
        let ino = (1 + inode) * BLOCK_SIZE;
        img[ino..ino + 4].copy_from_slice(&(data.len() as u32).to_le_bytes());
        for (slot, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            let at = ino + 4 + slot * 4;
            img[at..at + 4].copy_from_slice(&(next_block as u32).to_le_bytes());
            let start = (1 + inode_count + next_block) * BLOCK_SIZE;
            img[start..start + chunk.len()].copy_from_slice(chunk);
            next_block += 1;
        }
    }
    Vec::leak(img)
}

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

pub type SimKernel = Kernel<SimMachine>;

/// Kernel yang sudah boot dengan root shell (pid 1) di terminal 0
pub fn boot() -> Box<SimKernel> {
    let mut k = Box::new(Kernel::new(SimMachine::new()));
    k.init(image());
    let launch = k.start_root_shell().expect("root shell");
    assert_eq!(launch.entry, SHELL_ENTRY as u64);
    k
}

pub fn syscall(k: &mut SimKernel, n: u64, a1: u64, a2: u64, a3: u64) -> SyscallOutcome {
    k.syscall(n, a1, a2, a3)
}

/// Hasil syscall yang harus selesai langsung
pub fn done(outcome: SyscallOutcome) -> isize {
    match outcome {
        SyscallOutcome::Done(v) => v,
        other => panic!("expected Done, got {:?}", other),
    }
}

/// Tulis string C (dengan NUL) ke memori user proses sekarang
pub fn put_cstr(k: &mut SimKernel, addr: u64, s: &[u8]) {
    let mut bytes = s.to_vec();
    bytes.push(0);
    k.copy_to_user(addr, &bytes).unwrap();
}

pub fn peek(k: &mut SimKernel, addr: u64, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    k.copy_from_user(addr, &mut out).unwrap();
    out
}

/// Karakter baris `y` di halaman video `phys`
pub fn screen_row(k: &mut SimKernel, phys: u64, y: usize) -> Vec<u8> {
    let page = k.machine.page(phys);
    (0..80).map(|x| page[(y * 80 + x) * 2]).collect()
}

/// Ketik baris ke terminal foreground lewat jalur keyboard
pub fn type_line(k: &mut SimKernel, line: &[u8]) {
    use trios::sys::keyboard::KeyAction;
    for &c in line {
        k.key_action(KeyAction::Char(c));
    }
}
