//! Nomor syscall (int 0x80, nomor di rax)

pub const HALT:        u64 = 0x01;
pub const EXECUTE:     u64 = 0x02;
pub const READ:        u64 = 0x03;
pub const WRITE:       u64 = 0x04;
pub const OPEN:        u64 = 0x05;
pub const CLOSE:       u64 = 0x06;
pub const GETARGS:     u64 = 0x07;
pub const VIDMAP:      u64 = 0x08;
pub const SET_HANDLER: u64 = 0x09;
pub const SIGRETURN:   u64 = 0x0A;
