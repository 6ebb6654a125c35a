mod common;

use common::*;
use trios::config::{TERMINAL_STORAGE_PHYS, VIDEO_PHYS, VIDMAP_VIRT};
use trios::sys::keyboard::KeyAction;
use trios::sys::proc::sched::Switch;
use trios::sys::syscall::number::*;
use trios::sys::syscall::{SyscallOutcome, Wait};

fn write(k: &mut SimKernel, bytes: &[u8]) -> isize {
    k.copy_to_user(BUF, bytes).unwrap();
    done(syscall(k, WRITE, 1, BUF, bytes.len() as u64))
}

#[test]
fn write_renders_at_cursor_and_moves_hardware_cursor() {
    let mut k = boot();
    assert_eq!(write(&mut k, b"hi\nthere"), 8);
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 0)[..3], b"hi ");
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 1)[..6], b"there ");
    assert_eq!(k.machine.cursor, (5, 1));
}

#[test]
fn long_write_wraps_lines() {
    let mut k = boot();
    assert_eq!(write(&mut k, &[b'a'; 300]), 300);
    for y in 0..3 {
        assert!(screen_row(&mut k, VIDEO_PHYS, y).iter().all(|&c| c == b'a'));
    }
    assert_eq!(k.machine.cursor, (60, 3));
}

#[test]
fn background_terminal_writes_to_its_storage_page() {
    let mut k = boot();
    k.switch_terminal(1);
    assert_eq!(k.terminals.foreground(), 1);
    let cursor = k.machine.cursor;

    // pid 1 masih current dan milik terminal 0
    assert_eq!(write(&mut k, b"abc"), 3);
    assert_eq!(&screen_row(&mut k, TERMINAL_STORAGE_PHYS[0], 0)[..3], b"abc");
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 0)[..3], b"   ");
    assert_eq!(k.machine.cursor, cursor);

    k.switch_terminal(0);
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 0)[..3], b"abc");
    assert_eq!(k.machine.cursor, (3, 0));
}

#[test]
fn switching_preserves_each_screen() {
    let mut k = boot();
    write(&mut k, b"zero");
    k.switch_terminal(1);
    k.terminal_write(1, b"one");
    k.switch_terminal(2);
    k.terminal_write(2, b"two");

    assert_eq!(&screen_row(&mut k, TERMINAL_STORAGE_PHYS[0], 0)[..4], b"zero");
    assert_eq!(&screen_row(&mut k, TERMINAL_STORAGE_PHYS[1], 0)[..3], b"one");
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 0)[..3], b"two");

    k.switch_terminal(1);
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 0)[..4], b"one ");
    assert_eq!(&screen_row(&mut k, TERMINAL_STORAGE_PHYS[2], 0)[..3], b"two");
}

#[test]
fn switching_spawns_a_shell_once() {
    let mut k = boot();
    k.switch_terminal(1);
    assert_eq!(k.terminals.active_pid(1), Some(2));
    assert_eq!(k.procs.get(2).terminal, 1);
    assert_eq!(k.procs.get(2).parent_id, 0);
    k.switch_terminal(0);
    k.switch_terminal(1);
    assert_eq!(k.terminals.active_pid(1), Some(2));
    assert_eq!(k.procs.active_count(), 2);
}

#[test]
fn invalid_or_current_target_is_ignored() {
    let mut k = boot();
    k.switch_terminal(0);
    k.switch_terminal(3);
    assert_eq!(k.terminals.foreground(), 0);
    assert_eq!(k.procs.active_count(), 1);
}

#[test]
fn switch_without_free_slot_leaves_terminal_empty() {
    let mut k = boot();
    for _ in 0..5 {
        put_cstr(&mut k, BUF, b"shell");
        assert!(matches!(syscall(&mut k, EXECUTE, BUF, 0, 0), SyscallOutcome::Execute { .. }));
    }
    k.key_action(KeyAction::Switch(2));
    assert_eq!(k.terminals.foreground(), 2);
    assert_eq!(k.terminals.active_pid(2), None);
}

#[test]
fn keyboard_echoes_and_feeds_terminal_read() {
    let mut k = boot();
    type_line(&mut k, b"ls\n");
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 0)[..3], b"ls ");
    assert_eq!(k.machine.cursor, (0, 1));

    assert_eq!(done(syscall(&mut k, READ, 0, BUF, 128)), 3);
    assert_eq!(peek(&mut k, BUF, 3), b"ls\n");
}

#[test]
fn terminal_read_blocks_until_newline() {
    let mut k = boot();
    let wait = match syscall(&mut k, READ, 0, BUF, 128) {
        SyscallOutcome::Wait(w) => w,
        other => panic!("read should block, got {:?}", other),
    };
    assert_eq!(wait, Wait::TerminalInput { terminal: 0, count: 128 });
    type_line(&mut k, b"cat");
    assert!(!k.wait_ready(&wait));
    type_line(&mut k, b"\n");
    assert!(k.wait_ready(&wait));
    assert_eq!(done(syscall(&mut k, READ, 0, BUF, 128)), 4);
    assert_eq!(peek(&mut k, BUF, 4), b"cat\n");
}

#[test]
fn short_read_returns_partial_line() {
    let mut k = boot();
    type_line(&mut k, b"abcdef\n");
    assert_eq!(done(syscall(&mut k, READ, 0, BUF, 4)), 4);
    assert_eq!(peek(&mut k, BUF, 4), b"abcd");
    assert_eq!(done(syscall(&mut k, READ, 0, BUF, 128)), 3);
    assert_eq!(peek(&mut k, BUF, 3), b"ef\n");
}

#[test]
fn keyboard_goes_to_foreground_terminal_only() {
    let mut k = boot();
    k.switch_terminal(1);
    type_line(&mut k, b"abc");
    assert_eq!(k.terminals.get(1).pending(), 3);
    assert_eq!(k.terminals.get(0).pending(), 0);
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 0)[..3], b"abc");
    assert_eq!(&screen_row(&mut k, TERMINAL_STORAGE_PHYS[0], 0)[..3], b"   ");
}

#[test]
fn backspace_erases_input_and_screen() {
    let mut k = boot();
    type_line(&mut k, b"ab");
    k.key_action(KeyAction::Backspace);
    assert_eq!(k.terminals.get(0).pending(), 1);
    assert_eq!(&screen_row(&mut k, VIDEO_PHYS, 0)[..2], b"a ");
    assert_eq!(k.machine.cursor, (1, 0));

    k.key_action(KeyAction::Backspace);
    k.key_action(KeyAction::Backspace);
    assert_eq!(k.terminals.get(0).pending(), 0);
    assert_eq!(k.machine.cursor, (0, 0));
}

#[test]
fn clear_blanks_screen_and_homes_cursor() {
    let mut k = boot();
    write(&mut k, b"junk\nmore junk");
    k.key_action(KeyAction::Clear);
    assert!(screen_row(&mut k, VIDEO_PHYS, 0).iter().all(|&c| c == b' '));
    assert!(screen_row(&mut k, VIDEO_PHYS, 1).iter().all(|&c| c == b' '));
    assert_eq!(k.machine.cursor, (0, 0));
}

// ---------------------------------------------------------------------------
// vidmap
// ---------------------------------------------------------------------------

#[test]
fn vidmap_maps_caller_screen_at_256mb() {
    let mut k = boot();
    assert_eq!(done(syscall(&mut k, VIDMAP, BUF, 0, 0)), 0);
    assert_eq!(peek(&mut k, BUF, 8), VIDMAP_VIRT.to_le_bytes());
    assert_eq!(k.paging.video_alias(1), Some(VIDEO_PHYS));
    assert_eq!(k.machine.installed(), 1);
}

#[test]
fn vidmap_rejects_pointers_outside_user_window() {
    let mut k = boot();
    for out in [0, 0x0040_0000, 0x083F_FFFC, VIDMAP_VIRT] {
        assert_eq!(done(syscall(&mut k, VIDMAP, out, 0, 0)), -1, "out {:#x}", out);
    }
    assert_eq!(k.paging.video_alias(1), None);
}

#[test]
fn vidmap_alias_follows_terminal_switches() {
    let mut k = boot();
    assert_eq!(done(syscall(&mut k, VIDMAP, BUF, 0, 0)), 0);

    k.switch_terminal(1);
    assert_eq!(k.paging.video_alias(1), Some(TERMINAL_STORAGE_PHYS[0]));
    // directory proses sekarang dipasang ulang
    assert_eq!(k.machine.installed(), 1);

    // shell terminal 1 jalan dan minta vidmap juga
    assert!(matches!(k.schedule(), Some(Switch::User { .. })));
    assert_eq!(k.procs.current_pid(), 2);
    assert_eq!(done(syscall(&mut k, VIDMAP, BUF, 0, 0)), 0);
    assert_eq!(k.paging.video_alias(2), Some(VIDEO_PHYS));

    k.switch_terminal(0);
    assert_eq!(k.paging.video_alias(1), Some(VIDEO_PHYS));
    assert_eq!(k.paging.video_alias(2), Some(TERMINAL_STORAGE_PHYS[1]));
}

#[test]
fn halt_drops_vidmap_alias() {
    let mut k = boot();
    put_cstr(&mut k, BUF, b"hello");
    assert!(matches!(syscall(&mut k, EXECUTE, BUF, 0, 0), SyscallOutcome::Execute { .. }));
    assert_eq!(done(syscall(&mut k, VIDMAP, BUF, 0, 0)), 0);
    assert_eq!(k.paging.video_alias(2), Some(VIDEO_PHYS));
    assert!(matches!(syscall(&mut k, HALT, 0, 0, 0), SyscallOutcome::Resume(_)));
    assert_eq!(k.paging.video_alias(2), None);
}
