//! Integration tests for mirroring a non-consuming permit onto a pipe fd.

#![cfg(unix)]

use permit_sync::associate::FdAssociation;
use permit_sync::NonConsumingPermit;
use std::os::unix::io::RawFd;
use std::sync::Arc;

fn pipe() -> (RawFd, RawFd) {
    let mut fds = [0i32; 2];
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(rc, 0);
    (fds[0], fds[1])
}

fn readable(fd: RawFd) -> bool {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    unsafe { libc::poll(&mut pfd, 1, 0) > 0 && pfd.revents & libc::POLLIN != 0 }
}

#[test]
fn grant_makes_the_read_end_readable() {
    let (read_fd, write_fd) = pipe();
    let permit = Arc::new(NonConsumingPermit::new(false));
    let _assoc = FdAssociation::new(permit.clone(), [read_fd, write_fd]).unwrap();

    assert!(!readable(read_fd));
    permit.grant().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(readable(read_fd));

    unsafe {
        libc::close(read_fd);
        libc::close(write_fd);
    }
}

#[test]
fn revoke_drains_the_pipe() {
    let (read_fd, write_fd) = pipe();
    let permit = Arc::new(NonConsumingPermit::new(false));
    let _assoc = FdAssociation::new(permit.clone(), [read_fd, write_fd]).unwrap();

    permit.grant().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(readable(read_fd));

    permit.revoke();
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(!readable(read_fd));

    unsafe {
        libc::close(read_fd);
        libc::close(write_fd);
    }
}

#[test]
fn dropping_the_association_stops_mirroring() {
    let (read_fd, write_fd) = pipe();
    let permit = Arc::new(NonConsumingPermit::new(false));
    let assoc = FdAssociation::new(permit.clone(), [read_fd, write_fd]).unwrap();
    drop(assoc);

    permit.grant().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(!readable(read_fd));

    unsafe {
        libc::close(read_fd);
        libc::close(write_fd);
    }
}
