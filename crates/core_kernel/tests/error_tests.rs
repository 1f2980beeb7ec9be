//! Tests for the port error type

use core_kernel::PortError;

#[test]
fn test_port_error_classification() {
    assert!(PortError::not_found("Client", "CLI-1").is_not_found());
    assert!(PortError::conflict("duplicate relation").is_conflict());
    assert!(!PortError::validation("bad id").is_conflict());
}

#[test]
fn test_port_error_keeps_source() {
    use std::error::Error;

    let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
    let error = PortError::internal_with_source("list clients failed", io);
    assert!(error.source().is_some());
    assert!(error.to_string().contains("list clients failed"));
}

#[test]
fn test_port_error_not_found_message() {
    let error = PortError::not_found("Deposit", "DEP-7");
    assert_eq!(error.to_string(), "Not found: Deposit with id DEP-7");
}
