//! Shared constants for test infrastructure

pub const BINARY: &str = "klaudiush";
pub const FORMULA: &str = "smykla-labs/tap/klaudiush";

// Version constants
pub const VERSION_1_13_0: &str = "1.13.0";
pub const VERSION_1_13_1: &str = "1.13.1";

// Tag constants (with 'v' prefix)
pub const TAG_V1_13_0: &str = "v1.13.0";
pub const TAG_V1_13_1: &str = "v1.13.1";

/// Archive name of `TAG_V1_13_1` for the linux/amd64 test platform
pub const ARCHIVE_LINUX_AMD64: &str = "klaudiush_1.13.1_linux_amd64.tar.gz";
pub const CHECKSUMS_FILE: &str = "checksums.txt";

// Binary content for testing
pub const OLD_BINARY_CONTENT: &[u8] = b"#!/bin/sh\necho klaudiush 1.13.0\n";
pub const NEW_BINARY_CONTENT: &[u8] = b"#!/bin/sh\necho klaudiush 1.13.1\n";

pub const WRONG_CHECKSUM: &str = "0000000000000000000000000000000000000000000000000000000000000000";
