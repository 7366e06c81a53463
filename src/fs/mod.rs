//! Filesystem utilities for tvmode.

pub mod atomic;

pub use atomic::atomic_write_file;
