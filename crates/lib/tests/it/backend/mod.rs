//! InMemory engine tests that need a real filesystem.

mod persistence;
