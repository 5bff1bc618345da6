//! Grouped tests for network traffic collection
//!
//! Sampler properties over generated counter sequences, and interface
//! selection across platforms.
