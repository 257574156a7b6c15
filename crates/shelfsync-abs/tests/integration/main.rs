//! Integration tests for shelfsync-abs
//!
//! Uses wiremock to simulate an Audiobookshelf server and verifies
//! end-to-end behavior of `AbsClient`.

mod common;

mod test_libraries;
mod test_progress;
mod test_listening_sessions;
