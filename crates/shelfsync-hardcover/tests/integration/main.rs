//! Integration tests for shelfsync-hardcover
//!
//! Uses wiremock to simulate the Hardcover GraphQL API and verifies
//! end-to-end behavior of `HardcoverClient`.

mod common;

mod test_user_info;
