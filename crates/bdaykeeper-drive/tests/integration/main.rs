//! Integration tests for bdaykeeper-drive
//!
//! Uses wiremock to simulate the Google Drive and OAuth token endpoints and
//! verifies listing, pagination, downloads, error classification and token
//! refresh end to end.

mod common;

mod test_auth;
mod test_download;
mod test_errors;
mod test_listing;
