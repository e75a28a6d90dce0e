//! Shared constants for end-to-end tests
//!
//! When seeded test data changes, update only this file.

// ============================================================================
// Test Users
// ============================================================================

/// Email of the user most tests act as
pub const TEST_USER_EMAIL: &str = "listener@example.com";

/// Email of a second user, used to check owner scoping
pub const OTHER_USER_EMAIL: &str = "neighbour@example.com";

// ============================================================================
// Preset Tags
// ============================================================================

/// Preset tags seeded in every test database, as (category, name)
pub const PRESET_TAGS: &[(&str, &str)] = &[
    ("mood", "calm"),
    ("mood", "energetic"),
    ("activity", "running"),
];

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Default timeout for HTTP requests in tests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Page size cap configured on the test server
pub const TEST_MAX_PAGE_SIZE: usize = 5;
