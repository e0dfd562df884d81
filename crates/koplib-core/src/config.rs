//! Centralized configuration for the library builder.
//!
//! Constants for file naming and contention retry budgets. Retry bounds are
//! sized for CI artifact directories shared by many per-architecture build
//! jobs: reads may wait tens of seconds in total, replaces a few seconds.

use std::time::Duration;

/// Library file naming.
pub struct LibraryConfig;

impl LibraryConfig {
    /// Fixed basename of the published library file.
    pub const BASENAME: &'static str = "kernelOpLibrary";
    /// Suffix appended to temporary files written beside the destination.
    pub const TEMP_SUFFIX: &'static str = "tmp";
}

/// Retry budgets for cross-process file contention.
pub struct ContentionConfig;

impl ContentionConfig {
    // Reading an existing library while another process holds it open
    pub const READ_MAX_ATTEMPTS: u32 = 30;
    pub const READ_BASE_DELAY: Duration = Duration::from_millis(25);
    pub const READ_MAX_DELAY: Duration = Duration::from_secs(2);

    // Replacing the destination while another process holds a read handle
    pub const REPLACE_MAX_ATTEMPTS: u32 = 120;
    pub const REPLACE_BASE_DELAY: Duration = Duration::from_millis(50);
    pub const REPLACE_MAX_DELAY: Duration = Duration::from_millis(50);
}
