// pubdisk - Public Folder Browser
// Listing, selection and download requests for folders shared by public key

use tracing::Level;

pub mod browser;
pub mod config;
pub mod session;
pub mod transfer;

pub use session::{Action, ActionOutcome, BrowserSession};

/// Install the stderr log subscriber. 0 = warn, 1 = info, 2+ = debug.
/// Calling it twice is harmless.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
