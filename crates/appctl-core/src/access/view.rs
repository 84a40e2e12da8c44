//! ============================================================================
//! Access View - Rendering surface driven by the controller
//! ============================================================================

use tracing::debug;

use crate::types::{Banner, DenialNotice};

/// Where the controller shows denials and warnings
pub trait AccessView: Send + Sync {
    /// Replace the app with a blocking notice. Called at most once per controller.
    fn show_denied(&self, notice: &DenialNotice);

    /// Show a non-blocking warning on top of the app
    fn show_banner(&self, banner: &Banner);

    /// Remove a banner previously shown
    fn dismiss_banner(&self, id: u64);
}

/// Terminal rendering for the CLI host
#[derive(Debug, Default)]
pub struct ConsoleView;

impl ConsoleView {
    pub fn new() -> Self {
        Self
    }
}

impl AccessView for ConsoleView {
    fn show_denied(&self, notice: &DenialNotice) {
        println!();
        println!("==================== Access Denied ====================");
        println!("{}", notice.message);
        if notice.retry_offered {
            println!("Restart the app after completing payment to retry.");
        }
        println!("=======================================================");
    }

    fn show_banner(&self, banner: &Banner) {
        println!("[warning] {}", banner.message);
    }

    fn dismiss_banner(&self, id: u64) {
        debug!("Banner {} dismissed", id);
    }
}
