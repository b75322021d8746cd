//! Shell ports for headless use: toasts and navigation go to the log.

use fundline_application::{Navigator, Notifier, Route};
use fundline_domain::{Toast, ToastLevel};
use tracing::{error, info, warn};

/// Notifier that writes toasts to tracing output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Creates a console notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Error => error!(message = %toast.message, "toast"),
            ToastLevel::Warning => warn!(message = %toast.message, "toast"),
            ToastLevel::Success | ToastLevel::Info => info!(message = %toast.message, "toast"),
        }
    }
}

/// Navigator that logs forced navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNavigator;

impl ConsoleNavigator {
    /// Creates a console navigator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::Login => warn!("session ended; sign in again"),
            Route::Dashboard => info!("navigating to dashboard"),
        }
    }
}
