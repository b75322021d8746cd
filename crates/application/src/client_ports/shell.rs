use fundline_domain::Toast;

/// Screen the shell can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in screen.
    Login,
    /// Landing screen after sign-in.
    Dashboard,
}

/// Port for user-facing toast notifications.
pub trait Notifier: Send + Sync {
    /// Shows one toast.
    fn notify(&self, toast: Toast);
}

/// Port for forced navigation.
pub trait Navigator: Send + Sync {
    /// Navigates to `route`.
    fn navigate(&self, route: Route);
}
