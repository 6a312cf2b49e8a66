//! Navigation for Lumen
//!
//! Route definitions with auth requirements, a navigation stack, and a
//! [`Navigator`] that redirects based on whether a session exists: guests
//! are kept on the auth screens, authenticated users are kept off them.

use serde::{Deserialize, Serialize};
use tracing::debug;

// =============================================================================
// Route Definitions
// =============================================================================

/// All screens in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Login screen
    Login,
    /// Account creation screen
    Register,
    /// Password reset flow
    ForgotPassword,
    /// Home screen
    Home,
    /// Profile screen
    Profile,
}

impl Default for Route {
    fn default() -> Self {
        Route::Login
    }
}

impl Route {
    /// Get the URL path for this route
    pub fn to_path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::ForgotPassword => "/forgot-password",
            Route::Home => "/",
            Route::Profile => "/profile",
        }
    }

    /// Check if this route requires authentication
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Home | Route::Profile)
    }

    /// Check if this is one of the auth screens
    ///
    /// Authenticated users are redirected away from these.
    pub fn is_auth_screen(&self) -> bool {
        matches!(self, Route::Login | Route::Register | Route::ForgotPassword)
    }

    /// Get a display title for this route
    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Log In",
            Route::Register => "Create Account",
            Route::ForgotPassword => "Reset Password",
            Route::Home => "Home",
            Route::Profile => "Profile",
        }
    }
}

// =============================================================================
// Navigation Stack
// =============================================================================

/// A navigation stack entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    /// The route
    pub route: Route,
    /// Unique key for this entry
    pub key: String,
}

impl StackEntry {
    /// Create a new stack entry
    pub fn new(route: Route) -> Self {
        Self {
            route,
            key: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Screen stack (bottom to top)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationStack {
    entries: Vec<StackEntry>,
}

impl NavigationStack {
    /// Create a new stack with a root route
    pub fn new(root: Route) -> Self {
        Self {
            entries: vec![StackEntry::new(root)],
        }
    }

    /// Push a route onto the stack
    pub fn push(&mut self, route: Route) {
        self.entries.push(StackEntry::new(route));
    }

    /// Pop the top route (returns true if popped, false if at root)
    pub fn pop(&mut self) -> bool {
        if self.entries.len() > 1 {
            self.entries.pop();
            true
        } else {
            false
        }
    }

    /// Replace the top route
    pub fn replace(&mut self, route: Route) {
        if let Some(last) = self.entries.last_mut() {
            *last = StackEntry::new(route);
        }
    }

    /// Throw the whole stack away and start over at `root`
    pub fn reset_to(&mut self, root: Route) {
        self.entries = vec![StackEntry::new(root)];
    }

    /// Get the current (top) route
    pub fn current(&self) -> &Route {
        &self.entries.last().expect("Stack should never be empty").route
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        self.entries.len() > 1
    }

    /// Get stack depth
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Get all entries
    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }
}

// =============================================================================
// Navigator
// =============================================================================

/// Navigation stack plus the auth guard
///
/// The navigator tracks whether a session exists and rewrites navigation
/// targets accordingly: guarded routes bounce guests to [`Route::Login`],
/// and auth screens bounce signed-in users to [`Route::Home`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navigator {
    stack: NavigationStack,
    authenticated: bool,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}

impl Navigator {
    /// Create a navigator rooted at the given route
    pub fn new(root: Route) -> Self {
        Self {
            stack: NavigationStack::new(root),
            authenticated: false,
        }
    }

    /// Update the session flag the guard decides on
    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Where the guard sends a navigation to `route`
    pub fn guard(&self, route: Route) -> Route {
        if route.requires_auth() && !self.authenticated {
            debug!(target_route = ?route, "redirecting guest to login");
            Route::Login
        } else if route.is_auth_screen() && self.authenticated {
            debug!(target_route = ?route, "redirecting signed-in user to home");
            Route::Home
        } else {
            route
        }
    }

    /// Push a route, subject to the guard
    pub fn navigate(&mut self, route: Route) {
        let target = self.guard(route);
        self.stack.push(target);
    }

    /// Replace the top route, subject to the guard
    pub fn replace(&mut self, route: Route) {
        let target = self.guard(route);
        self.stack.replace(target);
    }

    /// Go back one screen (returns false at the root)
    pub fn go_back(&mut self) -> bool {
        self.stack.pop()
    }

    /// Clear the stack and land on `route`, subject to the guard
    ///
    /// This is what session transitions use: login resets to home, session
    /// expiry resets to login, so back navigation cannot cross a session
    /// boundary.
    pub fn reset_to(&mut self, route: Route) {
        let target = self.guard(route);
        self.stack.reset_to(target);
    }

    /// Get the current route
    pub fn current(&self) -> &Route {
        self.stack.current()
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        self.stack.can_go_back()
    }

    /// The underlying stack
    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }
}

// =============================================================================
// Tests
// =============================================================================
