//! User interface logic for Lumen
//!
//! This crate holds the logic behind the screens: route definitions with
//! auth guards, the navigation stack, form validation for the auth screens,
//! and profile presentation. Rendering is left to the platform shell.
//!
//! # Modules
//!
//! - [`navigation`] - Routes, the navigation stack, and the auth guard
//! - [`forms`] - Validation for the login, register, and reset screens
//! - [`profile`] - Profile screen presentation
//!
//! # Example
//!
//! ```rust
//! use app_ui::{Navigator, Route};
//!
//! let mut nav = Navigator::new(Route::Login);
//! nav.set_authenticated(true);
//! nav.navigate(Route::Profile);
//! assert_eq!(*nav.current(), Route::Profile);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod forms;
pub mod navigation;
pub mod profile;

// Re-export commonly used types
pub use forms::{
    ForgotPasswordFlow, FormError, LoginForm, RegisterForm, ResetStep, CODE_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use navigation::{NavigationStack, Navigator, Route, StackEntry};
pub use profile::{profile_greeting, ProfileView};
