//! Authentication session
//!
//! [`AuthController`] drives sign-in, registration and sign-out and keeps
//! the stored credential consistent with the cached current user.
//! [`AuthState`] is observable through a watch channel.

pub mod controller;
pub mod state;

pub use controller::{AuthController, LoginCredentials, Registration};
pub use state::{AuthFailure, AuthState, AuthStateHandle};
