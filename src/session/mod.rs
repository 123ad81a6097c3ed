//! Session lifecycle
//!
//! ## States
//!
//! - `Unauthenticated`: no credentials
//! - `RegistrationPending`: account created, waiting for the user to log in
//! - `Onboarding`: logged in, questionnaire not yet completed
//! - `Dashboard`: logged in and onboarded
//!
//! The initial state comes from the credential store. Any authorization
//! rejection returns the machine to `Unauthenticated` and clears the store.

mod error;
mod machine;
mod types;

pub use error::{SessionError, NETWORK_ERROR_MESSAGE};
pub use machine::SessionMachine;
pub use types::{
    Credentials, LifecycleKind, LifecycleState, OnboardingPreferences, RegistrationForm, Session,
    UserProfile,
};
