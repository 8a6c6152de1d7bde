//! The unified error handling system for the gateway.

// 1. Core Types
pub use auth::AuthError;
pub use types::GatewayError;

/// A unified `Result` type for the entire application.
///
/// All functions that can fail should return this type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Result type used inside the authentication core.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

// 2. Module declarations
pub mod auth;
pub mod macros;
pub mod types;

// 3. Context Trait for adding context to errors.
pub trait Context<T, E> {
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display;

    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<GatewayError>,
{
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display,
    {
        self.with_context(|| context)
    }

    #[track_caller]
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => {
                let context_message = context().to_string();
                Err(GatewayError::Context {
                    context: context_message,
                    source: Box::new(error.into()),
                })
            }
        }
    }
}
