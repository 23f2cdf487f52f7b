//! Principal email resolution
//!
//! Works out which identity string accompanies the access token in the PLAIN
//! payload, and checks it is an identity type the broker accepts.

use std::fmt;

use crate::error::ValidationError;

pub mod impersonation;
pub mod resolver;
pub mod token_info;
pub mod validator;

pub use impersonation::email_from_impersonation_url;
pub use resolver::PrincipalEmailResolver;
pub use token_info::principal_email_from_token_info;
pub use validator::validate_principal_email;

/// A principal email that passed [`validate_principal_email`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrincipalEmail(String);

impl PrincipalEmail {
    pub fn parse(email: impl Into<String>) -> Result<Self, ValidationError> {
        let email = email.into();
        validate_principal_email(&email)?;
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PrincipalEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
