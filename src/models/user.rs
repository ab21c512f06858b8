//! User DTOs for sign-up and login.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// DTO for registering a user.
///
/// An existing `id` replaces the stored row with that id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub id: Option<i32>,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Sign-up form input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Login form input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl SignUp {
    /// Check required fields and password confirmation, then build the DTO.
    pub fn validate(self) -> Result<NewUser> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::validation("All fields are required"));
        }
        if self.password != self.confirm_password {
            return Err(AppError::validation("Passwords do not match"));
        }
        Ok(NewUser {
            id: None,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        })
    }
}

impl LoginRequest {
    /// Both fields are required.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.trim().is_empty() {
            return Err(AppError::validation("All fields are required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sign_up(password: &str, confirm: &str) -> SignUp {
        SignUp {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_sign_up_valid() {
        let user = sign_up("1234", "1234").validate().unwrap();
        assert_eq!(user.name, "Ana");
        assert_eq!(user.email, "ana@x.com");
        assert_eq!(user.password, "1234");
        assert!(user.id.is_none());
    }

    #[test]
    fn test_sign_up_password_mismatch() {
        let err = sign_up("1234", "4321").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("Passwords do not match"));
    }

    #[test]
    fn test_sign_up_blank_field() {
        let mut form = sign_up("1234", "1234");
        form.email = "   ".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_login_request_blank() {
        let request = LoginRequest {
            email: "ana@x.com".to_string(),
            password: String::new(),
        };
        assert_eq!(request.validate().unwrap_err().kind(), ErrorKind::Validation);
    }
}
