//! Authentication handling for the YouTrack API.
//!
//! This module handles authentication with YouTrack using a permanent
//! token (Bearer auth) and secure token storage via the OS keyring.

use super::error::{ApiError, Result};

/// The keyring service name for LazyTrack tokens.
const KEYRING_SERVICE: &str = "lazytrack";

/// Authentication credentials for YouTrack.
#[derive(Clone)]
pub struct Auth {
    /// The complete "Bearer ..." authorization header value.
    auth_header: String,
}

impl Auth {
    /// Create new authentication credentials from a permanent token.
    pub fn new(token: &str) -> Self {
        Self {
            auth_header: format!("Bearer {}", token),
        }
    }

    /// Create authentication from a profile using the OS keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be retrieved from the keyring.
    pub fn from_keyring(profile_name: &str) -> Result<Self> {
        let token = get_token(profile_name)?;
        Ok(Self::new(&token))
    }

    /// Get the authorization header value for HTTP requests.
    ///
    /// Returns the complete "Bearer ..." header value.
    pub fn header_value(&self) -> &str {
        &self.auth_header
    }
}

// Manual impl so the token never shows up in logs.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth").field("auth_header", &"***").finish()
    }
}

/// Store a permanent token in the OS keyring.
///
/// # Arguments
///
/// * `profile_name` - The profile name to use as the keyring username
/// * `token` - The permanent token to store
///
/// # Errors
///
/// Returns an error if the token cannot be stored in the keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to create keyring entry: {}", e)))?;

    entry
        .set_password(token)
        .map_err(|e| ApiError::Keyring(format!("failed to store token: {}", e)))?;

    Ok(())
}

/// Retrieve a permanent token from the OS keyring.
///
/// # Arguments
///
/// * `profile_name` - The profile name to use as the keyring username
///
/// # Errors
///
/// Returns an error if the token cannot be retrieved from the keyring.
pub fn get_token(profile_name: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .get_password()
        .map_err(|e| ApiError::Keyring(format!("failed to retrieve token: {}", e)))
}

/// Delete a permanent token from the OS keyring.
///
/// # Arguments
///
/// * `profile_name` - The profile name to use as the keyring username
///
/// # Errors
///
/// Returns an error if the token cannot be deleted from the keyring.
pub fn delete_token(profile_name: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .delete_password()
        .map_err(|e| ApiError::Keyring(format!("failed to delete token: {}", e)))?;

    Ok(())
}

/// Check if a token exists in the OS keyring for a profile.
///
/// # Arguments
///
/// * `profile_name` - The profile name to check
///
/// # Returns
///
/// `true` if a token exists, `false` otherwise.
pub fn has_token(profile_name: &str) -> bool {
    get_token(profile_name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_header_value_format() {
        let auth = Auth::new("perm:dXNlcg==.VG9rZW4=.abcdef");
        assert_eq!(
            auth.header_value(),
            "Bearer perm:dXNlcg==.VG9rZW4=.abcdef"
        );
    }

    #[test]
    fn test_auth_does_not_expose_token() {
        let auth = Auth::new("secret_token");
        let debug_output = format!("{:?}", auth);

        // Token should not appear in debug output
        assert!(!debug_output.contains("secret_token"));
    }
}
