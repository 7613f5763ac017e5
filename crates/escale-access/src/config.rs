//! Access-layer configuration.

/// Configuration for the directory and workflow services.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Optional pepper prepended to passwords before Argon2id
    /// hashing/verification.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            pepper: None,
            min_password_length: 12,
        }
    }
}
