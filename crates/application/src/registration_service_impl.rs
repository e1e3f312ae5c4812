use std::fmt::Write as _;
use std::sync::Arc;

use domain::common::error::DomainError;
use ports::secondary::registration_store::{Registration, RegistrationStore};
use rand::RngCore;
use tracing::info;

/// Length in bytes of an auto-generated registration token (hex-encoded to
/// twice this many characters).
const TOKEN_BYTES: usize = 16;

/// Pending-enrolment registrations: opaque token → username, persisted
/// outside the data plane.
pub struct RegistrationAppService {
    store: Arc<dyn RegistrationStore>,
}

impl RegistrationAppService {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Registration>, DomainError> {
        self.store.list()
    }

    /// Create a registration. An empty token requests auto-generation.
    pub fn create(&self, username: &str, token: &str) -> Result<Registration, DomainError> {
        if username.is_empty() {
            return Err(DomainError::NotFound("username must not be empty".into()));
        }

        let registration = Registration {
            token: if token.is_empty() {
                generate_token()
            } else {
                token.to_string()
            },
            username: username.to_string(),
        };
        self.store.insert(&registration)?;
        info!(username, "registration created");
        Ok(registration)
    }

    pub fn delete(&self, token: &str) -> Result<(), DomainError> {
        self.store.delete(token)?;
        info!("registration deleted");
        Ok(())
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut token = String::with_capacity(TOKEN_BYTES * 2);
    for byte in bytes {
        let _ = write!(token, "{byte:02x}");
    }
    token
}
