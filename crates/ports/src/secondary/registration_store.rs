use domain::common::error::DomainError;

/// A pending enrolment registration: an opaque token a new device presents
/// once, mapped to the username it will enrol under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub token: String,
    pub username: String,
}

/// Secondary port for the registration store. Persisted outside the data
/// plane; tokens survive agent restarts.
pub trait RegistrationStore: Send + Sync {
    /// All pending registrations, in unspecified order.
    fn list(&self) -> Result<Vec<Registration>, DomainError>;

    /// Insert a registration. Fails on a duplicate token.
    fn insert(&self, registration: &Registration) -> Result<(), DomainError>;

    /// Delete by token. Fails with `NotFound` when the token is absent.
    fn delete(&self, token: &str) -> Result<(), DomainError>;
}
