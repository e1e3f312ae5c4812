mod redb_registration_store;

pub use redb_registration_store::RedbRegistrationStore;
