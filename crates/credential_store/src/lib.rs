mod error;
mod paths;
mod schema;
mod store;

pub use error::CredentialStoreError;
pub use paths::{credential_path, CREDENTIAL_FILE};
pub use schema::{StoredCredential, CREDENTIAL_VERSION};
pub use store::CredentialStore;
