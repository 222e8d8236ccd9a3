pub mod key_store;
pub mod pg;
pub mod signer;

pub use crate::key_store::{InMemoryKeyStore, KeyCipher, KeyStore, KeyStoreError, KeyType};
pub use crate::pg::PgKeyStore;
pub use crate::signer::{PayloadKind, Signer, SignerError, Signing};
