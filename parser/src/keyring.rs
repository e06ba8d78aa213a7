//! Secret key lookup for layer decryption.

use sequoia_openpgp as openpgp;
use openpgp::packet::key::{SecretParts, UnspecifiedRole};
use openpgp::packet::Key;
use openpgp::policy::Policy;
use openpgp::{Cert, KeyID};

/// A decryption key.
pub type SecretKey = Key<SecretParts, UnspecifiedRole>;

/// Looks up secret keys for decrypting remailer layers.
///
/// Implementations are shared between concurrent parses, and must
/// tolerate concurrent lookups.
pub trait KeyRing: Send + Sync {
    /// Returns all keys that may be used to decrypt messages under
    /// `policy`.
    fn decryption_keys(&self, policy: &dyn Policy) -> Vec<SecretKey>;

    /// Returns the decryption keys with the given key ID.
    ///
    /// A wildcard ID, as used by anonymous recipients, matches every
    /// decryption key.
    fn keys_by_id(&self, id: &KeyID, policy: &dyn Policy)
        -> Vec<SecretKey>
    {
        let keys = self.decryption_keys(policy);
        if id.is_wildcard() {
            return keys;
        }
        keys.into_iter().filter(|k| k.keyid() == *id).collect()
    }
}

impl KeyRing for Cert {
    fn decryption_keys(&self, policy: &dyn Policy) -> Vec<SecretKey> {
        self.keys()
            .with_policy(policy, None)
            .for_transport_encryption()
            .for_storage_encryption()
            .secret()
            .map(|ka| ka.key().clone().into())
            .collect()
    }
}

impl KeyRing for [Cert] {
    fn decryption_keys(&self, policy: &dyn Policy) -> Vec<SecretKey> {
        self.iter().flat_map(|cert| cert.decryption_keys(policy)).collect()
    }
}

impl KeyRing for Vec<Cert> {
    fn decryption_keys(&self, policy: &dyn Policy) -> Vec<SecretKey> {
        self.as_slice().decryption_keys(policy)
    }
}

impl<K: KeyRing + ?Sized> KeyRing for &K {
    fn decryption_keys(&self, policy: &dyn Policy) -> Vec<SecretKey> {
        (**self).decryption_keys(policy)
    }

    fn keys_by_id(&self, id: &KeyID, policy: &dyn Policy)
        -> Vec<SecretKey>
    {
        (**self).keys_by_id(id, policy)
    }
}

impl<K: KeyRing + ?Sized> KeyRing for Box<K> {
    fn decryption_keys(&self, policy: &dyn Policy) -> Vec<SecretKey> {
        self.as_ref().decryption_keys(policy)
    }

    fn keys_by_id(&self, id: &KeyID, policy: &dyn Policy)
        -> Vec<SecretKey>
    {
        self.as_ref().keys_by_id(id, policy)
    }
}
