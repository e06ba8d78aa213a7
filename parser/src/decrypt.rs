//! Removes one encrypted layer.

use std::io::Read;

use sequoia_openpgp as openpgp;
use openpgp::crypto::SessionKey;
use openpgp::packet::{PKESK, SKESK};
use openpgp::parse::stream::{
    DecryptionHelper, DecryptorBuilder, MessageStructure, VerificationHelper,
};
use openpgp::parse::Parse;
use openpgp::policy::Policy;
use openpgp::types::SymmetricAlgorithm;
use openpgp::{Cert, Fingerprint, KeyHandle};

use crate::armor::{self, Block};
use crate::extension::Extensions;
use crate::keyring::KeyRing;
use crate::lines::{Buffer, LineRead};
use crate::{Error, Result};

/// Decrypts with keys from a key ring and ignores signatures.
struct Helper<'a> {
    keyring: &'a dyn KeyRing,
    policy: &'a dyn Policy,
}

impl VerificationHelper for Helper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        Ok(Vec::new())
    }

    fn check(&mut self, _structure: MessageStructure) -> openpgp::Result<()> {
        // The plaintext is used unverified.
        Ok(())
    }
}

impl DecryptionHelper for Helper<'_> {
    fn decrypt<D>(
        &mut self,
        pkesks: &[PKESK],
        _skesks: &[SKESK],
        sym_algo: Option<SymmetricAlgorithm>,
        mut decrypt: D,
    ) -> openpgp::Result<Option<Fingerprint>>
    where
        D: FnMut(SymmetricAlgorithm, &SessionKey) -> bool,
    {
        for pkesk in pkesks {
            let keys = self.keyring.keys_by_id(pkesk.recipient(), self.policy);
            for key in keys {
                let fingerprint = key.fingerprint();
                let mut keypair = match key.into_keypair() {
                    Ok(keypair) => keypair,
                    Err(e) => {
                        log::debug!("skipping key {}: {}", fingerprint, e);
                        continue;
                    }
                };

                if pkesk.decrypt(&mut keypair, sym_algo)
                    .map(|(algo, sk)| decrypt(algo, &sk))
                    .unwrap_or(false)
                {
                    log::debug!("decrypted using {}", fingerprint);
                    return Ok(Some(fingerprint));
                }
            }
        }

        Err(anyhow::anyhow!("No key to decrypt message"))
    }
}

/// Decrypts the armored layer at the start of `source`.
///
/// Returns the (transformed) plaintext, ready to be parsed as the
/// next envelope.
pub(crate) fn decrypt_layer(source: &mut dyn LineRead,
                            keyring: &dyn KeyRing,
                            extensions: &Extensions,
                            policy: &dyn Policy)
    -> Result<Buffer>
{
    let block = Block::decode(source)?;

    let transform = if block.label() == armor::PGP_MESSAGE {
        None
    } else {
        match extensions.resolve(block.label()) {
            Some(t) => Some(t),
            None => return Err(Error::BadArmor(
                format!("unsupported armor type {:?}", block.label())).into()),
        }
    };

    let helper = Helper { keyring, policy };
    let mut decryptor = DecryptorBuilder::from_bytes(block.body())?
        .with_policy(policy, None, helper)?;

    let mut plaintext = Vec::new();
    decryptor.read_to_end(&mut plaintext)?;

    let plaintext = match transform {
        Some(transform) => transform(plaintext)?,
        None => plaintext,
    };

    Ok(Buffer::from(plaintext))
}
