use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// The size of the random salt in bytes.
const SALT_SIZE: usize = 16;
/// The number of PBKDF2 iterations.
const PBKDF2_ITERATIONS: u32 = 100_000;
/// The size of the derived key in bytes.
const DERIVED_KEY_SIZE: usize = 64;
/// Separates the salt from the derived key in a stored hash.
const SEPARATOR: char = ':';

fn derive_key(password: &str, salt_hex: &str) -> Zeroizing<[u8; DERIVED_KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; DERIVED_KEY_SIZE]);
    // The hex text of the salt is the PBKDF2 salt input, matching hashes already on disk.
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt_hex.as_bytes(), PBKDF2_ITERATIONS, &mut key[..]);
    key
}

/// Hashes a password with PBKDF2-HMAC-SHA256 and a fresh random salt.
///
/// # Returns
///
/// The stored form `saltHex:derivedKeyHex`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);

    let key = derive_key(password, &salt_hex);
    tracing::debug!("Password hashed with PBKDF2");
    format!("{}{}{}", salt_hex, SEPARATOR, hex::encode(&key[..]))
}

/// Verifies a password against a stored `salt:key` hash.
///
/// Malformed stored values never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, key_hex)) = stored.split_once(SEPARATOR) else {
        tracing::warn!("Stored password hash has no separator");
        return false;
    };

    let expected = match hex::decode(key_hex) {
        Ok(bytes) if bytes.len() == DERIVED_KEY_SIZE => Zeroizing::new(bytes),
        _ => {
            tracing::warn!("Stored password hash has an invalid key");
            return false;
        }
    };

    let candidate = derive_key(password, salt_hex);
    candidate[..].ct_eq(&expected[..]).into()
}
