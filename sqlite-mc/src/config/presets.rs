//! Builders pre-loaded with the parameter tuples of known on-disk formats.
//!
//! A database can only be read with the tuple it was created with, so these
//! literals are a compatibility contract. Each function returns a builder so
//! the caller can add key material (and further settings) before building.

use crate::cipher::CipherAlgorithm;
use crate::pragma::Pragma;

use super::ConfigBuilder;

/// `SQLCipher` HMAC salt mask (`0x3a`).
const SQLCIPHER_SALT_MASK: i64 = 0x3a;

/// ChaCha20-Poly1305 with the engine's default tuple.
#[must_use]
pub fn chacha20_default() -> ConfigBuilder {
    ConfigBuilder::from_preset(
        CipherAlgorithm::Chacha20,
        &[
            (Pragma::KdfIter, 64007),
            (Pragma::Legacy, 0),
            (Pragma::LegacyPageSize, 4096),
        ],
    )
}

/// `ChaCha20` as written by the original sqleet library.
#[must_use]
pub fn chacha20_sqlleet() -> ConfigBuilder {
    ConfigBuilder::from_preset(
        CipherAlgorithm::Chacha20,
        &[
            (Pragma::KdfIter, 12345),
            (Pragma::Legacy, 1),
            (Pragma::LegacyPageSize, 4096),
        ],
    )
}

/// `SQLCipher` with whatever the engine considers current.
#[must_use]
pub fn sqlcipher_default() -> ConfigBuilder {
    ConfigBuilder::from_preset(CipherAlgorithm::SqlCipher, &[])
}

/// `SQLCipher` 1.x: SHA1 KDF, no HMAC, 1024 byte pages.
#[must_use]
pub fn sqlcipher_v1() -> ConfigBuilder {
    ConfigBuilder::from_preset(
        CipherAlgorithm::SqlCipher,
        &[
            (Pragma::KdfIter, 4000),
            (Pragma::FastKdfIter, 2),
            (Pragma::HmacUse, 0),
            (Pragma::Legacy, 1),
            (Pragma::LegacyPageSize, 1024),
            (Pragma::KdfAlgorithm, 0),
            (Pragma::HmacAlgorithm, 0),
        ],
    )
}

/// `SQLCipher` 2.x: SHA1 HMAC over little-endian page numbers.
#[must_use]
pub fn sqlcipher_v2() -> ConfigBuilder {
    ConfigBuilder::from_preset(CipherAlgorithm::SqlCipher, &sqlcipher_hmac_tuple(4000, 2))
}

/// `SQLCipher` 3.x: as 2.x with 64000 KDF iterations.
#[must_use]
pub fn sqlcipher_v3() -> ConfigBuilder {
    ConfigBuilder::from_preset(CipherAlgorithm::SqlCipher, &sqlcipher_hmac_tuple(64000, 3))
}

/// `SQLCipher` 4.x: SHA512 KDF and HMAC, 4096 byte pages.
#[must_use]
pub fn sqlcipher_v4() -> ConfigBuilder {
    ConfigBuilder::from_preset(
        CipherAlgorithm::SqlCipher,
        &[
            (Pragma::KdfIter, 256_000),
            (Pragma::FastKdfIter, 2),
            (Pragma::HmacUse, 1),
            (Pragma::HmacPgno, 1),
            (Pragma::HmacSaltMask, SQLCIPHER_SALT_MASK),
            (Pragma::Legacy, 4),
            (Pragma::LegacyPageSize, 4096),
            (Pragma::KdfAlgorithm, 2),
            (Pragma::HmacAlgorithm, 2),
            (Pragma::PlaintextHeaderSize, 0),
        ],
    )
}

const fn sqlcipher_hmac_tuple(kdf_iter: i64, legacy: i64) -> [(Pragma, i64); 9] {
    [
        (Pragma::KdfIter, kdf_iter),
        (Pragma::FastKdfIter, 2),
        (Pragma::HmacUse, 1),
        (Pragma::HmacPgno, 1),
        (Pragma::HmacSaltMask, SQLCIPHER_SALT_MASK),
        (Pragma::Legacy, legacy),
        (Pragma::LegacyPageSize, 1024),
        (Pragma::KdfAlgorithm, 0),
        (Pragma::HmacAlgorithm, 0),
    ]
}

/// RC4 (System.Data.SQLite compatible).
#[must_use]
pub fn rc4_default() -> ConfigBuilder {
    ConfigBuilder::from_preset(
        CipherAlgorithm::Rc4,
        &[(Pragma::Legacy, 1), (Pragma::LegacyPageSize, 0)],
    )
}

/// wxSQLite3 AES-128-CBC.
#[must_use]
pub fn aes128cbc_default() -> ConfigBuilder {
    ConfigBuilder::from_preset(
        CipherAlgorithm::Aes128Cbc,
        &[(Pragma::Legacy, 0), (Pragma::LegacyPageSize, 0)],
    )
}

/// wxSQLite3 AES-256-CBC.
#[must_use]
pub fn aes256cbc_default() -> ConfigBuilder {
    ConfigBuilder::from_preset(
        CipherAlgorithm::Aes256Cbc,
        &[
            (Pragma::Legacy, 0),
            (Pragma::LegacyPageSize, 0),
            (Pragma::KdfIter, 4001),
        ],
    )
}

/// The default preset of `cipher`.
#[must_use]
pub fn defaults_for(cipher: CipherAlgorithm) -> ConfigBuilder {
    match cipher {
        CipherAlgorithm::SqlCipher => sqlcipher_default(),
        CipherAlgorithm::Rc4 => rc4_default(),
        CipherAlgorithm::Chacha20 => chacha20_default(),
        CipherAlgorithm::Aes128Cbc => aes128cbc_default(),
        CipherAlgorithm::Aes256Cbc => aes256cbc_default(),
    }
}

/// Every preset with a stable name, for listing.
#[must_use]
pub fn all() -> Vec<(&'static str, ConfigBuilder)> {
    vec![
        ("chacha20", chacha20_default()),
        ("chacha20-sqlleet", chacha20_sqlleet()),
        ("sqlcipher", sqlcipher_default()),
        ("sqlcipher-v1", sqlcipher_v1()),
        ("sqlcipher-v2", sqlcipher_v2()),
        ("sqlcipher-v3", sqlcipher_v3()),
        ("sqlcipher-v4", sqlcipher_v4()),
        ("rc4", rc4_default()),
        ("aes128cbc", aes128cbc_default()),
        ("aes256cbc", aes256cbc_default()),
    ]
}

/// Looks a preset up by the name used in [`all`].
#[must_use]
pub fn by_name(name: &str) -> Option<ConfigBuilder> {
    all()
        .into_iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, builder)| builder)
}
