use test_case::test_case;

use super::*;
use crate::key::HexKeyMode;

fn sql_of(config: &McConfig) -> Vec<String> {
    config
        .directives()
        .iter()
        .map(|d| d.sql().to_string())
        .collect()
}

#[test]
fn test_direct_mode_order_and_key_last() {
    let config = ConfigBuilder::for_cipher(CipherAlgorithm::SqlCipher)
        .set_plaintext_header_size(32)
        .unwrap()
        .set_kdf_iter(64000)
        .unwrap()
        .set_legacy(4)
        .unwrap()
        .with_key("secret")
        .unwrap()
        .with_pragma("foreign_keys", "ON")
        .unwrap()
        .build();

    assert_eq!(
        sql_of(&config),
        vec![
            "PRAGMA cipher = sqlcipher;",
            "PRAGMA legacy = 4;",
            "PRAGMA kdf_iter = 64000;",
            "PRAGMA plaintext_header_size = 32;",
            "PRAGMA key = 'secret';",
            "PRAGMA foreign_keys = ON;",
        ]
    );
}

#[test]
fn test_indirect_mode_statements() {
    let config = ConfigBuilder::for_cipher(CipherAlgorithm::Chacha20)
        .set_kdf_iter(1000)
        .unwrap()
        .use_sql_interface(true)
        .with_key("k")
        .unwrap()
        .build();

    assert_eq!(
        sql_of(&config),
        vec![
            "SELECT sqlite3mc_config('default:cipher', 'chacha20');",
            "SELECT sqlite3mc_config('chacha20', 'default:kdf_iter', 1000);",
            "PRAGMA key = 'k';",
        ]
    );
}

#[test]
fn test_indirect_mode_falls_back_to_engine_default() {
    let config = ConfigBuilder::new()
        .set_legacy(1)
        .unwrap()
        .use_sql_interface(true)
        .build();
    assert_eq!(
        sql_of(&config),
        vec!["SELECT sqlite3mc_config('chacha20', 'default:legacy', 1);"]
    );
}

#[test]
fn test_secret_directive_is_flagged() {
    let config = ConfigBuilder::new().with_key("hunter2").unwrap().build();
    let directives = config.directives();
    assert_eq!(directives.len(), 1);
    assert!(directives[0].is_secret());
    assert!(!format!("{:?}", directives[0]).contains("hunter2"));
    assert!(!format!("{config:?}").contains("hunter2"));
}

#[test_case(CipherAlgorithm::Chacha20, 4, true)]
#[test_case(CipherAlgorithm::Chacha20, 5, false)]
#[test_case(CipherAlgorithm::Aes128Cbc, 1, true)]
#[test_case(CipherAlgorithm::Aes128Cbc, 2, false)]
#[test_case(CipherAlgorithm::Rc4, 0, false)]
fn test_set_legacy_per_cipher(cipher: CipherAlgorithm, legacy: i64, ok: bool) {
    assert_eq!(ConfigBuilder::for_cipher(cipher).set_legacy(legacy).is_ok(), ok);
}

#[test]
fn test_legacy_page_size_1233_rejected() {
    let err = ConfigBuilder::new()
        .set_legacy_page_size(1233)
        .expect_err("not a power of two");
    assert!(matches!(err, Error::NotPowerOfTwo { value: 1233, .. }));
}

#[test]
fn test_set_cipher_revalidates() {
    let builder = ConfigBuilder::new().set_legacy(3).unwrap();
    assert!(matches!(
        builder.clone().set_cipher(CipherAlgorithm::Aes256Cbc),
        Err(Error::InvalidParameter { .. })
    ));
    let builder = ConfigBuilder::new().set_hmac_use(true).unwrap();
    assert!(matches!(
        builder.set_cipher(CipherAlgorithm::Chacha20),
        Err(Error::UnsupportedParameter { .. })
    ));
    assert!(ConfigBuilder::new()
        .set_legacy(3)
        .unwrap()
        .set_cipher(CipherAlgorithm::SqlCipher)
        .is_ok());
}

#[test]
fn test_build_copies_state() {
    let builder = ConfigBuilder::for_cipher(CipherAlgorithm::SqlCipher)
        .set_kdf_iter(1000)
        .unwrap();
    let first = builder.build();
    let builder = builder.set_kdf_iter(2000).unwrap();
    let second = builder.build();
    assert_eq!(first.get(Pragma::KdfIter), Some(1000));
    assert_eq!(second.get(Pragma::KdfIter), Some(2000));
}

#[test]
fn test_typed_setters_write_ordinals() {
    let config = ConfigBuilder::for_cipher(CipherAlgorithm::SqlCipher)
        .set_kdf_algorithm(KdfAlgorithm::Sha512)
        .unwrap()
        .set_hmac_algorithm(HmacAlgorithm::Sha256)
        .unwrap()
        .set_hmac_pgno(HmacPgno::BigEndian)
        .unwrap()
        .set_hmac_salt_mask(0x3a)
        .unwrap()
        .set_hmac_check(false)
        .unwrap()
        .build();
    assert_eq!(config.get(Pragma::KdfAlgorithm), Some(2));
    assert_eq!(config.get(Pragma::HmacAlgorithm), Some(1));
    assert_eq!(config.get(Pragma::HmacPgno), Some(2));
    assert_eq!(config.get(Pragma::HmacSaltMask), Some(58));
    assert_eq!(config.get(Pragma::HmacCheck), Some(0));
}

#[test]
fn test_raw_key_uses_selected_cipher_format() {
    let key = [7u8; 32];
    let config = ConfigBuilder::new().with_raw_unsalted_key(&key).unwrap().build();
    assert!(config.key().unwrap().expose().starts_with("raw:"));

    let config = ConfigBuilder::for_cipher(CipherAlgorithm::SqlCipher)
        .with_raw_unsalted_key(&key)
        .unwrap()
        .build();
    assert!(config.key().unwrap().expose().starts_with("x'"));

    assert!(ConfigBuilder::for_cipher(CipherAlgorithm::Rc4)
        .with_raw_unsalted_key(&key)
        .is_err());
}

#[test]
fn test_set_cipher_rewraps_raw_key() {
    let key = [7u8; 32];
    let config = ConfigBuilder::new()
        .with_raw_unsalted_key(&key)
        .unwrap()
        .set_cipher(CipherAlgorithm::SqlCipher)
        .unwrap()
        .build();
    let expected = format!("x'{}'", "07".repeat(32));
    assert_eq!(config.key().unwrap().expose(), expected);

    let config = ConfigBuilder::for_cipher(CipherAlgorithm::SqlCipher)
        .with_raw_salted_key(&[9u8; 48])
        .unwrap()
        .set_cipher(CipherAlgorithm::Chacha20)
        .unwrap()
        .build();
    assert_eq!(
        config.key().unwrap().expose(),
        format!("raw:{}", "09".repeat(48))
    );
}

#[test_case(CipherAlgorithm::Aes256Cbc)]
#[test_case(CipherAlgorithm::Aes128Cbc)]
#[test_case(CipherAlgorithm::Rc4)]
fn test_set_cipher_refuses_raw_key_without_raw_form(cipher: CipherAlgorithm) {
    let err = ConfigBuilder::new()
        .with_raw_unsalted_key(&[7u8; 32])
        .unwrap()
        .set_cipher(cipher)
        .expect_err("cipher has no raw key form");
    assert!(matches!(
        err,
        Error::UnsupportedParameter {
            parameter: "raw key",
            ..
        }
    ));
}

#[test]
fn test_set_cipher_keeps_textual_keys() {
    let config = ConfigBuilder::new()
        .with_key("raw:not-a-raw-key")
        .unwrap()
        .set_cipher(CipherAlgorithm::Aes256Cbc)
        .unwrap()
        .build();
    assert_eq!(config.key().unwrap().expose(), "raw:not-a-raw-key");
}

const MAX_ITER: i64 = 2_147_483_647;

#[test_case(CipherAlgorithm::Chacha20, Pragma::Legacy, 0, 4)]
#[test_case(CipherAlgorithm::Chacha20, Pragma::HmacCheck, 0, 1)]
#[test_case(CipherAlgorithm::Chacha20, Pragma::LegacyPageSize, 0, 65536)]
#[test_case(CipherAlgorithm::Chacha20, Pragma::KdfIter, 1, MAX_ITER)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::Legacy, 0, 4)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::HmacCheck, 0, 1)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::LegacyPageSize, 0, 65536)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::KdfIter, 1, MAX_ITER)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::FastKdfIter, 1, MAX_ITER)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::HmacUse, 0, 1)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::HmacPgno, 0, 2)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::HmacSaltMask, 0, 255)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::KdfAlgorithm, 0, 2)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::HmacAlgorithm, 0, 2)]
#[test_case(CipherAlgorithm::SqlCipher, Pragma::PlaintextHeaderSize, 0, 96)]
#[test_case(CipherAlgorithm::Rc4, Pragma::Legacy, 1, 1)]
#[test_case(CipherAlgorithm::Rc4, Pragma::HmacCheck, 0, 1)]
#[test_case(CipherAlgorithm::Rc4, Pragma::LegacyPageSize, 0, 65536)]
#[test_case(CipherAlgorithm::Aes128Cbc, Pragma::Legacy, 0, 1)]
#[test_case(CipherAlgorithm::Aes128Cbc, Pragma::HmacCheck, 0, 1)]
#[test_case(CipherAlgorithm::Aes128Cbc, Pragma::LegacyPageSize, 0, 65536)]
#[test_case(CipherAlgorithm::Aes256Cbc, Pragma::Legacy, 0, 1)]
#[test_case(CipherAlgorithm::Aes256Cbc, Pragma::HmacCheck, 0, 1)]
#[test_case(CipherAlgorithm::Aes256Cbc, Pragma::LegacyPageSize, 0, 65536)]
#[test_case(CipherAlgorithm::Aes256Cbc, Pragma::KdfIter, 1, MAX_ITER)]
fn test_setter_boundaries(cipher: CipherAlgorithm, pragma: Pragma, lowest: i64, highest: i64) {
    let builder = ConfigBuilder::for_cipher(cipher);
    assert!(builder.clone().set_param(pragma, lowest).is_ok());
    assert!(builder.clone().set_param(pragma, highest).is_ok());
    assert!(matches!(
        builder.clone().set_param(pragma, lowest - 1),
        Err(Error::InvalidParameter { .. })
    ));
    // Above the highest accepted value: out of range, or misaligned for the
    // plaintext header whose range ends on a non-multiple of 16.
    assert!(builder.set_param(pragma, highest + 1).is_err());
}

#[test_case(CipherAlgorithm::Chacha20, Pragma::FastKdfIter)]
#[test_case(CipherAlgorithm::Chacha20, Pragma::HmacUse)]
#[test_case(CipherAlgorithm::Chacha20, Pragma::PlaintextHeaderSize)]
#[test_case(CipherAlgorithm::Rc4, Pragma::KdfIter)]
#[test_case(CipherAlgorithm::Rc4, Pragma::HmacAlgorithm)]
#[test_case(CipherAlgorithm::Aes128Cbc, Pragma::KdfIter)]
#[test_case(CipherAlgorithm::Aes128Cbc, Pragma::KdfAlgorithm)]
#[test_case(CipherAlgorithm::Aes256Cbc, Pragma::FastKdfIter)]
#[test_case(CipherAlgorithm::Aes256Cbc, Pragma::HmacSaltMask)]
fn test_setter_unsupported(cipher: CipherAlgorithm, pragma: Pragma) {
    assert!(matches!(
        ConfigBuilder::for_cipher(cipher).set_param(pragma, 1),
        Err(Error::UnsupportedParameter { .. })
    ));
}

#[test]
fn test_typed_iteration_setters() {
    let builder = ConfigBuilder::for_cipher(CipherAlgorithm::SqlCipher);
    assert!(builder.clone().set_kdf_iter(1).is_ok());
    assert!(matches!(
        builder.clone().set_kdf_iter(0),
        Err(Error::InvalidParameter { min: 1, .. })
    ));
    assert!(builder.clone().set_fast_kdf_iter(1).is_ok());
    assert!(builder.set_fast_kdf_iter(0).is_err());
    assert!(matches!(
        ConfigBuilder::for_cipher(CipherAlgorithm::Rc4).set_kdf_iter(64000),
        Err(Error::UnsupportedParameter { .. })
    ));
}

#[test]
fn test_hex_key_bytes_mode() {
    let config = ConfigBuilder::new()
        .with_hex_key_bytes(&[0xAB, 0xCD])
        .unwrap()
        .build();
    let key = config.key().unwrap();
    assert_eq!(key.expose(), "abcd");
    assert_eq!(key.mode(), HexKeyMode::Sse);
    assert_eq!(sql_of(&config), vec!["PRAGMA hexkey = 'abcd';"]);
}

#[test]
fn test_with_pragma_rejects_encryption_names() {
    assert!(matches!(
        ConfigBuilder::new().with_pragma("kdf_iter", "10"),
        Err(Error::InvalidProperty { .. })
    ));
}

#[test]
fn test_with_rekeyed_replaces_only_key() {
    let config = crate::config::presets::sqlcipher_v4()
        .with_key("old")
        .unwrap()
        .build();
    let rekeyed = config.with_rekeyed(KeyMaterial::passphrase("new").unwrap());
    assert_eq!(rekeyed.key().unwrap().expose(), "new");
    assert_eq!(config.key().unwrap().expose(), "old");
    assert_eq!(rekeyed.get(Pragma::KdfIter), Some(256_000));
}
