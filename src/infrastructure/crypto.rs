// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::RepositoryError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use std::fmt;

/// 密文前缀，带版本号以便将来更换算法
const CIPHERTEXT_PREFIX: &str = "enc:v1:";
const NONCE_LEN: usize = 12;

/// 密钥加密器
///
/// 使用 AES-256-GCM 加密存储中的密钥原文。加密密钥由配置的口令经 SHA-256 派生，
/// 每次加密使用随机 nonce，密文格式为 `enc:v1:` + base64(nonce || ciphertext)。
#[derive(Clone)]
pub struct KeyCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for KeyCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyCipher(<redacted>)")
    }
}

impl KeyCipher {
    /// 由口令派生加密密钥
    pub fn from_passphrase(passphrase: &str) -> Result<Self, RepositoryError> {
        if passphrase.trim().is_empty() {
            return Err(RepositoryError::InvalidParameter(
                "encryption passphrase must not be empty".to_string(),
            ));
        }
        let digest = Sha256::digest(passphrase.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&digest)
            .map_err(|e| RepositoryError::InternalError(format!("invalid cipher key: {}", e)))?;
        Ok(Self { cipher })
    }

    /// 加密密钥原文
    pub fn encrypt(&self, plaintext: &str) -> Result<String, RepositoryError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| RepositoryError::InternalError("failed to encrypt key".to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(format!("{}{}", CIPHERTEXT_PREFIX, BASE64.encode(payload)))
    }

    /// 解密存储中的值
    ///
    /// 不带密文前缀的值按明文处理，兼容加密启用前写入的记录
    pub fn decrypt(&self, stored: &str) -> Result<String, RepositoryError> {
        let Some(encoded) = stored.strip_prefix(CIPHERTEXT_PREFIX) else {
            return Ok(stored.to_string());
        };
        let payload = BASE64
            .decode(encoded)
            .map_err(|e| RepositoryError::InternalError(format!("malformed key ciphertext: {}", e)))?;
        if payload.len() <= NONCE_LEN {
            return Err(RepositoryError::InternalError(
                "malformed key ciphertext: too short".to_string(),
            ));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                RepositoryError::InternalError(
                    "failed to decrypt key, check credentials.encryption_key".to_string(),
                )
            })?;
        String::from_utf8(plaintext)
            .map_err(|e| RepositoryError::InternalError(format!("decrypted key is not UTF-8: {}", e)))
    }
}
