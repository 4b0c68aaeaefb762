use std::fs;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ingest::{SecretSource, SourceError};

use crate::error::{AppError, Result};

const ENV_PREFIX: &str = "env:";

/// Secrets stored base64-encoded in a file or an environment variable
/// (`env:NAME`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSecrets;

impl LocalSecrets {
    pub fn resolve(&self, reference: &str) -> Result<String> {
        let encoded = match reference.strip_prefix(ENV_PREFIX) {
            Some(name) => std::env::var(name)
                .map_err(|err| AppError::Secret(format!("{}: {}", name, err)))?,
            None => fs::read_to_string(reference)
                .map_err(|err| AppError::Secret(format!("{}: {}", reference, err)))?,
        };
        decode_secret(&encoded)
    }
}

impl SecretSource for LocalSecrets {
    fn secret(&self, reference: &str) -> std::result::Result<String, SourceError> {
        self.resolve(reference).map_err(|err| match err {
            AppError::Secret(message) => message.into(),
            other => other.into(),
        })
    }
}

/// Base64 content that must decode to ASCII text.
pub fn decode_secret(encoded: &str) -> Result<String> {
    let bytes = BASE64
        .decode(encoded.trim().as_bytes())
        .map_err(|err| AppError::Secret(format!("invalid base64: {}", err)))?;
    if !bytes.is_ascii() {
        return Err(AppError::Secret("secret is not ASCII text".to_string()));
    }
    let text = String::from_utf8(bytes)
        .map_err(|err| AppError::Secret(format!("invalid text: {}", err)))?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_and_trims() {
        let encoded = BASE64.encode(b"https://objectstorage.example/p/abc/ \n");
        assert_eq!(
            decode_secret(&format!("{}\n", encoded)).expect("decode"),
            "https://objectstorage.example/p/abc/"
        );
    }

    #[test]
    fn rejects_invalid_base64_and_binary() {
        assert!(matches!(decode_secret("%%%"), Err(AppError::Secret(_))));
        let binary = BASE64.encode([0xff, 0xfe, 0x00]);
        assert!(matches!(decode_secret(&binary), Err(AppError::Secret(_))));
    }

    #[test]
    fn reads_file_reference() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("par.secret");
        fs::write(&path, BASE64.encode("secret-value")).expect("write secret");
        let value = LocalSecrets
            .resolve(path.to_str().expect("utf8 path"))
            .expect("resolve");
        assert_eq!(value, "secret-value");
        assert!(LocalSecrets.resolve("env:BILLING_SECRET_THAT_IS_NOT_SET").is_err());
    }
}
