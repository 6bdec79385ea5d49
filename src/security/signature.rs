//! Server-to-server request signatures.
//!
//! A trusted caller signs `{tenant}+{group}+{timestamp}` (or a shorter form,
//! see [`calculate_sign`]) with the shared server identity secret using
//! HMAC-SHA1, and sends the Base64 result in the `spas-signature` header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Compute the signature for a `(tenant, group, timestamp)` triple.
pub fn calculate_sign(
    tenant: Option<&str>,
    group: Option<&str>,
    timestamp: &str,
    secret_key: &str,
) -> String {
    let resource = match (tenant, group) {
        (Some(tenant), Some(group)) => format!("{tenant}+{group}"),
        (_, Some(group)) if !group.trim().is_empty() => group.to_owned(),
        _ => String::new(),
    };

    if resource.trim().is_empty() {
        sign_with_hmac_sha1(timestamp, secret_key)
    } else {
        sign_with_hmac_sha1(&format!("{resource}+{timestamp}"), secret_key)
    }
}

/// HMAC-SHA1 of `text` keyed with `key`, Base64-encoded.
pub fn sign_with_hmac_sha1(text: &str, key: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(text.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Compare two signatures without leaking the mismatch position.
pub fn signatures_match(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            sign_with_hmac_sha1("The quick brown fox jumps over the lazy dog", "key"),
            "3nybhbi3iqa8ino29wqQcBydtNk="
        );
        assert_eq!(sign_with_hmac_sha1("msg", "key"), "ECkAtyt78QMe7Ha0gEtmBSN2iWs=");
    }

    #[test]
    fn test_sign_is_deterministic() {
        let first = sign_with_hmac_sha1("msg", "key");
        for _ in 0..5 {
            assert_eq!(sign_with_hmac_sha1("msg", "key"), first);
        }
        assert_ne!(sign_with_hmac_sha1("msh", "key"), first);
        assert_ne!(sign_with_hmac_sha1("msg", "kez"), first);
    }

    #[test]
    fn test_calculate_sign_plaintext_forms() {
        assert_eq!(
            calculate_sign(Some("t"), Some("g"), "1000", "k"),
            "5ICjXXeiyjFdMu4avo35NPunkQk="
        );
        assert_eq!(
            calculate_sign(Some("t"), Some("g"), "1001", "k"),
            "mVI2Uh/tj6sIwtdBNdCrg4XYsmk="
        );
        assert_eq!(calculate_sign(None, Some("g"), "1000", "k"), "LDQcHhc+fvfl0eONr1mgH6i6jDA=");
        assert_eq!(calculate_sign(None, None, "1000", "k"), "gvXhA1zFJI5vxLC8q1A/hRQUYUU=");
        // A tenant without a group signs the bare timestamp.
        assert_eq!(
            calculate_sign(Some("t"), None, "1000", "k"),
            calculate_sign(None, None, "1000", "k")
        );
        assert_eq!(
            calculate_sign(None, Some("  "), "1000", "k"),
            calculate_sign(None, None, "1000", "k")
        );
    }

    #[test]
    fn test_signatures_match() {
        let sig = calculate_sign(Some("t"), Some("g"), "1000", "k");
        assert!(signatures_match(&sig, &sig.clone()));
        assert!(!signatures_match(&sig, &calculate_sign(Some("t"), Some("g"), "1001", "k")));
        assert!(!signatures_match(&sig, ""));
    }
}
