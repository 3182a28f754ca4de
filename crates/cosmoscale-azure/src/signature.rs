//! Cosmos DB master-key request signing.
//!
//! ```text
//! payload = "{verb}\n{resource_type}\n{resource_link}\n{date}\n\n"   (verb, type, date lowercased)
//! sig     = base64(HMAC-SHA256(base64_decode(key), payload))
//! header  = urlencode("type=master&ver=1.0&sig={sig}")
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const KEY_TYPE: &str = "master";
const TOKEN_VERSION: &str = "1.0";

/// Decoded account master key.
#[derive(Clone)]
pub struct MasterKey(Vec<u8>);

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

impl MasterKey {
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Ok(Self(bytes))
    }

    /// Value for the `authorization` header of one request.
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> String {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac =
            HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let token = format!("type={KEY_TYPE}&ver={TOKEN_VERSION}&sig={signature}");
        url::form_urlencoded::byte_serialize(token.as_bytes()).collect()
    }
}

/// RFC 1123 date used in `x-ms-date` and in the signed payload.
pub fn rfc1123(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_key() -> MasterKey {
        // base64("cosmoscale-test-key")
        MasterKey::from_base64("Y29zbW9zY2FsZS10ZXN0LWtleQ==").unwrap()
    }

    #[test]
    fn rfc1123_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(rfc1123(now), "Fri, 01 Mar 2024 12:00:00 GMT");
    }

    #[test]
    fn known_signature() {
        let header = test_key().authorization(
            "GET",
            "pkranges",
            "dbs/orders/colls/lines",
            "Fri, 01 Mar 2024 12:00:00 GMT",
        );
        assert_eq!(
            header,
            "type%3Dmaster%26ver%3D1.0%26sig%3DKpTicB4ophyYwRf3Uw6j5wySRD8uweJduRiOim1i%2BQM%3D"
        );
    }

    #[test]
    fn verb_and_type_are_case_insensitive() {
        let key = test_key();
        let date = "Fri, 01 Mar 2024 12:00:00 GMT";
        assert_eq!(
            key.authorization("GET", "PKRanges", "dbs/orders/colls/lines", date),
            key.authorization("get", "pkranges", "dbs/orders/colls/lines", date),
        );
        assert_ne!(
            key.authorization("get", "pkranges", "dbs/orders/colls/lines", date),
            key.authorization("put", "pkranges", "dbs/orders/colls/lines", date),
        );
    }

    #[test]
    fn reject_invalid_base64() {
        assert!(MasterKey::from_base64("not base64!").is_err());
    }

    #[test]
    fn debug_is_redacted() {
        assert_eq!(format!("{:?}", test_key()), "MasterKey(<redacted>)");
    }
}
