//! Fixed RSA test keys.
//!
//! Two 2048-bit keys with public exponent 65537. The moduli below are the
//! unpadded base64url encodings of the fixture PEMs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

const PRIMARY_PEM: &str = include_str!("fixtures/rsa_test_key_01.pem");
const SECONDARY_PEM: &str = include_str!("fixtures/rsa_test_key_02.pem");

const PRIMARY_MODULUS: &str = "0t1ikcgDh5WKfpOYoIta1OqEWWGyATMF2mVfbcNqSJl4o7QVsbhj0cXMPMH0tUA9lm4TNZ1-BOxetx0R35X2b-BHxFEZLXq7hvCJkl49V4SSdGIYI19oxo3VpIMn6cXyORZD_M5irY4jtLVviCCr82K9I-mV7s7nhVaWMv14UGVR9aaZEHTqk714TIqyCiMgIs9fBRY8_po3AiT88S7HPuqpxTp__C6oyKC6snR5rrMpBf8iYAXmnP23ZoyMAGdE8-5UZeaveiUcunhiAnGNZj71IlRoOOt6zg-gDvyGFZIwXbGqx1Y76Ep-A9oi8ZIm4z_Lozk4iGn9ltt2eZPwhQ";
const SECONDARY_MODULUS: &str = "3dyX8v0x9nem0bBIhJR1DB05tH0MBzDGDslmWRQQ2I_CAUxNu3beeM0f1VPFrGeKI1zTtGkwfqIm9TDFt0HR0KMkSucYSXSrNcpXLSHmG3H3Ze5qGmBs3FSqwZJ7yqZEDIhcMWrXCqccRRxErz7lbctDnWoBhrlwMC9iv3fEEREMsqEBKeZtOeJBhVlSLJuaUbJzNlpkutYSVzXguRA3Szkiv1OYZzc5dCSL6bW9HH04ZNd7S4Tqhms_4shnNlgGneNZmswcNSgAFQhhEiuXEjvR_9n8ANy92PRs57y502jomNecWlWrkvDNztR-t283VMECEyGDfgPXdAIuNdfGFw";

/// Public exponent 65537.
pub const TEST_EXPONENT: &str = "AQAB";

/// An RSA key that signs test tokens under a chosen key identifier.
pub struct TestSigningKey {
    kid: String,
    encoding_key: EncodingKey,
    modulus: &'static str,
}

impl TestSigningKey {
    /// The first fixture key.
    pub fn primary(kid: &str) -> Self {
        Self::from_pem(kid, PRIMARY_PEM, PRIMARY_MODULUS)
    }

    /// The second fixture key; a different key pair from `primary`.
    pub fn secondary(kid: &str) -> Self {
        Self::from_pem(kid, SECONDARY_PEM, SECONDARY_MODULUS)
    }

    fn from_pem(kid: &str, pem: &str, modulus: &'static str) -> Self {
        Self {
            kid: kid.to_string(),
            encoding_key: EncodingKey::from_rsa_pem(pem.as_bytes())
                .expect("fixture PEM should parse"),
            modulus,
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public JWK for this key.
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.modulus,
            "e": TEST_EXPONENT,
        })
    }

    /// Public JWK with `=`-padded members, as some issuers publish.
    pub fn padded_jwk(&self) -> Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "n": format!("{}==", self.modulus),
            "e": TEST_EXPONENT,
        })
    }

    /// Sign claims with RS256 and this key's `kid`.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with(Algorithm::RS256, claims)
    }

    /// Sign claims with the given RSA algorithm and this key's `kid`.
    pub fn sign_with(&self, alg: Algorithm, claims: &Value) -> String {
        let mut header = Header::new(alg);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key).expect("signing should succeed")
    }

    /// Sign claims with RS256 and no `kid` header.
    pub fn sign_without_kid(&self, claims: &Value) -> String {
        encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key)
            .expect("signing should succeed")
    }
}

/// JWKS document publishing the given keys.
pub fn jwks_document(keys: &[&TestSigningKey]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}

/// A compact token with an arbitrary header and a dummy signature.
///
/// For headers `jsonwebtoken` refuses to produce (`alg: none`, HMAC with a
/// key id, missing fields).
pub fn token_with_raw_header(header: &Value, claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signature = URL_SAFE_NO_PAD.encode("not-a-signature");
    format!("{header}.{claims}.{signature}")
}
