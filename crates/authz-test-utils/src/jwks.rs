//! Trust-source mocks.

use crate::keys::{jwks_document, TestSigningKey};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mocks serve the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Full JWKS URL on a mock server.
pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}

/// GET mock serving a key set. Chain `.expect(n)` or `.up_to_n_times(n)`
/// before mounting.
pub fn jwks_mock(keys: &[&TestSigningKey]) -> Mock {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
}

/// GET mock serving a key set only after `delay`.
pub fn jwks_slow_mock(keys: &[&TestSigningKey], delay: Duration) -> Mock {
    Mock::given(method("GET")).and(path(JWKS_PATH)).respond_with(
        ResponseTemplate::new(200)
            .set_body_json(jwks_document(keys))
            .set_delay(delay),
    )
}

/// GET mock answering with the given status and no key set.
pub fn jwks_failure_mock(status: u16) -> Mock {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(status))
}
