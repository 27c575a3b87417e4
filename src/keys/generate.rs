//! Random key material for `keydash create --generate`.
//!
//! The controller never generates or regenerates secrets; this only
//! fills in the create form when the user asks for it.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of the random part of a generated key.
pub const GENERATED_SECRET_LEN: usize = 32;

/// Generate a key like `pk_live_<32 alphanumerics>`.
pub fn generate_secret(prefix: &str, environment: &str) -> String {
    let body: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect();
    format!("{prefix}_{environment}_{body}")
}
