//! Small helpers shared across the SDK.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random ASCII alphanumeric string of `len` characters.
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
