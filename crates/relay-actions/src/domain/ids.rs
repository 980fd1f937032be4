//! Mock identifiers, addresses and hashes returned by the handlers.

use chrono::{Duration, SecondsFormat, Utc};
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const BASE58: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of the random part of a prefixed id.
pub const ID_SUFFIX_LEN: usize = 8;

fn random_from(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// `<prefix>_` followed by eight base36 characters, e.g. `pay_k3v9x0qa`.
#[must_use]
pub fn prefixed_id(prefix: &str) -> String {
    format!("{}_{}", prefix, random_from(BASE36, ID_SUFFIX_LEN))
}

/// `0x`-prefixed hex of `bytes` random bytes.
#[must_use]
pub fn hex_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(buf.as_mut_slice());
    format!("0x{}", hex::encode(buf))
}

/// CIDv0-shaped content hash: `Qm` plus 44 base58 characters.
#[must_use]
pub fn ipfs_hash() -> String {
    format!("Qm{}", random_from(BASE58, 44))
}

/// Integer in `low..=high`.
#[must_use]
pub fn random_in(low: u32, high: u32) -> u32 {
    rand::thread_rng().gen_range(low..=high)
}

/// Current time as an ISO-8601 string with millisecond precision.
#[must_use]
pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `offset` from now as an ISO-8601 string with millisecond precision.
#[must_use]
pub fn iso_after(offset: Duration) -> String {
    (Utc::now() + offset).to_rfc3339_opts(SecondsFormat::Millis, true)
}
