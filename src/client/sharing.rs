use sharks::{Share, Sharks};
use zeroize::Zeroizing;

use crate::error::{AppError, Result};

/// Threshold secret sharing, consumed as an opaque capability.
pub trait SecretSharing: Send + Sync {
    /// Splits `secret` into `n` shares, any `t` of which recombine it.
    fn split(&self, secret: &[u8], n: u8, t: u8) -> Result<Vec<Zeroizing<Vec<u8>>>>;

    /// Recombines shares. Callers must pass at least the threshold used at
    /// split time; fewer shares yield unrelated bytes, not an error.
    fn combine(&self, shares: &[&[u8]]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Shamir sharing over GF(256), via the `sharks` crate.
///
/// Each share is encoded as `x || y_1 .. y_len(secret)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShamirSharing;

impl SecretSharing for ShamirSharing {
    fn split(&self, secret: &[u8], n: u8, t: u8) -> Result<Vec<Zeroizing<Vec<u8>>>> {
        if t < 2 || n < t {
            return Err(AppError::Sharing(format!("cannot split {}-of-{}", t, n)));
        }
        if secret.is_empty() {
            return Err(AppError::Sharing("secret is empty".to_string()));
        }

        let shares = Sharks(t)
            .dealer(secret)
            .take(n as usize)
            .map(|share| Zeroizing::new(Vec::from(&share)))
            .collect();
        Ok(shares)
    }

    fn combine(&self, shares: &[&[u8]]) -> Result<Zeroizing<Vec<u8>>> {
        if shares.len() < 2 {
            return Err(AppError::Sharing(format!("need at least 2 shares, got {}", shares.len())));
        }

        let parsed = shares
            .iter()
            .map(|bytes| Share::try_from(*bytes).map_err(|e| AppError::Sharing(e.to_string())))
            .collect::<Result<Vec<Share>>>()?;

        Sharks(parsed.len() as u8)
            .recover(&parsed)
            .map(Zeroizing::new)
            .map_err(|e| AppError::Sharing(e.to_string()))
    }
}
