use tracing::error;

/// Salted bcrypt hash of `plain` at the given cost.
pub fn hash_password(plain: &str, cost: u32) -> anyhow::Result<String> {
    bcrypt::hash(plain, cost).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        anyhow::anyhow!(e.to_string())
    })
}

/// Checks `plain` against a bcrypt hash. A stored value that is not a bcrypt
/// hash never matches.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match bcrypt::verify(plain, hash) {
        Ok(ok) => ok,
        Err(e) => {
            error!(error = %e, "bcrypt verify error");
            false
        }
    }
}
