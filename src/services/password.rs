/// Salted bcrypt hashing. Hashing runs on the blocking pool so a slow cost
/// factor does not stall the async workers.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

pub const MIN_PASSWORD_LEN: usize = 8;

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> anyhow::Result<String> {
        let cost = self.cost;
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hash)
    }

    /// Any malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> bool {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
            .await
            .unwrap_or(false)
    }
}
