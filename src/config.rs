use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Single signing secret for both session and invitation tokens.
    pub jwt_secret: String,
    /// Origin used to build invitation links, always with a scheme.
    pub app_base_url: String,
    /// Enables the `Secure` cookie attribute.
    pub production: bool,
    pub host: String,
    pub port: u16,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            app_base_url: normalize_origin(
                &env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into()),
            ),
            production: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            bcrypt_cost: env::var("BCRYPT_COST")
                .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
                .parse()?,
        })
    }
}

/// Bare hosts (e.g. a platform-provided `my-app.example.com`) are served over https.
pub fn normalize_origin(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        base.to_string()
    } else {
        format!("https://{base}")
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
