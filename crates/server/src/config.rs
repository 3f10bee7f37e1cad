use std::env;

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub upload_dir: String,
    pub max_upload_bytes: u64,
    /// Prefix used when building retrieval URLs for uploaded files.
    pub public_base_url: String,
    pub session_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./stride.db".into()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into()),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_485_760), // 10MB
            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .filter(|v| url::Url::parse(v).is_ok())
                .unwrap_or_else(|| "http://localhost:3001".into()),
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Stable retrieval URL for an uploaded file.
    pub fn file_url(&self, attachment_id: &str) -> String {
        match url::Url::parse(&self.public_base_url)
            .and_then(|base| base.join(&format!("/api/files/{}", attachment_id)))
        {
            Ok(u) => u.to_string(),
            Err(_) => format!("/api/files/{}", attachment_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 0,
            database_path: ":memory:".into(),
            upload_dir: "/tmp".into(),
            max_upload_bytes: 1024,
            public_base_url: base.into(),
            session_ttl_days: 30,
        }
    }

    #[test]
    fn file_url_joins_base() {
        let c = config("https://stride.example.com/");
        assert_eq!(c.file_url("abc"), "https://stride.example.com/api/files/abc");
    }

    #[test]
    fn file_url_falls_back_to_relative() {
        let c = config("not a url");
        assert_eq!(c.file_url("abc"), "/api/files/abc");
    }
}
