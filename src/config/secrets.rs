// src/config/secrets.rs
//! API keys and CMS credentials, read from the environment only.

use std::env;

use anyhow::{anyhow, Result};

#[derive(Clone, Default)]
pub struct Secrets {
    pub openai_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub wp_base_url: Option<String>,
    pub wp_username: Option<String>,
    pub wp_app_password: Option<String>,
}

// Safe diagnostics: presence and length only.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = |v: &Option<String>| v.as_ref().map(String::len);
        f.debug_struct("Secrets")
            .field("openai_api_key_len", &len(&self.openai_api_key))
            .field("tavily_api_key_len", &len(&self.tavily_api_key))
            .field("wp_base_url", &self.wp_base_url)
            .field("wp_username", &self.wp_username)
            .field("wp_app_password_len", &len(&self.wp_app_password))
            .finish()
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            tavily_api_key: non_empty("TAVILY_API_KEY"),
            wp_base_url: non_empty("WP_BASE_URL"),
            wp_username: non_empty("WP_USERNAME"),
            wp_app_password: non_empty("WP_APP_PASSWORD"),
        }
    }

    pub fn openai(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Missing OPENAI_API_KEY env var"))
    }

    /// (base_url, username, app_password)
    pub fn wordpress(&self) -> Result<(&str, &str, &str)> {
        match (
            self.wp_base_url.as_deref(),
            self.wp_username.as_deref(),
            self.wp_app_password.as_deref(),
        ) {
            (Some(b), Some(u), Some(p)) => Ok((b, u, p)),
            _ => Err(anyhow!(
                "WP_BASE_URL, WP_USERNAME and WP_APP_PASSWORD must all be set"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_keys() {
        let s = Secrets {
            openai_api_key: Some("sk-secret".into()),
            wp_app_password: Some("abcd efgh".into()),
            ..Default::default()
        };
        let out = format!("{s:?}");
        assert!(!out.contains("sk-secret"));
        assert!(!out.contains("abcd efgh"));
        assert!(out.contains("openai_api_key_len: Some(9)"));
    }

    #[test]
    fn wordpress_requires_all_three() {
        let mut s = Secrets {
            wp_base_url: Some("https://blog.test".into()),
            wp_username: Some("bot".into()),
            ..Default::default()
        };
        assert!(s.wordpress().is_err());
        s.wp_app_password = Some("pw".into());
        assert_eq!(s.wordpress().unwrap(), ("https://blog.test", "bot", "pw"));
    }
}
