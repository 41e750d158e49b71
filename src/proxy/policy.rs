use crate::{Error, Result};
use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    /// `*.fal.ai`: any host strictly below the domain.
    Subdomain(String),
    Exact(String),
}

impl HostPattern {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        match raw.strip_prefix("*.") {
            Some(domain) => Self::Subdomain(domain.to_string()),
            None => match raw.strip_prefix('.') {
                Some(domain) => Self::Subdomain(domain.to_string()),
                None => Self::Exact(raw),
            },
        }
    }

    fn matches(&self, host: &str) -> bool {
        match self {
            Self::Subdomain(domain) => host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.')),
            Self::Exact(expected) => host == expected,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Subdomain(domain) => format!("*.{domain}"),
            Self::Exact(host) => host.clone(),
        }
    }
}

/// Allow-list of upstream hosts the proxy may forward to.
#[derive(Debug, Clone)]
pub struct HostPolicy {
    patterns: Vec<HostPattern>,
}

impl HostPolicy {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| HostPattern::parse(p.as_ref()))
                .collect(),
        }
    }

    pub fn permits(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.patterns.iter().any(|pattern| pattern.matches(&host))
    }

    /// Parses an absolute target URL and checks its host against the allow-list.
    pub fn check(&self, target: &str) -> Result<Url> {
        let url = Url::parse(target).map_err(|e| Error::InvalidTargetUrl(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidTargetUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidTargetUrl("URL has no host".to_string()))?;

        if !self.permits(host) {
            return Err(Error::DisallowedHost {
                host: host.to_string(),
                allowed: self.describe(),
            });
        }

        Ok(url)
    }

    pub fn describe(&self) -> String {
        self.patterns
            .iter()
            .map(HostPattern::render)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
