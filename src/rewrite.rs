use crate::normalize::Domain;
use once_cell::sync::Lazy;

/// How a rule reshapes the query line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryShape {
    Prefix(String),
    Suffix(String),
}

/// One per-registry query convention.
///
/// Matches when the target server is one of `servers` and, if set, the domain
/// ends with `domain_suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub servers: Vec<String>,
    pub domain_suffix: Option<String>,
    pub shape: QueryShape,
}

impl RewriteRule {
    pub fn prefix(server: &str, prefix: &str) -> Self {
        Self {
            servers: vec![server.to_ascii_lowercase()],
            domain_suffix: None,
            shape: QueryShape::Prefix(prefix.to_string()),
        }
    }

    pub fn suffix(server: &str, suffix: &str) -> Self {
        Self {
            servers: vec![server.to_ascii_lowercase()],
            domain_suffix: None,
            shape: QueryShape::Suffix(suffix.to_string()),
        }
    }

    pub fn also_for(mut self, server: &str) -> Self {
        self.servers.push(server.to_ascii_lowercase());
        self
    }

    pub fn only_for_suffix(mut self, domain_suffix: &str) -> Self {
        self.domain_suffix = Some(domain_suffix.to_ascii_lowercase());
        self
    }

    fn matches(&self, server: &str, domain: &Domain) -> bool {
        self.servers.iter().any(|s| s.eq_ignore_ascii_case(server))
            && self.domain_suffix.as_deref().map_or(true, |suffix| domain.ends_with(suffix))
    }

    fn apply(&self, domain: &Domain) -> String {
        match &self.shape {
            QueryShape::Prefix(prefix) => format!("{}{}", prefix, domain),
            QueryShape::Suffix(suffix) => format!("{}{}", domain, suffix),
        }
    }
}

/// Table-driven per-server query syntax. First matching rule wins, otherwise the
/// domain is sent unchanged.
#[derive(Debug, Clone, Default)]
pub struct QueryRewriter {
    rules: Vec<RewriteRule>,
}

static DEFAULT_RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        // JPRS answers in Japanese unless asked for English
        RewriteRule::suffix("whois.jprs.jp", "/e"),
        // DENIC wants explicit output type and ACE encoding
        RewriteRule::prefix("whois.denic.de", "-T dn,ace ")
            .also_for("de.whois-servers.net")
            .only_for_suffix(".de"),
        // Exact-match lookup on the thin .com/.net registry
        RewriteRule::prefix("whois.verisign-grs.com", "="),
    ]
});

impl QueryRewriter {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: RewriteRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The query line (without CRLF) to send to `server` for `domain`.
    pub fn rewrite(&self, server: &str, domain: &Domain) -> String {
        self.rules
            .iter()
            .find(|rule| rule.matches(server, domain))
            .map(|rule| rule.apply(domain))
            .unwrap_or_else(|| domain.to_string())
    }
}

/// The built-in registry conventions.
pub fn default_rewriter() -> QueryRewriter {
    QueryRewriter::new(DEFAULT_RULES.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(s: &str) -> Domain {
        Domain::parse(s).unwrap()
    }

    #[test]
    fn test_thin_registry_gets_equals_prefix() {
        let rewriter = default_rewriter();
        assert_eq!(rewriter.rewrite("whois.verisign-grs.com", &domain("example.com")), "=example.com");
        assert_eq!(rewriter.rewrite("WHOIS.VERISIGN-GRS.COM", &domain("example.com")), "=example.com");
    }

    #[test]
    fn test_denic_flags_only_for_de_domains() {
        let rewriter = default_rewriter();
        assert_eq!(rewriter.rewrite("whois.denic.de", &domain("heise.de")), "-T dn,ace heise.de");
        assert_eq!(rewriter.rewrite("de.whois-servers.net", &domain("heise.de")), "-T dn,ace heise.de");
        assert_eq!(rewriter.rewrite("whois.denic.de", &domain("heise.com")), "heise.com");
    }

    #[test]
    fn test_jprs_suffix() {
        assert_eq!(default_rewriter().rewrite("whois.jprs.jp", &domain("nic.jp")), "nic.jp/e");
    }

    #[test]
    fn test_default_passthrough() {
        assert_eq!(default_rewriter().rewrite("whois.pir.org", &domain("wikipedia.org")), "wikipedia.org");
    }

    #[test]
    fn test_added_rule_without_touching_defaults() {
        let rewriter = default_rewriter().with_rule(RewriteRule::prefix("whois.nic.example", "domain "));
        assert_eq!(rewriter.rewrite("whois.nic.example", &domain("a.example")), "domain a.example");
    }
}
