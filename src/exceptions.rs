use crate::normalize::Domain;
use once_cell::sync::Lazy;

/// How an exception key is compared against a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// `domain.ends_with(key)`
    Suffix,
    /// Whole-domain equality
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRule {
    pub key: String,
    pub server: String,
    pub kind: MatchKind,
}

impl ExceptionRule {
    pub fn suffix(key: &str, server: &str) -> Self {
        Self { key: key.to_ascii_lowercase(), server: server.to_string(), kind: MatchKind::Suffix }
    }

    pub fn exact(key: &str, server: &str) -> Self {
        Self { key: key.to_ascii_lowercase(), server: server.to_string(), kind: MatchKind::Exact }
    }

    fn matches(&self, domain: &Domain) -> bool {
        match self.kind {
            MatchKind::Suffix => domain.ends_with(&self.key),
            MatchKind::Exact => domain.as_str() == self.key,
        }
    }
}

/// Registries whose referral chain from the IANA root is broken or non-standard.
///
/// Rules are checked in declaration order and the first match wins.
#[derive(Debug, Clone, Default)]
pub struct ExceptionTable {
    rules: Vec<ExceptionRule>,
}

// Known-authoritative servers that root discovery gets wrong
static DEFAULT_RULES: Lazy<Vec<ExceptionRule>> = Lazy::new(|| {
    vec![
        ExceptionRule::suffix(".ac.uk", "whois.ja.net"),
        ExceptionRule::suffix(".ps", "whois.pnina.ps"),
        ExceptionRule::suffix(".buzz", "whois.nic.buzz"),
        ExceptionRule::suffix(".moe", "whois.nic.moe"),
        ExceptionRule::suffix(".com.tr", "whois.nic.tr"),
        ExceptionRule::exact("example.com", "whois.verisign-grs.com"),
    ]
});

impl ExceptionTable {
    pub fn new(rules: Vec<ExceptionRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: ExceptionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn lookup(&self, domain: &Domain) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(domain))
            .map(|rule| rule.server.as_str())
    }
}

/// The built-in exception table.
pub fn default_exceptions() -> ExceptionTable {
    ExceptionTable::new(DEFAULT_RULES.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(s: &str) -> Domain {
        Domain::parse(s).unwrap()
    }

    #[test]
    fn test_suffix_match() {
        let table = default_exceptions();
        assert_eq!(table.lookup(&domain("ox.ac.uk")), Some("whois.ja.net"));
        assert_eq!(table.lookup(&domain("gov.ps")), Some("whois.pnina.ps"));
        assert_eq!(table.lookup(&domain("shop.com.tr")), Some("whois.nic.tr"));
        assert_eq!(table.lookup(&domain("google.com")), None);
    }

    #[test]
    fn test_exact_match_requires_whole_domain() {
        let table = default_exceptions();
        assert_eq!(table.lookup(&domain("example.com")), Some("whois.verisign-grs.com"));
        assert_eq!(table.lookup(&domain("myexample.com")), None);
        assert_eq!(table.lookup(&domain("www.example.com")), None);
    }

    #[test]
    fn test_first_declared_rule_wins() {
        let table = ExceptionTable::empty()
            .with_rule(ExceptionRule::suffix(".uk", "first.example"))
            .with_rule(ExceptionRule::suffix(".ac.uk", "second.example"));
        assert_eq!(table.lookup(&domain("ox.ac.uk")), Some("first.example"));
    }
}
