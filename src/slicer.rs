use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static BLANK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("blank line pattern is valid"));

const DOMAIN_NAME_LABEL: &str = "domain name:";

/// Servers known to bundle several records into one response.
#[derive(Debug, Clone)]
pub struct ThinRegistries {
    servers: HashSet<String>,
}

impl Default for ThinRegistries {
    fn default() -> Self {
        Self::new(["whois.verisign-grs.com"])
    }
}

impl ThinRegistries {
    pub fn new<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            servers: servers.into_iter().map(|s| s.as_ref().to_ascii_lowercase()).collect(),
        }
    }

    pub fn none() -> Self {
        Self { servers: HashSet::new() }
    }

    pub fn contains(&self, server: &str) -> bool {
        self.servers.contains(&server.to_ascii_lowercase())
    }
}

/// Isolate the record block describing `domain`.
///
/// Blocks are separated by blank lines. The first block carrying a
/// `Domain Name:` line equal to `domain` (case-insensitive) is returned as-is;
/// when none does, the whole response comes back unchanged.
pub fn slice_response<'a>(response: &'a str, domain: &str) -> &'a str {
    BLANK_LINE
        .split(response)
        .find(|block| block_names_domain(block, domain))
        .unwrap_or(response)
}

fn block_names_domain(block: &str, domain: &str) -> bool {
    block.lines().map(str::trim).any(|line| {
        line.get(..DOMAIN_NAME_LABEL.len())
            .filter(|label| label.eq_ignore_ascii_case(DOMAIN_NAME_LABEL))
            .map(|_| line[DOMAIN_NAME_LABEL.len()..].trim().eq_ignore_ascii_case(domain))
            .unwrap_or(false)
    })
}
