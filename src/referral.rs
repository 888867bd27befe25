use once_cell::sync::Lazy;
use regex::Regex;

// Label, colon, then a dotted token; anchored at the start of a trimmed line
static REFERRAL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:refer|whois server|referral url|registrar whois):\s*(\S+\.\S+)")
        .expect("referral pattern is valid")
});

static ROOT_REFER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^refer:\s*(\S+)").expect("refer pattern is valid"));

/// First referral hostname in a whois response.
///
/// Candidates containing `://` are URLs rather than whois hosts and are skipped,
/// the scan continues with the following lines.
pub fn find_referral(response: &str) -> Option<String> {
    response
        .lines()
        .map(str::trim)
        .filter_map(|line| REFERRAL_LINE.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|candidate| !candidate.contains("://"))
        .map(str::to_string)
}

/// The `refer:` line of an IANA root response.
pub fn find_root_referral(response: &str) -> Option<String> {
    response
        .lines()
        .map(str::trim)
        .find_map(|line| ROOT_REFER_LINE.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
