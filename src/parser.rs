use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fields pulled out of a raw response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "Domain Name")]
    DomainName,
    #[serde(rename = "Registry Domain ID")]
    RegistryDomainId,
    #[serde(rename = "Registrar WHOIS Server")]
    RegistrarWhoisServer,
    #[serde(rename = "Updated Date")]
    UpdatedDate,
    #[serde(rename = "Creation Date")]
    CreationDate,
    #[serde(rename = "Registry Expiry Date")]
    RegistryExpiryDate,
    #[serde(rename = "Registrar")]
    Registrar,
    #[serde(rename = "Registrar IANA ID")]
    RegistrarIanaId,
    #[serde(rename = "Domain Status")]
    DomainStatus,
    #[serde(rename = "Name Server")]
    NameServer,
    #[serde(rename = "DNSSEC")]
    Dnssec,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::DomainName,
        Field::RegistryDomainId,
        Field::RegistrarWhoisServer,
        Field::UpdatedDate,
        Field::CreationDate,
        Field::RegistryExpiryDate,
        Field::Registrar,
        Field::RegistrarIanaId,
        Field::DomainStatus,
        Field::NameServer,
        Field::Dnssec,
    ];

    /// The line label as registries print it.
    pub fn label(&self) -> &'static str {
        match self {
            Field::DomainName => "Domain Name",
            Field::RegistryDomainId => "Registry Domain ID",
            Field::RegistrarWhoisServer => "Registrar WHOIS Server",
            Field::UpdatedDate => "Updated Date",
            Field::CreationDate => "Creation Date",
            Field::RegistryExpiryDate => "Registry Expiry Date",
            Field::Registrar => "Registrar",
            Field::RegistrarIanaId => "Registrar IANA ID",
            Field::DomainStatus => "Domain Status",
            Field::NameServer => "Name Server",
            Field::Dnssec => "DNSSEC",
        }
    }

    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Field::DomainStatus | Field::NameServer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multi(Vec<String>),
}

/// Fields found in one response. Absent fields have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedRecord {
    fields: BTreeMap<Field, FieldValue>,
}

impl ParsedRecord {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// First value of a field.
    pub fn get(&self, field: Field) -> Option<&str> {
        match self.fields.get(&field)? {
            FieldValue::Single(value) => Some(value),
            FieldValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    /// Every value of a field, in response order.
    pub fn get_all(&self, field: Field) -> &[String] {
        match self.fields.get(&field) {
            Some(FieldValue::Single(value)) => std::slice::from_ref(value),
            Some(FieldValue::Multi(values)) => values,
            None => &[],
        }
    }

    pub fn registrar(&self) -> Option<&str> {
        self.get(Field::Registrar)
    }

    pub fn name_servers(&self) -> &[String] {
        self.get_all(Field::NameServer)
    }

    pub fn statuses(&self) -> &[String] {
        self.get_all(Field::DomainStatus)
    }
}

// One anchored line-prefix pattern per field
static PATTERNS: Lazy<Vec<(Field, Regex)>> = Lazy::new(|| {
    Field::ALL
        .iter()
        .map(|field| {
            let pattern = format!(r"(?mi)^[ \t]*{}:[ \t]*(.+)$", regex::escape(field.label()));
            (*field, Regex::new(&pattern).expect("field pattern is valid"))
        })
        .collect()
});

/// Best-effort pattern extraction; not a whois grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, response: &str) -> ParsedRecord {
        let mut fields = BTreeMap::new();

        for (field, pattern) in PATTERNS.iter() {
            let mut values = pattern
                .captures_iter(response)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string);

            if field.is_multi_valued() {
                let all: Vec<String> = values.collect();
                if !all.is_empty() {
                    fields.insert(*field, FieldValue::Multi(all));
                }
            } else if let Some(first) = values.next() {
                fields.insert(*field, FieldValue::Single(first));
            }
        }

        ParsedRecord { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERISIGN: &str = "   Domain Name: GOOGLE.COM\r\n\
   Registry Domain ID: 2138514_DOMAIN_COM-VRSN\r\n\
   Registrar WHOIS Server: whois.markmonitor.com\r\n\
   Registrar URL: http://www.markmonitor.com\r\n\
   Updated Date: 2019-09-09T15:39:04Z\r\n\
   Creation Date: 1997-09-15T04:00:00Z\r\n\
   Registry Expiry Date: 2028-09-14T04:00:00Z\r\n\
   Registrar: MarkMonitor Inc.\r\n\
   Registrar IANA ID: 292\r\n\
   Registrar Abuse Contact Email: abusecomplaints@markmonitor.com\r\n\
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited\r\n\
   Domain Status: serverUpdateProhibited https://icann.org/epp#serverUpdateProhibited\r\n\
   Name Server: NS1.GOOGLE.COM\r\n\
   Name Server: NS2.GOOGLE.COM\r\n\
   DNSSEC: unsigned\r\n";

    #[test]
    fn test_extracts_verisign_record() {
        let record = FieldExtractor::new().extract(VERISIGN);

        assert_eq!(record.get(Field::DomainName), Some("GOOGLE.COM"));
        assert_eq!(record.get(Field::RegistryDomainId), Some("2138514_DOMAIN_COM-VRSN"));
        assert_eq!(record.get(Field::RegistrarWhoisServer), Some("whois.markmonitor.com"));
        assert_eq!(record.registrar(), Some("MarkMonitor Inc."));
        assert_eq!(record.get(Field::RegistrarIanaId), Some("292"));
        assert_eq!(record.get(Field::Dnssec), Some("unsigned"));
        assert_eq!(record.name_servers(), &["NS1.GOOGLE.COM".to_string(), "NS2.GOOGLE.COM".to_string()]);
        assert_eq!(record.statuses().len(), 2);
        assert!(record.statuses()[0].starts_with("clientDeleteProhibited"));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let record = FieldExtractor::new().extract("Domain Name: example.org\nName Server:\n");
        assert!(record.contains(Field::DomainName));
        assert!(!record.contains(Field::Registrar));
        assert!(!record.contains(Field::NameServer));
        assert_eq!(record.get_all(Field::Registrar), &[] as &[String]);
    }

    #[test]
    fn test_single_valued_keeps_first() {
        let record = FieldExtractor::new().extract("Registrar: First\nRegistrar: Second\n");
        assert_eq!(record.registrar(), Some("First"));
    }

    #[test]
    fn test_empty_response() {
        assert!(FieldExtractor::new().extract("").is_empty());
    }

    #[test]
    fn test_serializes_with_registry_labels() {
        let record = FieldExtractor::new().extract("Domain Name: A.COM\nName Server: NS1.A.COM\n");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Domain Name"], "A.COM");
        assert_eq!(json["Name Server"][0], "NS1.A.COM");
    }
}
