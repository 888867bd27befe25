//! Tabular report: one row per `(domain, server, response)` triple.

use crate::{
    errors::WhoisError,
    parser::{Field, FieldExtractor, ParsedRecord},
    resolver::Resolution,
};
use std::io::Write;

pub const MAX_NAME_SERVERS: usize = 5;

pub const HEADERS: [&str; 17] = [
    "Domain",
    "WHOIS Server",
    "Domain Name",
    "Registry Domain ID",
    "Registrar WHOIS Server",
    "Updated Date",
    "Creation Date",
    "Registry Expiry Date",
    "Registrar",
    "Registrar IANA ID",
    "Domain Status",
    "DNSSEC",
    "Name Server 1",
    "Name Server 2",
    "Name Server 3",
    "Name Server 4",
    "Name Server 5",
];

// Single-valued report columns between "WHOIS Server" and the name servers
const FIELD_COLUMNS: [Field; 10] = [
    Field::DomainName,
    Field::RegistryDomainId,
    Field::RegistrarWhoisServer,
    Field::UpdatedDate,
    Field::CreationDate,
    Field::RegistryExpiryDate,
    Field::Registrar,
    Field::RegistrarIanaId,
    Field::DomainStatus,
    Field::Dnssec,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub domain: String,
    pub server: String,
    pub record: ParsedRecord,
}

impl ReportRow {
    /// Cells in header order. Missing fields are empty; name servers are
    /// padded or truncated to five columns.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(HEADERS.len());
        cells.push(self.domain.clone());
        cells.push(self.server.clone());
        cells.extend(
            FIELD_COLUMNS
                .iter()
                .map(|field| self.record.get(*field).unwrap_or_default().to_string()),
        );

        let name_servers = self.record.name_servers();
        cells.extend(
            (0..MAX_NAME_SERVERS).map(|i| name_servers.get(i).cloned().unwrap_or_default()),
        );
        cells
    }
}

/// Rows for every hop of a resolution, in the order the servers were queried.
///
/// `domain` is the caller's input as given, before normalization.
pub fn rows_for(domain: &str, resolution: &Resolution) -> Vec<ReportRow> {
    let extractor = FieldExtractor::new();
    resolution
        .steps_in_hop_order()
        .map(|step| ReportRow {
            domain: domain.to_string(),
            server: step.server.clone(),
            record: extractor.extract(step.record_text()),
        })
        .collect()
}

/// CSV writer with the fixed report header.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(inner: W) -> Result<Self, WhoisError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(HEADERS)?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, row: &ReportRow) -> Result<(), WhoisError> {
        self.writer.write_record(row.cells())?;
        Ok(())
    }

    pub fn write_resolution(&mut self, domain: &str, resolution: &Resolution) -> Result<usize, WhoisError> {
        let rows = rows_for(domain, resolution);
        for row in &rows {
            self.write_row(row)?;
        }
        Ok(rows.len())
    }

    pub fn finish(mut self) -> Result<W, WhoisError> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| WhoisError::IoError(e.into_error()))
    }
}
