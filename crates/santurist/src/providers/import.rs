use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::domain::{NewLead, ProviderCategory};

/// A spreadsheet row that could not become a lead.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RejectedRow {
    /// 1-based line in the file, header included.
    pub line: u64,
    pub reason: String,
}

pub(crate) enum ParsedRow {
    Lead { line: u64, lead: NewLead },
    Rejected(RejectedRow),
}

/// Reads `Business Name, Category, Contact Name, Email, Phone, Website, Notes` rows.
pub(crate) fn parse_leads<R: Read>(reader: R) -> Result<Vec<ParsedRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<LeadRow>().enumerate() {
        let line = index as u64 + 2;
        let row = match record {
            Ok(row) => row,
            Err(err) if matches!(err.kind(), csv::ErrorKind::Deserialize { .. }) => {
                rows.push(ParsedRow::Rejected(RejectedRow {
                    line,
                    reason: err.to_string(),
                }));
                continue;
            }
            Err(err) => return Err(err),
        };
        rows.push(row.into_parsed(line));
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct LeadRow {
    #[serde(rename = "Business Name")]
    business_name: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Contact Name", default, deserialize_with = "empty_string_as_none")]
    contact_name: Option<String>,
    #[serde(rename = "Email", default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(rename = "Phone", default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(rename = "Website", default, deserialize_with = "empty_string_as_none")]
    website: Option<String>,
    #[serde(rename = "Notes", default, deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

impl LeadRow {
    fn into_parsed(self, line: u64) -> ParsedRow {
        if self.business_name.is_empty() {
            return ParsedRow::Rejected(RejectedRow {
                line,
                reason: "business name is empty".to_string(),
            });
        }

        match self.category.parse::<ProviderCategory>() {
            Ok(category) => ParsedRow::Lead {
                line,
                lead: NewLead {
                    business_name: self.business_name,
                    category,
                    contact_name: self.contact_name,
                    email: self.email,
                    phone: self.phone,
                    website: self.website,
                    notes: self.notes,
                },
            },
            Err(category) => ParsedRow::Rejected(RejectedRow {
                line,
                reason: format!("unknown category '{category}'"),
            }),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
