//! Turning raw scanned payloads into [`Certificate`]s.
//!
//! The wallet only ever consumes decoded certificates; the [`Decoder`] trait is
//! the seam where a payload parser plugs in. [`JsonDecoder`] reads the JSON form
//! of the EU digital COVID certificate health claim.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::certificate::{Certificate, Identity};

/// Transport prefix of scanned health certificate payloads
const HC1_PREFIX: &str = "HC1:";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed certificate payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("The payload does not contain a vaccination entry")]
    MissingVaccination,
    #[error("Invalid dose series {dose_number}/{total_doses}")]
    InvalidDoseSeries { dose_number: u8, total_doses: u8 },
    #[error("Invalid vaccination date: {0}")]
    InvalidDate(String),
}

pub trait Decoder {
    fn decode(&self, raw_payload: &str) -> Result<Certificate, DecodeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

#[derive(Debug, Deserialize)]
struct HealthClaim {
    #[serde(default)]
    nam: Option<Name>,
    #[serde(default)]
    dob: Option<String>,
    #[serde(default)]
    v: Vec<Vaccination>,
}

#[derive(Debug, Default, Deserialize)]
struct Name {
    #[serde(rename = "fn", default)]
    family: Option<String>,
    #[serde(rename = "gn", default)]
    given: Option<String>,
    /// Standardized (ICAO transliterated) family name
    #[serde(rename = "fnt", default)]
    family_std: Option<String>,
    #[serde(rename = "gnt", default)]
    given_std: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Vaccination {
    dn: u8,
    sd: u8,
    #[serde(default)]
    dt: Option<String>,
}

impl Name {
    fn display(&self) -> String {
        let readable = join_non_empty(&[&self.given, &self.family], " ");
        if readable.is_empty() {
            join_non_empty(&[&self.given_std, &self.family_std], " ")
        } else {
            readable
        }
    }

    fn identity(&self, dob: Option<&str>) -> Option<Identity> {
        let family = self.family_std.as_deref().filter(|s| !s.is_empty())?;
        let dob = dob.filter(|s| !s.is_empty())?;
        let given = self.given_std.as_deref().unwrap_or_default();

        Some(Identity::new(format!("{family}<{given}<{dob}")))
    }
}

fn join_non_empty(parts: &[&Option<String>], separator: &str) -> String {
    parts
        .iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

impl Decoder for JsonDecoder {
    fn decode(&self, raw_payload: &str) -> Result<Certificate, DecodeError> {
        let body = raw_payload.trim();
        let body = body.strip_prefix(HC1_PREFIX).unwrap_or(body);

        let claim: HealthClaim = serde_json::from_str(body)?;
        let vaccination = claim.v.last().ok_or(DecodeError::MissingVaccination)?;

        if vaccination.dn == 0 || vaccination.sd == 0 {
            return Err(DecodeError::InvalidDoseSeries {
                dose_number: vaccination.dn,
                total_doses: vaccination.sd,
            });
        }

        let vaccination_date = vaccination
            .dt
            .as_deref()
            .map(|dt| {
                NaiveDate::parse_from_str(dt, "%Y-%m-%d")
                    .map_err(|_| DecodeError::InvalidDate(dt.to_string()))
            })
            .transpose()?;

        let name = claim.nam.unwrap_or_default();

        Ok(Certificate {
            identity: name.identity(claim.dob.as_deref()),
            name: name.display(),
            dose_number: vaccination.dn,
            total_doses: vaccination.sd,
            vaccination_date,
            raw_payload: raw_payload.to_string(),
            validation_payload: None,
        })
    }
}

#[cfg(test)]
pub(crate) fn mock_payload(family: &str, given: &str, dose_number: u8, date: &str) -> String {
    format!(
        r#"{{"ver":"1.0.0","nam":{{"fn":"{family}","gn":"{given}","fnt":"{}","gnt":"{}"}},"dob":"1964-08-12","v":[{{"tg":"840539006","dn":{dose_number},"sd":2,"dt":"{date}","co":"DE"}}]}}"#,
        family.to_uppercase(),
        given.to_uppercase(),
    )
}
