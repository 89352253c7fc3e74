//! Invoice number sequence state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Last committed invoice number and when it was committed.
///
/// On disk: `{ "lastInvoiceNumber": 1001, "lastInvoiceDate": "<ISO-8601>" }`.
/// A never-issued sequence stores `"lastInvoiceDate": ""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSequenceState {
    #[serde(rename = "lastInvoiceNumber")]
    pub last_issued_number: u64,
    #[serde(rename = "lastInvoiceDate", default, with = "empty_as_none")]
    pub last_issued_at: Option<DateTime<Utc>>,
}

impl InvoiceSequenceState {
    /// Fresh state: the first candidate will be `start_number + 1`.
    pub fn initial(start_number: u64) -> Self {
        Self {
            last_issued_number: start_number,
            last_issued_at: None,
        }
    }

    /// Number the next invoice would get. Does not reserve it.
    ///
    /// `None` once the last issued number is `u64::MAX`.
    pub fn next_candidate(&self) -> Option<u64> {
        self.last_issued_number.checked_add(1)
    }

    /// The sequence never goes backwards.
    pub fn check_commit(&self, number: u64) -> Result<(), DomainError> {
        if number < self.last_issued_number {
            return Err(DomainError::SequenceRegression {
                last: self.last_issued_number,
                attempted: number,
            });
        }
        Ok(())
    }

    /// State after committing `number` at `at`.
    pub fn committed(&self, number: u64, at: DateTime<Utc>) -> Result<Self, DomainError> {
        self.check_commit(number)?;
        Ok(Self {
            last_issued_number: number,
            last_issued_at: Some(at),
        })
    }
}

mod empty_as_none {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(s)
                .map(|at| Some(at.with_timezone(&Utc)))
                .map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = InvoiceSequenceState::initial(1000);
        assert_eq!(state.last_issued_number, 1000);
        assert_eq!(state.last_issued_at, None);
        assert_eq!(state.next_candidate(), Some(1001));
    }

    #[test]
    fn test_committed_advances() {
        let now = Utc::now();
        let state = InvoiceSequenceState::initial(1000).committed(1001, now).unwrap();
        assert_eq!(state.last_issued_number, 1001);
        assert_eq!(state.last_issued_at, Some(now));
        assert_eq!(state.next_candidate(), Some(1002));
    }

    #[test]
    fn test_committed_rejects_regression() {
        let state = InvoiceSequenceState::initial(1005);
        let result = state.committed(1004, Utc::now());
        assert!(matches!(
            result,
            Err(DomainError::SequenceRegression {
                last: 1005,
                attempted: 1004
            })
        ));
    }

    #[test]
    fn test_next_candidate_at_ceiling() {
        let state = InvoiceSequenceState::initial(u64::MAX);
        assert_eq!(state.next_candidate(), None);
        assert_eq!(InvoiceSequenceState::initial(u64::MAX - 1).next_candidate(), Some(u64::MAX));
    }

    #[test]
    fn test_wire_format_empty_date() {
        let json = serde_json::to_value(InvoiceSequenceState::initial(1000)).unwrap();
        assert_eq!(json, serde_json::json!({ "lastInvoiceNumber": 1000, "lastInvoiceDate": "" }));

        let parsed: InvoiceSequenceState =
            serde_json::from_str(r#"{ "lastInvoiceNumber": 1000, "lastInvoiceDate": "" }"#).unwrap();
        assert_eq!(parsed, InvoiceSequenceState::initial(1000));

        let missing: InvoiceSequenceState =
            serde_json::from_str(r#"{ "lastInvoiceNumber": 7 }"#).unwrap();
        assert_eq!(missing.last_issued_at, None);
    }

    #[test]
    fn test_wire_format_with_date() {
        let parsed: InvoiceSequenceState = serde_json::from_str(
            r#"{ "lastInvoiceNumber": 1003, "lastInvoiceDate": "2025-03-31T13:00:00.000Z" }"#,
        )
        .unwrap();
        assert_eq!(parsed.last_issued_number, 1003);
        let at = parsed.last_issued_at.unwrap();
        assert_eq!(at.to_rfc3339(), "2025-03-31T13:00:00+00:00");

        let json = serde_json::to_value(parsed).unwrap();
        assert_eq!(json["lastInvoiceDate"], "2025-03-31T13:00:00.000Z");
    }
}
