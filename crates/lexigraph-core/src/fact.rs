//! Fact records and their comma-separated line codec
//!
//! A fact is one line of 12 comma-separated fields:
//!
//! ```text
//! front_weight,inference,truth,subject,subject_id,verb,descriptor,object,object_id,back_weight,definition,end_time
//! ```
//!
//! There is no quoting. Missing trailing fields are empty.

use crate::error::{Error, Result};
use crate::limits::{FACT_FIELDS, UNSPECIFIED_ID};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One subject-verb-object fact with weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Weight of the subject -> object direction
    pub front_weight: i64,

    /// Reserved; carried through but never consulted
    pub inference: i64,

    /// `false` for a negated relation
    pub truth: bool,

    pub subject: String,
    pub subject_id: i64,
    pub verb: String,

    /// Qualifier between verb and object ("a", "in the", ...), may be empty
    pub descriptor: String,

    pub object: String,
    pub object_id: i64,

    /// Weight of the object -> subject direction
    pub back_weight: i64,

    /// Definition attached to the compound entity
    pub definition: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Fact {
    /// A true fact with unit weights and unspecified ids.
    pub fn new(subject: impl Into<String>, verb: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            front_weight: 1,
            inference: 0,
            truth: true,
            subject: subject.into(),
            subject_id: UNSPECIFIED_ID,
            verb: verb.into(),
            descriptor: String::new(),
            object: object.into(),
            object_id: UNSPECIFIED_ID,
            back_weight: 1,
            definition: String::new(),
            end_time: None,
        }
    }

    pub fn with_ids(mut self, subject_id: i64, object_id: i64) -> Self {
        self.subject_id = subject_id;
        self.object_id = object_id;
        self
    }

    pub fn with_weights(mut self, front: i64, back: i64) -> Self {
        self.front_weight = front;
        self.back_weight = back;
        self
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = descriptor.into();
        self
    }

    pub fn negated(mut self) -> Self {
        self.truth = false;
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    pub fn expiring_at(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Parse one record. Blank lines yield `Ok(None)`.
    pub fn from_csv_line(line: &str) -> Result<Option<Fact>> {
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if line.trim().is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() > FACT_FIELDS {
            return Err(Error::MalformedRecord {
                line: None,
                reason: format!("expected {} fields, found {}", FACT_FIELDS, fields.len()),
            });
        }
        let field = |i: usize| fields.get(i).copied().unwrap_or("");

        let fact = Fact {
            front_weight: parse_int("front_weight", field(0))?,
            inference: parse_int("inference", field(1))?,
            truth: parse_int("truth", field(2))? != 0,
            subject: field(3).to_string(),
            subject_id: parse_int("subject_id", field(4))?,
            verb: field(5).to_string(),
            descriptor: field(6).to_string(),
            object: field(7).to_string(),
            object_id: parse_int("object_id", field(8))?,
            back_weight: parse_int("back_weight", field(9))?,
            definition: field(10).to_string(),
            end_time: parse_end_time(field(11))?,
        };

        for (name, value) in [
            ("subject", &fact.subject),
            ("verb", &fact.verb),
            ("object", &fact.object),
        ] {
            if value.is_empty() {
                return Err(Error::MalformedRecord {
                    line: None,
                    reason: format!("missing {}", name),
                });
            }
        }

        Ok(Some(fact))
    }

    /// Render in the same 12-field layout `from_csv_line` reads.
    pub fn to_csv_line(&self) -> String {
        let end_time = self
            .end_time
            .map(|t| t.timestamp().to_string())
            .unwrap_or_default();
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            self.front_weight,
            self.inference,
            u8::from(self.truth),
            self.subject,
            self.subject_id,
            self.verb,
            self.descriptor,
            self.object,
            self.object_id,
            self.back_weight,
            self.definition,
            end_time
        )
    }
}

fn parse_int(field: &'static str, raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(|_| Error::InvalidField {
        field,
        value: raw.to_string(),
    })
}

fn parse_end_time(raw: &str) -> Result<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return match Utc.timestamp_opt(secs, 0).single() {
            Some(t) => Ok(Some(t)),
            None => Err(Error::InvalidField {
                field: "end_time",
                value: raw.to_string(),
            }),
        };
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| Error::InvalidField {
            field: "end_time",
            value: raw.to_string(),
        })
}

/// Parse a whole document, collecting good facts and per-line errors.
///
/// Errors carry their 1-based line number.
pub fn parse_facts(input: &str) -> (Vec<Fact>, Vec<Error>) {
    let mut facts = Vec::new();
    let mut errors = Vec::new();

    for (i, line) in input.lines().enumerate() {
        match Fact::from_csv_line(line) {
            Ok(Some(fact)) => facts.push(fact),
            Ok(None) => {}
            Err(e) => {
                let e = e.at_line(i + 1);
                tracing::debug!("Skipping record: {}", e);
                errors.push(e);
            }
        }
    }

    (facts, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let fact = Fact::from_csv_line("5,0,1,cat,1,is,a,mammal,2,3,a small feline,")
            .unwrap()
            .unwrap();

        assert_eq!(fact.front_weight, 5);
        assert!(fact.truth);
        assert_eq!(fact.subject, "cat");
        assert_eq!(fact.subject_id, 1);
        assert_eq!(fact.verb, "is");
        assert_eq!(fact.descriptor, "a");
        assert_eq!(fact.object, "mammal");
        assert_eq!(fact.object_id, 2);
        assert_eq!(fact.back_weight, 3);
        assert_eq!(fact.definition, "a small feline");
        assert!(fact.end_time.is_none());
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let fact = Fact::from_csv_line("2,,0,dog,,eats,,bone").unwrap().unwrap();
        assert_eq!(fact.inference, 0);
        assert!(!fact.truth);
        assert_eq!(fact.subject_id, 0);
        assert_eq!(fact.descriptor, "");
        assert_eq!(fact.back_weight, 0);
        assert_eq!(fact.definition, "");
    }

    #[test]
    fn test_any_nonzero_truth_is_true() {
        let fact = Fact::from_csv_line("1,0,7,a,1,b,,c,2,1,,").unwrap().unwrap();
        assert!(fact.truth);
    }

    #[test]
    fn test_blank_line() {
        assert!(Fact::from_csv_line("").unwrap().is_none());
        assert!(Fact::from_csv_line("   \r").unwrap().is_none());
    }

    #[test]
    fn test_crlf_is_stripped() {
        let fact = Fact::from_csv_line("1,0,1,a,1,b,,c,2,1,def\r").unwrap().unwrap();
        assert_eq!(fact.definition, "def");
    }

    #[test]
    fn test_bad_number() {
        let err = Fact::from_csv_line("heavy,0,1,a,1,b,,c,2,1,,").unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "front_weight", .. }));
    }

    #[test]
    fn test_too_many_fields() {
        let err = Fact::from_csv_line("1,0,1,a,1,b,,c,2,1,,,extra").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
    }

    #[test]
    fn test_missing_required_name() {
        let err = Fact::from_csv_line("1,0,1,a,1,,,c,2,1,,").unwrap_err();
        assert!(err.to_string().contains("missing verb"));
    }

    #[test]
    fn test_end_time_formats() {
        let unix = Fact::from_csv_line("1,0,1,a,1,b,,c,2,1,,1700000000").unwrap().unwrap();
        assert_eq!(unix.end_time.unwrap().timestamp(), 1_700_000_000);

        let rfc = Fact::from_csv_line("1,0,1,a,1,b,,c,2,1,,2023-11-14T22:13:20Z")
            .unwrap()
            .unwrap();
        assert_eq!(rfc.end_time, unix.end_time);

        let err = Fact::from_csv_line("1,0,1,a,1,b,,c,2,1,,tomorrow").unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "end_time", .. }));
    }

    #[test]
    fn test_to_csv_line_reparses() {
        let fact = Fact::new("cat", "is", "mammal")
            .with_ids(1, 2)
            .with_weights(5, 3)
            .with_descriptor("a")
            .with_definition("a small feline");
        let line = fact.to_csv_line();
        assert_eq!(line, "5,0,1,cat,1,is,a,mammal,2,3,a small feline,");
        assert_eq!(Fact::from_csv_line(&line).unwrap(), Some(fact));
    }

    #[test]
    fn test_parse_facts_reports_line_numbers() {
        let doc = "5,0,1,cat,1,is,a,mammal,2,3,,\n\nbad,0,1,x,1,y,,z,2,1,,\n1,0,0,dog,3,is,a,cat,1,1,,\n";
        let (facts, errors) = parse_facts(doc);

        assert_eq!(facts.len(), 2);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::MalformedRecord { line: Some(3), .. }));
    }
}
