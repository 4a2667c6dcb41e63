//! Parsing of single `[DATA,...]` lines.
//!
//! Expected shape (metadata, whitespace, payload):
//! [DATA,timestamp,KIND,ORIGIN,tag] payload...
//!
//! Example:
//! [DATA,1700000000,AVERAGE,BACK-END,compile_ms]  42

use crate::data::error::ExtractError;
use std::fmt;

/// Literal prefix that marks a structured data line.
pub const DATA_MARKER: &str = "[DATA,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionKind {
    /// Concatenate payloads in timestamp order.
    List,
    /// Arithmetic mean of integer payloads.
    Average,
}

impl ReductionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "LIST" => Some(Self::List),
            "AVERAGE" => Some(Self::Average),
            _ => None,
        }
    }
}

/// Compilation phase that printed a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Origin {
    FrontEnd,
    BackEnd,
    Whole,
}

impl Origin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "FRONT-END" => Some(Self::FrontEnd),
            "BACK-END" => Some(Self::BackEnd),
            "WHOLE" => Some(Self::Whole),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FrontEnd => "FRONT-END",
            Self::BackEnd => "BACK-END",
            Self::Whole => "WHOLE",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed measurement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: i64,
    pub kind: ReductionKind,
    pub origin: Origin,
    pub tag: String,
    pub payload: String,
}

impl LogRecord {
    /// Parse one stdout line.
    ///
    /// Returns `Ok(None)` for lines that do not start with [`DATA_MARKER`];
    /// those are ordinary program output. A marker line with a bad header is
    /// an error rather than being skipped.
    pub fn parse(line: &str) -> Result<Option<Self>, ExtractError> {
        if !line.starts_with(DATA_MARKER) {
            return Ok(None);
        }
        let line = line.strip_suffix('\r').unwrap_or(line);

        let malformed = |reason: String| ExtractError::MalformedLogLine {
            line: line.to_string(),
            reason,
        };

        // The payload is everything after the first whitespace run, verbatim.
        let (head, payload) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim_start()),
            None => (line, ""),
        };

        let inner = head
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .ok_or_else(|| malformed("metadata is not closed by ']'".to_string()))?;

        // marker, timestamp, kind, origin, tag (tag keeps any further commas)
        let fields: Vec<&str> = inner.splitn(5, ',').collect();
        let &[_, timestamp, kind, origin, tag] = fields.as_slice() else {
            return Err(malformed(format!(
                "expected [DATA,timestamp,kind,origin,tag], got {} field(s)",
                fields.len()
            )));
        };

        let timestamp = timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| malformed(format!("timestamp {:?} is not an integer", timestamp)))?;
        let kind = ReductionKind::from_name(kind)
            .ok_or_else(|| malformed(format!("unknown reduction kind {:?}", kind)))?;
        let origin =
            Origin::from_name(origin).ok_or_else(|| malformed(format!("unknown origin {:?}", origin)))?;

        Ok(Some(LogRecord {
            timestamp,
            kind,
            origin,
            tag: tag.to_string(),
            payload: payload.to_string(),
        }))
    }
}

/// Collect every data record from a captured stdout, in emission order.
pub fn parse_output(text: &str) -> Result<Vec<LogRecord>, ExtractError> {
    let mut out = Vec::new();
    for line in text.lines() {
        if let Some(record) = LogRecord::parse(line)? {
            out.push(record);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_header_and_payload() {
        let record = LogRecord::parse("[DATA,17,LIST,FRONT-END,passes]  a, b  c")
            .unwrap()
            .unwrap();
        assert_eq!(
            record,
            LogRecord {
                timestamp: 17,
                kind: ReductionKind::List,
                origin: Origin::FrontEnd,
                tag: "passes".to_string(),
                payload: "a, b  c".to_string(),
            }
        );
    }

    #[test]
    fn ignores_ordinary_output() {
        assert_eq!(LogRecord::parse("checksum = 0x1234").unwrap(), None);
        assert_eq!(LogRecord::parse(" [DATA,1,LIST,WHOLE,t] x").unwrap(), None);
        assert_eq!(LogRecord::parse("").unwrap(), None);
    }

    #[test]
    fn marker_without_payload_is_empty() {
        let record = LogRecord::parse("[DATA,3,AVERAGE,WHOLE,total]").unwrap().unwrap();
        assert_eq!(record.payload, "");
        assert_eq!(record.tag, "total");
    }

    #[test]
    fn payload_keeps_trailing_whitespace() {
        let record = LogRecord::parse("[DATA,0,LIST,WHOLE,t]\ta  \r").unwrap().unwrap();
        assert_eq!(record.payload, "a  ");

        let blank = LogRecord::parse("[DATA,0,LIST,WHOLE,t] ").unwrap().unwrap();
        assert_eq!(blank.payload, "");
    }

    #[test]
    fn rejects_bad_timestamp() {
        let err = LogRecord::parse("[DATA,soon,LIST,WHOLE,t] x").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedLogLine { .. }));
    }

    #[test]
    fn rejects_unknown_kind_and_origin() {
        assert!(matches!(
            LogRecord::parse("[DATA,1,MEDIAN,WHOLE,t] 1"),
            Err(ExtractError::MalformedLogLine { .. })
        ));
        assert!(matches!(
            LogRecord::parse("[DATA,1,LIST,LINKER,t] 1"),
            Err(ExtractError::MalformedLogLine { .. })
        ));
    }

    #[test]
    fn rejects_short_or_unclosed_header() {
        assert!(LogRecord::parse("[DATA,1,LIST,WHOLE] x").is_err());
        assert!(LogRecord::parse("[DATA,1,LIST,WHOLE,t x").is_err());
    }

    #[test]
    fn parse_output_keeps_emission_order() {
        let text = "hello\n[DATA,2,LIST,BACK-END,b] 1\nnoise\r\n[DATA,1,LIST,WHOLE,a] 2\r\n";
        let records = parse_output(text).unwrap();
        let tags: Vec<&str> = records.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["b", "a"]);
        assert_eq!(records[1].payload, "2");
    }
}
