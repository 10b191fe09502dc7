use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use model::records::record::Record;
use std::{
    fs::File,
    io::{BufRead, BufReader, Split},
    path::Path,
};
use tracing::{debug, warn};

/// Smallest key the input may carry; record offsets are `key - MIN_KEY`.
pub const MIN_KEY: i64 = 1;

/// Classification of one physical input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Blank,
    Malformed,
    Keyed(i64),
}

/// Parses a single physical line as header-less, flexible CSV. Each line gets
/// its own reader, so an unbalanced quote ends with the line instead of
/// swallowing the ones after it. Returns `None` for an empty line.
pub fn parse_line(line: &[u8]) -> Result<Option<StringRecord>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line);
    let mut record = StringRecord::new();
    let read = reader.read_record(&mut record)?;
    Ok(read.then_some(record))
}

/// Iterates over the keyed records of an input file, skipping blank lines and
/// warning about malformed ones. Only I/O errors are surfaced.
pub struct KeyedLines {
    lines: Split<BufReader<File>>,
    line: u64,
    malformed: u64,
}

impl KeyedLines {
    pub fn open(path: &Path) -> Result<Self, csv::Error> {
        let file = File::open(path)?;
        Ok(KeyedLines {
            lines: BufReader::new(file).split(b'\n'),
            line: 0,
            malformed: 0,
        })
    }

    /// Lines skipped so far because their leading field was not a key.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

impl Iterator for KeyedLines {
    type Item = Result<(i64, StringRecord), csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }

            let record = match parse_line(&raw) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    self.malformed += 1;
                    warn!(line = self.line, error = %e, "Skipping malformed input line");
                    continue;
                }
            };

            match classify(&record) {
                InputLine::Keyed(key) => return Some(Ok((key, record))),
                InputLine::Blank => continue,
                InputLine::Malformed => {
                    self.malformed += 1;
                    warn!(
                        line = self.line,
                        leading_field = record.get(0).unwrap_or_default(),
                        "Skipping malformed input line"
                    );
                }
            }
        }
    }
}

/// A line is blank only when it is whitespace; delimiters alone (`,,`) make
/// it malformed.
pub fn classify(record: &StringRecord) -> InputLine {
    if record.len() <= 1 && record.iter().all(|field| field.trim().is_empty()) {
        return InputLine::Blank;
    }

    match record.get(0).and_then(parse_key) {
        Some(key) => InputLine::Keyed(key),
        None => InputLine::Malformed,
    }
}

/// Keys below `MIN_KEY` cannot be placed in any partition and are treated as
/// malformed.
pub fn parse_key(field: &str) -> Option<i64> {
    field
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|key| *key >= MIN_KEY)
}

/// Builds a record from a keyed line. Payload and timestamp fall back to
/// `None` when missing or unparseable; fields past the third are ignored.
pub fn to_record(key: i64, record: &StringRecord) -> Record {
    let payload = record.get(1).map(str::to_owned);
    let created_at = record.get(2).and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            debug!(id = key, raw, "Unparseable createdAt, leaving it empty");
        }
        parsed
    });

    Record {
        id: Some(key),
        payload,
        created_at,
    }
}

/// ISO-8601 local date-time, with or without seconds and fraction.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").ok())
}
