use crate::error::{Error, Result};
use crate::matrix::VariantMatrix;
use csv;
use log::debug;
use std::collections::VecDeque;
use std::io::Read;

/// The states observed at one site, across every sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteRecord {
    pub position: f64,
    pub states: Vec<i8>,
}

impl SiteRecord {
    pub fn new(position: f64, states: Vec<i8>) -> Self {
        Self { position, states }
    }
}

/// Anything that can populate a [`VariantMatrix`] site by site.
///
/// A source knows its sample and site counts up front and yields one
/// `SiteRecord` per site, in order. Adapters for simulation output or
/// other formats implement this instead of being probed at runtime.
pub trait VariantSource: Iterator<Item = Result<SiteRecord>> {
    fn nsam(&self) -> usize;
    fn nsites(&self) -> usize;
}

/// An in-memory source over records that have already been collected.
pub struct Records {
    nsam: usize,
    nsites: usize,
    records: std::vec::IntoIter<SiteRecord>,
}

impl Records {
    pub fn new(nsam: usize, records: Vec<SiteRecord>) -> Self {
        Self {
            nsam,
            nsites: records.len(),
            records: records.into_iter(),
        }
    }
}

impl Iterator for Records {
    type Item = Result<SiteRecord>;

    fn next(&mut self) -> Option<Result<SiteRecord>> {
        self.records.next().map(Ok)
    }
}

impl VariantSource for Records {
    fn nsam(&self) -> usize {
        self.nsam
    }

    fn nsites(&self) -> usize {
        self.nsites
    }
}

/// Produces site records from delimited text, one site per row.
///
/// `Csv` is a [`VariantSource`] so it can be passed directly to
/// [`VariantMatrix::from_source`].
pub struct Csv {
    sample_names: Option<Vec<String>>,
    nsam: usize,
    nsites: usize,
    record_buffer: VecDeque<SiteRecord>,
}

impl Csv {
    /// Sample names taken from the header row, if there was one.
    pub fn sample_names(&self) -> Option<&[String]> {
        self.sample_names.as_deref()
    }
}

impl Iterator for Csv {
    type Item = Result<SiteRecord>;

    fn next(&mut self) -> Option<Result<SiteRecord>> {
        self.record_buffer.pop_front().map(Ok)
    }
}

impl VariantSource for Csv {
    fn nsam(&self) -> usize {
        self.nsam
    }

    fn nsites(&self) -> usize {
        self.nsites
    }
}

pub struct CsvBuilder {
    headers: bool,
    delimiter: u8,
    position_field: usize,
    missing: String,
}

impl Default for CsvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvBuilder {
    /// Construct a new Csv builder
    ///
    /// Defaults: a header row, comma delimited, the position in the first
    /// column and `N` marking missing data.
    pub fn new() -> Self {
        Self {
            headers: true,
            delimiter: b',',
            position_field: 0,
            missing: "N".to_owned(),
        }
    }

    pub fn headers(&mut self, headers: bool) -> &mut Self {
        self.headers = headers;
        self
    }

    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    /// Column holding the site position.
    pub fn position_field(&mut self, position_field: usize) -> &mut Self {
        self.position_field = position_field;
        self
    }

    /// Token read as [`VariantMatrix::MASK`].
    pub fn missing(&mut self, missing: &str) -> &mut Self {
        self.missing = missing.to_owned();
        self
    }

    /// Reads and validates every row up front, so the site count is known
    /// before the first record is handed out.
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<Csv> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(self.headers)
            .delimiter(self.delimiter)
            .from_reader(reader);

        let sample_names = if self.headers {
            Some(
                rdr.headers()?
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != self.position_field)
                    .map(|(_, s)| s.to_owned())
                    .collect::<Vec<_>>(),
            )
        } else {
            None
        };

        let mut nsam = sample_names.as_ref().map(|names| names.len());
        let mut record_buffer = VecDeque::new();
        for (idx, row) in rdr.records().enumerate() {
            let row = row?;
            let line = row.position().map_or(idx + 1, |p| p.line() as usize);
            let record = self.parse_row(&row, line)?;
            match nsam {
                Some(n) if n != record.states.len() => {
                    return Err(Error::parse(
                        line,
                        format!("expected {} states, found {}", n, record.states.len()),
                    ));
                }
                Some(_) => {}
                None => nsam = Some(record.states.len()),
            }
            record_buffer.push_back(record);
        }

        debug!("read {} sites from delimited input", record_buffer.len());
        Ok(Csv {
            sample_names,
            nsam: nsam.unwrap_or(0),
            nsites: record_buffer.len(),
            record_buffer,
        })
    }

    fn parse_row(&self, row: &csv::StringRecord, line: usize) -> Result<SiteRecord> {
        let field = row.get(self.position_field).ok_or_else(|| {
            Error::parse(line, format!("no position in column {}", self.position_field))
        })?;
        let position = field
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::parse(line, format!("bad position {:?}: {}", field, e)))?;

        let mut states = Vec::with_capacity(row.len().saturating_sub(1));
        for (i, field) in row.iter().enumerate() {
            if i == self.position_field {
                continue;
            }
            let field = field.trim();
            if field == self.missing {
                states.push(VariantMatrix::MASK);
                continue;
            }
            let state = field
                .parse::<i8>()
                .map_err(|e| Error::parse(line, format!("bad state {:?}: {}", field, e)))?;
            if state == VariantMatrix::MASK {
                return Err(Error::parse(
                    line,
                    format!("state {} is reserved for missing data", state),
                ));
            }
            states.push(state);
        }
        Ok(SiteRecord::new(position, states))
    }
}
