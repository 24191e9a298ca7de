//! Reader for Hudson's `ms` output format.
//!
//! Each replicate starts with a `//` line, followed by `segsites: S`, a
//! `positions:` line with `S` values and one `0`/`1` haplotype line per
//! sample. Anything before the first `//` (the command line and seeds) is
//! skipped.

use crate::error::{Error, Result};
use crate::polytable::SimData;
use log::trace;
use std::io::{BufRead, Lines};

/// Iterates over the replicates of an `ms` stream.
pub struct MsReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    pending: Option<String>,
}

impl<R: BufRead> MsReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn next_nonblank(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.next_line()? {
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn expect_field(&mut self, key: &str) -> Result<String> {
        let line = self
            .next_nonblank()?
            .ok_or_else(|| Error::parse(self.line_no, format!("expected {:?}, got end of input", key)))?;
        match line.trim().strip_prefix(key) {
            Some(rest) => Ok(rest.trim().to_owned()),
            None => Err(Error::parse(
                self.line_no,
                format!("expected {:?}, got {:?}", key, line),
            )),
        }
    }

    fn read_replicate(&mut self) -> Result<Option<SimData>> {
        loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.starts_with("//") => break,
                Some(_) => continue,
            }
        }

        // `ms -T` prints gene trees between `//` and `segsites:`.
        while let Some(line) = self.next_nonblank()? {
            let trimmed = line.trim_start();
            if !(trimmed.starts_with('(') || trimmed.starts_with('[')) {
                self.pending = Some(line);
                break;
            }
        }

        let segsites = self.expect_field("segsites:")?;
        let segsites: usize = segsites
            .parse()
            .map_err(|e| Error::parse(self.line_no, format!("bad segsites {:?}: {}", segsites, e)))?;
        if segsites == 0 {
            return Ok(Some(SimData::new()));
        }

        let positions = self
            .expect_field("positions:")?
            .split_whitespace()
            .map(|p| {
                p.parse::<f64>()
                    .map_err(|e| Error::parse(self.line_no, format!("bad position {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        if positions.len() != segsites {
            return Err(Error::parse(
                self.line_no,
                format!("{} positions for {} segregating sites", positions.len(), segsites),
            ));
        }

        let mut haplotypes = vec![];
        while let Some(line) = self.next_line()? {
            if line.starts_with("//") {
                self.pending = Some(line);
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            if line.len() != segsites {
                return Err(Error::parse(
                    self.line_no,
                    format!("haplotype has {} sites, expected {}", line.len(), segsites),
                ));
            }
            haplotypes.push(line.to_owned());
        }

        trace!(
            "ms replicate with {} sites and {} samples",
            segsites,
            haplotypes.len()
        );
        SimData::from_haplotypes(positions, haplotypes).map(Some)
    }
}

impl<R: BufRead> Iterator for MsReader<R> {
    type Item = Result<SimData>;

    fn next(&mut self) -> Option<Result<SimData>> {
        self.read_replicate().transpose()
    }
}
