//! Body reading: the streaming state machine.
//!
//! Walks the data section line by line, maintaining the current
//! interval frequency and per-environment accumulators. Numeric
//! results are appended into per-frequency per-id sequences with NaN
//! pre-fill so every series for a frequency stays step-aligned; peak
//! side-values are routed into a parallel store for daily and coarser
//! frequencies.

use super::lines::{parse_interval_record, parse_values, split_body_line, IntervalRecord};
use super::LineSource;
use crate::config::ParseConfig;
use crate::constants::END_OF_DATA;
use crate::error::{EsoError, Result};
use crate::models::{Frequency, Header, IntervalTuple, PeakEntry};
use std::collections::BTreeMap;
use std::io::BufRead;
use tracing::{debug, warn};

/// Raw accumulators for one simulation environment.
#[derive(Debug, Clone, Default)]
pub struct RawEnvironment {
    pub name: String,
    pub dates: BTreeMap<Frequency, Vec<IntervalTuple>>,
    pub day_of_week: BTreeMap<Frequency, Vec<String>>,
    pub cumulative_days: BTreeMap<Frequency, Vec<u32>>,
    pub outputs: BTreeMap<Frequency, BTreeMap<i32, Vec<f64>>>,
    pub peak_outputs: BTreeMap<Frequency, BTreeMap<i32, Vec<PeakEntry>>>,
}

impl RawEnvironment {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Number of steps recorded for a frequency.
    pub fn step_count(&self, frequency: Frequency) -> usize {
        self.dates.get(&frequency).map(|d| d.len()).unwrap_or(0)
    }

    /// Drop one id's series everywhere it appears.
    pub fn purge_id(&mut self, frequency: Frequency, id: i32) {
        if let Some(series) = self.outputs.get_mut(&frequency) {
            series.remove(&id);
        }
        if let Some(series) = self.peak_outputs.get_mut(&frequency) {
            series.remove(&id);
        }
    }
}

/// Body reader owning all mutable parse state for one file.
struct BodyReader<'a> {
    header: &'a Header,
    config: &'a ParseConfig,
    last_standard_item_id: i32,
    environments: Vec<RawEnvironment>,
    /// Frequency of the interval currently receiving data lines;
    /// `None` while the interval's frequency is untracked, so its data
    /// lines are discarded rather than attributed.
    current: Option<Frequency>,
}

/// Read the data section until its terminator, returning one raw
/// accumulator set per environment encountered.
pub fn read_body<R: BufRead>(
    source: &mut LineSource<R>,
    header: &Header,
    config: &ParseConfig,
    last_standard_item_id: i32,
) -> Result<Vec<RawEnvironment>> {
    let mut reader = BodyReader {
        header,
        config,
        last_standard_item_id,
        environments: Vec::new(),
        current: None,
    };

    loop {
        let Some(line) = source.next_line()? else {
            return Err(EsoError::MissingSentinel {
                sentinel: END_OF_DATA.to_string(),
            });
        };
        if line.contains(END_OF_DATA) {
            break;
        }
        if line.trim().is_empty() {
            return Err(EsoError::BlankLine {
                line: source.line_no(),
            });
        }
        reader.process_line(&line, source.line_no())?;
    }

    debug!("Read body: {} environments", reader.environments.len());
    Ok(reader.environments)
}

impl<'a> BodyReader<'a> {
    fn process_line(&mut self, line: &str, line_no: usize) -> Result<()> {
        let (id, fields) = split_body_line(line, line_no)?;
        if id <= self.last_standard_item_id {
            let record = parse_interval_record(id, &fields, line_no)?;
            self.process_interval(record);
            Ok(())
        } else {
            self.process_data(id, &fields, line_no)
        }
    }

    fn environment(&mut self) -> &mut RawEnvironment {
        if self.environments.is_empty() {
            warn!("Data before any environment marker; creating unnamed environment");
            self.environments.push(RawEnvironment::new(String::new()));
        }
        self.environments.last_mut().expect("non-empty")
    }

    fn process_interval(&mut self, record: IntervalRecord) {
        match record {
            IntervalRecord::Environment { name } => {
                debug!("New environment: {}", name);
                self.environments.push(RawEnvironment::new(name));
            }
            IntervalRecord::SubHourly {
                tuple,
                start_minute,
                day,
            } => {
                let frequency = self.resolve_sub_hourly(&tuple, start_minute);
                self.open_interval(frequency, tuple, Some(day), None);
            }
            IntervalRecord::Daily { tuple, day } => {
                self.open_interval(Frequency::Daily, tuple, Some(day), None);
            }
            IntervalRecord::Monthly {
                tuple,
                cumulative_days,
            } => {
                self.open_interval(Frequency::Monthly, tuple, None, Some(cumulative_days));
            }
            IntervalRecord::Runperiod { cumulative_days } => {
                self.open_interval(
                    Frequency::Runperiod,
                    IntervalTuple::new(1, 1, 0, 0),
                    None,
                    Some(cumulative_days),
                );
            }
            IntervalRecord::Annual { .. } => {
                self.open_interval(Frequency::Annual, IntervalTuple::new(1, 1, 0, 0), None, None);
            }
        }
    }

    /// Marker id 2 serves both sub-hourly frequencies: a span shorter
    /// than a full hour denotes timestep reporting. When the resolved
    /// frequency has no variables but its sibling does, the marker
    /// belongs to the sibling (60-minute timesteps, `Each Call`).
    fn resolve_sub_hourly(&self, tuple: &IntervalTuple, start_minute: u32) -> Frequency {
        let span = tuple.end_minute.saturating_sub(start_minute);
        let (resolved, sibling) = if span < 60 {
            (Frequency::Timestep, Frequency::Hourly)
        } else {
            (Frequency::Hourly, Frequency::Timestep)
        };
        if !self.header.contains_frequency(resolved) && self.header.contains_frequency(sibling) {
            sibling
        } else {
            resolved
        }
    }

    fn open_interval(
        &mut self,
        frequency: Frequency,
        tuple: IntervalTuple,
        day: Option<String>,
        cumulative_days: Option<u32>,
    ) {
        if self.config.is_excluded(frequency) || !self.header.contains_frequency(frequency) {
            // Subsequent data lines for this interval are discarded.
            self.current = None;
            return;
        }

        let track_peaks = self.config.track_peaks && frequency.has_peaks();
        let ids: Vec<i32> = self.header.ids(frequency);
        let env = self.environment();

        env.dates.entry(frequency).or_default().push(tuple);
        if let Some(day) = day {
            env.day_of_week.entry(frequency).or_default().push(day);
        }
        if let Some(cumulative) = cumulative_days {
            env.cumulative_days
                .entry(frequency)
                .or_default()
                .push(cumulative);
        }

        // Pre-fill every known id so series stay step-aligned even
        // when an id is not reported this step.
        let outputs = env.outputs.entry(frequency).or_default();
        for &id in &ids {
            outputs.entry(id).or_default().push(f64::NAN);
        }
        if track_peaks {
            let peaks = env.peak_outputs.entry(frequency).or_default();
            for &id in &ids {
                peaks.entry(id).or_default().push(PeakEntry::nan());
            }
        }

        self.current = Some(frequency);
    }

    fn process_data(&mut self, id: i32, fields: &[String], line_no: usize) -> Result<()> {
        let Some(frequency) = self.current else {
            return Ok(());
        };
        let values = parse_values(fields, line_no)?;
        let Some(&scalar) = values.first() else {
            return Err(EsoError::InvalidLine {
                line: line_no,
                content: format!("{}", id),
            });
        };
        let track_peaks = self.config.track_peaks && frequency.has_peaks();
        let env = self.environment();

        let Some(series) = env.outputs.get_mut(&frequency).and_then(|m| m.get_mut(&id)) else {
            warn!(
                "Data line for unknown id {} at line {}; discarding",
                id, line_no
            );
            return Ok(());
        };
        if let Some(last) = series.last_mut() {
            *last = scalar;
        }

        if track_peaks {
            let entry = PeakEntry::from_fields(frequency, &values[1..]).ok_or_else(|| {
                EsoError::InvalidLine {
                    line: line_no,
                    content: format!("{},{}", id, fields.join(",")),
                }
            })?;
            let peaks = env.peak_outputs.get_mut(&frequency).and_then(|m| m.get_mut(&id));
            // The peak store mirrors the numeric store id-for-id.
            debug_assert!(peaks.is_some(), "peak store missing id {}", id);
            if let Some(peaks) = peaks {
                if let Some(last) = peaks.last_mut() {
                    *last = entry;
                }
            }
        }
        Ok(())
    }
}
