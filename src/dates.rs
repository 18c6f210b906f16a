//! Interval and date reconciliation.
//!
//! Turns the raw month/day/hour/minute tuples collected during body
//! reading into calendar-correct timestamps: end-of-period boundary
//! rollover, base-year inference from the leap-year and start-weekday
//! signal, multi-year rollover detection and per-period day counts.

use crate::constants::{REFERENCE_YEAR, WEEKDAYS, YEAR_SEARCH_SPAN};
use crate::error::{EsoError, Result};
use crate::models::{Frequency, IntervalTuple};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use std::collections::BTreeMap;
use tracing::debug;

/// Finalized per-frequency date information for one environment.
#[derive(Debug, Clone, Default)]
pub struct ReconciledDates {
    pub datetimes: BTreeMap<Frequency, Vec<NaiveDateTime>>,
    pub n_days: BTreeMap<Frequency, Vec<i32>>,
    pub year: i32,
}

/// Convert raw EnergyPlus date fields into a calendar timestamp.
///
/// The source encodes end-of-period boundaries with `hour == 24` and
/// `end_minute == 60`, which are not valid calendar values:
/// - both markers present rolls to the first minute of the next day,
/// - a bare `end_minute == 60` rolls to the top of the next hour,
/// - `hour == 0` (monthly and coarser, no sub-day time) passes through,
/// - otherwise the 1-based "hour ending" label shifts down by one.
pub fn parse_eplus_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    end_minute: u32,
) -> Result<NaiveDateTime> {
    let invalid = || EsoError::InvalidDate {
        year,
        month,
        day,
        hour,
        minute: end_minute,
    };
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    let datetime = if hour == 24 && end_minute == 60 {
        date.succ_opt()
            .ok_or_else(invalid)?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(invalid)?
    } else if end_minute == 60 {
        date.and_hms_opt(hour, 0, 0).ok_or_else(invalid)?
    } else if hour == 0 {
        date.and_hms_opt(0, end_minute, 0).ok_or_else(invalid)?
    } else {
        date.and_hms_opt(hour - 1, end_minute, 0).ok_or_else(invalid)?
    };
    Ok(datetime)
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Map an interval day-type label to a calendar weekday.
///
/// Design-day and holiday labels do not pin the calendar and yield
/// `None`.
pub fn parse_weekday(day: &str) -> Option<Weekday> {
    match WEEKDAYS.iter().position(|w| w.eq_ignore_ascii_case(day))? {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        _ => Some(Weekday::Sun),
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAYS[weekday.num_days_from_monday() as usize]
}

/// Search backward from the reference year for the most recent year
/// matching the observed leap flag and, when known, the weekday of the
/// first record (`first_month`/`first_day` locate that record within
/// the year).
pub fn seek_year(
    is_leap: bool,
    first_month: u32,
    first_day: u32,
    start_day: Option<Weekday>,
) -> Result<i32> {
    for year in (REFERENCE_YEAR - YEAR_SEARCH_SPAN..=REFERENCE_YEAR).rev() {
        if is_leap_year(year) != is_leap {
            continue;
        }
        match start_day {
            None => return Ok(year),
            Some(expected) => {
                if let Some(date) = NaiveDate::from_ymd_opt(year, first_month, first_day) {
                    if date.weekday() == expected {
                        return Ok(year);
                    }
                }
            }
        }
    }
    Err(EsoError::YearNotFound {
        reference: REFERENCE_YEAR,
        span: YEAR_SEARCH_SPAN,
        is_leap,
        start_day: start_day.map(|d| weekday_name(d).to_string()),
    })
}

/// Check an explicitly supplied year against the signal inferred from
/// the data. Leap-ness and start weekday each have their own error.
pub fn validate_year(
    year: i32,
    is_leap: bool,
    first_month: u32,
    first_day: u32,
    start_day: Option<Weekday>,
) -> Result<()> {
    if is_leap_year(year) != is_leap {
        return Err(EsoError::LeapYearMismatch {
            year,
            expected_leap: is_leap,
        });
    }
    if let Some(expected) = start_day {
        if let Some(date) = NaiveDate::from_ymd_opt(year, first_month, first_day) {
            if date.weekday() != expected {
                return Err(EsoError::StartDayMismatch {
                    year,
                    expected: weekday_name(expected).to_string(),
                    actual: weekday_name(date.weekday()).to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Year-rollover heuristic: a step whose tuple is lexicographically not
/// later than the environment's first tuple has wrapped into a new
/// year. Known approximation; misfires on mid-year simulation starts.
pub fn check_year_increment(first: &IntervalTuple, current: &IntervalTuple) -> bool {
    current <= first
}

/// Walk one environment's raw tuples for a frequency, tracking the
/// running year, and convert each to a timestamp.
pub fn generate_datetimes(
    start_year: i32,
    tuples: &[IntervalTuple],
) -> Result<Vec<NaiveDateTime>> {
    let mut datetimes = Vec::with_capacity(tuples.len());
    let Some(first) = tuples.first() else {
        return Ok(datetimes);
    };
    let mut year = start_year;
    for (i, tuple) in tuples.iter().enumerate() {
        if i > 0 && check_year_increment(first, tuple) {
            year += 1;
        }
        datetimes.push(parse_eplus_datetime(
            year,
            tuple.month,
            tuple.day,
            tuple.hour,
            tuple.end_minute,
        )?);
    }
    Ok(datetimes)
}

/// Per-period day counts from strictly increasing cumulative counts;
/// the first value is kept as-is.
pub fn n_days_from_cumulative(cumulative: &[u32]) -> Vec<i32> {
    cumulative
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if i == 0 {
                c as i32
            } else {
                c as i32 - cumulative[i - 1] as i32
            }
        })
        .collect()
}

/// Whether the raw data of the finest available frequency indicates a
/// leap year.
fn detect_leap(
    frequency: Frequency,
    tuples: &[IntervalTuple],
    cumulative_days: &BTreeMap<Frequency, Vec<u32>>,
) -> bool {
    match frequency {
        Frequency::Timestep | Frequency::Hourly | Frequency::Daily => {
            tuples.iter().any(|t| t.month == 2 && t.day == 29)
        }
        Frequency::Monthly => {
            let n_days = cumulative_days
                .get(&Frequency::Monthly)
                .map(|c| n_days_from_cumulative(c))
                .unwrap_or_default();
            tuples
                .iter()
                .zip(n_days.iter())
                .any(|(t, &n)| t.month == 2 && n == 29)
        }
        Frequency::Annual | Frequency::Runperiod => cumulative_days
            .get(&frequency)
            .map(|c| n_days_from_cumulative(c).first() == Some(&366))
            .unwrap_or(false),
    }
}

/// Reconcile one environment's raw date data into final timestamps and
/// day-count columns.
pub fn reconcile(
    dates: &BTreeMap<Frequency, Vec<IntervalTuple>>,
    day_of_week: &BTreeMap<Frequency, Vec<String>>,
    cumulative_days: &BTreeMap<Frequency, Vec<u32>>,
    explicit_year: Option<i32>,
) -> Result<ReconciledDates> {
    let mut reconciled = ReconciledDates::default();
    let Some((&finest, finest_tuples)) = dates.iter().find(|(_, t)| !t.is_empty()) else {
        return Ok(reconciled);
    };
    let first = finest_tuples[0];

    // Leap-year and weekday signal come from the finest frequency.
    let is_leap = detect_leap(finest, finest_tuples, cumulative_days);
    let start_day = if finest.is_sub_daily() || finest == Frequency::Daily {
        day_of_week
            .get(&finest)
            .and_then(|days| days.first())
            .and_then(|d| parse_weekday(d))
    } else {
        None
    };

    let year = match explicit_year {
        Some(year) => {
            validate_year(year, is_leap, first.month, first.day, start_day)?;
            year
        }
        None => seek_year(is_leap, first.month, first.day, start_day)?,
    };
    debug!(
        "Reconciling dates with base year {} (leap={}, start_day={:?})",
        year, is_leap, start_day
    );
    reconciled.year = year;

    for (&frequency, tuples) in dates {
        let datetimes = generate_datetimes(year, tuples)?;
        reconciled.datetimes.insert(frequency, datetimes);
    }

    // Day counts: monthly from cumulative first-differences, runperiod
    // straight from the cumulative values, annual from the runperiod
    // total split across annual periods.
    if let Some(cumulative) = cumulative_days.get(&Frequency::Monthly) {
        reconciled
            .n_days
            .insert(Frequency::Monthly, n_days_from_cumulative(cumulative));
    }
    if let Some(cumulative) = cumulative_days.get(&Frequency::Runperiod) {
        reconciled.n_days.insert(
            Frequency::Runperiod,
            cumulative.iter().map(|&c| c as i32).collect(),
        );
    }
    if let Some(annual_dates) = reconciled.datetimes.get(&Frequency::Annual) {
        let count = annual_dates.len();
        if count > 0 {
            let n_days = match cumulative_days.get(&Frequency::Runperiod) {
                Some(rp) if !rp.is_empty() => {
                    let total = *rp.last().unwrap() as i32;
                    vec![total / count as i32; count]
                }
                _ => annual_dates
                    .iter()
                    .map(|d| if is_leap_year(d.year()) { 366 } else { 365 })
                    .collect(),
            };
            reconciled.n_days.insert(Frequency::Annual, n_days);
        }
    }

    backfill_start_dates(&mut reconciled);
    Ok(reconciled)
}

/// Coarse frequencies carry no sub-day time for their first record;
/// inherit the first timestamp's date, at midnight, from the finest
/// overlapping finer frequency.
fn backfill_start_dates(reconciled: &mut ReconciledDates) {
    let donors = [
        Frequency::Timestep,
        Frequency::Hourly,
        Frequency::Daily,
        Frequency::Monthly,
    ];
    for target in [Frequency::Monthly, Frequency::Annual, Frequency::Runperiod] {
        let Some(donor_start) = donors
            .iter()
            .filter(|&&d| d < target)
            .find_map(|d| reconciled.datetimes.get(d).and_then(|v| v.first()))
            .copied()
        else {
            continue;
        };
        if let Some(dates) = reconciled.datetimes.get_mut(&target) {
            if let Some(start) = dates.first_mut() {
                if start.date().year() == donor_start.date().year() {
                    *start = donor_start.date().and_hms_opt(0, 0, 0).unwrap_or(*start);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_end_of_year_rollover() {
        assert_eq!(
            parse_eplus_datetime(2002, 12, 31, 24, 60).unwrap(),
            dt(2003, 1, 1, 0, 0)
        );
    }

    #[test]
    fn test_end_of_day_rollover() {
        assert_eq!(
            parse_eplus_datetime(2002, 10, 31, 24, 60).unwrap(),
            dt(2002, 11, 1, 0, 0)
        );
    }

    #[test]
    fn test_hour_shift_without_minute_marker() {
        assert_eq!(
            parse_eplus_datetime(2002, 10, 25, 24, 30).unwrap(),
            dt(2002, 10, 25, 23, 30)
        );
    }

    #[test]
    fn test_end_of_hour_rollover() {
        assert_eq!(
            parse_eplus_datetime(2002, 10, 25, 2, 60).unwrap(),
            dt(2002, 10, 25, 2, 0)
        );
    }

    #[test]
    fn test_monthly_passthrough() {
        assert_eq!(
            parse_eplus_datetime(2002, 4, 1, 0, 0).unwrap(),
            dt(2002, 4, 1, 0, 0)
        );
    }

    #[test]
    fn test_invalid_date_rejected() {
        assert!(parse_eplus_datetime(2002, 2, 30, 1, 0).is_err());
        assert!(parse_eplus_datetime(2002, 13, 1, 0, 0).is_err());
    }

    #[test]
    fn test_seek_year_weekday_and_leap() {
        // 2020 is a leap year starting on Wednesday.
        assert_eq!(seek_year(true, 1, 1, Some(Weekday::Wed)).unwrap(), 2020);
        // Most recent non-leap year starting on Tuesday before 2020: 2019.
        assert_eq!(seek_year(false, 1, 1, Some(Weekday::Tue)).unwrap(), 2019);
        // Without weekday constraint the most recent qualifying year wins.
        assert_eq!(seek_year(false, 1, 1, None).unwrap(), 2019);
        assert_eq!(seek_year(true, 1, 1, None).unwrap(), 2020);
    }

    #[test]
    fn test_seek_year_is_deterministic() {
        let a = seek_year(true, 6, 30, Some(Weekday::Fri)).unwrap();
        let b = seek_year(true, 6, 30, Some(Weekday::Fri)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_year_errors_are_distinct() {
        let leap_err = validate_year(2019, true, 1, 1, None).unwrap_err();
        assert!(matches!(leap_err, EsoError::LeapYearMismatch { .. }));

        // 2019-01-01 was a Tuesday.
        let day_err = validate_year(2019, false, 1, 1, Some(Weekday::Mon)).unwrap_err();
        assert!(matches!(day_err, EsoError::StartDayMismatch { .. }));

        assert!(validate_year(2019, false, 1, 1, Some(Weekday::Tue)).is_ok());
    }

    #[test]
    fn test_year_increment_heuristic() {
        let first = IntervalTuple::new(1, 1, 1, 60);
        assert!(check_year_increment(&first, &IntervalTuple::new(1, 1, 1, 60)));
        assert!(!check_year_increment(&first, &IntervalTuple::new(1, 1, 2, 60)));
        assert!(!check_year_increment(&first, &IntervalTuple::new(12, 31, 24, 60)));
    }

    #[test]
    fn test_generate_datetimes_multi_year_monthly() {
        let mut tuples: Vec<IntervalTuple> =
            (1..=12).map(|m| IntervalTuple::new(m, 1, 0, 0)).collect();
        tuples.extend((1..=12).map(|m| IntervalTuple::new(m, 1, 0, 0)));
        let datetimes = generate_datetimes(2002, &tuples).unwrap();
        assert_eq!(datetimes.len(), 24);
        assert_eq!(datetimes[0], dt(2002, 1, 1, 0, 0));
        assert_eq!(datetimes[11], dt(2002, 12, 1, 0, 0));
        assert_eq!(datetimes[12], dt(2003, 1, 1, 0, 0));
        assert_eq!(datetimes[23], dt(2003, 12, 1, 0, 0));
    }

    #[test]
    fn test_generate_datetimes_annual_increments_each_step() {
        let tuples = vec![IntervalTuple::new(1, 1, 0, 0); 3];
        let datetimes = generate_datetimes(2002, &tuples).unwrap();
        assert_eq!(
            datetimes,
            vec![dt(2002, 1, 1, 0, 0), dt(2003, 1, 1, 0, 0), dt(2004, 1, 1, 0, 0)]
        );
    }

    #[test]
    fn test_n_days_first_differences() {
        assert_eq!(n_days_from_cumulative(&[31, 59, 90]), vec![31, 28, 31]);
        assert_eq!(n_days_from_cumulative(&[365]), vec![365]);
        assert_eq!(n_days_from_cumulative(&[]), Vec::<i32>::new());
    }

    #[test]
    fn test_reconcile_infers_year_from_hourly() {
        let mut dates = BTreeMap::new();
        // Most recent non-leap year starting on Tuesday: 2019.
        dates.insert(
            Frequency::Hourly,
            vec![
                IntervalTuple::new(1, 1, 1, 60),
                IntervalTuple::new(1, 1, 2, 60),
            ],
        );
        let mut day_of_week = BTreeMap::new();
        day_of_week.insert(
            Frequency::Hourly,
            vec!["Tuesday".to_string(), "Tuesday".to_string()],
        );
        let reconciled =
            reconcile(&dates, &day_of_week, &BTreeMap::new(), None).unwrap();
        assert_eq!(reconciled.year, 2019);
        let hourly = &reconciled.datetimes[&Frequency::Hourly];
        assert_eq!(hourly[0], dt(2019, 1, 1, 1, 0));
        assert_eq!(hourly[1], dt(2019, 1, 1, 2, 0));
    }

    #[test]
    fn test_reconcile_rejects_contradicting_year() {
        let mut dates = BTreeMap::new();
        dates.insert(Frequency::Hourly, vec![IntervalTuple::new(1, 1, 1, 60)]);
        let mut day_of_week = BTreeMap::new();
        day_of_week.insert(Frequency::Hourly, vec!["Monday".to_string()]);
        // 2019-01-01 was a Tuesday.
        let err = reconcile(&dates, &day_of_week, &BTreeMap::new(), Some(2019)).unwrap_err();
        assert!(matches!(err, EsoError::StartDayMismatch { .. }));
    }

    #[test]
    fn test_reconcile_special_day_skips_weekday_check() {
        let mut dates = BTreeMap::new();
        dates.insert(Frequency::Hourly, vec![IntervalTuple::new(7, 21, 1, 60)]);
        let mut day_of_week = BTreeMap::new();
        day_of_week.insert(Frequency::Hourly, vec!["SummerDesignDay".to_string()]);
        let reconciled =
            reconcile(&dates, &day_of_week, &BTreeMap::new(), Some(2002)).unwrap();
        assert_eq!(reconciled.year, 2002);
    }

    #[test]
    fn test_reconcile_backfills_monthly_start() {
        let mut dates = BTreeMap::new();
        dates.insert(
            Frequency::Daily,
            vec![
                IntervalTuple::new(6, 10, 0, 0),
                IntervalTuple::new(6, 11, 0, 0),
            ],
        );
        dates.insert(Frequency::Monthly, vec![IntervalTuple::new(6, 1, 0, 0)]);
        let mut day_of_week = BTreeMap::new();
        // 2002-06-10 was a Monday.
        day_of_week.insert(
            Frequency::Daily,
            vec!["Monday".to_string(), "Tuesday".to_string()],
        );
        let mut cumulative = BTreeMap::new();
        cumulative.insert(Frequency::Monthly, vec![21u32]);
        let reconciled = reconcile(&dates, &day_of_week, &cumulative, Some(2002)).unwrap();
        // Monthly start inherits the daily start date, not June 1st.
        assert_eq!(
            reconciled.datetimes[&Frequency::Monthly][0],
            dt(2002, 6, 10, 0, 0)
        );
        assert_eq!(reconciled.n_days[&Frequency::Monthly], vec![21]);
    }

    #[test]
    fn test_reconcile_annual_days_from_runperiod() {
        let mut dates = BTreeMap::new();
        dates.insert(
            Frequency::Annual,
            vec![IntervalTuple::new(1, 1, 0, 0), IntervalTuple::new(1, 1, 0, 0)],
        );
        dates.insert(Frequency::Runperiod, vec![IntervalTuple::new(1, 1, 0, 0)]);
        let mut cumulative = BTreeMap::new();
        cumulative.insert(Frequency::Runperiod, vec![730u32]);
        let reconciled =
            reconcile(&dates, &BTreeMap::new(), &cumulative, Some(2013)).unwrap();
        assert_eq!(reconciled.n_days[&Frequency::Annual], vec![365, 365]);
        assert_eq!(reconciled.n_days[&Frequency::Runperiod], vec![730]);
    }
}
