//! Shared constants for ESO processing.
//!
//! Central location for wire-format sentinels, version thresholds,
//! reserved column identifiers and calendar reference data.

/// Terminates the data dictionary (header) section of an ESO file.
pub const END_OF_DATA_DICTIONARY: &str = "End of Data Dictionary";

/// Terminates the data (body) section of an ESO file.
pub const END_OF_DATA: &str = "End of Data";

/// Files at or above this numeric version carry the annual interval
/// marker, making 6 the last standard dictionary item id.
pub const ANNUAL_MARKER_VERSION: u32 = 890;

/// Most recent year considered by backward year inference.
pub const REFERENCE_YEAR: i32 = 2020;

/// How far back year inference searches before giving up.
pub const YEAR_SEARCH_SPAN: i32 = 150;

/// Reserved column id for the day-of-week special column.
pub const DAY_COLUMN_ID: i32 = -1;

/// Reserved column id for the number-of-days special column.
pub const N_DAYS_COLUMN_ID: i32 = -2;

/// DataFrame column name for timestamps.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// DataFrame column name for the day-of-week special column.
pub const DAY_COLUMN: &str = "day";

/// DataFrame column name for the number-of-days special column.
pub const N_DAYS_COLUMN: &str = "n days";

/// Suffix appended to an id column name in peak tables to form the
/// occurrence-timestamp column name.
pub const OCCURRENCE_SUFFIX: &str = " timestamp";

/// Key assigned to meter variables.
pub const METER_KEY: &str = "Meter";

/// Key assigned to cumulative meter variables.
pub const CUMULATIVE_METER_KEY: &str = "Cumulative Meter";

/// Calendar weekday names as they appear in interval lines.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Day-type labels that do not pin the calendar to a weekday.
pub const SPECIAL_DAYS: [&str; 5] = [
    "SummerDesignDay",
    "WinterDesignDay",
    "Holiday",
    "CustomDay1",
    "CustomDay2",
];

/// Default file extension for EnergyPlus raw output files.
pub const ESO_EXTENSION: &str = "eso";
