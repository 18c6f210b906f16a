//! Tests for the ESO parser subtree.

mod parser_tests;

use crate::parser::LineSource;
use std::io::Cursor;

/// Line source over in-memory content.
pub fn source_from(content: &str) -> LineSource<Cursor<Vec<u8>>> {
    LineSource::new(Cursor::new(content.as_bytes().to_vec()))
}

/// A small but complete ESO file: hourly temperature and meter
/// variables plus a daily variable with peak fields, one environment,
/// two hourly steps on a Tuesday January 1st (2019 when inferred).
pub fn sample_eso() -> String {
    [
        "Program Version,EnergyPlus, Version 9.1.0-08d2e308bb, YMD=2019.07.29 08:51",
        "1,5,Environment Title[],Latitude[deg],Longitude[deg],Time Zone[],Elevation[m]",
        "2,8,Day of Simulation[],Month[],Day of Month[],DST Indicator[1=yes 0=no],Hour[],StartMinute[],EndMinute[],DayType",
        "3,5,Cumulative Day of Simulation[],Month[],Day of Month[],DST Indicator[1=yes 0=no],DayType",
        "4,2,Cumulative Days of Simulation[],Month[]",
        "5,1,Cumulative Days of Simulation[]",
        "6,1,Calendar Year of Simulation[]",
        "7,1,Environment,Site Outdoor Air Drybulb Temperature [C] !Hourly",
        "8,1,Environment,Site Outdoor Air Drybulb Temperature [C] !Daily [Value,Min,Hour,Minute,Max,Hour,Minute]",
        "9,1,Electricity:Facility [J] !Hourly",
        "End of Data Dictionary",
        "1,TEST ENVIRONMENT, 51.15,  -0.18,   0.00,  62.00",
        "2,  1, 1, 1, 0, 1, 0.00,60.00,Tuesday",
        "7,20.0",
        "9,100.0",
        "2,  1, 1, 1, 0, 2, 0.00,60.00,Tuesday",
        "7,21.0",
        "9,110.0",
        "3,  1, 1, 1, 0,Tuesday",
        "8,20.5,15.0,4,60,25.0,14,60",
        "End of Data",
    ]
    .join("\n")
}
