use crate::position::Fix;
use chrono::{NaiveDate, NaiveTime};

pub fn get_fix_as_json<'a>() -> &'a str {
    r#"
    {
        "provider": "gps",
        "latitude": 52.025833,
        "longitude": 11.279166,
        "velocity": 10,
        "accuracy": 4.5,
        "time": "00:00:00.000",
        "date": "01.01.1970"
    }
    "#
}

pub fn get_fix() -> Fix {
    get_fix_from("gps").with_accuracy(4.5)
}

/// A fix at the Oschersleben start line reported by `provider`.
pub fn get_fix_from(provider: &str) -> Fix {
    Fix::new(
        provider,
        52.025833,
        11.279166,
        10.0,
        &NaiveTime::parse_from_str("00:00:00.000", "%H:%M:%S%.3f")
            .unwrap_or_else(|e| panic!("Invalid fixture time. Reason: {e}")),
        &NaiveDate::parse_from_str("01.01.1970", "%d.%m.%Y")
            .unwrap_or_else(|e| panic!("Invalid fixture date. Reason: {e}")),
    )
}

/// Same as [`get_fix_from`] but moved `meters_north` meters to the north.
pub fn get_fix_moved(provider: &str, meters_north: f64) -> Fix {
    let base = get_fix_from(provider);
    Fix::new(
        provider,
        base.latitude() + meters_north / 111_300.0,
        base.longitude(),
        base.velocity(),
        &base.time(),
        &base.date(),
    )
}
