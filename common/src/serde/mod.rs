// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Serde helpers for the compact date and time formats of serialized fixes.

use ::serde::{Deserialize, Deserializer};

fn parse<'de, D, T, F>(deserializer: D, parse: F) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    F: FnOnce(&str) -> chrono::ParseResult<T>,
{
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(::serde::de::Error::custom)
}

/// `DD.MM.YYYY`
pub mod date {
    use ::serde::{Deserializer, Serializer};
    use chrono::NaiveDate;

    pub const FORMAT: &str = "%d.%m.%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        super::parse(deserializer, |s| NaiveDate::parse_from_str(s, FORMAT))
    }
}

/// `HH:MM:SS.mmm`
pub mod time {
    use ::serde::{Deserializer, Serializer};
    use chrono::NaiveTime;

    pub const FORMAT: &str = "%H:%M:%S%.3f";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        super::parse(deserializer, |s| NaiveTime::parse_from_str(s, FORMAT))
    }
}
