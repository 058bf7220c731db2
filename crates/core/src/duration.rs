//! `serde` helpers for `Duration` fields, matching the `with = "serde_dur"` /
//! `with = "serde_dur_option"` convention used throughout the config layer.
//! Durations are encoded on the wire as human strings (`"5s"`, `"250ms"`) and
//! decoded the same way, rather than as raw nanosecond integers.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn parse(s: &str) -> Result<Duration, String> {
	let s = s.trim();
	let (num, unit) = s
		.find(|c: char| !c.is_ascii_digit() && c != '.')
		.map(|idx| s.split_at(idx))
		.ok_or_else(|| format!("duration '{s}' is missing a unit"))?;
	let value: f64 = num
		.parse()
		.map_err(|_| format!("duration '{s}' has an invalid numeric part"))?;
	let millis = match unit {
		"ns" => value / 1_000_000.0,
		"us" => value / 1_000.0,
		"ms" => value,
		"s" => value * 1_000.0,
		"m" => value * 60_000.0,
		"h" => value * 3_600_000.0,
		other => return Err(format!("duration '{s}' has an unknown unit '{other}'")),
	};
	Ok(Duration::from_secs_f64(millis / 1000.0))
}

fn format(d: Duration) -> String {
	let ms = d.as_secs_f64() * 1000.0;
	if ms % 3_600_000.0 == 0.0 && ms >= 3_600_000.0 {
		format!("{}h", ms / 3_600_000.0)
	} else if ms % 60_000.0 == 0.0 && ms >= 60_000.0 {
		format!("{}m", ms / 60_000.0)
	} else if ms % 1000.0 == 0.0 {
		format!("{}s", ms / 1000.0)
	} else {
		format!("{ms}ms")
	}
}

pub mod serde_dur {
	use super::*;

	pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
		format(*d).serialize(s)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
		let s = String::deserialize(d)?;
		parse(&s).map_err(serde::de::Error::custom)
	}
}

pub mod serde_dur_option {
	use super::*;

	pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
		match d {
			Some(d) => format(*d).serialize(s),
			None => s.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
		let s: Option<String> = Option::deserialize(d)?;
		s.map(|s| parse(&s).map_err(serde::de::Error::custom))
			.transpose()
	}
}
