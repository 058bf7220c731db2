//! The "experimental options" JSON bridge (spec §9 design note). A typed
//! `Config` remains ground truth; this adapter lets a host application pass
//! a JSON blob of recognized-by-name knobs without us growing a second,
//! shadow configuration surface. Unknown keys are logged and ignored —
//! never silently repurposed for something else.

use serde_json::Value;

/// One recognized experimental key, with a closure that applies it to a
/// `serde_json::Value` representation of the target config (the caller is
/// expected to round-trip through `serde_json::to_value`/`from_value`).
pub struct ExperimentalOption {
	pub name: &'static str,
	pub apply: fn(&mut Value, &Value),
}

/// Applies a JSON object of experimental options against `target`, using the
/// closed `recognized` list. Returns the set of keys that were not
/// recognized, for the caller to log.
pub fn apply_patch<'a>(
	target: &mut Value,
	patch: &'a Value,
	recognized: &[ExperimentalOption],
) -> Vec<&'a str> {
	let mut unknown = Vec::new();
	let Some(obj) = patch.as_object() else {
		return unknown;
	};
	for (key, value) in obj {
		match recognized.iter().find(|o| o.name == key) {
			Some(opt) => (opt.apply)(target, value),
			None => unknown.push(key.as_str()),
		}
	}
	unknown
}
