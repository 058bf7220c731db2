/// Per session+network migration counters, spec §4.F. Monotonic while a
/// session stays off the default network; reset when it returns to default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MigrationCounters {
	pub path_degrading_migrations: u32,
	pub write_error_migrations: u32,
}

impl MigrationCounters {
	pub fn reset(&mut self) {
		*self = Self::default();
	}
}
