/// Per-session migration state, spec §4.F.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationState {
	/// On the OS's current default network; the common case.
	OnDefault,
	/// A path probe is outstanding; writes are queued, and packets from the
	/// old path are still accepted until the anti-amplification timeout.
	Migrating,
	/// Deliberately running on a non-default network (path degradation or
	/// write-error migration), with `maxTimeOnNonDefaultNetwork` armed.
	OnNonDefault,
	/// No new streams; existing streams finish on the current path.
	Draining,
	Closed,
}

/// What a trigger produced. The caller (the session wrapper in `netengine`)
/// uses this to decide whether to fail streams with NETWORK_CHANGED, queue
/// writes, or do nothing observable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
	NoOp,
	Closed,
	Draining,
	MigratedToDefault,
	MigratedToNonDefault,
	PortMigrated,
	ReturnedToDefault,
	ExtendedOnNonDefault,
	ServerPathSwitched,
}
