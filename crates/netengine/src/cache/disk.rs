use std::path::{Path, PathBuf};

use fs_err as fs;

/// Owns the exclusive right to use a `httpcache/` directory for the
/// lifetime of one `Engine`. A second `Engine` pointed at the same
/// directory is refused at construction rather than silently corrupting
/// the first engine's on-disk entries (spec §6).
pub struct DiskGuard {
	dir: PathBuf,
	lock_path: PathBuf,
}

impl DiskGuard {
	pub fn acquire(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
		let dir = dir.into();
		fs::create_dir_all(&dir)?;
		let lock_path = dir.join(".lock");
		match fs::OpenOptions::new().create_new(true).write(true).open(&lock_path) {
			Ok(_) => Ok(Self { dir, lock_path }),
			Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(std::io::Error::new(
				std::io::ErrorKind::AlreadyExists,
				format!("httpcache directory {} is already open by another engine", dir.display()),
			)),
			Err(e) => Err(e),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}
}

impl Drop for DiskGuard {
	fn drop(&mut self) {
		let _ = fs::remove_file(&self.lock_path);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn second_open_of_same_directory_is_refused() {
		let dir = tempfile::tempdir().unwrap();
		let first = DiskGuard::acquire(dir.path()).unwrap();
		let second = DiskGuard::acquire(dir.path());
		assert!(second.is_err());
		drop(first);
		assert!(DiskGuard::acquire(dir.path()).is_ok());
	}
}
