use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the default data directory under the library root.
pub const DATA_DIR: &str = ".quire";

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(750);
pub const DEFAULT_QUICK_SYNC_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Everything `Library::open` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryOptions {
    root: PathBuf,
    data_dir: Option<PathBuf>,
    autosave_delay: Duration,
    quick_sync_debounce: Duration,
    require_backup: bool,
}

impl LibraryOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            data_dir: None,
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            quick_sync_debounce: DEFAULT_QUICK_SYNC_DEBOUNCE,
            require_backup: false,
        }
    }

    /// Where `library.db`, `index.db` and backups live.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }

    pub fn quick_sync_debounce(mut self, delay: Duration) -> Self {
        self.quick_sync_debounce = delay;
        self
    }

    /// Refuse bulk destructive operations when the safety backup fails.
    pub fn require_backup(mut self, required: bool) -> Self {
        self.require_backup = required;
        self
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| self.root.join(DATA_DIR))
    }

    pub fn autosave(&self) -> Duration {
        self.autosave_delay
    }

    pub fn quick_sync_delay(&self) -> Duration {
        self.quick_sync_debounce
    }

    pub fn backup_required(&self) -> bool {
        self.require_backup
    }
}

/// Explicit consent for an operation that destroys data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Unconfirmed
        }
    }

    pub(crate) fn require(self, operation: &'static str) -> Result<()> {
        match self {
            Confirmation::Confirmed => Ok(()),
            Confirmation::Unconfirmed => Err(Error::NotConfirmed { operation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_defaults_under_root() {
        let options = LibraryOptions::new("/notes");
        assert_eq!(options.resolved_data_dir(), PathBuf::from("/notes/.quire"));
        assert_eq!(
            options.data_dir("/var/quire").resolved_data_dir(),
            PathBuf::from("/var/quire")
        );
    }

    #[test]
    fn unconfirmed_is_rejected() {
        let err = Confirmation::from_flag(false).require("purge").unwrap_err();
        assert!(matches!(err, Error::NotConfirmed { operation: "purge" }));
        assert!(Confirmation::from_flag(true).require("purge").is_ok());
    }
}
