//! The `skip.txt` address deny-list, loaded once and cached for the process
//! lifetime.

use regex::Regex;
use std::sync::OnceLock;
use tracing::error;

/// A lazily-loaded, process-wide cached filter.
///
/// The regex (if any) is read from `skip.txt` next to the running
/// executable the first time [`Filter::is_allowed`] is called. Every
/// subsequent call reuses the cached outcome; the file is never reloaded,
/// even if it changes on disk.
#[derive(Debug)]
pub struct Filter {
    regex: OnceLock<Option<Regex>>,
}

impl Filter {
    pub const fn new() -> Self {
        Filter {
            regex: OnceLock::new(),
        }
    }

    /// `true` if `address` should be kept in an enumeration.
    pub fn is_allowed(&self, address: &str) -> bool {
        match self.regex.get_or_init(load_skip_file) {
            Some(re) => !re.is_match(address),
            None => true,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

fn load_skip_file() -> Option<Regex> {
    let exe = match std::env::current_exe() {
        Ok(path) => path,
        Err(error) => {
            tracing::error!(%error, "could not resolve executable path, filter disabled");
            return None;
        }
    };
    let skip_path = exe.parent()?.join("skip.txt");
    let contents = match std::fs::read_to_string(&skip_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            error!(error = %err, path = %skip_path.display(), "failed to read skip.txt, filter disabled");
            return None;
        }
    };
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return None;
    }
    match Regex::new(trimmed) {
        Ok(re) => Some(re),
        Err(err) => {
            error!(error = %err, pattern = trimmed, "invalid skip.txt regex, filter disabled");
            None
        }
    }
}

/// The single process-wide filter instance used by [`crate::enumerator`].
pub static FILTER: Filter = Filter::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_c_filter_excludes_bluetooth() {
        let re = Regex::new(r"^/dev/tty\.Bluetooth").unwrap();
        let addresses = ["/dev/tty.Bluetooth-Incoming", "/dev/ttyACM0"];
        let allowed: Vec<_> = addresses.iter().filter(|a| !re.is_match(a)).collect();
        assert_eq!(allowed, vec![&"/dev/ttyACM0"]);
    }

    #[test]
    fn empty_regex_file_disables_filtering() {
        // An all-whitespace skip.txt must behave like a missing one.
        let trimmed = "   \n\t  ".trim();
        assert!(trimmed.is_empty());
    }
}
