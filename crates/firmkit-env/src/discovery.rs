//! Filesystem discovery.
//!
//! Every lookup has a key. The first hit is stored in the environment under
//! that key and returned straight away on later calls, so a restored
//! snapshot skips probing entirely.
//!
//! Search places may contain `$VAR` references (expanded, then split on the
//! platform path separator) and a leading `~`.

use std::path::{Path, PathBuf};

use crate::environment::Environment;
use crate::error::{EnvError, Result};

/// Well-known discovery keys.
pub mod keys {
    pub const VERSION_FILE: &str = "version.txt";
    pub const CORE_DIR: &str = "arduino_core_dir";
    pub const LIBRARIES_DIR: &str = "arduino_libraries_dir";
    pub const VARIANTS_DIR: &str = "arduino_variants_dir";
    pub const BASE_DIR: &str = "arduino_base_dir";
    pub const SYSTEM_DIR: &str = "arduino_system_dir";
    pub const COMPILER_DIR: &str = "avr_compiler_dir";
    pub const CC: &str = "cc";
    pub const CXX: &str = "cxx";
    pub const AR: &str = "ar";
    pub const OBJCOPY: &str = "objcopy";
}

impl Environment {
    /// Find the first place containing one of `items` and return the place.
    /// No items means the place itself must exist.
    pub fn find_dir(&mut self, key: &str, items: &[&str], places: &[String], human_name: &str) -> Result<PathBuf> {
        let items = if items.is_empty() { &["."][..] } else { items };
        self.find(key, items, places, human_name, false)
    }

    /// Find the first existing `place/item` and return that path. No items
    /// means the key itself is the file name.
    pub fn find_file(&mut self, key: &str, items: &[&str], places: &[String], human_name: &str) -> Result<PathBuf> {
        let default = [key];
        let items = if items.is_empty() { &default[..] } else { items };
        self.find(key, items, places, human_name, true)
    }

    /// Like [`find_file`](Self::find_file), searching `$PATH` when no places are given.
    pub fn find_tool(&mut self, key: &str, items: &[&str], places: &[String], human_name: &str) -> Result<PathBuf> {
        let path_var = ["$PATH".to_string()];
        let places = if places.is_empty() { &path_var[..] } else { places };
        self.find_file(key, items, places, human_name)
    }

    /// [`find_dir`](Self::find_dir) inside the distribution.
    pub fn find_dist_dir(&mut self, key: &str, parts: &[&str], items: &[&str], human_name: &str) -> Result<PathBuf> {
        let places = self.dist_places(parts);
        self.find_dir(key, items, &places, human_name)
    }

    /// [`find_file`](Self::find_file) inside the distribution.
    pub fn find_dist_file(&mut self, key: &str, parts: &[&str], items: &[&str], human_name: &str) -> Result<PathBuf> {
        let places = self.dist_places(parts);
        self.find_file(key, items, &places, human_name)
    }

    /// A tool bundled with the distribution, falling back to `$PATH`.
    pub fn find_dist_tool(&mut self, key: &str, parts: &[&str], items: &[&str], human_name: &str) -> Result<PathBuf> {
        let mut places = self.dist_places(parts);
        places.push("$PATH".to_string());
        self.find_file(key, items, &places, human_name)
    }

    /// `parts` joined onto the chosen distribution directory, or onto every
    /// guess when none was chosen.
    pub fn dist_places(&self, parts: &[&str]) -> Vec<String> {
        let roots: Vec<&Path> = match &self.settings.dist_dir {
            Some(dist) => vec![dist.as_path()],
            None => self.settings.dist_guesses.iter().map(PathBuf::as_path).collect(),
        };
        roots
            .into_iter()
            .map(|root| {
                let mut place = root.to_path_buf();
                place.extend(parts);
                place.to_string_lossy().into_owned()
            })
            .collect()
    }

    fn find(&mut self, key: &str, items: &[&str], places: &[String], human_name: &str, join: bool) -> Result<PathBuf> {
        if let Some(found) = self.found.get(key) {
            return Ok(found.clone());
        }

        let places: Vec<PathBuf> = places.iter().flat_map(|p| expand_place(p)).collect();
        log::info!("searching for {human_name}");
        for place in &places {
            for item in items {
                let candidate = place.join(item);
                if candidate.exists() {
                    let result = if join { candidate } else { place.clone() };
                    log::info!("found {human_name}: {}", result.display());
                    self.found.insert(key.to_string(), result.clone());
                    return Ok(result);
                }
            }
        }

        log::error!("{human_name}: not found");
        Err(EnvError::NotFound {
            what: human_name.to_string(),
            searched: places,
        })
    }
}

/// Expand environment variables, split on the path separator, expand `~`.
fn expand_place(place: &str) -> Vec<PathBuf> {
    let expanded = expand_vars(place);
    std::env::split_paths(&expanded)
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| expand_home(&p))
        .collect()
}

/// Replace `$NAME` and `${NAME}` with the variable's value. Unset variables
/// are left as written.
fn expand_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };
        match std::env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(&rest[start..start + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::environment::EnvironmentSettings;

    fn env_with_dist(dist: &Path) -> Environment {
        Environment::new(EnvironmentSettings {
            dist_dir: Some(dist.to_path_buf()),
            ..Default::default()
        })
    }

    #[test]
    fn find_dir_returns_place() {
        let dir = tempfile::tempdir().unwrap();
        let core = dir.path().join("hardware/arduino/cores/arduino");
        fs::create_dir_all(&core).unwrap();
        fs::write(core.join("Arduino.h"), "").unwrap();

        let mut env = env_with_dist(dir.path());
        let found = env
            .find_dist_dir(
                keys::CORE_DIR,
                &["hardware", "arduino", "cores", "arduino"],
                &["Arduino.h"],
                "core library",
            )
            .unwrap();
        assert_eq!(found, core);
        assert_eq!(env.found(keys::CORE_DIR).unwrap(), core);
    }

    #[test]
    fn find_file_returns_joined_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/version.txt"), "1.0").unwrap();

        let mut env = env_with_dist(dir.path());
        let found = env
            .find_dist_file(keys::VERSION_FILE, &["lib"], &[], "version file")
            .unwrap();
        assert_eq!(found, dir.path().join("lib/version.txt"));
    }

    #[test]
    fn first_matching_place_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(b.join("tool"), "").unwrap();
        fs::write(a.join("other"), "").unwrap();

        let mut env = Environment::default();
        let places = vec![a.display().to_string(), b.display().to_string()];
        let found = env.find_file("tool", &["tool"], &places, "tool").unwrap();
        assert_eq!(found, b.join("tool"));
    }

    #[test]
    fn cached_result_skips_probing() {
        let mut env = Environment::default();
        env.found.insert("cc".into(), PathBuf::from("/cached/avr-gcc"));
        let found = env
            .find_tool("cc", &["avr-gcc"], &["/nowhere".to_string()], "avr-gcc")
            .unwrap();
        assert_eq!(found, PathBuf::from("/cached/avr-gcc"));
    }

    #[test]
    fn not_found_lists_every_place() {
        let mut env = Environment::new(EnvironmentSettings {
            dist_guesses: vec![PathBuf::from("/nope/one"), PathBuf::from("/nope/two")],
            ..Default::default()
        });
        let err = env
            .find_dist_dir(keys::LIBRARIES_DIR, &["libraries"], &[], "standard libraries")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("standard libraries not found"));
        assert!(message.contains("\n  - /nope/one/libraries"));
        assert!(message.contains("\n  - /nope/two/libraries"));
        assert!(env.found(keys::LIBRARIES_DIR).is_err());
    }

    #[test]
    fn dist_places_use_guesses_without_dist() {
        let env = Environment::new(EnvironmentSettings {
            dist_guesses: vec![PathBuf::from("/usr/share/arduino")],
            ..Default::default()
        });
        assert_eq!(
            env.dist_places(&["hardware", "tools"]),
            vec!["/usr/share/arduino/hardware/tools".to_string()]
        );
    }

    #[test]
    fn variable_expansion() {
        std::env::set_var("FIRMKIT_TEST_ROOT", "/opt/dist");
        assert_eq!(expand_vars("$FIRMKIT_TEST_ROOT/bin"), "/opt/dist/bin");
        assert_eq!(expand_vars("${FIRMKIT_TEST_ROOT}/bin"), "/opt/dist/bin");
        assert_eq!(expand_vars("$FIRMKIT_UNSET_VAR_XYZ/bin"), "$FIRMKIT_UNSET_VAR_XYZ/bin");
        assert_eq!(expand_vars("plain/path"), "plain/path");
        assert_eq!(expand_vars("cost$"), "cost$");
    }

    #[test]
    fn path_variable_splits_into_places() {
        let joined = std::env::join_paths(["/opt/a/bin", "/opt/b/bin"]).unwrap();
        std::env::set_var("FIRMKIT_TEST_PATH", &joined);
        assert_eq!(
            expand_place("$FIRMKIT_TEST_PATH"),
            vec![PathBuf::from("/opt/a/bin"), PathBuf::from("/opt/b/bin")]
        );
    }

    #[test]
    fn home_expansion() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_home(Path::new("~/arduino")), home.join("arduino"));
        }
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
    }
}
