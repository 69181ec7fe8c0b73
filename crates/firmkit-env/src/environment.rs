//! The build environment context object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use firmkit_config::platform::{ARCHITECTURES, DEFAULT_ARCH};
use firmkit_config::{BoardModels, ConfigNode, Platforms, Version, DEFAULT_BOARD_MODEL};
use firmkit_deps::Library;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::discovery::keys;
use crate::error::{EnvError, Result};

/// Where to look for things. Comes from the project manifest and the
/// command line; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSettings {
    /// Root of all build output (`.build`).
    pub output_dir: PathBuf,
    /// Project sources.
    pub src_dir: PathBuf,
    /// Project-local libraries, one per subdirectory.
    pub lib_dir: PathBuf,
    /// Explicit distribution directory, if the user gave one.
    pub dist_dir: Option<PathBuf>,
    /// Distribution locations probed when `dist_dir` is unset.
    pub dist_guesses: Vec<PathBuf>,
    pub default_board_model: String,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        EnvironmentSettings {
            output_dir: PathBuf::from(".build"),
            src_dir: PathBuf::from("src"),
            lib_dir: PathBuf::from("lib"),
            dist_dir: None,
            dist_guesses: default_dist_guesses(),
            default_board_model: DEFAULT_BOARD_MODEL.to_string(),
        }
    }
}

/// Usual distribution install locations for this host.
pub fn default_dist_guesses() -> Vec<PathBuf> {
    let mut guesses = Vec::new();
    if cfg!(target_os = "macos") {
        guesses.push(PathBuf::from("/Applications/Arduino.app/Contents/Resources/Java"));
    }
    guesses.push(PathBuf::from("/usr/local/share/arduino"));
    guesses.push(PathBuf::from("/usr/share/arduino"));
    guesses
}

/// A value in the free-form side table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Text(String),
    List(Vec<String>),
    Tree(ConfigNode),
}

/// Everything discovered and computed for one build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(skip)]
    pub(crate) settings: EnvironmentSettings,

    /// Per (board, distribution) output directory.
    pub build_dir: Option<PathBuf>,
    /// Discovered paths keyed by lookup key.
    pub found: BTreeMap<String, PathBuf>,
    pub lib_version: Option<Version>,
    pub board_models: Option<BoardModels>,
    pub platforms: Option<Platforms>,

    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub elfflags: Vec<String>,
    pub libs: Vec<String>,
    /// Expanded toolchain recipes keyed `recipe.<dotted key>`.
    pub recipes: BTreeMap<String, String>,
    /// Firmware image to produce.
    pub bin_path: Option<PathBuf>,

    /// Libraries in link order.
    pub used_libs: Vec<Library>,
    /// Dependency listings produced while resolving.
    pub deps: Vec<PathBuf>,

    /// Ad hoc values without a dedicated field.
    pub extra: BTreeMap<String, EnvValue>,
}

impl Environment {
    pub fn new(settings: EnvironmentSettings) -> Self {
        Environment {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    pub fn set(&mut self, key: impl Into<String>, value: EnvValue) {
        self.extra.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&EnvValue> {
        self.extra.get(key)
    }

    /// A path found earlier by discovery.
    pub fn found(&self, key: &str) -> Result<&Path> {
        self.found
            .get(key)
            .map(PathBuf::as_path)
            .ok_or_else(|| EnvError::Undiscovered { key: key.to_string() })
    }

    /// Pick the build directory for `model`.
    ///
    /// Builds for an explicitly chosen distribution get their own directory,
    /// suffixed with a short hash of the distribution path.
    pub fn select_build_dir(&mut self, model: Option<&str>) -> PathBuf {
        let model = model.unwrap_or(&self.settings.default_board_model);
        let dirname = match &self.settings.dist_dir {
            Some(dist) => {
                let digest = Sha256::digest(dist.to_string_lossy().as_bytes());
                let hash: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
                format!("{model}-{hash}")
            }
            None => model.to_string(),
        };
        let build_dir = self.settings.output_dir.join(dirname);
        self.build_dir = Some(build_dir.clone());
        build_dir
    }

    pub fn build_dir(&self) -> Result<&Path> {
        self.build_dir
            .as_deref()
            .ok_or_else(|| EnvError::Undiscovered { key: "build_dir".into() })
    }

    /// Distribution version, read from `lib/version.txt` once.
    pub fn lib_version(&mut self) -> Result<Version> {
        let path = self.find_dist_file(
            keys::VERSION_FILE,
            &["lib"],
            &[],
            "distribution version file (version.txt)",
        )?;
        if let Some(version) = self.lib_version {
            return Ok(version);
        }
        let raw = std::fs::read_to_string(&path)?;
        let version = Version::parse(&raw)?;
        log::info!("detected distribution version {version} ({})", raw.trim());
        self.lib_version = Some(version);
        Ok(version)
    }

    /// Whether the distribution is laid out per architecture.
    pub fn uses_arch_dirs(&mut self) -> Result<bool> {
        Ok(self.lib_version()?.uses_arch_dirs())
    }

    /// The board catalogue, parsed on first use.
    pub fn board_models(&mut self) -> Result<&BoardModels> {
        let models = match self.board_models.take() {
            Some(models) => models,
            None => self.load_board_models()?,
        };
        Ok(self.board_models.insert(models))
    }

    fn load_board_models(&mut self) -> Result<BoardModels> {
        let mut models = BoardModels::new();
        models.set_default_model(self.settings.default_board_model.clone());

        if self.uses_arch_dirs()? {
            for arch in ARCHITECTURES {
                let path = self.find_dist_file(
                    &format!("{arch}_boards.txt"),
                    &["hardware", "arduino", arch],
                    &["boards.txt"],
                    &format!("board description file ({arch}/boards.txt)"),
                )?;
                models.parse(&path, arch)?;
            }
        } else {
            let path = self.find_dist_file(
                "boards.txt",
                &["hardware", "arduino"],
                &[],
                "board description file (boards.txt)",
            )?;
            models.parse(&path, DEFAULT_ARCH)?;
        }
        Ok(models)
    }

    /// Platform definitions, parsed on first use. Old-style distributions
    /// have none.
    pub fn platforms(&mut self) -> Result<&Platforms> {
        let platforms = match self.platforms.take() {
            Some(platforms) => platforms,
            None => self.load_platforms()?,
        };
        Ok(self.platforms.insert(platforms))
    }

    fn load_platforms(&mut self) -> Result<Platforms> {
        let mut platforms = Platforms::new();
        if self.uses_arch_dirs()? {
            for arch in ARCHITECTURES {
                let path = self.find_dist_file(
                    &format!("{arch}_platform.txt"),
                    &["hardware", "arduino", arch],
                    &["platform.txt"],
                    &format!("platform description file ({arch}/platform.txt)"),
                )?;
                platforms.parse(arch, &path)?;
            }
        }
        Ok(platforms)
    }

    /// A copy of one board's definition.
    pub fn board(&mut self, model: &str) -> Result<ConfigNode> {
        let models = self.board_models()?;
        models.get(model).cloned().ok_or_else(|| EnvError::UnknownBoard {
            model: model.to_string(),
            available: models.format(),
        })
    }

    /// Fail unless `model` is in the catalogue.
    pub fn check_board_model(&mut self, model: &str) -> Result<()> {
        self.board(model).map(|_| ())
    }

    /// A copy of one architecture's platform definition.
    pub fn platform(&mut self, arch: &str) -> Result<ConfigNode> {
        self.platforms()?
            .get(arch)
            .cloned()
            .ok_or_else(|| EnvError::UnknownPlatform { arch: arch.to_string() })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;

    use super::*;

    /// Lay out a fake distribution and return settings pointing at it.
    pub(crate) fn fake_dist(root: &Path, version: &str) -> EnvironmentSettings {
        let dist = root.join("dist");
        fs::create_dir_all(dist.join("lib")).unwrap();
        fs::write(dist.join("lib/version.txt"), version).unwrap();

        let new_style = Version::parse(version).unwrap().uses_arch_dirs();
        if new_style {
            for arch in ARCHITECTURES {
                let hw = dist.join("hardware/arduino").join(arch);
                fs::create_dir_all(hw.join("cores/arduino")).unwrap();
                fs::create_dir_all(hw.join("variants/standard")).unwrap();
                fs::write(hw.join("cores/arduino/Arduino.h"), "").unwrap();
                fs::write(
                    hw.join("platform.txt"),
                    format!("name={arch} boards\ncompiler.c.cmd={arch}-gcc\nrecipe.ar.pattern={{compiler.c.cmd}} rcs\n"),
                )
                .unwrap();
            }
            fs::write(
                dist.join("hardware/arduino/avr/boards.txt"),
                "uno.name=Arduino Uno\nuno.build.mcu=atmega328p\nuno.build.f_cpu=16000000L\nuno.build.variant=standard\n",
            )
            .unwrap();
            fs::write(
                dist.join("hardware/arduino/sam/boards.txt"),
                "due.name=Arduino Due\ndue.build.mcu=cortex-m3\ndue.build.variant=arduino_due_x\n",
            )
            .unwrap();
        } else {
            let hw = dist.join("hardware/arduino");
            fs::create_dir_all(hw.join("cores/arduino")).unwrap();
            fs::write(hw.join("cores/arduino/WProgram.h"), "").unwrap();
            fs::write(
                hw.join("boards.txt"),
                "uno.name=Arduino Uno\nuno.build.mcu=atmega328p\nuno.build.f_cpu=16000000L\n",
            )
            .unwrap();
        }

        EnvironmentSettings {
            output_dir: root.join(".build"),
            src_dir: root.join("src"),
            lib_dir: root.join("lib"),
            dist_dir: Some(dist),
            dist_guesses: Vec::new(),
            default_board_model: DEFAULT_BOARD_MODEL.to_string(),
        }
    }

    #[test]
    fn build_dir_plain_without_explicit_dist() {
        let mut env = Environment::new(EnvironmentSettings::default());
        assert_eq!(env.select_build_dir(None), PathBuf::from(".build/uno"));
        assert_eq!(env.select_build_dir(Some("mega")), PathBuf::from(".build/mega"));
        assert_eq!(env.build_dir().unwrap(), Path::new(".build/mega"));
    }

    #[test]
    fn build_dir_hashed_per_dist() {
        let mut a = Environment::new(EnvironmentSettings {
            dist_dir: Some(PathBuf::from("/opt/arduino-1.0")),
            ..Default::default()
        });
        let mut b = Environment::new(EnvironmentSettings {
            dist_dir: Some(PathBuf::from("/opt/arduino-1.5.8")),
            ..Default::default()
        });
        let dir_a = a.select_build_dir(Some("uno"));
        let dir_b = b.select_build_dir(Some("uno"));
        assert_ne!(dir_a, dir_b);

        let name = dir_a.file_name().unwrap().to_str().unwrap();
        let (model, hash) = name.split_once('-').unwrap();
        assert_eq!(model, "uno");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn side_table() {
        let mut env = Environment::default();
        env.set("sketch", EnvValue::Text("blink".into()));
        assert_eq!(env.get("sketch"), Some(&EnvValue::Text("blink".into())));
        assert!(env.get("missing").is_none());
    }

    #[test]
    fn undiscovered_key_is_an_error() {
        let env = Environment::default();
        assert!(matches!(
            env.found(keys::CORE_DIR),
            Err(EnvError::Undiscovered { .. })
        ));
    }

    #[test]
    fn legacy_dist_loads_avr_boards() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::new(fake_dist(dir.path(), "0022"));

        assert_eq!(env.lib_version().unwrap(), Version::new(0, 22));
        assert!(!env.uses_arch_dirs().unwrap());
        let uno = env.board("uno").unwrap();
        assert_eq!(uno.get_str("arch"), Some("avr"));
        assert!(env.platforms().unwrap().is_empty());
    }

    #[test]
    fn arch_dist_loads_boards_and_platforms() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::new(fake_dist(dir.path(), "1.5.8"));

        assert!(env.uses_arch_dirs().unwrap());
        assert_eq!(env.board("due").unwrap().get_str("arch"), Some("sam"));
        assert_eq!(env.board("uno").unwrap().get_str("arch"), Some("avr"));
        assert_eq!(
            env.platform("sam").unwrap().lookup_str("compiler.c.cmd"),
            Some("sam-gcc")
        );
        assert!(matches!(
            env.platform("esp32"),
            Err(EnvError::UnknownPlatform { .. })
        ));
    }

    #[test]
    fn unknown_board_lists_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::new(fake_dist(dir.path(), "1.0"));
        let err = env.check_board_model("nonexistent").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nonexistent is not a valid board model"));
        assert!(message.contains("Arduino Uno"));
    }

    #[test]
    fn board_models_cached_after_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fake_dist(dir.path(), "1.0");
        let boards_txt = settings.dist_dir.clone().unwrap().join("hardware/arduino/boards.txt");
        let mut env = Environment::new(settings);

        assert_eq!(env.board_models().unwrap().len(), 1);
        fs::remove_file(boards_txt).unwrap();
        assert_eq!(env.board_models().unwrap().len(), 1);
    }
}
