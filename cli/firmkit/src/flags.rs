//! Toolchain discovery and compiler flag setup for one board.
//!
//! Old distributions are configured with a fixed flag set derived from the
//! board definition. Per-architecture distributions ship a platform file
//! whose recipes are expanded against a variable tree built from the
//! platform, the board and the discovered paths.

use std::path::PathBuf;

use anyhow::Result;
use firmkit_config::platform::{firmware_extension, toolchain_prefix, tools_dir, DEFAULT_ARCH};
use firmkit_config::recipe::expand_all;
use firmkit_config::{expand, ConfigNode};
use firmkit_env::discovery::keys;
use firmkit_env::{EnvError, Environment};

/// Name of the linked firmware image, without extension.
pub const PROJECT_NAME: &str = "firmware";

/// Tool keys and the binary name each resolves to, minus the prefix.
const TOOLSET: [(&str, &str); 4] = [
    (keys::CC, "gcc"),
    (keys::CXX, "g++"),
    (keys::AR, "ar"),
    (keys::OBJCOPY, "objcopy"),
];

pub fn board_arch(board: &ConfigNode) -> &str {
    board.get_str("arch").unwrap_or(DEFAULT_ARCH)
}

fn required<'a>(board: &'a ConfigNode, model: &str, key: &str) -> std::result::Result<&'a str, EnvError> {
    board.lookup_str(key).ok_or_else(|| EnvError::MissingBoardKey {
        model: model.to_string(),
        key: key.to_string(),
    })
}

/// Locate the core, libraries, variants and cross tools for `board`.
pub fn discover(env: &mut Environment, board: &ConfigNode) -> Result<()> {
    let arch = board_arch(board);
    let version = env.lib_version()?;

    let mut cores = vec!["hardware", "arduino", "cores", "arduino"];
    let mut variants = vec!["hardware", "arduino", "variants"];
    if version.uses_arch_dirs() {
        cores.insert(2, arch);
        variants.insert(2, arch);
    }

    let core_header = if version.major > 0 { "Arduino.h" } else { "WProgram.h" };
    env.find_dist_dir(keys::CORE_DIR, &cores, &[core_header], "core library")?;
    env.find_dist_dir(keys::LIBRARIES_DIR, &["libraries"], &[], "standard libraries")?;
    if version.major > 0 {
        env.find_dist_dir(keys::VARIANTS_DIR, &variants, &[], "variants directory")?;
    }

    let bin_dir = ["hardware", "tools", tools_dir(arch), "bin"];
    for (key, tool) in TOOLSET {
        let binary = format!("{}{tool}", toolchain_prefix(arch));
        env.find_dist_tool(key, &bin_dir, &[binary.as_str()], &binary)?;
    }
    Ok(())
}

/// Board variant directory, for distributions that have variants.
fn variant_dir(env: &mut Environment, model: &str, board: &ConfigNode) -> Result<Option<PathBuf>> {
    if env.lib_version()?.major == 0 {
        return Ok(None);
    }
    let variant = required(board, model, "build.variant")?;
    Ok(Some(env.found(keys::VARIANTS_DIR)?.join(variant)))
}

fn firmware_path(env: &Environment, arch: &str) -> Result<PathBuf> {
    Ok(env
        .build_dir()?
        .join(format!("{PROJECT_NAME}.{}", firmware_extension(arch))))
}

/// Fixed flag set for old-style distributions.
pub fn setup_flags(env: &mut Environment, model: &str, board: &ConfigNode) -> Result<()> {
    let arch = board_arch(board);
    let mcu_name = required(board, model, "build.mcu")?;
    let mcu = if arch == "avr" {
        format!("-mmcu={mcu_name}")
    } else {
        format!("-mcpu={mcu_name}")
    };
    let f_cpu = required(board, model, "build.f_cpu")?;
    let version = env.lib_version()?;

    let mut cflags = vec![
        mcu.clone(),
        "-ffunction-sections".to_string(),
        "-fdata-sections".to_string(),
        "-g".to_string(),
        "-Os".to_string(),
        "-w".to_string(),
        format!("-DF_CPU={f_cpu}"),
        format!("-DARDUINO={}", version.as_int()),
        format!("-I{}", env.found(keys::CORE_DIR)?.display()),
    ];

    match board.lookup_str("build.extra_flags") {
        Some(extra) => {
            let extra = expand(extra, board)?;
            cflags.extend(extra.split_whitespace().map(str::to_string));
        }
        None => {
            if let Some(vid) = board.lookup_str("build.vid") {
                cflags.push(format!("-DUSB_VID={vid}"));
            }
            if let Some(pid) = board.lookup_str("build.pid") {
                cflags.push(format!("-DUSB_PID={pid}"));
            }
        }
    }

    let mut elfflags = vec!["-Os".to_string(), "-Wl,--gc-sections".to_string(), mcu];
    if let Some(variant) = variant_dir(env, model, board)? {
        cflags.push(format!("-I{}", variant.display()));
        if let Some(ldscript) = board.lookup_str("build.ldscript") {
            elfflags.push(format!("-T{}", variant.join(ldscript).display()));
        }
    }

    let mut libs = vec!["-lm".to_string()];
    if arch == "sam" {
        libs.push("-lgcc".to_string());
    }

    env.cflags = cflags;
    env.cxxflags = vec!["-fno-exceptions".to_string()];
    env.elfflags = elfflags;
    env.libs = libs;
    env.bin_path = Some(firmware_path(env, arch)?);
    Ok(())
}

/// Recipe expansion for per-architecture distributions.
pub fn setup_recipes(env: &mut Environment, model: &str, board: &ConfigNode) -> Result<()> {
    let arch = board_arch(board);
    let platform = env.platform(arch)?;
    let version = env.lib_version()?;
    let base_dir = env.find_dist_dir(keys::BASE_DIR, &[], &[], "distribution base directory")?;
    let variant = variant_dir(env, model, board)?.ok_or_else(|| EnvError::MissingBoardKey {
        model: model.to_string(),
        key: "build.variant".to_string(),
    })?;
    let build_dir = env.build_dir()?.to_path_buf();

    let mut build = platform.node("build").cloned().unwrap_or_default();
    if let Some(board_build) = board.node("build") {
        build.overlay(board_build);
    }
    build.insert("path", build_dir.display().to_string());
    if arch == "sam" {
        let system_dir = env.find_dist_dir(
            keys::SYSTEM_DIR,
            &["hardware", "arduino", arch, "system"],
            &[],
            "system directory",
        )?;
        build.insert("system", path_node(&system_dir));
    }
    build.insert("variant", path_node(&variant));
    build.insert("project_name", PROJECT_NAME);

    let mut vars = platform.clone();
    vars.insert("software", "Arduino");
    vars.set_dotted("runtime.ide.path", base_dir.display().to_string());
    vars.set_dotted("runtime.ide.version", version.as_int().to_string());
    vars.insert("build", build);
    if vars.lookup("compiler.path").is_none() {
        let compiler_dir = env.find_dist_dir(
            keys::COMPILER_DIR,
            &["hardware", "tools", "avr", "bin"],
            &[],
            "compiler directory",
        )?;
        vars.set_dotted("compiler.path", format!("{}/", compiler_dir.display()));
    }

    let recipes = match platform.node("recipe") {
        Some(templates) => expand_all(templates, &vars)?,
        None => Default::default(),
    };

    env.cflags = vec![
        format!("-I{}", env.found(keys::CORE_DIR)?.display()),
        format!("-I{}", variant.display()),
    ];
    env.cxxflags = Vec::new();
    env.recipes = recipes
        .into_iter()
        .map(|(key, recipe)| (format!("recipe.{key}"), recipe))
        .collect();
    env.bin_path = Some(firmware_path(env, arch)?);
    Ok(())
}

fn path_node(path: &std::path::Path) -> ConfigNode {
    let mut node = ConfigNode::new();
    node.insert("path", path.display().to_string());
    node
}

/// Set up flags for `board` and return the board variant directory when it
/// should take part in library resolution.
pub fn configure(env: &mut Environment, model: &str, board: &ConfigNode) -> Result<Option<PathBuf>> {
    discover(env, board)?;
    if env.uses_arch_dirs()? {
        setup_recipes(env, model, board)?;
        variant_dir(env, model, board)
    } else {
        setup_flags(env, model, board)?;
        Ok(None)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::path::Path;

    use firmkit_env::EnvironmentSettings;

    use super::*;

    /// Lay out a distribution with fake tools and return settings for a
    /// project next to it.
    pub(crate) fn fake_dist(root: &Path, version: &str) -> EnvironmentSettings {
        let dist = root.join("dist");
        let write = |rel: &str, content: &str| {
            let path = dist.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };
        write("lib/version.txt", version);
        fs::create_dir_all(dist.join("libraries/SPI")).unwrap();

        if version.starts_with("1.5") {
            for (arch, tools) in [("avr", "avr"), ("sam", "g++_arm_none_eabi")] {
                let prefix = toolchain_prefix(arch);
                for tool in ["gcc", "g++", "ar", "objcopy"] {
                    write(&format!("hardware/tools/{tools}/bin/{prefix}{tool}"), "");
                }
                write(&format!("hardware/arduino/{arch}/cores/arduino/Arduino.h"), "");
                fs::create_dir_all(dist.join(format!("hardware/arduino/{arch}/system"))).unwrap();
                write(
                    &format!("hardware/arduino/{arch}/platform.txt"),
                    "name=Arduino Boards\n\
                     compiler.c.cmd=gcc\n\
                     compiler.c.flags=-c -g -Os\n\
                     build.extra_flags=\n\
                     recipe.c.o.pattern=\"{compiler.path}{compiler.c.cmd}\" {compiler.c.flags} -mmcu={build.mcu} -DF_CPU={build.f_cpu} -DARDUINO={runtime.ide.version} \"-I{build.variant.path}\" {includes}\n\
                     recipe.ar.pattern=\"{compiler.path}ar\" rcs \"{build.path}/{archive_file}\"\n\
                     recipe.objcopy.hex.pattern=\"{compiler.path}objcopy\" -O ihex \"{build.path}/{build.project_name}.elf\"\n",
                );
            }
            write(
                "hardware/arduino/avr/boards.txt",
                "uno.name=Arduino Uno\nuno.build.mcu=atmega328p\nuno.build.f_cpu=16000000L\nuno.build.variant=standard\n",
            );
            write(
                "hardware/arduino/sam/boards.txt",
                "due.name=Arduino Due\ndue.build.mcu=cortex-m3\ndue.build.f_cpu=84000000L\ndue.build.variant=arduino_due_x\n",
            );
            fs::create_dir_all(dist.join("hardware/arduino/avr/variants/standard")).unwrap();
            fs::create_dir_all(dist.join("hardware/arduino/sam/variants/arduino_due_x")).unwrap();
        } else {
            for tool in ["gcc", "g++", "ar", "objcopy"] {
                write(&format!("hardware/tools/avr/bin/avr-{tool}"), "");
            }
            write("hardware/arduino/cores/arduino/Arduino.h", "");
            write("hardware/arduino/cores/arduino/WProgram.h", "");
            write(
                "hardware/arduino/boards.txt",
                "uno.name=Arduino Uno\n\
                 uno.build.mcu=atmega328p\n\
                 uno.build.f_cpu=16000000L\n\
                 uno.build.variant=standard\n\
                 leonardo.name=Arduino Leonardo\n\
                 leonardo.build.mcu=atmega32u4\n\
                 leonardo.build.f_cpu=16000000L\n\
                 leonardo.build.vid=0x2341\n\
                 leonardo.build.pid=0x8036\n\
                 leonardo.build.variant=leonardo\n\
                 micro.name=Arduino Micro\n\
                 micro.build.mcu=atmega32u4\n\
                 micro.build.f_cpu=16000000L\n\
                 micro.build.vid=0x2341\n\
                 micro.build.pid=0x8037\n\
                 micro.build.extra_flags=-DUSB_VID={build.vid} -DUSB_PID={build.pid}\n\
                 micro.build.variant=micro\n",
            );
            fs::create_dir_all(dist.join("hardware/arduino/variants/standard")).unwrap();
        }

        EnvironmentSettings {
            output_dir: root.join(".build"),
            src_dir: root.join("src"),
            lib_dir: root.join("lib"),
            dist_dir: Some(dist),
            dist_guesses: Vec::new(),
            ..Default::default()
        }
    }

    fn configured(root: &Path, version: &str, model: &str) -> (Environment, Option<PathBuf>) {
        let mut env = Environment::new(fake_dist(root, version));
        env.select_build_dir(Some(model));
        let board = env.board(model).unwrap();
        let variant = configure(&mut env, model, &board).unwrap();
        (env, variant)
    }

    #[test]
    fn legacy_flags() {
        let dir = tempfile::tempdir().unwrap();
        let (env, variant) = configured(dir.path(), "1.0.5", "uno");

        assert!(variant.is_none());
        assert_eq!(env.cflags[0], "-mmcu=atmega328p");
        assert!(env.cflags.contains(&"-DF_CPU=16000000L".to_string()));
        assert!(env.cflags.contains(&"-DARDUINO=100".to_string()));
        assert!(env.cflags.iter().any(|f| f.ends_with("variants/standard")));
        assert_eq!(env.cxxflags, vec!["-fno-exceptions"]);
        assert_eq!(env.elfflags, vec!["-Os", "-Wl,--gc-sections", "-mmcu=atmega328p"]);
        assert_eq!(env.libs, vec!["-lm"]);
        let build_dir = env.build_dir().unwrap();
        assert!(build_dir.file_name().unwrap().to_str().unwrap().starts_with("uno-"));
        assert_eq!(env.bin_path.as_deref(), Some(build_dir.join("firmware.hex").as_path()));
        assert!(env.found(keys::CXX).unwrap().ends_with("hardware/tools/avr/bin/avr-g++"));
    }

    #[test]
    fn usb_ids_become_defines() {
        let dir = tempfile::tempdir().unwrap();
        let (env, _) = configured(dir.path(), "1.0.5", "leonardo");
        assert!(env.cflags.contains(&"-DUSB_VID=0x2341".to_string()));
        assert!(env.cflags.contains(&"-DUSB_PID=0x8036".to_string()));
    }

    #[test]
    fn extra_flags_expand_usb_ids() {
        let dir = tempfile::tempdir().unwrap();
        let (env, _) = configured(dir.path(), "1.0.5", "micro");
        assert!(env.cflags.contains(&"-DUSB_VID=0x2341".to_string()));
        assert!(env.cflags.contains(&"-DUSB_PID=0x8037".to_string()));
        assert!(!env.cflags.iter().any(|f| f.contains('{')));
    }

    #[test]
    fn prehistoric_dist_has_no_variants() {
        let dir = tempfile::tempdir().unwrap();
        let (env, _) = configured(dir.path(), "0022", "uno");
        assert!(env.cflags.contains(&"-DARDUINO=22".to_string()));
        assert!(!env.cflags.iter().any(|f| f.contains("variants")));
        assert!(env.found(keys::VARIANTS_DIR).is_err());
    }

    #[test]
    fn arch_recipes_expand() {
        let dir = tempfile::tempdir().unwrap();
        let (env, variant) = configured(dir.path(), "1.5.8", "uno");
        let variant = variant.unwrap();
        assert!(variant.ends_with("avr/variants/standard"));

        let compile = &env.recipes["recipe.c.o.pattern"];
        assert!(compile.contains("bin/gcc\" -c -g -Os -mmcu=atmega328p -DF_CPU=16000000L -DARDUINO=105"));
        assert!(compile.contains(&format!("\"-I{}\"", variant.display())));
        // Left for the build step to fill in.
        assert!(compile.ends_with("{includes}"));

        let objcopy = &env.recipes["recipe.objcopy.hex.pattern"];
        let elf = env.build_dir().unwrap().join("firmware.elf");
        assert!(objcopy.ends_with(&format!("{}\"", elf.display())));
        assert_eq!(env.cflags.len(), 2);
        assert!(env.cxxflags.is_empty());
        assert!(env.bin_path.as_ref().unwrap().ends_with("firmware.hex"));
    }

    #[test]
    fn sam_board_uses_arm_toolchain() {
        let dir = tempfile::tempdir().unwrap();
        let (env, _) = configured(dir.path(), "1.5.8", "due");
        assert!(env.found(keys::CC).unwrap().ends_with("g++_arm_none_eabi/bin/arm-none-eabi-gcc"));
        assert!(env.found(keys::SYSTEM_DIR).unwrap().ends_with("sam/system"));
        assert!(env.bin_path.as_ref().unwrap().ends_with("firmware.bin"));
        assert!(env.recipes["recipe.c.o.pattern"].contains("-mmcu=cortex-m3"));
    }

    #[test]
    fn missing_board_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::new(fake_dist(dir.path(), "1.0.5"));
        env.select_build_dir(Some("uno"));
        let mut board = env.board("uno").unwrap();
        board.remove("build");
        board.set_dotted("build.variant", "standard");

        let err = configure(&mut env, "uno", &board).unwrap_err();
        assert!(err.to_string().contains("'build.mcu'"));
    }
}
