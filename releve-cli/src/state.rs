use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "RELEVE_CONFIG";

pub fn releve_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".releve"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(releve_home()?.join("config.toml"))
}

/// `--config`, then `$RELEVE_CONFIG`, then `~/.releve/config.toml`.
/// The flag says whether the caller named the file explicitly.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<(PathBuf, bool)> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    pick_config_path(explicit, from_env, default_config_path)
}

fn pick_config_path(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    fallback: impl FnOnce() -> Result<PathBuf>,
) -> Result<(PathBuf, bool)> {
    if let Some(path) = explicit {
        return Ok((path.to_path_buf(), true));
    }
    match from_env.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => Ok((path, true)),
        None => Ok((fallback()?, false)),
    }
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    Ok(())
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> Result<PathBuf> {
        Ok(PathBuf::from("/home/u/.releve/config.toml"))
    }

    #[test]
    fn test_flag_beats_env_beats_home() {
        let (p, explicit) =
            pick_config_path(Some(Path::new("a.toml")), Some(PathBuf::from("b.toml")), home).unwrap();
        assert_eq!((p, explicit), (PathBuf::from("a.toml"), true));

        let (p, explicit) = pick_config_path(None, Some(PathBuf::from("b.toml")), home).unwrap();
        assert_eq!((p, explicit), (PathBuf::from("b.toml"), true));

        let (p, explicit) = pick_config_path(None, Some(PathBuf::new()), home).unwrap();
        assert_eq!((p, explicit), (PathBuf::from("/home/u/.releve/config.toml"), false));
    }
}
