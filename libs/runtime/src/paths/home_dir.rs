use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory ({0} is not set)")]
    NoUserHome(&'static str),

    #[error("cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(target_os = "windows")]
const USER_HOME_VAR: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const USER_HOME_VAR: &str = "HOME";

fn user_home() -> Result<PathBuf, HomeDirError> {
    std::env::var_os(USER_HOME_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::NoUserHome(USER_HOME_VAR))
}

/// Expands a leading `~` and anchors relative paths at the current directory.
fn absolutize(raw: &str) -> Result<PathBuf, HomeDirError> {
    let expanded = if raw == "~" {
        user_home()?
    } else if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        user_home()?.join(rest)
    } else {
        PathBuf::from(raw)
    };

    if expanded.is_absolute() {
        return Ok(expanded);
    }
    let cwd = std::env::current_dir().map_err(HomeDirError::CurrentDir)?;
    Ok(cwd.join(expanded))
}

/// Resolve the application home directory.
///
/// `configured` wins when present; otherwise `<user home>/<default_subdir>`
/// is used (`%APPDATA%` on Windows, `$HOME` elsewhere). With `create` the
/// directory is created when missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match configured.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => absolutize(raw)?,
        _ => user_home()?.join(default_subdir),
    };

    if create {
        ensure_dir(&path)?;
    }
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<(), HomeDirError> {
    std::fs::create_dir_all(path).map_err(|source| HomeDirError::Create {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_path_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("nested").join("home");

        let resolved =
            resolve_home_dir(Some(target.to_string_lossy().to_string()), ".coursehub", true)
                .unwrap();

        assert_eq!(resolved, target);
        assert!(resolved.is_dir());
    }

    #[test]
    fn relative_path_is_anchored_at_cwd() {
        let resolved = resolve_home_dir(Some("some/relative".into()), ".coursehub", false).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/relative"));
    }

    #[test]
    fn blank_value_falls_back_to_default_subdir() {
        let resolved = resolve_home_dir(Some("   ".into()), ".coursehub", false).unwrap();
        assert!(resolved.ends_with(".coursehub"));
    }
}
