use crate::domain::ports::{CommandOutcome, CommandRunner, CommandSpec};
use crate::utils::error::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Whether `program` resolves on PATH.
pub fn command_exists(program: &str) -> bool {
    std::env::var_os("PATH")
        .and_then(|path| find_in_path(program, &path))
        .is_some()
}

/// First executable named `program` in the directories of `path_var`.
pub fn find_in_path(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    let given = Path::new(program);
    if given.components().count() > 1 {
        return is_executable(given).then(|| given.to_path_buf());
    }

    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| {
            executable_names(program)
                .into_iter()
                .map(move |name| dir.join(name))
        })
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(windows)]
fn executable_names(program: &str) -> Vec<String> {
    if Path::new(program).extension().is_some() {
        return vec![program.to_string()];
    }
    let extensions = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    extensions
        .split(';')
        .filter(|e| !e.is_empty())
        .map(|e| format!("{}{}", program, e))
        .collect()
}

// 其他平台直接比對檔名
#[cfg(not(windows))]
fn executable_names(program: &str) -> Vec<String> {
    vec![program.to_string()]
}

/// Output of a probe command; `None` when it could not start or exited non-zero.
pub async fn capture_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| tracing::debug!("{} could not be started: {}", program, e))
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

/// Runs commands on the host with the terminal attached, so sudo can prompt.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn is_available(&self, program: &str) -> bool {
        command_exists(program)
    }

    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome> {
        let status = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;

        Ok(CommandOutcome {
            success: status.success(),
            code: status.code(),
        })
    }
}
