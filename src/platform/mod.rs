//! Platform-specific functionality
//!
//! Display server detection, executable lookup on `PATH`, and a subprocess
//! runner with a hard timeout so a hung external tool can never stall the
//! frame loop.

#[cfg(target_os = "linux")]
pub mod linux;

use std::ffi::OsStr;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting for a child process to exit
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Grace period for collecting stdout after the child has exited
const STDOUT_GRACE: Duration = Duration::from_millis(100);

/// Detected display server type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    /// X11 display server (Xorg)
    X11,
    /// Wayland compositor
    Wayland,
    /// Unknown or unable to detect
    Unknown,
}

impl std::fmt::Display for DisplayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayServer::X11 => write!(f, "X11"),
            DisplayServer::Wayland => write!(f, "Wayland"),
            DisplayServer::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Detect the current display server
///
/// Checks environment variables and XDG session type to determine
/// whether we're running on X11 or Wayland.
pub fn detect_display_server() -> DisplayServer {
    if let Ok(session_type) = std::env::var("XDG_SESSION_TYPE") {
        match session_type.to_lowercase().as_str() {
            "wayland" => return DisplayServer::Wayland,
            "x11" | "xorg" => return DisplayServer::X11,
            _ => {}
        }
    }

    if std::env::var("WAYLAND_DISPLAY").is_ok() {
        return DisplayServer::Wayland;
    }

    if std::env::var("DISPLAY").is_ok() {
        return DisplayServer::X11;
    }

    DisplayServer::Unknown
}

static DISPLAY_SERVER: OnceLock<DisplayServer> = OnceLock::new();

/// Get the detected display server (cached after first call)
pub fn get_display_server() -> DisplayServer {
    *DISPLAY_SERVER.get_or_init(|| {
        let server = detect_display_server();
        tracing::info!("Detected display server: {}", server);
        server
    })
}

/// Whether a Hyprland compositor instance is running in this session
pub fn is_hyprland() -> bool {
    std::env::var_os("HYPRLAND_INSTANCE_SIGNATURE").is_some()
}

/// Find an executable by name on `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}

/// Errors from running an external command
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0} is not installed")]
    NotFound(String),

    #[error("Failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    #[error("{program} timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u128 },
}

/// Run a command to completion and return its stdout.
///
/// The child is killed if it has not exited within `timeout`. A non-zero
/// exit status is reported as [`CommandError::Failed`].
pub fn run_command<S: AsRef<OsStr>>(
    program: S,
    args: &[&str],
    timeout: Duration,
) -> Result<String, CommandError> {
    let name = program.as_ref().to_string_lossy().to_string();

    let mut child = Command::new(program.as_ref())
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::NotFound(name.clone()),
            _ => CommandError::Io {
                program: name.clone(),
                source: e,
            },
        })?;

    // Drain stdout on a separate thread so a chatty child cannot fill the pipe
    // and block forever while we poll for its exit.
    let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(1);
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::Timeout {
                        program: name,
                        timeout_ms: timeout.as_millis(),
                    });
                }
                thread::sleep(CHILD_POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                return Err(CommandError::Io {
                    program: name,
                    source: e,
                });
            }
        }
    };

    let stdout = rx.recv_timeout(STDOUT_GRACE).unwrap_or_default();

    if !status.success() {
        return Err(CommandError::Failed {
            program: name,
            status: status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

/// Size of the whole virtual screen in pixels, when it can be queried.
pub fn virtual_screen_size() -> Option<(u32, u32)> {
    #[cfg(target_os = "linux")]
    {
        linux::virtual_screen_size()
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
