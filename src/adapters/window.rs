//! Foreground window lookup per platform.

use crate::adapters::process::capture_stdout;
use crate::domain::model::WindowInfo;
use crate::domain::ports::WindowProbe;
use crate::utils::error::{FocusError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

#[cfg(target_os = "macos")]
const FRONT_WINDOW_SCRIPT: &str = r#"
tell application "System Events"
    set frontApp to first application process whose frontmost is true
    set appName to name of frontApp
    try
        set windowTitle to name of front window of frontApp
    on error
        set windowTitle to appName
    end try
    return appName & "|" & windowTitle
end tell
"#;

/// Probe for the current OS: xdotool on Linux, AppleScript on macOS, user32 on Windows.
pub struct PlatformWindowProbe {
    system: Mutex<System>,
}

impl Default for PlatformWindowProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformWindowProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Process name for `pid`, refreshed on demand.
    pub fn process_name(&self, pid: u32) -> Result<String> {
        let mut system = self.system.lock().map_err(|e| FocusError::WindowProbeError {
            message: format!("process table lock poisoned: {}", e),
        })?;

        let pid = Pid::from_u32(pid);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );

        Ok(system
            .process(pid)
            .map(|p| p.name().to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string()))
    }

    #[cfg(target_os = "linux")]
    async fn linux_window(&self) -> Result<Option<WindowInfo>> {
        let Some(window_id) = capture_stdout("xdotool", &["getactivewindow"]).await else {
            return Ok(None);
        };

        let title = capture_stdout("xdotool", &["getwindowname", &window_id])
            .await
            .unwrap_or_else(|| "Unknown".to_string());

        let Some(pid) = capture_stdout("xdotool", &["getwindowpid", &window_id])
            .await
            .and_then(|out| parse_pid(&out))
        else {
            return Ok(None);
        };

        Ok(Some(WindowInfo {
            title,
            process: self.process_name(pid)?,
            pid: Some(pid),
        }))
    }

    #[cfg(target_os = "macos")]
    async fn macos_window(&self) -> Result<Option<WindowInfo>> {
        Ok(capture_stdout("osascript", &["-e", FRONT_WINDOW_SCRIPT])
            .await
            .map(|out| parse_app_and_title(&out)))
    }

    #[cfg(windows)]
    #[allow(unsafe_code)]
    fn windows_window(&self) -> Result<Option<WindowInfo>> {
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
        };

        // SAFETY: user32 calls on the handle returned by GetForegroundWindow; the text
        // buffer is sized from GetWindowTextLengthW plus the terminating null.
        let (title, pid) = unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.is_null() {
                return Ok(None);
            }

            let len = GetWindowTextLengthW(hwnd).max(0) as usize;
            let mut buffer = vec![0u16; len + 1];
            let copied = GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32).max(0) as usize;
            let title = String::from_utf16_lossy(&buffer[..copied]);

            let mut pid = 0u32;
            GetWindowThreadProcessId(hwnd, &mut pid);
            (title, pid)
        };

        Ok(Some(WindowInfo {
            title,
            process: self.process_name(pid)?,
            pid: Some(pid),
        }))
    }
}

#[async_trait]
impl WindowProbe for PlatformWindowProbe {
    async fn active_window(&self) -> Result<Option<WindowInfo>> {
        #[cfg(target_os = "linux")]
        {
            self.linux_window().await
        }

        #[cfg(target_os = "macos")]
        {
            self.macos_window().await
        }

        #[cfg(windows)]
        {
            self.windows_window()
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
        {
            Ok(None)
        }
    }
}

pub fn parse_pid(output: &str) -> Option<u32> {
    output.trim().parse().ok()
}

/// `app|title` from the AppleScript probe; a bare app name doubles as the title.
pub fn parse_app_and_title(output: &str) -> WindowInfo {
    let output = output.trim();
    let (process, title) = match output.split_once('|') {
        Some((app, title)) => (app, title),
        None => (output, output),
    };
    WindowInfo {
        title: title.to_string(),
        process: process.to_string(),
        pid: None,
    }
}
