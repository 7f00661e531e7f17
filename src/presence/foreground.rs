//! Foreground-window probing
//!
//! Best effort: shells out to an OS tool for the focused window's rectangle
//! and owning pid. Any failure or timeout reads as "nothing fullscreen".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{DisplayInfo, Rect};
use crate::config::FullscreenSettings;

/// Focused window as reported by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForegroundWindow {
    pub bounds: Rect,
    pub pid: u32,
}

#[async_trait]
pub trait ForegroundProbe: Send + Sync {
    /// `None` when the probe is unavailable, fails, or times out.
    async fn probe(&self) -> Option<ForegroundWindow>;
}

/// Always reports nothing.
pub struct NoopProbe;

#[async_trait]
impl ForegroundProbe for NoopProbe {
    async fn probe(&self) -> Option<ForegroundWindow> {
        None
    }
}

/// The OS probe, or [`NoopProbe`] when `probe_interval_ms` is 0.
pub fn probe_for(settings: &FullscreenSettings) -> Arc<dyn ForegroundProbe> {
    if settings.probe_interval_ms == 0 {
        tracing::info!("Fullscreen probing disabled");
        return Arc::new(NoopProbe);
    }
    Arc::new(CommandProbe::new(Duration::from_millis(settings.probe_timeout_ms)))
}

#[cfg(windows)]
const POWERSHELL_PROBE: &str = r#"$sig='
using System;
using System.Runtime.InteropServices;
public class W{
[StructLayout(LayoutKind.Sequential)] public struct RECT{ public int Left; public int Top; public int Right; public int Bottom; }
[DllImport("user32.dll")] public static extern IntPtr GetForegroundWindow();
[DllImport("user32.dll")] public static extern bool GetWindowRect(IntPtr hWnd, out RECT rect);
[DllImport("user32.dll")] public static extern uint GetWindowThreadProcessId(IntPtr hWnd, out uint pid);
}
'; Add-Type $sig -ErrorAction SilentlyContinue; $h=[W]::GetForegroundWindow(); if($h -eq [IntPtr]::Zero){''; exit}; $r=New-Object W+RECT; [W]::GetWindowRect($h,[ref]$r)|Out-Null; [uint32]$fpid=0; [W]::GetWindowThreadProcessId($h,[ref]$fpid)|Out-Null; Write-Output ("$($r.Left)|$($r.Top)|$($r.Right-$r.Left)|$($r.Bottom-$r.Top)|$fpid")"#;

/// Queries the OS through `powershell` (Windows) or `xdotool` (X11).
pub struct CommandProbe {
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[cfg(windows)]
    fn command() -> Command {
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-Command", POWERSHELL_PROBE]);
        cmd
    }

    #[cfg(not(windows))]
    fn command() -> Command {
        let mut cmd = Command::new("xdotool");
        cmd.args(["getactivewindow", "getwindowgeometry", "--shell", "getwindowpid"]);
        cmd
    }

    fn parse(output: &str) -> Option<ForegroundWindow> {
        parse_pipe_output(output).or_else(|| parse_xdotool_output(output))
    }
}

#[async_trait]
impl ForegroundProbe for CommandProbe {
    async fn probe(&self) -> Option<ForegroundWindow> {
        let mut cmd = Self::command();
        cmd.kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!("Foreground probe unavailable: {}", e);
                return None;
            }
            Err(_) => {
                tracing::debug!("Foreground probe timed out");
                return None;
            }
        };

        if !output.status.success() {
            return None;
        }
        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }
}

/// `x|y|w|h|pid`
pub fn parse_pipe_output(output: &str) -> Option<ForegroundWindow> {
    let parts: Vec<&str> = output.trim().split('|').collect();
    if parts.len() < 5 {
        return None;
    }
    Some(ForegroundWindow {
        bounds: Rect {
            x: parts[0].trim().parse().ok()?,
            y: parts[1].trim().parse().ok()?,
            width: parts[2].trim().parse().ok()?,
            height: parts[3].trim().parse().ok()?,
        },
        pid: parts[4].trim().parse().ok()?,
    })
}

/// `KEY=value` lines from `getwindowgeometry --shell`, then the pid on its own line.
pub fn parse_xdotool_output(output: &str) -> Option<ForegroundWindow> {
    let (mut x, mut y, mut width, mut height, mut pid) = (None, None, None, None, None);

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.split_once('=') {
            Some(("X", v)) => x = v.parse().ok(),
            Some(("Y", v)) => y = v.parse().ok(),
            Some(("WIDTH", v)) => width = v.parse().ok(),
            Some(("HEIGHT", v)) => height = v.parse().ok(),
            Some(_) => {}
            None => pid = line.parse().ok(),
        }
    }

    Some(ForegroundWindow {
        bounds: Rect {
            x: x?,
            y: y?,
            width: width?,
            height: height?,
        },
        pid: pid?,
    })
}

/// Another process's window covers more than `ratio` of the display's work area.
pub fn is_fullscreen(window: &ForegroundWindow, own_pid: u32, display: &DisplayInfo, ratio: f64) -> bool {
    if window.pid == own_pid {
        return false;
    }
    let covered = window.bounds.area() as f64 / display.work_area.area().max(1) as f64;
    covered > ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display() -> DisplayInfo {
        DisplayInfo {
            id: "1".into(),
            bounds: Rect { x: 0, y: 0, width: 1920, height: 1080 },
            work_area: Rect { x: 0, y: 0, width: 1920, height: 1040 },
        }
    }

    #[test]
    fn test_parse_pipe_output() {
        let fw = parse_pipe_output("0|0|1920|1080|4242\r\n").unwrap();
        assert_eq!(fw.bounds, Rect { x: 0, y: 0, width: 1920, height: 1080 });
        assert_eq!(fw.pid, 4242);

        assert!(parse_pipe_output("").is_none());
        assert!(parse_pipe_output("0|0|abc|1080|1").is_none());
        assert!(parse_pipe_output("1|2|3").is_none());
    }

    #[test]
    fn test_parse_xdotool_output() {
        let out = "WINDOW=73400327\nX=-8\nY=0\nWIDTH=1936\nHEIGHT=1056\nSCREEN=0\n31337\n";
        let fw = parse_xdotool_output(out).unwrap();
        assert_eq!(fw.bounds, Rect { x: -8, y: 0, width: 1936, height: 1056 });
        assert_eq!(fw.pid, 31337);

        // No pid (window without _NET_WM_PID)
        assert!(parse_xdotool_output("X=0\nY=0\nWIDTH=10\nHEIGHT=10\n").is_none());
    }

    #[test]
    fn test_fullscreen_ratio() {
        let full = ForegroundWindow {
            bounds: Rect { x: 0, y: 0, width: 1920, height: 1080 },
            pid: 10,
        };
        assert!(is_fullscreen(&full, 1, &display(), 0.92));
        // Our own window never counts
        assert!(!is_fullscreen(&full, 10, &display(), 0.92));

        let editor = ForegroundWindow {
            bounds: Rect { x: 0, y: 0, width: 1200, height: 900 },
            pid: 10,
        };
        assert!(!is_fullscreen(&editor, 1, &display(), 0.92));
    }

    #[tokio::test]
    async fn test_noop_probe_reports_nothing() {
        assert!(NoopProbe.probe().await.is_none());
    }

    #[tokio::test]
    async fn test_zero_interval_selects_noop_probe() {
        let disabled = FullscreenSettings {
            probe_interval_ms: 0,
            ..FullscreenSettings::default()
        };
        assert!(probe_for(&disabled).probe().await.is_none());
    }
}
