use focus_tracker::config::SetupConfig;
use focus_tracker::core::setup::{PackageManager, SetupStep, StepStatus};
use focus_tracker::domain::ports::{CommandOutcome, CommandRunner, CommandSpec};
use focus_tracker::{FocusError, Installer, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Pretends a fixed set of programs exists and records every invocation.
#[derive(Default)]
struct RecordingRunner {
    available: Vec<&'static str>,
    exit_codes: HashMap<&'static str, i32>,
    unstartable: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    fn with(available: &[&'static str]) -> Self {
        Self {
            available: available.to_vec(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn is_available(&self, program: &str) -> bool {
        self.available.contains(&program)
    }

    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome> {
        self.calls.lock().unwrap().push(command.to_string());

        if self.unstartable.contains(&command.program.as_str()) {
            return Err(FocusError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )));
        }
        let code = self
            .exit_codes
            .get(command.program.as_str())
            .copied()
            .unwrap_or(0);
        Ok(CommandOutcome {
            success: code == 0,
            code: Some(code),
        })
    }
}

fn config(pip: &[&str]) -> SetupConfig {
    SetupConfig {
        pip_packages: pip.iter().map(|p| p.to_string()).collect(),
        ..SetupConfig::default()
    }
}

#[test]
fn test_apt_host_installs_everything() {
    let runner = RecordingRunner::with(&["pip3", "pip", "apt-get", "dnf"]);
    let installer = Installer::new(runner, config(&["requests"]), false);

    let report = installer.run();

    assert_eq!(report.package_manager, Some(PackageManager::Apt));
    assert_eq!(report.failures(), 0);
    assert_eq!(
        installer.runner().calls(),
        vec!["pip3 install requests", "sudo apt-get install -y xdotool"]
    );
    let steps: Vec<SetupStep> = report.steps.iter().map(|s| s.step).collect();
    assert_eq!(
        steps,
        vec![SetupStep::EcosystemPackages, SetupStep::NativePackages, SetupStep::UsageHint]
    );
    assert_eq!(report.steps[2].status, StepStatus::Printed);
}

#[test]
fn test_failed_pip_does_not_stop_native_install() {
    let mut runner = RecordingRunner::with(&["python3", "dnf"]);
    runner.exit_codes.insert("python3", 1);
    let installer = Installer::new(runner, config(&["requests"]), false);

    let report = installer.run();

    assert_eq!(report.failures(), 1);
    assert!(matches!(
        report.steps[0].status,
        StepStatus::Failed { code: Some(1), .. }
    ));
    assert!(matches!(report.steps[1].status, StepStatus::Installed(_)));
    assert_eq!(
        installer.runner().calls(),
        vec!["python3 -m pip install requests", "sudo dnf install -y xdotool"]
    );
}

#[test]
fn test_pacman_without_sudo() {
    let runner = RecordingRunner::with(&["pacman"]);
    let setup = SetupConfig {
        use_sudo: false,
        ..SetupConfig::default()
    };
    let installer = Installer::new(runner, setup, false);

    let report = installer.run();

    assert_eq!(report.package_manager, Some(PackageManager::Pacman));
    assert!(matches!(report.steps[0].status, StepStatus::Skipped(_)));
    assert_eq!(installer.runner().calls(), vec!["pacman -S --noconfirm xdotool"]);
}

#[test]
fn test_default_config_explains_how_to_add_pip_packages() {
    let runner = RecordingRunner::with(&["pip3", "apt-get"]);
    let installer = Installer::new(runner, SetupConfig::default(), false);

    let report = installer.run();

    match &report.steps[0].status {
        StepStatus::Skipped(reason) => {
            assert!(reason.contains("[setup] pip_packages"));
            assert!(reason.contains("focus-tracker.toml"));
        }
        other => panic!("expected the pip step to be skipped, got {:?}", other),
    }
    // pip 沒被呼叫，系統套件照裝
    assert_eq!(installer.runner().calls(), vec!["sudo apt-get install -y xdotool"]);
}

#[test]
fn test_no_package_manager_skips_native_step() {
    let runner = RecordingRunner::with(&[]);
    let installer = Installer::new(runner, config(&["requests"]), false);

    let report = installer.run();

    assert_eq!(report.package_manager, None);
    assert_eq!(report.failures(), 0);
    assert!(matches!(report.steps[0].status, StepStatus::Skipped(_)));
    assert!(matches!(report.steps[1].status, StepStatus::Skipped(_)));
    assert!(installer.runner().calls().is_empty());
}

#[test]
fn test_dry_run_plans_without_running() {
    let runner = RecordingRunner::with(&["pip", "apt-get"]);
    let installer = Installer::new(runner, config(&["requests"]), true);

    let report = installer.run();

    assert!(installer.runner().calls().is_empty());
    match &report.steps[1].status {
        StepStatus::Planned(command) => {
            assert_eq!(command.to_string(), "sudo apt-get install -y xdotool")
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert!(matches!(&report.steps[0].status, StepStatus::Planned(c) if c.program == "pip"));
}

#[test]
fn test_unstartable_command_is_recorded() {
    let mut runner = RecordingRunner::with(&["apt-get"]);
    runner.unstartable.push("sudo");
    let installer = Installer::new(runner, SetupConfig::default(), false);

    let report = installer.run();

    assert_eq!(report.failures(), 1);
    match &report.steps[1].status {
        StepStatus::Failed { code, reason, .. } => {
            assert_eq!(*code, None);
            assert!(reason.as_deref().unwrap_or_default().contains("no such file"));
        }
        other => panic!("unexpected status {:?}", other),
    }
}
