//! Host bootstrap: ecosystem packages, the native window utility, usage hint.
//!
//! Steps run one after another and block on the invoked package manager. A failed
//! command is recorded and the next step still runs; nothing is rolled back.

use crate::config::{SetupConfig, DEFAULT_CONFIG_FILE};
use crate::domain::ports::{CommandOutcome, CommandRunner, CommandSpec};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
}

impl PackageManager {
    /// Probe order.
    pub const ALL: [PackageManager; 3] = [PackageManager::Apt, PackageManager::Dnf, PackageManager::Pacman];

    pub fn binary(self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
        }
    }

    pub fn install_command(self, packages: &[String], use_sudo: bool) -> CommandSpec {
        let base: &[&str] = match self {
            PackageManager::Apt => &["install", "-y"],
            PackageManager::Dnf => &["install", "-y"],
            PackageManager::Pacman => &["-S", "--noconfirm"],
        };

        let command = if use_sudo {
            CommandSpec::new("sudo").arg(self.binary())
        } else {
            CommandSpec::new(self.binary())
        };
        command.args(base.iter().copied()).args(packages.iter().cloned())
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
        };
        f.write_str(name)
    }
}

pub fn detect_package_manager(runner: &dyn CommandRunner) -> Option<PackageManager> {
    PackageManager::ALL
        .into_iter()
        .find(|pm| runner.is_available(pm.binary()))
}

pub fn pip_install_command(runner: &dyn CommandRunner, packages: &[String]) -> Option<CommandSpec> {
    let base = if runner.is_available("pip3") {
        CommandSpec::new("pip3")
    } else if runner.is_available("pip") {
        CommandSpec::new("pip")
    } else if runner.is_available("python3") {
        CommandSpec::new("python3").args(["-m", "pip"])
    } else {
        return None;
    };
    Some(base.arg("install").args(packages.iter().cloned()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    EcosystemPackages,
    NativePackages,
    UsageHint,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStep::EcosystemPackages => "ecosystem packages",
            SetupStep::NativePackages => "native packages",
            SetupStep::UsageHint => "usage hint",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Installed(CommandSpec),
    Failed {
        command: CommandSpec,
        code: Option<i32>,
        reason: Option<String>,
    },
    Planned(CommandSpec),
    Skipped(String),
    Printed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: SetupStep,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub package_manager: Option<PackageManager>,
    pub steps: Vec<StepOutcome>,
}

impl SetupReport {
    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed { .. }))
            .count()
    }
}

pub fn usage_hint() -> String {
    [
        "✅ Setup finished.",
        "Start a focus session:   focus-tracker",
        "Monitor all activity:    focus-tracker watch",
        "Review stored sessions:  focus-tracker sessions",
        "For LLM classification run `ollama serve` and `ollama pull mistral`.",
    ]
    .join("\n")
}

pub struct Installer<R: CommandRunner> {
    runner: R,
    config: SetupConfig,
    dry_run: bool,
}

impl<R: CommandRunner> Installer<R> {
    pub fn new(runner: R, config: SetupConfig, dry_run: bool) -> Self {
        Self {
            runner,
            config,
            dry_run,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn run(&self) -> SetupReport {
        let mut report = SetupReport::default();

        println!("📦 Installing ecosystem packages...");
        report.steps.push(StepOutcome {
            step: SetupStep::EcosystemPackages,
            status: self.install_ecosystem_packages(),
        });

        println!("🔍 Detecting package manager...");
        report.package_manager = detect_package_manager(&self.runner);
        report.steps.push(StepOutcome {
            step: SetupStep::NativePackages,
            status: self.install_native_packages(report.package_manager),
        });

        println!("{}", usage_hint());
        report.steps.push(StepOutcome {
            step: SetupStep::UsageHint,
            status: StepStatus::Printed,
        });

        report
    }

    fn install_ecosystem_packages(&self) -> StepStatus {
        if self.config.pip_packages.is_empty() {
            let reason = format!(
                "no pip packages configured; list them under [setup] pip_packages in {}",
                DEFAULT_CONFIG_FILE
            );
            println!("   ⏭️  Skipped: {}", reason);
            tracing::info!("No ecosystem packages configured");
            return StepStatus::Skipped(reason);
        }

        match pip_install_command(&self.runner, &self.config.pip_packages) {
            Some(command) => self.execute(command),
            None => {
                tracing::warn!("pip not found, skipping ecosystem packages");
                StepStatus::Skipped("pip not found".to_string())
            }
        }
    }

    fn install_native_packages(&self, manager: Option<PackageManager>) -> StepStatus {
        if self.config.native_packages.is_empty() {
            return StepStatus::Skipped("no packages configured".to_string());
        }

        match manager {
            Some(pm) => {
                println!("Using {} to install {}", pm, self.config.native_packages.join(", "));
                self.execute(pm.install_command(&self.config.native_packages, self.config.use_sudo))
            }
            None => {
                tracing::warn!(
                    "No supported package manager found (apt, dnf, pacman); install {} manually",
                    self.config.native_packages.join(", ")
                );
                StepStatus::Skipped("no supported package manager".to_string())
            }
        }
    }

    fn execute(&self, command: CommandSpec) -> StepStatus {
        if self.dry_run {
            println!("  would run: {}", command);
            return StepStatus::Planned(command);
        }

        tracing::info!("Running: {}", command);
        match self.runner.run(&command) {
            Ok(CommandOutcome { success: true, .. }) => StepStatus::Installed(command),
            Ok(CommandOutcome { code, .. }) => {
                tracing::warn!("'{}' exited with {:?}, continuing", command, code);
                StepStatus::Failed {
                    command,
                    code,
                    reason: None,
                }
            }
            Err(e) => {
                tracing::warn!("'{}' could not be started: {}, continuing", command, e);
                StepStatus::Failed {
                    command,
                    code: None,
                    reason: Some(e.to_string()),
                }
            }
        }
    }
}
