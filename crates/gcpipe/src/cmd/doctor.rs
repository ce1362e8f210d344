use std::path::Path;

use gcpipe_transport::{default_pipe_dir, EndpointPair};
use serde::Serialize;

use crate::cmd::{DoctorArgs, LinkArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    schema_id: &'static str,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let pipe_dir = link.pipe_dir.clone().unwrap_or_else(default_pipe_dir);
    let endpoints = link.endpoints()?;

    let checks = vec![
        platform_transport_check(),
        pipe_dir_writable_check(&pipe_dir),
        endpoints_present_check(&endpoints),
        compiled_features_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        schema_id: "https://schemas.gcpipe.dev/cli/v1/doctor-report.schema.json",
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("gcpipe doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<22} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn platform_transport_check() -> CheckResult {
    #[cfg(unix)]
    {
        CheckResult {
            name: "platform_transport".to_string(),
            status: CheckStatus::Pass,
            detail: "Unix domain sockets available".to_string(),
        }
    }

    #[cfg(not(unix))]
    {
        CheckResult {
            name: "platform_transport".to_string(),
            status: CheckStatus::Fail,
            detail: "native named-pipe backend not implemented on this platform".to_string(),
        }
    }
}

fn pipe_dir_writable_check(dir: &Path) -> CheckResult {
    #[cfg(unix)]
    {
        use gcpipe_transport::UnixDomainSocket;

        let probe = dir.join(format!("gcpipe-doctor-{}.sock", std::process::id()));
        match UnixDomainSocket::bind(&probe) {
            Ok(_socket) => CheckResult {
                name: "pipe_dir_writable".to_string(),
                status: CheckStatus::Pass,
                detail: format!("socket bind in {} succeeded", dir.display()),
            },
            Err(err) => CheckResult {
                name: "pipe_dir_writable".to_string(),
                status: CheckStatus::Fail,
                detail: format!("socket bind in {} failed: {err}", dir.display()),
            },
        }
    }

    #[cfg(not(unix))]
    {
        let _ = dir;
        CheckResult {
            name: "pipe_dir_writable".to_string(),
            status: CheckStatus::Skip,
            detail: "pipe dir check not implemented on this platform".to_string(),
        }
    }
}

fn endpoints_present_check(endpoints: &EndpointPair) -> CheckResult {
    let command = endpoints.command().exists();
    let respond = endpoints.respond().exists();

    if command && respond {
        return CheckResult {
            name: "endpoints_present".to_string(),
            status: CheckStatus::Pass,
            detail: format!(
                "{} and {} published",
                endpoints.command().display(),
                endpoints.respond().display()
            ),
        };
    }

    let missing = if !command && !respond {
        "both endpoints"
    } else if !command {
        "command endpoint"
    } else {
        "respond endpoint"
    };
    // Not a failure: the environment is healthy, the instrument just isn't up.
    CheckResult {
        name: "endpoints_present".to_string(),
        status: CheckStatus::Warn,
        detail: format!("{missing} missing; start the control application or `gcpipe emulate`"),
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "client") {
        features.push("client");
    }
    if cfg!(feature = "ctlfile") {
        features.push("ctlfile");
    }
    if cfg!(feature = "cli") {
        features.push("cli");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}
