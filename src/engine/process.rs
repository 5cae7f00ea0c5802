//! Blocking child-process execution shared by installers and projects.

use std::process::{Command, ExitStatus, Stdio};

use tracing::info;

/// Render a command the way a shell user would type it.
pub fn display_command(cmd: &Command) -> String {
    let mut parts = vec![shlex::try_quote(&cmd.get_program().to_string_lossy())
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| cmd.get_program().to_string_lossy().into_owned())];
    for arg in cmd.get_args() {
        let arg = arg.to_string_lossy();
        parts.push(
            shlex::try_quote(&arg)
                .map(|q| q.into_owned())
                .unwrap_or_else(|_| arg.into_owned()),
        );
    }
    parts.join(" ")
}

/// Run `cmd` to completion. Output is shown when verbose and discarded otherwise.
pub fn run_logged(cmd: &mut Command, verbose: bool) -> std::io::Result<ExitStatus> {
    let rendered = display_command(cmd);
    if verbose {
        info!("$ {rendered}");
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        info!("$ {rendered} > /dev/null");
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }
    cmd.stdin(Stdio::null()).status()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command_quotes_spaces() {
        let mut cmd = Command::new("dotnet");
        cmd.args(["build", "My Project.csproj"]);
        assert_eq!(display_command(&cmd), "dotnet build 'My Project.csproj'");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_logged_reports_exit_status() {
        let ok = run_logged(Command::new("sh").args(["-c", "exit 0"]), false).unwrap();
        assert!(ok.success());
        let failed = run_logged(Command::new("sh").args(["-c", "exit 3"]), false).unwrap();
        assert_eq!(failed.code(), Some(3));
    }

    #[test]
    fn test_run_logged_missing_program_is_io_error() {
        let err = run_logged(&mut Command::new("definitely-not-a-real-binary-4242"), false);
        assert!(err.is_err());
    }
}
