//! Turns script outcomes into host notifications.

use super::events::{Notification, UserEvent};
use super::proxy::EventProxy;
use crate::core::{NotifyMode, RunOutput};
use std::fmt::Display;
use std::io;

pub const SUCCESS_MESSAGE: &str = "Script executed successfully";
pub const SIGNAL_MESSAGE: &str = "Terminated by signal";

pub fn exit_code_message(code: i32) -> String {
    format!("Failed with exit code {}", code)
}

pub fn show_notification<P: EventProxy>(proxy: &P, title: &str, body: &str, success: bool) {
    proxy.send_event(UserEvent::Notification(Notification {
        title: title.to_string(),
        body: body.to_string(),
        success,
    }));
}

/// Shows `message`, or the generic success message when there is none.
pub fn show_success<P: EventProxy>(proxy: &P, title: &str, message: Option<&str>) {
    show_notification(proxy, title, message.unwrap_or(SUCCESS_MESSAGE), true);
}

pub fn show_error<P: EventProxy>(proxy: &P, title: &str, error: &dyn Display) {
    show_notification(proxy, title, &error.to_string(), false);
}

pub fn show_exit_status<P: EventProxy>(proxy: &P, title: &str, exit_code: i32) {
    if exit_code == 0 {
        show_success(proxy, title, None);
    } else {
        show_notification(proxy, title, &exit_code_message(exit_code), false);
    }
}

/// Decides what, if anything, to tell the user about a finished run of the
/// script called `name`.
pub fn notification_for_outcome(
    name: &str,
    mode: NotifyMode,
    outcome: &io::Result<RunOutput>,
) -> Option<Notification> {
    let notification = |body: String, success: bool| Notification {
        title: name.to_string(),
        body,
        success,
    };

    let output = match (mode, outcome) {
        (NotifyMode::Silent, _) => return None,
        (_, Err(e)) => return Some(notification(e.to_string(), false)),
        (_, Ok(output)) => output,
    };

    if mode == NotifyMode::Stdout {
        let text = if !output.stdout.is_empty() {
            output.stdout.as_str()
        } else if !output.success() {
            output.stderr.as_str()
        } else {
            ""
        };
        if !text.is_empty() {
            return Some(notification(text.to_string(), output.success()));
        }
    }

    Some(match output.exit_code {
        Some(0) => notification(SUCCESS_MESSAGE.to_string(), true),
        Some(code) => notification(exit_code_message(code), false),
        None => notification(SIGNAL_MESSAGE.to_string(), false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn finished(exit_code: Option<i32>, stdout: &str, stderr: &str) -> io::Result<RunOutput> {
        Ok(RunOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        })
    }

    fn body(n: Option<Notification>) -> Option<(String, bool)> {
        n.map(|n| (n.body, n.success))
    }

    fn run_body(
        mode: NotifyMode,
        exit_code: Option<i32>,
        stdout: &str,
        stderr: &str,
    ) -> Option<(String, bool)> {
        body(notification_for_outcome("Script", mode, &finished(exit_code, stdout, stderr)))
    }

    #[test]
    fn test_status_mode() {
        let ok =
            notification_for_outcome("Backup", NotifyMode::Status, &finished(Some(0), "", ""));
        assert_eq!(
            ok,
            Some(Notification {
                title: "Backup".to_string(),
                body: "Script executed successfully".to_string(),
                success: true,
            })
        );

        let failed = run_body(NotifyMode::Status, Some(2), "", "x");
        assert_eq!(failed, Some(("Failed with exit code 2".to_string(), false)));

        let killed = run_body(NotifyMode::Status, None, "", "");
        assert_eq!(killed, Some(("Terminated by signal".to_string(), false)));
    }

    #[test]
    fn test_stdout_mode_prefers_output() {
        let shown = run_body(NotifyMode::Stdout, Some(0), "10.0.0.2\n", "");
        assert_eq!(shown, Some(("10.0.0.2\n".to_string(), true)));

        let stderr = run_body(NotifyMode::Stdout, Some(1), "", "no route");
        assert_eq!(stderr, Some(("no route".to_string(), false)));

        let silent_ok = run_body(NotifyMode::Stdout, Some(0), "", "noise");
        assert_eq!(silent_ok, Some((SUCCESS_MESSAGE.to_string(), true)));

        let bare_failure = run_body(NotifyMode::Stdout, Some(4), "", "");
        assert_eq!(bare_failure, Some(("Failed with exit code 4".to_string(), false)));
    }

    #[test]
    fn test_none_mode_never_notifies() {
        let launch_failure: io::Result<RunOutput> =
            Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        assert_eq!(notification_for_outcome("X", NotifyMode::Silent, &launch_failure), None);
        assert_eq!(
            notification_for_outcome("X", NotifyMode::Silent, &finished(Some(1), "", "")),
            None
        );
    }

    #[test]
    fn test_launch_failure_reports_error() {
        let launch_failure: io::Result<RunOutput> =
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
        let shown = notification_for_outcome("X", NotifyMode::Stdout, &launch_failure);
        assert_eq!(body(shown), Some(("permission denied".to_string(), false)));
    }

    #[test]
    fn test_helpers_send_notification_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        show_success(&tx, "Scripts Refreshed", Some("All scripts have been reloaded from disk"));
        show_exit_status(&tx, "Job", 0);
        show_exit_status(&tx, "Job", 9);
        show_error(&tx, "Job", &"boom");

        let bodies: Vec<(String, bool)> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| match event {
                UserEvent::Notification(n) => (n.body, n.success),
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(
            bodies,
            vec![
                ("All scripts have been reloaded from disk".to_string(), true),
                (SUCCESS_MESSAGE.to_string(), true),
                ("Failed with exit code 9".to_string(), false),
                ("boom".to_string(), false),
            ]
        );
    }
}
