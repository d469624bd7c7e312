//! auth::browser
//!
//! Delivery of the verification URI to the user.
//!
//! # Actions
//!
//! - `print`: write the URI to the control stream (stderr by default)
//! - `open`: hand the URI to the platform opener, or to a named browser
//! - `exec`: run a configured command template, substituting the single
//!   `%s` placeholder; arguments are passed as a vector, never through a
//!   shell
//! - `clip`: copy the URI to the clipboard with the platform tool; when no
//!   tool works the URI is printed instead
//!
//! The user code is always written to the control stream so it can be
//! compared with what the browser shows.

use std::fmt;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::Mutex;

use thiserror::Error;

use crate::core::errors::ErrorKind;
use crate::core::records::DeviceAuthorization;

/// Errors from delivering the verification URI.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("unknown url action '{0}' (valid: print, open, exec, clip)")]
    UnknownAction(String),

    #[error("url action 'exec' requires url_exec_command")]
    MissingTemplate,

    #[error("invalid url_exec_command: {0}")]
    BadTemplate(String),

    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        source: io::Error,
    },

    #[error("failed to open browser: {0}")]
    Open(String),

    #[error("failed to copy to clipboard: {0}")]
    Clipboard(String),

    #[error("failed to write to terminal: {0}")]
    Output(#[from] io::Error),
}

impl LauncherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LauncherError::UnknownAction(_)
            | LauncherError::MissingTemplate
            | LauncherError::BadTemplate(_) => ErrorKind::Config,
            _ => ErrorKind::Launcher,
        }
    }
}

/// How the verification URI reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlAction {
    Print,
    Open,
    Exec,
    Clip,
}

impl FromStr for UrlAction {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "print" => Ok(UrlAction::Print),
            "open" => Ok(UrlAction::Open),
            "exec" => Ok(UrlAction::Exec),
            "clip" => Ok(UrlAction::Clip),
            other => Err(LauncherError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for UrlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UrlAction::Print => "print",
            UrlAction::Open => "open",
            UrlAction::Exec => "exec",
            UrlAction::Clip => "clip",
        })
    }
}

/// Substitute `uri` for the single `%s` in a command template.
///
/// # Errors
///
/// Returns `LauncherError::BadTemplate` unless the template is non-empty and
/// holds exactly one placeholder.
pub fn render_exec_template(template: &[String], uri: &str) -> Result<Vec<String>, LauncherError> {
    if template.is_empty() {
        return Err(LauncherError::BadTemplate("command is empty".into()));
    }
    let placeholders: usize = template.iter().map(|a| a.matches("%s").count()).sum();
    if placeholders != 1 {
        return Err(LauncherError::BadTemplate(format!(
            "expected exactly one %s, found {}",
            placeholders
        )));
    }
    Ok(template.iter().map(|arg| arg.replace("%s", uri)).collect())
}

/// Delivers the verification URI according to the configured action.
pub struct BrowserLauncher {
    action: UrlAction,
    browser: Option<String>,
    exec_template: Option<Vec<String>>,
    clipboard: Vec<Vec<String>>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl BrowserLauncher {
    /// Launcher writing its control output to stderr.
    pub fn new(action: UrlAction) -> Self {
        Self {
            action,
            browser: None,
            exec_template: None,
            clipboard: clipboard_commands()
                .iter()
                .map(|argv| argv.iter().map(|a| a.to_string()).collect())
                .collect(),
            out: Mutex::new(Box::new(io::stderr())),
        }
    }

    /// Use a specific browser for the `open` action.
    pub fn with_browser(mut self, browser: Option<String>) -> Self {
        self.browser = browser.filter(|b| !b.is_empty());
        self
    }

    /// Command template for the `exec` action.
    pub fn with_exec_template(mut self, template: Option<Vec<String>>) -> Self {
        self.exec_template = template;
        self
    }

    /// Clipboard tools tried in order by the `clip` action.
    pub fn with_clipboard_commands(mut self, commands: Vec<Vec<String>>) -> Self {
        self.clipboard = commands;
        self
    }

    /// Redirect control output.
    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = Mutex::new(out);
        self
    }

    pub fn action(&self) -> UrlAction {
        self.action
    }

    fn say(&self, message: &str) -> Result<(), LauncherError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| LauncherError::Open("output stream poisoned".into()))?;
        writeln!(out, "{}", message)?;
        out.flush()?;
        Ok(())
    }

    fn print_uri(&self, uri: &str) -> Result<(), LauncherError> {
        self.say(&format!(
            "Please open the following URL in your browser:\n\n    {}\n",
            uri
        ))
    }

    /// Deliver the verification URI of `auth`.
    pub fn launch(&self, auth: &DeviceAuthorization) -> Result<(), LauncherError> {
        let uri = auth.verification_uri_complete.as_str();
        tracing::debug!(action = %self.action, "delivering verification uri");

        match self.action {
            UrlAction::Print => self.print_uri(uri)?,
            UrlAction::Open => {
                let result = match &self.browser {
                    Some(browser) => open::with(uri, browser),
                    None => open::that(uri),
                };
                result.map_err(|e| LauncherError::Open(e.to_string()))?;
                self.say("Opening the verification page in your browser.")?;
            }
            UrlAction::Exec => {
                let template = self
                    .exec_template
                    .as_deref()
                    .ok_or(LauncherError::MissingTemplate)?;
                let argv = render_exec_template(template, uri)?;
                spawn_detached(&argv)?;
            }
            UrlAction::Clip => match copy_to_clipboard(&self.clipboard, uri) {
                Ok(()) => self.say("The verification URL has been copied to your clipboard.")?,
                Err(e) => {
                    tracing::warn!(error = %e, "clipboard unavailable, printing the url");
                    self.print_uri(uri)?;
                }
            },
        }

        self.say(&format!("Verify this code in your browser: {}", auth.user_code))
    }
}

/// Start a command without waiting for it. A background thread reaps the
/// child so it does not linger as a zombie while polling.
fn spawn_detached(argv: &[String]) -> Result<(), LauncherError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| LauncherError::BadTemplate("command is empty".into()))?;
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| LauncherError::Spawn {
            command: program.clone(),
            source,
        })?;
    std::thread::spawn(move || {
        if let Err(e) = child.wait() {
            tracing::debug!(error = %e, "failed to reap url opener");
        }
    });
    Ok(())
}

/// Clipboard tools to try, in order.
fn clipboard_commands() -> &'static [&'static [&'static str]] {
    if cfg!(target_os = "macos") {
        &[&["pbcopy"]]
    } else if cfg!(target_os = "windows") {
        &[&["clip"]]
    } else {
        &[&["wl-copy"], &["xclip", "-selection", "clipboard"], &["xsel", "--clipboard", "--input"]]
    }
}

fn copy_to_clipboard(commands: &[Vec<String>], text: &str) -> Result<(), LauncherError> {
    let mut last_error = String::from("no clipboard tool available");
    for argv in commands {
        let Some((program, args)) = argv.split_first() else {
            continue;
        };
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                last_error = format!("{}: {}", program, e);
                continue;
            }
        };
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| LauncherError::Clipboard(e.to_string()))?;
        }
        let status = child
            .wait()
            .map_err(|e| LauncherError::Clipboard(e.to_string()))?;
        if status.success() {
            return Ok(());
        }
        last_error = format!("{} exited with {}", program, status);
    }
    Err(LauncherError::Clipboard(last_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn device() -> DeviceAuthorization {
        DeviceAuthorization {
            device_code: "dc".into(),
            user_code: "ABCD-EFGH".into(),
            verification_uri: "https://example/".into(),
            verification_uri_complete: "https://example/uc".into(),
            expires_in: 60,
            poll_interval: 1,
        }
    }

    #[test]
    fn parses_actions() {
        assert_eq!("print".parse::<UrlAction>().unwrap(), UrlAction::Print);
        assert_eq!("clip".parse::<UrlAction>().unwrap(), UrlAction::Clip);
        let err = "fax".parse::<UrlAction>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(UrlAction::Exec.to_string(), "exec");
    }

    #[test]
    fn print_writes_uri_and_code() {
        let captured = Captured::default();
        let launcher = BrowserLauncher::new(UrlAction::Print)
            .with_output(Box::new(captured.clone()));
        launcher.launch(&device()).unwrap();

        let text = captured.text();
        assert!(text.contains("https://example/uc"));
        assert!(text.contains("ABCD-EFGH"));
    }

    #[test]
    fn template_substitution() {
        let template = vec!["firefox".to_string(), "--new-window".to_string(), "%s".to_string()];
        assert_eq!(
            render_exec_template(&template, "https://x/y?a=b c").unwrap(),
            vec!["firefox", "--new-window", "https://x/y?a=b c"]
        );

        let embedded = vec!["browser".to_string(), "--url=%s".to_string()];
        assert_eq!(
            render_exec_template(&embedded, "https://x").unwrap()[1],
            "--url=https://x"
        );
    }

    #[test]
    fn template_placeholder_count() {
        assert!(render_exec_template(&["open".into()], "u").is_err());
        assert!(render_exec_template(&["%s".into(), "%s".into()], "u").is_err());
        assert!(render_exec_template(&[], "u").is_err());
    }

    #[test]
    fn exec_without_template_is_config_error() {
        let launcher = BrowserLauncher::new(UrlAction::Exec).with_output(Box::new(io::sink()));
        let err = launcher.launch(&device()).unwrap_err();
        assert!(matches!(err, LauncherError::MissingTemplate));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn exec_spawn_failure_is_launcher_error() {
        let launcher = BrowserLauncher::new(UrlAction::Exec)
            .with_exec_template(Some(vec![
                "/nonexistent/ssoenv-browser".to_string(),
                "%s".to_string(),
            ]))
            .with_output(Box::new(io::sink()));
        let err = launcher.launch(&device()).unwrap_err();
        assert!(matches!(err, LauncherError::Spawn { .. }));
        assert_eq!(err.kind(), ErrorKind::Launcher);
    }

    #[test]
    fn clip_without_tool_prints_uri() {
        let captured = Captured::default();
        let launcher = BrowserLauncher::new(UrlAction::Clip)
            .with_clipboard_commands(vec![vec!["/nonexistent/ssoenv-clip".to_string()]])
            .with_output(Box::new(captured.clone()));
        launcher.launch(&device()).unwrap();

        let text = captured.text();
        assert!(text.contains("https://example/uc"));
        assert!(text.contains("ABCD-EFGH"));
        assert!(!text.contains("copied to your clipboard"));
    }

    #[test]
    fn clip_with_no_tools_prints_uri() {
        let captured = Captured::default();
        let launcher = BrowserLauncher::new(UrlAction::Clip)
            .with_clipboard_commands(Vec::new())
            .with_output(Box::new(captured.clone()));
        launcher.launch(&device()).unwrap();
        assert!(captured.text().contains("https://example/uc"));
    }

    #[cfg(unix)]
    #[test]
    fn clip_uses_working_tool() {
        let captured = Captured::default();
        let launcher = BrowserLauncher::new(UrlAction::Clip)
            .with_clipboard_commands(vec![
                vec!["/nonexistent/ssoenv-clip".to_string()],
                vec!["cat".to_string()],
            ])
            .with_output(Box::new(captured.clone()));
        launcher.launch(&device()).unwrap();

        let text = captured.text();
        assert!(text.contains("copied to your clipboard"));
        assert!(!text.contains("https://example/uc"));
    }

    #[cfg(unix)]
    #[test]
    fn exec_runs_template_command() {
        let launcher = BrowserLauncher::new(UrlAction::Exec)
            .with_exec_template(Some(vec!["true".to_string(), "%s".to_string()]))
            .with_output(Box::new(io::sink()));
        launcher.launch(&device()).unwrap();
    }

    #[test]
    fn empty_browser_is_ignored() {
        let launcher = BrowserLauncher::new(UrlAction::Open).with_browser(Some(String::new()));
        assert!(launcher.browser.is_none());
    }
}
