//! Callback completion command dispatch
//!
//! Once a callback has been validated, exactly one of three completion
//! actions runs: the default host notification, a user-configured unix
//! command, or a second shortcut chained with the result as text input.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

use crate::config::{CommandType, Config};
use crate::exec::{exec_async, ExecError};
use crate::server::params::CallbackSearchParams;
use crate::shortcut::{Shortcut, ShortcutStatus};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid callback url search params")]
    InvalidSearchParams,
    #[error("Missing custom command configuration value (callback_command_type={0})")]
    MissingCustomCommand(&'static str),
    #[error("Failed to encode command environment: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Callback command execution failed: {0}")]
    Exec(#[from] ExecError),
}

/// Variables exposed to the completion command. Absent optional fields are
/// omitted entirely, never passed as a literal "undefined" or empty text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandEnvironment {
    #[serde(rename = "SHORTCUT_NAME")]
    pub name: String,
    #[serde(rename = "SHORTCUT_STATUS")]
    pub status: String,
    #[serde(rename = "SHORTCUT_RESULT", skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(rename = "SHORTCUT_ERROR", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandEnvironment {
    fn from_params(params: &CallbackSearchParams) -> Result<Self, DispatchError> {
        match (&params.shortcut, &params.status) {
            (Some(shortcut), Some(status)) => Ok(Self {
                name: shortcut.clone(),
                status: status.clone(),
                result: params.result.clone(),
                error: params.error_message.clone(),
            }),
            _ => Err(DispatchError::InvalidSearchParams),
        }
    }

    fn to_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("SHORTCUT_NAME".to_string(), self.name.clone()),
            ("SHORTCUT_STATUS".to_string(), self.status.clone()),
        ];
        if let Some(result) = &self.result {
            env.push(("SHORTCUT_RESULT".to_string(), result.clone()));
        }
        if let Some(error) = &self.error {
            env.push(("SHORTCUT_ERROR".to_string(), error.clone()));
        }
        env
    }
}

pub struct CallbackCommand<'a> {
    environment: CommandEnvironment,
    config: &'a Config,
}

impl<'a> CallbackCommand<'a> {
    pub fn new(params: &CallbackSearchParams, config: &'a Config) -> Result<Self, DispatchError> {
        Ok(Self {
            environment: CommandEnvironment::from_params(params)?,
            config,
        })
    }

    /// Execute the configured completion action, bounded by the configured
    /// command timeout.
    pub async fn run(&self) -> Result<(), DispatchError> {
        let timeout = self.config.command_timeout();
        match self.config.callback_command_type {
            CommandType::Notification => {
                exec_async(
                    &self.notification_command(),
                    &self.environment.to_env(),
                    timeout,
                )
                .await?;
                Ok(())
            }
            CommandType::Command => {
                let command = self.custom_command()?.to_string();
                exec_async(&command, &self.environment.to_env(), timeout).await?;
                Ok(())
            }
            CommandType::Shortcut => {
                let name = self.custom_command()?.to_string();
                // Shortcut invocation has no environment variable channel,
                // so the variables travel base64-encoded as text input.
                let input = BASE64_STANDARD.encode(serde_json::to_string(&self.environment)?);
                Shortcut::new(&name, None, Some(input)).run(timeout).await?;
                Ok(())
            }
        }
    }

    fn custom_command(&self) -> Result<&str, DispatchError> {
        match self
            .config
            .callback_custom_command
            .as_deref()
            .map(str::trim)
        {
            Some(command) if !command.is_empty() => Ok(command),
            _ => Err(DispatchError::MissingCustomCommand(
                self.config.callback_command_type.as_str(),
            )),
        }
    }

    /// Command line for the default completion action: raise a notification
    /// through the bundled notifier app.
    fn notification_command(&self) -> String {
        let mut subtitle = self.environment.name.clone();
        let sound = match ShortcutStatus::parse(&self.environment.status) {
            Some(ShortcutStatus::Success) => {
                subtitle.push_str(" executed successfully");
                if let Some(result) = &self.environment.result {
                    subtitle.push_str(&format!("\nResult: {result}"));
                }
                "Glass"
            }
            Some(ShortcutStatus::Error) => {
                subtitle.push_str(" execution failed");
                if let Some(error) = &self.environment.error {
                    subtitle.push_str(&format!("\nError: {error}"));
                }
                "Sosumi"
            }
            Some(ShortcutStatus::Cancel) => {
                subtitle.push_str(" execution was cancelled");
                "Sosumi"
            }
            None => {
                subtitle.push_str(" received an unknown result status");
                "Sosumi"
            }
        };

        format!(
            "open \"{app}\" --env NOTIFICATION_TITLE=\"{title}\" --env NOTIFICATION_SUBTITLE=\"{subtitle}\" --env NOTIFICATION_SOUND=\"{sound}\"",
            app = self.config.notifier_app_path().display(),
            title = self.config.name,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn params(status: &str, result: Option<&str>, error_message: Option<&str>) -> CallbackSearchParams {
        CallbackSearchParams {
            shortcut: Some("Morning Routine".to_string()),
            status: Some(status.to_string()),
            token: Some("t".to_string()),
            result: result.map(str::to_string),
            error_message: error_message.map(str::to_string),
        }
    }

    fn notification_config() -> Config {
        Config {
            notifier_path: Some(PathBuf::from("/Applications/Shortcutd Notifier.app")),
            ..Config::default()
        }
    }

    #[test]
    fn test_environment_omits_absent_optionals() {
        let config = Config::default();
        let command = CallbackCommand::new(&params("success", None, None), &config)
            .expect("valid params");
        let env = command.environment.to_env();
        assert_eq!(
            env,
            vec![
                ("SHORTCUT_NAME".to_string(), "Morning Routine".to_string()),
                ("SHORTCUT_STATUS".to_string(), "success".to_string()),
            ]
        );
    }

    #[test]
    fn test_environment_requires_shortcut_and_status() {
        let incomplete = CallbackSearchParams {
            shortcut: Some("foo".to_string()),
            status: None,
            token: Some("t".to_string()),
            result: None,
            error_message: None,
        };
        assert!(matches!(
            CallbackCommand::new(&incomplete, &Config::default()),
            Err(DispatchError::InvalidSearchParams)
        ));
    }

    #[test]
    fn test_environment_json_payload() {
        let config = Config::default();
        let command = CallbackCommand::new(
            &params("success", Some("42"), None),
            &config,
        )
        .expect("valid params");
        let json = serde_json::to_string(&command.environment).expect("serialize");
        assert_eq!(
            json,
            r#"{"SHORTCUT_NAME":"Morning Routine","SHORTCUT_STATUS":"success","SHORTCUT_RESULT":"42"}"#
        );
    }

    #[test]
    fn test_notification_command_success_with_result() {
        let config = notification_config();
        let command =
            CallbackCommand::new(&params("success", Some("bar"), None), &config).expect("valid");
        let line = command.notification_command();
        assert!(line.starts_with(r#"open "/Applications/Shortcutd Notifier.app" --env"#));
        assert!(line.contains("NOTIFICATION_TITLE=\"Shortcutd\""));
        assert!(line.contains("Morning Routine executed successfully\nResult: bar"));
        assert!(line.contains("NOTIFICATION_SOUND=\"Glass\""));
    }

    #[test]
    fn test_notification_command_error_with_message() {
        let config = notification_config();
        let command =
            CallbackCommand::new(&params("error", None, Some("boom")), &config).expect("valid");
        let line = command.notification_command();
        assert!(line.contains("Morning Routine execution failed\nError: boom"));
        assert!(line.contains("NOTIFICATION_SOUND=\"Sosumi\""));
    }

    #[test]
    fn test_notification_command_cancel() {
        let config = notification_config();
        let command =
            CallbackCommand::new(&params("cancel", None, None), &config).expect("valid");
        let line = command.notification_command();
        assert!(line.contains("Morning Routine execution was cancelled"));
        assert!(line.contains("NOTIFICATION_SOUND=\"Sosumi\""));
    }

    #[test]
    fn test_notification_command_unknown_status() {
        let config = notification_config();
        let command =
            CallbackCommand::new(&params("exploded", None, None), &config).expect("valid");
        let line = command.notification_command();
        assert!(line.contains("Morning Routine received an unknown result status"));
        assert!(line.contains("NOTIFICATION_SOUND=\"Sosumi\""));
    }

    #[tokio::test]
    async fn test_custom_command_runs_with_environment() {
        let config = Config {
            callback_command_type: CommandType::Command,
            callback_custom_command: Some(
                r#"test "$SHORTCUT_NAME" = "Morning Routine" -a "$SHORTCUT_STATUS" = "success""#
                    .to_string(),
            ),
            ..Config::default()
        };
        let command = CallbackCommand::new(&params("success", None, None), &config).expect("valid");
        assert!(command.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_custom_command_fails_without_executing() {
        let config = Config {
            callback_command_type: CommandType::Command,
            callback_custom_command: Some("   ".to_string()),
            ..Config::default()
        };
        let command = CallbackCommand::new(&params("success", None, None), &config).expect("valid");
        assert!(matches!(
            command.run().await,
            Err(DispatchError::MissingCustomCommand("command"))
        ));
    }

    #[tokio::test]
    async fn test_empty_chained_shortcut_name_fails() {
        let config = Config {
            callback_command_type: CommandType::Shortcut,
            callback_custom_command: None,
            ..Config::default()
        };
        let command = CallbackCommand::new(&params("success", None, None), &config).expect("valid");
        assert!(matches!(
            command.run().await,
            Err(DispatchError::MissingCustomCommand("shortcut"))
        ));
    }

    #[tokio::test]
    async fn test_failing_custom_command_surfaces_exec_error() {
        let config = Config {
            callback_command_type: CommandType::Command,
            callback_custom_command: Some("exit 7".to_string()),
            ..Config::default()
        };
        let command = CallbackCommand::new(&params("success", None, None), &config).expect("valid");
        assert!(matches!(
            command.run().await,
            Err(DispatchError::Exec(ExecError::NonZeroExit { code: 7, .. }))
        ));
    }

    #[tokio::test]
    async fn test_custom_command_timeout_is_a_dispatch_failure() {
        let config = Config {
            callback_command_type: CommandType::Command,
            callback_custom_command: Some("sleep 5".to_string()),
            callback_command_timeout_ms: 50,
            ..Config::default()
        };
        let command = CallbackCommand::new(&params("success", None, None), &config).expect("valid");
        assert!(matches!(
            command.run().await,
            Err(DispatchError::Exec(ExecError::Timeout(_)))
        ));
    }
}
