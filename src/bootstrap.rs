// Copyright (c) 2025 - Cowboy AI, Inc.
//! Boot Artifact
//!
//! The shell script every compute instance runs on first boot. It writes the
//! application properties (database credentials and endpoint, notification
//! topic and region) and starts the telemetry agent.
//!
//! The script depends on three values that only exist after realization, so
//! it is itself a [`Deferred`] built with one [`Join`] over those inputs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt::Write as _;

use crate::frp::{Deferred, Join};

/// Properties file the application reads at startup
pub const PROPERTIES_FILE: &str = "/opt/csye6225/application.properties";
/// Owner of the properties file, also the database user and schema
pub const SERVICE_ACCOUNT: &str = "csye6225";
pub const DATABASE_NAME: &str = "csye6225";

const TELEMETRY_AGENT_COMMAND: &str = "sudo /opt/aws/amazon-cloudwatch-agent/bin/amazon-cloudwatch-agent-ctl \\\n    -a fetch-config \\\n    -m ec2 \\\n    -c file:/opt/cloudwatch-config.json \\\n    -s";

/// Resolved inputs of the boot artifact
#[derive(Clone, PartialEq, Eq)]
pub struct BootInputs {
    pub db_password: String,
    pub db_endpoint: String,
    pub topic_arn: String,
    pub region: String,
}

impl std::fmt::Debug for BootInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootInputs")
            .field("db_password", &"[REDACTED]")
            .field("db_endpoint", &self.db_endpoint)
            .field("topic_arn", &self.topic_arn)
            .field("region", &self.region)
            .finish()
    }
}

/// Escape a value for use inside a double-quoted shell string
fn shell_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render the script for fully resolved inputs
pub fn render_boot_script(inputs: &BootInputs) -> String {
    let lines = [
        "[mysql]".to_string(),
        format!("username={SERVICE_ACCOUNT}"),
        format!("password={}", inputs.db_password),
        format!("hostname={}", inputs.db_endpoint),
        format!("database={DATABASE_NAME}"),
        "[sns]".to_string(),
        format!("topicArn={}", inputs.topic_arn),
        format!("region={}", inputs.region),
    ];

    let mut script = String::from("#!/bin/bash\n");
    let _ = writeln!(script, "ENV_FILE=\"{PROPERTIES_FILE}\"");
    for line in &lines {
        let _ = writeln!(script, "echo \"{}\" >> $ENV_FILE", shell_quote(line));
    }
    let _ = writeln!(script, "chown {SERVICE_ACCOUNT}:{SERVICE_ACCOUNT} ${{ENV_FILE}}");
    let _ = writeln!(script, "chmod 444 ${{ENV_FILE}}");
    script.push('\n');
    script.push_str(TELEMETRY_AGENT_COMMAND);
    script.push('\n');
    script
}

/// Join the credential, the realized endpoint and the realized topic into
/// the boot script
///
/// The region is known from configuration. The result stays pending until
/// all three inputs resolve, and inherits their secrecy.
pub fn compose_boot_artifact(
    db_password: Deferred<String>,
    db_endpoint: Deferred<String>,
    topic_arn: Deferred<String>,
    region: String,
) -> Deferred<String> {
    compose_boot_artifact_with(db_password, db_endpoint, topic_arn, region, render_boot_script)
}

/// Same join as [`compose_boot_artifact`] with a caller-supplied renderer
///
/// `render` runs once, after the last input resolves.
pub fn compose_boot_artifact_with<F>(
    db_password: Deferred<String>,
    db_endpoint: Deferred<String>,
    topic_arn: Deferred<String>,
    region: String,
    render: F,
) -> Deferred<String>
where
    F: FnOnce(&BootInputs) -> String + Send + 'static,
{
    Join::new("bootArtifact")
        .with(db_password)
        .with(db_endpoint)
        .with(topic_arn)
        .then(move |values| {
            let mut values = values.into_iter();
            let inputs = BootInputs {
                db_password: values.next().unwrap_or_default(),
                db_endpoint: values.next().unwrap_or_default(),
                topic_arn: values.next().unwrap_or_default(),
                region,
            };
            render(&inputs)
        })
}

/// Base64 form expected by the launch template
pub fn encode_user_data(script: Deferred<String>) -> Deferred<String> {
    script
        .map(|s| STANDARD.encode(s.as_bytes()))
        .relabel("userData")
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn inputs() -> BootInputs {
        BootInputs {
            db_password: "pw1".into(),
            db_endpoint: "db.example.internal".into(),
            topic_arn: "topic-123".into(),
            region: "us-east-1".into(),
        }
    }

    #[test]
    fn test_render_properties() {
        let script = render_boot_script(&inputs());
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("ENV_FILE=\"/opt/csye6225/application.properties\""));
        assert!(script.contains("echo \"password=pw1\" >> $ENV_FILE"));
        assert!(script.contains("echo \"hostname=db.example.internal\" >> $ENV_FILE"));
        assert!(script.contains("echo \"topicArn=topic-123\" >> $ENV_FILE"));
        assert!(script.contains("echo \"region=us-east-1\" >> $ENV_FILE"));
        assert!(script.contains("chown csye6225:csye6225 ${ENV_FILE}"));
        assert!(script.contains("chmod 444 ${ENV_FILE}"));
        assert!(script.contains("amazon-cloudwatch-agent-ctl"));
    }

    #[test]
    fn test_sections_in_order() {
        let script = render_boot_script(&inputs());
        let mysql = script.find("[mysql]").unwrap();
        let sns = script.find("[sns]").unwrap();
        let chmod = script.find("chmod 444").unwrap();
        let agent = script.find("amazon-cloudwatch-agent-ctl").unwrap();
        assert!(mysql < sns && sns < chmod && chmod < agent);
    }

    #[test]
    fn test_shell_metacharacters_escaped() {
        let mut inputs = inputs();
        inputs.db_password = "p\"$x`y\\".into();
        let script = render_boot_script(&inputs);
        assert!(script.contains(r#"echo "password=p\"\$x\`y\\" >> $ENV_FILE"#));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", inputs());
        assert!(!rendered.contains("pw1"));
    }

    #[tokio::test]
    async fn test_compose_waits_for_all_inputs() {
        let password = Deferred::ready("dbPassword", "pw1".to_string()).into_secret();
        let (set_endpoint, endpoint) = Deferred::pending("csye6225.endpoint");
        let (set_topic, topic) = Deferred::pending("topic.arn");

        let artifact = compose_boot_artifact(password, endpoint, topic, "us-east-1".into());
        assert!(artifact.is_secret());

        set_topic.resolve("topic-123".to_string());
        assert!(artifact.resolve().now_or_never().is_none());

        set_endpoint.resolve("db.example.internal".to_string());
        let script = artifact.resolve().await.unwrap();
        assert!(script.contains("password=pw1"));
        assert!(script.contains("hostname=db.example.internal"));
        assert!(script.contains("topicArn=topic-123"));
    }

    #[tokio::test]
    async fn test_user_data_is_base64_of_script() {
        let script = Deferred::ready("bootArtifact", "#!/bin/bash\n".to_string());
        let encoded = encode_user_data(script).resolve().await.unwrap();
        assert_eq!(encoded, "IyEvYmluL2Jhc2gK");
    }
}
