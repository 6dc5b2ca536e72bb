//! Common test utilities for submission-relay end-to-end tests

use std::collections::HashMap;
use std::path::Path;
use submission_relay::{Config, Database, Pipeline};
use wiremock::MockServer;

/// Mail domain used by every environment built here
pub const MAIL_DOMAIN: &str = "mg.example.com";

/// Audit table the tests write to
pub const AUDIT_TABLE: &str = "email_tracking";

/// Configuration pointing the mail API at `mail_server` and the archive at `root`
///
/// Built through the same environment lookup the binary uses.
pub fn config_for(mail_server: &MockServer, root: &Path) -> Config {
    let env: HashMap<&str, String> = HashMap::from([
        ("BUCKET_NAME", "submissions".to_string()),
        ("ARCHIVE_DIR", root.join("archive").display().to_string()),
        ("MAILGUN_API", "key-test".to_string()),
        ("EMAIL_DOMAIN", MAIL_DOMAIN.to_string()),
        ("MAILGUN_API_BASE", mail_server.uri()),
        ("EMAIL_TIMEOUT_SECS", "2".to_string()),
        ("DYNAMO_TABLE", AUDIT_TABLE.to_string()),
        (
            "AUDIT_DATABASE_PATH",
            root.join("audit.db").display().to_string(),
        ),
        ("FETCH_TIMEOUT_SECS", "5".to_string()),
    ]);
    Config::from_lookup(|key| env.get(key).cloned()).expect("test configuration is valid")
}

/// Open the audit database and build the production pipeline for `config`
pub async fn pipeline_for(config: &Config) -> (Pipeline, std::sync::Arc<Database>) {
    let db = std::sync::Arc::new(
        Database::new(&config.audit.database_path, &config.audit.table_name)
            .await
            .expect("audit database opens"),
    );
    (Pipeline::from_config(config, db.clone()), db)
}

/// SNS batch envelope with one submission record
pub fn sns_event(email: &str, url: &str, assignment: &str) -> Vec<u8> {
    let message = serde_json::json!({
        "student_email": email,
        "submission_url": url,
        "assignment_name": assignment,
    })
    .to_string();
    serde_json::json!({
        "Records": [{
            "EventSource": "aws:sns",
            "Sns": {
                "Type": "Notification",
                "MessageId": "it-0",
                "Message": message,
            }
        }]
    })
    .to_string()
    .into_bytes()
}
