use chrono::{DateTime, Utc};
use serde::Serialize;

/// Append-only record of a privileged admin action.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: String,
    pub admin_id: String,
    pub action: String,
    pub target_user_id: Option<String>,
    /// Action-specific payload, e.g. the applied field updates
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        admin_id: &str,
        action: &str,
        target_user_id: Option<&str>,
        details: serde_json::Value,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            admin_id: admin_id.to_string(),
            action: action.to_string(),
            target_user_id: target_user_id.map(str::to_string),
            details,
            ip_address,
            created_at: Utc::now(),
        }
    }
}

/// Append-only record of a gated file download.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLog {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    /// File extension, when the name has one
    pub file_type: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DownloadLog {
    pub fn new(
        user_id: &str,
        file_name: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        let file_type = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .filter(|ext| !ext.is_empty());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            file_name: file_name.to_string(),
            file_type,
            ip_address,
            user_agent,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_log_extracts_file_type() {
        let log = DownloadLog::new("u1", "templates-pack.zip", None, None);
        assert_eq!(log.file_type.as_deref(), Some("zip"));

        let log = DownloadLog::new("u1", "README", None, None);
        assert_eq!(log.file_type, None);

        let log = DownloadLog::new("u1", "archive.tar.gz", None, None);
        assert_eq!(log.file_type.as_deref(), Some("gz"));
    }

    #[test]
    fn test_audit_entry_gets_id_and_timestamp() {
        let entry = AuditEntry::new("admin", "user_update", Some("u2"), serde_json::json!({}), None);
        assert!(!entry.id.is_empty());
        assert_eq!(entry.target_user_id.as_deref(), Some("u2"));
    }
}
