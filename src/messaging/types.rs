//! Chat directory and message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender id used for the employee's own messages.
pub const EMPLOYEE_SENDER_ID: &str = "employee";

/// Sender id used for the HR desk's own messages.
pub const HR_SENDER_ID: &str = "hr";

/// Which side of the dashboard a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Hr,
}

impl Role {
    /// Sender id this role writes under.
    pub fn sender_id(&self) -> &'static str {
        match self {
            Role::Employee => EMPLOYEE_SENDER_ID,
            Role::Hr => HR_SENDER_ID,
        }
    }

    /// Canned replies offered to this role; HR writes free text only.
    pub fn quick_replies(&self) -> &'static [&'static str] {
        match self {
            Role::Employee => &QUICK_REPLIES,
            Role::Hr => &[],
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "employee" => Some(Role::Employee),
            "hr" => Some(Role::Hr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Online,
    Offline,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

/// A chat directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub role: String,
    pub status: ContactStatus,
    pub priority: Priority,
    pub unread_count: u32,
}

impl Contact {
    /// Case-insensitive substring match on name or role.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.role.to_lowercase().contains(&term)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    Image,
}

/// One chat message. Never edited once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// Canned replies offered to employees.
pub const QUICK_REPLIES: [&str; 6] = [
    "Terima kasih",
    "Baik, akan saya lakukan",
    "Mohon maaf atas keterlambatan",
    "Saya butuh bantuan",
    "Sudah selesai",
    "Akan saya cek dulu",
];

/// Message store errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Content was empty after trimming
    EmptyMessage,
    UnknownContact(String),
}

impl MessageError {
    /// Banner text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            MessageError::EmptyMessage => "Pesan tidak boleh kosong.".to_string(),
            MessageError::UnknownContact(_) => "Kontak tidak ditemukan.".to_string(),
        }
    }
}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageError::EmptyMessage => write!(f, "Message content is empty"),
            MessageError::UnknownContact(id) => write!(f, "Unknown contact: {id}"),
        }
    }
}

impl std::error::Error for MessageError {}
