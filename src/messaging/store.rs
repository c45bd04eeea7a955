//! Append-only chat store.

use crate::messaging::types::{
    Contact, ContactStatus, Message, MessageError, MessageKind, Priority, EMPLOYEE_SENDER_ID,
};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Chat threads keyed by contact id.
///
/// Threads are handed out as `Arc<[Message]>` snapshots. An append builds a
/// new slice, so a snapshot never changes after it is returned.
#[derive(Debug, Default)]
pub struct MessageStore {
    contacts: Vec<Contact>,
    threads: RwLock<HashMap<String, Arc<[Message]>>>,
}

impl MessageStore {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts,
            threads: RwLock::new(HashMap::new()),
        }
    }

    /// Store seeded with the dashboard's demo contacts and threads.
    pub fn with_demo_data() -> Self {
        let store = Self::new(demo_contacts());
        {
            let mut threads = store.threads.write().unwrap_or_else(|e| e.into_inner());
            for (contact_id, messages) in demo_threads() {
                threads.insert(contact_id.to_string(), messages.into());
            }
        }
        store
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn contact(&self, contact_id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == contact_id)
    }

    /// Contacts whose name or role contains `term`, ignoring case.
    pub fn search_contacts(&self, term: &str) -> Vec<&Contact> {
        self.contacts.iter().filter(|c| c.matches(term)).collect()
    }

    /// Append a message to a contact's thread.
    pub fn append(
        &self,
        contact_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, MessageError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MessageError::EmptyMessage);
        }
        if self.contact(contact_id).is_none() {
            return Err(MessageError::UnknownContact(contact_id.to_string()));
        }

        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            kind: MessageKind::Text,
        };

        let mut threads = self.threads.write().unwrap_or_else(|e| e.into_inner());
        let thread = threads
            .entry(contact_id.to_string())
            .or_insert_with(|| Arc::from(Vec::new()));
        let mut next = thread.to_vec();
        next.push(message.clone());
        *thread = next.into();

        tracing::debug!(contact_id, sender_id, "message appended");
        Ok(message)
    }

    /// Snapshot of a contact's thread, oldest first.
    pub fn thread(&self, contact_id: &str) -> Result<Arc<[Message]>, MessageError> {
        if self.contact(contact_id).is_none() {
            return Err(MessageError::UnknownContact(contact_id.to_string()));
        }
        let threads = self.threads.read().unwrap_or_else(|e| e.into_inner());
        Ok(threads
            .get(contact_id)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new())))
    }

    /// Latest message in a thread, used for the directory preview.
    pub fn last_message(&self, contact_id: &str) -> Option<Message> {
        let threads = self.threads.read().unwrap_or_else(|e| e.into_inner());
        threads.get(contact_id).and_then(|t| t.last().cloned())
    }
}

fn contact(
    id: &str,
    name: &str,
    role: &str,
    status: ContactStatus,
    priority: Priority,
    unread_count: u32,
) -> Contact {
    Contact {
        id: id.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        status,
        priority,
        unread_count,
    }
}

fn demo_contacts() -> Vec<Contact> {
    use ContactStatus::*;
    vec![
        contact("1", "Sarah Johnson", "HR Manager", Online, Priority::High, 2),
        contact("2", "Ahmad Supervisor", "Team Lead", Online, Priority::Normal, 0),
        contact("3", "Dewi Lestari", "UI/UX Designer", Away, Priority::Normal, 1),
        contact("4", "IT Support", "Technical Support", Online, Priority::Low, 0),
        contact("5", "Budi Santoso", "Software Engineer", Offline, Priority::Normal, 0),
    ]
}

/// Demo threads as `(contact, [(sender, content, minutes ago)])`.
fn demo_threads() -> Vec<(&'static str, Vec<Message>)> {
    let raw: [(&str, &[(&str, &str, i64)]); 5] = [
        (
            "1",
            &[
                ("1", "Halo, bagaimana kabar Anda hari ini? Saya melihat ada beberapa indikator stress yang perlu kita diskusikan.", 35),
                (EMPLOYEE_SENDER_ID, "Halo Bu Sarah, terima kasih sudah menghubungi. Iya, hari ini memang agak berat dengan deadline project yang menumpuk.", 33),
                ("1", "Saya mengerti. Mari kita atur waktu untuk konsultasi lebih lanjut. Apakah Anda bisa meluangkan waktu besok pagi?", 32),
                ("1", "Terima kasih atas laporannya. Kami akan segera menindaklanjuti.", 30),
            ],
        ),
        (
            "2",
            &[
                ("2", "Selamat pagi! Jangan lupa meeting tim hari ini pukul 14:00 di ruang meeting A.", 110),
                (EMPLOYEE_SENDER_ID, "Siap Pak Ahmad, sudah saya catat. Ada agenda khusus yang perlu saya persiapkan?", 108),
                ("2", "Meeting hari ini pukul 14:00, jangan lupa ya!", 105),
            ],
        ),
        (
            "3",
            &[
                ("3", "Hai! Bisa bantu review design untuk fitur baru ini? Butuh feedback dari perspektif developer.", 1_470),
                (EMPLOYEE_SENDER_ID, "Tentu! Kirim aja file designnya, nanti saya review dan kasih feedback.", 1_455),
                ("3", "Bisa bantu review design ini?", 1_440),
            ],
        ),
        (
            "4",
            &[
                (EMPLOYEE_SENDER_ID, "Halo IT Support, saya mengalami masalah dengan akses ke sistem internal. Bisa dibantu?", 2_940),
                ("4", "Halo, saya akan cek sistemnya dulu. Mohon tunggu sebentar ya.", 2_925),
                ("4", "Masalah sudah teratasi, silakan dicoba kembali.", 2_910),
            ],
        ),
        (
            "5",
            &[
                (EMPLOYEE_SENDER_ID, "Budi, bisa tolong review code untuk fitur authentication?", 4_440),
                ("5", "Oke, nanti sore saya review ya. Kirim link PR-nya.", 4_425),
                ("5", "Code review sudah selesai, ada beberapa catatan.", 4_320),
            ],
        ),
    ];

    let now = Utc::now();
    raw.iter()
        .map(|(contact_id, messages)| {
            let thread = messages
                .iter()
                .enumerate()
                .map(|(i, (sender, content, minutes_ago))| Message {
                    id: (i + 1).to_string(),
                    sender_id: sender.to_string(),
                    content: content.to_string(),
                    timestamp: now - Duration::minutes(*minutes_ago),
                    kind: MessageKind::Text,
                })
                .collect();
            (*contact_id, thread)
        })
        .collect()
}
