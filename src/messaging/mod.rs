//! Employee/HR chat threads.

pub mod store;
pub mod types;

// Re-export commonly used types
pub use store::MessageStore;
pub use types::{
    Contact, ContactStatus, Message, MessageError, MessageKind, Priority, Role,
    EMPLOYEE_SENDER_ID, HR_SENDER_ID, QUICK_REPLIES,
};
