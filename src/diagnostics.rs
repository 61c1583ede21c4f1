//! Parse diagnostics.
//!
//! The tagged block format is deliberately permissive: unknown block types,
//! short reads, and trailing bytes inside a block are all recoverable rather
//! than fatal. Rather than logging to stderr, readers collect these as
//! [`Notification`] items on a [`NotificationCollection`] so a caller can
//! inspect what was recovered from after a read.

use std::fmt;

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    /// A block or sub-block had unread bytes remaining when its scope closed.
    ExtraData,
    /// A block type byte did not match any known kind; preserved as raw bytes.
    UnreadableBlock,
    /// A CRDT sequence item's `right_id` pointed at an id never defined.
    DanglingSequenceLink,
    /// A string's declared format byte was not 0 or 1.
    UnknownFormatCode,
    /// Non-fatal warning that doesn't fit the other categories.
    Warning,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtraData => write!(f, "ExtraData"),
            Self::UnreadableBlock => write!(f, "UnreadableBlock"),
            Self::DanglingSequenceLink => write!(f, "DanglingSequenceLink"),
            Self::UnknownFormatCode => write!(f, "UnknownFormatCode"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// A single notification produced during reading (or writing).
#[derive(Debug, Clone)]
pub struct Notification {
    /// The category.
    pub notification_type: NotificationType,
    /// A human-readable description of the issue.
    pub message: String,
}

impl Notification {
    /// Create a new notification.
    pub fn new(notification_type: NotificationType, message: impl Into<String>) -> Self {
        Self {
            notification_type,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.notification_type, self.message)
    }
}

/// Collects notifications during a read (or write) operation.
#[derive(Debug, Clone, Default)]
pub struct NotificationCollection {
    items: Vec<Notification>,
}

impl NotificationCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Record a notification.
    pub fn notify(&mut self, notification_type: NotificationType, message: impl Into<String>) {
        self.items.push(Notification::new(notification_type, message));
    }

    /// Check if there are any notifications.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of notifications.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate over all notifications.
    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.items.iter()
    }

    /// Get all notifications of a specific type.
    pub fn of_type(&self, nt: NotificationType) -> Vec<&Notification> {
        self.items.iter().filter(|n| n.notification_type == nt).collect()
    }

    /// Check whether any notification of the given type exists.
    pub fn has_type(&self, nt: NotificationType) -> bool {
        self.items.iter().any(|n| n.notification_type == nt)
    }

    /// Consume the collection into a `Vec`.
    pub fn into_vec(self) -> Vec<Notification> {
        self.items
    }
}

impl IntoIterator for NotificationCollection {
    type Item = Notification;
    type IntoIter = std::vec::IntoIter<Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a NotificationCollection {
    type Item = &'a Notification;
    type IntoIter = std::slice::Iter<'a, Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_creation() {
        let n = Notification::new(NotificationType::ExtraData, "4 bytes left in block 0x07");
        assert_eq!(n.notification_type, NotificationType::ExtraData);
    }

    #[test]
    fn test_collection_basics() {
        let mut c = NotificationCollection::new();
        assert!(c.is_empty());

        c.notify(NotificationType::ExtraData, "a");
        c.notify(NotificationType::UnreadableBlock, "b");
        c.notify(NotificationType::ExtraData, "c");

        assert_eq!(c.len(), 3);
        assert_eq!(c.of_type(NotificationType::ExtraData).len(), 2);
        assert!(c.has_type(NotificationType::UnreadableBlock));
        assert!(!c.has_type(NotificationType::DanglingSequenceLink));
    }
}
