//! Journal maintenance
//!
//! The journal grows by one collection per public operation. Cleanup drops
//! collections that recorded nothing and trims the journal to the most
//! recent `MAX_JOURNAL_COLLECTIONS` collections.

use crate::{
    constants::MAX_JOURNAL_COLLECTIONS,
    journal::{JournalCollection, LogType},
    state::JOURNAL,
};

/// Runs the journal cleanup and records the outcome in a collection of its own
pub fn daily_cleanup() {
    let mut journal = JournalCollection::open(None);

    let removed = journal_cleanup();

    journal.append_note(
        Ok(()),
        LogType::Info,
        format!("Cleaned up the journal by removing {} collections.", removed),
    );
}

/// Removes empty collections and the oldest collections beyond `MAX_JOURNAL_COLLECTIONS`.
/// Returns the number of collections removed.
pub fn journal_cleanup() -> usize {
    JOURNAL.with(|journal| {
        let mut binding = journal.borrow_mut();
        let before = binding.len();

        binding.retain(|collection| !collection.is_empty());

        let len = binding.len();
        if len > MAX_JOURNAL_COLLECTIONS {
            let newest = binding.split_off(len - MAX_JOURNAL_COLLECTIONS);
            *binding = newest;
        }

        before - binding.len()
    })
}
