//! Operation journal
//!
//! Every public operation opens a `JournalCollection`, appends notes while it
//! runs and closes it when done. Closing pushes the collection to `JOURNAL`,
//! which sits outside the transaction snapshot: an operation that is rolled
//! back still leaves its notes behind.

use alloy_primitives::Address;
use candid::{CandidType, Decode, Encode};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;

use crate::{
    state::insert_journal_collection,
    utils::{
        common::now,
        error::{ManagerError, ManagerResult},
    },
};

/// Category of a journal entry
#[derive(Clone, Copy, CandidType, Debug, Deserialize, PartialEq, Eq)]
pub enum LogType {
    Info,
    /// Final outcome of a public operation
    ExecutionResult,
    /// Whitelisting, registration, ownership and role changes
    Registry,
    /// Deposits, withdrawals and rebalances
    Allocation,
    Upgrade,
    /// Reward swaps
    Harvest,
}

/// Journal entry
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct JournalEntry {
    /// Seconds since the epoch
    pub timestamp: u64,
    pub entry: ManagerResult<()>,
    pub log_type: LogType,
    pub note: Option<String>,
}

impl JournalEntry {
    pub fn new(entry: ManagerResult<()>, log_type: LogType) -> Self {
        Self {
            timestamp: now(),
            entry,
            log_type,
            note: None,
        }
    }

    /// Fills the `note` field of the entry
    pub fn note<S: AsRef<str>>(mut self, text: S) -> Self {
        self.note = Some(text.as_ref().to_string());
        self
    }
}

/// Notes recorded by one public operation
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct JournalCollection {
    pub start_date_and_time: String,
    pub end_date_and_time: String,
    /// Strategy instance the operation ran against, if any
    pub strategy: Option<String>,
    pub entries: Vec<JournalEntry>,
    closed: bool,
}

impl JournalCollection {
    /// Opens a new collection. It is pushed to the journal when closed or dropped.
    pub fn open(strategy: Option<Address>) -> Self {
        Self {
            start_date_and_time: timestamp(),
            end_date_and_time: String::new(),
            strategy: strategy.map(|address| address.to_string()),
            entries: vec![],
            closed: false,
        }
    }

    /// Appends a note to the collection
    pub fn append_note<S: AsRef<str>>(
        &mut self,
        entry: ManagerResult<()>,
        log_type: LogType,
        note: S,
    ) -> &mut Self {
        self.entries
            .push(JournalEntry::new(entry, log_type).note(note));
        self
    }

    /// Records the final outcome of an operation
    pub fn append_result<T>(&mut self, result: &ManagerResult<T>, note: &str) -> &mut Self {
        let entry = result.as_ref().map(|_| ()).map_err(Clone::clone);
        self.append_note(entry, LogType::ExecutionResult, note)
    }

    /// Returns `true` if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if any entry recorded a failure
    pub fn has_failure(&self) -> bool {
        self.entries.iter().any(|entry| entry.entry.is_err())
    }

    /// Returns the first recorded failure, if any
    pub fn first_failure(&self) -> Option<&ManagerError> {
        self.entries
            .iter()
            .find_map(|entry| entry.entry.as_ref().err())
    }

    /// Stamps the end time and pushes the collection to the journal
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.end_date_and_time = timestamp();
        insert_journal_collection(self.clone());
    }

    /// Candid encoding of the collection
    pub fn to_bytes(&self) -> ManagerResult<Vec<u8>> {
        Encode!(self).map_err(|err| ManagerError::DecodingError(err.to_string()))
    }

    /// Decodes a collection produced by `to_bytes`. Decoded collections count as closed.
    pub fn from_bytes(bytes: &[u8]) -> ManagerResult<Self> {
        let mut collection = Decode!(bytes, Self)
            .map_err(|err| ManagerError::DecodingError(err.to_string()))?;
        collection.closed = true;
        Ok(collection)
    }
}

impl Drop for JournalCollection {
    fn drop(&mut self) {
        self.close();
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JOURNAL;

    fn journal_len() -> usize {
        JOURNAL.with(|journal| journal.borrow().len())
    }

    #[test]
    fn test_collection_is_pushed_once_on_drop() {
        {
            let mut journal = JournalCollection::open(Some(Address::repeat_byte(0x01)));
            journal.append_note(Ok(()), LogType::Info, "started");
            journal.close();
        }

        assert_eq!(journal_len(), 1);
        JOURNAL.with(|journal| {
            let binding = journal.borrow();
            let collection = &binding[0];
            assert_eq!(collection.entries.len(), 1);
            assert_eq!(collection.entries[0].note.as_deref(), Some("started"));
            assert_eq!(
                collection.strategy,
                Some(Address::repeat_byte(0x01).to_string())
            );
            assert!(!collection.end_date_and_time.is_empty());
        });
    }

    #[test]
    fn test_failures_are_reported() {
        let mut journal = JournalCollection::open(None);
        journal.append_note(Ok(()), LogType::Info, "fine");
        journal.append_result::<()>(&Err(ManagerError::Locked), "failed");

        assert!(journal.has_failure());
        assert_eq!(journal.first_failure(), Some(&ManagerError::Locked));
        assert_eq!(journal.entries[1].log_type, LogType::ExecutionResult);
    }

    #[test]
    fn test_candid_encoding() {
        let mut journal = JournalCollection::open(None);
        journal.append_note(Err(ManagerError::NonExistentValue), LogType::Registry, "missing");

        let bytes = journal.to_bytes().unwrap();
        let decoded = JournalCollection::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.entries, journal.entries);

        drop(journal);
        drop(decoded);
        assert_eq!(journal_len(), 1);
    }
}
