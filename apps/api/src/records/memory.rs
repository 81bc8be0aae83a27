use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::student::StudentRecord;
use crate::records::{RecordFeed, RecordStore, RecordSubscription};

/// Process-local record store. Keeps insertion order.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<StudentRecord>>,
    feed: RecordFeed,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn upsert(&self, mut record: StudentRecord) -> Result<StudentRecord, AppError> {
        record.updated_at = Utc::now();
        {
            let mut records = self.records.write().await;
            match records.iter_mut().find(|r| r.uid == record.uid) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        self.feed.publish(&record);
        Ok(record)
    }

    async fn get(&self, uid: &str) -> Result<Option<StudentRecord>, AppError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.uid == uid).cloned())
    }

    async fn list_all(&self) -> Result<Vec<StudentRecord>, AppError> {
        Ok(self.records.read().await.clone())
    }

    fn subscribe(&self, uid: &str) -> RecordSubscription {
        self.feed.subscribe(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student::Branch;

    fn record(uid: &str, name: &str, cgpa: f64) -> StudentRecord {
        StudentRecord {
            uid: uid.into(),
            name: name.into(),
            email: format!("{uid}@college.edu"),
            branch: Branch::Cse,
            cgpa,
            resume_url: format!("memory://resumes/{uid}/cv.pdf"),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_merges_by_uid() {
        let store = InMemoryRecordStore::new();
        store.upsert(record("u1", "Asha", 8.5)).await.unwrap();
        store.upsert(record("u2", "Ravi", 7.1)).await.unwrap();
        store.upsert(record("u1", "Asha K", 8.9)).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].uid, "u1");
        assert_eq!(all[0].name, "Asha K");
        assert_eq!(all[0].cgpa, 8.9);
        assert_eq!(all[1].uid, "u2");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemoryRecordStore::new();
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_notifies_subscription() {
        let store = InMemoryRecordStore::new();
        let mut sub = store.subscribe("u1");
        store.upsert(record("u1", "Asha", 8.5)).await.unwrap();
        let seen = sub.next().await.unwrap();
        assert_eq!(seen.name, "Asha");
        assert_eq!(seen.uid, "u1");
    }
}
