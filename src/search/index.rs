//! Versioned inverted-index snapshots.
//!
//! The whole index lives in the durable store as one snapshot under
//! `search:index:current`; every invocation that needs it loads the
//! current version. A full rebuild replaces the document set, bumps the
//! version stamp and parks the previous snapshot under a short-lived
//! backup key; an incremental upsert merges documents by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::cache::{CacheStore, PutOptions, StoreError, get_json, keys, put_json};
use crate::domain::search::{FieldKind, SearchDocument};

/// One token occurrence: document position in the snapshot plus the field
/// it occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: usize,
    pub field: FieldKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Monotonic version stamp, bumped on every rebuild or upsert.
    pub version: u64,
    pub built_at: OffsetDateTime,
    pub documents: Vec<SearchDocument>,
    pub postings: HashMap<String, Vec<Posting>>,
}

impl IndexSnapshot {
    fn build(version: u64, documents: Vec<SearchDocument>) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        for (doc, document) in documents.iter().enumerate() {
            for field in FieldKind::ALL {
                for token in super::text::tokenize(document.field(field)) {
                    let entry = postings.entry(token.to_string()).or_default();
                    let posting = Posting { doc, field };
                    if !entry.contains(&posting) {
                        entry.push(posting);
                    }
                }
            }
        }
        Self {
            version,
            built_at: OffsetDateTime::now_utc(),
            documents,
            postings,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Store-backed access to the current index snapshot.
#[derive(Clone)]
pub struct IndexStore {
    store: Arc<dyn CacheStore>,
    backup_ttl: Duration,
}

impl IndexStore {
    pub fn new(store: Arc<dyn CacheStore>, backup_ttl: Duration) -> Self {
        Self { store, backup_ttl }
    }

    /// Load the current snapshot, if one has been built.
    pub async fn load(&self) -> Result<Option<IndexSnapshot>, StoreError> {
        get_json(self.store.as_ref(), keys::INDEX_CURRENT_KEY).await
    }

    /// Replace the entire document set.
    ///
    /// The previous snapshot is kept under a versioned backup key with a
    /// short TTL so a bad rebuild can be inspected before it ages out.
    pub async fn rebuild(
        &self,
        documents: Vec<SearchDocument>,
    ) -> Result<IndexSnapshot, StoreError> {
        let previous = self.load().await?;
        let version = previous.as_ref().map(|s| s.version + 1).unwrap_or(1);

        if let Some(previous) = previous {
            put_json(
                self.store.as_ref(),
                &keys::index_backup_key(previous.version),
                &previous,
                PutOptions::with_ttl(self.backup_ttl),
            )
            .await?;
        }

        let snapshot = IndexSnapshot::build(version, documents);
        self.persist(&snapshot).await?;
        info!(
            version = snapshot.version,
            documents = snapshot.len(),
            "search index rebuilt"
        );
        Ok(snapshot)
    }

    /// Merge `documents` into the current set by id, leaving others
    /// untouched, and bump the version stamp.
    pub async fn upsert(
        &self,
        documents: Vec<SearchDocument>,
    ) -> Result<IndexSnapshot, StoreError> {
        let current = self.load().await?;
        let (version, mut merged) = match current {
            Some(snapshot) => (snapshot.version + 1, snapshot.documents),
            None => (1, Vec::new()),
        };

        let updated = documents.len();
        for incoming in documents {
            match merged.iter_mut().find(|doc| doc.id == incoming.id) {
                Some(slot) => *slot = incoming,
                None => merged.push(incoming),
            }
        }

        let snapshot = IndexSnapshot::build(version, merged);
        self.persist(&snapshot).await?;
        info!(
            version = snapshot.version,
            upserted = updated,
            documents = snapshot.len(),
            "search index upserted"
        );
        Ok(snapshot)
    }

    async fn persist(&self, snapshot: &IndexSnapshot) -> Result<(), StoreError> {
        put_json(
            self.store.as_ref(),
            keys::INDEX_CURRENT_KEY,
            snapshot,
            PutOptions::default(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::MemoryStore;
    use crate::domain::product::ProductRecord;
    use crate::domain::product::VolatilityFlags;

    use super::*;

    pub(crate) fn doc(id: &str, name: &str, category: &str) -> SearchDocument {
        SearchDocument::from_record(&ProductRecord {
            id: id.to_string(),
            slug: id.to_string(),
            name: name.to_string(),
            description: format!("{name} description"),
            category: category.to_string(),
            vendor: "Loja Bebê".to_string(),
            price: 100.0,
            flags: VolatilityFlags::default(),
        })
    }

    fn index_store(store: Arc<MemoryStore>) -> IndexStore {
        IndexStore::new(store, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn rebuild_bumps_version_and_keeps_backup() {
        let store = MemoryStore::shared();
        let index = index_store(store.clone());

        let first = index
            .rebuild(vec![doc("p-1", "Kit Enxoval Completo", "Enxoval")])
            .await
            .expect("first build");
        assert_eq!(first.version, 1);

        let second = index
            .rebuild(vec![doc("p-2", "Berço Montessoriano", "Berços")])
            .await
            .expect("second build");
        assert_eq!(second.version, 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second.documents[0].id, "p-2");

        let backup: Option<IndexSnapshot> =
            get_json(store.as_ref(), &keys::index_backup_key(1))
                .await
                .expect("backup read");
        assert_eq!(backup.expect("backup").version, 1);
    }

    #[tokio::test]
    async fn upsert_merges_by_id() {
        let store = MemoryStore::shared();
        let index = index_store(store);

        index
            .rebuild(vec![
                doc("p-1", "Kit Enxoval Completo", "Enxoval"),
                doc("p-2", "Berço Montessoriano", "Berços"),
            ])
            .await
            .expect("build");

        let snapshot = index
            .upsert(vec![
                doc("p-1", "Kit Enxoval Premium", "Enxoval"),
                doc("p-3", "Mobile Musical Estrelas", "Decoração"),
            ])
            .await
            .expect("upsert");

        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.len(), 3);
        let updated = snapshot
            .documents
            .iter()
            .find(|d| d.id == "p-1")
            .expect("p-1");
        assert!(updated.name.contains("Premium"));
        // Untouched document survives.
        assert!(snapshot.documents.iter().any(|d| d.id == "p-2"));
    }

    #[tokio::test]
    async fn postings_cover_single_char_tokens() {
        let store = MemoryStore::shared();
        let index = index_store(store);
        let snapshot = index
            .rebuild(vec![doc("p-1", "Body P 2000", "Roupas")])
            .await
            .expect("build");

        assert!(snapshot.postings.contains_key("p"));
        assert!(snapshot.postings.contains_key("2000"));
    }

    #[tokio::test]
    async fn load_absent_index_is_none() {
        let store = MemoryStore::shared();
        let index = index_store(store);
        assert!(index.load().await.expect("load").is_none());
    }
}
