use academy_core::{Error, ListQuery, Page, Record, Repository, Result, SchoolLevel, Storage};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::Row;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL,
        category TEXT,
        search_text TEXT NOT NULL,
        created_at TEXT NOT NULL,
        body TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_records_collection
        ON records (collection, created_at)
    "#,
];

fn db_err(context: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| Error::Database(format!("{}: {}", context, e))
}

// Fixed precision keeps the text column sortable.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Writes from every repository of one database go through `write_lock`, so a
/// read-then-write transaction never races another writer for the database lock.
pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    write_lock: Arc<Mutex<()>>,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(db_err("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        tracing::info!("🗄️ SQLite database ready at {}", db_path.display());
        Ok(Self {
            pool: Arc::new(pool),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn repository<T: Record>(&self, collection: &str) -> SqliteRepository<T> {
        SqliteRepository {
            pool: self.pool.clone(),
            write_lock: self.write_lock.clone(),
            collection: collection.to_string(),
            _marker: PhantomData,
        }
    }

    pub fn storage(&self) -> Storage {
        Storage {
            notices: Arc::new(self.repository("notices")),
            gallery: Arc::new(self.repository("gallery")),
            roadmaps: Arc::new(self.repository("roadmaps")),
            middle_school: Arc::new(self.repository(SchoolLevel::Middle.collection())),
            high_school: Arc::new(self.repository(SchoolLevel::High.collection())),
        }
    }
}

/// One collection inside the shared `records` document table.
pub struct SqliteRepository<T: Record> {
    pool: Arc<SqlitePool>,
    write_lock: Arc<Mutex<()>>,
    collection: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> SqliteRepository<T> {
    fn decode(body: &str) -> Result<T> {
        Ok(serde_json::from_str(body)?)
    }

    async fn write_back(
        &self,
        conn: &mut sqlx::SqliteConnection,
        record: &T,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE records
            SET category = ?, search_text = ?, created_at = ?, body = ?
            WHERE id = ? AND collection = ?
            "#,
        )
        .bind(record.category())
        .bind(record.search_text().to_lowercase())
        .bind(timestamp(record.created_at()))
        .bind(serde_json::to_string(record)?)
        .bind(record.id())
        .bind(&self.collection)
        .execute(conn)
        .await
        .map_err(db_err("Failed to write record"))?;
        Ok(())
    }

    async fn modify(&self, id: i64, change: impl FnOnce(&mut T) + Send) -> Result<Option<T>> {
        let _write = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to open transaction"))?;

        let row = sqlx::query("SELECT body FROM records WHERE id = ? AND collection = ?")
            .bind(id)
            .bind(&self.collection)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to load record"))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = Self::decode(row.get::<String, _>("body").as_str())?;
        change(&mut record);
        self.write_back(&mut *tx, &record).await?;
        tx.commit().await.map_err(db_err("Failed to commit"))?;
        Ok(Some(record))
    }
}

#[async_trait]
impl<T: Record> Repository<T> for SqliteRepository<T> {
    async fn create(&self, draft: T::Draft) -> Result<T> {
        let _write = self.write_lock.lock().await;
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to open transaction"))?;

        let id = sqlx::query(
            r#"
            INSERT INTO records (collection, search_text, created_at, body)
            VALUES (?, '', ?, '{}')
            "#,
        )
        .bind(&self.collection)
        .bind(timestamp(now))
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to insert record"))?
        .last_insert_rowid();

        let record = T::from_draft(id, draft, now);
        self.write_back(&mut *tx, &record).await?;
        tx.commit().await.map_err(db_err("Failed to commit"))?;
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<T>> {
        let row = sqlx::query("SELECT body FROM records WHERE id = ? AND collection = ?")
            .bind(id)
            .bind(&self.collection)
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_err("Failed to load record"))?;
        row.map(|r| Self::decode(r.get::<String, _>("body").as_str()))
            .transpose()
    }

    async fn update(&self, id: i64, patch: T::Patch) -> Result<Option<T>> {
        self.modify(id, move |record| record.apply(patch, Utc::now()))
            .await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let _write = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM records WHERE id = ? AND collection = ?")
            .bind(id)
            .bind(&self.collection)
            .execute(&*self.pool)
            .await
            .map_err(db_err("Failed to delete record"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<T>> {
        let category = query.category_filter();
        let search = query.search_filter().map(like_pattern);

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM records
            WHERE collection = ?
              AND (? IS NULL OR category = ?)
              AND (? IS NULL OR search_text LIKE ? ESCAPE '\')
            "#,
        )
        .bind(&self.collection)
        .bind(category)
        .bind(category)
        .bind(search.as_deref())
        .bind(search.as_deref())
        .fetch_one(&*self.pool)
        .await
        .map_err(db_err("Failed to count records"))?
        .get("total");

        let rows = sqlx::query(
            r#"
            SELECT body FROM records
            WHERE collection = ?
              AND (? IS NULL OR category = ?)
              AND (? IS NULL OR search_text LIKE ? ESCAPE '\')
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&self.collection)
        .bind(category)
        .bind(category)
        .bind(search.as_deref())
        .bind(search.as_deref())
        .bind(query.limit() as i64)
        .bind(query.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(db_err("Failed to list records"))?;

        let items = rows
            .iter()
            .map(|row| Self::decode(row.get::<String, _>("body").as_str()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total: total as usize,
            page: query.page(),
            limit: query.limit(),
        })
    }

    async fn record_view(&self, id: i64) -> Result<Option<T>> {
        self.modify(id, |record| {
            record.record_view();
        })
        .await
    }

    async fn clear(&self) -> Result<u64> {
        let _write = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(&self.collection)
            .execute(&*self.pool)
            .await
            .map_err(db_err("Failed to clear collection"))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::{Admission, AdmissionPatch, Attachments, NewAdmission};
    use tempfile::tempdir;

    fn draft(title: &str, category: &str) -> NewAdmission {
        NewAdmission {
            title: title.to_string(),
            content: format!("<p>{}</p>", title),
            category: category.to_string(),
            attachments: Attachments {
                images: vec!["/uploads/x.jpg".to_string()],
                original_url: Some("https://example.com/1".to_string()),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let sqlite = SQLiteStorage::new_with_path(&db_path).await.unwrap();
        let repo: SqliteRepository<Admission> = sqlite.repository("middle_school_admissions");

        let created = repo.create(draft("Portfolio 준비 안내", "포트폴리오")).await.unwrap();
        let loaded = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.attachments.images, vec!["/uploads/x.jpg".to_string()]);

        let updated = repo
            .update(
                created.id,
                AdmissionPatch {
                    category: Some("입시설명회".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.category, "입시설명회");

        let viewed = repo.record_view(created.id).await.unwrap().unwrap();
        assert_eq!(viewed.views, 1);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_list_is_scoped_to_collection() {
        let temp_dir = tempdir().unwrap();
        let sqlite = SQLiteStorage::new_with_path(&temp_dir.path().join("list.db"))
            .await
            .unwrap();
        let storage = sqlite.storage();

        storage.middle_school.create(draft("중등 실기 안내", "실기시험")).await.unwrap();
        storage.middle_school.create(draft("중등 결과", "입시결과")).await.unwrap();
        storage.high_school.create(draft("고등 실기 안내", "실기시험")).await.unwrap();
        storage.high_school.create(draft("Portfolio Day", "포트폴리오")).await.unwrap();

        let page = storage
            .middle_school
            .list(&ListQuery::default().with_category("실기시험"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "중등 실기 안내");

        let search = storage
            .high_school
            .list(&ListQuery::default().with_search("PORTFOLIO"))
            .await
            .unwrap();
        assert_eq!(search.total, 1);
        assert_eq!(search.items[0].title, "Portfolio Day");

        assert_eq!(storage.middle_school.clear().await.unwrap(), 2);
        assert_eq!(storage.high_school.list(&ListQuery::default()).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_concurrent_views_are_all_counted() {
        let temp_dir = tempdir().unwrap();
        let sqlite = SQLiteStorage::new_with_path(&temp_dir.path().join("views.db"))
            .await
            .unwrap();
        let storage = sqlite.storage();
        let created = storage
            .high_school
            .create(draft("예고 입시설명회", "입시설명회"))
            .await
            .unwrap();
        let id = created.id;

        let mut handles = Vec::new();
        for i in 0..50 {
            let repo = storage.high_school.clone();
            let notices = storage.notices.clone();
            handles.push(tokio::spawn(async move {
                if i % 10 == 0 {
                    notices
                        .create(academy_core::NewNotice {
                            title: format!("공지 {}", i),
                            content: "<p>본문</p>".to_string(),
                            ..Default::default()
                        })
                        .await
                        .map(|_| ())?;
                }
                repo.record_view(id).await.map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let viewed = storage.high_school.get(id).await.unwrap().unwrap();
        assert_eq!(viewed.views, 50);
        assert_eq!(storage.notices.list(&ListQuery::default()).await.unwrap().total, 5);
    }
}
