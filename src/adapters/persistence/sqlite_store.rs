//! SQLite-backed menu cache via libsql. Implements MenuStore.
//!
//! One database file (data/menus.db) holding the last downloaded week:
//! `mensas`, `menus` (one row per dish and day, with its ISO week) and `favorites`.
//! Every operation opens its own connection and drops it before returning.

use crate::domain::{DomainError, Mensa, Menu, MenuSnapshot, WeekIdentifier, WeeklyMenuplan};
use crate::ports::MenuStore;
use chrono::NaiveDate;
use libsql::{params, Connection, Database};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MENSAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mensas (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    street TEXT NOT NULL DEFAULT '',
    zip TEXT NOT NULL DEFAULT '',
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    timestamp INTEGER NOT NULL
)"#;

const MENUS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS menus (
    mensa_id INTEGER NOT NULL,
    id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    day TEXT NOT NULL,
    week INTEGER NOT NULL,
    PRIMARY KEY (mensa_id, id)
)"#;
const MENUS_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_menus_mensa_day ON menus (mensa_id, day)";

/// Favorites survive cache refreshes: one row per favorite mensa.
const FAVORITES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS favorites (
    mensa_id INTEGER PRIMARY KEY
)"#;

const DAY_FORMAT: &str = "%Y-%m-%d";

fn storage(e: impl std::fmt::Display) -> DomainError {
    DomainError::Storage(e.to_string())
}

/// SQLite menu store. Safe to share via Arc.
pub struct SqliteMenuStore {
    db: Database,
    db_path: PathBuf,
}

impl SqliteMenuStore {
    /// Connect to (or create) `menus.db` in `base_dir` and ensure the schema exists.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(storage)?;
        let db_path = base.join("menus.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(storage)?;
        let conn = db.connect().map_err(storage)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Storage(format!("WAL pragma failed: {}", e)))?;
        while wal_rows.next().await.map_err(storage)?.is_some() {}

        for ddl in [MENSAS_TABLE, MENUS_TABLE, MENUS_INDEX, FAVORITES_TABLE] {
            conn.execute(ddl, ()).await.map_err(storage)?;
        }

        info!(path = %db_path.display(), "menu cache opened");

        Ok(Self { db, db_path })
    }

    fn conn(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(storage)
    }

    async fn load_menus(conn: &Connection) -> Result<HashMap<i64, WeeklyMenuplan>, DomainError> {
        let mut rows = conn
            .query(
                "SELECT mensa_id, id, title, description, day FROM menus ORDER BY mensa_id, day, id",
                (),
            )
            .await
            .map_err(storage)?;
        let mut plans: HashMap<i64, WeeklyMenuplan> = HashMap::new();
        while let Some(row) = rows.next().await.map_err(storage)? {
            let mensa_id: i64 = row.get(0).map_err(storage)?;
            let id: i64 = row.get(1).map_err(storage)?;
            let title: String = row.get(2).map_err(storage)?;
            let description: String = row.get::<String>(3).unwrap_or_default();
            let day: String = row.get(4).map_err(storage)?;
            let date = NaiveDate::parse_from_str(&day, DAY_FORMAT)
                .map_err(|e| DomainError::Storage(format!("bad menu day '{}': {}", day, e)))?;
            plans
                .entry(mensa_id)
                .or_default()
                .add(Menu::new(id, title, description, date));
        }
        Ok(plans)
    }

    async fn load_favorites(conn: &Connection) -> Result<HashSet<i64>, DomainError> {
        let mut rows = conn
            .query("SELECT mensa_id FROM favorites", ())
            .await
            .map_err(storage)?;
        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await.map_err(storage)? {
            let mensa_id: i64 = row.get(0).map_err(storage)?;
            ids.insert(mensa_id);
        }
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl MenuStore for SqliteMenuStore {
    async fn stored_week(&self) -> Result<Option<WeekIdentifier>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query("SELECT week FROM menus ORDER BY week DESC LIMIT 1", ())
            .await
            .map_err(storage)?;
        match rows.next().await.map_err(storage)? {
            Some(row) => {
                let week: i64 = row.get(0).map_err(storage)?;
                let week = u32::try_from(week).map_err(storage)?;
                Ok(Some(WeekIdentifier::new(week)))
            }
            None => Ok(None),
        }
    }

    async fn store_snapshot(&self, snapshot: &MenuSnapshot) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let tx = conn.transaction().await.map_err(storage)?;
        tx.execute("DELETE FROM menus", ()).await.map_err(storage)?;
        tx.execute("DELETE FROM mensas", ()).await.map_err(storage)?;

        let mut menu_count = 0usize;
        for m in &snapshot.mensas {
            tx.execute(
                r#"
                INSERT INTO mensas (id, name, street, zip, latitude, longitude, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    m.id,
                    m.name.as_str(),
                    m.street.as_str(),
                    m.zip.as_str(),
                    m.latitude,
                    m.longitude,
                    m.timestamp
                ],
            )
            .await
            .map_err(storage)?;

            for menu in m.menuplan.menus() {
                let week = WeekIdentifier::of(menu.date).number() as i64;
                tx.execute(
                    r#"
                    INSERT INTO menus (mensa_id, id, title, description, day, week)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT (mensa_id, id) DO NOTHING
                    "#,
                    params![
                        m.id,
                        menu.id,
                        menu.title.as_str(),
                        menu.description.as_str(),
                        menu.date.format(DAY_FORMAT).to_string(),
                        week
                    ],
                )
                .await
                .map_err(storage)?;
                menu_count += 1;
            }
        }
        tx.commit().await.map_err(storage)?;

        info!(
            path = %self.db_path.display(),
            mensas = snapshot.mensas.len(),
            menus = menu_count,
            "stored menus in cache"
        );
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<MenuSnapshot, DomainError> {
        let conn = self.conn()?;
        let mut plans = Self::load_menus(&conn).await?;
        let favorites = Self::load_favorites(&conn).await?;

        let mut rows = conn
            .query(
                "SELECT id, name, street, zip, latitude, longitude, timestamp FROM mensas ORDER BY id",
                (),
            )
            .await
            .map_err(storage)?;
        let mut mensas = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage)? {
            let id: i64 = row.get(0).map_err(storage)?;
            mensas.push(Mensa {
                id,
                name: row.get(1).map_err(storage)?,
                street: row.get::<String>(2).unwrap_or_default(),
                zip: row.get::<String>(3).unwrap_or_default(),
                latitude: row.get(4).map_err(storage)?,
                longitude: row.get(5).map_err(storage)?,
                is_favorite: favorites.contains(&id),
                timestamp: row.get(6).map_err(storage)?,
                menuplan: plans.remove(&id).unwrap_or_default(),
            });
        }

        if mensas.is_empty() {
            return Err(DomainError::LocalFetch("no mensas cached".into()));
        }
        debug!(mensas = mensas.len(), "loaded menus from cache");
        Ok(MenuSnapshot::new(mensas))
    }

    async fn store_favorites(&self, mensas: &[Mensa]) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let tx = conn.transaction().await.map_err(storage)?;
        for m in mensas {
            if m.is_favorite {
                tx.execute(
                    "INSERT INTO favorites (mensa_id) VALUES (?1) ON CONFLICT (mensa_id) DO NOTHING",
                    params![m.id],
                )
                .await
                .map_err(storage)?;
            } else {
                tx.execute("DELETE FROM favorites WHERE mensa_id = ?1", params![m.id])
                    .await
                    .map_err(storage)?;
            }
        }
        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn favorite_ids(&self) -> Result<HashSet<i64>, DomainError> {
        let conn = self.conn()?;
        Self::load_favorites(&conn).await
    }

    async fn is_favorite(&self, mensa_id: i64) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM favorites WHERE mensa_id = ?1",
                params![mensa_id],
            )
            .await
            .map_err(storage)?;
        Ok(rows.next().await.map_err(storage)?.is_some())
    }

    async fn mensa_timestamp(&self, mensa_id: i64) -> Result<Option<i64>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT timestamp FROM mensas WHERE id = ?1",
                params![mensa_id],
            )
            .await
            .map_err(storage)?;
        if let Some(row) = rows.next().await.map_err(storage)? {
            let timestamp: i64 = row.get(0).map_err(storage)?;
            Ok(Some(timestamp))
        } else {
            Ok(None)
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let tx = conn.transaction().await.map_err(storage)?;
        for table in ["menus", "mensas", "favorites"] {
            tx.execute(&format!("DELETE FROM {}", table), ())
                .await
                .map_err(storage)?;
        }
        tx.commit().await.map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2013, m, d).unwrap()
    }

    fn mensas() -> Vec<Mensa> {
        let mensa = |id: i64, name: &str, street: &str, zip: &str, ts: i64| Mensa {
            id,
            name: name.into(),
            street: street.into(),
            zip: zip.into(),
            latitude: 12.412,
            longitude: 45.123,
            is_favorite: false,
            timestamp: ts,
            menuplan: WeeklyMenuplan::new(),
        };
        vec![
            mensa(1, "Mensa Gesellschaftsstrasse", "Some street 123", "3001 Bern", 123456789),
            mensa(2, "Mensa Unitobler", "Some other street 123", "3005 Bern", 123456789),
            mensa(3, "Mensa Von Roll", "Some street 42", "3012 Bern", 342312311),
        ]
    }

    fn plans() -> (WeeklyMenuplan, WeeklyMenuplan) {
        let menus = [
            Menu::new(0, "Vegi", "Something \n Served with some other Stuff", day(11, 20)),
            Menu::new(1, "Nice Menu", "Something nice\n Served with nothing else", day(11, 20)),
            Menu::new(2, "Vegi", "Something vegetarian", day(11, 21)),
            Menu::new(3, "Expensive Menu", "Very expensive food", day(11, 21)),
            Menu::new(4, "Nice Vegi Menu", "Something nice vegetarian", day(11, 22)),
            Menu::new(5, "Special Menu", "Pizza", day(11, 22)),
        ];
        let mut p1 = WeeklyMenuplan::new();
        let mut p2 = WeeklyMenuplan::new();
        for i in [0, 1, 2, 4] {
            p1.add(menus[i].clone());
        }
        for i in [0, 1, 3, 5] {
            p2.add(menus[i].clone());
        }
        (p1, p2)
    }

    async fn store() -> (TempDir, SqliteMenuStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteMenuStore::connect(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_store_and_load_mensas_with_menuplans() {
        let (_dir, store) = store().await;
        let (p1, p2) = plans();
        let mut list = mensas();
        list[0].menuplan = p1;
        list[2].menuplan = p2;
        let snapshot = MenuSnapshot::new(list);

        store.store_snapshot(&snapshot).await.unwrap();
        let loaded = store.load_snapshot().await.unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.mensa(1).unwrap().menuplan, snapshot.mensa(1).unwrap().menuplan);
        assert!(loaded.mensa(2).unwrap().menuplan.is_empty());
    }

    #[tokio::test]
    async fn test_store_replaces_previous_week() {
        let (_dir, store) = store().await;
        let (p1, _) = plans();
        let mut old = mensas();
        old[0].menuplan = p1;
        store.store_snapshot(&MenuSnapshot::new(old)).await.unwrap();

        let mut fresh = mensas();
        fresh.truncate(1);
        fresh[0]
            .menuplan
            .add(Menu::new(0, "Curry", "Rice", day(11, 27)));
        store.store_snapshot(&MenuSnapshot::new(fresh)).await.unwrap();

        let loaded = store.load_snapshot().await.unwrap();
        assert_eq!(loaded.mensas.len(), 1);
        assert_eq!(loaded.mensas[0].menuplan.menus().count(), 1);
        assert_eq!(store.stored_week().await.unwrap(), Some(WeekIdentifier::new(48)));
    }

    #[tokio::test]
    async fn test_week_of_stored_menus() {
        let (_dir, store) = store().await;
        assert_eq!(store.stored_week().await.unwrap(), None);

        let (p1, p2) = plans();
        let expected = p1.week();
        let mut list = mensas();
        list[0].menuplan = p1;
        list[2].menuplan = p2;
        store.store_snapshot(&MenuSnapshot::new(list)).await.unwrap();

        assert_eq!(store.stored_week().await.unwrap(), expected);
        assert_eq!(expected, Some(WeekIdentifier::new(47)));
    }

    #[tokio::test]
    async fn test_out_of_range_week_is_storage_error() {
        let (_dir, store) = store().await;
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO menus (mensa_id, id, title, description, day, week) \
                 VALUES (1, 0, 'Vegi', '', '2013-11-20', -1)",
                (),
            )
            .await
            .unwrap();

        let err = store.stored_week().await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }

    #[tokio::test]
    async fn test_store_and_load_favorites() {
        let (_dir, store) = store().await;
        let mut list = mensas();
        store.store_snapshot(&MenuSnapshot::new(list.clone())).await.unwrap();

        list[0].is_favorite = true;
        store.store_favorites(&list).await.unwrap();
        for m in &list {
            assert_eq!(store.is_favorite(m.id).await.unwrap(), m.is_favorite);
        }

        list[1].is_favorite = true;
        store.store_favorites(&list).await.unwrap();
        assert_eq!(store.favorite_ids().await.unwrap(), HashSet::from([1, 2]));

        list[0].is_favorite = false;
        list[1].is_favorite = false;
        store.store_favorites(&list).await.unwrap();
        for m in &list {
            assert!(!store.is_favorite(m.id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_favorites_applied_on_load() {
        let (_dir, store) = store().await;
        let mut list = mensas();
        list[2].is_favorite = true;
        store.store_favorites(&list).await.unwrap();
        list[2].is_favorite = false;
        store.store_snapshot(&MenuSnapshot::new(list)).await.unwrap();

        let loaded = store.load_snapshot().await.unwrap();
        assert!(loaded.mensa(3).unwrap().is_favorite);
        assert!(!loaded.mensa(1).unwrap().is_favorite);
    }

    #[tokio::test]
    async fn test_mensa_timestamp() {
        let (_dir, store) = store().await;
        let list = mensas();
        store.store_snapshot(&MenuSnapshot::new(list.clone())).await.unwrap();

        for m in &list {
            assert_eq!(store.mensa_timestamp(m.id).await.unwrap(), Some(m.timestamp));
        }
        assert_eq!(store.mensa_timestamp(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_cache_fails_to_load() {
        let (_dir, store) = store().await;
        let err = store.load_snapshot().await.unwrap_err();
        assert!(matches!(err, DomainError::LocalFetch(_)));
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (_dir, store) = store().await;
        let mut list = mensas();
        list[0].is_favorite = true;
        store.store_snapshot(&MenuSnapshot::new(list.clone())).await.unwrap();
        store.store_favorites(&list).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.load_snapshot().await.is_err());
        assert!(store.favorite_ids().await.unwrap().is_empty());
        assert_eq!(store.stored_week().await.unwrap(), None);
    }
}
