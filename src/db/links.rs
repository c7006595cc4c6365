//! Linked-entity and collection storage.
//!
//! Musicians, persons, and details are global entities deduplicated by
//! case-insensitive exact name (get-or-create). Each album association
//! carries a qualifier (instrument, role, or detail type); the full
//! (album, entity, qualifier) triple is the uniqueness key.
//!
//! Replacing an album's link set for a category is delete-then-insert
//! inside a single transaction, so a failure mid-replace rolls back
//! rather than leaving the album with an empty link set.

use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;

use crate::model::{Album, DetailEntry, MusicianCredit, StaffCredit};

/// An album together with its linked credits, as loaded for enrichment
/// and for the manual-edit update path.
#[derive(Debug, Clone)]
pub struct AlbumWithCredits {
    pub album: Album,
    pub musicians: Vec<MusicianCredit>,
    pub personnel: Vec<StaffCredit>,
    pub details: Vec<DetailEntry>,
}

// ---------------------------------------------------------------------------
// Entity get-or-create (case-insensitive by name)
// ---------------------------------------------------------------------------

macro_rules! get_or_create_named {
    ($fn_name:ident, $table:literal) => {
        async fn $fn_name(conn: &mut SqliteConnection, name: &str) -> sqlx::Result<i64> {
            let row: Option<(i64,)> =
                sqlx::query_as(concat!("SELECT id FROM ", $table, " WHERE name = ? COLLATE NOCASE"))
                    .bind(name)
                    .fetch_optional(&mut *conn)
                    .await?;

            if let Some((id,)) = row {
                Ok(id)
            } else {
                let result = sqlx::query(concat!("INSERT INTO ", $table, " (name) VALUES (?)"))
                    .bind(name)
                    .execute(&mut *conn)
                    .await?;
                Ok(result.last_insert_rowid())
            }
        }
    };
}

get_or_create_named!(musician_id, "musicians");
get_or_create_named!(person_id, "persons");
get_or_create_named!(detail_id, "details");
get_or_create_named!(label_id, "record_labels");

/// Get or create a musician by name.
///
/// Lookup is case-insensitive, so "john bonham" and "John Bonham" resolve
/// to the same entity. This is idempotent - calling with the same name
/// always returns the same ID.
pub async fn get_or_create_musician(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let mut conn = pool.acquire().await?;
    musician_id(&mut conn, name).await
}

/// Get or create a person (production/technical staff) by name.
pub async fn get_or_create_person(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let mut conn = pool.acquire().await?;
    person_id(&mut conn, name).await
}

/// Get or create a detail value by name.
pub async fn get_or_create_detail(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let mut conn = pool.acquire().await?;
    detail_id(&mut conn, name).await
}

/// Get or create a record label by name.
pub async fn get_or_create_record_label(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let mut conn = pool.acquire().await?;
    label_id(&mut conn, name).await
}

// ---------------------------------------------------------------------------
// Link-set replacement (delete-then-insert in one transaction)
// ---------------------------------------------------------------------------

/// Replace an album's musician links with the given set.
///
/// `INSERT OR IGNORE` drops duplicate (album, musician, instrument)
/// triples from the input rather than failing the whole set.
pub async fn replace_musician_links(
    pool: &SqlitePool,
    album_id: i64,
    credits: &[MusicianCredit],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM album_musicians WHERE album_id = ?")
        .bind(album_id)
        .execute(&mut *tx)
        .await?;
    for credit in credits {
        let entity = musician_id(&mut *tx, &credit.name).await?;
        sqlx::query(
            "INSERT OR IGNORE INTO album_musicians (album_id, musician_id, instrument) VALUES (?, ?, ?)",
        )
        .bind(album_id)
        .bind(entity)
        .bind(&credit.instrument)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

/// Replace an album's personnel links with the given set.
pub async fn replace_personnel_links(
    pool: &SqlitePool,
    album_id: i64,
    credits: &[StaffCredit],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM album_personnel WHERE album_id = ?")
        .bind(album_id)
        .execute(&mut *tx)
        .await?;
    for credit in credits {
        let entity = person_id(&mut *tx, &credit.name).await?;
        sqlx::query(
            "INSERT OR IGNORE INTO album_personnel (album_id, person_id, role) VALUES (?, ?, ?)",
        )
        .bind(album_id)
        .bind(entity)
        .bind(&credit.role)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

/// Replace an album's detail links with the given set.
pub async fn replace_detail_links(
    pool: &SqlitePool,
    album_id: i64,
    entries: &[DetailEntry],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM album_details WHERE album_id = ?")
        .bind(album_id)
        .execute(&mut *tx)
        .await?;
    for entry in entries {
        let entity = detail_id(&mut *tx, &entry.value).await?;
        sqlx::query(
            "INSERT OR IGNORE INTO album_details (album_id, detail_id, detail_type) VALUES (?, ?, ?)",
        )
        .bind(album_id)
        .bind(entity)
        .bind(&entry.detail_type)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

// ---------------------------------------------------------------------------
// Link-set reads
// ---------------------------------------------------------------------------

/// Musician credits for an album, ordered by name then instrument.
pub async fn musician_credits(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Vec<MusicianCredit>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT m.name, am.instrument FROM album_musicians am \
         JOIN musicians m ON m.id = am.musician_id \
         WHERE am.album_id = ? \
         ORDER BY m.name COLLATE NOCASE, am.instrument COLLATE NOCASE",
    )
    .bind(album_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, instrument)| MusicianCredit { name, instrument })
        .collect())
}

/// Personnel credits for an album, ordered by name then role.
pub async fn personnel_credits(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Vec<StaffCredit>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT p.name, ap.role FROM album_personnel ap \
         JOIN persons p ON p.id = ap.person_id \
         WHERE ap.album_id = ? \
         ORDER BY p.name COLLATE NOCASE, ap.role COLLATE NOCASE",
    )
    .bind(album_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, role)| StaffCredit { name, role })
        .collect())
}

/// Detail entries for an album, ordered by value then type.
pub async fn detail_entries(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Vec<DetailEntry>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT d.name, ad.detail_type FROM album_details ad \
         JOIN details d ON d.id = ad.detail_id \
         WHERE ad.album_id = ? \
         ORDER BY d.name COLLATE NOCASE, ad.detail_type COLLATE NOCASE",
    )
    .bind(album_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(value, detail_type)| DetailEntry { value, detail_type })
        .collect())
}

/// Load an album with all of its credits, or None if it doesn't exist.
pub async fn get_album_with_credits(
    pool: &SqlitePool,
    album_id: i64,
) -> sqlx::Result<Option<AlbumWithCredits>> {
    let Some(album) = super::get_album(pool, album_id).await? else {
        return Ok(None);
    };
    let musicians = musician_credits(pool, album_id).await?;
    let personnel = personnel_credits(pool, album_id).await?;
    let details = detail_entries(pool, album_id).await?;
    Ok(Some(AlbumWithCredits {
        album,
        musicians,
        personnel,
        details,
    }))
}

// ---------------------------------------------------------------------------
// Known-name listings (for enrichment disambiguation hints)
// ---------------------------------------------------------------------------

async fn all_names(pool: &SqlitePool, sql: &str) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(sql).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// All musician names in the catalog, ordered by name.
pub async fn all_musician_names(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    all_names(pool, "SELECT name FROM musicians ORDER BY name COLLATE NOCASE").await
}

/// All person names in the catalog, ordered by name.
pub async fn all_person_names(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    all_names(pool, "SELECT name FROM persons ORDER BY name COLLATE NOCASE").await
}

/// All detail values in the catalog, ordered by name.
pub async fn all_detail_names(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    all_names(pool, "SELECT name FROM details ORDER BY name COLLATE NOCASE").await
}

/// Total number of musician entities (test/diagnostic helper).
pub async fn musician_count(pool: &SqlitePool) -> sqlx::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM musicians")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Create a named collection, returning its ID.
pub async fn create_collection(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let result = sqlx::query("INSERT INTO collections (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Add an album to a collection. Adding twice is a no-op success.
///
/// Returns true if a new membership row was inserted.
pub async fn add_album_to_collection(
    pool: &SqlitePool,
    collection_id: i64,
    album_id: i64,
) -> sqlx::Result<bool> {
    let result =
        sqlx::query("INSERT OR IGNORE INTO collection_albums (collection_id, album_id) VALUES (?, ?)")
            .bind(collection_id)
            .bind(album_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// The (id, title, artist) of every album in a collection, ordered by
/// title. Enumerated up front by collection enrichment so the progress
/// denominator is fixed before any processing starts.
pub async fn collection_albums_by_title(
    pool: &SqlitePool,
    collection_id: i64,
) -> sqlx::Result<Vec<(i64, String, String)>> {
    sqlx::query_as(
        "SELECT a.id, a.title, a.artist FROM albums a \
         JOIN collection_albums ca ON ca.album_id = a.id \
         WHERE ca.collection_id = ? \
         ORDER BY a.title COLLATE NOCASE",
    )
    .bind(collection_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::db::{create_album, NewAlbum};

    async fn make_album(pool: &SqlitePool, title: &str) -> i64 {
        create_album(
            pool,
            &NewAlbum {
                title: title.to_string(),
                artist: "Artist".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_case_insensitive() {
        let (_dir, pool) = test_pool().await;

        let a = get_or_create_musician(&pool, "John Bonham").await.unwrap();
        let b = get_or_create_musician(&pool, "john bonham").await.unwrap();
        let c = get_or_create_musician(&pool, "John Paul Jones").await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(musician_count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_same_musician_two_instruments_two_links() {
        let (_dir, pool) = test_pool().await;
        let album = make_album(&pool, "IV").await;

        replace_musician_links(
            &pool,
            album,
            &[
                MusicianCredit {
                    name: "John Bonham".to_string(),
                    instrument: "Drums".to_string(),
                },
                MusicianCredit {
                    name: "John Bonham".to_string(),
                    instrument: "Percussion".to_string(),
                },
            ],
        )
        .await
        .unwrap();

        // One global entity, two links under different qualifiers
        assert_eq!(musician_count(&pool).await.unwrap(), 1);
        let credits = musician_credits(&pool, album).await.unwrap();
        assert_eq!(credits.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_triple_collapses_to_one_link() {
        let (_dir, pool) = test_pool().await;
        let album = make_album(&pool, "IV").await;

        let credit = MusicianCredit {
            name: "John Bonham".to_string(),
            instrument: "Drums".to_string(),
        };
        replace_musician_links(&pool, album, &[credit.clone(), credit]).await.unwrap();

        assert_eq!(musician_credits(&pool, album).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_links_is_a_full_replace() {
        let (_dir, pool) = test_pool().await;
        let album = make_album(&pool, "IV").await;

        replace_personnel_links(
            &pool,
            album,
            &[StaffCredit {
                name: "Andy Johns".to_string(),
                role: "Engineer".to_string(),
            }],
        )
        .await
        .unwrap();

        replace_personnel_links(
            &pool,
            album,
            &[StaffCredit {
                name: "Glyn Johns".to_string(),
                role: "Mix Engineer".to_string(),
            }],
        )
        .await
        .unwrap();

        let credits = personnel_credits(&pool, album).await.unwrap();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].name, "Glyn Johns");
    }

    #[tokio::test]
    async fn test_known_name_listings_are_sorted() {
        let (_dir, pool) = test_pool().await;

        get_or_create_person(&pool, "Zeta").await.unwrap();
        get_or_create_person(&pool, "alpha").await.unwrap();

        let names = all_person_names(&pool).await.unwrap();
        assert_eq!(names, vec!["alpha".to_string(), "Zeta".to_string()]);
    }

    #[tokio::test]
    async fn test_collection_add_is_idempotent() {
        let (_dir, pool) = test_pool().await;
        let album = make_album(&pool, "IV").await;
        let collection = create_collection(&pool, "Favourites").await.unwrap();

        assert!(add_album_to_collection(&pool, collection, album).await.unwrap());
        assert!(!add_album_to_collection(&pool, collection, album).await.unwrap());

        let members = collection_albums_by_title(&pool, collection).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn test_collection_listing_ordered_by_title() {
        let (_dir, pool) = test_pool().await;
        let collection = create_collection(&pool, "Favourites").await.unwrap();

        let b = make_album(&pool, "Benefit").await;
        let a = make_album(&pool, "Aqualung").await;
        add_album_to_collection(&pool, collection, b).await.unwrap();
        add_album_to_collection(&pool, collection, a).await.unwrap();

        let members = collection_albums_by_title(&pool, collection).await.unwrap();
        assert_eq!(members[0].1, "Aqualung");
        assert_eq!(members[1].1, "Benefit");
    }

    #[tokio::test]
    async fn test_album_with_credits_loads_all_categories() {
        let (_dir, pool) = test_pool().await;
        let album = make_album(&pool, "IV").await;

        replace_musician_links(
            &pool,
            album,
            &[MusicianCredit {
                name: "Jimmy Page".to_string(),
                instrument: "Guitar".to_string(),
            }],
        )
        .await
        .unwrap();
        replace_detail_links(
            &pool,
            album,
            &[DetailEntry {
                value: "Headley Grange".to_string(),
                detail_type: "Recording Studio".to_string(),
            }],
        )
        .await
        .unwrap();

        let loaded = get_album_with_credits(&pool, album).await.unwrap().unwrap();
        assert_eq!(loaded.musicians.len(), 1);
        assert!(loaded.personnel.is_empty());
        assert_eq!(loaded.details[0].value, "Headley Grange");

        assert!(get_album_with_credits(&pool, 9999).await.unwrap().is_none());
    }
}
