use super::models::*;
use super::sqlite::Index;
use crate::error::{Error, Result};
use rusqlite::{params, Connection, Transaction};
use tracing::debug;

const SELECT_ACTIVE: &str = concat!("SELECT ", file_columns!(), " FROM scanned_file");

impl Index {
    // ── Scanned Files ────────────────────────────────────────────

    /// Insert one record, or refresh the existing active record at the same path.
    /// Returns the record id.
    pub fn insert_file_record(&self, record: &FileRecord) -> Result<i64> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO scanned_file \
             (path, filename, extension, format, file_type, title, album, artist, \
              album_artist, composer, genre, year, track_no, track_total, disk_no, \
              disk_total, comment, size, digest) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19) \
             ON CONFLICT(path) DO UPDATE SET \
                 filename = excluded.filename, \
                 extension = excluded.extension, \
                 format = excluded.format, \
                 file_type = excluded.file_type, \
                 title = excluded.title, \
                 album = excluded.album, \
                 artist = excluded.artist, \
                 album_artist = excluded.album_artist, \
                 composer = excluded.composer, \
                 genre = excluded.genre, \
                 year = excluded.year, \
                 track_no = excluded.track_no, \
                 track_total = excluded.track_total, \
                 disk_no = excluded.disk_no, \
                 disk_total = excluded.disk_total, \
                 comment = excluded.comment, \
                 size = excluded.size, \
                 digest = excluded.digest \
             RETURNING id",
        )?;
        let id = stmt.query_row(
            params![
                record.path,
                record.filename,
                record.extension,
                record.format,
                record.file_type,
                record.title,
                record.album,
                record.artist,
                record.album_artist,
                record.composer,
                record.genre,
                record.year,
                record.track_no,
                record.track_total,
                record.disk_no,
                record.disk_total,
                record.comment,
                record.size,
                record.digest,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// All active records in insertion order.
    pub fn active_records(&self) -> Result<Vec<FileRecord>> {
        let conn = self.lock()?;
        query_records(&conn, &format!("{} ORDER BY id", SELECT_ACTIVE), [])
    }

    pub fn active_count(&self) -> Result<i64> {
        Ok(self
            .lock()?
            .query_row("SELECT COUNT(*) FROM scanned_file", [], |row| row.get(0))?)
    }

    // ── Clusters ─────────────────────────────────────────────────

    /// Digests shared by more than one active record, with their counts.
    pub fn duplicated_digests(&self) -> Result<Vec<(String, usize)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT digest, COUNT(*) FROM scanned_file \
             GROUP BY digest HAVING COUNT(*) > 1 \
             ORDER BY MIN(id)",
        )?;
        let groups = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as usize)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    pub fn records_with_digest(&self, digest: &str) -> Result<Vec<FileRecord>> {
        let conn = self.lock()?;
        query_records(
            &conn,
            &format!("{} WHERE digest = ?1 ORDER BY id", SELECT_ACTIVE),
            params![digest],
        )
    }

    /// Non-empty (artist, album, title) triples shared by more than one active record.
    pub fn duplicated_tag_keys(&self) -> Result<Vec<(TagKey, usize)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT artist, album, title, COUNT(*) FROM scanned_file \
             WHERE artist <> '' AND album <> '' AND title <> '' \
             GROUP BY artist, album, title HAVING COUNT(*) > 1 \
             ORDER BY MIN(id)",
        )?;
        let groups = stmt
            .query_map([], |row| {
                Ok((
                    TagKey {
                        artist: row.get(0)?,
                        album: row.get(1)?,
                        title: row.get(2)?,
                    },
                    row.get::<_, i64>(3)? as usize,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    pub fn records_with_tag_key(&self, key: &TagKey) -> Result<Vec<FileRecord>> {
        let conn = self.lock()?;
        query_records(
            &conn,
            &format!(
                "{} WHERE artist = ?1 AND album = ?2 AND title = ?3 ORDER BY id",
                SELECT_ACTIVE
            ),
            params![key.artist, key.album, key.title],
        )
    }

    // ── Decisions ────────────────────────────────────────────────

    /// Record `keep` as an original and each of `toss` as its duplicate, then
    /// drop the tossed records (and the keeper when `prune_keeper`) from the
    /// active set. All of it commits or none of it does. Returns the number of
    /// records pruned.
    pub fn record_decision(
        &self,
        keep: &FileRecord,
        toss: &[FileRecord],
        pass: DedupPass,
        prune_keeper: bool,
    ) -> Result<usize> {
        let pruned = self.with_transaction(|tx| {
            let active: i64 = tx.query_row(
                "SELECT COUNT(*) FROM scanned_file WHERE id = ?1",
                params![keep.id],
                |row| row.get(0),
            )?;
            if active != 1 {
                return Err(Error::inconsistent(format!("keeper {}", keep.id), 1, active as usize));
            }
            // a keeper of the exact pass may be kept again by the semantic pass
            tx.execute(
                concat!(
                    "INSERT INTO original (",
                    file_columns!(),
                    ", pass) SELECT ",
                    file_columns!(),
                    ", ?2 FROM scanned_file WHERE id = ?1 \
                     AND NOT EXISTS (SELECT 1 FROM original WHERE id = ?1)"
                ),
                params![keep.id, pass.as_str()],
            )?;

            {
                let mut stmt = tx.prepare_cached(concat!(
                    "INSERT INTO duplicate (",
                    file_columns!(),
                    ", duplicate_of, pass) SELECT ",
                    file_columns!(),
                    ", ?2, ?3 FROM scanned_file WHERE id = ?1"
                ))?;
                for record in toss {
                    let n = stmt.execute(params![record.id, keep.id, pass.as_str()])?;
                    if n != 1 {
                        return Err(Error::inconsistent(format!("duplicate {}", record.id), 1, n));
                    }
                }
            }

            let mut ids: Vec<i64> = toss.iter().map(|r| r.id).collect();
            if prune_keeper {
                ids.push(keep.id);
            }
            delete_active(tx, &ids, "prune")
        })?;
        debug!(
            "Kept {}, tossed {} and pruned {} record(s)",
            keep.id,
            toss.len(),
            pruned
        );
        Ok(pruned)
    }

    // ── Rejects ──────────────────────────────────────────────────

    /// Move the given active records into `reject` with `reason`.
    pub(crate) fn reject_ids(tx: &Transaction<'_>, ids: &[i64], reason: RejectReason) -> Result<usize> {
        let mut stmt = tx.prepare_cached(concat!(
            "INSERT INTO reject (reason, ",
            file_columns!(),
            ") SELECT ?2, ",
            file_columns!(),
            " FROM scanned_file WHERE id = ?1"
        ))?;
        let mut inserted = 0;
        for id in ids {
            inserted += stmt.execute(params![id, reason.as_str()])?;
        }
        if inserted != ids.len() {
            return Err(Error::inconsistent(reason.as_str(), ids.len(), inserted));
        }
        delete_active(tx, ids, reason.as_str())
    }

    // ── Moves ────────────────────────────────────────────────────

    /// Second placement phase: copy moved records into `moved_file`, then drop them
    /// from the active set, in one transaction.
    pub fn mark_moved(&self, moves: &[MoveRecord]) -> Result<usize> {
        if moves.is_empty() {
            return Ok(0);
        }
        let now = chrono::Utc::now().to_rfc3339();
        let count = self.with_transaction(|tx| {
            {
                let mut stmt = tx.prepare_cached(concat!(
                    "INSERT INTO moved_file (",
                    file_columns!(),
                    ", destination, moved_at) SELECT ",
                    file_columns!(),
                    ", ?2, ?3 FROM scanned_file WHERE id = ?1"
                ))?;
                for m in moves {
                    let n = stmt.execute(params![m.record_id, m.destination, now])?;
                    if n != 1 {
                        return Err(Error::inconsistent(format!("moved record {}", m.record_id), 1, n));
                    }
                }
            }
            let ids: Vec<i64> = moves.iter().map(|m| m.record_id).collect();
            delete_active(tx, &ids, "moved")
        })?;
        debug!("Marked {} record(s) as moved", count);
        Ok(count)
    }

    // ── Duplicates ───────────────────────────────────────────────

    /// Duplicate rows whose files have not been nuked yet.
    pub fn pending_duplicates(&self) -> Result<Vec<DuplicateEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT rowid, id, path, duplicate_of, pass FROM duplicate \
             WHERE nuked_at IS NULL ORDER BY rowid",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(DuplicateEntry {
                    rowid: row.get(0)?,
                    file_id: row.get(1)?,
                    path: row.get(2)?,
                    duplicate_of: row.get(3)?,
                    pass: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn mark_nuked(&self, rowid: i64, result: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.lock()?.execute(
            "UPDATE duplicate SET nuked_at = ?1, nuke_result = ?2 WHERE rowid = ?3",
            params![now, result, rowid],
        )?;
        Ok(())
    }

    // ── Summary ──────────────────────────────────────────────────

    pub fn summary(&self) -> Result<IndexSummary> {
        let conn = self.lock()?;
        let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |row| row.get(0)) };
        Ok(IndexSummary {
            active: count("SELECT COUNT(*) FROM scanned_file")?,
            rejected_not_music: conn.query_row(
                "SELECT COUNT(*) FROM reject WHERE reason = ?1",
                params![RejectReason::NotMusic.as_str()],
                |row| row.get(0),
            )?,
            rejected_missing_tags: conn.query_row(
                "SELECT COUNT(*) FROM reject WHERE reason = ?1",
                params![RejectReason::MissingTags.as_str()],
                |row| row.get(0),
            )?,
            duplicates: count("SELECT COUNT(*) FROM duplicate")?,
            duplicates_nuked: count("SELECT COUNT(*) FROM duplicate WHERE nuked_at IS NOT NULL")?,
            originals: count("SELECT COUNT(*) FROM original")?,
            moved: count("SELECT COUNT(*) FROM moved_file")?,
        })
    }
}

fn query_records<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<FileRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let records = stmt
        .query_map(params, FileRecord::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Delete `ids` from the active set; each must match exactly one row.
fn delete_active(tx: &Transaction<'_>, ids: &[i64], context: &str) -> Result<usize> {
    let mut stmt = tx.prepare_cached("DELETE FROM scanned_file WHERE id = ?1")?;
    let mut deleted = 0;
    for id in ids {
        deleted += stmt.execute(params![id])?;
    }
    if deleted != ids.len() {
        return Err(Error::inconsistent(context, ids.len(), deleted));
    }
    Ok(deleted)
}
