use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::storage::models::RejectReason;
use crate::storage::Index;
use tracing::{debug, info};

/// Records moved to `reject` by one classification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyReport {
    pub not_music: usize,
    pub missing_tags: usize,
}

/// Moves non-music files and files lacking title, album or artist out of the active set.
pub struct Classifier<'a> {
    index: &'a Index,
    config: &'a AppConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(index: &'a Index, config: &'a AppConfig) -> Self {
        Classifier { index, config }
    }

    /// Both passes run in one transaction, extension check first.
    /// Running it again on an already classified index moves nothing.
    pub fn classify(&self) -> Result<ClassifyReport> {
        let report = self.index.with_transaction(|tx| {
            let not_music: Vec<i64> = {
                let mut stmt = tx.prepare("SELECT id, extension FROM scanned_file ORDER BY id")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows.into_iter()
                    .filter(|(_, ext)| {
                        !ext.as_deref()
                            .map(|ext| self.config.is_music_extension(ext))
                            .unwrap_or(false)
                    })
                    .map(|(id, _)| id)
                    .collect()
            };
            let not_music = Index::reject_ids(tx, &not_music, RejectReason::NotMusic)?;

            let inserted = tx.execute(
                concat!(
                    "INSERT INTO reject (reason, ",
                    file_columns!(),
                    ") SELECT ?1, ",
                    file_columns!(),
                    " FROM scanned_file \
                     WHERE title IS NULL OR album IS NULL OR artist IS NULL"
                ),
                [RejectReason::MissingTags.as_str()],
            )?;
            let deleted = tx.execute(
                "DELETE FROM scanned_file WHERE title IS NULL OR album IS NULL OR artist IS NULL",
                [],
            )?;
            if inserted != deleted {
                return Err(Error::inconsistent(
                    RejectReason::MissingTags.as_str(),
                    inserted,
                    deleted,
                ));
            }

            Ok(ClassifyReport {
                not_music,
                missing_tags: deleted,
            })
        })?;

        debug!("Classification detail: {:?}", report);
        info!(
            "Rejected {} non-music files and {} files with missing tags",
            report.not_music, report.missing_tags
        );
        Ok(report)
    }
}
