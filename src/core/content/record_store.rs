use super::content_models::{ContentRow, HistoryEntry, YoutubeConfig};
use super::content_schema::{SchemaError, Table, TableRow};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record store API error: {0}")]
    Api(String),
    #[error("Row {index} not found in {table}")]
    NotFound { table: String, index: usize },
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Table {0} does not hold content rows")]
    NotContent(&'static str),
}

/// Cell-level access to the backing tables.
///
/// Rows are addressed by 0-based data index (the header row is excluded).
/// The store has no notion of identity beyond that position, so callers must
/// not reorder a table while an index-addressed write is in flight.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read_rows(&self, table: &str) -> Result<Vec<Vec<String>>, StoreError>;
    async fn write_row(&self, table: &str, index: usize, cells: Vec<String>)
        -> Result<(), StoreError>;
    async fn append_row(&self, table: &str, cells: Vec<String>) -> Result<(), StoreError>;
    async fn delete_row(&self, table: &str, index: usize) -> Result<(), StoreError>;
}

/// Typed view over a [`RecordStore`], using each table's schema codec.
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn RecordStore>,
}

impl Records {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn get_all_rows(&self, table: Table) -> Result<Vec<TableRow>, StoreError> {
        let schema = table.schema();
        let rows = self.store.read_rows(table.name()).await?;
        Ok(rows.iter().map(|cells| schema.decode(cells)).collect())
    }

    pub async fn update_row(
        &self,
        table: Table,
        index: usize,
        row: &TableRow,
    ) -> Result<(), StoreError> {
        let cells = table.schema().encode(row)?;
        self.store.write_row(table.name(), index, cells).await
    }

    pub async fn append_row(&self, table: Table, row: &TableRow) -> Result<(), StoreError> {
        let cells = table.schema().encode(row)?;
        self.store.append_row(table.name(), cells).await
    }

    pub async fn delete_row(&self, table: Table, index: usize) -> Result<(), StoreError> {
        self.store.delete_row(table.name(), index).await
    }

    pub async fn get_row(&self, table: Table, index: usize) -> Result<TableRow, StoreError> {
        self.get_all_rows(table)
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(|| StoreError::NotFound {
                table: table.name().to_string(),
                index,
            })
    }

    pub async fn content_row(&self, table: Table, index: usize) -> Result<ContentRow, StoreError> {
        if !table.is_content() {
            return Err(StoreError::NotContent(table.name()));
        }
        match self.get_row(table, index).await? {
            TableRow::Content(row) => Ok(row),
            _ => Err(StoreError::NotContent(table.name())),
        }
    }

    pub async fn update_content_row(
        &self,
        table: Table,
        index: usize,
        row: ContentRow,
    ) -> Result<(), StoreError> {
        self.update_row(table, index, &TableRow::Content(row)).await
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self
            .get_all_rows(Table::History)
            .await?
            .into_iter()
            .filter_map(|row| match row {
                TableRow::History(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    pub async fn history_entry(&self, index: usize) -> Result<HistoryEntry, StoreError> {
        self.history()
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(|| StoreError::NotFound {
                table: Table::History.name().to_string(),
                index,
            })
    }

    pub async fn update_history(
        &self,
        index: usize,
        entry: HistoryEntry,
    ) -> Result<(), StoreError> {
        self.update_row(Table::History, index, &TableRow::History(entry))
            .await
    }

    pub async fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        self.append_row(Table::History, &TableRow::History(entry))
            .await
    }

    pub async fn youtube_configs(&self) -> Result<Vec<YoutubeConfig>, StoreError> {
        Ok(self
            .get_all_rows(Table::YoutubeConfig)
            .await?
            .into_iter()
            .filter_map(|row| match row {
                TableRow::YoutubeConfig(config) => Some(config),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use dashmap::DashMap;

    /// In-memory record store for tests.
    #[derive(Default)]
    pub struct MemoryRecordStore {
        tables: DashMap<String, Vec<Vec<String>>>,
    }

    impl MemoryRecordStore {
        pub fn with_rows(table: Table, rows: Vec<Vec<String>>) -> Self {
            let store = Self::default();
            store.tables.insert(table.name().to_string(), rows);
            store
        }

        pub fn seed(&self, table: Table, rows: Vec<Vec<String>>) {
            self.tables.insert(table.name().to_string(), rows);
        }

        pub fn rows(&self, table: Table) -> Vec<Vec<String>> {
            self.tables
                .get(table.name())
                .map(|rows| rows.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl RecordStore for MemoryRecordStore {
        async fn read_rows(&self, table: &str) -> Result<Vec<Vec<String>>, StoreError> {
            Ok(self
                .tables
                .get(table)
                .map(|rows| rows.clone())
                .unwrap_or_default())
        }

        async fn write_row(
            &self,
            table: &str,
            index: usize,
            cells: Vec<String>,
        ) -> Result<(), StoreError> {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            let slot = rows.get_mut(index).ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                index,
            })?;
            *slot = cells;
            Ok(())
        }

        async fn append_row(&self, table: &str, cells: Vec<String>) -> Result<(), StoreError> {
            self.tables.entry(table.to_string()).or_default().push(cells);
            Ok(())
        }

        async fn delete_row(&self, table: &str, index: usize) -> Result<(), StoreError> {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            if index >= rows.len() {
                return Err(StoreError::NotFound {
                    table: table.to_string(),
                    index,
                });
            }
            rows.remove(index);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryRecordStore;
    use super::*;
    use crate::core::content::{HistoryStatus, Platform};

    fn history_cells(post_id: &str, status: &str) -> Vec<String> {
        let mut cells = vec![String::new(); 14];
        cells[6] = post_id.to_string();
        cells[13] = status.to_string();
        cells
    }

    #[tokio::test]
    async fn test_history_round_trip_through_store() {
        let store = Arc::new(MemoryRecordStore::with_rows(
            Table::History,
            vec![history_cells("1_2", "SCHEDULED"), history_cells("3_4", "")],
        ));
        let records = Records::new(store.clone());

        let history = records.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].platform(), Some(Platform::Facebook));
        assert!(history[0].is_scheduled());
        assert_eq!(history[1].status, HistoryStatus::Success);

        let mut first = history[0].clone();
        first.status = HistoryStatus::Success;
        records.update_history(0, first).await.unwrap();

        assert_eq!(store.rows(Table::History)[0][13], "SUCCESS");
        assert_eq!(store.rows(Table::History)[1], history_cells("3_4", ""));
    }

    #[tokio::test]
    async fn test_missing_rows_are_reported() {
        let records = Records::new(Arc::new(MemoryRecordStore::default()));
        assert!(matches!(
            records.content_row(Table::FacebookContent, 3).await,
            Err(StoreError::NotFound { index: 3, .. })
        ));
        assert!(matches!(
            records.content_row(Table::History, 0).await,
            Err(StoreError::NotContent("Published_History"))
        ));
    }
}
