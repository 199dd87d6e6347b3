//! The `SheetClient` orchestrates the rate limiters, the retry policy and
//! the address arithmetic into the five operations callers use against a
//! remote table.

use {
    crate::{
        api::{ApiError, SheetsApi, TableMetadata},
        arguments::Arguments,
        block::TabularBlock,
        error::{GatewayError, RemoteError},
        range,
    },
    rate_limit::{RateBudget, RateLimiter, RetryPolicy, RetrySpec},
    std::{future::Future, sync::Arc},
};

/// Client for one remote spreadsheet service. Read and write traffic run
/// against separate limiters because the remote quotas are independent; all
/// concurrent operations on one instance share those limiters.
pub struct SheetClient {
    api: Arc<dyn SheetsApi>,
    read_limiter: RateLimiter,
    write_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl SheetClient {
    pub fn new(
        api: Arc<dyn SheetsApi>,
        read_budget: RateBudget,
        write_budget: RateBudget,
        retry: RetrySpec,
    ) -> Self {
        Self {
            api,
            read_limiter: RateLimiter::from_budget(read_budget, "sheets_read".to_string()),
            write_limiter: RateLimiter::from_budget(write_budget, "sheets_write".to_string()),
            retry: RetryPolicy::new(retry),
        }
    }

    pub fn from_arguments(api: Arc<dyn SheetsApi>, args: &Arguments) -> Self {
        Self::new(
            api,
            args.sheets_read_budget.clone(),
            args.sheets_write_budget.clone(),
            RetrySpec {
                max_attempts: args.sheets_retry_attempts,
                delay: args.sheets_retry_delay,
            },
        )
    }

    /// Fetches the table's metadata: which tabs exist, their ids and sizes.
    pub async fn get_metadata(&self, table_id: &str) -> Result<TableMetadata, GatewayError> {
        self.read(|| self.api.get_metadata(table_id)).await
    }

    /// Resolves a tab title to the numeric id the remote service uses for
    /// structural requests.
    pub async fn tab_id(&self, table_id: &str, tab_name: &str) -> Result<i64, GatewayError> {
        let metadata = self.get_metadata(table_id).await?;
        metadata
            .sheets
            .iter()
            .find(|tab| tab.properties.title == tab_name)
            .map(|tab| tab.properties.sheet_id)
            .ok_or_else(|| GatewayError::Precondition(format!("no tab titled {tab_name:?}")))
    }

    /// Reads the occupied region of a tab and splits off its header.
    pub async fn read_region(
        &self,
        table_id: &str,
        tab_name: &str,
        header_row: u32,
        header_offset: u32,
    ) -> Result<TabularBlock, GatewayError> {
        let values = self.read(|| self.api.get_values(table_id, tab_name)).await?;
        let (columns, rows) = range::split_header(values.values, header_row, header_offset)?;
        TabularBlock::from_remote(columns, rows)
    }

    /// Deletes the cell contents of `cell_range` (e.g. `"A2:C"`) in a tab
    /// without removing any rows.
    pub async fn clear_region(
        &self,
        table_id: &str,
        tab_name: &str,
        cell_range: &str,
    ) -> Result<(), GatewayError> {
        let full_range = format!("{tab_name}!{cell_range}");
        self.write(|| self.api.clear_values(table_id, &full_range))
            .await
    }

    /// Creates a new tab. Not idempotent: callers that may run twice should
    /// check for the title via [`Self::get_metadata`] first.
    pub async fn add_tab(
        &self,
        table_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), GatewayError> {
        self.write(|| self.api.add_tab(table_id, title, rows, cols))
            .await
    }

    /// Overwrites the region starting at `start_row` with `block`.
    ///
    /// The destination is cleared first so a smaller block does not leave
    /// remnants of a previously larger one behind. The clear is best effort:
    /// when it fails, the write still happens and stale trailing cells may
    /// survive. Callers that need strict overwrite semantics call
    /// [`Self::clear_region`] themselves and check its result.
    pub async fn paste_region(
        &self,
        table_id: &str,
        tab_name: &str,
        start_row: u32,
        block: &TabularBlock,
        include_header: bool,
    ) -> Result<(), GatewayError> {
        let col_count = u32::try_from(block.columns().len())
            .ok()
            .filter(|count| *count > 0)
            .ok_or_else(|| GatewayError::Precondition("block has no columns".to_string()))?;
        let destination = range::block_range(tab_name, start_row, col_count);

        if let Err(err) = self
            .write(|| self.api.clear_values(table_id, &destination))
            .await
        {
            tracing::warn!(%err, %destination, "failed to clear paste destination, writing anyway");
        }

        let rows = block.to_wire_rows(include_header);
        self.write(|| self.api.update_values(table_id, &destination, &rows))
            .await
    }

    /// Appends `block` to the data region of a tab while keeping the total
    /// data row count at or below `row_limit`, evicting the oldest rows
    /// first. The data region is an implicit FIFO ring by insertion order:
    /// its first row is the oldest entry.
    ///
    /// Eviction failing does not stop the append; callers get the distinct
    /// [`GatewayError::EvictionFailed`] so they can decide whether an
    /// over-limit tab is acceptable. Returns the occupied data row count
    /// after the append as far as this client observed it.
    pub async fn append_bounded(
        &self,
        table_id: &str,
        tab_name: &str,
        header_row: u32,
        header_offset: u32,
        block: &TabularBlock,
        row_limit: u32,
    ) -> Result<u32, GatewayError> {
        if block.is_empty() {
            return Err(GatewayError::Precondition(
                "refusing to append an empty block".to_string(),
            ));
        }

        let current_len = u32::try_from(
            self.read_region(table_id, tab_name, header_row, header_offset)
                .await?
                .len(),
        )
        .map_err(|_| GatewayError::Precondition("tab is implausibly large".to_string()))?;
        let new_len = u32::try_from(block.len())
            .map_err(|_| GatewayError::Precondition("block is implausibly large".to_string()))?;
        let (to_delete, retained) = eviction(current_len, new_len, row_limit);

        let mut eviction_failure = None;
        if to_delete > 0 {
            if let Err(eviction) = self.evict_oldest(
                table_id,
                tab_name,
                header_row + header_offset,
                to_delete,
            )
            .await
            {
                match eviction {
                    GatewayError::Remote(remote) => {
                        tracing::warn!(
                            %remote,
                            to_delete,
                            "failed to evict oldest rows, appending anyway"
                        );
                        eviction_failure = Some(remote);
                    }
                    // Local preconditions (an unknown tab title) doom the
                    // append as well, no point in attempting it.
                    other => return Err(other),
                }
            }
        }

        // The remote service's own append primitive finds the end of the
        // occupied region itself, which narrows (but does not close) the
        // race window against concurrent writers between the length read
        // above and this write.
        let rows = block.to_wire_rows(false);
        self.write(|| self.api.append_values(table_id, tab_name, &rows))
            .await?;

        match eviction_failure {
            Some(eviction) => Err(GatewayError::EvictionFailed { eviction }),
            None => Ok(retained + new_len),
        }
    }

    /// Deletes the `to_delete` oldest rows of the data region, which starts
    /// `data_offset` sheet rows below the top of the tab.
    async fn evict_oldest(
        &self,
        table_id: &str,
        tab_name: &str,
        data_offset: u32,
        to_delete: u32,
    ) -> Result<(), GatewayError> {
        let tab_id = self.tab_id(table_id, tab_name).await?;
        self.write(|| {
            self.api
                .delete_rows(table_id, tab_id, data_offset, data_offset + to_delete)
        })
        .await
    }

    async fn read<T, F, Fut>(&self, operation: F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.with_limiter(&self.read_limiter, operation).await
    }

    async fn write<T, F, Fut>(&self, operation: F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.with_limiter(&self.write_limiter, operation).await
    }

    /// Every attempt acquires the limiter anew so the spacing guarantee
    /// covers retries too, not just first attempts.
    async fn with_limiter<T, F, Fut>(
        &self,
        limiter: &RateLimiter,
        operation: F,
    ) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let operation = &operation;
        self.retry
            .execute(
                move || async move {
                    let _permit = limiter.acquire().await;
                    operation().await.map_err(RemoteError::from)
                },
                RemoteError::is_transient,
            )
            .await
            .map_err(GatewayError::Remote)
    }
}

/// How many of the oldest rows must go to keep `current + incoming` at or
/// below `limit`, and how many current rows survive. Never evicts more rows
/// than exist, even when the incoming block alone busts the limit.
fn eviction(current: u32, incoming: u32, limit: u32) -> (u32, u32) {
    let to_delete = (current + incoming).saturating_sub(limit).min(current);
    (to_delete, current - to_delete)
}
