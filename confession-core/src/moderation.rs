use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{
    BulkResult, Confession, ConfessionStatus, ModerationFilters, PendingPage, SourceType, Stats,
    StatusFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    ApproveAll,
    DeleteAll,
}

impl Action {
    /// Row actions offered for a confession: only pending rows can be approved or rejected.
    pub fn available_for(confession: &Confession) -> &'static [Action] {
        if confession.status == Some(ConfessionStatus::Pending) {
            &[Action::Approve, Action::Reject, Action::Delete]
        } else {
            &[Action::Delete]
        }
    }
}

/// A page fetch issued by the view model; results are applied against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub filters: ModerationFilters,
    pub page: u32,
    pub limit: u32,
    pub reset: bool,
}

/// Admin moderation queue: server-paginated, accumulating, refreshed after every mutation.
#[derive(Debug)]
pub struct ModerationViewModel {
    filters: ModerationFilters,
    confessions: Vec<Confession>,
    page: u32,
    page_size: u32,
    has_more: bool,
    loading: bool,
    processing: Option<String>,
    bulk_in_flight: bool,
    stats: Option<Stats>,
    error: Option<String>,
    generation: u64,
}

impl ModerationViewModel {
    pub fn new(page_size: u32) -> Self {
        Self {
            filters: ModerationFilters::default(),
            confessions: Vec::new(),
            page: 0,
            page_size: page_size.max(1),
            has_more: true,
            loading: false,
            processing: None,
            bulk_in_flight: false,
            stats: None,
            error: None,
            generation: 0,
        }
    }

    pub fn filters(&self) -> ModerationFilters {
        self.filters
    }

    pub fn confessions(&self) -> &[Confession] {
        &self.confessions
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.bulk_in_flight
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether this row has a mutation in flight.
    pub fn is_processing(&self, id: &str) -> bool {
        self.processing.as_deref() == Some(id)
    }

    /// Rows in the current list a bulk action would touch.
    pub fn bulk_targets(&self, action: BulkAction) -> usize {
        let status = self.filters.status;
        self.confessions
            .iter()
            .filter(|c| match action {
                BulkAction::ApproveAll => c.status == Some(ConfessionStatus::Pending),
                BulkAction::DeleteAll => match status {
                    StatusFilter::All => matches!(
                        c.status,
                        Some(ConfessionStatus::Approved | ConfessionStatus::Rejected)
                    ),
                    other => c.status.map(|s| s.as_str()) == Some(other.as_str()),
                },
            })
            .count()
    }

    /// Clears the list and requests page 1 under `filters`.
    pub fn begin_refresh(&mut self, filters: ModerationFilters) -> PageRequest {
        self.generation += 1;
        self.filters = filters;
        self.confessions.clear();
        self.page = 0;
        self.has_more = true;
        self.loading = true;
        PageRequest {
            generation: self.generation,
            filters,
            page: 1,
            limit: self.page_size,
            reset: true,
        }
    }

    /// Next page request, or `None` while a load is in flight or the queue is exhausted.
    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        if self.loading || !self.has_more {
            debug!(
                loading = self.loading,
                has_more = self.has_more,
                "load more skipped"
            );
            return None;
        }
        self.loading = true;
        Some(PageRequest {
            generation: self.generation,
            filters: self.filters,
            page: self.page + 1,
            limit: self.page_size,
            reset: false,
        })
    }

    pub fn apply_page(
        &mut self,
        request: PageRequest,
        result: Result<PendingPage, ApiError>,
    ) -> Result<(), ApiError> {
        if request.generation != self.generation {
            debug!(page = request.page, "ignoring page from superseded refresh");
            return Ok(());
        }
        self.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, page = request.page, "failed to load moderation queue");
                // Auth failures are handled by the login prompt, not inline.
                self.error = (!err.is_auth()).then(|| err.user_message());
                return Err(err);
            }
        };

        let received = page.confessions.len();
        let exhausted = match page.pagination {
            Some(pagination) => pagination.page >= pagination.total_pages,
            None => false,
        };
        self.has_more = !(exhausted || received == 0);

        if request.reset {
            self.confessions = page.confessions;
        } else {
            self.confessions.extend(page.confessions);
        }
        if let Some(stats) = page.stats {
            self.stats = Some(stats);
        }
        self.page = request.page;
        self.error = None;
        debug!(
            page = request.page,
            received,
            has_more = self.has_more,
            "moderation page applied"
        );
        Ok(())
    }

    pub async fn refresh(
        &mut self,
        api: &ApiClient,
        filters: ModerationFilters,
    ) -> Result<(), ApiError> {
        let request = self.begin_refresh(filters);
        let mut result = api.get_pending(filters, request.page, request.limit).await;
        if matches!(&result, Ok(page) if page.stats.is_none()) {
            match api.get_stats().await {
                Ok(stats) => {
                    if let Ok(page) = &mut result {
                        page.stats = Some(stats);
                    }
                }
                Err(err) if err.is_auth() => result = Err(err),
                Err(err) => warn!(error = %err, "failed to load moderation stats"),
            }
        }
        self.apply_page(request, result)
    }

    /// Refetches page 1 under the current filters.
    pub async fn reload(&mut self, api: &ApiClient) -> Result<(), ApiError> {
        self.refresh(api, self.filters).await
    }

    pub async fn load_more(&mut self, api: &ApiClient) -> Result<(), ApiError> {
        let Some(request) = self.begin_load_more() else {
            return Ok(());
        };
        let result = api
            .get_pending(request.filters, request.page, request.limit)
            .await;
        self.apply_page(request, result)
    }

    pub async fn moderate(
        &mut self,
        api: &ApiClient,
        action: Action,
        id: &str,
        source: Option<SourceType>,
    ) -> Result<(), ApiError> {
        self.processing = Some(id.to_string());
        let result = match action {
            Action::Approve => api.approve(id, source).await,
            Action::Reject => api.reject(id, source).await,
            Action::Delete => api.delete(id, source).await,
        };
        self.processing = None;

        match result {
            Ok(()) => {
                info!(?action, id, "confession moderated");
                if let Err(err) = self.reload(api).await {
                    warn!(error = %err, "refresh after moderation failed");
                }
                Ok(())
            }
            Err(err) => {
                warn!(?action, id, error = %err, "moderation failed");
                Err(err)
            }
        }
    }

    pub async fn approve(&mut self, api: &ApiClient, confession: &Confession) -> Result<(), ApiError> {
        self.moderate(api, Action::Approve, &confession.id, confession.source_type)
            .await
    }

    pub async fn reject(&mut self, api: &ApiClient, confession: &Confession) -> Result<(), ApiError> {
        self.moderate(api, Action::Reject, &confession.id, confession.source_type)
            .await
    }

    pub async fn delete(&mut self, api: &ApiClient, confession: &Confession) -> Result<(), ApiError> {
        self.moderate(api, Action::Delete, &confession.id, confession.source_type)
            .await
    }

    /// Runs a bulk action under the current filters. Counts are passed through as reported.
    pub async fn bulk(&mut self, api: &ApiClient, action: BulkAction) -> Result<BulkResult, ApiError> {
        self.bulk_in_flight = true;
        let result = match action {
            BulkAction::ApproveAll => api.approve_all(self.filters).await,
            BulkAction::DeleteAll => api.delete_all(self.filters).await,
        };
        self.bulk_in_flight = false;

        let outcome = result.inspect_err(|err| {
            warn!(?action, error = %err, "bulk moderation failed");
        })?;
        info!(
            ?action,
            succeeded = outcome.success_count,
            failed = outcome.fail_count,
            "bulk moderation finished"
        );
        if let Err(err) = self.reload(api).await {
            warn!(error = %err, "refresh after bulk moderation failed");
        }
        Ok(outcome)
    }

    pub async fn approve_all(&mut self, api: &ApiClient) -> Result<BulkResult, ApiError> {
        self.bulk(api, BulkAction::ApproveAll).await
    }

    pub async fn delete_all(&mut self, api: &ApiClient) -> Result<BulkResult, ApiError> {
        self.bulk(api, BulkAction::DeleteAll).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pagination, SourceFilter};
    use reqwest::StatusCode;

    fn row(id: &str, status: ConfessionStatus) -> Confession {
        Confession {
            id: id.into(),
            status: Some(status),
            source_type: Some(SourceType::Website),
            ..Default::default()
        }
    }

    fn page(ids: &[&str], page: u32, total_pages: u32) -> PendingPage {
        PendingPage {
            confessions: ids
                .iter()
                .map(|id| row(id, ConfessionStatus::Pending))
                .collect(),
            pagination: Some(Pagination { page, total_pages }),
            stats: None,
        }
    }

    #[test]
    fn pages_accumulate_until_exhausted() {
        let mut vm = ModerationViewModel::new(2);
        let req = vm.begin_refresh(ModerationFilters::default());
        assert_eq!(req.page, 1);
        vm.apply_page(req, Ok(page(&["a", "b"], 1, 2))).unwrap();
        assert!(vm.has_more());

        let req = vm.begin_load_more().unwrap();
        assert_eq!(req.page, 2);
        assert!(vm.begin_load_more().is_none(), "load already in flight");
        vm.apply_page(req, Ok(page(&["c"], 2, 2))).unwrap();

        let ids: Vec<&str> = vm.confessions().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(!vm.has_more());
        assert!(vm.begin_load_more().is_none());
    }

    #[test]
    fn empty_page_ends_pagination() {
        let mut vm = ModerationViewModel::new(10);
        let req = vm.begin_refresh(ModerationFilters::default());
        vm.apply_page(req, Ok(page(&[], 1, 5))).unwrap();
        assert!(!vm.has_more());
    }

    #[test]
    fn refresh_resets_list_and_drops_stale_pages() {
        let mut vm = ModerationViewModel::new(2);
        let req = vm.begin_refresh(ModerationFilters::default());
        vm.apply_page(req, Ok(page(&["a", "b"], 1, 3))).unwrap();
        let stale = vm.begin_load_more().unwrap();

        let filters = ModerationFilters {
            source: SourceFilter::GoogleSheets,
            status: StatusFilter::Approved,
        };
        let fresh = vm.begin_refresh(filters);
        assert!(vm.confessions().is_empty());
        vm.apply_page(stale, Ok(page(&["x"], 2, 3))).unwrap();
        assert!(vm.confessions().is_empty());

        vm.apply_page(fresh, Ok(page(&["y"], 1, 1))).unwrap();
        assert_eq!(vm.confessions()[0].id, "y");
        assert_eq!(vm.filters(), filters);
    }

    #[test]
    fn errors_are_inline_except_auth() {
        let mut vm = ModerationViewModel::new(10);
        let req = vm.begin_refresh(ModerationFilters::default());
        let err = ApiError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: Some("database offline".into()),
        };
        assert!(vm.apply_page(req, Err(err)).is_err());
        assert_eq!(vm.error(), Some("database offline"));
        assert!(!vm.is_loading());

        let req = vm.begin_refresh(ModerationFilters::default());
        let err = ApiError::Auth {
            status: Some(StatusCode::FORBIDDEN),
        };
        assert!(vm.apply_page(req, Err(err)).is_err());
        assert_eq!(vm.error(), None);
    }

    #[test]
    fn bulk_targets_follow_status_filter() {
        let mut vm = ModerationViewModel::new(10);
        let req = vm.begin_refresh(ModerationFilters {
            source: SourceFilter::All,
            status: StatusFilter::All,
        });
        vm.apply_page(
            req,
            Ok(PendingPage {
                confessions: vec![
                    row("1", ConfessionStatus::Pending),
                    row("2", ConfessionStatus::Approved),
                    row("3", ConfessionStatus::Rejected),
                ],
                pagination: Some(Pagination {
                    page: 1,
                    total_pages: 1,
                }),
                stats: None,
            }),
        )
        .unwrap();
        assert_eq!(vm.bulk_targets(BulkAction::ApproveAll), 1);
        assert_eq!(vm.bulk_targets(BulkAction::DeleteAll), 2);

        let req = vm.begin_refresh(ModerationFilters {
            source: SourceFilter::All,
            status: StatusFilter::Rejected,
        });
        vm.apply_page(
            req,
            Ok(PendingPage {
                confessions: vec![row("3", ConfessionStatus::Rejected)],
                ..Default::default()
            }),
        )
        .unwrap();
        assert_eq!(vm.bulk_targets(BulkAction::DeleteAll), 1);
    }

    #[test]
    fn only_pending_rows_offer_approve_and_reject() {
        assert_eq!(
            Action::available_for(&row("p", ConfessionStatus::Pending)),
            &[Action::Approve, Action::Reject, Action::Delete]
        );
        for status in [ConfessionStatus::Approved, ConfessionStatus::Rejected] {
            assert_eq!(Action::available_for(&row("x", status)), &[Action::Delete]);
        }
        let unknown = Confession {
            id: "u".into(),
            ..Default::default()
        };
        assert_eq!(Action::available_for(&unknown), &[Action::Delete]);
    }
}
