// src/submit.rs

use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    date_parser::now_iso,
    error::{Error, Result},
    requests::{RequestLog, PENDING},
    source::TabularSource,
};

/// The two values of the request form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestForm {
    pub song_title: String,
    pub requester_name: String,
}

impl RequestForm {
    pub fn new(song_title: impl Into<String>, requester_name: impl Into<String>) -> Self {
        Self {
            song_title: song_title.into(),
            requester_name: requester_name.into(),
        }
    }

    pub fn clear(&mut self) {
        self.song_title.clear();
        self.requester_name.clear();
    }

    /// Blank means empty or whitespace only.
    fn validate(&self) -> Result<()> {
        if self.song_title.trim().is_empty() {
            return Err(Error::Validation {
                field: "song_title",
            });
        }
        if self.requester_name.trim().is_empty() {
            return Err(Error::Validation {
                field: "requester_name",
            });
        }
        Ok(())
    }
}

/// Appends requests to the requests region and refreshes the log afterwards.
pub struct RequestSubmitter {
    source: Arc<dyn TabularSource>,
    range: String,
    log: Arc<RequestLog>,
}

impl RequestSubmitter {
    pub fn new(source: Arc<dyn TabularSource>, range: impl Into<String>, log: Arc<RequestLog>) -> Self {
        Self {
            source,
            range: range.into(),
            log,
        }
    }

    /// Validate, append `[timestamp, title, name, "Pending"]`, clear the form
    /// and reload the log.
    ///
    /// On a validation or append error the form is untouched and the log is
    /// not reloaded. A failed reload after a good append is only logged.
    #[instrument(level = "info", skip(self, form), fields(range = %self.range))]
    pub async fn submit(&self, form: &mut RequestForm) -> Result<()> {
        form.validate()?;

        let row = vec![
            now_iso(),
            form.song_title.clone(),
            form.requester_name.clone(),
            PENDING.to_string(),
        ];

        if let Err(e) = self.source.append(&self.range, row).await {
            error!(error = %e, "error submitting request");
            return Err(e);
        }
        info!(song = %form.song_title, by = %form.requester_name, "request submitted");
        form.clear();

        if let Err(e) = self.log.load().await {
            warn!(error = %e, "reload after submit failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        date_parser::parse_timestamp,
        source::{MemorySource, REQUESTS_RANGE},
    };

    fn setup() -> (Arc<MemorySource>, Arc<RequestLog>, RequestSubmitter) {
        let src = Arc::new(MemorySource::new());
        src.set_rows(
            REQUESTS_RANGE,
            [vec!["Timestamp", "Song Title", "Requested By", "Status"]],
        );
        let log = Arc::new(RequestLog::new(src.clone(), REQUESTS_RANGE));
        let submitter = RequestSubmitter::new(src.clone(), REQUESTS_RANGE, log.clone());
        (src, log, submitter)
    }

    #[tokio::test]
    async fn test_empty_fields_are_rejected_without_append() {
        let (src, _log, submitter) = setup();

        let mut form = RequestForm::new("", "Alice");
        let err = submitter.submit(&mut form).await.unwrap_err();
        assert!(matches!(err, Error::Validation { field: "song_title" }));

        let mut form = RequestForm::new("Song", "");
        let err = submitter.submit(&mut form).await.unwrap_err();
        assert!(matches!(err, Error::Validation { field: "requester_name" }));

        assert!(src.operations().is_empty());
        assert_eq!(form, RequestForm::new("Song", ""));
    }

    #[tokio::test]
    async fn test_whitespace_only_fields_are_rejected() {
        let (src, _log, submitter) = setup();
        let mut form = RequestForm::new("   ", "Bob");
        assert!(submitter.submit(&mut form).await.unwrap_err().is_validation());
        let mut form = RequestForm::new("Imagine", "\t");
        assert!(submitter.submit(&mut form).await.unwrap_err().is_validation());
        assert!(src.operations().is_empty());
    }

    #[tokio::test]
    async fn test_successful_submit_appends_once_and_reloads_once() {
        let (src, log, submitter) = setup();
        let mut form = RequestForm::new("Imagine", "Bob");
        submitter.submit(&mut form).await.unwrap();

        let appended = src.appended(REQUESTS_RANGE);
        assert_eq!(appended.len(), 1);
        let row = &appended[0];
        assert_eq!(row.len(), 4);
        assert!(parse_timestamp(&row[0]).is_some());
        assert_eq!(&row[1..], &["Imagine", "Bob", "Pending"]);

        assert_eq!(src.get_count(REQUESTS_RANGE), 1);
        assert_eq!(form, RequestForm::default());
        assert_eq!(log.generation(), 1);
    }

    #[tokio::test]
    async fn test_failed_append_keeps_form_and_skips_reload() {
        let (src, log, submitter) = setup();
        src.fail(REQUESTS_RANGE);

        let mut form = RequestForm::new("Imagine", "Bob");
        let err = submitter.submit(&mut form).await.unwrap_err();
        assert!(err.is_fetch());
        assert_eq!(form, RequestForm::new("Imagine", "Bob"));
        assert_eq!(src.get_count(REQUESTS_RANGE), 0);
        assert_eq!(log.generation(), 0);
    }

    #[tokio::test]
    async fn test_submitted_title_round_trips_verbatim() {
        let (_src, log, submitter) = setup();
        let title = "  Don't Stop Me Now (Live) ";
        let mut form = RequestForm::new(title, "Bob");
        submitter.submit(&mut form).await.unwrap();

        let snap = log.snapshot();
        let pending = snap.pending_sorted_by_recency_desc();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].song_title, title);
        assert_eq!(pending[0].requested_by, "Bob");
    }
}
