// src/app.rs
//! Wiring between the data components and a presentation front end.
//!
//! The app owns the current search inputs and the request form. Events from
//! the front end come in over a channel; request-log refreshes, whether from
//! the periodic loop or a submission, are picked up from the log's watch
//! channel and rendered once per applied generation.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    catalog::{CatalogIndex, SongRecord},
    error::Error,
    requests::{RefreshHandle, RequestLog, RequestRecord},
    search::search,
    source::{TabularSource, CATALOG_RANGE, REQUESTS_RANGE},
    submit::{RequestForm, RequestSubmitter},
};

/// Something the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SearchInput(String),
    /// Empty string clears the filter.
    GenreSelected(String),
    TitleEdited(String),
    NameEdited(String),
    CatalogRowClicked(usize),
    FormSubmitted,
}

/// Transient messages shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Submitted,
    InvalidForm,
    SubmitFailed,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::Submitted => "Your song request has been submitted!",
            Notice::InvalidForm => "Please select a song and enter your name.",
            Notice::SubmitFailed => "There was an error submitting your request. Please try again.",
        }
    }
}

/// Where the app draws.
pub trait PresentationSink {
    fn populate_genres(&mut self, genres: &[String]);

    fn render_results(&mut self, songs: &[&SongRecord]);

    /// `total` counts every request in the log, pending or not.
    fn render_requests(&mut self, pending: &[&RequestRecord], total: usize);

    fn render_form(&mut self, form: &RequestForm);

    fn notify(&mut self, notice: Notice);
}

pub struct App<S: PresentationSink> {
    catalog: Arc<CatalogIndex>,
    requests: Arc<RequestLog>,
    submitter: RequestSubmitter,
    sink: S,
    query: String,
    genre: String,
    form: RequestForm,
    rendered_generation: Option<u64>,
    refresh: Option<RefreshHandle>,
}

impl<S: PresentationSink> App<S> {
    pub fn new(source: Arc<dyn TabularSource>, sink: S) -> Self {
        let catalog = Arc::new(CatalogIndex::new(Arc::clone(&source), CATALOG_RANGE));
        let requests = Arc::new(RequestLog::new(Arc::clone(&source), REQUESTS_RANGE));
        let submitter = RequestSubmitter::new(source, REQUESTS_RANGE, Arc::clone(&requests));

        Self {
            catalog,
            requests,
            submitter,
            sink,
            query: String::new(),
            genre: String::new(),
            form: RequestForm::default(),
            rendered_generation: None,
            refresh: None,
        }
    }

    /// Load both regions, draw the first frame and arm the periodic refresh.
    pub async fn start(&mut self) {
        let (catalog, requests) = futures::join!(self.catalog.load(), self.requests.load());
        if let Err(e) = catalog {
            error!(error = %e, "error loading songs; search stays empty");
        }
        if let Err(e) = requests {
            error!(error = %e, "error loading requests");
        }

        let snapshot = self.catalog.snapshot();
        self.sink.populate_genres(&snapshot.genres);
        self.render_results();
        self.render_requests();

        if self.refresh.is_none() {
            self.refresh = Some(self.requests.start_refresh_loop());
        }
        info!("app started");
    }

    /// Handle events until the channel closes, then stop the refresh loop.
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>) -> S {
        let mut applied = self.requests.subscribe();
        // Catch up on anything applied since `start`.
        self.render_requests();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                changed = applied.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.render_requests();
                }
            }
        }

        if let Some(refresh) = self.refresh.take() {
            refresh.stop().await;
        }
        info!("app stopped");
        self.sink
    }

    pub async fn handle(&mut self, event: UiEvent) {
        debug!(?event, "ui event");
        match event {
            UiEvent::SearchInput(query) => {
                self.query = query;
                self.render_results();
            }
            UiEvent::GenreSelected(genre) => {
                self.genre = genre;
                self.render_results();
            }
            UiEvent::TitleEdited(title) => {
                self.form.song_title = title;
                self.sink.render_form(&self.form);
            }
            UiEvent::NameEdited(name) => {
                self.form.requester_name = name;
                self.sink.render_form(&self.form);
            }
            UiEvent::CatalogRowClicked(id) => {
                let snapshot = self.catalog.snapshot();
                match snapshot.get(id) {
                    Some(song) => {
                        self.form.song_title = song.title.clone();
                        self.sink.render_form(&self.form);
                    }
                    None => warn!(id, "clicked row not in catalog"),
                }
            }
            UiEvent::FormSubmitted => self.submit().await,
        }
    }

    async fn submit(&mut self) {
        match self.submitter.submit(&mut self.form).await {
            Ok(()) => {
                self.sink.render_form(&self.form);
                self.render_requests();
                self.sink.notify(Notice::Submitted);
            }
            Err(Error::Validation { .. }) => self.sink.notify(Notice::InvalidForm),
            Err(_) => self.sink.notify(Notice::SubmitFailed),
        }
    }

    fn render_results(&mut self) {
        let snapshot = self.catalog.snapshot();
        let found = search(&snapshot.records, &self.query, &self.genre);
        self.sink.render_results(&found);
    }

    /// Draw the pending list unless this generation is already on screen.
    fn render_requests(&mut self) {
        let generation = self.requests.generation();
        if self.rendered_generation == Some(generation) {
            return;
        }
        let snapshot = self.requests.snapshot();
        let pending = snapshot.pending_sorted_by_recency_desc();
        self.sink.render_requests(&pending, snapshot.records.len());
        self.rendered_generation = Some(generation);
    }

    pub fn form(&self) -> &RequestForm {
        &self.form
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
