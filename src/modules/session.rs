use crate::modules::api::GatewayClient;
use crate::modules::error::{ConsoleError, Notice, Severity};
use crate::modules::form::{ConfigForm, FieldId, ProviderEntry, Visibility};
use crate::modules::modal::PgnModal;
use crate::modules::stats::{STATS_BACKLOG, StatsEvent, StatsTable, stream_stats};
use crate::modules::types::{ConfigPayload, InstallRequest, PgnDescriptor};
use log::{debug, error, info, warn};
use std::future::Future;
use tokio::sync::mpsc::{self, Receiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything the console shows: the form and its visible groups, the live
/// stats table, the metadata dialog and pending notices.
#[derive(Debug, Clone, Default)]
pub struct ConsoleView {
    pub form: ConfigForm,
    visibility: Visibility,
    pub stats: StatsTable,
    pub modal: PgnModal,
    pub notices: Vec<Notice>,
    stats_connected: bool,
}

impl ConsoleView {
    /// Initial render: a preselected interface type is honored right away.
    pub fn new(form: ConfigForm) -> Self {
        let mut view = Self {
            form,
            ..Self::default()
        };
        view.refresh_visibility();
        view
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn refresh_visibility(&mut self) {
        self.visibility = Visibility::for_interface(self.form.interface_type());
    }

    /// Writes a control. Changing the interface type re-evaluates the
    /// dependent groups.
    pub fn set_field(&mut self, field: FieldId, value: &str) -> Result<(), String> {
        self.form.set(field, value)?;
        if field == FieldId::InterfaceType {
            self.refresh_visibility();
        }
        Ok(())
    }

    pub fn stats_connected(&self) -> bool {
        self.stats_connected
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

/// Owns the view, the gateway client and the stats socket task. Every
/// handler is a method here; nothing else mutates the view.
pub struct ConsoleSession {
    client: GatewayClient,
    view: ConsoleView,
    stats_url: Url,
    token: CancellationToken,
    stats_events: Option<Receiver<StatsEvent>>,
    stats_task: Option<JoinHandle<()>>,
}

impl ConsoleSession {
    pub fn new(client: GatewayClient, stats_url: Url, form: ConfigForm) -> Self {
        Self {
            client,
            view: ConsoleView::new(form),
            stats_url,
            token: CancellationToken::new(),
            stats_events: None,
            stats_task: None,
        }
    }

    pub fn view(&self) -> &ConsoleView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ConsoleView {
        &mut self.view
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Opens the one stats socket of this session.
    pub fn open_stats(&mut self) -> Result<(), ConsoleError> {
        if self.stats_task.is_some() {
            return Err(ConsoleError::fatal("stats socket already open"));
        }
        if self.token.is_cancelled() {
            return Err(ConsoleError::fatal("session is shut down"));
        }
        let (tx, rx) = mpsc::channel(STATS_BACKLOG);
        let url = self.stats_url.clone();
        let token = self.token.child_token();
        self.stats_task = Some(tokio::spawn(stream_stats(url, token, tx)));
        self.stats_events = Some(rx);
        self.view.stats_connected = true;
        Ok(())
    }

    /// Waits for the next socket event and applies it to the view.
    /// `false` once the socket is gone.
    pub async fn next_stats_event(&mut self) -> bool {
        let Some(events) = self.stats_events.as_mut() else {
            return false;
        };
        let event = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            event = events.recv() => event,
        };
        match event {
            Some(StatsEvent::Snapshot(snapshot)) => {
                debug!("Rendering {} stats rows", snapshot.rows.len());
                self.view.stats.render(snapshot);
                true
            }
            Some(StatsEvent::Failed(err)) => {
                self.record(err);
                true
            }
            Some(StatsEvent::Closed) | None => {
                self.view.stats_connected = false;
                self.stats_events = None;
                false
            }
        }
    }

    pub fn change_interface_type(&mut self, value: &str) -> Visibility {
        self.view.form.provider.interface_type = value.to_string();
        self.view.refresh_visibility();
        debug!("Interface type `{value}` -> {:?}", self.view.visibility);
        self.view.visibility
    }

    /// Fetches a fresh identifier and fills the five segment inputs.
    pub async fn generate_uuid(&mut self) -> Result<Option<String>, ConsoleError> {
        let client = self.client.clone();
        let result = self.guarded(async move { client.generate_uuid().await }).await;
        let Some(segments) = self.settle(result)? else {
            return Ok(None);
        };
        if let Err(e) = self.view.form.fill_uuid(&segments) {
            self.record(ConsoleError::malformed(e));
            return Ok(None);
        }
        let joined = self.view.form.joined_uuid();
        info!("Generated identifier {joined}");
        Ok(Some(joined))
    }

    /// Looks up metadata for a stats key and opens the dialog with it.
    pub async fn show_pgn(&mut self, key: &str) -> Result<Option<PgnDescriptor>, ConsoleError> {
        let client = self.client.clone();
        let owned = key.to_string();
        let result = self
            .guarded(async move { client.fetch_descriptor(&owned).await })
            .await;
        let Some(descriptor) = self.settle(result)? else {
            return Ok(None);
        };
        self.view.modal.show(&descriptor);
        Ok(Some(descriptor))
    }

    /// Click on the key of a rendered stats row.
    pub async fn click_stats_row(
        &mut self,
        index: usize,
    ) -> Result<Option<PgnDescriptor>, ConsoleError> {
        let key = self
            .view
            .stats
            .row(index)
            .map(|row| row.key.clone())
            .ok_or_else(|| ConsoleError::fatal(format!("no stats row {index} is rendered")))?;
        self.show_pgn(&key).await
    }

    pub fn add_provider(&mut self) -> Option<ProviderEntry> {
        let added = self.view.form.add_provider().cloned();
        match added {
            Some(entry) => {
                info!("Added provider {entry}");
                Some(entry)
            }
            None => {
                let kind = self.view.form.provider.interface_type.clone();
                warn!("Cannot add provider of type `{kind}`");
                self.view
                    .notices
                    .push(Notice::input(format!("unknown interface type `{kind}`")));
                None
            }
        }
    }

    pub fn payload(&self) -> ConfigPayload {
        self.view.form.to_payload()
    }

    /// Posts the whole form to the gateway. Returns the response body.
    pub async fn submit(&mut self) -> Result<Option<String>, ConsoleError> {
        let client = self.client.clone();
        let payload = self.payload();
        let result = self
            .guarded(async move { client.submit_config(&payload).await })
            .await;
        self.settle(result)
    }

    pub async fn install_app(
        &mut self,
        package: &str,
        version: &str,
    ) -> Result<Option<()>, ConsoleError> {
        let client = self.client.clone();
        let request = InstallRequest {
            package: package.to_string(),
            version: version.to_string(),
        };
        let result = self
            .guarded(async move { client.install_app(&request).await })
            .await;
        self.settle(result)
    }

    /// Cancels the session token, closing the stats socket and abandoning
    /// any request still in flight.
    pub async fn shutdown(&mut self) {
        self.token.cancel();
        if let Some(task) = self.stats_task.take() {
            if let Err(e) = task.await {
                error!("Stats task ended abnormally: {e}");
            }
        }
        self.stats_events = None;
        self.view.stats_connected = false;
    }

    async fn guarded<T>(
        &self,
        request: impl Future<Output = Result<T, ConsoleError>>,
    ) -> Result<T, ConsoleError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ConsoleError::Cancelled),
            result = request => result,
        }
    }

    /// Turns recoverable failures into notices. Fatal errors go back to
    /// the caller.
    fn settle<T>(&mut self, result: Result<T, ConsoleError>) -> Result<Option<T>, ConsoleError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.severity() == Severity::Fatal => Err(err),
            Err(err) => {
                self.record(err);
                Ok(None)
            }
        }
    }

    fn record(&mut self, err: ConsoleError) {
        match Notice::from_error(&err) {
            Some(notice) => {
                warn!("{notice}");
                self.view.notices.push(notice);
            }
            None => debug!("{err}"),
        }
    }
}

impl Drop for ConsoleSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
