use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use reqwest::Client as HttpClient;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::auth::redact_token;
use crate::config::Config;
use crate::events::{EventHub, SubscriptionId};
use crate::markers::{MarkerKind, MarkerManager};
use crate::parsers::npm::extract_dependencies;
use crate::parsers::{file_name_of, parse_manifest};
use crate::providers::hover::create_hover;
use crate::providers::inlay_hints::{create_inlay_hint, line_end};
use crate::registries::npm::NpmRegistry;
use crate::store::subscription::subscribe_to_dependencies;
use crate::store::{Action, FetchDispatcher, FileKey, Store};

pub struct NpmDescBackend {
    client: Client,
    /// Configuration
    config: RwLock<Config>,
    /// Latest text of each open manifest
    documents: DashMap<Url, String>,
    /// Marker subscription of each open manifest
    subscriptions: DashMap<FileKey, SubscriptionId>,
    store: Arc<Store>,
    hub: Arc<EventHub>,
    markers: Arc<MarkerManager>,
    /// Rebuilt when the registry URL changes
    dispatcher: RwLock<Arc<FetchDispatcher>>,
    http_client: Arc<HttpClient>,
    inlay_hints_supported: AtomicBool,
    inlay_refresh_supported: AtomicBool,
}

impl NpmDescBackend {
    /// Create a backend talking to `client`, with every registry request
    /// going through the shared `http_client`.
    pub fn new(client: Client, http_client: Arc<HttpClient>) -> Self {
        let config = Config::default();
        let store = Arc::new(Store::new());
        let hub = Arc::new(EventHub::new());
        subscribe_to_dependencies(&store, Arc::clone(&hub));

        let dispatcher = Self::build_dispatcher(&store, &http_client, &config);

        Self {
            client,
            markers: Arc::new(MarkerManager::new(MarkerKind::from_mouse_event(
                config.show_tooltip_with_mouse_event,
            ))),
            config: RwLock::new(config),
            documents: DashMap::new(),
            subscriptions: DashMap::new(),
            store,
            hub,
            dispatcher: RwLock::new(dispatcher),
            http_client,
            inlay_hints_supported: AtomicBool::new(true),
            inlay_refresh_supported: AtomicBool::new(false),
        }
    }

    fn build_dispatcher(
        store: &Arc<Store>,
        http_client: &Arc<HttpClient>,
        config: &Config,
    ) -> Arc<FetchDispatcher> {
        let registry = NpmRegistry::with_base_url(Arc::clone(http_client), &config.registry_url);
        Arc::new(FetchDispatcher::new(Arc::clone(store), Arc::new(registry)))
    }

    fn dispatcher(&self) -> Arc<FetchDispatcher> {
        match self.dispatcher.read() {
            Ok(dispatcher) => Arc::clone(&dispatcher),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn current_config(&self) -> Config {
        self.config
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn is_manifest(uri: &Url) -> bool {
        uri.path().ends_with("package.json")
    }

    fn apply_config(&self, config: Config) {
        let previous = self.current_config();
        tracing::info!(
            "Configuration: showTooltipWithMouseEvent={} showDelay={} hideTooltipOnOutsideClick={} registryUrl={} npmToken={}",
            config.show_tooltip_with_mouse_event,
            config.show_delay,
            config.hide_tooltip_on_outside_click,
            config.registry_url,
            config
                .auth_token()
                .map(|t| redact_token(&t))
                .unwrap_or_else(|| "none".to_string())
        );

        self.markers
            .set_kind(MarkerKind::from_mouse_event(config.show_tooltip_with_mouse_event));

        if previous.registry_url != config.registry_url {
            let dispatcher = Self::build_dispatcher(&self.store, &self.http_client, &config);
            if let Ok(mut current) = self.dispatcher.write() {
                *current = dispatcher;
            }
        }

        if let Ok(mut cfg) = self.config.write() {
            *cfg = config;
        }
    }

    /// Start tracking a manifest: file scope in the store and a marker
    /// subscription on the hub
    fn open_file(&self, file_key: &FileKey) {
        self.store.dispatch(Action::OpenFile {
            file_key: file_key.clone(),
        });
        if self.subscriptions.contains_key(file_key) {
            return;
        }
        match self.markers.attach(&self.hub, file_key.clone()) {
            Ok(id) => {
                self.subscriptions.insert(file_key.clone(), id);
            }
            Err(e) => tracing::warn!("No markers for {}: {}", file_key, e),
        }
    }

    fn close_file(&self, file_key: &FileKey) {
        self.subscriptions.remove(file_key);
        self.hub.unsubscribe_file(file_key);
        self.markers.clear(file_key);
        self.store.dispatch(Action::CloseFile {
            file_key: file_key.clone(),
        });
    }

    /// Parse a manifest, sync the store with its dependencies and wait for
    /// the resulting fetches.
    ///
    /// Parse failures are surfaced to the user only when `warn_on_error` is
    /// set, so that half-typed edits stay quiet.
    async fn process_document(&self, uri: &Url, content: &str, warn_on_error: bool) {
        let file_key = FileKey::from(uri);
        self.documents.insert(uri.clone(), content.to_string());

        let manifest = match parse_manifest(file_name_of(uri.path()), content) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", uri, e);
                if warn_on_error {
                    self.client
                        .show_message(MessageType::WARNING, e.user_message())
                        .await;
                }
                return;
            }
        };

        let extracted = extract_dependencies(&manifest, content);
        tracing::info!("Found {} dependencies in {}", extracted.len(), uri);

        let declared: Vec<(String, u32)> = extracted
            .iter()
            .map(|dep| (dep.name.clone(), dep.line))
            .collect();
        self.markers.retain(&file_key, &declared);

        let token = self.current_config().auth_token();
        let handles = self
            .dispatcher()
            .reconcile_file(&file_key, &extracted, token.as_deref());

        // failures are already recorded in the store and logged
        for handle in handles {
            let _ = handle.await;
        }

        if self.inlay_refresh_supported.load(Ordering::Relaxed)
            && let Err(e) = self.client.inlay_hint_refresh().await
        {
            tracing::debug!("Inlay hint refresh failed: {}", e);
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for NpmDescBackend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let inlay_hints_supported = params
            .capabilities
            .text_document
            .as_ref()
            .is_some_and(|td| td.inlay_hint.is_some());
        let refresh_supported = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|ws| ws.inlay_hint.as_ref())
            .and_then(|ih| ih.refresh_support)
            .unwrap_or(false);
        self.inlay_hints_supported
            .store(inlay_hints_supported, Ordering::Relaxed);
        self.inlay_refresh_supported
            .store(refresh_supported, Ordering::Relaxed);

        self.apply_config(Config::from_init_options(params.initialization_options));

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "npmdesc-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..Default::default()
                    },
                )),
                inlay_hint_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "npmdesc LSP initialized")
            .await;
        tracing::info!("npmdesc LSP initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("npmdesc LSP shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        if !Self::is_manifest(&uri) {
            return;
        }

        tracing::debug!("Document opened: {}", uri);
        self.open_file(&FileKey::from(&uri));
        self.process_document(&uri, &params.text_document.text, true)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if !Self::is_manifest(&uri) {
            return;
        }

        // With FULL sync, we get the entire document content
        if let Some(change) = params.content_changes.into_iter().next() {
            tracing::debug!("Document changed: {}", uri);
            self.process_document(&uri, &change.text, false).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if !Self::is_manifest(&uri) {
            return;
        }

        let text = params
            .text
            .or_else(|| self.documents.get(&uri).map(|doc| doc.value().clone()));
        if let Some(text) = text {
            tracing::debug!("Document saved: {}", uri);
            self.process_document(&uri, &text, true).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if !Self::is_manifest(&uri) {
            return;
        }

        tracing::debug!("Document closed: {}", uri);
        self.documents.remove(&uri);
        self.close_file(&FileKey::from(&uri));
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.apply_config(Config::from_settings(params.settings));
    }

    async fn inlay_hint(&self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>> {
        let uri = &params.text_document.uri;

        let Some(doc) = self.documents.get(uri) else {
            return Ok(Some(vec![]));
        };

        let hints: Vec<InlayHint> = self
            .markers
            .markers(&FileKey::from(uri))
            .iter()
            .filter(|marker| {
                marker.line >= params.range.start.line && marker.line <= params.range.end.line
            })
            .filter_map(|marker| create_inlay_hint(marker, line_end(doc.value(), marker.line)))
            .collect();

        tracing::debug!("Returning {} inlay hints for {}", hints.len(), uri);
        Ok(Some(hints))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let line = params.text_document_position_params.position.line;

        let Some(marker) = self.markers.marker_at(&FileKey::from(uri), line) else {
            return Ok(None);
        };

        let badges_visible = self.inlay_hints_supported.load(Ordering::Relaxed);
        if marker.kind == MarkerKind::Badge && badges_visible {
            return Ok(None);
        }

        let line_len = self
            .documents
            .get(uri)
            .map(|doc| line_end(doc.value(), line))
            .unwrap_or(0);
        Ok(Some(create_hover(&marker, line_len)))
    }
}
