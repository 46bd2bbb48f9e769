mod convert;

use dashmap::DashMap;
use pasc_syntax::{CompilerError, SourceText};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info};

use crate::convert::{LEGEND, range_of, semantic_tokens};

#[derive(Debug)]
struct Backend {
    client: Client,
    documents: DashMap<Url, String>,
}

impl Backend {
    fn new(client: Client) -> Self {
        Backend {
            client,
            documents: DashMap::new(),
        }
    }

    /// Stores `text` as the latest version of `uri` and republishes its
    /// diagnostics.
    async fn on_change(&self, uri: Url, text: String, version: Option<i32>) {
        let diagnostics = diagnostics(&text);
        debug!(%uri, count = diagnostics.len(), "publishing diagnostics");
        self.documents.insert(uri.clone(), text);
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_owned(),
                version: Some(env!("CARGO_PKG_VERSION").to_owned()),
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
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            work_done_progress_options: Default::default(),
                            legend: SemanticTokensLegend {
                                token_types: LEGEND.to_vec(),
                                token_modifiers: vec![],
                            },
                            range: None,
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                        },
                    ),
                ),
                ..ServerCapabilities::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("server initialized");
        self.client
            .log_message(MessageType::INFO, "pasc-analyzer initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.on_change(doc.uri, doc.text, Some(doc.version)).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change holds the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            let doc = params.text_document;
            self.on_change(doc.uri, change.text, Some(doc.version)).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(text) = params.text {
            self.on_change(params.text_document.uri, text, None).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;
        let Some(text) = self.documents.get(&uri) else {
            return Ok(None);
        };
        let data = semantic_tokens(&text);
        debug!(%uri, tokens = data.len(), "semantic tokens");
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data,
        })))
    }
}

/// Every diagnostic for `source`, lexical ones first.
fn diagnostics(source: &str) -> Vec<Diagnostic> {
    let failure = match pasc_syntax::compile(source) {
        Ok(_) => return Vec::new(),
        Err(failure) => failure,
    };
    let text = SourceText::new(source);
    failure
        .all()
        .into_iter()
        .map(|diagnostic| to_lsp(&text, &diagnostic.error))
        .collect()
}

fn to_lsp(text: &SourceText, error: &CompilerError) -> Diagnostic {
    let span = error.span();
    Diagnostic {
        range: range_of(text, span.offset(), span.len()),
        severity: Some(DiagnosticSeverity::ERROR),
        code: Some(NumberOrString::String(format!("{:?}", error.code()))),
        source: Some("pasc".to_owned()),
        message: error.to_string(),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let (stdin, stdout) = (tokio::io::stdin(), tokio::io::stdout());
    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_source_has_no_diagnostics() {
        assert!(diagnostics("program p; var x: integer; begin x := 1 end.").is_empty());
    }

    #[test]
    fn diagnostics_point_at_the_error() {
        let source = "program p;\nvar x: integer;\nbegin\n  x := 'a'\nend.";
        let found = diagnostics(source);
        assert_eq!(found.len(), 1);
        let diagnostic = &found[0];
        assert_eq!(diagnostic.range.start, Position::new(3, 7));
        assert_eq!(diagnostic.range.end, Position::new(3, 10));
        assert_eq!(
            diagnostic.code,
            Some(NumberOrString::String("TypeError".to_owned()))
        );
    }

    #[test]
    fn lexical_and_fatal_errors_are_both_published() {
        let found = diagnostics("program p; begin writeln(1 ?) ; x := 1 end.");
        let codes: Vec<_> = found.iter().filter_map(|d| d.code.clone()).collect();
        assert_eq!(
            codes,
            vec![
                NumberOrString::String("LexicalError".to_owned()),
                NumberOrString::String("UndefinedIdentifier".to_owned()),
            ]
        );
    }
}
