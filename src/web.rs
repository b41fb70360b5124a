use crate::{
    ClientConfig, DocumentSurface, ExampleCatalog, HttpTransport, MemorySurface, ModelChoice,
    SubmissionController, SubmitOutcome, TransportError, show_random_example,
};
use axum::{
    Form, Json, Router,
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;

pub struct AppState {
    pub catalog: ExampleCatalog,
    pub controller: SubmissionController<HttpTransport>,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub client: ClientConfig,
    pub catalog: ExampleCatalog,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            client: ClientConfig::default(),
            catalog: ExampleCatalog::builtin(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let controller = SubmissionController::from_config(&config.client)?;
    info!(
        %config.addr,
        backend = %controller.transport().url(),
        policy = ?config.client.status_policy,
        "Binding HTTP listener"
    );
    let state = Arc::new(AppState {
        catalog: config.catalog,
        controller,
    });
    let router = build_router(state);
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home).post(submit))
        .route("/index", get(home))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "coref-demo-web" }))
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    let surface = example_surface(&state.catalog);
    Html(render_page(&surface, None))
}

fn example_surface(catalog: &ExampleCatalog) -> MemorySurface {
    let mut surface = MemorySurface::new("", ModelChoice::default().index(), true);
    let mut rng = SmallRng::from_entropy();
    if let Err(err) = show_random_example(&mut surface, catalog, &mut rng) {
        warn!(error = %err, "no example available for the form");
    }
    surface
}

#[derive(Debug, Deserialize)]
struct SubmitForm {
    #[serde(default)]
    document: String,
    #[serde(default)]
    model: usize,
    /// Checkboxes are only posted when checked.
    #[serde(rename = "automaticMentionDetection")]
    automatic_mention_detection: Option<String>,
}

impl SubmitForm {
    fn automatic(&self) -> bool {
        matches!(
            self.automatic_mention_detection.as_deref(),
            Some("true" | "on")
        )
    }
}

async fn submit(State(state): State<SharedState>, Form(form): Form<SubmitForm>) -> impl IntoResponse {
    let automatic = form.automatic();
    let mut surface = MemorySurface::new(form.document, form.model, automatic);
    let notice = match state.controller.handle_submit(&mut surface).await {
        Ok(SubmitOutcome::Skipped) => Some("Please enter a document before submitting."),
        Ok(SubmitOutcome::Rendered(_)) => None,
        Err(_) => Some("The coreference service could not be reached or sent an invalid reply."),
    };
    Html(render_page(&surface, notice))
}

fn render_page(surface: &MemorySurface, notice: Option<&str>) -> String {
    let options = ModelChoice::ALL
        .iter()
        .map(|choice| {
            let selected = if choice.index() == surface.selected_model() {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{index}"{selected}>{label}</option>"#,
                index = choice.index(),
                label = html_escape(choice.label()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n            ");
    let checked = if surface.automatic_mention_detection() {
        " checked"
    } else {
        ""
    };
    let notice = notice
        .map(|text| {
            format!(
                r#"<p id="notice" class="rounded bg-amber-100 px-3 py-2 text-amber-900">{}</p>"#,
                html_escape(text)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Coreference Resolution Demo</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="mx-auto max-w-4xl space-y-6 p-6">
      <h1 class="text-3xl font-semibold">Coreference resolution for Portuguese and Spanish</h1>
      {notice}
      <form id="doc-form" method="post" action="/" class="space-y-4">
        <textarea id="documentInput" name="document" rows="8" class="w-full rounded border p-3">{document}</textarea>
        <div class="flex flex-wrap items-center gap-4">
          <select id="modelSelection" name="model" class="rounded border p-2">
            {options}
          </select>
          <label class="flex items-center gap-2">
            <input id="automaticMentionDetection" type="checkbox" name="automaticMentionDetection" value="true"{checked} />
            Automatic mention detection
          </label>
          <button type="submit" class="rounded bg-slate-900 px-4 py-2 text-white">Resolve</button>
        </div>
      </form>
      <section class="grid gap-4 md:grid-cols-2">
        <label class="space-y-2">
          <span class="font-medium">Mentions</span>
          <textarea id="mentions" rows="14" readonly class="w-full rounded border p-3 font-mono text-sm">{mentions}</textarea>
        </label>
        <label class="space-y-2">
          <span class="font-medium">Clusters</span>
          <textarea id="clusters" rows="14" readonly class="w-full rounded border p-3 font-mono text-sm">{clusters}</textarea>
        </label>
      </section>
    </main>
  </body>
</html>"#,
        notice = notice,
        document = html_escape(&surface.document_text()),
        options = options,
        checked = checked,
        mentions = html_escape(&surface.mentions_output),
        clusters = html_escape(&surface.clusters_output),
    )
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use crate::Language;
    use axum::{
        body,
        body::Body,
        http::{Request, header},
        routing::post,
    };
    use tower::ServiceExt;

    fn test_router(base_url: &str, catalog: ExampleCatalog) -> Router {
        let client = ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        };
        let state = Arc::new(AppState {
            catalog,
            controller: SubmissionController::from_config(&client).unwrap(),
        });
        build_router(state)
    }

    fn single_example_catalog() -> ExampleCatalog {
        ExampleCatalog::from_entries([
            (Language::Portuguese, vec!["[O avião] & [a ONU]"]),
            (Language::Spanish, vec!["[O avião] & [a ONU]"]),
        ])
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form_request(body: &'static str) -> Request<Body> {
        Request::post("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn home_prefills_random_example() {
        let router = test_router("http://127.0.0.1:9/", single_example_catalog());
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let html = body_text(response).await;
        assert!(html.contains("[O avião] &amp; [a ONU]</textarea>"));
        assert!(html.contains(r#"id="automaticMentionDetection""#));
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let router = test_router("http://127.0.0.1:9/", ExampleCatalog::builtin());
        let response = router
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let payload: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload["status"], "ok");
    }

    #[tokio::test]
    async fn blank_submission_shows_notice() {
        let router = test_router("http://127.0.0.1:9/", ExampleCatalog::builtin());
        let response = router
            .oneshot(form_request("document=%20%20&model=1"))
            .await
            .unwrap();
        assert!(response.status().is_success());
        let html = body_text(response).await;
        assert!(html.contains(r#"id="notice""#));
        assert!(html.contains(r#"<option value="1" selected>Spanish</option>"#));
        assert!(!html.contains(" checked />"));
    }

    #[tokio::test]
    async fn submission_renders_backend_reply() {
        let backend = Router::new().route(
            "/api/clusters",
            post(|| async { r#"{"mentions": ["O avião", "se"], "clusters": [[0, 1]]}"# }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, backend).await.unwrap();
        });

        let router = test_router(&format!("http://{addr}/"), ExampleCatalog::builtin());
        let response = router
            .oneshot(form_request(
                "document=O+avi%C3%A3o+explodiu+e+se+incendiou&model=0&automaticMentionDetection=true",
            ))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("1: &quot;O avião&quot;;\n2: &quot;se&quot;</textarea>"));
        assert!(html.contains("1: &quot;O avião&quot;, &quot;se&quot;</textarea>"));
        assert!(html.contains(" checked />"));
        assert!(!html.contains(r#"id="notice""#));
    }

    #[tokio::test]
    async fn unreachable_backend_renders_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let router = test_router(&format!("http://{addr}/"), ExampleCatalog::builtin());
        let response = router
            .oneshot(form_request("document=texto&model=0"))
            .await
            .unwrap();
        assert!(response.status().is_success());
        let html = body_text(response).await;
        assert!(html.contains(r#"id="notice""#));
        assert!(html.contains(r#"readonly class="w-full rounded border p-3 font-mono text-sm">Error: "#));
    }

    #[test]
    fn html_escape_covers_markup() {
        assert_eq!(
            html_escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }
}
