use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use super::dispatch::{RenderContext, StepDispatcher, StepMethod, StepRequest, StepResponse};
use super::form::FormData;

const STEP_ID_PARAM: &str = ":step_id";

/// Turns a template name and its context into a response body.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &RenderContext) -> Response;
}

/// Emits `{"template": ..., "context": ...}` for a front end to render.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct RenderedStep<'a> {
    template: &'a str,
    context: &'a RenderContext,
}

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: &RenderContext) -> Response {
        (StatusCode::OK, Json(RenderedStep { template, context })).into_response()
    }
}

/// Named route patterns, reversible into paths.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
        self.routes.insert(name.into(), pattern.into());
    }

    pub fn pattern(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(String::as_str)
    }

    pub fn reverse(&self, name: &str, step_id: &str) -> Result<String, RouteError> {
        let pattern = self
            .routes
            .get(name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?;
        Ok(pattern.replace(STEP_ID_PARAM, step_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no route named {0}")]
    UnknownRoute(String),
}

/// A wizard served under a path prefix, with routes named `<namespace>:index` and `<namespace>:step`.
pub struct WizardMount {
    namespace: String,
    prefix: String,
    dispatcher: Arc<StepDispatcher>,
    renderer: Arc<dyn Renderer>,
}

impl WizardMount {
    pub fn new(
        namespace: impl Into<String>,
        prefix: impl Into<String>,
        dispatcher: Arc<StepDispatcher>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            prefix: prefix.into().trim_end_matches('/').to_string(),
            dispatcher,
            renderer: Arc::new(JsonRenderer),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn index_route(&self) -> String {
        format!("{}:index", self.namespace)
    }

    pub fn step_route(&self) -> String {
        format!("{}:step", self.namespace)
    }

    fn route_table(&self) -> RouteTable {
        let mut routes = RouteTable::new();
        routes.insert(self.index_route(), format!("{}/", self.prefix));
        routes.insert(
            self.step_route(),
            format!("{}/{STEP_ID_PARAM}/", self.prefix),
        );
        routes
    }
}

pub(crate) struct WizardState {
    dispatcher: Arc<StepDispatcher>,
    renderer: Arc<dyn Renderer>,
    routes: RouteTable,
    step_route: String,
}

impl WizardState {
    fn redirect(&self, route: &str, step_id: &str) -> Response {
        match self.routes.reverse(route, step_id) {
            Ok(location) => {
                debug!(%route, %step_id, %location, "redirecting");
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            Err(err) => {
                error!(%err, "unable to build wizard redirect");
                internal_error(err.to_string())
            }
        }
    }
}

/// Router exposing the index redirect and the generic step route for one wizard.
pub fn wizard_router(mount: WizardMount) -> Router {
    let routes = mount.route_table();
    let step_route = mount.step_route();
    let index_path = routes
        .pattern(&mount.index_route())
        .map(str::to_string)
        .unwrap_or_else(|| "/".to_string());
    let step_path = routes
        .pattern(&step_route)
        .map(str::to_string)
        .unwrap_or_else(|| format!("/{STEP_ID_PARAM}/"));

    let state = Arc::new(WizardState {
        dispatcher: mount.dispatcher,
        renderer: mount.renderer,
        routes,
        step_route,
    });

    let mut router = Router::new()
        .route(&index_path, get(index_handler))
        .route(&step_path, get(step_handler).post(step_handler))
        .route(step_path.trim_end_matches('/'), get(append_slash));
    if let Some(bare_index) = index_path.strip_suffix('/').filter(|path| !path.is_empty()) {
        router = router.route(bare_index, get(append_slash));
    }

    router.with_state(state)
}

/// Sends slashless wizard paths to their canonical form, keeping the query string.
pub(crate) async fn append_slash(uri: Uri) -> Response {
    let location = match uri.query() {
        Some(query) => format!("{}/?{query}", uri.path()),
        None => format!("{}/", uri.path()),
    };
    debug!(%location, "appending slash");
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

pub(crate) async fn index_handler(State(state): State<Arc<WizardState>>) -> Response {
    let start_step = state.dispatcher.wizard().start_step();
    state.redirect(&state.step_route, start_step.id())
}

pub(crate) async fn step_handler(
    State(state): State<Arc<WizardState>>,
    Path(step_id): Path<String>,
    method: Method,
    form: Option<Form<FormData>>,
) -> Response {
    let method = if method == Method::POST {
        StepMethod::Post(form.map(|Form(data)| data).unwrap_or_default())
    } else if method == Method::GET {
        StepMethod::Get
    } else {
        StepMethod::Other(method.to_string())
    };

    match state
        .dispatcher
        .dispatch(&state.step_route, StepRequest { step_id, method })
    {
        Ok(StepResponse::Render { template, context }) => {
            state.renderer.render(&template, &context)
        }
        Ok(StepResponse::Redirect { route, step_id }) => state.redirect(&route, &step_id),
        Err(err) => {
            error!(%err, "wizard step failed");
            internal_error(err.to_string())
        }
    }
}

fn internal_error(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_substitutes_step_id() {
        let mut routes = RouteTable::new();
        routes.insert("record:step", "/record/:step_id/");
        assert_eq!(
            routes.reverse("record:step", "awaiting-images"),
            Ok("/record/awaiting-images/".to_string())
        );
    }

    #[test]
    fn reverse_rejects_unknown_route_names() {
        let routes = RouteTable::new();
        assert_eq!(
            routes.reverse("record:step", "start"),
            Err(RouteError::UnknownRoute("record:step".to_string()))
        );
    }

    #[test]
    fn mount_names_routes_after_namespace() {
        let wizard = crate::wizard::WizardBlueprint::new()
            .terminal(crate::wizard::TerminalStep::new("only", "Only"))
            .build("only")
            .expect("wizard builds");
        let mount = WizardMount::new(
            "record",
            "/record/",
            Arc::new(StepDispatcher::new(Arc::new(wizard))),
        );

        let routes = mount.route_table();
        assert_eq!(mount.index_route(), "record:index");
        assert_eq!(routes.pattern("record:index"), Some("/record/"));
        assert_eq!(routes.pattern("record:step"), Some("/record/:step_id/"));
    }
}
