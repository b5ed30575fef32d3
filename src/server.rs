#![forbid(unsafe_code)]

use anyhow::Result;
use log::{error, info};
use poem::listener::{Acceptor, Listener, TcpAcceptor, TcpListener};
use poem::{Route, Server};
use poem_openapi::{OpenApi, OpenApiService};

use crate::api::hello::HelloApi;
use crate::api::name::NameApi;
use crate::utils::config::RuntimeCtx;
use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// From cargo.toml.
const DEMO_VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

// ***************************************************************************
//                                ServiceKind
// ***************************************************************************
/// Which of the two demo services a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// Replies with a greeting naming the host.
    Greeting,
    /// Replies with a random name.
    Name,
}

impl ServiceKind {
    pub fn default_title(&self) -> &'static str {
        match self {
            ServiceKind::Greeting => "Kube Demo",
            ServiceKind::Name     => "Kube Service Demo",
        }
    }

    /// The executable name, also used for poem logging and config file names.
    pub fn binary_name(&self) -> &'static str {
        match self {
            ServiceKind::Greeting => "kube_demo",
            ServiceKind::Name     => "kube_service_demo",
        }
    }
}

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// build_route:
// ---------------------------------------------------------------------------
/** Mount a single API at the root path.  Nothing else is routed. */
pub fn build_route<T: OpenApi + 'static>(api: T, title: &str) -> Route {
    let api_service = OpenApiService::new(api, title, DEMO_VERSION.unwrap_or("unknown"));
    Route::new().nest("/", api_service)
}

// ---------------------------------------------------------------------------
// build_app:
// ---------------------------------------------------------------------------
pub fn build_app(service: ServiceKind, title: &str) -> Route {
    match service {
        ServiceKind::Greeting => build_route(HelloApi::new(), title),
        ServiceKind::Name     => build_route(NameApi::new(), title),
    }
}

// ---------------------------------------------------------------------------
// bind:
// ---------------------------------------------------------------------------
/** Bind the listening socket.  Binding eagerly lets callers learn the actual
 * address (port 0 picks a free port) before the server starts.
 */
pub async fn bind(addr: &str) -> Result<TcpAcceptor> {
    match TcpListener::bind(addr.to_string()).into_acceptor().await {
        Ok(acceptor) => Ok(acceptor),
        Err(e) => {
            let err = Errors::PortBind(addr.to_string(), e.to_string());
            error!("{}", err);
            Err(err.into())
        }
    }
}

// ---------------------------------------------------------------------------
// serve:
// ---------------------------------------------------------------------------
/** Serve requests until the process is terminated. */
pub async fn serve(acceptor: TcpAcceptor, service: ServiceKind, app: Route) -> Result<()> {
    for addr in acceptor.local_addr() {
        info!("{} listening on {:?}", service.binary_name(), addr);
    }

    Server::new_with_acceptor(acceptor)
        .name(service.binary_name())
        .run(app)
        .await
        .map_err(Errors::IOError)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// run:
// ---------------------------------------------------------------------------
pub async fn run(ctx: &RuntimeCtx) -> Result<()> {
    let acceptor = bind(&ctx.bind_addr()).await?;
    let app = build_app(ctx.service, &ctx.parms.config.title);
    serve(acceptor, ctx.service, app).await
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
pub fn print_version_info(service: ServiceKind) {
    info!("*** Running {}={}", service.binary_name(), DEMO_VERSION.unwrap_or("unknown"));
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::test::TestClient;

    #[test]
    fn service_names() {
        assert_eq!(ServiceKind::Greeting.binary_name(), "kube_demo");
        assert_eq!(ServiceKind::Name.binary_name(), "kube_service_demo");
        assert_ne!(ServiceKind::Greeting.default_title(), ServiceKind::Name.default_title());
    }

    #[tokio::test]
    async fn name_app_serves_root() {
        let cli = TestClient::new(build_app(ServiceKind::Name, "Names"));
        cli.get("/").send().await.assert_status_is_ok();
    }

    #[tokio::test]
    async fn greeting_app_serves_root() {
        let resp = TestClient::new(build_app(ServiceKind::Greeting, "Greeting")).get("/").send().await;
        resp.assert_status_is_ok();
        let body = resp.0.into_body().into_string().await.unwrap();
        assert!(body.starts_with("Hello, there. My name is "));
        assert!(body.ends_with('.'));
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let err = match bind("not-an-address").await {
            Ok(_) => panic!("bound to an invalid address"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("not-an-address"));
    }
}
