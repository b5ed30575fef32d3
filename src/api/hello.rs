#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{payload::PlainText, OpenApi};
use log::debug;
use std::env;

use crate::utils::demo_utils;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Set by the container runtime to the pod or container name.
pub const HOSTNAME_VAR: &str = "HOSTNAME";

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
/// Environment lookup used to resolve the host name on each request.
pub type EnvLookup = fn(&str) -> Option<String>;

pub struct HelloApi {
    env: EnvLookup,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl HelloApi {
    /// Greet the caller with this instance's host name.
    #[oai(path = "/", method = "get")]
    async fn hello(&self, http_req: &Request) -> PlainText<String> {
        demo_utils::debug_request(http_req, "greeting");

        // Read fresh every time; the value is never cached.
        let host = (self.env)(HOSTNAME_VAR);
        if host.is_none() {
            debug!("{} is not set, greeting with an empty host name.", HOSTNAME_VAR);
        }

        PlainText(greeting(host.as_deref()))
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl HelloApi {
    /// Resolve the host name from the process environment.
    pub fn new() -> Self {
        Self::with_env(process_env)
    }

    pub fn with_env(env: EnvLookup) -> Self {
        Self { env }
    }
}

impl Default for HelloApi {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// greeting:
// ---------------------------------------------------------------------------
/** Build the greeting body.  A missing host name renders as the empty string,
 * so the result is always "Hello, there. My name is <host>.".
 */
pub fn greeting(host: Option<&str>) -> String {
    format!("Hello, there. My name is {}.", host.unwrap_or_default())
}

// ***************************************************************************
//                          Private Functions
// ***************************************************************************
// Unset and non-unicode values are both treated as absent.
fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}
