#![forbid(unsafe_code)]

use std::sync::Mutex;

use log::debug;
use poem::Request;
use poem_openapi::{payload::PlainText, OpenApi};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::utils::demo_utils;

// ***************************************************************************
//                                Constants
// ***************************************************************************
/// The names served by the name service, in their canonical order.
pub const NAMES: [&str; 13] = [
    "Jim", "Pam", "Michael", "Dwight", "Oscar", "Kevin", "Stanley",
    "Angela", "Kelly", "Meredith", "Ryan", "Toby", "Robert California",
];

// ***************************************************************************
//                               Index Sources
// ***************************************************************************
/// A source of uniformly distributed indexes.
pub trait IndexSource: Send + Sync {
    /// Return an index in `0..len`.  `len` is never zero.
    fn next_index(&self, len: usize) -> usize;
}

/// Unseeded randomness from the calling thread's generator.
pub struct ThreadRandom;

impl IndexSource for ThreadRandom {
    fn next_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// A reproducible sequence of indexes.
///
/// Not used by the services themselves.  It is public so that tests, in
/// this crate or downstream, can drive `NameApi` deterministically.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl IndexSource for SeededRandom {
    fn next_index(&self, len: usize) -> usize {
        // A poisoned lock still holds a usable generator.
        let mut rng = match self.rng.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(0..len)
    }
}

// ---------------------------------------------------------------------------
// pick_name:
// ---------------------------------------------------------------------------
pub fn pick_name(source: &dyn IndexSource) -> &'static str {
    NAMES[source.next_index(NAMES.len())]
}

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct NameApi {
    source: Box<dyn IndexSource>,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl NameApi {
    /// Return one name chosen at random.
    #[oai(path = "/", method = "get")]
    async fn get_name(&self, http_req: &Request) -> PlainText<String> {
        demo_utils::debug_request(http_req, "name");

        let name = pick_name(self.source.as_ref());
        debug!("Selected name: {}", name);
        PlainText(name.to_string())
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl NameApi {
    pub fn new() -> Self {
        Self::with_source(Box::new(ThreadRandom))
    }

    pub fn with_source(source: Box<dyn IndexSource>) -> Self {
        Self { source }
    }
}

impl Default for NameApi {
    fn default() -> Self {
        Self::new()
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::http::StatusCode;
    use poem::test::TestClient;
    use poem::Route;

    use crate::server::build_route;

    // Always returns the last index.
    struct Last;

    impl IndexSource for Last {
        fn next_index(&self, len: usize) -> usize {
            len - 1
        }
    }

    fn client(api: NameApi) -> TestClient<Route> {
        TestClient::new(build_route(api, "Names"))
    }

    #[test]
    fn names_are_fixed() {
        assert_eq!(NAMES.len(), 13);
        assert_eq!(NAMES[0], "Jim");
        assert_eq!(NAMES[12], "Robert California");
    }

    #[test]
    fn pick_uses_source_index() {
        assert_eq!(pick_name(&Last), "Robert California");
    }

    #[test]
    fn seeded_source_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let xs: Vec<&str> = (0..50).map(|_| pick_name(&a)).collect();
        let ys: Vec<&str> = (0..50).map(|_| pick_name(&b)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn thread_random_is_roughly_uniform() {
        // Expected count per name is ~769; the bounds are many standard
        // deviations wide so only systematic bias fails.
        let mut counts = [0usize; 13];
        for _ in 0..10_000 {
            counts[ThreadRandom.next_index(NAMES.len())] += 1;
        }
        for (i, c) in counts.iter().enumerate() {
            assert!(*c > 500 && *c < 1050, "{} picked {} times", NAMES[i], c);
        }
    }

    #[tokio::test]
    async fn get_root_returns_a_known_name() {
        let cli = client(NameApi::with_source(Box::new(SeededRandom::new(7))));
        for _ in 0..100 {
            let resp = cli.get("/").send().await;
            resp.assert_status_is_ok();
            let body = resp.0.into_body().into_string().await.unwrap();
            assert!(NAMES.contains(&body.as_str()), "unexpected name {}", body);
        }
    }

    #[tokio::test]
    async fn get_root_returns_source_choice() {
        let resp = client(NameApi::with_source(Box::new(Last))).get("/").send().await;
        resp.assert_status_is_ok();
        resp.assert_text("Robert California").await;
    }

    #[tokio::test]
    async fn every_name_appears_over_many_requests() {
        let cli = client(NameApi::new());
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            let body = cli.get("/").send().await.0.into_body().into_string().await.unwrap();
            seen.insert(body);
        }
        assert_eq!(seen.len(), NAMES.len());
    }

    #[tokio::test]
    async fn post_root_is_rejected() {
        let resp = client(NameApi::new()).post("/").send().await;
        resp.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }
}
