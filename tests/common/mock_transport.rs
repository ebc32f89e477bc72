/*!
 * Scripted HTTP transport for testing
 *
 * Responses are registered per URL fragment and served in order. The last
 * response of a route keeps being served once the others are used up, so a
 * single `on` call describes a provider that always answers the same way.
 * Every request is recorded to avoid any external calls going unnoticed.
 */

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use interlayer::errors::TransportError;
use interlayer::transport::{HttpRequest, HttpResponse, HttpTransport};

type Reply = Result<HttpResponse, TransportError>;

#[derive(Debug)]
struct Route {
    fragment: String,
    replies: VecDeque<Reply>,
}

/// Transport serving canned provider answers
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for URLs containing `fragment`
    pub fn on(self, fragment: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes.iter_mut().find(|r| r.fragment == fragment) {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    fragment: fragment.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    /// Queue a JSON reply with the given status
    pub fn on_json(self, fragment: &str, status: u16, body: &str) -> Self {
        self.on(fragment, Ok(HttpResponse::new(status, body)))
    }

    /// Every request sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose URL contains `fragment`
    pub fn calls_to(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    /// Total number of requests
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| url.contains(&r.fragment))
            .ok_or_else(|| TransportError::Connection(format!("no scripted route for {}", url)))?;

        if route.replies.len() > 1 {
            route.replies.pop_front().unwrap()
        } else {
            route.replies.front().cloned().unwrap()
        }
    }
}
