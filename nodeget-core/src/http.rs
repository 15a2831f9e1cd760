//! Single-request HTTP plumbing
//!
//! Redirects are followed by hand rather than by the client so that every
//! hop is logged, relative `Location` headers are resolved against the URL
//! that produced them, and the chain length is capped.

use log::debug;
use reqwest::header::LOCATION;
use reqwest::Url;
use std::io::Read;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Status line, redirect target and streaming body of one response
pub struct HttpResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: Box<dyn Read>,
}

/// Issues a single GET without following redirects
pub trait Transport {
    fn get(&self, url: &Url) -> Result<HttpResponse, FetchError>;
}

/// Blocking reqwest client with automatic redirects disabled
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| FetchError::network(&config.listing_url, e))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(HttpResponse {
            status: response.status().as_u16(),
            location,
            body: Box::new(response),
        })
    }
}

/// Where a single response leaves the request
pub enum Hop {
    Redirect(Url),
    Success(HttpResponse),
    Failure(FetchError),
}

/// Classify a response received for `url`
pub fn classify(response: HttpResponse, url: &Url) -> Hop {
    let status = response.status;
    if status == 200 {
        return Hop::Success(response);
    }

    if (300..=399).contains(&status) {
        if let Some(location) = response.location.as_deref() {
            return match url.join(location) {
                Ok(next) => Hop::Redirect(next),
                Err(e) => Hop::Failure(FetchError::InvalidUrl {
                    url: location.to_string(),
                    message: e.to_string(),
                }),
            };
        }
    }

    Hop::Failure(FetchError::Upstream {
        status,
        url: url.to_string(),
    })
}

/// GET `url`, following at most `max_redirects` redirects
///
/// Returns the final URL together with its 200 response.
pub fn get_following_redirects(
    transport: &dyn Transport,
    url: &Url,
    max_redirects: u32,
) -> Result<(Url, HttpResponse), FetchError> {
    let mut current = url.clone();
    let mut hops = 0;

    loop {
        debug!("GET {}", current);
        let response = transport.get(&current)?;

        match classify(response, &current) {
            Hop::Success(response) => return Ok((current, response)),
            Hop::Failure(err) => return Err(err),
            Hop::Redirect(next) => {
                if hops >= max_redirects {
                    return Err(FetchError::TooManyRedirects {
                        url: url.to_string(),
                        hops,
                    });
                }
                hops += 1;
                debug!("Redirect {} -> {}", current, next);
                current = next;
            }
        }
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use std::io::Read;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_relative_redirect_resolves_against_previous_url() {
        let transport = ScriptedTransport::new()
            .redirect("../latest-v20.x/")
            .redirect("/dist/final/")
            .ok(b"listing");

        let (final_url, mut response) =
            get_following_redirects(&transport, &url("https://host.test/dist/latest/"), 5).unwrap();

        assert_eq!(final_url.as_str(), "https://host.test/dist/final/");
        assert_eq!(
            transport.requests(),
            vec![
                "https://host.test/dist/latest/",
                "https://host.test/dist/latest-v20.x/",
                "https://host.test/dist/final/",
            ]
        );

        let mut body = String::new();
        response.body.read_to_string(&mut body).unwrap();
        assert_eq!(body, "listing");
    }

    #[test]
    fn test_absolute_redirect_switches_host() {
        let transport = ScriptedTransport::new()
            .redirect("https://mirror.test/dist/")
            .ok(b"");

        let (final_url, _) =
            get_following_redirects(&transport, &url("https://host.test/dist/"), 5).unwrap();
        assert_eq!(final_url.as_str(), "https://mirror.test/dist/");
    }

    #[test]
    fn test_redirect_chain_at_limit_succeeds() {
        let mut transport = ScriptedTransport::new();
        for i in 0..5 {
            transport = transport.redirect(&format!("/hop{}", i));
        }
        let transport = transport.ok(b"done");

        assert!(get_following_redirects(&transport, &url("https://host.test/"), 5).is_ok());
        assert_eq!(transport.calls(), 6);
    }

    #[test]
    fn test_endless_redirects_fail() {
        let mut transport = ScriptedTransport::new();
        for _ in 0..20 {
            transport = transport.redirect("/again");
        }

        let err = get_following_redirects(&transport, &url("https://host.test/"), 5)
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::TooManyRedirects { hops: 5, .. }));
        assert_eq!(transport.calls(), 6);
    }

    #[test]
    fn test_non_success_status_is_upstream_error() {
        let transport = ScriptedTransport::new().status(404);
        let err = get_following_redirects(&transport, &url("https://host.test/x"), 5)
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::Upstream { status: 404, .. }));

        // 204 is a success class but carries no artifact
        let transport = ScriptedTransport::new().status(204);
        let err = get_following_redirects(&transport, &url("https://host.test/x"), 5)
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::Upstream { status: 204, .. }));
    }

    #[test]
    fn test_redirect_without_location_is_upstream_error() {
        let transport = ScriptedTransport::new().status(302);
        let err = get_following_redirects(&transport, &url("https://host.test/x"), 5)
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::Upstream { status: 302, .. }));
    }

    #[test]
    fn test_transport_error_propagates() {
        let transport = ScriptedTransport::new().network_error("connection refused");
        let err = get_following_redirects(&transport, &url("https://host.test/x"), 5)
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[test]
    fn test_parse_url_rejects_garbage() {
        assert!(parse_url("https://nodejs.org/dist/").is_ok());
        assert!(matches!(
            parse_url("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
