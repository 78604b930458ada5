//! Cache-Header Middleware
//!
//! Sets client-side caching headers on every response. These are advisory
//! only: they tell browsers and proxies how long a response may be reused,
//! which is mostly useful for far-future caching of static assets.
//!
//! Behaviour follows RFC 2616 and <https://www.mnot.net/cache_docs/#CACHE-CONTROL>:
//! - `Cache-Control: public, must-revalidate, max-age=<seconds>` on every response
//! - `Expires: <now + max-age>` for HTTP/1.0 clients, which ignore `Cache-Control`
//! - any `Pragma` header is removed
//!
//! The wrapped service owns its response. A `Cache-Control` or `Expires` it
//! already set is left alone, and when it set its own `Cache-Control` its
//! `Pragma` is kept too, so a `no-store` route stays uncacheable.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, Request, Response, Version};
use chrono::Utc;
use tower::{Layer, Service};
use tracing::debug;

use super::http_date::{expires_at, format_http_date};

// == Public Constants ==
/// Max-age used when none is configured (one week).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(604_800);

const CACHE_CONTROL_PREFIX: &str = "public, must-revalidate, max-age=";

// == Cache Options ==
/// Configuration for the cache-header middleware.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use station::CacheOptions;
///
/// let opts = CacheOptions::new().max_age(Duration::from_secs(3600));
/// assert_eq!(opts.max_age, Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// How long clients may cache responses. Zero selects [`DEFAULT_MAX_AGE`].
    pub max_age: Duration,
    /// Reserved. The emitted header always carries `must-revalidate`, so this
    /// flag does not change the output.
    pub must_revalidate: bool,
}

impl CacheOptions {
    /// Creates options with every setting at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the advertised cache lifetime.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Sets the advertised cache lifetime in whole seconds.
    pub fn max_age_secs(self, secs: u64) -> Self {
        self.max_age(Duration::from_secs(secs))
    }

    /// Sets the (currently inert) must-revalidate flag.
    pub fn must_revalidate(mut self, must_revalidate: bool) -> Self {
        self.must_revalidate = must_revalidate;
        self
    }
}

// == Cache Policy ==
/// Resolved, immutable form of [`CacheOptions`] shared by every request.
#[derive(Debug)]
struct CachePolicy {
    max_age: Duration,
    cache_control: HeaderValue,
}

impl CachePolicy {
    fn from_options(opts: CacheOptions) -> Self {
        let max_age = if opts.max_age.is_zero() {
            DEFAULT_MAX_AGE
        } else {
            opts.max_age
        };

        if opts.must_revalidate {
            debug!("must_revalidate has no effect; must-revalidate is always advertised");
        }

        Self {
            max_age,
            cache_control: ascii_header(cache_control_value(max_age)),
        }
    }

    /// Fills in the caching headers the response does not already carry.
    fn apply(&self, headers: &mut HeaderMap, version: Version) {
        let inner_owns_caching = headers.contains_key(header::CACHE_CONTROL);
        if !inner_owns_caching {
            headers.insert(header::CACHE_CONTROL, self.cache_control.clone());
            headers.remove(header::PRAGMA);
        }

        if is_legacy_http(version) {
            headers.entry(header::EXPIRES).or_insert_with(|| {
                ascii_header(format_http_date(expires_at(Utc::now(), self.max_age)))
            });
        }
    }
}

/// Builds the `Cache-Control` value for a max-age, rounded to whole seconds.
pub fn cache_control_value(max_age: Duration) -> String {
    let round_up = u64::from(max_age.subsec_nanos() >= 500_000_000);
    let secs = max_age.as_secs().saturating_add(round_up);
    format!("{CACHE_CONTROL_PREFIX}{secs}")
}

/// HTTP/1.0 clients only understand `Expires`.
fn is_legacy_http(version: Version) -> bool {
    version == Version::HTTP_10
}

fn ascii_header(value: String) -> HeaderValue {
    HeaderValue::try_from(value).expect("formatted cache header is visible ASCII")
}

// == Layer ==
/// Tower layer that wraps a service in [`Cache`].
#[derive(Debug, Clone)]
pub struct CacheLayer {
    policy: Arc<CachePolicy>,
}

impl CacheLayer {
    /// Creates a layer, substituting [`DEFAULT_MAX_AGE`] for an unset max-age.
    pub fn new(opts: CacheOptions) -> Self {
        let policy = CachePolicy::from_options(opts);
        debug!(max_age = policy.max_age.as_secs(), "Cache header middleware configured");
        Self {
            policy: Arc::new(policy),
        }
    }

    /// The max-age advertised by this layer after default substitution.
    pub fn max_age(&self) -> Duration {
        self.policy.max_age
    }
}

impl<S> Layer<S> for CacheLayer {
    type Service = Cache<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Cache {
            inner,
            policy: Arc::clone(&self.policy),
        }
    }
}

/// Provides middleware for setting client-side caching headers.
///
/// Shorthand for [`CacheLayer::new`].
pub fn cache(opts: CacheOptions) -> CacheLayer {
    CacheLayer::new(opts)
}

// == Service ==
/// Service that sets caching headers on the responses of `S`.
#[derive(Debug, Clone)]
pub struct Cache<S> {
    inner: S,
    policy: Arc<CachePolicy>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Cache<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let version = req.version();
        let policy = Arc::clone(&self.policy);
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            // Headers are fixed here, before the server polls the body.
            policy.apply(response.headers_mut(), version);
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use chrono::DateTime;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    async fn empty_handler(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
        Ok(Response::new(Body::empty()))
    }

    async fn pragma_handler(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let mut resp = Response::new(Body::empty());
        resp.headers_mut()
            .insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        Ok(resp)
    }

    async fn no_store_handler(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let mut resp = Response::new(Body::empty());
        let headers = resp.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        Ok(resp)
    }

    fn request(version: Version) -> Request<Body> {
        Request::builder()
            .uri("/")
            .version(version)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_cache_control_value() {
        assert_eq!(
            cache_control_value(Duration::from_secs(60)),
            "public, must-revalidate, max-age=60"
        );
        assert_eq!(
            cache_control_value(Duration::ZERO),
            "public, must-revalidate, max-age=0"
        );
    }

    #[test]
    fn test_cache_control_value_rounding() {
        assert_eq!(
            cache_control_value(Duration::from_millis(1_500)),
            "public, must-revalidate, max-age=2"
        );
        assert_eq!(
            cache_control_value(Duration::from_millis(1_499)),
            "public, must-revalidate, max-age=1"
        );
        assert_eq!(
            cache_control_value(Duration::new(u64::MAX, 999_999_999)),
            format!("public, must-revalidate, max-age={}", u64::MAX)
        );
    }

    #[test]
    fn test_cache_control_value_beyond_f64_precision() {
        // 2^53 + 1 seconds
        assert_eq!(
            cache_control_value(Duration::from_secs(9_007_199_254_740_993)),
            "public, must-revalidate, max-age=9007199254740993"
        );
    }

    #[test]
    fn test_default_max_age_substituted() {
        assert_eq!(CacheLayer::new(CacheOptions::default()).max_age(), DEFAULT_MAX_AGE);
        assert_eq!(
            cache(CacheOptions::new().max_age_secs(30)).max_age(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_must_revalidate_is_inert() {
        let with = CachePolicy::from_options(CacheOptions::new().must_revalidate(true));
        let without = CachePolicy::from_options(CacheOptions::new());
        assert_eq!(with.cache_control, without.cache_control);
    }

    #[tokio::test]
    async fn test_cache_headers_http11() {
        let svc = cache(CacheOptions::default()).layer(service_fn(empty_handler));
        let resp = svc.oneshot(request(Version::HTTP_11)).await.unwrap();

        assert_eq!(
            resp.headers()[header::CACHE_CONTROL],
            "public, must-revalidate, max-age=604800"
        );
        assert!(resp.headers().get(header::EXPIRES).is_none());
        assert!(resp.headers().get(header::PRAGMA).is_none());
    }

    #[tokio::test]
    async fn test_expires_for_http10() {
        let svc = cache(CacheOptions::new().max_age_secs(120)).layer(service_fn(empty_handler));
        let before = Utc::now();
        let resp = svc.oneshot(request(Version::HTTP_10)).await.unwrap();

        let expires = resp.headers()[header::EXPIRES].to_str().unwrap();
        assert!(expires.ends_with(" GMT"));
        let expires = DateTime::parse_from_rfc2822(expires).unwrap();
        let delta = expires.timestamp() - before.timestamp();
        assert!((119..=121).contains(&delta), "unexpected Expires offset {delta}");
    }

    #[tokio::test]
    async fn test_pragma_removed() {
        let svc = cache(CacheOptions::default()).layer(service_fn(pragma_handler));
        let resp = svc.oneshot(request(Version::HTTP_11)).await.unwrap();
        assert!(resp.headers().get(header::PRAGMA).is_none());
    }

    #[tokio::test]
    async fn test_inner_cache_control_preserved() {
        let svc = cache(CacheOptions::default()).layer(service_fn(no_store_handler));

        let resp = svc.clone().oneshot(request(Version::HTTP_11)).await.unwrap();
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(resp.headers()[header::PRAGMA], "no-cache");

        let resp = svc.oneshot(request(Version::HTTP_10)).await.unwrap();
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(resp.headers()[header::EXPIRES], "0");
        assert_eq!(resp.headers().get_all(header::CACHE_CONTROL).iter().count(), 1);
    }
}
