//! Ordered handler chain; the first handler that claims a request wins.

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};

use crate::http::context::RequestContext;
use crate::http::error::ApiError;

pub enum Dispatch {
    Handled(Response),
    /// The handler does not serve this path; the context is untouched.
    NotHandled,
}

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Handler name for logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: &mut RequestContext) -> Result<Dispatch, ApiError>;
}

#[derive(Default)]
pub struct Pipeline {
    handlers: Vec<Box<dyn ResourceHandler>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<H: ResourceHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the chain. Unclaimed requests get a 404.
    pub async fn dispatch(&self, ctx: &mut RequestContext) -> Response {
        for handler in &self.handlers {
            match handler.handle(ctx).await {
                Ok(Dispatch::Handled(response)) => {
                    tracing::trace!(handler = handler.name(), "Request handled");
                    return response;
                }
                Ok(Dispatch::NotHandled) => continue,
                Err(err) => return err.into_response(),
            }
        }
        ApiError::NotFound.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::context::test_support::context;
    use axum::http::{Method, StatusCode};

    struct Fixed {
        path: &'static str,
        status: StatusCode,
    }

    #[async_trait]
    impl ResourceHandler for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn handle(&self, ctx: &mut RequestContext) -> Result<Dispatch, ApiError> {
            if ctx.path != self.path {
                return Ok(Dispatch::NotHandled);
            }
            Ok(Dispatch::Handled(self.status.into_response()))
        }
    }

    struct Failing;

    #[async_trait]
    impl ResourceHandler for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _ctx: &mut RequestContext) -> Result<Dispatch, ApiError> {
            Err(ApiError::Forbidden)
        }
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let pipeline = Pipeline::new()
            .with(Fixed { path: "/a", status: StatusCode::OK })
            .with(Fixed { path: "/a", status: StatusCode::ACCEPTED })
            .with(Fixed { path: "/b", status: StatusCode::CREATED });

        let mut ctx = context(Method::GET, "/a", None);
        assert_eq!(pipeline.dispatch(&mut ctx).await.status(), StatusCode::OK);

        let mut ctx = context(Method::GET, "/b", None);
        assert_eq!(pipeline.dispatch(&mut ctx).await.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_unclaimed_is_not_found() {
        let pipeline = Pipeline::new().with(Fixed { path: "/a", status: StatusCode::OK });
        let mut ctx = context(Method::GET, "/nowhere", None);
        assert_eq!(pipeline.dispatch(&mut ctx).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_stops_the_chain() {
        let pipeline = Pipeline::new()
            .with(Failing)
            .with(Fixed { path: "/a", status: StatusCode::OK });
        let mut ctx = context(Method::GET, "/a", None);
        assert_eq!(pipeline.dispatch(&mut ctx).await.status(), StatusCode::FORBIDDEN);
    }
}
