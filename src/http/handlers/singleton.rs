//! `/api/{kind}` for whole-document resources.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use axum::response::Response;

use crate::conditional::if_match;
use crate::http::context::RequestContext;
use crate::http::error::ApiError;
use crate::http::handlers::{check_write, conditional_read};
use crate::http::pipeline::{Dispatch, ResourceHandler};
use crate::http::response;
use crate::resources::{SingletonResource, Stamp, Validate};
use crate::session::Identity;
use crate::store::DocumentStore;
use crate::versioning::Versioned;

const ALLOW: &str = "GET, PUT, OPTIONS";
const DOCUMENT_KEY: &str = "document";

pub struct SingletonHandler<R, V> {
    store: DocumentStore<R>,
    validator: Arc<V>,
    allow_origin: String,
    _resource: PhantomData<fn() -> R>,
}

impl<R, V> SingletonHandler<R, V>
where
    R: SingletonResource,
    V: Validate<R> + 'static,
{
    pub fn new(store: DocumentStore<R>, validator: V, allow_origin: impl Into<String>) -> Self {
        Self {
            store,
            validator: Arc::new(validator),
            allow_origin: allow_origin.into(),
            _resource: PhantomData,
        }
    }

    fn read(&self, ctx: &RequestContext) -> Response {
        let snapshot = self.store.snapshot_versioned();
        let tag = self.store.tag_for(snapshot.generation, DOCUMENT_KEY, &snapshot.value);
        conditional_read(&ctx.headers, &snapshot.value, &tag)
    }

    async fn replace(&self, ctx: &RequestContext, identity: Identity) -> Result<Response, ApiError> {
        let precondition = if_match(&ctx.headers).ok_or(ApiError::PreconditionRequired)?;
        let snapshot = self.store.snapshot_versioned();
        let tag = self.store.tag_for(snapshot.generation, DOCUMENT_KEY, &snapshot.value);
        check_write(Some(&precondition), &tag, &snapshot.value)?;

        let payload = ctx.json_body()?;
        self.validator
            .validate_update(&payload, &snapshot.value)
            .map_err(ApiError::Validation)?;

        let validator = self.validator.clone();
        let stamp = Stamp::now(&identity);
        let document = self
            .store
            .update(move |document: &mut R| {
                check_write(Some(&precondition), &document.entity_tag(), document)?;
                let draft = validator
                    .validate_update(&payload, document)
                    .map_err(ApiError::Validation)?;
                document.replace(draft, &stamp);
                *document = std::mem::take(document).normalized();
                Ok::<R, ApiError>(document.clone())
            })
            .await?;

        tracing::info!(kind = R::KIND, user = %identity.username, "Replaced");
        Ok(response::tagged(StatusCode::OK, &document, &document.entity_tag()))
    }
}

#[async_trait]
impl<R, V> ResourceHandler for SingletonHandler<R, V>
where
    R: SingletonResource,
    V: Validate<R> + 'static,
{
    fn name(&self) -> &'static str {
        R::KIND
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Result<Dispatch, ApiError> {
        if !matches!(ctx.segments().as_slice(), ["api", kind] if *kind == R::KIND) {
            return Ok(Dispatch::NotHandled);
        }
        let response = match ctx.method.clone() {
            Method::OPTIONS => response::preflight(ALLOW, &self.allow_origin),
            Method::GET => {
                ctx.require_identity()?;
                self.read(ctx)
            }
            Method::PUT => {
                let identity = ctx.require_identity()?.clone();
                self.replace(ctx, identity).await?
            }
            _ => return Err(ApiError::MethodNotAllowed { allow: ALLOW }),
        };
        Ok(Dispatch::Handled(response))
    }
}
