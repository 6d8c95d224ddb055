//! `/api/{kind}` and `/api/{kind}/{id}` for list-shaped documents.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use axum::response::Response;

use crate::conditional::{if_match, Precondition};
use crate::http::context::RequestContext;
use crate::http::error::ApiError;
use crate::http::handlers::{check_write, conditional_read};
use crate::http::pipeline::{Dispatch, ResourceHandler};
use crate::http::response;
use crate::resources::{CollectionResource, Stamp, Validate};
use crate::session::Identity;
use crate::store::{Collection, DocumentStore};

const LIST_ALLOW: &str = "GET, POST, OPTIONS";
const ITEM_ALLOW: &str = "GET, PUT, DELETE, OPTIONS";
const LIST_KEY: &str = "list";

enum Target {
    List,
    /// `None` when the segment is not a valid id.
    Item(Option<u64>),
}

pub struct CollectionHandler<R, V> {
    store: DocumentStore<Collection<R>>,
    validator: Arc<V>,
    allow_origin: String,
    _resource: PhantomData<fn() -> R>,
}

impl<R, V> CollectionHandler<R, V>
where
    R: CollectionResource,
    V: Validate<R> + 'static,
{
    pub fn new(store: DocumentStore<Collection<R>>, validator: V, allow_origin: impl Into<String>) -> Self {
        Self {
            store,
            validator: Arc::new(validator),
            allow_origin: allow_origin.into(),
            _resource: PhantomData,
        }
    }

    fn target(ctx: &RequestContext) -> Option<Target> {
        match ctx.segments().as_slice() {
            ["api", kind] if *kind == R::KIND => Some(Target::List),
            ["api", kind, id] if *kind == R::KIND => {
                Some(Target::Item(id.parse::<u64>().ok().filter(|id| *id > 0)))
            }
            _ => None,
        }
    }

    fn list(&self, ctx: &RequestContext) -> Response {
        let snapshot = self.store.snapshot_versioned();
        let tag = self.store.tag_for(snapshot.generation, LIST_KEY, &snapshot.value);
        conditional_read(&ctx.headers, &snapshot.value.items, &tag)
    }

    fn read(&self, ctx: &RequestContext, id: u64) -> Result<Response, ApiError> {
        let snapshot = self.store.snapshot_versioned();
        let item = snapshot.value.find(id).ok_or(ApiError::NotFound)?;
        let tag = self.store.tag_for(snapshot.generation, &item_key(id), item);
        Ok(conditional_read(&ctx.headers, item, &tag))
    }

    async fn create(&self, ctx: &RequestContext, identity: Identity) -> Result<Response, ApiError> {
        let payload = ctx.json_body()?;
        let draft = self
            .validator
            .validate_create(&payload)
            .map_err(ApiError::Validation)?;
        let stamp = Stamp::now(&identity);

        let item = self
            .store
            .update(move |collection: &mut Collection<R>| {
                let mut item = collection.insert_with(|id| R::create(id, draft, &stamp)).clone();
                item.normalize();
                Ok::<R, ApiError>(item)
            })
            .await?;

        tracing::info!(kind = R::KIND, id = item.id(), user = %identity.username, "Created");
        let location = format!("/api/{}/{}", R::KIND, item.id());
        Ok(response::created(&item, &item.entity_tag(), &location))
    }

    /// 428 and 404 and 412 are decided against a snapshot before queueing,
    /// then the precondition is checked again on the state the mutator gets.
    fn precheck(&self, ctx: &RequestContext, id: u64) -> Result<(Precondition, R), ApiError> {
        let precondition = if_match(&ctx.headers).ok_or(ApiError::PreconditionRequired)?;
        let snapshot = self.store.snapshot_versioned();
        let current = snapshot.value.find(id).ok_or(ApiError::NotFound)?;
        let tag = self.store.tag_for(snapshot.generation, &item_key(id), current);
        check_write(Some(&precondition), &tag, current)?;
        Ok((precondition, current.clone()))
    }

    async fn replace(&self, ctx: &RequestContext, identity: Identity, id: u64) -> Result<Response, ApiError> {
        let (precondition, current) = self.precheck(ctx, id)?;
        let payload = ctx.json_body()?;
        self.validator
            .validate_update(&payload, &current)
            .map_err(ApiError::Validation)?;

        let validator = self.validator.clone();
        let stamp = Stamp::now(&identity);
        let item = self
            .store
            .update(move |collection: &mut Collection<R>| {
                let item = collection.find_mut(id).ok_or(ApiError::NotFound)?;
                check_write(Some(&precondition), &item.entity_tag(), item)?;
                let draft = validator
                    .validate_update(&payload, item)
                    .map_err(ApiError::Validation)?;
                item.apply(draft, &stamp);
                item.normalize();
                Ok::<R, ApiError>(item.clone())
            })
            .await?;

        tracing::info!(kind = R::KIND, id, user = %identity.username, "Updated");
        Ok(response::tagged(StatusCode::OK, &item, &item.entity_tag()))
    }

    async fn delete(&self, ctx: &RequestContext, identity: Identity, id: u64) -> Result<Response, ApiError> {
        let (precondition, _) = self.precheck(ctx, id)?;

        self.store
            .update(move |collection: &mut Collection<R>| {
                let item = collection.find(id).ok_or(ApiError::NotFound)?;
                check_write(Some(&precondition), &item.entity_tag(), item)?;
                collection.remove(id);
                Ok::<(), ApiError>(())
            })
            .await?;

        tracing::info!(kind = R::KIND, id, user = %identity.username, "Deleted");
        Ok(response::no_content())
    }
}

fn item_key(id: u64) -> String {
    format!("item:{}", id)
}

#[async_trait]
impl<R, V> ResourceHandler for CollectionHandler<R, V>
where
    R: CollectionResource,
    V: Validate<R> + 'static,
{
    fn name(&self) -> &'static str {
        R::KIND
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Result<Dispatch, ApiError> {
        let Some(target) = Self::target(ctx) else {
            return Ok(Dispatch::NotHandled);
        };
        let allow = match target {
            Target::List => LIST_ALLOW,
            Target::Item(_) => ITEM_ALLOW,
        };
        if ctx.method == Method::OPTIONS {
            return Ok(Dispatch::Handled(response::preflight(allow, &self.allow_origin)));
        }

        let method = ctx.method.clone();
        let supported = match target {
            Target::List => method == Method::GET || method == Method::POST,
            Target::Item(_) => method == Method::GET || method == Method::PUT || method == Method::DELETE,
        };
        if !supported {
            return Err(ApiError::MethodNotAllowed { allow });
        }
        let identity = ctx.require_identity()?.clone();

        let response = match target {
            Target::List if method == Method::GET => self.list(ctx),
            Target::List => self.create(ctx, identity).await?,
            Target::Item(None) => return Err(ApiError::NotFound),
            Target::Item(Some(id)) if method == Method::GET => self.read(ctx, id)?,
            Target::Item(Some(id)) if method == Method::PUT => self.replace(ctx, identity, id).await?,
            Target::Item(Some(id)) => self.delete(ctx, identity, id).await?,
        };
        Ok(Dispatch::Handled(response))
    }
}
