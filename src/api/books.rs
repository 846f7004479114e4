//! Book endpoints

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, OriginalUri, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, request::Parts, StatusCode},
    Form, Json,
};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    filters::{BookFilter, BOOK_FILTERS},
    models::{book::book_not_found, BookForm, BookResource, PageRequest},
    notices::Notices,
    AppState,
};

use super::{
    collection::{LinkBase, Resource, ResourceCollection},
    response::ApiResponse,
    AuthenticatedUser,
};

impl Resource for BookResource {
    fn filters(&self) -> Option<&'static [&'static str]> {
        Some(BOOK_FILTERS)
    }
}

/// Book attributes from a JSON or form-encoded body
pub struct BookInput(pub BookForm);

#[async_trait]
impl<S> FromRequest<S> for BookInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(form) = Form::<BookForm>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
            Ok(Self(form))
        } else {
            let Json(form) = Json::<BookForm>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
            Ok(Self(form))
        }
    }
}

/// Book id from the route; an id that cannot name a book fails the `book` existence check
pub struct BookId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for BookId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state).await.map_err(|rejection| {
            tracing::debug!("Unusable book id: {}", rejection.body_text());
            AppError::Validation(book_not_found())
        })?;
        Ok(Self(id))
    }
}

/// Page number from the query string; anything unparsable means the first page
fn requested_page(params: &[(String, String)]) -> Option<u32> {
    params
        .iter()
        .find(|(name, _)| name == "page")
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// List books with title search and pagination
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("title" = Option<String>, Query, description = "Full-text search in title (boolean mode: +word, -word, word*)"),
        ("page" = Option<u32>, Query, description = "Page number (default: 1)")
    ),
    responses(
        (status = 200, description = "Envelope with a page of books in `data`", body = BookResource),
        (status = 401, description = "Not authenticated", body = crate::error::UnauthorizedResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    notices: Notices,
    OriginalUri(uri): OriginalUri,
) -> AppResult<ApiResponse<ResourceCollection<BookResource>>> {
    tracing::debug!("Listing books for {}", claims.sub);

    let Query(params) = Query::<Vec<(String, String)>>::try_from_uri(&uri)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let filter = BookFilter::from_params(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let page = PageRequest::new(requested_page(&params), state.config.pagination.per_page);

    let books = state.services.books.list(&filter, page, &notices).await?;

    let base = LinkBase::from_uri(state.config.server.base_url.as_deref(), &uri);
    let collection = ResourceCollection::paginate(books.map(BookResource::from), &base);

    Ok(ApiResponse::new().with_notices(&notices).with_data(collection, None))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body(content = BookForm, content_type = "application/json"),
    responses(
        (status = 201, description = "Envelope with the created book in `data`", body = BookResource),
        (status = 401, description = "Not authenticated", body = crate::error::UnauthorizedResponse),
        (status = 422, description = "Validation errors in `errors`")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    notices: Notices,
    BookInput(form): BookInput,
) -> AppResult<ApiResponse<BookResource>> {
    let book = state.services.books.create(form).await?;

    Ok(ApiResponse::new()
        .with_notices(&notices)
        .status(StatusCode::CREATED)
        .with_data(BookResource::from(book), None))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Envelope with the book in `data`", body = BookResource),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    notices: Notices,
    BookId(id): BookId,
) -> AppResult<ApiResponse<BookResource>> {
    let book = state.services.books.get(id).await?;

    Ok(ApiResponse::new()
        .with_notices(&notices)
        .with_data(BookResource::from(book), None))
}

/// Update any subset of a book's attributes
#[utoipa::path(
    put,
    path = "/api/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body(content = BookForm, content_type = "application/json"),
    responses(
        (status = 200, description = "Envelope with the updated book in `data`", body = BookResource),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Validation errors in `errors`")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    notices: Notices,
    BookId(id): BookId,
    BookInput(form): BookInput,
) -> AppResult<ApiResponse<BookResource>> {
    let book = state.services.books.update(id, form, &notices).await?;

    Ok(ApiResponse::new()
        .with_notices(&notices)
        .with_data(BookResource::from(book), None))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    BookId(id): BookId,
) -> AppResult<ApiResponse> {
    state.services.books.delete(id).await?;

    Ok(ApiResponse::new()
        .status(StatusCode::NO_CONTENT)
        .with_data(Value::Null, None))
}
