use axum::routing::{get, post};
use axum::Router;

pub mod books;
pub mod client;
pub mod public_key;
pub mod sealed;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/publicKey", get(public_key::handler))
        .route("/addBook", post(books::add::handler))
        .route("/allBooks", get(books::all::handler))
        .route("/searchBooks", get(books::search::handler))
        .with_state(state)
}
