pub mod add;
pub mod all;
pub mod search;

pub use add::{AddBookRequest, AddBookResponse};
pub use all::AllBooksRequest;
pub use search::SearchBooksRequest;
