use clap::{Args, Subcommand};

use bookwire_daemon::books::Book as BookRecord;
use bookwire_daemon::state::StateError;
use bookwire_daemon::ClientError;

use crate::cli::op::{Op, OpContext};

crate::command_enum! {
    (Add, Add),
    (List, List),
    (Search, Search),
}

pub type BookCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Book {
    #[command(subcommand)]
    pub command: BookCommand,
}

#[async_trait::async_trait]
impl Op for Book {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

fn render(books: &[BookRecord]) -> String {
    if books.is_empty() {
        return "No books found".to_string();
    }
    books
        .iter()
        .map(|b| format!("{} by {} ({})", b.title, b.author, b.publication_date))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Add a book to the catalogue
#[derive(Args, Debug, Clone)]
pub struct Add {
    #[command(flatten)]
    pub book: BookRecord,
}

#[async_trait::async_trait]
impl Op for Add {
    type Error = BookError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let response = session.add_book(&self.book).await?;
        Ok(response.message)
    }
}

/// List every book
#[derive(Args, Debug, Clone)]
pub struct List;

#[async_trait::async_trait]
impl Op for List {
    type Error = BookError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        Ok(render(&session.all_books().await?))
    }
}

/// Search title, author and publication date
#[derive(Args, Debug, Clone)]
pub struct Search {
    /// Case-insensitive text to look for; empty lists everything
    #[arg(default_value = "")]
    pub query: String,
}

#[async_trait::async_trait]
impl Op for Search {
    type Error = BookError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        Ok(render(&session.search_books(&self.query).await?))
    }
}
