#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("tables were not created ({}), run `billing-loader init-db` first", .0.join(", "))]
    MissingSchema(Vec<String>),
    #[error("{column} is not a number: {value:?}")]
    InvalidNumber { column: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, DbError>;
