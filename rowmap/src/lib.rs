//! # rowmap
//!
//! Annotation-driven row mapping for Rust structs.
//!
//! Describe a struct once with `#[derive(Pojo)]` and rowmap builds a cached
//! descriptor of its persistent properties, from which it renders parameterized
//! `insert`, `update`, `delete`, `upsert` and `select` statements and moves
//! values between rows and structs.
//!
//! ## Key features
//!
//! - **Derive-driven metadata**: column names, primary keys, generated keys,
//!   enum encodings and per-field serializers live next to the fields.
//! - **Cached descriptors**: each row type is introspected once per dialect.
//! - **Dialects**: a standard dialect plus PostgreSQL naming conventions,
//!   numbered placeholders and `on conflict` upserts.
//! - **sqlx glue**: bind argument lists and read sqlite rows back.
//!
//! ## Quick start
//!
//! ```rust
//! use rowmap::prelude::*;
//!
//! #[derive(Pojo, Default)]
//! #[rowmap(table = "testTable")]
//! struct Test {
//!     #[rowmap(id, column = "id")]
//!     id: i32,
//!     #[rowmap(column = "name")]
//!     name: String,
//! }
//!
//! let maker = SqlMaker::standard();
//! let sql = maker.insert_sql::<Test>(&QueryContext::new()).unwrap();
//! assert_eq!(sql, "insert into testTable (id,name) values (?,?)");
//! ```
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! rowmap = "0.3.0"
//! ```

pub use rowmap_core::*;
pub use rowmap_macros::{DbEnum, Pojo};

pub mod prelude {
    pub use rowmap_core::prelude::*;

    pub use crate::{DbEnum, Pojo}; // the derives, next to the traits
}
