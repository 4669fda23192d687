// Query language for the document store: filters, updates, aggregation pipelines

pub mod executor;
pub mod filter;
pub mod pagination;
pub mod pipeline;
pub mod update;

pub use executor::Collections;
pub use filter::Filter;
pub use pagination::{paginate, Page, PageRequest};
pub use pipeline::{Accumulator, Expr, Lookup, Pipeline, Projection, SortOrder, Stage};
pub use update::Update;
