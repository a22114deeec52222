pub mod bigquery;
pub mod spanner;
