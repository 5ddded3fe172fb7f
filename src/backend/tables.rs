//! Row operations against the hosted relational store.
//!
//! Every screen in the app is a thin binding over these calls: select with
//! filter/order, insert, upsert, delete. Queries are expressed with the
//! platform's `column=op.value` query-string convention.

use reqwest::header;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::classify;
use super::{Backend, BackendError};

const REST_PREFIX: &str = "rest/v1/";

impl Backend {
    /// Start a query against `table`.
    pub fn table<'a>(&'a self, table: &'a str) -> TableQuery<'a> {
        TableQuery {
            backend: self,
            table,
            filters: Vec::new(),
            order: None,
        }
    }
}

/// Builder for a single table operation.
pub struct TableQuery<'a> {
    backend: &'a Backend,
    table: &'a str,
    filters: Vec<(String, String)>,
    order: Option<String>,
}

impl TableQuery<'_> {
    /// Filter rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Filter rows where `column` is one of `values`.
    pub fn in_list(mut self, column: &str, values: &[String]) -> Self {
        self.filters
            .push((column.to_string(), format!("in.({})", values.join(","))));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(format!("{}.asc", column));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(format!("{}.desc", column));
        self
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.clone();
        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.clone()));
        }
        pairs
    }

    async fn send(
        self,
        method: Method,
        prefer: Option<&str>,
        accept: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, BackendError> {
        let url = self
            .backend
            .endpoint(&format!("{}{}", REST_PREFIX, self.table))?;
        let mut request = self
            .backend
            .request(method, url)
            .await
            .query(&self.query_pairs());
        if let Some(prefer) = prefer {
            request = request.header("Prefer", prefer);
        }
        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }

    /// Fetch all matching rows.
    pub async fn select<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        let response = self.send(Method::GET, None, None, None).await?;
        Ok(response.json().await?)
    }

    /// Fetch exactly one matching row; [`BackendError::NotFound`] when the
    /// filter matches nothing.
    pub async fn select_single<T: DeserializeOwned>(self) -> Result<T, BackendError> {
        let response = self
            .send(
                Method::GET,
                None,
                Some("application/vnd.pgrst.object+json"),
                None,
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Insert one row and return the stored representation.
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        self,
        row: &T,
    ) -> Result<R, BackendError> {
        let body = serde_json::to_value(row).map_err(invalid_row)?;
        let response = self
            .send(
                Method::POST,
                Some("return=representation"),
                Some("application/vnd.pgrst.object+json"),
                Some(body),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Insert one row, discarding the response body.
    pub async fn insert_only<T: Serialize>(self, row: &T) -> Result<(), BackendError> {
        let body = serde_json::to_value(row).map_err(invalid_row)?;
        self.send(Method::POST, Some("return=minimal"), None, Some(body))
            .await?;
        Ok(())
    }

    /// Insert-or-replace one row, keyed on the table's conflict target.
    pub async fn upsert<T: Serialize>(self, row: &T) -> Result<(), BackendError> {
        let body = serde_json::to_value(row).map_err(invalid_row)?;
        self.send(
            Method::POST,
            Some("resolution=merge-duplicates,return=minimal"),
            None,
            Some(body),
        )
        .await?;
        Ok(())
    }

    /// Delete all matching rows.
    pub async fn delete(self) -> Result<(), BackendError> {
        self.send(Method::DELETE, Some("return=minimal"), None, None)
            .await?;
        Ok(())
    }
}

fn invalid_row(err: serde_json::Error) -> BackendError {
    BackendError::Api {
        status: 0,
        code: None,
        message: format!("Could not serialize row: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::Backend;
    use crate::config::BackendConfig;

    fn backend() -> Backend {
        Backend::new(&BackendConfig {
            url: "http://localhost:54321".to_string(),
            api_key: "test-key".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn eq_filter_builds_expected_pair() {
        let backend = backend();
        let query = backend.table("user_roles").eq("user_id", "u-1");
        assert_eq!(
            query.query_pairs(),
            vec![("user_id".to_string(), "eq.u-1".to_string())]
        );
    }

    #[test]
    fn in_list_joins_values() {
        let backend = backend();
        let query = backend.table("posts").in_list(
            "category_id",
            &[
                "physical-activity".to_string(),
                "relationships".to_string(),
            ],
        );
        assert_eq!(
            query.query_pairs(),
            vec![(
                "category_id".to_string(),
                "in.(physical-activity,relationships)".to_string()
            )]
        );
    }

    #[test]
    fn order_is_appended_last() {
        let backend = backend();
        let query = backend
            .table("posts")
            .eq("publisher_id", "u-1")
            .order_desc("created_at");
        assert_eq!(
            query.query_pairs(),
            vec![
                ("publisher_id".to_string(), "eq.u-1".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }
}
