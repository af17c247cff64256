//! Uniform response envelopes: `{code, msg, data}` and `{code, msg, data, total, page?}`.

use crate::query::Page;
use axum::Json;
use serde::Serialize;

pub const SUCCESS_CODE: u16 = 200;
pub const SUCCESS_MSG: &str = "success";

#[derive(Debug, Serialize)]
pub struct Response<T> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> Response<T> {
    pub fn error(code: u16, msg: String) -> Self {
        Response {
            code,
            msg,
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub code: u16,
    pub msg: String,
    pub data: Vec<T>,
    pub total: i64,
    /// Echoed only when a valid page was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

/// `{affected: n}` for update and delete endpoints.
#[derive(Debug, Serialize)]
pub struct Affected {
    pub affected: u64,
}

/// `{created: n, rows: [...]}` for batch create; rows carry their assigned ids.
#[derive(Debug, Serialize)]
pub struct Created<T> {
    pub created: usize,
    pub rows: Vec<T>,
}

impl<T> Created<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Created {
            created: rows.len(),
            rows,
        }
    }
}

pub fn success<T: Serialize>(data: T) -> Json<Response<T>> {
    Json(Response {
        code: SUCCESS_CODE,
        msg: SUCCESS_MSG.to_string(),
        data: Some(data),
    })
}

pub fn success_with_page<T: Serialize>(data: Vec<T>, page: Option<Page>, total: i64) -> Json<PageResponse<T>> {
    Json(PageResponse {
        code: SUCCESS_CODE,
        msg: SUCCESS_MSG.to_string(),
        data,
        total,
        page: page.filter(Page::is_valid),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_is_echoed_only_when_valid() {
        let Json(body) = success_with_page(vec![1, 2], Some(Page::new(1, 2)), 25);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"code": 200, "msg": "success", "data": [1, 2], "total": 25, "page": {"page_num": 1, "page_size": 2}})
        );
        let Json(body) = success_with_page(Vec::<i32>::new(), Some(Page::new(0, 2)), 0);
        assert!(serde_json::to_value(&body).unwrap().get("page").is_none());
    }

    #[test]
    fn created_counts_its_rows() {
        let Json(body) = success(Created::new(vec![json!({"id": "a"}), json!({"id": "b"})]));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"code": 200, "msg": "success", "data": {"created": 2, "rows": [{"id": "a"}, {"id": "b"}]}})
        );
    }

    #[test]
    fn error_envelope_has_null_data() {
        let body = Response::<()>::error(400, "filters required".into());
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"code": 400, "msg": "filters required", "data": null})
        );
    }
}
