use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

use crate::model::{EditorContext, EditorId};

/// Axum extractor for the acting editor.
///
/// - X-Editor-Id: required numeric editor id
/// - X-Editor-Name: optional display name
///
/// Requests without a valid id are rejected with 401.
#[async_trait]
impl<S> FromRequestParts<S> for EditorContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let editor_id = extract_editor_id(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;
        let editor_name = extract_header_value(&parts.headers, "x-editor-name");
        Ok(EditorContext::with_name(editor_id, editor_name))
    }
}

fn extract_editor_id(headers: &HeaderMap) -> Option<EditorId> {
    extract_header_value(headers, "x-editor-id")?.trim().parse().ok()
}

fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue, Request};

    async fn extract(request: Request<()>) -> Result<EditorContext, StatusCode> {
        let (mut parts, _) = request.into_parts();
        EditorContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_editor_context_extraction() {
        let request = Request::builder()
            .header("x-editor-id", "42")
            .header("x-editor-name", "Ada")
            .body(())
            .unwrap();
        let editor = extract(request).await.unwrap();
        assert_eq!(editor.editor_id, 42);
        assert_eq!(editor.editor_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_id_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(extract(request).await.unwrap_err(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .header("x-editor-id", "not-a-number")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap_err(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-editor-id"),
            HeaderValue::from_static(" 7 "),
        );
        assert_eq!(extract_editor_id(&headers), Some(7));
        assert_eq!(extract_header_value(&headers, "x-editor-name"), None);
    }
}
