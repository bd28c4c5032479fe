//! Body aggregation through the full service.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use http::StatusCode;
    use macrobase_http::{
        AuthContext, Endpoint, EndpointService, JsonReply, PathParams, Verb, handler_fn,
    };

    use crate::{body_json, request, send, service};

    fn echo() -> EndpointService {
        let echo = || {
            handler_fn(|ctx, _request, body| {
                Ok(ctx.responses().json(JsonReply::data(body.to_json())))
            })
        };
        service(
            Endpoint::builder()
                .handler(Verb::Get, echo())
                .handler(Verb::Post, echo())
                .handler(Verb::Put, echo())
                .build(),
        )
    }

    #[tokio::test]
    async fn test_should_merge_path_json_query_and_headers() {
        let svc = echo();
        let mut params = BTreeMap::new();
        params.insert("id".to_owned(), "from-path".to_owned());
        params.insert("owner".to_owned(), "ann".to_owned());

        let mut req = request("PUT", "/items/1?id=from-query&tag=a&tag=b&blank=")
            .header("content-type", "application/json")
            .header("X-Trace", "abc")
            .header("accept", "*/*");
        if let Some(ext) = req.extensions_mut() {
            ext.insert(PathParams(params));
        }

        let resp = send(&svc, req, r#"{"id": "from-json", "count": 3}"#).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({
                "id": "from-query",
                "owner": "ann",
                "count": 3,
                "tag": ["a", "b"],
                "x-trace": "abc",
                "auth": null,
            })
        );
    }

    #[tokio::test]
    async fn test_should_ignore_query_on_post() {
        let svc = echo();
        let req = request("POST", "/items?id=from-query")
            .header("content-type", "application/json; charset=utf-8");

        let body = body_json(send(&svc, req, r#"{"id": "from-json"}"#).await).await;
        assert_eq!(body, serde_json::json!({"id": "from-json", "auth": null}));
    }

    #[tokio::test]
    async fn test_should_ignore_json_without_json_content_type() {
        let svc = echo();
        let req = request("POST", "/items").header("content-type", "text/plain");

        let body = body_json(send(&svc, req, r#"{"id": "x"}"#).await).await;
        assert_eq!(body, serde_json::json!({"auth": null}));
    }

    #[tokio::test]
    async fn test_should_keep_urlencoded_fields_as_lists() {
        let svc = echo();
        let req = request("POST", "/form")
            .header("content-type", "application/x-www-form-urlencoded");

        let body = body_json(send(&svc, req, "name=widget&size=s&size=m").await).await;
        assert_eq!(
            body,
            serde_json::json!({"name": ["widget"], "size": ["s", "m"], "auth": null})
        );
    }

    #[tokio::test]
    async fn test_should_collapse_multipart_fields_and_list_files() {
        let svc = echo();
        let payload = "--frontier\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\
             \r\n\
             report\r\n\
             --frontier\r\n\
             Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             hi\r\n\
             --frontier--\r\n";
        let req = request("POST", "/upload")
            .header("content-type", "multipart/form-data; boundary=frontier");

        let body = body_json(send(&svc, req, payload).await).await;
        assert_eq!(body["title"], "report");
        assert_eq!(
            body["doc"],
            serde_json::json!([{"type": "text/plain", "body": "aGk=", "name": "a.txt"}])
        );
    }

    #[tokio::test]
    async fn test_should_attach_auth_from_extension() {
        let svc = echo();
        let mut req = request("GET", "/me");
        if let Some(ext) = req.extensions_mut() {
            ext.insert(AuthContext(serde_json::json!({"sub": "u-9", "roles": ["admin"]})));
        }

        let body = body_json(send(&svc, req, "").await).await;
        assert_eq!(body["auth"]["sub"], "u-9");
        assert_eq!(body["auth"]["roles"][0], "admin");
    }

    #[tokio::test]
    async fn test_should_reject_malformed_multipart() {
        let svc = echo();
        let req = request("POST", "/upload").header("content-type", "multipart/form-data");

        let resp = send(&svc, req, "no boundary here").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["code"], 400);
        assert!(
            body["message"]
                .as_str()
                .is_some_and(|m| m.contains("multipart"))
        );
    }
}
