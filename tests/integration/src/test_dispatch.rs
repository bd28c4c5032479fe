//! Dispatch lifecycle through the full service.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use http::StatusCode;
    use macrobase_core::{Failure, HttpError};
    use macrobase_http::{
        AfterHook, BeforeHook, Body, CORRELATION_HEADER, Endpoint, RequestContext, RequestView,
        Response, ReplyOptions, Verb, VerbHandler,
    };

    use crate::{body_bytes, body_json, request, send, service};

    /// Records the lifecycle steps it observes.
    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn push(&self, step: impl Into<String>) {
            self.0.lock().unwrap().push(step.into());
        }

        fn steps(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Step {
        name: &'static str,
        journal: Journal,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl BeforeHook for Step {
        async fn before(
            &self,
            ctx: &RequestContext,
            _request: &RequestView,
            _body: &mut Body,
        ) -> Result<(), Failure> {
            self.journal.push(format!("{}:{}", self.name, ctx.request_id()));
            if self.fail {
                return Err(HttpError::forbidden("denied").into());
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl AfterHook for Step {
        async fn after(&self, ctx: &RequestContext, _request: &RequestView) -> Result<(), Failure> {
            self.journal.push(format!("{}:{}", self.name, ctx.request_id()));
            if self.fail {
                return Err(std::io::Error::other("disk gone").into());
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl VerbHandler for Step {
        async fn handle(
            &self,
            ctx: &RequestContext,
            _request: &RequestView,
            _body: &Body,
        ) -> Result<Response, Failure> {
            self.journal.push(format!("{}:{}", self.name, ctx.request_id()));
            if self.fail {
                return Err(HttpError::not_found("no such item").into());
            }
            Ok(ctx.responses().text("done", ReplyOptions::default()))
        }
    }

    fn step(name: &'static str, journal: &Journal, fail: bool) -> Step {
        Step {
            name,
            journal: journal.clone(),
            fail,
        }
    }

    fn names(steps: &[String]) -> Vec<&str> {
        steps
            .iter()
            .map(|s| s.split(':').next().unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_should_run_lifecycle_in_order_with_one_request_id() {
        let journal = Journal::default();
        let svc = service(
            Endpoint::builder()
                .before(step("before-1", &journal, false))
                .before(step("before-2", &journal, false))
                .handler(Verb::Get, step("handler", &journal, false))
                .after(step("after", &journal, false))
                .build(),
        );

        let resp = send(&svc, request("GET", "/"), "").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let request_id = resp
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_owned();
        assert_eq!(body_bytes(resp).await.as_ref(), b"done");

        let steps = journal.steps();
        assert_eq!(names(&steps), ["before-1", "before-2", "handler", "after"]);
        assert!(steps.iter().all(|s| s.ends_with(&request_id)));
    }

    #[tokio::test]
    async fn test_should_resolve_before_hook_failure_and_still_run_after_hooks() {
        let journal = Journal::default();
        let svc = service(
            Endpoint::builder()
                .before(step("guard", &journal, true))
                .handler(Verb::Get, step("handler", &journal, false))
                .after(step("after", &journal, false))
                .build(),
        );

        let resp = send(&svc, request("GET", "/"), "").await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"code": 403, "message": "denied"})
        );
        assert_eq!(names(&journal.steps()), ["guard", "after"]);
    }

    #[tokio::test]
    async fn test_should_resolve_handler_failure_through_defaults() {
        let journal = Journal::default();
        let svc = service(
            Endpoint::builder()
                .handler(Verb::Get, step("handler", &journal, true))
                .after(step("after", &journal, false))
                .build(),
        );

        let resp = send(&svc, request("GET", "/items/9"), "").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().contains_key(CORRELATION_HEADER));
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"code": 404, "message": "no such item"})
        );
        assert_eq!(names(&journal.steps()), ["handler", "after"]);
    }

    #[tokio::test]
    async fn test_should_surface_after_hook_failure_as_500() {
        let journal = Journal::default();
        let svc = service(
            Endpoint::builder()
                .handler(Verb::Get, step("handler", &journal, false))
                .after(step("cleanup", &journal, true))
                .after(step("never", &journal, false))
                .build(),
        );

        let resp = send(&svc, request("GET", "/"), "").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_bytes(resp).await.as_ref(), b"disk gone");
        assert_eq!(names(&journal.steps()), ["handler", "cleanup"]);
    }

    #[tokio::test]
    async fn test_should_answer_405_for_unserved_verb_without_hooks() {
        let journal = Journal::default();
        let svc = service(
            Endpoint::builder()
                .before(step("before", &journal, false))
                .handler(Verb::Get, step("handler", &journal, false))
                .after(step("after", &journal, false))
                .build(),
        );

        let resp = send(&svc, request("DELETE", "/"), "").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"code": 405, "message": "Method Not Allowed"})
        );
        assert!(journal.steps().is_empty());
    }

    #[tokio::test]
    async fn test_should_serve_health_endpoint() {
        let svc = service(Endpoint::health());

        let resp = send(&svc, request("GET", "/health"), "").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
        assert_eq!(body_bytes(resp).await.as_ref(), b"Health");

        let resp = send(&svc, request("POST", "/health"), "").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["message"], "POST Not Impl");
    }
}
