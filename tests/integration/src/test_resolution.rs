//! Failure resolution through shared registries.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use macrobase_core::{
        Classified, EXCEPTION, ErrorClass, Failure, HTTP_ERROR, HandlerRegistry, Resolution,
        ResolutionPolicy, RoutingError,
    };
    use macrobase_http::{Endpoint, EndpointService, Verb, handler_fn};

    use crate::{body_json, request, send, service};

    static STORAGE: ErrorClass = ErrorClass::derived("StorageError", &EXCEPTION);
    static QUOTA: ErrorClass = ErrorClass::derived("QuotaError", &STORAGE);
    static HARD_QUOTA: ErrorClass = ErrorClass::derived("HardQuotaError", &QUOTA);

    #[derive(Debug, thiserror::Error)]
    #[error("quota exceeded for {bucket}")]
    struct HardQuotaError {
        bucket: String,
    }

    impl Classified for HardQuotaError {
        fn class(&self) -> &'static ErrorClass {
            &HARD_QUOTA
        }
    }

    fn registry(policy: ResolutionPolicy) -> Arc<HandlerRegistry> {
        let mut registry = HandlerRegistry::with_defaults(policy);
        registry.register(&[&STORAGE], |failure: &Failure| {
            Resolution::new(StatusCode::SERVICE_UNAVAILABLE)
                .with_error_code(5031)
                .with_message(failure.to_string())
        });
        registry.register(&[&QUOTA], |failure: &Failure| {
            let bucket = failure
                .downcast_ref::<HardQuotaError>()
                .map(|e| e.bucket.clone());
            Resolution::new(StatusCode::TOO_MANY_REQUESTS)
                .with_data(serde_json::json!({ "bucket": bucket }))
        });
        Arc::new(registry)
    }

    fn failing(registry: Arc<HandlerRegistry>) -> EndpointService {
        service(
            Endpoint::builder()
                .handler(
                    Verb::Post,
                    handler_fn(|_ctx, _request, _body| {
                        Err(HardQuotaError {
                            bucket: "photos".to_owned(),
                        }
                        .into())
                    }),
                )
                .handler(
                    Verb::Get,
                    handler_fn(|_ctx, _request, _body| {
                        Err(RoutingError("no route for /nowhere".to_owned()).into())
                    }),
                )
                .handler(
                    Verb::Put,
                    handler_fn(|_ctx, _request, _body| {
                        Err(Failure::with_class(&EXCEPTION, "plain failure"))
                    }),
                )
                .registry(registry)
                .build(),
        )
    }

    #[tokio::test]
    async fn test_should_resolve_to_first_registered_ancestor() {
        let svc = failing(registry(ResolutionPolicy::InsertionOrder));

        let resp = send(&svc, request("POST", "/upload"), "").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"code": 5031, "message": "quota exceeded for photos"})
        );
    }

    #[tokio::test]
    async fn test_should_resolve_to_closest_ancestor_when_most_specific() {
        let svc = failing(registry(ResolutionPolicy::MostSpecific));

        let resp = send(&svc, request("POST", "/upload"), "").await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"bucket": "photos"})
        );
    }

    #[tokio::test]
    async fn test_should_resolve_routing_error_through_http_family() {
        let svc = failing(registry(ResolutionPolicy::InsertionOrder));

        let resp = send(&svc, request("GET", "/nowhere"), "").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"code": 500, "message": "no route for /nowhere"})
        );
    }

    #[tokio::test]
    async fn test_should_fall_back_for_unregistered_class() {
        let svc = failing(registry(ResolutionPolicy::InsertionOrder));

        let resp = send(&svc, request("PUT", "/"), "").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"code": 500, "message": "plain failure"})
        );
    }

    #[tokio::test]
    async fn test_should_share_one_registry_between_endpoints() {
        let shared = registry(ResolutionPolicy::InsertionOrder);
        let first = failing(Arc::clone(&shared));
        let second = failing(Arc::clone(&shared));

        let a = send(&first, request("POST", "/"), "").await;
        let b = send(&second, request("POST", "/"), "").await;
        assert_eq!(a.status(), b.status());
        assert!(Arc::ptr_eq(first.endpoint().registry(), second.endpoint().registry()));
        assert!(shared.classes().any(|class| class == &HTTP_ERROR));
    }
}
