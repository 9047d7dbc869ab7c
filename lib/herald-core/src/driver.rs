//! Registration driver

use crate::{park, Declarations, DiscoveryClient, HeraldError, ListKind, Result};
use std::future::Future;
use tracing::{debug, info};

/// What a successful registration pass issued
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub services: usize,
    pub stores: usize,
}

/// Register every service, then every store, in declaration order.
///
/// Stops at the first rejected call. Calls already issued are left in place.
pub async fn register_all<C>(client: &C, declarations: &Declarations) -> Result<Summary>
where
    C: DiscoveryClient + ?Sized,
{
    for (position, service) in declarations.services.iter().enumerate() {
        debug!("Registering service {}: {:?}", position, service);
        client
            .register(&service.name, &service.address, service.tags.as_ref())
            .await
            .map_err(|source| HeraldError::RegistrationFailed {
                list: ListKind::Service,
                position,
                source,
            })?;
        info!("Registered service {} at {}", service.name, service.address);
    }

    for (position, store) in declarations.stores.iter().enumerate() {
        client
            .store(store.format, &store.path)
            .await
            .map_err(|source| HeraldError::RegistrationFailed {
                list: ListKind::Store,
                position,
                source,
            })?;
        info!("Added {} store at {}", store.format, store.path);
    }

    Ok(Summary {
        services: declarations.services.len(),
        stores: declarations.stores.len(),
    })
}

/// Register `declarations` and park until `shutdown` resolves.
pub async fn run<C, F>(client: &C, declarations: &Declarations, shutdown: F) -> Result<Summary>
where
    C: DiscoveryClient + ?Sized,
    F: Future<Output = ()>,
{
    let summary = register_all(client, declarations).await?;
    info!(
        "Registered {} services across {} stores",
        summary.services, summary.stores
    );

    park(shutdown).await;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiscoveryCall, FormatKind, MemoryDiscovery, Tags};

    async fn register(services: &str, stores: &str) -> (Result<Summary>, MemoryDiscovery) {
        let memory = MemoryDiscovery::new();
        let result = match Declarations::parse(services, stores) {
            Ok(declarations) => register_all(&memory, &declarations).await,
            Err(e) => Err(e),
        };
        (result, memory)
    }

    #[tokio::test]
    async fn test_registers_services_in_order() {
        let (result, memory) = register("api,10.0.0.1:8080;worker,10.0.0.2:9090", "").await;
        assert_eq!(result.unwrap(), Summary { services: 2, stores: 0 });
        assert_eq!(
            memory.calls().await,
            vec![
                DiscoveryCall::Register {
                    name: "api".to_string(),
                    address: "10.0.0.1:8080".to_string(),
                    tags: None,
                },
                DiscoveryCall::Register {
                    name: "worker".to_string(),
                    address: "10.0.0.2:9090".to_string(),
                    tags: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_registers_tags() {
        let (result, memory) = register("api,10.0.0.1:8080,env=prod,zone=us", "").await;
        result.unwrap();

        let expected: Tags = [("env", "prod"), ("zone", "us")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            memory.calls().await,
            vec![DiscoveryCall::Register {
                name: "api".to_string(),
                address: "10.0.0.1:8080".to_string(),
                tags: Some(expected),
            }]
        );
    }

    #[tokio::test]
    async fn test_stores_follow_services() {
        let (result, memory) = register("api,10.0.0.1:8080", "default,/svc;puro,/legacy").await;
        assert_eq!(result.unwrap(), Summary { services: 1, stores: 2 });

        let calls = memory.calls().await;
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], DiscoveryCall::Register { .. }));
        assert_eq!(
            calls[1..],
            [
                DiscoveryCall::Store {
                    format: FormatKind::Default,
                    path: "/svc".to_string(),
                },
                DiscoveryCall::Store {
                    format: FormatKind::Puro,
                    path: "/legacy".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_entry_issues_no_calls() {
        let (result, memory) = register("onlyname", "default,/svc").await;
        assert!(matches!(
            result,
            Err(HeraldError::MalformedEntry { list: ListKind::Service, position: 0, .. })
        ));
        assert!(memory.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_late_store_error_blocks_valid_services() {
        let (result, memory) = register(
            "api,10.0.0.1:8080;worker,10.0.0.2:9090",
            "default,/svc;weird,/a,/b",
        )
        .await;
        assert!(matches!(
            result,
            Err(HeraldError::MalformedEntry { list: ListKind::Store, position: 1, .. })
        ));
        assert!(memory.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_format_never_reaches_client() {
        let (result, memory) = register("api,10.0.0.1:8080", "foo,/x").await;
        assert!(matches!(result, Err(HeraldError::UnknownFormat { position: 0, .. })));
        assert!(memory.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_stops_the_run() {
        let memory = MemoryDiscovery::new();
        memory.reject("worker").await;

        let declarations = Declarations::parse(
            "api,10.0.0.1:8080;worker,10.0.0.2:9090;cache,10.0.0.3:6379",
            "default,/svc",
        )
        .unwrap();
        let err = register_all(&memory, &declarations).await.unwrap_err();

        match &err {
            HeraldError::RegistrationFailed { list, position, source } => {
                assert_eq!(*list, ListKind::Service);
                assert_eq!(*position, 1);
                assert_eq!(source.to_string(), "worker rejected by memory backend");
            }
            other => panic!("unexpected error: {other}"),
        }
        // api stays registered, nothing after worker is attempted
        assert_eq!(memory.service_count().await, 1);
        assert_eq!(memory.store_count().await, 0);
    }

    #[tokio::test]
    async fn test_store_rejection_reports_store_position() {
        let memory = MemoryDiscovery::new();
        memory.reject("/legacy").await;

        let declarations = Declarations::parse("", "default,/svc;puro,/legacy").unwrap();
        let err = register_all(&memory, &declarations).await.unwrap_err();
        assert_eq!(err.list(), ListKind::Store);
        assert_eq!(err.position(), 1);
        assert_eq!(memory.store_count().await, 1);
    }

    #[tokio::test]
    async fn test_run_returns_after_shutdown() {
        let memory = MemoryDiscovery::new();
        let declarations = Declarations::parse("api,10.0.0.1:8080", "default,/svc").unwrap();

        let summary = run(&memory, &declarations, async {}).await.unwrap();
        assert_eq!(summary, Summary { services: 1, stores: 1 });
    }

    #[tokio::test]
    async fn test_run_does_not_park_on_failure() {
        let memory = MemoryDiscovery::new();
        memory.reject("api").await;
        let declarations = Declarations::parse("api,10.0.0.1:8080", "").unwrap();

        // A pending shutdown would hang the test if the failure parked
        let result = run(&memory, &declarations, std::future::pending()).await;
        assert!(result.is_err());
    }
}
