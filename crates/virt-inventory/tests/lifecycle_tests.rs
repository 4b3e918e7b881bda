//! Handle lifecycle and request flow against an in-memory hypervisor.

mod common;

use std::time::Duration;

use common::{endpoint, web1, Counters, FakeConnector, FakeDomain, Stall};
use virt_inventory::{
    fetch_info, fetch_interfaces, inspect, AddressFamily, AddressSource, ClientConfig,
    ConnectionHandle, ConnectionState, DomainHandle, DomainHandleState, DomainState, Error,
    ErrorKind, Operation,
};

#[tokio::test]
async fn test_report_for_domain_with_agent_addresses() {
    let connector = FakeConnector::with_domains(vec![web1()]);

    let inspection = inspect(&connector, &endpoint(), "web1", &ClientConfig::default())
        .await
        .unwrap();

    assert!(inspection.is_complete());
    assert_eq!(
        inspection.report().unwrap(),
        "name: eth0 hwaddr: 52:54:00:aa:bb:cc[addr: 192.168.1.10 prefix: 24 type: 0]\n\
         Domain web1: 2 CPUs\n"
    );
    assert_eq!(Counters::get(&connector.counters.closes), 1);
    assert_eq!(Counters::get(&connector.counters.disconnects), 1);
}

#[tokio::test]
async fn test_report_without_guest_agent_has_only_cpu_line() {
    let connector = FakeConnector::with_domains(vec![FakeDomain::new("nogui", 4)]);

    let inspection = inspect(&connector, &endpoint(), "nogui", &ClientConfig::default())
        .await
        .unwrap();

    assert!(inspection.inventory.as_ref().unwrap().is_empty());
    assert_eq!(inspection.report().unwrap(), "Domain nogui: 4 CPUs\n");
}

#[tokio::test]
async fn test_missing_domain_fails_before_any_query() {
    let connector = FakeConnector::with_domains(vec![web1()]);

    let err = inspect(&connector, &endpoint(), "ghost", &ClientConfig::default())
        .await
        .unwrap_err();

    assert_eq!(err, Error::DomainNotFound("ghost".into()));
    assert_eq!(Counters::get(&connector.counters.info_calls), 0);
    assert_eq!(Counters::get(&connector.counters.interface_calls), 0);
    // The connection is still closed on the failure path.
    assert_eq!(Counters::get(&connector.counters.closes), 1);
    assert_eq!(Counters::get(&connector.counters.disconnects), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connection_error() {
    let connector = FakeConnector {
        unreachable: true,
        ..Default::default()
    };

    let err = inspect(&connector, &endpoint(), "web1", &ClientConfig::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(Counters::get(&connector.counters.lookups), 0);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let connector = FakeConnector::with_domains(vec![web1()]);
    let conn = ConnectionHandle::connect(&connector, &endpoint(), &ClientConfig::default())
        .await
        .unwrap();
    assert_eq!(conn.state(), ConnectionState::Open);

    conn.close().await;
    conn.close().await;
    drop(conn);

    assert_eq!(Counters::get(&connector.counters.closes), 1);
    assert_eq!(Counters::get(&connector.counters.disconnects), 1);
}

#[tokio::test]
async fn test_drop_disconnects_open_connection() {
    let connector = FakeConnector::with_domains(vec![web1()]);
    let conn = ConnectionHandle::connect(&connector, &endpoint(), &ClientConfig::default())
        .await
        .unwrap();

    drop(conn);

    assert_eq!(Counters::get(&connector.counters.closes), 0);
    assert_eq!(Counters::get(&connector.counters.disconnects), 1);
}

#[tokio::test]
async fn test_release_is_idempotent_and_invalidates_queries() {
    let connector = FakeConnector::with_domains(vec![web1()]);
    let conn = ConnectionHandle::connect(&connector, &endpoint(), &ClientConfig::default())
        .await
        .unwrap();
    let domain = DomainHandle::lookup(&conn, "web1").await.unwrap();
    assert_eq!(domain.name(), "web1");
    assert_eq!(domain.id(), Some(1));
    assert!(domain.is_valid());

    domain.release();
    domain.release();

    assert_eq!(domain.state(), DomainHandleState::Released);
    assert_eq!(
        fetch_info(&domain).await.unwrap_err(),
        Error::InvalidHandle("web1".into())
    );
    assert_eq!(Counters::get(&connector.counters.info_calls), 0);
    conn.close().await;
}

#[tokio::test]
async fn test_lookup_on_closed_connection() {
    let connector = FakeConnector::with_domains(vec![web1()]);
    let conn = ConnectionHandle::connect(&connector, &endpoint(), &ClientConfig::default())
        .await
        .unwrap();
    conn.close().await;

    let err = DomainHandle::lookup(&conn, "web1").await.unwrap_err();

    assert_eq!(err, Error::ConnectionClosed);
    assert_eq!(Counters::get(&connector.counters.lookups), 0);
}

#[tokio::test]
async fn test_domain_outliving_its_connection_is_inert() {
    let connector = FakeConnector::with_domains(vec![web1()]);
    let conn = ConnectionHandle::connect(&connector, &endpoint(), &ClientConfig::default())
        .await
        .unwrap();
    let domain = DomainHandle::lookup(&conn, "web1").await.unwrap();

    conn.close().await;
    drop(conn);

    assert!(!domain.is_valid());
    let err = fetch_interfaces(&domain, AddressSource::GuestAgent)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    // Releasing after the connection is gone is still safe.
    domain.release();
    domain.release();
}

#[tokio::test]
async fn test_info_fields() {
    let connector = FakeConnector::with_domains(vec![web1()]);
    let conn = ConnectionHandle::connect(&connector, &endpoint(), &ClientConfig::default())
        .await
        .unwrap();
    let domain = DomainHandle::lookup(&conn, "web1").await.unwrap();

    let info = fetch_info(&domain).await.unwrap();

    assert_eq!(info.virtual_cpu_count, 2);
    assert_eq!(info.memory_kb, 2_097_152);
    assert_eq!(info.state, DomainState::Running);
    domain.release();
    conn.close().await;
}

#[tokio::test]
async fn test_negative_cpu_count_is_info_unavailable() {
    let mut broken = FakeDomain::new("broken", 2);
    broken.info.nr_virt_cpu = -1;
    let connector = FakeConnector::with_domains(vec![broken]);

    let inspection = inspect(&connector, &endpoint(), "broken", &ClientConfig::default())
        .await
        .unwrap();

    assert_eq!(inspection.info.unwrap_err().kind(), ErrorKind::InfoUnavailable);
}

#[tokio::test]
async fn test_inventory_failure_keeps_info() {
    let mut domain = web1();
    domain.inventory_error = Some("agent channel reset".into());
    let connector = FakeConnector::with_domains(vec![domain]);

    let inspection = inspect(&connector, &endpoint(), "web1", &ClientConfig::default())
        .await
        .unwrap();

    assert!(!inspection.is_complete());
    assert_eq!(inspection.info.as_ref().unwrap().virtual_cpu_count, 2);
    assert_eq!(
        inspection.report().unwrap_err().kind(),
        ErrorKind::InventoryUnavailable
    );
    assert_eq!(Counters::get(&connector.counters.closes), 1);
}

#[tokio::test]
async fn test_inventory_preserves_order() {
    let domain = FakeDomain::new("multi", 1)
        .with_interface("lo", None, &[(0, "127.0.0.1", 8), (1, "::1", 128)])
        .with_interface("eth0", Some("52:54:00:00:00:01"), &[(0, "10.0.0.2", 16)])
        .with_interface("eth1", Some("52:54:00:00:00:02"), &[]);
    let connector = FakeConnector::with_domains(vec![domain]);
    let conn = ConnectionHandle::connect(&connector, &endpoint(), &ClientConfig::default())
        .await
        .unwrap();
    let domain = DomainHandle::lookup(&conn, "multi").await.unwrap();

    let first = fetch_interfaces(&domain, AddressSource::GuestAgent).await.unwrap();
    let second = fetch_interfaces(&domain, AddressSource::GuestAgent).await.unwrap();

    let names: Vec<&str> = first.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["lo", "eth0", "eth1"]);
    assert_eq!(first, second);
    let lo = &first.interfaces()[0];
    assert_eq!(lo.hardware_address, None);
    assert_eq!(lo.addresses[1].family, AddressFamily::IPv6);
    assert_eq!(lo.addresses[1].prefix_length, 128);
    assert!(first.interfaces()[2].addresses.is_empty());
    domain.release();
    conn.close().await;
}

#[tokio::test]
async fn test_unknown_address_family_is_inventory_error() {
    let domain = FakeDomain::new("odd", 1).with_interface("eth0", None, &[(7, "?", 0)]);
    let connector = FakeConnector::with_domains(vec![domain]);

    let inspection = inspect(&connector, &endpoint(), "odd", &ClientConfig::default())
        .await
        .unwrap();

    assert_eq!(
        inspection.inventory.unwrap_err().kind(),
        ErrorKind::InventoryUnavailable
    );
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout() {
    let connector = FakeConnector::with_domains(vec![web1()]).stalling(Stall::Connect);
    let config = ClientConfig::default().with_connect_timeout(Duration::from_secs(5));

    let err = inspect(&connector, &endpoint(), "web1", &config).await.unwrap_err();

    assert_eq!(
        err,
        Error::Timeout {
            operation: Operation::Connect,
            after: Duration::from_secs(5),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_lookup_timeout_closes_connection() {
    let connector = FakeConnector::with_domains(vec![web1()]).stalling(Stall::Lookup);
    let config = ClientConfig::default().with_call_timeout(Duration::from_secs(2));

    let err = inspect(&connector, &endpoint(), "web1", &config).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(Counters::get(&connector.counters.closes), 1);
}

#[tokio::test(start_paused = true)]
async fn test_info_timeout_does_not_hide_inventory() {
    let connector = FakeConnector::with_domains(vec![web1()]).stalling(Stall::Info);
    let config = ClientConfig::default().with_call_timeout(Duration::from_secs(3));

    let inspection = inspect(&connector, &endpoint(), "web1", &config).await.unwrap();

    assert_eq!(
        inspection.info.unwrap_err(),
        Error::Timeout {
            operation: Operation::FetchInfo,
            after: Duration::from_secs(3),
        }
    );
    assert_eq!(inspection.inventory.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interface_timeout_does_not_hide_info() {
    let connector = FakeConnector::with_domains(vec![web1()]).stalling(Stall::Interfaces);
    let config = ClientConfig::default().with_call_timeout(Duration::from_secs(3));

    let inspection = inspect(&connector, &endpoint(), "web1", &config).await.unwrap();

    assert_eq!(
        inspection.inventory.unwrap_err(),
        Error::Timeout {
            operation: Operation::FetchInterfaces,
            after: Duration::from_secs(3),
        }
    );
    assert_eq!(inspection.info.unwrap().virtual_cpu_count, 2);
    assert_eq!(Counters::get(&connector.counters.disconnects), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_close_still_disconnects_on_drop() {
    let connector = FakeConnector::with_domains(vec![web1()]).stalling(Stall::Close);
    let conn = ConnectionHandle::connect(&connector, &endpoint(), &ClientConfig::default())
        .await
        .unwrap();
    let domain = DomainHandle::lookup(&conn, "web1").await.unwrap();

    let closed = tokio::time::timeout(Duration::from_millis(10), conn.close()).await;
    assert!(closed.is_err());
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(Counters::get(&connector.counters.disconnects), 0);

    // The domain handle still shares the session; dropping the connection
    // must tear it down anyway.
    drop(conn);
    assert_eq!(Counters::get(&connector.counters.disconnects), 1);
    assert!(!domain.is_valid());
    drop(domain);
    assert_eq!(Counters::get(&connector.counters.disconnects), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_request_releases_connection() {
    let connector = FakeConnector::with_domains(vec![web1()]).stalling(Stall::Interfaces);

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        inspect(&connector, &endpoint(), "web1", &ClientConfig::default()),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(Counters::get(&connector.counters.opens), 1);
    assert_eq!(Counters::get(&connector.counters.disconnects), 1);
}
