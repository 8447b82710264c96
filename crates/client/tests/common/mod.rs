//! Shared fixtures for connector tests against a mock backend.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use certward_client::Connector;
use certward_config::ConnectorConfig;

pub const ACCESS_TOKEN: &str = "test-access-token";
pub const ZONE: &str = "Certificates\\Web";

/// Route client logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connector for `server` with a static bearer token and a default zone.
pub async fn connector(server: &MockServer) -> Connector {
    connector_with(server, |_| {}).await
}

/// Connector for `server`, configured further by `tweak`.
pub async fn connector_with(server: &MockServer, tweak: impl FnOnce(&mut ConnectorConfig)) -> Connector {
    init_tracing();
    let mut config = ConnectorConfig::new(server.uri());
    config.zone = ZONE.to_string();
    config.credentials.access_token = Some(ACCESS_TOKEN.to_string());
    tweak(&mut config);
    Connector::from_config(&config)
        .await
        .expect("connector builds")
}

/// Leaf, intermediate and root PEMs of a freshly generated chain.
pub fn three_level_chain() -> (String, String, String) {
    let root_key = rcgen::KeyPair::generate().unwrap();
    let mut root_params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    root_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let root = root_params.self_signed(&root_key).unwrap();
    let root_issuer = rcgen::Issuer::new(root_params, root_key);

    let int_key = rcgen::KeyPair::generate().unwrap();
    let mut int_params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    int_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let intermediate = int_params.signed_by(&int_key, &root_issuer).unwrap();
    let int_issuer = rcgen::Issuer::new(int_params, int_key);

    let leaf_key = rcgen::KeyPair::generate().unwrap();
    let leaf_params = rcgen::CertificateParams::new(vec!["web.example.com".to_string()]).unwrap();
    let leaf = leaf_params.signed_by(&leaf_key, &int_issuer).unwrap();

    (leaf.pem(), intermediate.pem(), root.pem())
}

pub fn encode(document: &str) -> String {
    STANDARD.encode(document)
}

/// DER contents of the first PEM block.
pub fn der(pem_text: &str) -> Vec<u8> {
    pem::parse(pem_text).unwrap().into_contents()
}

/// A permissive enrollment zone with a locked country.
pub fn zone_policy() -> Value {
    json!({
        "Error": "",
        "Policy": {
            "KeyPair": {
                "KeyAlgorithm": {"Locked": false, "Value": "RSA"},
                "KeySize": {"Locked": false, "Value": 2048}
            },
            "ManagementType": {"Locked": false, "Value": "Enrollment"},
            "SubjAltNameDnsAllowed": true,
            "Subject": {
                "Country": {"Locked": true, "Value": "US"},
                "Organization": {"Locked": false, "Value": "Example Inc."}
            },
            "WhitelistedDomains": ["example.com"],
            "WildcardsAllowed": false
        }
    })
}

/// Mount the zone read: policy check plus both policy attributes.
pub async fn mount_zone(server: &MockServer, policy: Value, manual_csr: &[&str], management_type: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/vedsdk/certificates/checkpolicy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(policy))
        .mount(server)
        .await;

    for (attribute, values) in [("Manual Csr", manual_csr), ("Management Type", management_type)] {
        Mock::given(method("POST"))
            .and(path("/vedsdk/Config/ReadPolicy"))
            .and(body_partial_json(json!({
                "Class": "X509 Certificate",
                "AttributeName": attribute
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Error": "",
                "Result": 1,
                "Values": values,
                "Locked": false
            })))
            .mount(server)
            .await;
    }
}
