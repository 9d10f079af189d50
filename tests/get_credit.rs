mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_credit_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/commerce/v1/benefits/user_credit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credit": {
                "gift_credit": 3,
                "purchase_credit": 10,
                "vip_credit": 5
            }
        })))
        .mount(&server)
        .await;

    let client = common::client(&server);
    let credit = client.get_credit().await.unwrap();

    assert_eq!(credit.gift_credit, 3);
    assert_eq!(credit.purchase_credit, 10);
    assert_eq!(credit.vip_credit, 5);
    assert_eq!(credit.total(), 18);
}

#[tokio::test]
async fn test_get_credit_defaults_to_zero_when_breakdown_is_missing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/commerce/v1/benefits/user_credit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = common::client(&server);
    let credit = client.get_credit().await.unwrap();
    assert_eq!(credit.total(), 0);
}

#[tokio::test]
async fn test_receive_credit_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/commerce/v1/benefits/credit_receive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "receive_quota": 60
        })))
        .mount(&server)
        .await;

    let client = common::client(&server);
    client.receive_credit().await.unwrap();
}
